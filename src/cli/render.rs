use cryptex::{BoxListing, Secret};

const HIDDEN: &str = "********";

/// Prints left-aligned columns sized to their widest cell.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .filter_map(|r| r.get(i))
                .map(|c| c.chars().count())
                .chain(std::iter::once(h.len()))
                .max()
                .unwrap_or(h.len())
        })
        .collect();

    let line = |cells: Vec<String>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{c:<w$}"))
            .collect();
        println!("{}", padded.join("  ").trim_end());
    };

    line(headers.iter().map(|h| h.to_string()).collect());
    line(widths.iter().map(|w| "-".repeat(*w)).collect());
    for row in rows {
        line(row.clone());
    }
}

pub fn print_boxes(boxes: &[BoxListing]) {
    if boxes.is_empty() {
        println!("No boxes found.");
        return;
    }
    let rows: Vec<Vec<String>> = boxes
        .iter()
        .map(|b| vec![b.name.clone(), format!("{} bytes", b.size)])
        .collect();
    print_table(&["Name", "Size"], &rows);
}

pub fn print_secrets<'a>(secrets: impl Iterator<Item = &'a Secret>, with_items: bool) {
    let mut rows = Vec::new();
    for s in secrets {
        let mut row = vec![
            s.name().to_string(),
            s.version().to_string(),
            s.login().to_string(),
            s.url().to_string(),
            s.last_updated().to_string(),
        ];
        if with_items {
            row.push(s.items().keys().cloned().collect::<Vec<_>>().join(", "));
        }
        rows.push(row);
    }

    if rows.is_empty() {
        println!("No secrets stored.");
        return;
    }

    let mut headers = vec!["Name", "Version", "Login", "Url", "Updated"];
    if with_items {
        headers.push("Items");
    }
    print_table(&headers, &rows);
}

/// Field-by-field view of one secret; values are masked unless `unsecure`.
pub fn print_secret(secret: &Secret, unsecure: bool) {
    let mask = |v: &str| {
        if unsecure || v.is_empty() {
            v.to_string()
        } else {
            HIDDEN.to_string()
        }
    };

    let mut rows = vec![
        vec!["Name".to_string(), secret.name().to_string()],
        vec!["Version".to_string(), secret.version().to_string()],
        vec!["Login".to_string(), secret.login().to_string()],
        vec!["Password".to_string(), mask(secret.password())],
        vec!["Url".to_string(), secret.url().to_string()],
        vec!["Notes".to_string(), secret.notes().to_string()],
        vec!["Updated".to_string(), secret.last_updated().to_string()],
    ];
    for (key, value) in secret.items() {
        rows.push(vec![format!("Item {key}"), mask(value)]);
    }
    print_table(&["Field", "Value"], &rows);
}
