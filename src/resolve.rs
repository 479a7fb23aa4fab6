//! Dotted secret references: `NAME` or `NAME.ITEM`.

use tracing::debug;

use crate::error::SecretError;
use crate::store::{Secret, SecretBox};

/// Outcome of looking up a reference in a box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution<'a> {
    /// The matching secret, if any.
    pub secret: Option<&'a Secret>,
    /// The item value when an item was requested, the password otherwise.
    /// Empty when the secret or the item is missing.
    pub value: String,
    /// The requested item key, empty for a bare name.
    pub item: String,
}

impl Resolution<'_> {
    pub fn is_found(&self) -> bool {
        self.secret.is_some()
    }

    /// True when an item was asked for and the secret does not carry it.
    pub fn is_missing_item(&self) -> bool {
        self.secret
            .is_some_and(|s| !self.item.is_empty() && s.item(&self.item).is_none())
    }
}

/// Splits a reference into secret name and item key.
///
/// Everything after the first dot is concatenated without separators, so
/// `NAME.A.B` asks for item `AB`.
pub fn parse_reference(reference: &str) -> (&str, String) {
    let mut parts = reference.split('.');
    let name = parts.next().unwrap_or_default();
    let item: String = parts.collect();
    (name, item)
}

/// Looks `reference` up in `secret_box`.
pub fn resolve<'a>(secret_box: &'a SecretBox, reference: &str) -> Resolution<'a> {
    let (name, item) = parse_reference(reference);
    debug!(secret_name = name, secret_item = %item, "resolving secret reference");

    let secret = secret_box.find(name);
    let value = match secret {
        Some(s) if item.is_empty() => s.password().to_string(),
        Some(s) => s.item(&item).unwrap_or_default().to_string(),
        None => String::new(),
    };

    Resolution {
        secret,
        value,
        item,
    }
}

/// Like [`resolve`], but a missing secret is an error.
pub fn resolve_required<'a>(
    secret_box: &'a SecretBox,
    reference: &str,
) -> Result<Resolution<'a>, SecretError> {
    let resolution = resolve(secret_box, reference);
    if !resolution.is_found() {
        let (name, _) = parse_reference(reference);
        return Err(SecretError::SecretNotFound(name.to_string()));
    }
    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_box() -> SecretBox {
        let mut b = SecretBox::new("test", "me");

        let mut foo = Secret::new("foo");
        foo.set_password("p1");
        foo.set_item("cc", "1234");
        foo.set_item("AB", "flattened");
        b.add_secret(foo).unwrap();

        b.add_secret(Secret::new("empty")).unwrap();
        b
    }

    #[test]
    fn bare_name_returns_password() {
        let b = sample_box();
        let r = resolve(&b, "foo");

        assert!(r.is_found());
        assert_eq!(r.value, "p1");
        assert_eq!(r.item, "");
    }

    #[test]
    fn item_reference_returns_item_value() {
        let b = sample_box();
        let r = resolve(&b, "foo.cc");

        assert_eq!(r.secret.map(Secret::name), Some("foo"));
        assert_eq!(r.value, "1234");
        assert_eq!(r.item, "cc");
    }

    #[test]
    fn unknown_secret_is_not_found() {
        let b = sample_box();
        let r = resolve(&b, "bar");

        assert!(!r.is_found());
        assert_eq!(r.value, "");
    }

    #[test]
    fn missing_item_is_found_with_empty_value() {
        let b = sample_box();
        let r = resolve(&b, "foo.nope");

        assert!(r.is_found());
        assert!(r.is_missing_item());
        assert_eq!(r.value, "");
    }

    #[test]
    fn found_but_empty_password_is_distinct_from_not_found() {
        let b = sample_box();
        let r = resolve(&b, "empty");

        assert!(r.is_found());
        assert!(!r.is_missing_item());
        assert_eq!(r.value, "");
    }

    #[test]
    fn multi_dot_reference_flattens_item_key() {
        assert_eq!(parse_reference("NAME.A.B"), ("NAME", "AB".to_string()));

        let b = sample_box();
        assert_eq!(resolve(&b, "foo.A.B").value, "flattened");
    }

    #[test]
    fn trailing_dot_means_password() {
        assert_eq!(parse_reference("foo."), ("foo", String::new()));

        let b = sample_box();
        assert_eq!(resolve(&b, "foo.").value, "p1");
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let b = sample_box();
        assert!(!resolve(&b, "FOO").is_found());
    }

    #[test]
    fn resolve_required_reports_secret_not_found() {
        let b = sample_box();
        assert_eq!(
            resolve_required(&b, "bar.cc"),
            Err(SecretError::SecretNotFound("bar".into()))
        );
        assert!(resolve_required(&b, "foo").is_ok());
    }
}
