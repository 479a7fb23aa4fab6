use anyhow::{Result, bail};
use std::io::{self, IsTerminal};
use zeroize::Zeroizing;

use cryptex::PassphraseError;
use cryptex::auth::read_piped_line;

/// Asks for a secret value twice. An empty first answer means "no value".
///
/// With piped stdin the value and its confirmation are the next two lines.
pub fn read_secret_value(label: &str) -> Result<Option<Zeroizing<String>>> {
    let (first, second) = if io::stdin().is_terminal() {
        let first = Zeroizing::new(rpassword::prompt_password(format!(
            "{label} (empty for none): "
        ))?);
        if first.is_empty() {
            return Ok(None);
        }
        let second = Zeroizing::new(rpassword::prompt_password(format!(
            "Repeat the {}: ",
            label.to_lowercase()
        ))?);
        (first, second)
    } else {
        let first = read_piped_line()?;
        if first.is_empty() {
            return Ok(None);
        }
        (first, read_piped_line()?)
    };

    if *first != *second {
        bail!(PassphraseError::PassphraseMismatch);
    }
    Ok(Some(first))
}

/// Puts `value` on the system clipboard.
pub fn copy_to_clipboard(value: &str) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new()?;
    clipboard.set_text(value.to_string())?;
    Ok(())
}
