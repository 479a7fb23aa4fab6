//! Passphrase acquisition and policy.

use anyhow::{Result, bail};
use std::io::{self, BufRead, IsTerminal};
use zeroize::Zeroizing;

use crate::config::Config;
use crate::error::PassphraseError;

/// Minimum length accepted for a new box passphrase.
pub const MIN_PASSPHRASE_LEN: usize = 6;

/// Where box passphrases come from.
pub trait PassphraseSource {
    /// Passphrase for an existing box or file.
    fn passphrase(&self, prompt: &str) -> Result<Zeroizing<String>>;

    /// A new passphrase, entered twice and checked against the policy.
    fn new_passphrase(&self) -> Result<Zeroizing<String>>;
}

/// Validates a freshly chosen passphrase and its confirmation.
pub fn check_new_passphrase(first: &str, second: &str) -> Result<(), PassphraseError> {
    if first.is_empty() {
        return Err(PassphraseError::Empty);
    }
    if first != second {
        return Err(PassphraseError::PassphraseMismatch);
    }
    if first.chars().count() < MIN_PASSPHRASE_LEN {
        return Err(PassphraseError::PassphraseTooShort {
            min: MIN_PASSPHRASE_LEN,
        });
    }
    Ok(())
}

/// Reads from the controlling terminal with echo disabled, or line by line
/// from stdin when it is a pipe.
#[derive(Debug, Default, Clone, Copy)]
pub struct Terminal;

impl PassphraseSource for Terminal {
    fn passphrase(&self, prompt: &str) -> Result<Zeroizing<String>> {
        //  stdin (Pipeline)
        //  echo "supersecret" | cryptex get email --box test
        if !io::stdin().is_terminal() {
            let pw = read_piped_line()?;
            if !pw.is_empty() {
                return Ok(pw);
            }
            bail!(PassphraseError::Empty);
        }

        let pw = Zeroizing::new(rpassword::prompt_password(prompt)?);
        if pw.is_empty() {
            bail!(PassphraseError::Empty);
        }
        Ok(pw)
    }

    fn new_passphrase(&self) -> Result<Zeroizing<String>> {
        let (pw1, pw2) = if io::stdin().is_terminal() {
            (
                Zeroizing::new(rpassword::prompt_password("New password: ")?),
                Zeroizing::new(rpassword::prompt_password("Repeat the password: ")?),
            )
        } else {
            (read_piped_line()?, read_piped_line()?)
        };

        check_new_passphrase(&pw1, &pw2)?;
        Ok(pw1)
    }
}

/// A passphrase known up front: the debug override, or a caller that
/// already holds it.
#[derive(Clone)]
pub struct Fixed(Zeroizing<String>);

impl Fixed {
    pub fn new(passphrase: &str) -> Self {
        Self(Zeroizing::new(passphrase.to_string()))
    }
}

impl PassphraseSource for Fixed {
    fn passphrase(&self, _prompt: &str) -> Result<Zeroizing<String>> {
        Ok(self.0.clone())
    }

    fn new_passphrase(&self) -> Result<Zeroizing<String>> {
        check_new_passphrase(&self.0, &self.0)?;
        Ok(self.0.clone())
    }
}

/// Picks the passphrase source for this process: the debug override when
/// the build honours it, the terminal otherwise.
pub fn passphrase_source(config: &Config) -> Box<dyn PassphraseSource> {
    match &config.debug_passphrase {
        Some(pw) => Box::new(Fixed(pw.clone())),
        None => Box::new(Terminal),
    }
}

/// Reads one line from piped stdin, without the trailing newline.
pub fn read_piped_line() -> Result<Zeroizing<String>> {
    let mut buf = Zeroizing::new(String::new());
    io::stdin().lock().read_line(&mut buf)?;
    trim_newline(&mut buf);
    Ok(buf)
}

fn trim_newline(s: &mut String) {
    while s.ends_with('\n') || s.ends_with('\r') {
        s.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_long_passphrase_is_accepted() {
        assert_eq!(check_new_passphrase("secret1", "secret1"), Ok(()));
    }

    #[test]
    fn mismatch_is_reported() {
        assert_eq!(
            check_new_passphrase("secret1", "secret2"),
            Err(PassphraseError::PassphraseMismatch)
        );
    }

    #[test]
    fn short_passphrase_is_rejected() {
        assert_eq!(
            check_new_passphrase("abc", "abc"),
            Err(PassphraseError::PassphraseTooShort { min: 6 })
        );
    }

    #[test]
    fn empty_passphrase_is_rejected() {
        assert_eq!(check_new_passphrase("", ""), Err(PassphraseError::Empty));
    }

    #[test]
    fn fixed_source_returns_its_passphrase() {
        let source = Fixed::new("secret1");
        assert_eq!(source.passphrase("Password: ").unwrap().as_str(), "secret1");
        assert_eq!(source.new_passphrase().unwrap().as_str(), "secret1");
    }

    #[test]
    fn fixed_source_still_enforces_policy_for_new_boxes() {
        let source = Fixed::new("pw");
        assert!(source.new_passphrase().is_err());
    }

    #[test]
    fn debug_override_selects_fixed_source() {
        let config = Config {
            debug_passphrase: Some(Zeroizing::new("secret1".into())),
            ..Config::default()
        };
        let source = passphrase_source(&config);
        assert_eq!(source.passphrase("").unwrap().as_str(), "secret1");
    }

    #[test]
    fn trim_newline_strips_crlf() {
        let mut s = String::from("pw\r\n");
        trim_newline(&mut s);
        assert_eq!(s, "pw");
    }
}
