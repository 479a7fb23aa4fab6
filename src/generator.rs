//! Random password generation.

use anyhow::{Result, bail};

use crate::crypto::secure_random;

const NUMBERS: &str = "0123456789";
const LETTERS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const SPECIAL: &str = "&*{}'\"<>!$@[]";

pub const MAX_LENGTH: usize = 50;

#[derive(Debug, Clone, Copy)]
pub struct GeneratorOptions {
    pub length: usize,
    pub numbers: bool,
    pub letters: bool,
    pub special: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            length: 10,
            numbers: true,
            letters: true,
            special: true,
        }
    }
}

pub fn generate_password(options: &GeneratorOptions) -> Result<String> {
    if options.length > MAX_LENGTH {
        bail!("password length is limited to {MAX_LENGTH} characters");
    }

    let mut charset = String::new();
    if options.numbers {
        charset.push_str(NUMBERS);
    }
    if options.letters {
        charset.push_str(LETTERS);
    }
    if options.special {
        charset.push_str(SPECIAL);
    }
    if charset.is_empty() {
        bail!("at least one character set must be selected");
    }

    let charset = charset.as_bytes();
    (0..options.length)
        .map(|_| random_index(charset.len()).map(|i| charset[i] as char))
        .collect()
}

/// Uniform index in `0..bound` by rejection sampling.
fn random_index(bound: usize) -> Result<usize> {
    let bound = bound as u32;
    let zone = u32::MAX - (u32::MAX % bound);
    loop {
        let mut buf = [0u8; 4];
        secure_random(&mut buf)?;
        let n = u32::from_le_bytes(buf);
        if n < zone {
            return Ok((n % bound) as usize);
        }
    }
}
