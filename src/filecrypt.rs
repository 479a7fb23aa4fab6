//! In-place encryption of standalone files and directories.
//!
//! `report.pdf` becomes `report.pdf.crypted` sealed with the box codec, and
//! the plaintext original is overwritten before it is unlinked. Decryption
//! reverses the rename and wipes the ciphertext.

use anyhow::{Context, Result, bail};
use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::crypto::{self, EnvelopeFormat, secure_random};
use crate::error::{CryptoError, FileCryptError};
use crate::storage::Storage;

/// Filename suffix marking an encrypted file.
pub const ENCRYPTED_SUFFIX: &str = ".crypted";

const WIPE_PASSES: usize = 3;
const WIPE_CHUNK: usize = 64 * 1024;

/// What happened to each file touched by a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub processed: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

pub fn has_marker(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().ends_with(ENCRYPTED_SUFFIX))
        .unwrap_or(false)
}

/// Encrypts a file, or every regular file below a directory.
///
/// Inside a directory, files already carrying the marker, or whose
/// encrypted counterpart exists, are skipped.
pub fn encrypt_path(path: &Path, passphrase: &str) -> Result<Outcome> {
    walk(path, passphrase, Direction::Encrypt)
}

/// Decrypts a marked file, or every marked file below a directory.
///
/// Inside a directory, files without the marker are skipped.
pub fn decrypt_path(path: &Path, passphrase: &str) -> Result<Outcome> {
    walk(path, passphrase, Direction::Decrypt)
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Encrypt,
    Decrypt,
}

fn walk(path: &Path, passphrase: &str, direction: Direction) -> Result<Outcome> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            bail!(FileCryptError::PathNotFound(path.to_path_buf()))
        }
        Err(e) => {
            return Err(e).with_context(|| format!("error accessing the path {}", path.display()));
        }
    };

    let mut outcome = Outcome::default();

    if metadata.is_file() {
        let produced = match direction {
            Direction::Encrypt => encrypt_file(path, passphrase)?,
            Direction::Decrypt => decrypt_file(path, passphrase)?,
        };
        outcome.processed.push(produced);
        return Ok(outcome);
    }

    // Collected up front: the walk must not see the files it produces.
    let files: Vec<PathBuf> = WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) if e.file_type().is_file() => Some(Ok(e.into_path())),
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        })
        .collect::<Result<_, _>>()?;

    for file in &files {
        let file = file.as_path();

        let eligible = match direction {
            Direction::Encrypt => !has_marker(file),
            Direction::Decrypt => has_marker(file),
        };
        if !eligible {
            debug!(file = %file.display(), "skipping");
            outcome.skipped.push(file.to_path_buf());
            continue;
        }

        let target = match direction {
            Direction::Encrypt => Some(with_marker(file)),
            Direction::Decrypt => without_marker(file),
        };
        if let Some(target) = target.filter(|t| occupied(t)) {
            warn!(file = %file.display(), target = %target.display(), "target exists, skipping");
            outcome.skipped.push(file.to_path_buf());
            continue;
        }

        let produced = match direction {
            Direction::Encrypt => encrypt_file(file, passphrase)?,
            Direction::Decrypt => decrypt_file(file, passphrase)?,
        };
        outcome.processed.push(produced);
    }

    info!(
        processed = outcome.processed.len(),
        skipped = outcome.skipped.len(),
        "directory done"
    );
    Ok(outcome)
}

/// Seals `path` into `<path>.crypted` and wipes the original. An existing
/// `<path>.crypted` is never replaced.
pub fn encrypt_file(path: &Path, passphrase: &str) -> Result<PathBuf> {
    if has_marker(path) {
        bail!(FileCryptError::AlreadyEncrypted(path.to_path_buf()));
    }

    let plaintext = zeroize::Zeroizing::new(
        fs::read(path).with_context(|| format!("failed to read {}", path.display()))?,
    );
    let key = crypto::derive_key(passphrase);
    let envelope = crypto::seal(EnvelopeFormat::default(), key.as_bytes(), &plaintext)?;

    let target = with_marker(path);
    if occupied(&target) {
        bail!(FileCryptError::TargetExists(target));
    }
    Storage::new(target.clone()).save(&envelope)?;
    secure_wipe(path)?;

    info!(from = %path.display(), to = %target.display(), "file encrypted");
    Ok(target)
}

/// Opens `<name>.crypted` into `<name>` and wipes the ciphertext.
///
/// Nothing is written or removed unless the envelope authenticates and
/// `<name>` does not exist yet.
pub fn decrypt_file(path: &Path, passphrase: &str) -> Result<PathBuf> {
    let target = without_marker(path)
        .ok_or_else(|| FileCryptError::MissingMarker(path.to_path_buf()))?;
    if occupied(&target) {
        bail!(FileCryptError::TargetExists(target));
    }

    let envelope = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let key = crypto::derive_key(passphrase);
    let plaintext = crypto::open(EnvelopeFormat::default(), key.as_bytes(), &envelope).map_err(
        |e| match e {
            CryptoError::CiphertextTooShort | CryptoError::AuthenticationFailed => {
                anyhow::anyhow!("invalid password or corrupted file {}", path.display())
            }
            other => anyhow::Error::new(other),
        },
    )?;

    Storage::new(target.clone()).save(&plaintext)?;
    secure_wipe(path)?;

    info!(from = %path.display(), to = %target.display(), "file decrypted");
    Ok(target)
}

/// Overwrites a file with zeros, ones and random bytes, syncing after each
/// pass, then unlinks it.
///
/// Copy-on-write and flash storage may keep older blocks around.
pub fn secure_wipe(path: &Path) -> Result<()> {
    let len = fs::metadata(path)?.len();
    let mut file = OpenOptions::new()
        .write(true)
        .open(path)
        .with_context(|| format!("failed to open {} for wiping", path.display()))?;

    let mut buf = vec![0u8; WIPE_CHUNK];
    for pass in 0..WIPE_PASSES {
        file.seek(SeekFrom::Start(0))?;
        let mut remaining = len;
        while remaining > 0 {
            let n = remaining.min(WIPE_CHUNK as u64) as usize;
            match pass {
                0 => buf[..n].fill(0x00),
                1 => buf[..n].fill(0xff),
                _ => secure_random(&mut buf[..n])?,
            }
            file.write_all(&buf[..n])?;
            remaining -= n as u64;
        }
        file.sync_all()?;
    }
    drop(file);

    fs::remove_file(path).with_context(|| format!("failed to remove {}", path.display()))?;
    debug!(file = %path.display(), passes = WIPE_PASSES, "file wiped");
    Ok(())
}

/// True when something, even a dangling symlink, sits at `path`.
fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

fn with_marker(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(ENCRYPTED_SUFFIX);
    PathBuf::from(name)
}

fn without_marker(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    let stripped = name.strip_suffix(ENCRYPTED_SUFFIX)?;
    if stripped.is_empty() {
        warn!(file = %path.display(), "marker without a base name");
        return None;
    }
    Some(path.with_file_name(stripped))
}
