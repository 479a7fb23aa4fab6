//! Open, save and enumerate encrypted boxes.
//!
//! On disk a box is nothing but an envelope:
//! ```text
//! seal(SHA-256(passphrase), json(SecretBox))
//! ```

use anyhow::{Context, Result, bail};
use regex::Regex;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::auth::PassphraseSource;
use crate::config::Config;
use crate::crypto::{self, EnvelopeFormat};
use crate::error::{BoxError, CryptoError};
use crate::format;
use crate::locate;
use crate::storage::{Storage, is_pending_write};
use crate::store::SecretBox;

/// A decrypted box together with what is needed to write it back.
pub struct OpenedBox {
    path: PathBuf,
    passphrase: Zeroizing<String>,
    secret_box: SecretBox,
}

impl OpenedBox {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }

    pub fn secret_box(&self) -> &SecretBox {
        &self.secret_box
    }

    pub fn secret_box_mut(&mut self) -> &mut SecretBox {
        &mut self.secret_box
    }

    pub fn into_parts(self) -> (PathBuf, Zeroizing<String>, SecretBox) {
        (self.path, self.passphrase, self.secret_box)
    }
}

impl std::fmt::Debug for OpenedBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedBox")
            .field("path", &self.path)
            .field("passphrase", &"[REDACTED]")
            .field("secrets", &self.secret_box.len())
            .finish()
    }
}

/// One entry of the box directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxListing {
    pub name: String,
    pub path: PathBuf,
    /// Encrypted file size in bytes.
    pub size: u64,
}

/// Box persistence rooted at a box directory.
#[derive(Debug, Clone)]
pub struct BoxStore {
    dir: PathBuf,
    config: Config,
    format: EnvelopeFormat,
}

impl BoxStore {
    /// Resolves (and creates) the box directory from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let dir = locate::init_box_dir(config)?;
        debug!(dir = %dir.display(), "box folder ready");
        Ok(Self::with_dir(dir, config.clone()))
    }

    pub fn with_dir(dir: PathBuf, config: Config) -> Self {
        Self {
            dir,
            config,
            format: EnvelopeFormat::default(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn resolve_path(&self, locator: Option<&str>) -> Result<PathBuf> {
        locate::resolve_box_path(&self.dir, locator, &self.config)
    }

    /// Creates an empty box named `name` and persists it immediately.
    pub fn create(&self, name: &str, owner: &str, passphrase: &str) -> Result<OpenedBox> {
        check_box_name(name)?;
        let path = self.dir.join(name);
        if path.exists() {
            bail!(BoxError::BoxAlreadyExists(path));
        }

        let opened = OpenedBox {
            path,
            passphrase: Zeroizing::new(passphrase.to_string()),
            secret_box: SecretBox::new(name, owner),
        };
        self.save(&opened)?;
        info!(path = %opened.path.display(), "box created");
        Ok(opened)
    }

    /// Resolves `locator`, asks `passphrases` for the passphrase and decrypts.
    pub fn open(
        &self,
        locator: Option<&str>,
        passphrases: &dyn PassphraseSource,
    ) -> Result<OpenedBox> {
        let path = self.resolve_path(locator)?;
        self.open_path(&path, passphrases)
    }

    pub fn open_path(&self, path: &Path, passphrases: &dyn PassphraseSource) -> Result<OpenedBox> {
        let storage = Storage::new(path.to_path_buf());
        if !storage.exists() {
            bail!(BoxError::BoxNotFound(path.to_path_buf()));
        }
        let data = storage.load()?;

        let passphrase = passphrases.passphrase("Password: ")?;
        let secret_box = self.decrypt(&data, &passphrase)?;
        debug!(path = %path.display(), secrets = secret_box.len(), "box opened");

        Ok(OpenedBox {
            path: path.to_path_buf(),
            passphrase,
            secret_box,
        })
    }

    /// Re-encrypts the whole box and atomically replaces its file.
    pub fn save(&self, opened: &OpenedBox) -> Result<()> {
        self.save_to(&opened.path, &opened.passphrase, &opened.secret_box)
    }

    pub fn save_to(&self, path: &Path, passphrase: &str, secret_box: &SecretBox) -> Result<()> {
        let payload = format::encode(secret_box)?;
        let key = crypto::derive_key(passphrase);
        let envelope = crypto::seal(self.format, key.as_bytes(), &payload)
            .context("failed to encrypt the box")?;

        Storage::new(path.to_path_buf())
            .save(&envelope)
            .with_context(|| format!("failed to write the box {}", path.display()))?;
        debug!(path = %path.display(), bytes = envelope.len(), "box saved");
        Ok(())
    }

    /// Removes a box file. Callers open it first to prove the passphrase.
    pub fn delete(&self, opened: OpenedBox) -> Result<()> {
        let (path, _, _) = opened.into_parts();
        Storage::new(path.clone()).remove()?;
        info!(path = %path.display(), "box deleted");
        Ok(())
    }

    /// Every regular file in the box directory, sorted by name, optionally
    /// filtered by `filter`.
    pub fn list_boxes(&self, filter: Option<&Regex>) -> Result<Vec<BoxListing>> {
        let mut boxes = Vec::new();
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("failed to read box folder {}", self.dir.display()))?;

        for entry in entries {
            let entry = entry?;
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    warn!(file = ?entry.file_name(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            if is_pending_write(&name) {
                continue;
            }
            if filter.is_some_and(|re| !re.is_match(&name)) {
                continue;
            }

            boxes.push(BoxListing {
                name,
                path: entry.path(),
                size: metadata.len(),
            });
        }

        boxes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(boxes)
    }

    fn decrypt(&self, data: &[u8], passphrase: &str) -> Result<SecretBox> {
        let key = crypto::derive_key(passphrase);
        let payload = crypto::open(self.format, key.as_bytes(), data).map_err(|e| match e {
            CryptoError::CiphertextTooShort | CryptoError::AuthenticationFailed => {
                BoxError::WrongPasswordOrCorruptBox
            }
            other => BoxError::MalformedPayload(other.to_string()),
        })?;

        Ok(format::decode(&payload)?)
    }
}

/// A box name must be one plain path component so the box stays inside
/// the box folder.
fn check_box_name(name: &str) -> Result<(), BoxError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(c)), None) if c == name && !is_pending_write(name) => Ok(()),
        _ => Err(BoxError::InvalidBoxName(name.to_string())),
    }
}
