//! Local secrets vault.
//!
//! A box is a single encrypted file holding named secrets. The flow is
//! always open, mutate in memory, save:
//!
//! ```no_run
//! use cryptex::{BoxStore, Config, Fixed, Secret};
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = BoxStore::from_config(&Config::from_env()?)?;
//! let mut opened = store.open(Some("personal"), &Fixed::new("correct horse"))?;
//! opened.secret_box_mut().add_secret(Secret::new("email"))?;
//! store.save(&opened)?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod boxstore;
pub mod config;
pub mod crypto;
pub mod error;
pub mod filecrypt;
pub mod format;
pub mod generator;
pub mod locate;
pub mod resolve;
pub mod session;
pub mod storage;
pub mod store;

pub use crate::auth::{Fixed, PassphraseSource, Terminal, passphrase_source};
pub use crate::boxstore::{BoxListing, BoxStore, OpenedBox};
pub use crate::config::Config;
pub use crate::crypto::EnvelopeFormat;
pub use crate::error::{BoxError, CryptoError, FileCryptError, PassphraseError, SecretError};
pub use crate::resolve::{Resolution, resolve, resolve_required};
pub use crate::session::Session;
pub use crate::storage::Storage;
pub use crate::store::{Secret, SecretBox};

use anyhow::Result;

/// A session over the configured box directory, prompting the way the
/// build allows (debug override or terminal).
pub fn default_session(config: &Config) -> Result<Session> {
    let store = BoxStore::from_config(config)?;
    Ok(Session::new(store, passphrase_source(config)))
}
