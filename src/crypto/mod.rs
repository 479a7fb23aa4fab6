//! Cryptographic primitives for boxes.
//!
//! Provides the passphrase key derivation and the authenticated envelope.

pub mod aead;
pub mod kdf;

pub use aead::{EnvelopeFormat, open, seal, secure_random};
pub use kdf::{DerivedKey, derive_key};

/// Length of the encryption key (32 bytes / 256 bits).
pub const KEY_LEN: usize = 32;
/// Length of the Poly1305 authentication tag (16 bytes).
pub const TAG_LEN: usize = 16;
