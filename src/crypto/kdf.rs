use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use super::KEY_LEN;

/// A 256-bit box key derived from a passphrase.
///
/// Zeroized on drop.
#[derive(Clone)]
pub struct DerivedKey {
    bytes: [u8; KEY_LEN],
}

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Derive the box key from a passphrase.
///
/// Box files carry no salt, so the derivation is a single SHA-256 digest of
/// the passphrase bytes. The same passphrase always yields the same key.
/// Passphrase policy is enforced by callers before reaching this point.
pub fn derive_key(passphrase: &str) -> DerivedKey {
    let mut hasher = Sha256::new();
    hasher.update(passphrase.as_bytes());

    let mut bytes = [0u8; KEY_LEN];
    bytes.copy_from_slice(&hasher.finalize());

    DerivedKey { bytes }
}
