//! Authenticated envelope codec.
//!
//! Envelope layout:
//! ```text
//! NONCE (format nonce size) | CIPHERTEXT || TAG (16)
//! ```
//! There is no header or version byte; the caller picks the
//! [`EnvelopeFormat`] that was used to seal the data.

use chacha20poly1305::{
    ChaCha20Poly1305, XChaCha20Poly1305,
    aead::{Aead, KeyInit, Nonce, generic_array::typenum::Unsigned},
};
use getrandom::fill;
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// Supported envelope constructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvelopeFormat {
    /// ChaCha20-Poly1305 with a 96-bit random nonce. Used for boxes.
    #[default]
    ChaCha20Poly1305,
    /// XChaCha20-Poly1305 with a 192-bit random nonce.
    XChaCha20Poly1305,
}

impl EnvelopeFormat {
    pub fn nonce_len(self) -> usize {
        match self {
            Self::ChaCha20Poly1305 => nonce_len::<ChaCha20Poly1305>(),
            Self::XChaCha20Poly1305 => nonce_len::<XChaCha20Poly1305>(),
        }
    }
}

/// Fill buffer with cryptographically secure random bytes
pub fn secure_random(buf: &mut [u8]) -> Result<(), CryptoError> {
    fill(buf).map_err(|_| CryptoError::RandomUnavailable)
}

/// Encrypt `plaintext` under `key`, returning `nonce || ciphertext || tag`.
///
/// A fresh random nonce is drawn on every call.
pub fn seal(format: EnvelopeFormat, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    match format {
        EnvelopeFormat::ChaCha20Poly1305 => seal_with::<ChaCha20Poly1305>(key, plaintext),
        EnvelopeFormat::XChaCha20Poly1305 => seal_with::<XChaCha20Poly1305>(key, plaintext),
    }
}

/// Authenticate and decrypt an envelope produced by [`seal`].
///
/// Never returns plaintext unless the tag verifies.
pub fn open(
    format: EnvelopeFormat,
    key: &[u8],
    envelope: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    match format {
        EnvelopeFormat::ChaCha20Poly1305 => open_with::<ChaCha20Poly1305>(key, envelope),
        EnvelopeFormat::XChaCha20Poly1305 => open_with::<XChaCha20Poly1305>(key, envelope),
    }
}

fn nonce_len<C: Aead>() -> usize {
    C::NonceSize::USIZE
}

fn seal_with<C>(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>
where
    C: Aead + KeyInit,
{
    let cipher = C::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength)?;

    let mut nonce = Nonce::<C>::default();
    secure_random(nonce.as_mut_slice())?;

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut envelope = Vec::with_capacity(nonce.len() + ciphertext.len());
    envelope.extend_from_slice(&nonce);
    envelope.extend_from_slice(&ciphertext);
    Ok(envelope)
}

fn open_with<C>(key: &[u8], envelope: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError>
where
    C: Aead + KeyInit,
{
    let nonce_len = nonce_len::<C>();
    if envelope.len() < nonce_len {
        return Err(CryptoError::CiphertextTooShort);
    }

    let cipher = C::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength)?;
    let (nonce, ciphertext) = envelope.split_at(nonce_len);

    let plaintext = cipher
        .decrypt(Nonce::<C>::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::AuthenticationFailed)?;
    Ok(Zeroizing::new(plaintext))
}
