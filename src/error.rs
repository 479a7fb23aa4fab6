use std::path::PathBuf;

use thiserror::Error;

/// Failures while locating, opening or persisting a box.
#[derive(Debug, Error)]
pub enum BoxError {
    #[error("no box given and CRYPTEX_BOX is not set")]
    NoBoxSpecified,

    #[error("box '{}' does not exist", .0.display())]
    BoxNotFound(PathBuf),

    #[error("box '{}' already exists", .0.display())]
    BoxAlreadyExists(PathBuf),

    #[error("invalid box name '{0}', use a plain file name")]
    InvalidBoxName(String),

    #[error("invalid password or corrupted box")]
    WrongPasswordOrCorruptBox,

    #[error("box payload is malformed: {0}")]
    MalformedPayload(String),
}

/// Failures on the secrets held inside a box.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecretError {
    #[error("secret '{0}' not found")]
    SecretNotFound(String),

    #[error("a secret named '{0}' already exists")]
    DuplicateSecretName(String),

    #[error("secret name cannot be empty")]
    EmptySecretName,

    #[error("item '{item}' already exists in secret '{secret}'")]
    ItemAlreadyExists { secret: String, item: String },

    #[error("item '{item}' not found in secret '{secret}'")]
    ItemNotFound { secret: String, item: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PassphraseError {
    #[error("passwords do not match")]
    PassphraseMismatch,

    #[error("the password is too short, use at least {min} characters")]
    PassphraseTooShort { min: usize },

    #[error("no password provided")]
    Empty,
}

/// Envelope level failures. Callers above the codec collapse
/// `CiphertextTooShort` and `AuthenticationFailed` into
/// [`BoxError::WrongPasswordOrCorruptBox`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("ciphertext too short")]
    CiphertextTooShort,

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("invalid key length")]
    InvalidKeyLength,

    #[error("encryption failed")]
    EncryptionFailed,

    #[error("OS random generator unavailable")]
    RandomUnavailable,
}

#[derive(Debug, Error)]
pub enum FileCryptError {
    #[error("the given path '{}' does not exist", .0.display())]
    PathNotFound(PathBuf),

    #[error("'{}' is not an encrypted file", .0.display())]
    MissingMarker(PathBuf),

    #[error("'{}' is already encrypted", .0.display())]
    AlreadyEncrypted(PathBuf),

    #[error("'{}' already exists, refusing to overwrite it", .0.display())]
    TargetExists(PathBuf),
}
