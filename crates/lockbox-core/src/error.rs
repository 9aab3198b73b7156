use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("salt must be {expected} bytes (got {actual})")]
    SaltLength { expected: usize, actual: usize },

    #[error("IV must be {expected} bytes (got {actual})")]
    IvLength { expected: usize, actual: usize },

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("cipher initialisation failed: {0}")]
    CipherInit(String),

    /// Wrong master password and corrupted ciphertext are indistinguishable.
    #[error("decryption failed: invalid master password or corrupted data")]
    Decrypt,

    #[error("secure random source failed: {0}")]
    Random(#[from] rand::Error),
}

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("format error: {0}")]
    Format(String),

    #[error("file error on {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("index {index} out of range (store holds {len} entries)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("settings error: {0}")]
    Settings(#[from] serde_json::Error),
}

impl VaultError {
    pub(crate) fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }
}
