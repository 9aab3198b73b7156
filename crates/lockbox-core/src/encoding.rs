//! Hex codec for the plain-text store file.
//!
//! Salt, IV and ciphertext are persisted as lowercase hex, two digits per
//! byte, no separators.

use crate::error::VaultError;

pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode a hex string. Empty input, odd length and non-hex digits are all
/// format errors.
pub fn from_hex(text: &str) -> Result<Vec<u8>, VaultError> {
    if text.is_empty() {
        return Err(VaultError::Format(
            "hex string must have a non-zero, even number of characters".into(),
        ));
    }
    hex::decode(text).map_err(|e| match e {
        hex::FromHexError::OddLength => VaultError::Format(
            "hex string must have a non-zero, even number of characters".into(),
        ),
        hex::FromHexError::InvalidHexCharacter { c, index } => {
            VaultError::Format(format!("invalid non-hex character {c:?} at offset {index}"))
        }
        other => VaultError::Format(format!("hex decode: {other}")),
    })
}
