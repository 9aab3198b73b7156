//! lockbox-core: an encrypted local credential store.
//!
//! A master password and a per-store salt derive an AES-256 key
//! (PBKDF2-HMAC-SHA256). The record list is decrypted into memory on open,
//! edited in place, and re-encrypted under a fresh IV on every save.
//!
//! # Module layout
//! - `encoding` : hex codec for the text store file
//! - `crypto`   : key derivation, AES-256-CBC, salt/IV generation
//! - `record`   : credential record and its `|`-delimited line codec
//! - `generator`: random password generation
//! - `store`    : load, CRUD, search, dirty tracking, save
//! - `paths`, `settings`, `storage`: platform locations and user settings
//! - `error`    : error types

pub mod crypto;
pub mod encoding;
pub mod error;
pub mod generator;
pub mod paths;
pub mod record;
pub mod settings;
pub mod storage;
pub mod store;

pub use error::{CryptoError, VaultError};
pub use generator::PasswordPolicy;
pub use record::Record;
pub use settings::LockboxSettings;
pub use store::{SkippedRecord, Store};
