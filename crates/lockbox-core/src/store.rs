//! Encrypted credential store.
//!
//! On-disk layout is three text lines:
//!
//! ```text
//! <hex(salt, 16 bytes)>
//! <hex(iv, 16 bytes)>
//! <hex(ciphertext)>
//! ```
//!
//! The ciphertext decrypts to one `title|username|secret|url|notes` line per
//! record. Every save draws a fresh IV; the salt only changes with the
//! master password.
//!
//! A `Store` is single-threaded. Nothing locks the backing file, so two
//! processes saving the same path race and the last save wins.

use crate::crypto::{self, IV_LEN, SALT_LEN};
use crate::encoding::{from_hex, to_hex};
use crate::error::VaultError;
use crate::generator::{generate_password, PasswordPolicy};
use crate::record::{Record, DELIMITER, FIELD_COUNT};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{error, info, warn};
use zeroize::Zeroizing;

/// A decrypted line that was dropped while opening the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// 1-based line number within the decrypted payload.
    pub line: usize,
    pub reason: String,
}

pub struct Store<R: RngCore + CryptoRng = OsRng> {
    master_password: Zeroizing<String>,
    records: Vec<Record>,
    salt: [u8; SALT_LEN],
    path: PathBuf,
    dirty: bool,
    revision: u64,
    skipped: Vec<SkippedRecord>,
    save_on_drop: bool,
    rng: R,
}

impl Store<OsRng> {
    /// Open the store at `path`, creating an empty dirty store when the file
    /// does not exist yet.
    pub fn open(master_password: &str, path: impl AsRef<Path>) -> Result<Self, VaultError> {
        Self::open_with_rng(master_password, path, OsRng)
    }
}

impl<R: RngCore + CryptoRng> Store<R> {
    /// Like [`Store::open`], drawing salts, IVs and generated passwords from
    /// `rng`.
    pub fn open_with_rng(
        master_password: &str,
        path: impl AsRef<Path>,
        rng: R,
    ) -> Result<Self, VaultError> {
        if master_password.is_empty() {
            return Err(VaultError::Argument("master password cannot be empty".into()));
        }
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(VaultError::Argument("storage path cannot be empty".into()));
        }

        let mut store = Store {
            master_password: Zeroizing::new(master_password.to_string()),
            records: Vec::new(),
            salt: [0u8; SALT_LEN],
            path: path.to_path_buf(),
            dirty: false,
            revision: 0,
            skipped: Vec::new(),
            save_on_drop: true,
            rng,
        };

        if path.exists() {
            store.load()?;
            info!(
                path = %path.display(),
                entries = store.records.len(),
                skipped = store.skipped.len(),
                "opened credential store"
            );
        } else {
            store.salt = crypto::generate_salt(&mut store.rng)?;
            store.dirty = true;
            info!(path = %path.display(), "store file not found; creating new store");
        }
        Ok(store)
    }

    /// Write the store if it has unsaved changes. On failure the store stays
    /// dirty so a later call retries.
    pub fn save(&mut self) -> Result<(), VaultError> {
        if !self.dirty {
            return Ok(());
        }
        let mut payload = Zeroizing::new(String::new());
        for record in &self.records {
            payload.push_str(&record.to_line());
            payload.push('\n');
        }
        // never reuse an IV under CBC
        let iv = crypto::generate_iv(&mut self.rng)?;
        let ciphertext =
            crypto::encrypt(payload.as_bytes(), &self.master_password, &self.salt, &iv)?;
        let contents = format!(
            "{}\n{}\n{}",
            to_hex(&self.salt),
            to_hex(&iv),
            to_hex(&ciphertext)
        );
        write_atomic(&self.path, contents.as_bytes())?;
        self.dirty = false;
        info!(
            path = %self.path.display(),
            entries = self.records.len(),
            "saved credential store"
        );
        Ok(())
    }

    /// Save and consume the store, reporting any error to the caller instead
    /// of the drop-time log.
    pub fn close(mut self) -> Result<(), VaultError> {
        let result = self.save();
        self.save_on_drop = false;
        result
    }

    pub fn add_entry(&mut self, record: Record) -> Result<(), VaultError> {
        record.validate()?;
        warn_on_delimiter(&record);
        self.records.push(record);
        self.mark_dirty();
        Ok(())
    }

    pub fn add_entry_with_generated_password(
        &mut self,
        title: &str,
        username: &str,
        url: &str,
        notes: &str,
        policy: &PasswordPolicy,
    ) -> Result<Record, VaultError> {
        if title.is_empty() {
            return Err(VaultError::Argument("entry title must not be empty".into()));
        }
        let secret = self.generate_password(policy);
        if secret.is_empty() {
            return Err(VaultError::Argument(
                "password generation produced an empty secret".into(),
            ));
        }
        let record = Record::new(title, username, secret)
            .with_url(url)
            .with_notes(notes);
        warn_on_delimiter(&record);
        self.records.push(record.clone());
        self.mark_dirty();
        Ok(record)
    }

    pub fn all_entries(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    /// Records matching `term`, in store order. An empty term matches
    /// nothing.
    pub fn find_entries(&self, term: &str) -> Vec<&Record> {
        self.search(term).into_iter().map(|(_, record)| record).collect()
    }

    /// Same as [`Store::find_entries`] but keeps each record's index.
    pub fn search(&self, term: &str) -> Vec<(usize, &Record)> {
        if term.is_empty() {
            return Vec::new();
        }
        self.records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.matches(term))
            .collect()
    }

    pub fn update_entry(&mut self, index: usize, record: Record) -> Result<(), VaultError> {
        let len = self.records.len();
        let slot = self
            .records
            .get_mut(index)
            .ok_or(VaultError::IndexOutOfRange { index, len })?;
        record.validate()?;
        warn_on_delimiter(&record);
        *slot = record;
        self.mark_dirty();
        Ok(())
    }

    /// Remove the record at `index`; later records shift down by one.
    pub fn delete_entry(&mut self, index: usize) -> Result<Record, VaultError> {
        if index >= self.records.len() {
            return Err(VaultError::IndexOutOfRange {
                index,
                len: self.records.len(),
            });
        }
        let removed = self.records.remove(index);
        self.mark_dirty();
        Ok(removed)
    }

    /// Replace the master password and salt. The file on disk keeps the old
    /// key material until the next save.
    pub fn change_master_password(&mut self, new_password: &str) -> Result<(), VaultError> {
        if new_password.is_empty() {
            return Err(VaultError::Argument(
                "new master password cannot be empty".into(),
            ));
        }
        let salt = crypto::generate_salt(&mut self.rng)?;
        self.master_password = Zeroizing::new(new_password.to_string());
        self.salt = salt;
        self.mark_dirty();
        info!(path = %self.path.display(), "master password changed; salt regenerated");
        Ok(())
    }

    pub fn generate_password(&mut self, policy: &PasswordPolicy) -> String {
        generate_password(&mut self.rng, policy)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Incremented by every successful mutation. Poll it to learn whether
    /// the entry list changed since it was last read.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn skipped_records(&self) -> &[SkippedRecord] {
        &self.skipped
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn set_save_on_drop(&mut self, enabled: bool) {
        self.save_on_drop = enabled;
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
        self.revision += 1;
    }

    fn load(&mut self) -> Result<(), VaultError> {
        let raw = fs::read(&self.path).map_err(|e| VaultError::file(&self.path, e))?;
        let contents = String::from_utf8(raw)
            .map_err(|_| VaultError::Format("store file is not valid text".into()))?;
        let header = FileHeader::parse(&contents)?;
        self.salt = header.salt;
        self.records.clear();
        self.skipped.clear();

        if header.iv_hex.is_empty() || header.data_hex.is_empty() {
            self.dirty = false;
            return Ok(());
        }

        let iv = from_hex(header.iv_hex)?;
        if iv.len() != IV_LEN {
            return Err(VaultError::Format(format!(
                "IV must be {IV_LEN} bytes (got {})",
                iv.len()
            )));
        }
        let ciphertext = from_hex(header.data_hex)?;
        let plaintext = crypto::decrypt(&ciphertext, &self.master_password, &self.salt, &iv)?;
        let text = std::str::from_utf8(&plaintext)
            .map_err(|_| VaultError::Format("decrypted payload is not valid UTF-8".into()))?;

        let (records, skipped) = parse_records(text);
        self.records = records;
        self.skipped = skipped;
        self.dirty = false;
        Ok(())
    }
}

impl<R: RngCore + CryptoRng> Drop for Store<R> {
    fn drop(&mut self) {
        if self.dirty && self.save_on_drop {
            if let Err(e) = self.save() {
                error!(path = %self.path.display(), "save failed on close: {e}");
            }
        }
    }
}

impl<R: RngCore + CryptoRng> fmt::Debug for Store<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path)
            .field("entries", &self.records.len())
            .field("dirty", &self.dirty)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

struct FileHeader<'a> {
    salt: [u8; SALT_LEN],
    iv_hex: &'a str,
    data_hex: &'a str,
}

impl<'a> FileHeader<'a> {
    fn parse(contents: &'a str) -> Result<Self, VaultError> {
        if contents.is_empty() {
            return Err(VaultError::Format("cannot read salt line: file is empty".into()));
        }
        // The IV line may be blank but must exist: at least one byte has to
        // follow the salt line's terminator.
        let (salt_line, rest) = contents
            .split_once('\n')
            .filter(|(_, rest)| !rest.is_empty())
            .ok_or_else(|| VaultError::Format("cannot read IV line".into()))?;
        let salt_line = salt_line.trim_end_matches('\r');
        let (iv_hex, data_hex) = rest.split_once('\n').unwrap_or((rest, ""));
        let iv_hex = iv_hex.trim_end_matches('\r');
        let data_hex = data_hex.trim_end_matches(['\n', '\r']);

        let salt_bytes = from_hex(salt_line)
            .map_err(|e| VaultError::Format(format!("failed to parse salt: {e}")))?;
        let salt: [u8; SALT_LEN] = salt_bytes.as_slice().try_into().map_err(|_| {
            VaultError::Format(format!(
                "salt must be {SALT_LEN} bytes (got {})",
                salt_bytes.len()
            ))
        })?;
        Ok(Self {
            salt,
            iv_hex,
            data_hex,
        })
    }
}

fn parse_records(text: &str) -> (Vec<Record>, Vec<SkippedRecord>) {
    let mut records = Vec::new();
    let mut skipped = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        // Every line written by `Record::to_line` carries at least
        // FIELD_COUNT - 1 delimiters; anything shorter was cut off.
        let delimiters = line.matches(DELIMITER).count();
        if delimiters + 1 < FIELD_COUNT {
            let reason = format!(
                "expected {FIELD_COUNT} fields, found {}",
                delimiters + 1
            );
            warn!(line = idx + 1, "skipping truncated entry line: {reason}");
            skipped.push(SkippedRecord {
                line: idx + 1,
                reason,
            });
            continue;
        }
        records.push(Record::from_line(line));
    }
    (records, skipped)
}

fn warn_on_delimiter(record: &Record) {
    if record.contains_delimiter() {
        warn!(
            title = %record.title,
            "entry field contains the '|' delimiter; fields will not round-trip on reload"
        );
    }
}

/// Replace `path` through a synced temporary file in the same directory.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), VaultError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| VaultError::file(&dir, e))?;
    let mut staging = NamedTempFile::new_in(&dir).map_err(|e| VaultError::file(&dir, e))?;
    staging
        .write_all(bytes)
        .map_err(|e| VaultError::file(path, e))?;
    staging
        .as_file()
        .sync_all()
        .map_err(|e| VaultError::file(path, e))?;
    staging
        .persist(path)
        .map_err(|e| VaultError::file(path, e.error))?;
    Ok(())
}
