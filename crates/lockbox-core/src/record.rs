//! Credential record and its line codec.
//!
//! One record is one line: `title|username|secret|url|notes`. Fields are
//! not escaped, so a value containing `|` shifts every later field on the
//! next parse. Callers are expected to keep field values delimiter-free.

use crate::error::VaultError;
use serde::{Deserialize, Serialize};

pub const DELIMITER: char = '|';

/// Number of positional fields in a record line.
pub const FIELD_COUNT: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub title: String,
    pub username: String,
    pub secret: String,
    pub url: String,
    pub notes: String,
}

impl Record {
    pub fn new(
        title: impl Into<String>,
        username: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            username: username.into(),
            secret: secret.into(),
            ..Self::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn to_line(&self) -> String {
        [
            self.title.as_str(),
            self.username.as_str(),
            self.secret.as_str(),
            self.url.as_str(),
            self.notes.as_str(),
        ]
        .join("|")
    }

    /// Positional parse; missing trailing fields stay empty and anything
    /// past the fifth field is ignored.
    pub fn from_line(line: &str) -> Self {
        let mut record = Self::default();
        let mut parts = line.split(DELIMITER);
        for field in [
            &mut record.title,
            &mut record.username,
            &mut record.secret,
            &mut record.url,
            &mut record.notes,
        ] {
            match parts.next() {
                Some(value) => *field = value.to_string(),
                None => break,
            }
        }
        record
    }

    /// Title and secret are the only required fields.
    pub fn validate(&self) -> Result<(), VaultError> {
        if self.title.is_empty() {
            return Err(VaultError::Argument("entry title must not be empty".into()));
        }
        if self.secret.is_empty() {
            return Err(VaultError::Argument("entry secret must not be empty".into()));
        }
        Ok(())
    }

    pub fn contains_delimiter(&self) -> bool {
        [
            &self.title,
            &self.username,
            &self.secret,
            &self.url,
            &self.notes,
        ]
        .iter()
        .any(|field| field.contains(DELIMITER))
    }

    /// Case-sensitive substring match on title, username or a non-empty url.
    pub fn matches(&self, term: &str) -> bool {
        self.title.contains(term)
            || self.username.contains(term)
            || (!self.url.is_empty() && self.url.contains(term))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> Record {
        Record::new("Mail", "alice", "p1")
            .with_url("https://mail.example")
            .with_notes("work account")
    }

    #[test]
    fn to_line_uses_fixed_field_order() {
        assert_eq!(
            full().to_line(),
            "Mail|alice|p1|https://mail.example|work account"
        );
        assert_eq!(Record::new("Gym", "", "x").to_line(), "Gym||x||");
    }

    #[test]
    fn from_line_inverts_to_line() {
        let record = full();
        assert_eq!(Record::from_line(&record.to_line()), record);
        let sparse = Record::new("Gym", "", "x");
        assert_eq!(Record::from_line(&sparse.to_line()), sparse);
    }

    #[test]
    fn missing_trailing_fields_default_to_empty() {
        let record = Record::from_line("Bank|bob");
        assert_eq!(record.title, "Bank");
        assert_eq!(record.username, "bob");
        assert!(record.secret.is_empty());
        assert!(record.url.is_empty());
        assert!(record.notes.is_empty());
    }

    #[test]
    fn to_line_always_has_every_field() {
        let line = Record::default().to_line();
        assert_eq!(line.matches(DELIMITER).count(), FIELD_COUNT - 1);
    }

    #[test]
    fn extra_fields_are_ignored() {
        let record = Record::from_line("a|b|c|d|e|f");
        assert_eq!(record.notes, "e");
    }

    #[test]
    fn delimiter_in_value_shifts_fields() {
        let record = Record::new("A|B", "user", "secret");
        assert!(record.contains_delimiter());
        let parsed = Record::from_line(&record.to_line());
        assert_eq!(parsed.title, "A");
        assert_eq!(parsed.username, "B");
        assert_eq!(parsed.secret, "user");
        assert_ne!(parsed, record);
    }

    #[test]
    fn validate_requires_title_and_secret() {
        assert!(full().validate().is_ok());
        assert!(Record::new("", "alice", "p1").validate().is_err());
        assert!(Record::new("Mail", "alice", "").validate().is_err());
        assert!(Record::new("Mail", "", "p1").validate().is_ok());
    }

    #[test]
    fn matches_title_username_and_non_empty_url() {
        let record = full();
        assert!(record.matches("Mai"));
        assert!(record.matches("lic"));
        assert!(record.matches("example"));
        assert!(!record.matches("mail.EXAMPLE"));
        assert!(!record.matches("work"));
        assert!(!record.matches("p1"));
    }
}
