//! Random password generation.

use rand::distributions::{Distribution, Uniform};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const ALPHANUMERIC: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
/// Punctuation added when special characters are enabled. Excludes the
/// record delimiter `|`.
pub const SPECIAL: &str = "!@#$%^&*()-_=+[]{};:,.<>?";

pub const DEFAULT_LENGTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    pub length: usize,
    pub include_special: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
            include_special: true,
        }
    }
}

impl PasswordPolicy {
    pub fn new(length: usize, include_special: bool) -> Self {
        Self {
            length,
            include_special,
        }
    }

    pub fn charset(&self) -> Vec<char> {
        let mut set: Vec<char> = ALPHANUMERIC.chars().collect();
        if self.include_special {
            set.extend(SPECIAL.chars());
        }
        set
    }
}

/// Draw `policy.length` characters uniformly, with replacement. Returns an
/// empty string for a zero length.
pub fn generate_password<R>(rng: &mut R, policy: &PasswordPolicy) -> String
where
    R: RngCore + CryptoRng + ?Sized,
{
    if policy.length == 0 {
        warn!(length = policy.length, "invalid password length requested");
        return String::new();
    }
    let charset = policy.charset();
    if charset.is_empty() {
        warn!("password character set is empty");
        return String::new();
    }
    let dist = Uniform::from(0..charset.len());
    (0..policy.length)
        .map(|_| charset[dist.sample(&mut *rng)])
        .collect()
}
