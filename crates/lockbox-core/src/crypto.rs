//! Key derivation and the AES-256-CBC payload cipher.
//!
//! The cipher carries no authentication tag. Decrypting with the wrong
//! password only fails when the PKCS#7 padding happens to be invalid;
//! otherwise it yields garbage that the record loader rejects.

use crate::error::CryptoError;
use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::Hmac;
use rand::{CryptoRng, RngCore};
use sha2::Sha256;
use zeroize::Zeroizing;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

pub const KEY_LEN: usize = 32;
pub const SALT_LEN: usize = 16;
pub const IV_LEN: usize = 16;
pub const PBKDF2_ITERATIONS: u32 = 10_000;

/// PBKDF2-HMAC-SHA256 over `password` and a 16-byte `salt`.
pub fn derive_key(password: &str, salt: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
    if salt.len() != SALT_LEN {
        return Err(CryptoError::SaltLength {
            expected: SALT_LEN,
            actual: salt.len(),
        });
    }
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::pbkdf2::<Hmac<Sha256>>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key[..])
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(key)
}

pub fn encrypt(
    plaintext: &[u8],
    password: &str,
    salt: &[u8],
    iv: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    check_iv(iv)?;
    let key = derive_key(password, salt)?;
    let cipher = Aes256CbcEnc::new_from_slices(&key[..], iv)
        .map_err(|e| CryptoError::CipherInit(e.to_string()))?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

pub fn decrypt(
    ciphertext: &[u8],
    password: &str,
    salt: &[u8],
    iv: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    check_iv(iv)?;
    let key = derive_key(password, salt)?;
    let cipher = Aes256CbcDec::new_from_slices(&key[..], iv)
        .map_err(|e| CryptoError::CipherInit(e.to_string()))?;
    let plaintext = cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::Decrypt)?;
    Ok(Zeroizing::new(plaintext))
}

pub fn generate_salt<R>(rng: &mut R) -> Result<[u8; SALT_LEN], CryptoError>
where
    R: RngCore + CryptoRng + ?Sized,
{
    let mut salt = [0u8; SALT_LEN];
    rng.try_fill_bytes(&mut salt)?;
    Ok(salt)
}

pub fn generate_iv<R>(rng: &mut R) -> Result<[u8; IV_LEN], CryptoError>
where
    R: RngCore + CryptoRng + ?Sized,
{
    let mut iv = [0u8; IV_LEN];
    rng.try_fill_bytes(&mut iv)?;
    Ok(iv)
}

fn check_iv(iv: &[u8]) -> Result<(), CryptoError> {
    if iv.len() != IV_LEN {
        return Err(CryptoError::IvLength {
            expected: IV_LEN,
            actual: iv.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const SALT: [u8; SALT_LEN] = [7u8; SALT_LEN];
    const IV: [u8; IV_LEN] = [9u8; IV_LEN];

    #[test]
    fn derive_key_is_deterministic() {
        let a = derive_key("hunter2", &SALT).unwrap();
        let b = derive_key("hunter2", &SALT).unwrap();
        assert_eq!(*a, *b);
        assert_eq!(a.len(), KEY_LEN);
    }

    #[test]
    fn derive_key_depends_on_salt_and_password() {
        let base = derive_key("hunter2", &SALT).unwrap();
        let other_salt = derive_key("hunter2", &[8u8; SALT_LEN]).unwrap();
        let other_password = derive_key("hunter3", &SALT).unwrap();
        assert_ne!(*base, *other_salt);
        assert_ne!(*base, *other_password);
    }

    #[test]
    fn derive_key_rejects_bad_salt_length() {
        let err = derive_key("pw", &[0u8; 15]).unwrap_err();
        assert!(matches!(
            err,
            CryptoError::SaltLength {
                expected: 16,
                actual: 15
            }
        ));
        assert!(derive_key("pw", &[0u8; 32]).is_err());
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let plaintext = b"Mail|alice|p1|https://mail.example|\n";
        let ciphertext = encrypt(plaintext, "correct", &SALT, &IV).unwrap();
        assert_eq!(ciphertext.len() % 16, 0);
        assert_ne!(&ciphertext[..], &plaintext[..]);
        let decrypted = decrypt(&ciphertext, "correct", &SALT, &IV).unwrap();
        assert_eq!(&decrypted[..], &plaintext[..]);
    }

    #[test]
    fn empty_plaintext_is_one_padding_block() {
        let ciphertext = encrypt(b"", "pw", &SALT, &IV).unwrap();
        assert_eq!(ciphertext.len(), 16);
        assert!(decrypt(&ciphertext, "pw", &SALT, &IV).unwrap().is_empty());
    }

    #[test]
    fn iv_changes_ciphertext() {
        let a = encrypt(b"same input", "pw", &SALT, &IV).unwrap();
        let b = encrypt(b"same input", "pw", &SALT, &[1u8; IV_LEN]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_bad_iv_length() {
        assert!(matches!(
            encrypt(b"x", "pw", &SALT, &[0u8; 12]),
            Err(CryptoError::IvLength { actual: 12, .. })
        ));
        assert!(matches!(
            decrypt(&[0u8; 16], "pw", &SALT, &[0u8; 17]),
            Err(CryptoError::IvLength { actual: 17, .. })
        ));
    }

    #[test]
    fn wrong_password_never_returns_original_plaintext() {
        let plaintext = b"Bank|bob|s3cret||\n";
        let ciphertext = encrypt(plaintext, "correct", &SALT, &IV).unwrap();
        match decrypt(&ciphertext, "wrong", &SALT, &IV) {
            Ok(garbage) => assert_ne!(&garbage[..], &plaintext[..]),
            Err(e) => assert!(matches!(e, CryptoError::Decrypt)),
        }
    }

    #[test]
    fn truncated_ciphertext_fails() {
        let ciphertext = encrypt(b"0123456789abcdef0123", "pw", &SALT, &IV).unwrap();
        let err = decrypt(&ciphertext[..ciphertext.len() - 3], "pw", &SALT, &IV).unwrap_err();
        assert!(matches!(err, CryptoError::Decrypt));
    }

    #[test]
    fn salt_and_iv_come_from_the_rng() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        assert_eq!(generate_salt(&mut a).unwrap(), generate_salt(&mut b).unwrap());
        let first = generate_iv(&mut a).unwrap();
        let second = generate_iv(&mut a).unwrap();
        assert_ne!(first, second);
    }
}
