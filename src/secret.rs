// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Symmetric protection for credentials at rest.
//!
//! Passwords are stored encrypted under a key derived from the account
//! username, so a leaked job configuration does not expose them in the
//! clear. This obscures secrets from casual inspection only; anyone holding
//! the key material can decrypt.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// AES-GCM nonce length, prefixed to every ciphertext
const NONCE_LEN: usize = 12;

#[derive(Error, Debug)]
pub enum SecretError {
    #[error("Ciphertext is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("Ciphertext is truncated")]
    Truncated,

    #[error("Decryption failed: key material does not match")]
    KeyMismatch,

    #[error("Encryption failed")]
    Encryption,

    #[error("Decrypted secret is not valid UTF-8")]
    NotUtf8(#[from] std::string::FromUtf8Error),
}

fn cipher_for(key_material: &str) -> Aes256Gcm {
    let digest = Sha256::digest(key_material.as_bytes());
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&digest))
}

/// Encrypt a secret under a key derived from `key_material`.
///
/// Output is `base64(nonce || ciphertext)`. The nonce is random, so two
/// encryptions of the same secret produce different strings; both decrypt
/// back with the same key material.
pub fn encrypt(plaintext: &str, key_material: &str) -> Result<String, SecretError> {
    let cipher = cipher_for(key_material);

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|_| SecretError::Encryption)?;

    let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    payload.extend_from_slice(&nonce_bytes);
    payload.extend_from_slice(&ciphertext);
    Ok(BASE64.encode(payload))
}

/// Decrypt a string produced by [`encrypt`] with the same key material.
pub fn decrypt(ciphertext: &str, key_material: &str) -> Result<String, SecretError> {
    let payload = BASE64.decode(ciphertext)?;
    if payload.len() < NONCE_LEN {
        return Err(SecretError::Truncated);
    }

    let (nonce_bytes, encrypted) = payload.split_at(NONCE_LEN);
    let cipher = cipher_for(key_material);
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce_bytes), encrypted)
        .map_err(|_| SecretError::KeyMismatch)?;

    Ok(String::from_utf8(plaintext)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_for_assorted_credentials() {
        let pairs = [
            ("admin", "hunter2"),
            ("svc-scan@bountyy.fi", "p@ss w0rd with spaces"),
            ("", "password-without-username"),
            ("user", ""),
            ("üser-ñame", "pässwörd-日本語"),
        ];

        for (username, password) in pairs {
            let encrypted = encrypt(password, username).unwrap();
            let decrypted = decrypt(&encrypted, username).unwrap();
            assert_eq!(decrypted, password, "roundtrip failed for {:?}", username);
        }
    }

    #[test]
    fn test_ciphertext_does_not_contain_plaintext() {
        let encrypted = encrypt("super-secret-password", "admin").unwrap();
        assert!(!encrypted.contains("super-secret-password"));
    }

    #[test]
    fn test_wrong_key_material_fails() {
        let encrypted = encrypt("secret", "alice").unwrap();
        assert!(matches!(
            decrypt(&encrypted, "bob"),
            Err(SecretError::KeyMismatch)
        ));
    }

    #[test]
    fn test_malformed_ciphertext_fails() {
        assert!(matches!(
            decrypt("%%% not base64 %%%", "alice"),
            Err(SecretError::Encoding(_))
        ));
        assert!(matches!(
            decrypt("AAAA", "alice"),
            Err(SecretError::Truncated)
        ));
    }

    #[test]
    fn test_nonce_makes_encryption_nondeterministic() {
        let first = encrypt("secret", "alice").unwrap();
        let second = encrypt("secret", "alice").unwrap();
        assert_ne!(first, second);
        assert_eq!(decrypt(&first, "alice").unwrap(), "secret");
        assert_eq!(decrypt(&second, "alice").unwrap(), "secret");
    }
}
