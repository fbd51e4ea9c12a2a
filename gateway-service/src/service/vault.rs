//! Credential Vault (C1): authenticated symmetric encryption of credential
//! values at rest.
//!
//! The vault's AES-256-GCM key is derived once, at startup, from the
//! deployment's `ENCRYPTION_SECRET` via `scrypt` (a memory-hard KDF) and a
//! stable `ENCRYPTION_SALT`. The derived key never leaves process memory
//! (it is not `Debug`/`Serialize`), and nothing in this module ever logs
//! it or the plaintext it protects.
//!
//! Ciphertext blob format: `nonce (12 bytes) || auth_tag (16 bytes) ||
//! encrypted bytes`. A 96-bit nonce is AES-GCM's standard size, the only
//! size the `aes-gcm` crate's type system accepts for `Aes256Gcm`.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use scrypt::Params;
use shared::errors::ApiError;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const SCRYPT_LOG_N: u8 = 14; // N = 2^14 = 16384.
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;
const KEY_LEN: usize = 32;

/// Holds the derived AEAD key for the lifetime of the process.
///
/// Constructed once at startup from `VaultConfig`; cloned cheaply (the key
/// itself is behind an `Aes256Gcm` cipher, not copied per-call).
pub struct Vault {
    cipher: Aes256Gcm,
}

impl Vault {
    /// Derives the vault's key from `secret`/`salt` via scrypt. Expensive by
    /// design (memory-hard KDF), so call once at startup, never per-request.
    pub fn derive(secret: &str, salt: &str) -> Result<Self, ApiError> {
        let params = Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_LEN).map_err(|e| {
            ApiError::InternalError { message: format!("invalid scrypt parameters: {e}") }
        })?;

        let mut key_bytes = [0u8; KEY_LEN];
        scrypt::scrypt(secret.as_bytes(), salt.as_bytes(), &params, &mut key_bytes).map_err(
            |e| ApiError::InternalError { message: format!("key derivation failed: {e}") },
        )?;

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
        Ok(Self { cipher })
    }

    /// Encrypts `plaintext`, returning `nonce || auth_tag || ciphertext`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, ApiError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self.cipher.encrypt(&nonce, plaintext).map_err(|_| {
            ApiError::InternalError { message: "credential encryption failed".to_string() }
        })?;

        if sealed.len() < TAG_LEN {
            return Err(ApiError::InternalError {
                message: "ciphertext shorter than auth tag".to_string(),
            });
        }
        let (ct, tag) = sealed.split_at(sealed.len() - TAG_LEN);

        let mut blob = Vec::with_capacity(NONCE_LEN + TAG_LEN + ct.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(tag);
        blob.extend_from_slice(ct);
        Ok(blob)
    }

    /// Decrypts a blob produced by [`Self::encrypt`]. Fails with
    /// `CiphertextInvalid` (surfaced to callers as `CredentialsUnavailable`)
    /// on any tamper or format mismatch.
    pub fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>, ApiError> {
        if blob.len() < NONCE_LEN + TAG_LEN {
            return Err(ApiError::CredentialsUnavailable);
        }
        let (nonce_bytes, rest) = blob.split_at(NONCE_LEN);
        let (tag, ct) = rest.split_at(TAG_LEN);

        let mut sealed = Vec::with_capacity(ct.len() + TAG_LEN);
        sealed.extend_from_slice(ct);
        sealed.extend_from_slice(tag);

        let nonce = Nonce::from_slice(nonce_bytes);
        self.cipher
            .decrypt(nonce, sealed.as_slice())
            .map_err(|_| ApiError::CredentialsUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> Vault {
        Vault::derive("test-secret-at-least-32-characters!", "test-salt").unwrap()
    }

    #[test]
    fn encrypt_decrypt_roundtrips_for_small_and_large_plaintexts() {
        let v = vault();
        for len in [0, 1, 32, 10 * 1024] {
            let plaintext = vec![0xAB; len];
            let blob = v.encrypt(&plaintext).unwrap();
            let decrypted = v.decrypt(&blob).unwrap();
            assert_eq!(decrypted, plaintext, "roundtrip failed at len={len}");
        }
    }

    #[test]
    fn decrypt_fails_on_single_byte_mutation() {
        let v = vault();
        let mut blob = v.encrypt(b"ghp_supersecrettoken").unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0x01;
        assert!(v.decrypt(&blob).is_err());
    }

    #[test]
    fn decrypt_fails_on_truncated_blob() {
        let v = vault();
        assert!(v.decrypt(b"short").is_err());
    }

    #[test]
    fn distinct_encryptions_of_same_plaintext_use_distinct_nonces() {
        let v = vault();
        let a = v.encrypt(b"same-plaintext").unwrap();
        let b = v.encrypt(b"same-plaintext").unwrap();
        assert_ne!(&a[..NONCE_LEN], &b[..NONCE_LEN]);
        assert_ne!(a, b);
    }

    #[test]
    fn different_secrets_derive_different_keys() {
        let a = Vault::derive("secret-one-at-least-32-characters!!", "salt").unwrap();
        let b = Vault::derive("secret-two-at-least-32-characters!!", "salt").unwrap();
        let blob = a.encrypt(b"payload").unwrap();
        assert!(b.decrypt(&blob).is_err());
    }
}
