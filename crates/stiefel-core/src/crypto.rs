//! Authenticated encryption for the boot payload and discovery
//! challenge/response.
//!
//! The nonce is derived from `SHA-256(plaintext || random(16))`, truncated
//! to 16 bytes: deterministic in the plaintext prefix, randomised by a
//! per-invocation salt. This is wire-format-critical and must not change.

use crate::error::CryptoError;
use aes::Aes128;
use eax::aead::{generic_array::GenericArray, Aead, KeyInit, Payload};
use eax::Eax;
use rand::RngCore;
use sha2::{Digest, Sha256};

pub const KEY_LEN: usize = 16;
pub const NONCE_LEN: usize = 16;
pub const TAG_LEN: usize = 16;

type StiefelEax = Eax<Aes128>;

/// Encrypt `plaintext` with the 16-byte shared key `key`, returning
/// `nonce || ciphertext || tag`.
pub fn encrypt(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let nonce = generate_nonce(plaintext);
    let cipher = StiefelEax::new(GenericArray::from_slice(key));
    let ciphertext = cipher
        .encrypt(
            GenericArray::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: &[],
            },
        )
        .map_err(|_| CryptoError::BadTagLength(0))?;

    // `encrypt` appends the tag to the ciphertext; eax always produces a
    // 16-byte tag for this instantiation, checked explicitly anyway since
    // a short tag would corrupt the nonce/ciphertext/tag split on decrypt.
    if ciphertext.len() < TAG_LEN {
        return Err(CryptoError::BadTagLength(ciphertext.len()));
    }

    let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypt a blob produced by [`encrypt`]. The blob must be at least
/// `NONCE_LEN + TAG_LEN` bytes; a 32-byte blob is the minimum and is
/// treated as an empty plaintext.
pub fn decrypt(key: &[u8; KEY_LEN], blob: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if blob.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::Format(blob.len()));
    }
    let (nonce, rest) = blob.split_at(NONCE_LEN);
    let cipher = StiefelEax::new(GenericArray::from_slice(key));
    cipher
        .decrypt(
            GenericArray::from_slice(nonce),
            Payload {
                msg: rest,
                aad: &[],
            },
        )
        .map_err(|_| CryptoError::Auth)
}

fn generate_nonce(plaintext: &[u8]) -> [u8; NONCE_LEN] {
    let mut salt = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut salt);

    let mut hasher = Sha256::new();
    hasher.update(plaintext);
    hasher.update(salt);
    let digest = hasher.finalize();

    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&digest[..NONCE_LEN]);
    nonce
}

/// `KH = SHA-256(K)`, hex-encoded: the non-secret realm identifier carried
/// in every discovery datagram.
pub fn key_hash_hex(key: &[u8; KEY_LEN]) -> String {
    hex::encode(Sha256::digest(key))
}

/// `HK = SHA-256("autokexec-reboot/" || K)`, hex-encoded: the HMAC key used
/// only for the autokexec challenge/response.
pub fn autokexec_hmac_key_hex(key: &[u8; KEY_LEN]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"autokexec-reboot/");
    hasher.update(key);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> [u8; KEY_LEN] {
        [7u8; KEY_LEN]
    }

    #[test]
    fn round_trip() {
        let plaintext = b"stiefelsystem boot payload";
        let blob = encrypt(&key(), plaintext).unwrap();
        let decrypted = decrypt(&key(), &blob).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn encrypt_is_randomised() {
        let plaintext = b"same plaintext twice";
        let a = encrypt(&key(), plaintext).unwrap();
        let b = encrypt(&key(), plaintext).unwrap();
        assert_ne!(a, b);
        assert_eq!(decrypt(&key(), &a).unwrap(), plaintext);
        assert_eq!(decrypt(&key(), &b).unwrap(), plaintext);
    }

    #[test]
    fn tampered_blob_fails_auth() {
        let blob = encrypt(&key(), b"hello world").unwrap();
        let mut tampered = blob.clone();
        let last = tampered.len() - 1;
        tampered[last] ^= 0xff;
        assert!(matches!(decrypt(&key(), &tampered), Err(CryptoError::Auth)));
    }

    #[test]
    fn short_blob_is_format_error() {
        let blob = vec![0u8; 31];
        assert!(matches!(
            decrypt(&key(), &blob),
            Err(CryptoError::Format(31))
        ));
    }

    #[test]
    fn exactly_32_bytes_is_minimum_valid_length() {
        // nonce || "" || tag: an empty-plaintext blob.
        let blob = encrypt(&key(), b"").unwrap();
        assert_eq!(blob.len(), NONCE_LEN + TAG_LEN);
        assert_eq!(decrypt(&key(), &blob).unwrap(), b"");
    }

    #[test]
    fn key_hash_is_stable() {
        let k = key();
        assert_eq!(key_hash_hex(&k), key_hash_hex(&k));
        assert_ne!(key_hash_hex(&k), autokexec_hmac_key_hex(&k));
    }
}
