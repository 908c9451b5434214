//! AES-256-CBC plan envelope
//!
//! ```text
//! <iv hex, 32 chars>:<ciphertext hex>
//! ```
//!
//! Decryption collapses every failure (framing, hex, IV length, padding)
//! into [`DecryptError`] so a caller probing passphrases learns nothing about
//! which step rejected the input.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use secrecy::SecretString;
use thiserror::Error;

use crate::key::{KeyDerivation, PlanKey, ZeroPadded};
use crate::{BLOCK_SIZE, IV_SIZE};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const SEPARATOR: char = ':';

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("decryption failed")]
pub struct DecryptError;

/// Decrypt an envelope with a passphrase using the [`ZeroPadded`] key layout.
pub fn decrypt(buffer: &[u8], passphrase: &SecretString) -> Result<Vec<u8>, DecryptError> {
    decrypt_with_key(buffer, &ZeroPadded.derive(passphrase))
}

/// Encrypt a plan with a passphrase using the [`ZeroPadded`] key layout.
///
/// A fresh random IV is generated per call.
pub fn encrypt(plaintext: &[u8], passphrase: &SecretString) -> Vec<u8> {
    encrypt_with_key(plaintext, &ZeroPadded.derive(passphrase))
}

pub fn decrypt_with_key(buffer: &[u8], key: &PlanKey) -> Result<Vec<u8>, DecryptError> {
    let text = std::str::from_utf8(buffer).map_err(|_| DecryptError)?;
    let (head, tail) = text.trim().split_once(SEPARATOR).ok_or(DecryptError)?;
    if head.is_empty() || tail.is_empty() {
        return Err(DecryptError);
    }

    let iv = hex::decode(head).map_err(|_| DecryptError)?;
    let ciphertext = hex::decode(tail).map_err(|_| DecryptError)?;
    if iv.len() != IV_SIZE || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(DecryptError);
    }

    Aes256CbcDec::new_from_slices(key.as_bytes(), &iv)
        .map_err(|_| DecryptError)?
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|_| DecryptError)
}

pub fn encrypt_with_key(plaintext: &[u8], key: &PlanKey) -> Vec<u8> {
    let mut iv = [0u8; IV_SIZE];
    rand::thread_rng().fill_bytes(&mut iv);
    seal(plaintext, key, &iv)
}

fn seal(plaintext: &[u8], key: &PlanKey, iv: &[u8; IV_SIZE]) -> Vec<u8> {
    let ciphertext = Aes256CbcEnc::new(key.as_bytes().into(), iv.into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut out = String::with_capacity(IV_SIZE * 2 + 1 + ciphertext.len() * 2);
    out.push_str(&hex::encode(iv));
    out.push(SEPARATOR);
    out.push_str(&hex::encode(&ciphertext));
    out.into_bytes()
}
