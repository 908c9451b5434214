//! Passphrase → 32-byte AES key layouts
//!
//! Neither layout stretches or hashes the passphrase. They exist for wire
//! compatibility with plans that were encrypted by earlier tooling.

use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroize;

use crate::KEY_SIZE;

/// A 256-bit plan encryption key. Zeroized on drop.
#[derive(Clone)]
pub struct PlanKey {
    bytes: [u8; KEY_SIZE],
}

impl PlanKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for PlanKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for PlanKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Turns a passphrase into a plan key.
pub trait KeyDerivation {
    fn derive(&self, passphrase: &SecretString) -> PlanKey;
}

/// Passphrase UTF-8 bytes written into a zeroed 32-byte buffer.
/// Longer passphrases are truncated, shorter ones leave trailing zeros.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroPadded;

impl KeyDerivation for ZeroPadded {
    fn derive(&self, passphrase: &SecretString) -> PlanKey {
        let src = passphrase.expose_secret().as_bytes();
        let mut bytes = [0u8; KEY_SIZE];
        let n = src.len().min(KEY_SIZE);
        bytes[..n].copy_from_slice(&src[..n]);
        PlanKey::from_bytes(bytes)
    }
}

/// Passphrase UTF-8 bytes repeated cyclically across the 32-byte buffer.
/// An empty passphrase yields an all-zero key.
#[derive(Debug, Clone, Copy, Default)]
pub struct RepeatedFill;

impl KeyDerivation for RepeatedFill {
    fn derive(&self, passphrase: &SecretString) -> PlanKey {
        let src = passphrase.expose_secret().as_bytes();
        let mut bytes = [0u8; KEY_SIZE];
        if !src.is_empty() {
            for (dst, b) in bytes.iter_mut().zip(src.iter().cycle()) {
                *dst = *b;
            }
        }
        PlanKey::from_bytes(bytes)
    }
}
