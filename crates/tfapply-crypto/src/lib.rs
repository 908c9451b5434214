//! tfapply-crypto: encryption of saved plans at rest
//!
//! Envelope format (ASCII):
//! ```text
//! <32 hex chars: 16-byte IV>:<hex: AES-256-CBC ciphertext, PKCS#7 padded>
//! ```
//!
//! The key is the passphrase laid out into a fixed 32-byte buffer. This is
//! NOT a KDF; it is kept for compatibility with existing encrypted plans.
//! Layouts live behind [`KeyDerivation`] so a real KDF can replace them
//! without touching callers.

pub mod envelope;
pub mod key;

pub use envelope::{decrypt, decrypt_with_key, encrypt, encrypt_with_key, DecryptError};
pub use key::{KeyDerivation, PlanKey, RepeatedFill, ZeroPadded};

/// Size of an AES-256 key in bytes
pub const KEY_SIZE: usize = 32;

/// Size of an AES-CBC initialization vector
pub const IV_SIZE: usize = 16;

/// AES block size
pub const BLOCK_SIZE: usize = 16;
