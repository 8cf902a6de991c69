//! Envelope encryption of protected bookmark fields.
//!
//! This module is intentionally free of storage and request-layer types.
//! It provides the string-in, string-out primitives used by the record codec.
//!
//! # Envelope format
//!
//! ```text
//! base64( salt[64] || iv[16] || tag[16] || ciphertext[N] )
//! ```
//!
//! N is the UTF-8 length of the plaintext. The layout is opaque to callers;
//! only round-trip correctness is part of the contract.
//!
//! # Security invariants
//!
//! - The master secret and per-envelope keys are never logged and are zeroed
//!   when dropped.
//! - A failed authentication check returns no data.

pub mod cipher;
pub mod master;

pub use cipher::{decrypt, encrypt, CipherError, Envelope, KEY_LEN};
pub use master::{derive_master_secret, master_secret, MasterSecret};
