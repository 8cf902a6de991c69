//! AES-256-GCM envelope encryption of individual string fields.
//!
//! Every call to [`encrypt`] draws a fresh salt and IV, derives a one-off key
//! from the master secret with scrypt, and seals the plaintext. The same
//! plaintext therefore never produces the same envelope twice, which is also
//! why storage cannot compare or search envelopes.
//!
//! The 16-byte IV is non-standard for GCM (96 bits is the usual size); it is
//! kept for compatibility with envelopes written by earlier deployments.

use aes_gcm::{
    aead::{consts::U16, rand_core::RngCore, AeadInPlace, KeyInit, OsRng},
    aes::Aes256,
    AesGcm, Nonce, Tag,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;
use zeroize::Zeroizing;

use common::ServiceError;

use super::master::MasterSecret;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of the per-envelope scrypt salt.
pub const SALT_LEN: usize = 64;

/// Byte length of the GCM IV carried in each envelope.
pub const IV_LEN: usize = 16;

/// Byte length of the GCM authentication tag.
pub const TAG_LEN: usize = 16;

/// Smallest decoded size of a well-formed envelope.
pub const HEADER_LEN: usize = SALT_LEN + IV_LEN + TAG_LEN;

/// scrypt cost parameters: N = 2^14, r = 8, p = 1.
const SCRYPT_LOG_N: u8 = 14;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

/// AES-256-GCM with a 128-bit nonce.
type EnvelopeCipher = AesGcm<Aes256, U16>;

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The master secret is missing or too short.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The value is not a well-formed envelope, or the cipher itself failed.
    #[error("malformed envelope: {0}")]
    Encoding(String),

    /// Authentication failed: tampered data or a different master secret.
    #[error("envelope failed authentication")]
    Decryption,
}

impl From<CipherError> for ServiceError {
    fn from(err: CipherError) -> Self {
        match err {
            CipherError::Configuration(msg) => ServiceError::Configuration(msg),
            CipherError::Encoding(msg) => ServiceError::Encoding(msg),
            CipherError::Decryption => ServiceError::Decryption,
        }
    }
}

/// A parsed envelope.
///
/// The string representation is `base64(salt || iv || tag || ciphertext)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub salt: [u8; SALT_LEN],
    pub iv: [u8; IV_LEN],
    pub tag: [u8; TAG_LEN],
    /// Same length as the UTF-8 plaintext; GCM does not pad.
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    /// Encode this envelope to its stored string form.
    pub fn encode(&self) -> String {
        let mut raw = Vec::with_capacity(HEADER_LEN + self.ciphertext.len());
        raw.extend_from_slice(&self.salt);
        raw.extend_from_slice(&self.iv);
        raw.extend_from_slice(&self.tag);
        raw.extend_from_slice(&self.ciphertext);
        STANDARD.encode(raw)
    }

    /// Parse a stored string back into an [`Envelope`].
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Encoding`] if `s` is not valid base64 or decodes
    /// to fewer than [`HEADER_LEN`] bytes.
    pub fn parse(s: &str) -> Result<Self, CipherError> {
        let raw = STANDARD
            .decode(s)
            .map_err(|_| CipherError::Encoding("invalid base64".into()))?;
        if raw.len() < HEADER_LEN {
            return Err(CipherError::Encoding(format!(
                "expected at least {HEADER_LEN} bytes, got {}",
                raw.len()
            )));
        }

        let (salt, rest) = raw.split_at(SALT_LEN);
        let (iv, rest) = rest.split_at(IV_LEN);
        let (tag, ciphertext) = rest.split_at(TAG_LEN);

        let mut envelope = Self {
            salt: [0u8; SALT_LEN],
            iv: [0u8; IV_LEN],
            tag: [0u8; TAG_LEN],
            ciphertext: ciphertext.to_vec(),
        };
        envelope.salt.copy_from_slice(salt);
        envelope.iv.copy_from_slice(iv);
        envelope.tag.copy_from_slice(tag);
        Ok(envelope)
    }
}

/// Encrypt one field value into an envelope string.
///
/// Empty or whitespace-only input is returned unchanged so that empty fields
/// round-trip as empty.
///
/// # Errors
///
/// Returns [`CipherError::Encoding`] on an internal key-derivation or AEAD
/// failure (unreachable with the fixed parameters above).
pub fn encrypt(plaintext: &str, secret: &MasterSecret) -> Result<String, CipherError> {
    if plaintext.trim().is_empty() {
        return Ok(plaintext.to_owned());
    }

    let mut salt = [0u8; SALT_LEN];
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut iv);

    let cipher = record_cipher(secret, &salt)?;
    let mut ciphertext = plaintext.as_bytes().to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(&iv), b"", &mut ciphertext)
        .map_err(|_| CipherError::Encoding("aead seal failed".into()))?;

    let mut envelope = Envelope {
        salt,
        iv,
        tag: [0u8; TAG_LEN],
        ciphertext,
    };
    envelope.tag.copy_from_slice(tag.as_slice());
    Ok(envelope.encode())
}

/// Decrypt an envelope string back to its plaintext.
///
/// Empty or whitespace-only input is returned unchanged, mirroring [`encrypt`].
///
/// # Errors
///
/// Returns [`CipherError::Encoding`] if `envelope` is not a well-formed
/// envelope or the opened bytes are not UTF-8, and [`CipherError::Decryption`]
/// if the authentication tag does not verify. No plaintext is returned on any
/// failure.
pub fn decrypt(envelope: &str, secret: &MasterSecret) -> Result<String, CipherError> {
    if envelope.trim().is_empty() {
        return Ok(envelope.to_owned());
    }

    let Envelope {
        salt,
        iv,
        tag,
        mut ciphertext,
    } = Envelope::parse(envelope)?;

    let cipher = record_cipher(secret, &salt)?;
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(&iv),
            b"",
            &mut ciphertext,
            Tag::from_slice(&tag),
        )
        .map_err(|_| CipherError::Decryption)?;

    String::from_utf8(ciphertext)
        .map_err(|_| CipherError::Encoding("plaintext is not valid UTF-8".into()))
}

/// Build the AEAD instance for one envelope from the master secret and salt.
fn record_cipher(secret: &MasterSecret, salt: &[u8]) -> Result<EnvelopeCipher, CipherError> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    scrypt_into(secret.as_bytes(), salt, &mut key[..])?;
    EnvelopeCipher::new_from_slice(&key[..])
        .map_err(|_| CipherError::Encoding("invalid derived key length".into()))
}

/// Run scrypt with the envelope cost parameters, filling `out`.
pub(crate) fn scrypt_into(password: &[u8], salt: &[u8], out: &mut [u8]) -> Result<(), CipherError> {
    let params = scrypt::Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, out.len())
        .map_err(|_| CipherError::Encoding("invalid scrypt parameters".into()))?;
    scrypt::scrypt(password, salt, &params, out)
        .map_err(|_| CipherError::Encoding("invalid scrypt output length".into()))
}
