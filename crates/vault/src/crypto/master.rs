//! [`MasterSecret`]: process-wide root key material derived from `ENCRYPTION_KEY`.

use std::sync::{Arc, OnceLock};

use zeroize::Zeroize;

use super::cipher::{scrypt_into, CipherError, KEY_LEN};

/// Minimum accepted length of the raw secret, in characters.
pub const MIN_SECRET_CHARS: usize = 32;

/// Salt for the short-secret fallback derivation. Fixed so that the same raw
/// secret always yields the same master secret across processes.
const FALLBACK_SALT: &[u8] = b"delicious-plus-salt-v1";

static CACHED: OnceLock<MasterSecret> = OnceLock::new();

/// Key buffer zeroed on drop.
struct SecretBytes(Box<[u8; KEY_LEN]>);

impl Drop for SecretBytes {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Root key material. Cheap to clone; all clones share one buffer.
#[derive(Clone)]
pub struct MasterSecret {
    inner: Arc<SecretBytes>,
}

impl MasterSecret {
    fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self {
            inner: Arc::new(SecretBytes(Box::new(bytes))),
        }
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.inner.0[..]
    }
}

impl std::fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterSecret([REDACTED])")
    }
}

/// Derive the master secret from the operator-provided raw secret.
///
/// A raw secret whose UTF-8 encoding is at least [`KEY_LEN`] bytes is used
/// directly (its first [`KEY_LEN`] bytes). Anything shorter is stretched with
/// scrypt over a fixed salt.
///
/// # Errors
///
/// Returns [`CipherError::Configuration`] if `raw` is absent or shorter than
/// [`MIN_SECRET_CHARS`] characters.
pub fn derive_master_secret(raw: Option<&str>) -> Result<MasterSecret, CipherError> {
    let raw = check_raw(raw)?;

    let mut bytes = [0u8; KEY_LEN];
    let encoded = raw.as_bytes();
    if encoded.len() >= KEY_LEN {
        bytes.copy_from_slice(&encoded[..KEY_LEN]);
    } else {
        scrypt_into(encoded, FALLBACK_SALT, &mut bytes)?;
    }

    let secret = MasterSecret::from_bytes(bytes);
    bytes.zeroize();
    Ok(secret)
}

/// Reject a raw secret that is absent or shorter than [`MIN_SECRET_CHARS`].
pub(crate) fn check_raw(raw: Option<&str>) -> Result<&str, CipherError> {
    let raw = raw.ok_or_else(|| {
        CipherError::Configuration("ENCRYPTION_KEY is required".into())
    })?;

    if raw.chars().count() < MIN_SECRET_CHARS {
        return Err(CipherError::Configuration(format!(
            "ENCRYPTION_KEY must be at least {MIN_SECRET_CHARS} characters long"
        )));
    }
    Ok(raw)
}

/// Return the process-wide master secret, deriving it on first use.
///
/// The first successful derivation is cached for the lifetime of the process;
/// `raw` is ignored once a value is cached. Concurrent first callers may each
/// derive, but only one value is ever published.
///
/// # Errors
///
/// Returns [`CipherError::Configuration`] if nothing is cached yet and `raw`
/// is absent or too short.
pub fn master_secret(raw: Option<&str>) -> Result<MasterSecret, CipherError> {
    if let Some(cached) = CACHED.get() {
        return Ok(cached.clone());
    }
    let derived = derive_master_secret(raw)?;
    Ok(CACHED.get_or_init(|| derived).clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = "0123456789abcdef0123456789abcdef-extra";

    #[test]
    fn absent_secret_is_configuration_error() {
        let err = derive_master_secret(None).unwrap_err();
        assert!(matches!(err, CipherError::Configuration(_)));
    }

    #[test]
    fn short_secret_is_configuration_error() {
        let err = derive_master_secret(Some("too-short")).unwrap_err();
        assert!(matches!(err, CipherError::Configuration(_)));
    }

    #[test]
    fn long_secret_uses_first_32_bytes() {
        let secret = derive_master_secret(Some(RAW)).unwrap();
        assert_eq!(secret.as_bytes(), &RAW.as_bytes()[..KEY_LEN]);
    }

    #[test]
    fn multibyte_secret_counts_characters() {
        // 31 characters but more than 32 bytes: still too short.
        let raw: String = "é".repeat(31);
        assert!(raw.len() >= KEY_LEN);
        assert!(derive_master_secret(Some(&raw)).is_err());

        let raw: String = "é".repeat(32);
        let secret = derive_master_secret(Some(&raw)).unwrap();
        assert_eq!(secret.as_bytes(), &raw.as_bytes()[..KEY_LEN]);
    }

    #[test]
    fn derivation_is_deterministic() {
        let a = derive_master_secret(Some(RAW)).unwrap();
        let b = derive_master_secret(Some(RAW)).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn cached_secret_is_stable_across_calls() {
        let first = master_secret(Some(RAW)).unwrap();
        let second = master_secret(None).unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn cached_secret_is_shared_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| master_secret(Some(RAW)).unwrap()))
            .collect();
        let secrets: Vec<MasterSecret> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for s in &secrets[1..] {
            assert_eq!(s.as_bytes(), secrets[0].as_bytes());
        }
    }

    #[test]
    fn debug_is_redacted() {
        let secret = derive_master_secret(Some(RAW)).unwrap();
        let printed = format!("{secret:?}");
        assert!(printed.contains("REDACTED"));
        assert!(!printed.contains("0123456789"));
    }
}
