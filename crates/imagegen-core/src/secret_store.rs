//! API key storage: OS keyring first, locally encrypted files as fallback.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use keyring::Entry;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::config_directory;

const SERVICE_NAME: &str = "com.imagegen.app";
const MASTER_KEY_FILE: &str = "secret.key";
const ACCOUNT_PREFIX: &str = "imagegen-";
const FALLBACK_DIR: &str = "secrets";
const NONCE_LEN: usize = 12;

/// Reference to a persisted secret, allowing retrieval from the backing store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "backend", rename_all = "kebab-case")]
pub enum SecretReference {
    /// Secret is stored in the host operating system's secure keyring.
    Keyring { account: String },
    /// Secret is stored in config.toml encrypted with the local master key.
    LocalEncrypted { nonce: String, ciphertext: String },
}

#[derive(Debug, Error)]
pub enum SecretStoreError {
    #[error("keyring operation failed: {0}")]
    Keyring(String),
    #[error("local encryption failed: {0}")]
    Crypto(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Encrypted copy kept next to a keyring entry, used when the keyring is unreachable.
#[derive(Debug, Serialize, Deserialize)]
struct SealedSecret {
    nonce: String,
    ciphertext: String,
}

impl SealedSecret {
    fn seal(plaintext: &str) -> Result<Self, SecretStoreError> {
        let (nonce, ciphertext) = encrypt_with_local_key(plaintext.as_bytes())?;
        Ok(Self {
            nonce: STANDARD.encode(nonce),
            ciphertext: STANDARD.encode(ciphertext),
        })
    }

    fn open(&self) -> Result<String, SecretStoreError> {
        open_sealed(&self.nonce, &self.ciphertext)
    }
}

fn open_sealed(nonce: &str, ciphertext: &str) -> Result<String, SecretStoreError> {
    let nonce_bytes = STANDARD.decode(nonce)?;
    let cipher_bytes = STANDARD.decode(ciphertext)?;
    let plaintext = decrypt_with_local_key(&nonce_bytes, &cipher_bytes)?;
    Ok(String::from_utf8_lossy(&plaintext).to_string())
}

fn label_from_account(account: &str) -> &str {
    account.strip_prefix(ACCOUNT_PREFIX).unwrap_or(account)
}

fn fallback_path(label: &str) -> PathBuf {
    config_directory()
        .join(FALLBACK_DIR)
        .join(format!("{label}.json"))
}

fn write_fallback(label: &str, secret: &str) -> Result<(), SecretStoreError> {
    let sealed = SealedSecret::seal(secret)?;
    let path = fallback_path(label);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string(&sealed)?)?;
    Ok(())
}

fn read_fallback(label: &str) -> Result<Option<String>, SecretStoreError> {
    let raw = match fs::read_to_string(fallback_path(label)) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let sealed: SealedSecret = serde_json::from_str(&raw)?;
    sealed.open().map(Some)
}

fn remove_fallback(label: &str) -> Result<(), SecretStoreError> {
    match fs::remove_file(fallback_path(label)) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Fall back to the encrypted copy after a keyring failure.
fn recover_from_fallback(
    label: &str,
    keyring_error: String,
) -> Result<Option<String>, SecretStoreError> {
    warn!(label, error = %keyring_error, "keyring read failed; trying encrypted fallback");
    match read_fallback(label)? {
        Some(secret) => Ok(Some(secret)),
        None => Err(SecretStoreError::Keyring(keyring_error)),
    }
}

/// Persist a secret using the most secure backend available.
pub fn store_secret(label: &str, secret: &str) -> Result<SecretReference, SecretStoreError> {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return Err(SecretStoreError::Crypto(
            "cannot store empty secret".to_string(),
        ));
    }

    let account = format!("{ACCOUNT_PREFIX}{label}");
    match Entry::new(SERVICE_NAME, &account).and_then(|entry| entry.set_password(trimmed)) {
        Ok(()) => {
            if let Err(err) = write_fallback(label, trimmed) {
                warn!(label, error = %err, "failed to persist fallback secret");
            }
            debug!(label, "secret stored in keyring");
            return Ok(SecretReference::Keyring { account });
        }
        Err(err) => {
            warn!(label, error = %err, "keyring unavailable; using local encryption");
        }
    }

    let sealed = SealedSecret::seal(trimmed)?;
    if let Err(err) = remove_fallback(label) {
        warn!(label, error = %err, "failed to remove stale fallback secret");
    }
    Ok(SecretReference::LocalEncrypted {
        nonce: sealed.nonce,
        ciphertext: sealed.ciphertext,
    })
}

/// Retrieve a secret based on the stored reference.
pub fn load_secret(reference: &SecretReference) -> Result<Option<String>, SecretStoreError> {
    let account = match reference {
        SecretReference::LocalEncrypted { nonce, ciphertext } => {
            return open_sealed(nonce, ciphertext).map(Some);
        }
        SecretReference::Keyring { account } => account,
    };

    let label = label_from_account(account);
    let entry = match Entry::new(SERVICE_NAME, account) {
        Ok(entry) => entry,
        Err(err) => return recover_from_fallback(label, err.to_string()),
    };

    match entry.get_password() {
        Ok(value) if !value.trim().is_empty() => {
            if !fallback_path(label).exists() {
                if let Err(err) = write_fallback(label, &value) {
                    warn!(label, error = %err, "failed to create fallback secret");
                }
            }
            Ok(Some(value))
        }
        Ok(_) => read_fallback(label),
        Err(keyring::Error::NoEntry) => {
            debug!(label, "keyring entry missing; checking encrypted fallback");
            read_fallback(label)
        }
        Err(err) => recover_from_fallback(label, err.to_string()),
    }
}

/// Delete a secret from its backing store.
pub fn delete_secret(reference: &SecretReference) -> Result<(), SecretStoreError> {
    let SecretReference::Keyring { account } = reference else {
        return Ok(());
    };

    let entry = Entry::new(SERVICE_NAME, account)
        .map_err(|err| SecretStoreError::Keyring(err.to_string()))?;
    match entry.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => {}
        Err(err) => return Err(SecretStoreError::Keyring(err.to_string())),
    }
    remove_fallback(label_from_account(account))
}

fn encrypt_with_local_key(
    plaintext: &[u8],
) -> Result<([u8; NONCE_LEN], Vec<u8>), SecretStoreError> {
    let cipher = local_cipher()?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rng().fill_bytes(&mut nonce_bytes);

    let ciphertext = cipher
        .encrypt(&Nonce::from(nonce_bytes), plaintext)
        .map_err(|err| SecretStoreError::Crypto(err.to_string()))?;
    Ok((nonce_bytes, ciphertext))
}

fn decrypt_with_local_key(nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, SecretStoreError> {
    let nonce: [u8; NONCE_LEN] = nonce.try_into().map_err(|_| {
        SecretStoreError::Crypto("invalid nonce length for chacha20poly1305".to_string())
    })?;
    local_cipher()?
        .decrypt(&Nonce::from(nonce), ciphertext)
        .map_err(|err| SecretStoreError::Crypto(err.to_string()))
}

fn local_cipher() -> Result<ChaCha20Poly1305, SecretStoreError> {
    let key = get_or_create_master_key()?;
    ChaCha20Poly1305::new_from_slice(&key).map_err(|err| SecretStoreError::Crypto(err.to_string()))
}

fn get_or_create_master_key() -> Result<[u8; 32], SecretStoreError> {
    let path = config_directory().join(MASTER_KEY_FILE);
    if path.exists() {
        let bytes = fs::read(&path)?;
        if let Ok(key) = <[u8; 32]>::try_from(bytes.as_slice()) {
            return Ok(key);
        }
        warn!(
            path = %path.display(),
            len = bytes.len(),
            "master key has unexpected length; regenerating"
        );
    }

    let mut key = [0u8; 32];
    rand::rng().fill_bytes(&mut key);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    write_key_file(&path, &key)?;
    Ok(key)
}

fn write_key_file(path: &Path, key: &[u8]) -> Result<(), SecretStoreError> {
    let mut file = fs::File::create(path)?;
    file.write_all(key)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_from_account() {
        assert_eq!(label_from_account("imagegen-default_api_key"), "default_api_key");
        assert_eq!(label_from_account("other"), "other");
    }

    #[test]
    fn test_reference_serializes_with_backend_tag() {
        let reference = SecretReference::Keyring {
            account: "imagegen-default_api_key".to_string(),
        };
        let value = serde_json::to_value(&reference).unwrap();
        assert_eq!(value["backend"], "keyring");
        assert_eq!(value["account"], "imagegen-default_api_key");
    }

    #[test]
    fn test_store_rejects_empty_secret() {
        assert!(matches!(
            store_secret("empty", "   "),
            Err(SecretStoreError::Crypto(_))
        ));
    }
}
