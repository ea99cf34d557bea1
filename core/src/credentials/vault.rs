//! Symmetric protection of remote-access credentials at rest.
//!
//! Every field is sealed with ChaCha20-Poly1305 under a freshly generated
//! 256-bit passcode. A sealed field is the URL-safe base64 encoding of
//! `nonce (12 bytes) || ciphertext || tag (16 bytes)`; the passcode is the
//! URL-safe base64 encoding of the raw key.

use super::CredentialError;
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Size of ChaCha20-Poly1305 nonce in bytes
pub const NONCE_SIZE: usize = 12;
/// Size of the passcode key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// Cleartext connection credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct PlainCredential {
    pub host: String,
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for PlainCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlainCredential")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Sealed credential fields plus the passcode that unlocks them.
///
/// The credential file stores the passcode next to the ciphertexts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedCredential {
    #[serde(rename = "host")]
    pub cipher_host: String,
    #[serde(rename = "user")]
    pub cipher_user: String,
    #[serde(rename = "password")]
    pub cipher_password: String,
    #[serde(rename = "passcode")]
    pub key: String,
}

impl EncryptedCredential {
    /// Persists the sealed fields and passcode as a credential file.
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<(), CredentialError> {
        let path = path.as_ref();
        let file_error = |reason: String| CredentialError::File {
            path: path.display().to_string(),
            reason,
        };
        // BTreeMap keeps the keys sorted in the written file.
        let fields: std::collections::BTreeMap<&str, &str> = [
            ("host", self.cipher_host.as_str()),
            ("password", self.cipher_password.as_str()),
            ("passcode", self.key.as_str()),
            ("user", self.cipher_user.as_str()),
        ]
        .into_iter()
        .collect();
        let body = serde_json::to_string_pretty(&fields).map_err(|e| file_error(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| file_error(e.to_string()))?;
        }
        std::fs::write(path, body).map_err(|e| file_error(e.to_string()))
    }
}

/// Owns the cipher for one passcode.
pub struct CredentialVault {
    cipher: ChaCha20Poly1305,
}

impl CredentialVault {
    /// Builds a vault from an encoded passcode.
    pub fn from_passcode(passcode: &str) -> Result<Self, CredentialError> {
        let raw = URL_SAFE
            .decode(passcode.trim())
            .map_err(|e| CredentialError::MalformedKey(e.to_string()))?;
        if raw.len() != KEY_SIZE {
            return Err(CredentialError::MalformedKey(format!(
                "expected {} key bytes, got {}",
                KEY_SIZE,
                raw.len()
            )));
        }
        Ok(Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(&raw)),
        })
    }

    /// Seals all three fields under a freshly generated passcode.
    pub fn encrypt(host: &str, user: &str, password: &str) -> Result<EncryptedCredential, CredentialError> {
        let mut raw = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut raw);
        let key = URL_SAFE.encode(raw);
        let vault = Self::from_passcode(&key)?;
        Ok(EncryptedCredential {
            cipher_host: vault.seal(host)?,
            cipher_user: vault.seal(user)?,
            cipher_password: vault.seal(password)?,
            key,
        })
    }

    /// Opens all three fields or none of them.
    pub fn decrypt(fields: &EncryptedCredential, passcode: &str) -> Result<PlainCredential, CredentialError> {
        let vault = Self::from_passcode(passcode)?;
        let host = vault.open("host", &fields.cipher_host)?;
        let user = vault.open("user", &fields.cipher_user)?;
        let password = vault.open("password", &fields.cipher_password)?;
        Ok(PlainCredential {
            host,
            user,
            password,
        })
    }

    fn seal(&self, plaintext: &str) -> Result<String, CredentialError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CredentialError::Encryption("cipher rejected plaintext".into()))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(URL_SAFE.encode(out))
    }

    fn open(&self, field: &'static str, sealed: &str) -> Result<String, CredentialError> {
        let data = URL_SAFE
            .decode(sealed.trim())
            .map_err(|e| CredentialError::MalformedCiphertext {
                field,
                reason: e.to_string(),
            })?;
        if data.len() < NONCE_SIZE {
            return Err(CredentialError::MalformedCiphertext {
                field,
                reason: "data too short for nonce".into(),
            });
        }
        let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CredentialError::Rejected { field })?;
        String::from_utf8(plaintext).map_err(|_| CredentialError::NotUtf8 { field })
    }
}
