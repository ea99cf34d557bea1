use super::vault::{CredentialVault, EncryptedCredential, PlainCredential};
use super::CredentialError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Credential fields as read from the credential file.
///
/// Without a passcode the fields are taken as plaintext; with one, all three
/// must decrypt before a session may be opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCredential {
    pub host: String,
    pub user: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passcode: Option<String>,
}

impl RemoteCredential {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CredentialError> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|e| CredentialError::File {
            path: path_ref.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&contents).map_err(|e| CredentialError::File {
            path: path_ref.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn unlock(&self) -> Result<PlainCredential, CredentialError> {
        match self.passcode.as_deref().filter(|code| !code.is_empty()) {
            None => Ok(PlainCredential {
                host: self.host.clone(),
                user: self.user.clone(),
                password: self.password.clone(),
            }),
            Some(passcode) => {
                let sealed = EncryptedCredential {
                    cipher_host: self.host.clone(),
                    cipher_user: self.user.clone(),
                    cipher_password: self.password.clone(),
                    key: passcode.to_string(),
                };
                CredentialVault::decrypt(&sealed, passcode)
            }
        }
    }
}

impl From<EncryptedCredential> for RemoteCredential {
    fn from(sealed: EncryptedCredential) -> Self {
        Self {
            host: sealed.cipher_host,
            user: sealed.cipher_user,
            password: sealed.cipher_password,
            passcode: Some(sealed.key),
        }
    }
}
