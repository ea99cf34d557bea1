pub mod file;
pub mod vault;

pub use file::RemoteCredential;
pub use vault::{CredentialVault, EncryptedCredential, PlainCredential};

/// Failures while unlocking remote-access credentials.
#[derive(thiserror::Error, Debug)]
pub enum CredentialError {
    #[error("malformed passcode: {0}")]
    MalformedKey(String),
    #[error("malformed ciphertext for {field}: {reason}")]
    MalformedCiphertext { field: &'static str, reason: String },
    #[error("{field} did not decrypt with the supplied passcode")]
    Rejected { field: &'static str },
    #[error("decrypted {field} is not valid UTF-8")]
    NotUtf8 { field: &'static str },
    #[error("encryption failed: {0}")]
    Encryption(String),
    #[error("credential file {path}: {reason}")]
    File { path: String, reason: String },
}
