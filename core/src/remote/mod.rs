pub mod directory;
pub mod ftp;
pub mod naming;
pub mod session;
pub mod sync;

pub use directory::DirectoryTransport;
pub use ftp::FtpTransport;
pub use naming::RemoteFileRecord;
pub use session::{RemoteSession, RemoteTransport, RetryPolicy, SessionState};
pub use sync::{RemoteSync, SyncReport};

/// Network or authentication failures against a remote repository.
#[derive(thiserror::Error, Debug)]
pub enum ConnectionError {
    #[error("connecting to {endpoint} failed: {reason}")]
    Connect { endpoint: String, reason: String },
    #[error("authentication as {user} failed: {reason}")]
    Auth { user: String, reason: String },
    #[error("session is not connected")]
    NotConnected,
    #[error("listing {path} failed: {reason}")]
    List { path: String, reason: String },
    #[error("retrieving {name} failed: {reason}")]
    Retrieve { name: String, reason: String },
    #[error("closing session failed: {0}")]
    Close(String),
}

/// Joins a remote directory and an entry name with `/`.
pub(crate) fn remote_path(root: &str, name: &str) -> String {
    let root = root.trim_end_matches('/');
    if root.is_empty() || root == "." {
        name.to_string()
    } else {
        format!("{}/{}", root, name)
    }
}
