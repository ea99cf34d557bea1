use super::ConnectionError;
use crate::telemetry::log::LogManager;
use std::io::Write;
use std::thread;
use std::time::Duration;

/// Capability set a remote file repository must expose.
pub trait RemoteTransport {
    /// Human-readable endpoint used in diagnostics.
    fn endpoint(&self) -> String;
    fn connect(&mut self) -> Result<(), ConnectionError>;
    /// Raw entry names under `path`.
    fn list(&mut self, path: &str) -> Result<Vec<String>, ConnectionError>;
    /// Streams the named file into `sink`, returning the byte count.
    fn retrieve(&mut self, name: &str, sink: &mut dyn Write) -> Result<u64, ConnectionError>;
    fn close(&mut self) -> Result<(), ConnectionError>;
}

impl<T: RemoteTransport + ?Sized> RemoteTransport for Box<T> {
    fn endpoint(&self) -> String {
        (**self).endpoint()
    }

    fn connect(&mut self) -> Result<(), ConnectionError> {
        (**self).connect()
    }

    fn list(&mut self, path: &str) -> Result<Vec<String>, ConnectionError> {
        (**self).list(path)
    }

    fn retrieve(&mut self, name: &str, sink: &mut dyn Write) -> Result<u64, ConnectionError> {
        (**self).retrieve(name, sink)
    }

    fn close(&mut self) -> Result<(), ConnectionError> {
        (**self).close()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
}

/// Bounded retry for the connect step. One attempt means no retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Exclusive owner of one authenticated connection.
pub struct RemoteSession<T: RemoteTransport> {
    transport: T,
    state: SessionState,
    retry: RetryPolicy,
    logger: LogManager,
}

impl<T: RemoteTransport> RemoteSession<T> {
    pub fn new(transport: T) -> Self {
        Self::with_retry(transport, RetryPolicy::default())
    }

    pub fn with_retry(transport: T, retry: RetryPolicy) -> Self {
        Self {
            transport,
            state: SessionState::Disconnected,
            retry,
            logger: LogManager::named("remote-session"),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Authenticates once; a no-op when already connected. Rejected logins
    /// are not retried.
    pub fn connect(&mut self) -> Result<(), ConnectionError> {
        if self.state == SessionState::Connected {
            return Ok(());
        }
        let attempts = self.retry.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.transport.connect() {
                Ok(()) => {
                    self.state = SessionState::Connected;
                    self.logger
                        .record(&format!("connected to {}", self.transport.endpoint()));
                    return Ok(());
                }
                Err(err) if attempt < attempts && !matches!(err, ConnectionError::Auth { .. }) => {
                    self.logger.warn(&format!(
                        "connect attempt {}/{} to {} failed: {}",
                        attempt,
                        attempts,
                        self.transport.endpoint(),
                        err
                    ));
                    thread::sleep(self.retry.backoff);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub fn list(&mut self, path: &str) -> Result<Vec<String>, ConnectionError> {
        self.ensure_connected()?;
        self.transport.list(path)
    }

    pub fn retrieve(&mut self, name: &str, sink: &mut dyn Write) -> Result<u64, ConnectionError> {
        self.ensure_connected()?;
        self.transport.retrieve(name, sink)
    }

    /// Releases the connection; a no-op when already disconnected.
    pub fn close(&mut self) -> Result<(), ConnectionError> {
        if self.state == SessionState::Disconnected {
            return Ok(());
        }
        self.state = SessionState::Disconnected;
        self.logger
            .record(&format!("logging out from {}", self.transport.endpoint()));
        self.transport.close()
    }

    fn ensure_connected(&self) -> Result<(), ConnectionError> {
        match self.state {
            SessionState::Connected => Ok(()),
            SessionState::Disconnected => Err(ConnectionError::NotConnected),
        }
    }
}

impl<T: RemoteTransport> Drop for RemoteSession<T> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            self.logger.warn(&format!("close on drop failed: {}", err));
        }
    }
}
