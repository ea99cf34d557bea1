use super::session::RemoteTransport;
use super::ConnectionError;
use crate::credentials::PlainCredential;
use std::io::{self, Write};
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream};

pub const DEFAULT_FTP_PORT: u16 = 21;

/// Passive-mode FTP access to the HamSci Grape repository.
pub struct FtpTransport {
    credential: PlainCredential,
    port: u16,
    timeout: Duration,
    stream: Option<FtpStream>,
}

impl FtpTransport {
    pub fn new(credential: PlainCredential, port: u16, timeout: Duration) -> Self {
        Self {
            credential,
            port,
            timeout,
            stream: None,
        }
    }

    fn resolve(&self) -> Result<SocketAddr, ConnectionError> {
        let unreachable = |reason: String| ConnectionError::Connect {
            endpoint: self.endpoint(),
            reason,
        };
        (self.credential.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| unreachable(e.to_string()))?
            .next()
            .ok_or_else(|| unreachable("host resolved to no addresses".into()))
    }

    fn stream(&mut self) -> Result<&mut FtpStream, ConnectionError> {
        self.stream.as_mut().ok_or(ConnectionError::NotConnected)
    }
}

impl RemoteTransport for FtpTransport {
    fn endpoint(&self) -> String {
        format!("ftp://{}:{}", self.credential.host, self.port)
    }

    fn connect(&mut self) -> Result<(), ConnectionError> {
        if self.stream.is_some() {
            return Ok(());
        }
        let addr = self.resolve()?;
        let connect_error = |reason: String| ConnectionError::Connect {
            endpoint: self.endpoint(),
            reason,
        };
        let mut stream =
            FtpStream::connect_timeout(addr, self.timeout).map_err(|e| connect_error(e.to_string()))?;
        stream
            .get_ref()
            .set_read_timeout(Some(self.timeout))
            .map_err(|e| connect_error(e.to_string()))?;
        stream
            .login(self.credential.user.as_str(), self.credential.password.as_str())
            .map_err(|e| ConnectionError::Auth {
                user: self.credential.user.clone(),
                reason: e.to_string(),
            })?;
        stream
            .transfer_type(FileType::Binary)
            .map_err(|e| connect_error(e.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }

    fn list(&mut self, path: &str) -> Result<Vec<String>, ConnectionError> {
        let target = if path.is_empty() { None } else { Some(path) };
        self.stream()?
            .nlst(target)
            .map_err(|e| ConnectionError::List {
                path: path.to_string(),
                reason: e.to_string(),
            })
    }

    fn retrieve(&mut self, name: &str, sink: &mut dyn Write) -> Result<u64, ConnectionError> {
        let retrieve_error = |reason: String| ConnectionError::Retrieve {
            name: name.to_string(),
            reason,
        };
        self.stream()?
            .retr(name, |reader| io::copy(reader, &mut *sink).map_err(FtpError::ConnectionError))
            .map_err(|e| retrieve_error(e.to_string()))
    }

    fn close(&mut self) -> Result<(), ConnectionError> {
        match self.stream.take() {
            Some(mut stream) => stream
                .quit()
                .map_err(|e| ConnectionError::Close(e.to_string())),
            None => Ok(()),
        }
    }
}
