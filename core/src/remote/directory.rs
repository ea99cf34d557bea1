use super::session::RemoteTransport;
use super::ConnectionError;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;

/// A mounted directory standing in for the remote repository.
pub struct DirectoryTransport {
    root: PathBuf,
    connected: bool,
}

impl DirectoryTransport {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            connected: false,
        }
    }
}

impl RemoteTransport for DirectoryTransport {
    fn endpoint(&self) -> String {
        format!("file://{}", self.root.display())
    }

    fn connect(&mut self) -> Result<(), ConnectionError> {
        if !self.root.is_dir() {
            return Err(ConnectionError::Connect {
                endpoint: self.endpoint(),
                reason: "not a readable directory".into(),
            });
        }
        self.connected = true;
        Ok(())
    }

    fn list(&mut self, path: &str) -> Result<Vec<String>, ConnectionError> {
        let list_error = |reason: String| ConnectionError::List {
            path: path.to_string(),
            reason,
        };
        let dir = self.root.join(path);
        let mut names = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| list_error(e.to_string()))? {
            let entry = entry.map_err(|e| list_error(e.to_string()))?;
            if entry.path().is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn retrieve(&mut self, name: &str, sink: &mut dyn Write) -> Result<u64, ConnectionError> {
        let retrieve_error = |reason: String| ConnectionError::Retrieve {
            name: name.to_string(),
            reason,
        };
        let mut file = File::open(self.root.join(name)).map_err(|e| retrieve_error(e.to_string()))?;
        io::copy(&mut file, sink).map_err(|e| retrieve_error(e.to_string()))
    }

    fn close(&mut self) -> Result<(), ConnectionError> {
        self.connected = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lists_files_and_streams_contents() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.csv"), b"beta").unwrap();
        fs::write(dir.path().join("a.csv"), b"alpha").unwrap();
        fs::create_dir(dir.path().join("2020")).unwrap();

        let mut transport = DirectoryTransport::new(dir.path());
        transport.connect().unwrap();
        assert_eq!(transport.list("").unwrap(), vec!["a.csv", "b.csv"]);

        let mut sink = Vec::new();
        assert_eq!(transport.retrieve("b.csv", &mut sink).unwrap(), 4);
        assert_eq!(sink, b"beta");
    }

    #[test]
    fn missing_root_fails_to_connect() {
        let mut transport = DirectoryTransport::new("/definitely/not/here");
        assert!(matches!(
            transport.connect(),
            Err(ConnectionError::Connect { .. })
        ));
    }
}
