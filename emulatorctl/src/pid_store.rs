//! Where the supervisor remembers which process serves which port.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum PidStoreError {
    #[error("PID file {path} is not accessible: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("PID file {path} does not contain a process id: {content:?}")]
    Corrupt { path: PathBuf, content: String },
}

pub trait PidStore {
    fn read(&self, port: u16) -> Result<Option<u32>, PidStoreError>;
    /// Records `pid` for `port`, replacing any previous record.
    fn write(&self, port: u16, pid: u32) -> Result<(), PidStoreError>;
    /// Forgets the record for `port`; a missing record is not an error.
    fn remove(&self, port: u16) -> Result<(), PidStoreError>;
}

/// One `pid-<port>` file per port under a state directory.
///
/// There is no locking: two concurrent writers for the same port race and
/// the last one wins.
#[derive(Debug, Clone)]
pub struct FilePidStore {
    dir: PathBuf,
}

impl FilePidStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, port: u16) -> PathBuf {
        self.dir.join(format!("pid-{}", port))
    }

    fn io_error(path: &Path, source: io::Error) -> PidStoreError {
        PidStoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl PidStore for FilePidStore {
    fn read(&self, port: u16) -> Result<Option<u32>, PidStoreError> {
        let path = self.path_for(port);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(Self::io_error(&path, err)),
        };

        content
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| PidStoreError::Corrupt { path, content })
    }

    fn write(&self, port: u16, pid: u32) -> Result<(), PidStoreError> {
        fs::create_dir_all(&self.dir).map_err(|err| Self::io_error(&self.dir, err))?;

        let path = self.path_for(port);
        let mut file =
            NamedTempFile::new_in(&self.dir).map_err(|err| Self::io_error(&self.dir, err))?;
        write!(file, "{}", pid).map_err(|err| Self::io_error(file.path(), err))?;
        file.persist(&path)
            .map_err(|err| Self::io_error(&path, err.error))?;

        debug!(port, pid, path = %path.display(), "Recorded PID");
        Ok(())
    }

    fn remove(&self, port: u16) -> Result<(), PidStoreError> {
        let path = self.path_for(port);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(port, path = %path.display(), "Removed PID file");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Self::io_error(&path, err)),
        }
    }
}
