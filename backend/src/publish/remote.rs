//! Remote file store: the seam between the upload stage and FTP.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream, Status};

use crate::config::{Config, FTP_CONNECT_TIMEOUT, FTP_IO_TIMEOUT};
use crate::error::{RemoteError, RemoteResult};

/// Operations the upload stage needs from a remote file store.
///
/// Paths are `/`-separated and relative to the login directory.
pub trait RemoteStore {
    /// Create one directory. Fails with [`RemoteError::AlreadyExists`] when it exists.
    fn make_dir(&mut self, path: &str) -> RemoteResult<()>;

    /// Upload a local file to `remote_path`, overwriting.
    fn store(&mut self, remote_path: &str, local: &Path) -> RemoteResult<()>;

    /// Delete one file.
    fn delete(&mut self, remote_path: &str) -> RemoteResult<()>;
}

impl<S: RemoteStore + ?Sized> RemoteStore for &mut S {
    fn make_dir(&mut self, path: &str) -> RemoteResult<()> {
        (**self).make_dir(path)
    }

    fn store(&mut self, remote_path: &str, local: &Path) -> RemoteResult<()> {
        (**self).store(remote_path, local)
    }

    fn delete(&mut self, remote_path: &str) -> RemoteResult<()> {
        (**self).delete(remote_path)
    }
}

// =============================================================================
// FTP
// =============================================================================

/// Binary-mode FTP session. Sends `QUIT` when dropped.
pub struct FtpStore {
    stream: FtpStream,
}

impl FtpStore {
    /// Dial, log in and switch to binary mode.
    pub fn connect(addr: &str, user: &str, password: &str) -> RemoteResult<Self> {
        let socket = resolve(addr)?;
        let connect_err = |e: FtpError| RemoteError::Connect {
            addr: addr.to_string(),
            message: e.to_string(),
        };

        let mut stream = FtpStream::connect_timeout(socket, FTP_CONNECT_TIMEOUT).map_err(connect_err)?;
        set_timeouts(&stream, FTP_IO_TIMEOUT).map_err(|e| RemoteError::Connect {
            addr: addr.to_string(),
            message: e.to_string(),
        })?;

        stream
            .login(user, password)
            .map_err(|e| RemoteError::Login(e.to_string()))?;
        stream.transfer_type(FileType::Binary).map_err(connect_err)?;

        Ok(Self { stream })
    }

    pub fn from_config(config: &Config) -> RemoteResult<Self> {
        Self::connect(&config.ftp_addr(), &config.ftp_user, &config.ftp_password)
    }
}

fn resolve(addr: &str) -> RemoteResult<SocketAddr> {
    addr.to_socket_addrs()
        .map_err(|e| RemoteError::Connect {
            addr: addr.to_string(),
            message: e.to_string(),
        })?
        .next()
        .ok_or_else(|| RemoteError::Connect {
            addr: addr.to_string(),
            message: "address did not resolve".to_string(),
        })
}

fn set_timeouts(stream: &FtpStream, timeout: Duration) -> std::io::Result<()> {
    let tcp = stream.get_ref();
    tcp.set_read_timeout(Some(timeout))?;
    tcp.set_write_timeout(Some(timeout))
}

fn command_err(path: &str, e: FtpError) -> RemoteError {
    RemoteError::Command {
        path: path.to_string(),
        message: e.to_string(),
    }
}

impl RemoteStore for FtpStore {
    fn make_dir(&mut self, path: &str) -> RemoteResult<()> {
        match self.stream.mkdir(path) {
            Ok(()) => Ok(()),
            Err(FtpError::UnexpectedResponse(resp)) if resp.status == Status::FileUnavailable => {
                Err(RemoteError::AlreadyExists(path.to_string()))
            }
            Err(e) => Err(command_err(path, e)),
        }
    }

    fn store(&mut self, remote_path: &str, local: &Path) -> RemoteResult<()> {
        let mut file = File::open(local)?;
        self.stream
            .put_file(remote_path, &mut file)
            .map(|_| ())
            .map_err(|e| command_err(remote_path, e))
    }

    fn delete(&mut self, remote_path: &str) -> RemoteResult<()> {
        self.stream.rm(remote_path).map_err(|e| command_err(remote_path, e))
    }
}

impl Drop for FtpStore {
    fn drop(&mut self) {
        let _ = self.stream.quit();
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// Store that keeps everything in memory. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub dirs: BTreeSet<String>,
    /// Remote path → uploaded bytes.
    pub files: BTreeMap<String, Vec<u8>>,
    /// Every successful delete, in order.
    pub deleted: Vec<String>,
    /// Remote paths whose upload or delete should fail.
    pub failing: BTreeSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make operations on `path` fail.
    pub fn fail_on(mut self, path: impl Into<String>) -> Self {
        self.failing.insert(path.into());
        self
    }

    fn check(&self, path: &str) -> RemoteResult<()> {
        if self.failing.contains(path) {
            return Err(RemoteError::Command {
                path: path.to_string(),
                message: "550 simulated failure".to_string(),
            });
        }
        Ok(())
    }
}

impl RemoteStore for MemoryStore {
    fn make_dir(&mut self, path: &str) -> RemoteResult<()> {
        self.check(path)?;
        if !self.dirs.insert(path.to_string()) {
            return Err(RemoteError::AlreadyExists(path.to_string()));
        }
        Ok(())
    }

    fn store(&mut self, remote_path: &str, local: &Path) -> RemoteResult<()> {
        self.check(remote_path)?;
        let bytes = fs::read(local)?;
        self.files.insert(remote_path.to_string(), bytes);
        Ok(())
    }

    fn delete(&mut self, remote_path: &str) -> RemoteResult<()> {
        self.check(remote_path)?;
        if self.files.remove(remote_path).is_none() {
            return Err(RemoteError::Command {
                path: remote_path.to_string(),
                message: "550 no such file".to_string(),
            });
        }
        self.deleted.push(remote_path.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_store_semantics() {
        let dir = tempdir().unwrap();
        let local = dir.path().join("a.jpg");
        fs::write(&local, b"jpeg").unwrap();

        let mut store = MemoryStore::new();
        store.make_dir("GoodsColor").unwrap();
        assert!(matches!(store.make_dir("GoodsColor"), Err(RemoteError::AlreadyExists(_))));

        store.store("GoodsColor/a.jpg", &local).unwrap();
        assert_eq!(store.files["GoodsColor/a.jpg"], b"jpeg");

        store.delete("GoodsColor/a.jpg").unwrap();
        assert!(store.delete("GoodsColor/a.jpg").is_err());
        assert_eq!(store.deleted, vec!["GoodsColor/a.jpg"]);
    }

    #[test]
    fn test_memory_store_failures() {
        let dir = tempdir().unwrap();
        let local = dir.path().join("a.jpg");
        fs::write(&local, b"jpeg").unwrap();

        let mut store = MemoryStore::new().fail_on("x/a.jpg");
        assert!(store.store("x/a.jpg", &local).is_err());
        assert!(store.store("x/b.jpg", &dir.path().join("missing.jpg")).is_err());
        assert!(store.files.is_empty());
    }

    #[test]
    fn test_ftp_connect_refused() {
        // Port 1 on loopback is closed on any sane test host
        let err = FtpStore::connect("127.0.0.1:1", "user", "pass").err().unwrap();
        assert!(matches!(err, RemoteError::Connect { .. }));
    }

    #[test]
    fn test_unresolvable_address() {
        let err = FtpStore::connect("not an address", "u", "p").err().unwrap();
        assert!(matches!(err, RemoteError::Connect { .. }));
    }
}
