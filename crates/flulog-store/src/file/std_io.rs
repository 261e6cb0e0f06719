//! Standard async file I/O implementation using tokio.
//!
//! Wraps a standard file and uses tokio's spawn_blocking for async
//! operations. Cross-platform and free of platform-specific flags.

use std::fs::File as StdFile;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task;

use super::error::{IoError, IoResult};
use super::handle::FileHandle;
use super::options::OpenOptions;

fn join_error(e: task::JoinError) -> IoError {
    IoError::Io {
        source: std::io::Error::other(e),
    }
}

/// Standard file implementation using tokio.
pub struct StandardFile {
    /// The underlying file, wrapped in a mutex for thread-safe access.
    file: Arc<Mutex<StdFile>>,
    /// The file path.
    path: PathBuf,
    /// Whether the file was opened with write access.
    writable: bool,
}

impl StandardFile {
    /// Opens a file with the specified options.
    pub async fn open(path: impl AsRef<Path>, options: OpenOptions) -> IoResult<Self> {
        let path = path.as_ref().to_path_buf();
        let path_clone = path.clone();
        let writable = options.is_write();

        let file = task::spawn_blocking(move || {
            options
                .to_std_options()
                .open(&path_clone)
                .map_err(|e| IoError::from_io_with_path(e, path_clone.clone()))
        })
        .await
        .map_err(join_error)??;

        Ok(Self {
            file: Arc::new(Mutex::new(file)),
            path,
            writable,
        })
    }
}

impl FileHandle for StandardFile {
    fn path(&self) -> &Path {
        &self.path
    }

    async fn size(&self) -> IoResult<u64> {
        let file = Arc::clone(&self.file);
        task::spawn_blocking(move || {
            let file = file.lock();
            file.metadata()
                .map(|m| m.len())
                .map_err(|e| IoError::Io { source: e })
        })
        .await
        .map_err(join_error)?
    }

    async fn read_at(&self, buf: &mut [u8], offset: u64) -> IoResult<usize> {
        let file = Arc::clone(&self.file);
        let len = buf.len();

        // Create a buffer we can send to the blocking task
        let mut owned_buf = vec![0u8; len];

        let (n, read_buf) = task::spawn_blocking(move || {
            let mut file = file.lock();
            file.seek(SeekFrom::Start(offset))
                .map_err(|e| IoError::Io { source: e })?;
            let mut total = 0;
            // Loop until EOF so short reads only ever mean end of file.
            while total < owned_buf.len() {
                let n = file
                    .read(&mut owned_buf[total..])
                    .map_err(|e| IoError::Io { source: e })?;
                if n == 0 {
                    break;
                }
                total += n;
            }
            Ok::<_, IoError>((total, owned_buf))
        })
        .await
        .map_err(join_error)??;

        buf[..n].copy_from_slice(&read_buf[..n]);
        Ok(n)
    }

    async fn write_at(&self, buf: &[u8], offset: u64) -> IoResult<usize> {
        if !self.writable {
            return Err(IoError::InvalidOperation {
                operation: "write",
                mode: "read-only",
            });
        }

        let file = Arc::clone(&self.file);
        let owned_buf = buf.to_vec();

        task::spawn_blocking(move || {
            let mut file = file.lock();
            file.seek(SeekFrom::Start(offset))
                .map_err(|e| IoError::Io { source: e })?;
            file.write(&owned_buf).map_err(|e| IoError::Io { source: e })
        })
        .await
        .map_err(join_error)?
    }

    async fn sync(&self) -> IoResult<()> {
        let file = Arc::clone(&self.file);
        task::spawn_blocking(move || {
            let file = file.lock();
            file.sync_all().map_err(|e| IoError::Io { source: e })
        })
        .await
        .map_err(join_error)?
    }

    async fn datasync(&self) -> IoResult<()> {
        let file = Arc::clone(&self.file);
        task::spawn_blocking(move || {
            let file = file.lock();
            file.sync_data().map_err(|e| IoError::Io { source: e })
        })
        .await
        .map_err(join_error)?
    }

    async fn set_len(&self, size: u64) -> IoResult<()> {
        if !self.writable {
            return Err(IoError::InvalidOperation {
                operation: "set_len",
                mode: "read-only",
            });
        }

        let file = Arc::clone(&self.file);
        task::spawn_blocking(move || {
            let file = file.lock();
            file.set_len(size).map_err(|e| IoError::Io { source: e })
        })
        .await
        .map_err(join_error)?
    }
}

impl std::fmt::Debug for StandardFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandardFile")
            .field("path", &self.path)
            .field("writable", &self.writable)
            .finish()
    }
}
