//! File handle trait.

use std::path::Path;

use super::error::{IoError, IoResult};

/// Trait for asynchronous positioned file operations.
///
/// All operations are position-based (pread/pwrite style) so that a single
/// handle can serve interleaved reads and writes without a shared cursor.
#[allow(async_fn_in_trait)]
pub trait FileHandle: Send + Sync {
    /// Returns the file path.
    fn path(&self) -> &Path;

    /// Returns the current file size.
    async fn size(&self) -> IoResult<u64>;

    /// Reads data from the file at the specified offset.
    ///
    /// Returns the number of bytes read. May return less than the buffer
    /// size if EOF is reached.
    async fn read_at(&self, buf: &mut [u8], offset: u64) -> IoResult<usize>;

    /// Reads exactly `buf.len()` bytes from the file at the specified offset.
    ///
    /// Returns an error if EOF is reached before the buffer is filled.
    async fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> IoResult<()> {
        let mut total_read = 0;
        while total_read < buf.len() {
            let n = self
                .read_at(&mut buf[total_read..], offset + total_read as u64)
                .await?;
            if n == 0 {
                return Err(IoError::short_read(buf.len(), total_read));
            }
            total_read += n;
        }
        Ok(())
    }

    /// Writes data to the file at the specified offset.
    ///
    /// Returns the number of bytes written. Writing past the current end
    /// of file extends it (sparsely where the filesystem supports it).
    async fn write_at(&self, buf: &[u8], offset: u64) -> IoResult<usize>;

    /// Writes all bytes to the file at the specified offset.
    ///
    /// Returns an error if not all bytes could be written.
    async fn write_all_at(&self, buf: &[u8], offset: u64) -> IoResult<()> {
        let mut total_written = 0;
        while total_written < buf.len() {
            let n = self
                .write_at(&buf[total_written..], offset + total_written as u64)
                .await?;
            if n == 0 {
                return Err(IoError::short_write(buf.len(), total_written));
            }
            total_written += n;
        }
        Ok(())
    }

    /// Syncs all data and metadata to disk.
    async fn sync(&self) -> IoResult<()>;

    /// Syncs only data (not metadata) to disk.
    async fn datasync(&self) -> IoResult<()>;

    /// Truncates or extends the file to the specified size.
    async fn set_len(&self, size: u64) -> IoResult<()>;
}
