//! Async positioned file I/O.
//!
//! All operations are position-based (pread/pwrite style); there is no
//! shared cursor. Reads past the current end of file return short results,
//! which callers treat as unwritten space, and writes may sparsely extend
//! the file.

mod error;
mod handle;
mod options;
mod std_io;

pub use error::{IoError, IoResult};
pub use handle::FileHandle;
pub use options::OpenOptions;
pub use std_io::StandardFile;
