//! # flulog-common
//!
//! Common types and constants for the flulog storage node.
//!
//! This crate provides the foundational vocabulary shared by the storage
//! and node crates:
//!
//! - **Types**: the `Lpn` and `Epoch` identifier newtypes
//! - **Constants**: slot layout sizes, default geometry, and file names
//!
//! ## Example
//!
//! ```rust
//! use flulog_common::types::{Epoch, Lpn};
//!
//! let lpn = Lpn::new(42);
//! assert!(lpn.is_valid());
//!
//! let epoch = Epoch::new(1);
//! assert_eq!(epoch.next(), Epoch::new(2));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use types::{Epoch, Lpn};
