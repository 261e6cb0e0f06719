//! # flulog-node
//!
//! A single storage node of a CORFU-style distributed shared log: a FLU
//! (flash log unit) owning a contiguous space of fixed-size logical pages.
//!
//! The node exports a narrow set of epoch-gated operations - write, read,
//! trim, fill, seal - that higher-layer sequencers and clients compose into
//! a global totally-ordered log. Pages are write-once: a slot moves from
//! unwritten to written (or straight to trimmed via hole-fill) and can then
//! only be trimmed, never rewritten. Clients stamp every request with an
//! epoch; sealing the node at an epoch fences out all older traffic.
//!
//! Durability rests on two mechanisms: the per-slot tail-marker, which makes
//! a crash mid-write detectable (the slot reads as unwritten), and the hard
//! state record, replaced atomically via write-to-tmp plus rename. The
//! largest committed page number is deliberately not persisted; it is
//! reconstructed at startup by scanning slot prefixes.
//!
//! ## Example
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use flulog_common::types::{Epoch, Lpn};
//! use flulog_node::{Flu, FluConfig, WriteReply};
//!
//! # async fn example() -> flulog_node::FluResult<()> {
//! let flu = Flu::spawn(FluConfig::new("data/flu")).await?;
//!
//! let reply = flu
//!     .write(Epoch::new(1), Lpn::new(1), Bytes::from_static(b"ABCDEFGH"))
//!     .await?;
//! assert_eq!(reply, WriteReply::Written);
//!
//! flu.stop().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod dispatcher;
pub mod epoch;
pub mod error;
pub mod flu;
pub mod hard_state;
pub mod ops;
pub mod recovery;

pub use config::FluConfig;
pub use dispatcher::Flu;
pub use error::{FluError, FluResult};
pub use ops::{
    BadRequest, FillReply, FluStatus, ReadReply, SealReply, TrimReply, WriteReply,
};
