//! The operation surface: requests' reply types.
//!
//! Every operation returns one of a small set of named outcomes. These are
//! routine protocol results that clients act on (retry with a newer epoch,
//! advance past a trimmed slot), so they are modeled as plain enums rather
//! than errors.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use flulog_common::types::{Epoch, Lpn};

/// A precondition violation by a buggy client.
///
/// Reported distinctly from the protocol outcomes; a bad request never
/// advances any node state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadRequest {
    /// LPN 0 is reserved and never addressable.
    ReservedLpn,
    /// Payload length differs from the configured page size.
    PayloadSize {
        /// The node's page size.
        expected: usize,
        /// The submitted payload length.
        actual: usize,
    },
    /// The slot for this LPN falls outside the configured memory bound.
    OutOfRange {
        /// The offending LPN.
        lpn: Lpn,
        /// The largest addressable LPN.
        max_lpn: Lpn,
    },
    /// Client epochs are strictly positive.
    ZeroEpoch,
}

impl fmt::Display for BadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReservedLpn => write!(f, "LPN 0 is reserved"),
            Self::PayloadSize { expected, actual } => {
                write!(f, "payload is {actual} bytes, page size is {expected}")
            }
            Self::OutOfRange { lpn, max_lpn } => {
                write!(f, "LPN {lpn} is out of range (max {max_lpn})")
            }
            Self::ZeroEpoch => write!(f, "epoch 0 is not a valid client epoch"),
        }
    }
}

/// Reply to a `write` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteReply {
    /// The page was committed.
    Written,
    /// The client's epoch is below the node's minimum.
    BadEpoch,
    /// The slot was already written or trimmed; pages are write-once.
    Overwritten,
    /// Precondition violation; no state was touched.
    BadRequest(BadRequest),
}

/// Reply to a `read` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadReply {
    /// The committed page payload.
    Page(Bytes),
    /// The client's epoch is below the node's minimum.
    BadEpoch,
    /// Nothing committed at this LPN.
    Unwritten,
    /// The page was trimmed or hole-filled.
    Trimmed,
    /// Precondition violation.
    BadRequest(BadRequest),
}

/// Reply to a `seal` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SealReply {
    /// The node is sealed; carries the largest LPN ever committed.
    Sealed(Lpn),
    /// The seal epoch is below the node's minimum.
    BadEpoch,
}

/// Reply to a `trim` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimReply {
    /// The written page is now trimmed.
    Done,
    /// The client's epoch is below the node's minimum.
    BadEpoch,
    /// Nothing to trim: the slot was never written.
    Unwritten,
    /// The slot was already trimmed.
    AlreadyTrimmed,
    /// Precondition violation; no state was touched.
    BadRequest(BadRequest),
}

/// Reply to a `fill` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillReply {
    /// The unwritten slot is now permanently empty.
    Done,
    /// The client's epoch is below the node's minimum.
    BadEpoch,
    /// The slot holds a committed page; fill never converts a written
    /// page into a trim.
    Overwritten,
    /// The slot was already trimmed.
    AlreadyTrimmed,
    /// Precondition violation; no state was touched.
    BadRequest(BadRequest),
}

/// Snapshot of the node's observable state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FluStatus {
    /// Minimum acceptable client epoch.
    pub min_epoch: Epoch,
    /// Size of one logical page in bytes.
    pub page_size: usize,
    /// Bound on the total slot region in bytes.
    pub max_mem: u64,
    /// Largest LPN ever committed-written.
    pub max_logical_page: Lpn,
    /// Largest LPN ever trimmed or filled.
    pub trim_watermark: Lpn,
}
