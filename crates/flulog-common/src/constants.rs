//! System-wide constants for flulog.
//!
//! This module defines the on-disk layout sizes, default geometry, and
//! file names used across the node.

// =============================================================================
// Slot Layout Constants
// =============================================================================

/// Size of the slot status byte.
pub const SLOT_STATUS_SIZE: usize = 1;

/// Size of the stored-LPN field (big-endian u64).
pub const SLOT_LPN_SIZE: usize = 8;

/// Size of the slot prefix: status byte plus stored LPN.
///
/// Recovery reads exactly this much of every slot, which is why the
/// status and the LPN echo sit in front of the payload.
pub const SLOT_PREFIX_SIZE: usize = SLOT_STATUS_SIZE + SLOT_LPN_SIZE;

/// Size of the tail-marker byte written after the payload.
pub const SLOT_TRAILER_SIZE: usize = 1;

/// Total per-slot overhead around the payload.
pub const SLOT_OVERHEAD: usize = SLOT_PREFIX_SIZE + SLOT_TRAILER_SIZE;

// =============================================================================
// Geometry Defaults
// =============================================================================

/// Default page size in bytes.
pub const DEFAULT_PAGE_SIZE: usize = 8;

/// Default bound on the total slot region (64 MiB).
pub const DEFAULT_MAX_MEM: u64 = 64 * 1024 * 1024;

// =============================================================================
// Hard State
// =============================================================================

/// Magic number for the hard-state file.
pub const HARD_STATE_MAGIC: u32 = 0x464C_5548; // "FLUH" in ASCII

/// Version of the hard-state file format.
pub const HARD_STATE_VERSION: u32 = 1;

/// Name of the hard-state file inside the node directory.
pub const HARD_STATE_FILE: &str = "hard-state";

/// Name of the temporary file the hard state is staged in before rename.
pub const HARD_STATE_TMP: &str = "hard-state.tmp";

/// Name of the page file inside the node directory.
pub const MEM_FILE: &str = "memfile";

// =============================================================================
// Flush Policy
// =============================================================================

/// Number of successful trim/fill operations between hard-state flushes.
pub const TRIM_FLUSH_INTERVAL: u64 = 1000;

// =============================================================================
// Dispatcher
// =============================================================================

/// Default bound on the request queue.
pub const DEFAULT_QUEUE_DEPTH: usize = 128;
