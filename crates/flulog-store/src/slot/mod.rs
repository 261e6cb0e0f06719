//! On-disk slot format.
//!
//! Every logical page occupies one fixed-size slot in the memfile:
//!
//! ```text
//! Offset           Size       Field
//! ------           ----       -----
//! 0                1          status (0=unwritten, 1=written, 2=trimmed)
//! 1                8          stored LPN, big-endian
//! 9                page_size  payload
//! 9 + page_size    1          tail-marker (0=torn, 1=complete)
//! ```
//!
//! The slot for LPN `n` lives at byte offset `n * (10 + page_size)`; slot 0
//! exists but is never used. A slot is a committed write only when the
//! status is `written`, the stored LPN echoes the slot's own LPN, and the
//! tail-marker is complete. Any other shape reads as unwritten. The whole
//! image is written in one positioned call, so a crash can only leave a
//! slot whose tail-marker is still missing, and that torn slot stays
//! invisible to readers.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use flulog_common::constants::{SLOT_OVERHEAD, SLOT_PREFIX_SIZE};
use flulog_common::types::Lpn;

/// Tail-marker value for a complete slot image.
pub const TAIL_COMPLETE: u8 = 1;

/// Tail-marker value for a torn/incomplete slot image.
pub const TAIL_TORN: u8 = 0;

/// Returns the total on-disk size of one slot for the given page size.
#[inline]
#[must_use]
pub const fn slot_size(page_size: usize) -> u64 {
    (SLOT_OVERHEAD + page_size) as u64
}

/// Returns the memfile byte offset of the slot for `lpn`.
#[inline]
#[must_use]
pub fn slot_offset(lpn: Lpn, page_size: usize) -> u64 {
    lpn.as_u64() * slot_size(page_size)
}

/// Per-slot lifecycle status stored in the first byte of each slot.
///
/// The only legal transitions are unwritten to written, unwritten to
/// trimmed, and written to trimmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SlotStatus {
    /// Slot has never been written.
    Unwritten = 0,
    /// Slot holds a page image.
    Written = 1,
    /// Slot has been trimmed or hole-filled.
    Trimmed = 2,
    /// Reserved for corrupt slots; never produced by this implementation.
    Corrupt = 255,
}

impl SlotStatus {
    /// Creates a SlotStatus from a raw byte value.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Unwritten),
            1 => Some(Self::Written),
            2 => Some(Self::Trimmed),
            255 => Some(Self::Corrupt),
            _ => None,
        }
    }

    /// Returns true if the slot can never be written again.
    #[inline]
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Written | Self::Trimmed)
    }
}

impl Default for SlotStatus {
    fn default() -> Self {
        Self::Unwritten
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unwritten => write!(f, "unwritten"),
            Self::Written => write!(f, "written"),
            Self::Trimmed => write!(f, "trimmed"),
            Self::Corrupt => write!(f, "corrupt"),
        }
    }
}

/// Decoded slot prefix: the status byte and the stored LPN.
///
/// This is all the recovery scan reads per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotPrefix {
    /// The slot's status byte.
    pub status: SlotStatus,
    /// The LPN echoed by the writer.
    pub stored_lpn: Lpn,
}

impl SlotPrefix {
    /// Size of the encoded prefix in bytes.
    pub const SIZE: usize = SLOT_PREFIX_SIZE;

    /// Decodes a prefix from the first [`Self::SIZE`] bytes of a slot.
    ///
    /// Returns `None` if the buffer is too short. An unrecognized status
    /// byte decodes as [`SlotStatus::Corrupt`].
    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::SIZE {
            return None;
        }
        let status = SlotStatus::from_u8(buf[0]).unwrap_or(SlotStatus::Corrupt);
        let stored_lpn = Lpn::from_be_bytes(buf[1..Self::SIZE].try_into().expect("prefix size"));
        Some(Self { status, stored_lpn })
    }
}

/// What a reader observes in a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotContents {
    /// Nothing committed here: never written, torn, or past EOF.
    Unwritten,
    /// The slot was trimmed or hole-filled.
    Trimmed,
    /// A committed page image.
    Written(Bytes),
}

/// Encodes the full committed slot image for `lpn`.
///
/// The caller must persist the returned buffer with a single positioned
/// write so that a crash cannot commit the tail-marker without the payload.
#[must_use]
pub fn encode_slot(lpn: Lpn, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(SLOT_OVERHEAD + payload.len());
    buf.put_u8(SlotStatus::Written as u8);
    buf.put_u64(lpn.as_u64());
    buf.put_slice(payload);
    buf.put_u8(TAIL_COMPLETE);
    buf.freeze()
}

/// Classifies the raw bytes read from the slot for `lpn`.
///
/// `raw` is whatever a positioned read returned and may be short: reads
/// past EOF and partially persisted slots both classify as unwritten. A
/// trimmed status byte is authoritative on its own because trim and fill
/// only ever touch that byte.
#[must_use]
pub fn decode_slot(lpn: Lpn, page_size: usize, raw: &[u8]) -> SlotContents {
    let Some(&status_byte) = raw.first() else {
        return SlotContents::Unwritten;
    };
    match SlotStatus::from_u8(status_byte) {
        Some(SlotStatus::Trimmed) => SlotContents::Trimmed,
        Some(SlotStatus::Written) => {
            let full = SLOT_OVERHEAD + page_size;
            if raw.len() < full {
                // Torn: the image never made it to disk in full.
                return SlotContents::Unwritten;
            }
            if raw[SLOT_PREFIX_SIZE + page_size] != TAIL_COMPLETE {
                return SlotContents::Unwritten;
            }
            let stored = Lpn::from_be_bytes(
                raw[1..SLOT_PREFIX_SIZE].try_into().expect("prefix size"),
            );
            if stored != lpn {
                return SlotContents::Unwritten;
            }
            SlotContents::Written(Bytes::copy_from_slice(
                &raw[SLOT_PREFIX_SIZE..SLOT_PREFIX_SIZE + page_size],
            ))
        }
        _ => SlotContents::Unwritten,
    }
}
