//! Startup recovery scan.
//!
//! The largest committed LPN is not persisted; after the hard state loads
//! and before any request is served, the memfile is walked slot by slot to
//! reconstruct it from the slot prefixes.

use flulog_store::file::{FileHandle, StandardFile};
use flulog_store::slot::{SlotPrefix, SlotStatus};

use tracing::info;

use flulog_common::types::Lpn;

use crate::config::FluConfig;
use crate::error::FluResult;

/// Reconstructs the maximum committed logical page number.
///
/// Walks the memfile from slot 0 upward reading each slot's 9-byte prefix;
/// every slot whose status is written contributes its stored LPN to the
/// maximum. The scan stops at the first slot whose offset reaches
/// `max_mem` or the end of the file.
pub async fn scan_max_logical_page(file: &StandardFile, config: &FluConfig) -> FluResult<Lpn> {
    let file_size = file.size().await?;
    let slot_size = config.slot_size();

    let mut max = Lpn::INVALID;
    let mut scanned = 0u64;
    let mut buf = [0u8; SlotPrefix::SIZE];

    loop {
        let offset = scanned * slot_size;
        if offset >= config.max_mem || offset >= file_size {
            break;
        }

        let n = file.read_at(&mut buf, offset).await?;
        if n < SlotPrefix::SIZE {
            break;
        }

        if let Some(prefix) = SlotPrefix::from_bytes(&buf) {
            if prefix.status == SlotStatus::Written {
                max = max.max(prefix.stored_lpn);
            }
        }

        scanned += 1;
    }

    info!(max_logical_page = %max, scanned_slots = scanned, "memfile scan complete");
    Ok(max)
}
