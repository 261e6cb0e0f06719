//! The page state machine.
//!
//! [`FluState`] is the single owner of the memfile and all mutable node
//! state. Every operation follows the same shape: check the epoch fence,
//! validate the request, read the slot's status byte, decide the
//! transition, mutate the slot. The dispatcher serializes calls, so
//! nothing here needs interior locking.

use bytes::Bytes;
use tracing::{debug, info};

use flulog_common::constants::TRIM_FLUSH_INTERVAL;
use flulog_common::types::{Epoch, Lpn};
use flulog_store::file::{FileHandle, OpenOptions, StandardFile};
use flulog_store::slot::{decode_slot, encode_slot, SlotContents, SlotStatus};

use crate::config::FluConfig;
use crate::epoch::EpochGuard;
use crate::error::{FluError, FluResult};
use crate::hard_state::HardState;
use crate::ops::{BadRequest, FillReply, FluStatus, ReadReply, SealReply, TrimReply, WriteReply};
use crate::recovery;

/// The node's in-memory state and its backing files.
pub struct FluState {
    config: FluConfig,
    file: StandardFile,
    guard: EpochGuard,
    /// Largest LPN ever trimmed or filled; persisted in the hard state.
    trim_watermark: Lpn,
    /// Largest LPN ever committed-written; recomputed on restart.
    max_logical_page: Lpn,
    /// Successful trim/fill operations since the last hard-state flush.
    trims_since_flush: u64,
}

impl FluState {
    /// Opens the node: loads (or initializes) the hard state, opens the
    /// memfile, runs the recovery scan, and flushes the hard state once.
    ///
    /// Recovery runs here, before any request can be served.
    pub async fn open(config: FluConfig) -> FluResult<Self> {
        config.validate().map_err(|reason| FluError::config_error(reason))?;
        std::fs::create_dir_all(&config.dir)?;

        let hard_state = HardState::load_or_init(&config)?;

        let file = StandardFile::open(config.memfile_path(), OpenOptions::for_create()).await?;

        let max_logical_page = recovery::scan_max_logical_page(&file, &config).await?;

        let mut state = Self {
            guard: EpochGuard::new(hard_state.min_epoch),
            trim_watermark: hard_state.trim_watermark,
            max_logical_page,
            trims_since_flush: 0,
            config,
            file,
        };

        state.flush_hard_state()?;

        info!(
            dir = %state.config.dir.display(),
            min_epoch = %state.guard.min_epoch(),
            max_logical_page = %state.max_logical_page,
            "flu open"
        );

        Ok(state)
    }

    /// Returns the configuration this node was opened with.
    pub fn config(&self) -> &FluConfig {
        &self.config
    }

    /// Writes a page. Pages are write-once: any slot already written or
    /// trimmed rejects the write as overwritten.
    pub async fn write(&mut self, epoch: Epoch, lpn: Lpn, payload: Bytes) -> FluResult<WriteReply> {
        if !self.guard.admits(epoch) {
            return Ok(WriteReply::BadEpoch);
        }
        if let Some(bad) = self.check_slot_bounds(lpn) {
            return Ok(WriteReply::BadRequest(bad));
        }
        if payload.len() != self.config.page_size {
            return Ok(WriteReply::BadRequest(BadRequest::PayloadSize {
                expected: self.config.page_size,
                actual: payload.len(),
            }));
        }

        match self.read_status(lpn).await? {
            SlotStatus::Unwritten => {
                // One positioned write for the whole image keeps the
                // tail-marker honest: a crash can only leave a torn slot.
                let image = encode_slot(lpn, &payload);
                self.file
                    .write_all_at(&image, self.config.slot_offset(lpn))
                    .await?;
                if self.config.sync_writes {
                    self.file.datasync().await?;
                }
                self.max_logical_page = self.max_logical_page.max(lpn);
                Ok(WriteReply::Written)
            }
            _ => Ok(WriteReply::Overwritten),
        }
    }

    /// Reads a page.
    pub async fn read(&self, epoch: Epoch, lpn: Lpn) -> FluResult<ReadReply> {
        if !self.guard.admits(epoch) {
            return Ok(ReadReply::BadEpoch);
        }
        if !epoch.is_valid() {
            return Ok(ReadReply::BadRequest(BadRequest::ZeroEpoch));
        }
        if let Some(bad) = self.check_slot_bounds(lpn) {
            return Ok(ReadReply::BadRequest(bad));
        }

        let mut buf = vec![0u8; self.config.slot_size() as usize];
        let n = self
            .file
            .read_at(&mut buf, self.config.slot_offset(lpn))
            .await?;

        Ok(match decode_slot(lpn, self.config.page_size, &buf[..n]) {
            SlotContents::Written(payload) => ReadReply::Page(payload),
            SlotContents::Trimmed => ReadReply::Trimmed,
            SlotContents::Unwritten => ReadReply::Unwritten,
        })
    }

    /// Trims a written page so later readers see it as reclaimed.
    pub async fn trim(&mut self, epoch: Epoch, lpn: Lpn) -> FluResult<TrimReply> {
        if !self.guard.admits(epoch) {
            return Ok(TrimReply::BadEpoch);
        }
        if let Some(bad) = self.check_slot_bounds(lpn) {
            return Ok(TrimReply::BadRequest(bad));
        }

        match self.read_status(lpn).await? {
            SlotStatus::Unwritten => Ok(TrimReply::Unwritten),
            SlotStatus::Written => {
                self.mark_trimmed(lpn).await?;
                Ok(TrimReply::Done)
            }
            _ => Ok(TrimReply::AlreadyTrimmed),
        }
    }

    /// Hole-fills an unwritten page: finalizes it as permanently empty so
    /// later readers see trimmed rather than unwritten.
    ///
    /// A fill on a written page is rejected as overwritten; it never
    /// silently converts into a trim.
    pub async fn fill(&mut self, epoch: Epoch, lpn: Lpn) -> FluResult<FillReply> {
        if !self.guard.admits(epoch) {
            return Ok(FillReply::BadEpoch);
        }
        if let Some(bad) = self.check_slot_bounds(lpn) {
            return Ok(FillReply::BadRequest(bad));
        }

        match self.read_status(lpn).await? {
            SlotStatus::Unwritten => {
                self.mark_trimmed(lpn).await?;
                Ok(FillReply::Done)
            }
            SlotStatus::Written => Ok(FillReply::Overwritten),
            _ => Ok(FillReply::AlreadyTrimmed),
        }
    }

    /// Seals the node at `epoch`: the fence rises to `epoch + 1`, the hard
    /// state is flushed synchronously, and the current tail is returned.
    pub async fn seal(&mut self, epoch: Epoch) -> FluResult<SealReply> {
        match self.guard.seal(epoch) {
            Some(new_min) => {
                debug!(sealed_at = %epoch, min_epoch = %new_min, "sealed");
                self.flush_hard_state()?;
                Ok(SealReply::Sealed(self.max_logical_page))
            }
            None => Ok(SealReply::BadEpoch),
        }
    }

    /// Returns a snapshot of the node's observable state.
    pub fn status(&self) -> FluStatus {
        FluStatus {
            min_epoch: self.guard.min_epoch(),
            page_size: self.config.page_size,
            max_mem: self.config.max_mem,
            max_logical_page: self.max_logical_page,
            trim_watermark: self.trim_watermark,
        }
    }

    /// Gracefully stops the node: flushes the hard state and syncs the
    /// memfile.
    pub async fn stop(&mut self) -> FluResult<()> {
        self.flush_hard_state()?;
        self.file.sync().await?;
        info!(dir = %self.config.dir.display(), "flu stopped");
        Ok(())
    }

    /// Validates that `lpn` addresses a usable slot.
    fn check_slot_bounds(&self, lpn: Lpn) -> Option<BadRequest> {
        if !lpn.is_valid() {
            return Some(BadRequest::ReservedLpn);
        }
        if !self.config.contains_slot(lpn) {
            return Some(BadRequest::OutOfRange {
                lpn,
                max_lpn: self.config.max_lpn(),
            });
        }
        None
    }

    /// Reads the status byte of the slot for `lpn`.
    ///
    /// A read past the end of the file means the slot was never touched.
    async fn read_status(&self, lpn: Lpn) -> FluResult<SlotStatus> {
        let mut buf = [0u8; 1];
        let n = self
            .file
            .read_at(&mut buf, self.config.slot_offset(lpn))
            .await?;
        if n == 0 {
            return Ok(SlotStatus::Unwritten);
        }
        Ok(SlotStatus::from_u8(buf[0]).unwrap_or(SlotStatus::Corrupt))
    }

    /// Flips the slot's status byte to trimmed and advances the watermark.
    async fn mark_trimmed(&mut self, lpn: Lpn) -> FluResult<()> {
        self.file
            .write_all_at(&[SlotStatus::Trimmed as u8], self.config.slot_offset(lpn))
            .await?;
        if self.config.sync_writes {
            self.file.datasync().await?;
        }

        self.trim_watermark = self.trim_watermark.max(lpn);
        self.trims_since_flush += 1;
        if self.trims_since_flush >= TRIM_FLUSH_INTERVAL {
            debug!(trim_watermark = %self.trim_watermark, "periodic hard-state flush");
            self.flush_hard_state()?;
        }
        Ok(())
    }

    /// Persists the current hard state and resets the flush counter.
    fn flush_hard_state(&mut self) -> FluResult<()> {
        let record = HardState {
            min_epoch: self.guard.min_epoch(),
            page_size: self.config.page_size,
            max_mem: self.config.max_mem,
            trim_watermark: self.trim_watermark,
        };
        record.save(&self.config)?;
        self.trims_since_flush = 0;
        Ok(())
    }
}

impl std::fmt::Debug for FluState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FluState")
            .field("dir", &self.config.dir)
            .field("min_epoch", &self.guard.min_epoch())
            .field("max_logical_page", &self.max_logical_page)
            .field("trim_watermark", &self.trim_watermark)
            .finish()
    }
}
