//! Durable hard state.
//!
//! The hard state is the small record that must survive crashes:
//! `{min_epoch, page_size, max_mem, trim_watermark}`. It is stored in a
//! fixed-layout file with a magic number, a format version, and a CRC32
//! trailer, and replaced atomically: write to a temp file, fsync, rename
//! over the old record, sync the directory. Readers after a crash see
//! either the old record or the new one, never a partial write.
//!
//! The largest committed LPN is deliberately absent here; persisting it on
//! every write would dominate cost, so it is reconstructed by scanning
//! (see [`crate::recovery`]).

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};

use flulog_common::constants::{HARD_STATE_MAGIC, HARD_STATE_VERSION};
use flulog_common::types::{Epoch, Lpn};

use crate::config::FluConfig;
use crate::error::{FluError, FluResult};

/// Size of the hard-state file:
/// magic + version + min_epoch + page_size + max_mem + trim_watermark + checksum.
const HARD_STATE_SIZE: usize = 4 + 4 + 8 + 8 + 8 + 8 + 4;

/// Offset of the CRC32 trailer within the record.
const CHECKSUM_OFFSET: usize = HARD_STATE_SIZE - 4;

/// The node's durable state record.
///
/// All integer fields are stored big-endian, matching the slot format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardState {
    /// Minimum acceptable client epoch.
    pub min_epoch: Epoch,
    /// Size of one logical page in bytes.
    pub page_size: usize,
    /// Bound on the total slot region in bytes.
    pub max_mem: u64,
    /// Largest LPN ever trimmed or filled.
    pub trim_watermark: Lpn,
}

impl HardState {
    /// Returns the initial hard state for a fresh node directory.
    pub fn initial(config: &FluConfig) -> Self {
        Self {
            min_epoch: Epoch::ZERO,
            page_size: config.page_size,
            max_mem: config.max_mem,
            trim_watermark: Lpn::INVALID,
        }
    }

    /// Loads the hard state from `config.dir`, or initializes it if the
    /// file does not exist yet.
    ///
    /// A present record whose geometry disagrees with the configuration is
    /// a fatal error: accepting it would corrupt every slot address
    /// computed afterwards.
    pub fn load_or_init(config: &FluConfig) -> FluResult<Self> {
        let path = config.hard_state_path();
        if !path.exists() {
            return Ok(Self::initial(config));
        }

        let mut file = File::open(&path)?;
        let mut buf = [0u8; HARD_STATE_SIZE];
        file.read_exact(&mut buf)
            .map_err(|_| FluError::hard_state_corrupted("record truncated"))?;

        let state = Self::decode(&buf)?;

        if state.page_size != config.page_size {
            return Err(FluError::geometry_mismatch(
                "page_size",
                state.page_size as u64,
                config.page_size as u64,
            ));
        }
        if state.max_mem != config.max_mem {
            return Err(FluError::geometry_mismatch(
                "max_mem",
                state.max_mem,
                config.max_mem,
            ));
        }

        Ok(state)
    }

    /// Saves the hard state durably.
    ///
    /// Uses atomic file replacement: write to temp file, fsync, rename,
    /// sync the directory. Any failure here is fatal to the node (the
    /// epoch fence must not be able to rewind across a restart).
    pub fn save(&self, config: &FluConfig) -> FluResult<()> {
        let tmp_path = config.hard_state_tmp_path();
        let state_path = config.hard_state_path();

        let buf = self.encode();

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)
            .map_err(|source| FluError::HardState { source })?;

        file.write_all(&buf)
            .and_then(|()| file.sync_all())
            .map_err(|source| FluError::HardState { source })?;
        drop(file);

        fs::rename(&tmp_path, &state_path)
            .map_err(|source| FluError::HardState { source })?;

        // Sync the directory so the rename itself is durable.
        if let Ok(dir) = File::open(&config.dir) {
            let _ = dir.sync_all();
        }

        Ok(())
    }

    /// Encodes the record into its on-disk layout.
    fn encode(&self) -> [u8; HARD_STATE_SIZE] {
        let mut buf = [0u8; HARD_STATE_SIZE];

        buf[0..4].copy_from_slice(&HARD_STATE_MAGIC.to_be_bytes());
        buf[4..8].copy_from_slice(&HARD_STATE_VERSION.to_be_bytes());
        buf[8..16].copy_from_slice(&self.min_epoch.to_be_bytes());
        buf[16..24].copy_from_slice(&(self.page_size as u64).to_be_bytes());
        buf[24..32].copy_from_slice(&self.max_mem.to_be_bytes());
        buf[32..40].copy_from_slice(&self.trim_watermark.to_be_bytes());

        let checksum = crc32fast::hash(&buf[0..CHECKSUM_OFFSET]);
        buf[CHECKSUM_OFFSET..].copy_from_slice(&checksum.to_be_bytes());

        buf
    }

    /// Decodes and verifies an on-disk record.
    fn decode(buf: &[u8; HARD_STATE_SIZE]) -> FluResult<Self> {
        let magic = u32::from_be_bytes(buf[0..4].try_into().expect("field size"));
        if magic != HARD_STATE_MAGIC {
            return Err(FluError::hard_state_corrupted(format!(
                "invalid magic: expected {HARD_STATE_MAGIC:08x}, got {magic:08x}"
            )));
        }

        let version = u32::from_be_bytes(buf[4..8].try_into().expect("field size"));
        if version != HARD_STATE_VERSION {
            return Err(FluError::hard_state_corrupted(format!(
                "unsupported version: {version}"
            )));
        }

        let stored_checksum =
            u32::from_be_bytes(buf[CHECKSUM_OFFSET..].try_into().expect("field size"));
        let computed_checksum = crc32fast::hash(&buf[0..CHECKSUM_OFFSET]);
        if stored_checksum != computed_checksum {
            return Err(FluError::hard_state_corrupted(format!(
                "checksum mismatch: expected {stored_checksum:08x}, got {computed_checksum:08x}"
            )));
        }

        let min_epoch = Epoch::from_be_bytes(buf[8..16].try_into().expect("field size"));
        let page_size = u64::from_be_bytes(buf[16..24].try_into().expect("field size"));
        let max_mem = u64::from_be_bytes(buf[24..32].try_into().expect("field size"));
        let trim_watermark = Lpn::from_be_bytes(buf[32..40].try_into().expect("field size"));

        Ok(Self {
            min_epoch,
            page_size: page_size as usize,
            max_mem,
            trim_watermark,
        })
    }
}
