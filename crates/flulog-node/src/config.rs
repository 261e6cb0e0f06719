//! Node configuration.

use std::path::PathBuf;

use flulog_common::constants::{DEFAULT_MAX_MEM, DEFAULT_PAGE_SIZE, DEFAULT_QUEUE_DEPTH};
use flulog_common::constants::{HARD_STATE_FILE, HARD_STATE_TMP, MEM_FILE};
use flulog_common::types::Lpn;
use flulog_store::slot;

/// Configuration for one FLU instance.
///
/// `page_size` and `max_mem` are the node's geometry: they are fixed at
/// creation and must match the persisted hard state on every later start.
#[derive(Debug, Clone)]
pub struct FluConfig {
    /// Directory holding the memfile and the hard-state file.
    pub dir: PathBuf,

    /// Size of one logical page in bytes.
    pub page_size: usize,

    /// Bound on the total slot region in bytes.
    pub max_mem: u64,

    /// Bound on the dispatcher's request queue.
    pub queue_depth: usize,

    /// Whether to fdatasync the memfile after every slot mutation.
    ///
    /// Crash correctness does not depend on this; the tail-marker protocol
    /// already detects torn slots. It narrows the window in which an
    /// acknowledged write can be lost.
    pub sync_writes: bool,
}

impl Default for FluConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/flu"),
            page_size: DEFAULT_PAGE_SIZE,
            max_mem: DEFAULT_MAX_MEM,
            queue_depth: DEFAULT_QUEUE_DEPTH,
            sync_writes: false,
        }
    }
}

impl FluConfig {
    /// Creates a new configuration with the specified directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }

    /// Sets the page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the slot region bound.
    #[must_use]
    pub fn with_max_mem(mut self, max_mem: u64) -> Self {
        self.max_mem = max_mem;
        self
    }

    /// Sets the request queue bound.
    #[must_use]
    pub fn with_queue_depth(mut self, queue_depth: usize) -> Self {
        self.queue_depth = queue_depth;
        self
    }

    /// Sets whether slot mutations are fdatasync'd.
    #[must_use]
    pub fn with_sync_writes(mut self, sync_writes: bool) -> Self {
        self.sync_writes = sync_writes;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.page_size == 0 {
            return Err("page size must be positive".to_string());
        }

        // Slot 0 is reserved, so the region must hold at least two slots
        // for any page to be addressable.
        if self.max_mem < 2 * self.slot_size() {
            return Err("max_mem must hold at least two slots".to_string());
        }

        if self.queue_depth == 0 {
            return Err("queue depth must be positive".to_string());
        }

        Ok(())
    }

    /// Returns the on-disk size of one slot.
    #[inline]
    pub const fn slot_size(&self) -> u64 {
        slot::slot_size(self.page_size)
    }

    /// Returns the memfile byte offset of the slot for `lpn`.
    #[inline]
    pub fn slot_offset(&self, lpn: Lpn) -> u64 {
        slot::slot_offset(lpn, self.page_size)
    }

    /// Returns true if the slot for `lpn` fits entirely inside `max_mem`.
    pub fn contains_slot(&self, lpn: Lpn) -> bool {
        match self.slot_offset(lpn).checked_add(self.slot_size()) {
            Some(end) => end <= self.max_mem,
            None => false,
        }
    }

    /// Returns the largest addressable LPN.
    pub fn max_lpn(&self) -> Lpn {
        Lpn::new((self.max_mem / self.slot_size()).saturating_sub(1))
    }

    /// Returns the memfile path.
    pub fn memfile_path(&self) -> PathBuf {
        self.dir.join(MEM_FILE)
    }

    /// Returns the hard-state file path.
    pub fn hard_state_path(&self) -> PathBuf {
        self.dir.join(HARD_STATE_FILE)
    }

    /// Returns the temporary hard-state staging path.
    pub fn hard_state_tmp_path(&self) -> PathBuf {
        self.dir.join(HARD_STATE_TMP)
    }
}
