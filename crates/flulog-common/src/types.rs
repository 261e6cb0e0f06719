//! Core identifier types for flulog.
//!
//! These types provide type-safe wrappers around the numeric identifiers
//! used throughout the node, preventing accidental mixing of logical page
//! numbers and epochs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical page number - addresses one page slot in the node's space.
///
/// LPNs are strictly positive; 0 is reserved as the invalid sentinel.
/// The slot for LPN 0 exists on disk but is never used.
///
/// # Example
///
/// ```rust
/// use flulog_common::types::Lpn;
///
/// let lpn = Lpn::new(42);
/// assert_eq!(lpn.as_u64(), 42);
/// assert!(lpn.is_valid());
/// assert!(!Lpn::INVALID.is_valid());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Lpn(u64);

impl Lpn {
    /// Invalid LPN constant, used as a sentinel value.
    pub const INVALID: Self = Self(0);

    /// First valid LPN.
    pub const FIRST: Self = Self(1);

    /// Creates a new `Lpn` from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(lpn: u64) -> Self {
        Self(lpn)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next LPN.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Checks if this is a valid (non-reserved) LPN.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }

    /// Creates an Lpn from bytes (big-endian).
    #[inline]
    #[must_use]
    pub fn from_be_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_be_bytes(bytes))
    }

    /// Converts to bytes (big-endian).
    #[inline]
    #[must_use]
    pub fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl fmt::Debug for Lpn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Lpn(INVALID)")
        } else {
            write!(f, "Lpn({})", self.0)
        }
    }
}

impl fmt::Display for Lpn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Lpn {
    #[inline]
    fn from(lpn: u64) -> Self {
        Self::new(lpn)
    }
}

impl From<Lpn> for u64 {
    #[inline]
    fn from(lpn: Lpn) -> Self {
        lpn.0
    }
}

/// Epoch number stamped on client requests for fencing.
///
/// Client epochs are strictly positive and monotonically non-decreasing.
/// The node's minimum acceptable epoch starts at zero so that every client
/// is admitted until the first seal.
///
/// # Example
///
/// ```rust
/// use flulog_common::types::Epoch;
///
/// let epoch = Epoch::new(5);
/// assert!(epoch.is_valid());
/// assert_eq!(epoch.next(), Epoch::new(6));
/// assert!(Epoch::ZERO < epoch);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Epoch(u64);

impl Epoch {
    /// The zero epoch: below every valid client epoch.
    pub const ZERO: Self = Self(0);

    /// First valid client epoch.
    pub const FIRST: Self = Self(1);

    /// Creates a new `Epoch` from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(epoch: u64) -> Self {
        Self(epoch)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next epoch.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Checks if this is a valid client epoch.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::ZERO.0
    }

    /// Creates an Epoch from bytes (big-endian).
    #[inline]
    #[must_use]
    pub fn from_be_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_be_bytes(bytes))
    }

    /// Converts to bytes (big-endian).
    #[inline]
    #[must_use]
    pub fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl fmt::Debug for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Epoch({})", self.0)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Epoch {
    #[inline]
    fn from(epoch: u64) -> Self {
        Self::new(epoch)
    }
}

impl From<Epoch> for u64 {
    #[inline]
    fn from(epoch: Epoch) -> Self {
        epoch.0
    }
}
