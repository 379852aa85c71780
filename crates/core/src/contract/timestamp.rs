//! Commit instants
//!
//! Timestamps are stored as microseconds since Unix epoch. A version's time is
//! either a commit instant or the "uncommitted" sentinel, which sorts after
//! every committed instant. A stamp position's "not after" bound uses the same
//! type, so `StampTime::Uncommitted` as a bound means "latest, including work
//! in progress".
//!
//! ```
//! use termstore_core::{StampTime, Timestamp};
//!
//! let t = StampTime::at_micros(100);
//! assert!(t < StampTime::Uncommitted);
//! assert_eq!(t.committed(), Some(Timestamp::from_micros(100)));
//! ```

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Microsecond-precision timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Unix epoch (1970-01-01 00:00:00 UTC)
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Maximum representable timestamp
    pub const MAX: Timestamp = Timestamp(u64::MAX);

    /// Create a timestamp for the current moment
    ///
    /// Returns epoch if the system clock is before Unix epoch.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(duration.as_micros() as u64)
    }

    /// Create a timestamp from microseconds since epoch
    #[inline]
    pub const fn from_micros(micros: u64) -> Self {
        Timestamp(micros)
    }

    /// Create a timestamp from milliseconds since epoch
    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        Timestamp(millis.saturating_mul(1_000))
    }

    /// Get microseconds since Unix epoch
    #[inline]
    pub const fn as_micros(&self) -> u64 {
        self.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::EPOCH
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let secs = self.0 / 1_000_000;
        let micros = self.0 % 1_000_000;
        write!(f, "{}.{:06}", secs, micros)
    }
}

impl From<u64> for Timestamp {
    fn from(micros: u64) -> Self {
        Timestamp::from_micros(micros)
    }
}

// ============================================================================
// StampTime
// ============================================================================

/// Time component of a STAMP, or the not-after bound of a stamp position
///
/// Variant order matters: the derived `Ord` places every committed instant
/// before `Uncommitted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StampTime {
    /// Version committed at this instant
    Committed(Timestamp),
    /// Version not yet committed; as a bound, "no upper limit"
    Uncommitted,
}

impl StampTime {
    /// Committed time from raw microseconds
    #[inline]
    pub const fn at_micros(micros: u64) -> Self {
        StampTime::Committed(Timestamp::from_micros(micros))
    }

    /// The commit instant, if committed
    pub fn committed(&self) -> Option<Timestamp> {
        match self {
            StampTime::Committed(ts) => Some(*ts),
            StampTime::Uncommitted => None,
        }
    }

    /// True for the uncommitted sentinel
    pub fn is_uncommitted(&self) -> bool {
        matches!(self, StampTime::Uncommitted)
    }
}

impl From<Timestamp> for StampTime {
    fn from(ts: Timestamp) -> Self {
        StampTime::Committed(ts)
    }
}

impl std::fmt::Display for StampTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StampTime::Committed(ts) => write!(f, "{}", ts),
            StampTime::Uncommitted => write!(f, "uncommitted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_timestamp_now_advances() {
        let before = Timestamp::now();
        std::thread::sleep(Duration::from_millis(1));
        let after = Timestamp::now();
        assert!(after > before, "Time should advance");
    }

    #[test]
    fn test_timestamp_from_millis() {
        assert_eq!(Timestamp::from_millis(5).as_micros(), 5_000);
    }

    #[test]
    fn test_timestamp_display() {
        assert_eq!(Timestamp::from_micros(1_234_567_890).to_string(), "1234.567890");
    }

    #[test]
    fn test_uncommitted_sorts_last() {
        assert!(StampTime::at_micros(u64::MAX) < StampTime::Uncommitted);
        assert!(StampTime::at_micros(1) < StampTime::at_micros(2));
    }

    #[test]
    fn test_committed_accessor() {
        assert_eq!(StampTime::Uncommitted.committed(), None);
        assert!(StampTime::Uncommitted.is_uncommitted());
        assert!(!StampTime::at_micros(3).is_uncommitted());
    }

    #[test]
    fn test_stamp_time_serialization() {
        let t = StampTime::at_micros(42);
        let json = serde_json::to_string(&t).unwrap();
        let restored: StampTime = serde_json::from_str(&json).unwrap();
        assert_eq!(t, restored);
    }
}
