//! Exchange clock
//!
//! All timestamps are Unix nanoseconds (`i64`).

use chrono::Utc;

/// Current wall-clock time in Unix nanoseconds
///
/// Saturates to `i64::MAX` past the year 2262.
pub fn now_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

pub const NANOS_PER_SECOND: i64 = 1_000_000_000;
