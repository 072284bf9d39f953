//! Monotonic microsecond clock
//!
//! Write versions double as audit timestamps and historical-query cutoffs,
//! so they must be strictly increasing and unique process-wide. The clock
//! follows wall time when it can and advances by one microsecond when two
//! calls land in the same tick.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// Microseconds since the Unix epoch.
///
/// `0` is reserved as the "no version" sentinel used by probe writes and is
/// never returned by [`now`].
pub type Time = u64;

static LAST: AtomicU64 = AtomicU64::new(0);

/// Returns the current time, strictly greater than any previous return
/// value from this process.
pub fn now() -> Time {
    let wall = Utc::now().timestamp_micros().max(1) as u64;
    let mut last = LAST.load(Ordering::Relaxed);
    loop {
        let next = wall.max(last + 1);
        match LAST.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(current) => last = current,
        }
    }
}
