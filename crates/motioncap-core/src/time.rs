// crates/motioncap-core/src/time.rs
//
// Wall-clock helpers for the shared capture grid. Cameras and host agree on
// nanoseconds since UNIX_EPOCH; everything here is a thin wrapper so the rest
// of the crate never touches `SystemTime` directly.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current wall-clock time as nanoseconds since the UNIX epoch.
///
/// Panics only if the system clock is set before 1970, which would indicate a
/// broken host — not a condition worth plumbing a `Result` through every
/// caller for.
pub fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before UNIX_EPOCH")
        .as_nanos() as u64
}

/// The start-anchor value to broadcast: now plus `delay`, encoded as the
/// cameras expect it (nanoseconds, little-endian on the wire).
pub fn start_anchor_ns(delay: Duration) -> u64 {
    now_ns() + delay.as_nanos() as u64
}

/// Render a duration in seconds as a compact human-readable string, used in
/// the synchronizer's periodic INFO summary.
pub fn format_duration_secs(secs: f64) -> String {
    if secs >= 3600.0 {
        format!(
            "{}:{:02}:{:02}",
            secs as u64 / 3600,
            (secs as u64 % 3600) / 60,
            secs as u64 % 60,
        )
    } else if secs >= 60.0 {
        format!("{}:{:02}", secs as u64 / 60, secs as u64 % 60)
    } else {
        format!("{secs:.1}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_ns_is_plausible_unix_time() {
        // Anything after 2020-01-01 in nanoseconds; guards against an
        // accidental seconds/millis unit mixup.
        assert!(now_ns() > 1_577_836_800_000_000_000);
    }

    #[test]
    fn start_anchor_is_strictly_after_now() {
        let anchor = start_anchor_ns(Duration::from_secs(1));
        assert!(anchor > now_ns());
    }

    #[test]
    fn format_duration_secs_buckets() {
        assert_eq!(format_duration_secs(4.2), "4.2s");
        assert_eq!(format_duration_secs(187.0), "3:07");
        assert_eq!(format_duration_secs(3875.0), "1:04:35");
    }
}
