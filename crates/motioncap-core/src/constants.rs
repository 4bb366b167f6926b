// crates/motioncap-core/src/constants.rs

/// Default per-camera buffer pool depth. Overridable via the manifest's
/// `buffers_per_camera` field.
pub const FRAME_BUFS_PER_THREAD: usize = 32;

/// How far in the future the start anchor is set, relative to the wall clock
/// at broadcast time. Cameras use this to line up their first capture.
pub const START_ANCHOR_DELAY: std::time::Duration = std::time::Duration::from_secs(1);

/// The stop sentinel broadcast on the wire. Four ASCII bytes, no terminator —
/// kept byte-for-byte compatible with existing camera firmware.
pub const STOP_SENTINEL: &[u8; 4] = b"STOP";

/// Sentinel timestamp published by an ingest worker that has failed its
/// camera connection, so the synchronizer can observe and skip it rather than
/// spinning on a buffer that will never arrive.
pub const FAILED_WORKER_TIMESTAMP: u64 = 0;
