// crates/motioncap-sync/src/lib.rs
//
// Cross-camera synchronizer (component E). Single-threaded; no network I/O.

pub mod synchronizer;

pub use synchronizer::{CameraEndpoints, StopReason, Synchronizer};
