// crates/motioncap-core/src/lib.rs
//
// Pure data model shared by every other crate in the pipeline: config
// schema, frame/buffer types, the command and error taxonomies. No network
// I/O, no threads — see motioncap-ingest and motioncap-sync for those.

pub mod command;
pub mod config;
pub mod constants;
pub mod error;
pub mod frame;
pub mod time;
pub mod worker_event;

pub use command::Command;
pub use config::{CameraConfig, CodecTag, SystemConfig};
pub use frame::{AlignedSet, FrameBuffer, TimestampedFrame};
pub use worker_event::WorkerEvent;
