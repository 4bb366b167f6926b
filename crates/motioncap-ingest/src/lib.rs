// crates/motioncap-ingest/src/lib.rs
//
// Time broadcaster (component C) and per-camera ingest worker (component D).
// No synchronization across cameras — see motioncap-sync for that.

pub mod broadcaster;
pub mod decode;
mod wire;
pub mod worker;
mod yuv;

pub use broadcaster::broadcast;
pub use decode::{decoder_for, FfmpegDecoder, FrameDecoder, RawYuvDecoder};
pub use wire::{read_frame, WireFrame};
pub use worker::IngestWorker;
