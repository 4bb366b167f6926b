// crates/motioncap-queue/src/lib.rs
//
// Lock-free SPSC ring buffer (component A) and the per-camera buffer pool
// built on top of it (component B). No network I/O, no decoding.

pub mod pool;
pub mod spsc;

pub use pool::{build_pool, PoolHandles};
pub use spsc::{channel, Consumer, Producer};
