// crates/motioncap-core/src/worker_event.rs
//
// Diagnostic/control-plane messages an ingest worker sends the host for
// logging and lifecycle tracking. Deliberately kept off the per-frame hot
// path — see SPEC_FULL.md §3, WorkerEvent.

#[derive(Clone, Debug)]
pub enum WorkerEvent {
    Connected { camera_id: u32 },
    Decoded { camera_id: u32 },
    DecodeError { camera_id: u32, detail: String },
    NetworkError { camera_id: u32, detail: String, fatal: bool },
    Stopped { camera_id: u32 },
}
