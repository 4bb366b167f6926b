// crates/motioncap-core/src/command.rs
//
// Typed representation of the two messages the host ever sends a camera.
// `to_wire`/`from_wire` are the only place that know about the byte-for-byte
// legacy framing — everything else in the pipeline works with `Command`.

use crate::constants::STOP_SENTINEL;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Start capturing at the given wall-clock nanosecond anchor.
    StartAt(u64),
    /// Cease transmission immediately.
    Stop,
}

impl Command {
    /// Encodes to the exact wire format cameras expect: 8 little-endian bytes
    /// for a start anchor, or the literal ASCII `STOP` with no terminator.
    pub fn to_wire(self) -> Vec<u8> {
        match self {
            Command::StartAt(anchor_ns) => anchor_ns.to_le_bytes().to_vec(),
            Command::Stop => STOP_SENTINEL.to_vec(),
        }
    }
}
