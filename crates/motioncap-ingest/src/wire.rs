// crates/motioncap-ingest/src/wire.rs
//
// Frame-stream wire format: one TCP connection per camera, each frame a
// 4-byte little-endian length prefix, an 8-byte little-endian capture
// timestamp, then the encoded payload.

use std::io::{self, Read};

use motioncap_core::error::ProtocolError;

/// One frame as it arrives off the wire, before decode.
pub struct WireFrame {
    pub timestamp: u64,
    pub payload: Vec<u8>,
}

/// Reads exactly one frame from `stream`. Returns `Ok(None)` only on a clean
/// EOF at a frame boundary (peer closed between frames); a partial read
/// anywhere else surfaces as an `io::Error` (typically `WouldBlock`/`TimedOut`
/// from the configured read timeout, which the worker treats as transient).
pub fn read_frame(
    camera_id: u32,
    stream: &mut impl Read,
) -> io::Result<Result<Option<WireFrame>, ProtocolError>> {
    let mut len_buf = [0u8; 4];
    match read_exact_or_eof(stream, &mut len_buf)? {
        false => return Ok(Ok(None)),
        true => {}
    }
    let len = u32::from_le_bytes(len_buf);
    if len == 0 || len > MAX_FRAME_LEN {
        return Ok(Err(ProtocolError::MalformedLength {
            camera_id,
            len,
        }));
    }

    let mut ts_buf = [0u8; 8];
    stream.read_exact(&mut ts_buf)?;
    let timestamp = u64::from_le_bytes(ts_buf);

    let mut payload = vec![0u8; len as usize];
    stream.read_exact(&mut payload)?;

    Ok(Ok(Some(WireFrame { timestamp, payload })))
}

/// Generous upper bound guarding against a corrupted length prefix turning
/// into an unbounded allocation.
const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

/// Like `read_exact`, but treats EOF on the very first byte as `Ok(false)`
/// rather than an error, so callers can distinguish "no more frames" from
/// "connection died mid-frame".
fn read_exact_or_eof(stream: &mut impl Read, buf: &mut [u8]) -> io::Result<bool> {
    let mut read = 0;
    while read < buf.len() {
        match stream.read(&mut buf[read..]) {
            Ok(0) if read == 0 => return Ok(false),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed mid-frame",
                ))
            }
            Ok(n) => read += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}
