// crates/motioncap-ingest/src/broadcaster.rs
//
// Time-anchored broadcast (component C): tells every camera when to start
// capturing on a shared monotonic grid, and later tells them to stop.

use std::net::UdpSocket;
use std::time::Duration;

use log::warn;

use motioncap_core::error::NetworkError;
use motioncap_core::{CameraConfig, Command};

const SEND_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_millis(20);

/// Sends `command` to every camera's command endpoint, one UDP datagram per
/// camera. `fatal_on_failure` controls whether a send failure after retries
/// is surfaced as an error (startup) or just logged (shutdown, best-effort).
pub fn broadcast(
    cameras: &[CameraConfig],
    command: Command,
    fatal_on_failure: bool,
) -> Result<(), NetworkError> {
    let wire = command.to_wire();

    for cam in cameras {
        let result = send_with_retry(cam, &wire);
        match result {
            Ok(()) => {}
            Err(err) => {
                if fatal_on_failure {
                    return Err(err);
                }
                warn!("broadcast to camera {}: {err} (best-effort, ignoring)", cam.id);
            }
        }
    }
    Ok(())
}

fn send_with_retry(cam: &CameraConfig, wire: &[u8]) -> Result<(), NetworkError> {
    let socket = UdpSocket::bind("0.0.0.0:0").map_err(|source| NetworkError::Transient {
        camera_id: cam.id,
        source,
    })?;

    let mut last_err = None;
    for attempt in 0..SEND_RETRIES {
        match socket.send_to(wire, cam.command_addr) {
            Ok(sent) if sent == wire.len() => return Ok(()),
            Ok(_) => {
                last_err = Some(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "short datagram send",
                ));
            }
            Err(e) => last_err = Some(e),
        }
        if attempt + 1 < SEND_RETRIES {
            std::thread::sleep(RETRY_DELAY);
        }
    }

    Err(NetworkError::Persistent {
        camera_id: cam.id,
        attempts: SEND_RETRIES,
        source: last_err.expect("loop always sets last_err before exhausting retries"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    fn camera_at(id: u32, addr: SocketAddr) -> CameraConfig {
        CameraConfig {
            id,
            command_addr: addr,
            stream_addr: "127.0.0.1:0".parse().unwrap(),
            width: 4,
            height: 4,
            codec: motioncap_core::CodecTag::RawYuv,
        }
    }

    #[test]
    fn start_anchor_is_delivered_byte_for_byte() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        listener.set_read_timeout(Some(Duration::from_secs(1))).unwrap();
        let addr = listener.local_addr().unwrap();

        let cam = camera_at(0, addr);
        broadcast(&[cam], Command::StartAt(0x0102_0304_0506_0708), true).unwrap();

        let mut buf = [0u8; 8];
        let (n, _) = listener.recv_from(&mut buf).unwrap();
        assert_eq!(n, 8);
        assert_eq!(buf, [0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn stop_is_delivered_to_every_camera() {
        let l0 = UdpSocket::bind("127.0.0.1:0").unwrap();
        let l1 = UdpSocket::bind("127.0.0.1:0").unwrap();
        l0.set_read_timeout(Some(Duration::from_secs(1))).unwrap();
        l1.set_read_timeout(Some(Duration::from_secs(1))).unwrap();

        let cams = vec![
            camera_at(0, l0.local_addr().unwrap()),
            camera_at(1, l1.local_addr().unwrap()),
        ];
        broadcast(&cams, Command::Stop, true).unwrap();

        let mut buf = [0u8; 4];
        l0.recv_from(&mut buf).unwrap();
        assert_eq!(&buf, b"STOP");
        l1.recv_from(&mut buf).unwrap();
        assert_eq!(&buf, b"STOP");
    }

    #[test]
    fn unreachable_camera_is_non_fatal_during_shutdown() {
        // A closed socket we immediately drop: sends may still succeed at the
        // UDP layer (no connection state), so this only asserts that
        // fatal_on_failure=false never propagates an error either way.
        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let cam = camera_at(0, addr);
        assert!(broadcast(&[cam], Command::Stop, false).is_ok());
    }
}
