// crates/motioncap-ingest/src/worker.rs
//
// IngestWorker: owns one camera's lifecycle end to end — connect, receive,
// decode, timestamp, publish, recycle. Runs on its own OS thread; all
// cross-thread state is either a queue endpoint it exclusively owns or the
// shared shutdown flag.
//
// State machine: IDLE -> CONNECTED -> RUNNING <-> (DECODING | WAITING_FOR_EMPTY) -> DRAINING -> STOPPED

use std::io;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;
use log::{debug, warn};
use socket2::Socket;

use motioncap_core::constants::FAILED_WORKER_TIMESTAMP;
use motioncap_core::error::{NetworkError, ProtocolError};
use motioncap_core::{CameraConfig, TimestampedFrame, WorkerEvent};
use motioncap_queue::{Consumer, Producer};

use crate::decode::FrameDecoder;
use crate::wire::read_frame;

/// Read timeout installed on the camera's TCP stream so a blocking receive
/// cannot wait forever once shutdown has been requested.
const READ_TIMEOUT: Duration = Duration::from_millis(250);

/// Bounded exponential backoff applied to transient network errors before a
/// worker gives up and marks itself failed.
const MAX_TRANSIENT_RETRIES: u32 = 5;
const INITIAL_BACKOFF: Duration = Duration::from_millis(50);

pub struct IngestWorker {
    camera: CameraConfig,
    decoder: Box<dyn FrameDecoder>,
    empty_consumer: Consumer<TimestampedFrame>,
    filled_producer: Producer<TimestampedFrame>,
    events: Sender<WorkerEvent>,
    shutdown: Arc<AtomicBool>,
    /// Last timestamp accepted from the wire, used to detect regression.
    /// `None` until the first frame arrives.
    last_timestamp: Option<u64>,
}

impl IngestWorker {
    pub fn new(
        camera: CameraConfig,
        decoder: Box<dyn FrameDecoder>,
        empty_consumer: Consumer<TimestampedFrame>,
        filled_producer: Producer<TimestampedFrame>,
        events: Sender<WorkerEvent>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            camera,
            decoder,
            empty_consumer,
            filled_producer,
            events,
            shutdown,
            last_timestamp: None,
        }
    }

    /// Runs the worker to completion. Returns once the stream has failed
    /// persistently, the peer has closed the connection, a protocol
    /// violation occurred, or shutdown was requested. Never panics on a
    /// per-frame error — those are reported via `WorkerEvent` and recycled.
    pub fn run(mut self) {
        let camera_id = self.camera.id;

        let stream = match self.connect() {
            Ok(s) => s,
            Err(err) => {
                self.emit_network_error(&err, true);
                self.publish_worker_failed_sentinel();
                return;
            }
        };
        let _ = self.events.try_send(WorkerEvent::Connected { camera_id });

        let mut stream = stream;
        let mut transient_failures = 0u32;

        loop {
            if self.shutdown.load(Ordering::Acquire) {
                debug!("camera {camera_id}: shutdown observed, draining");
                break;
            }

            match read_frame(camera_id, &mut stream) {
                Ok(Ok(None)) => {
                    let err = NetworkError::ClosedByPeer { camera_id };
                    self.emit_network_error(&err, true);
                    self.publish_worker_failed_sentinel();
                    break;
                }
                Ok(Err(protocol_err)) => {
                    warn!("camera {camera_id}: {protocol_err}");
                    let err = NetworkError::Persistent {
                        camera_id,
                        attempts: 1,
                        source: io::Error::new(io::ErrorKind::InvalidData, protocol_err.to_string()),
                    };
                    self.emit_network_error(&err, true);
                    self.publish_worker_failed_sentinel();
                    break;
                }
                Ok(Ok(Some(wire_frame))) => {
                    if let Some(prev) = self.last_timestamp {
                        if wire_frame.timestamp < prev {
                            let protocol_err = ProtocolError::TimestampRegression {
                                camera_id,
                                prev,
                                next: wire_frame.timestamp,
                            };
                            warn!("camera {camera_id}: {protocol_err}");
                            let err = NetworkError::Persistent {
                                camera_id,
                                attempts: 1,
                                source: io::Error::new(io::ErrorKind::InvalidData, protocol_err.to_string()),
                            };
                            self.emit_network_error(&err, true);
                            self.publish_worker_failed_sentinel();
                            break;
                        }
                    }
                    self.last_timestamp = Some(wire_frame.timestamp);

                    transient_failures = 0;
                    let mut slot = self.acquire_empty_slot();
                    match self.decoder.decode(&wire_frame.payload, &mut slot.buffer) {
                        Ok(Ok(())) => {
                            slot.timestamp = wire_frame.timestamp;
                            self.filled_producer
                                .enqueue(slot)
                                .unwrap_or_else(|_| unreachable!(
                                    "filled_q[{camera_id}] must have room by the pool invariant"
                                ));
                            let _ = self.events.try_send(WorkerEvent::Decoded { camera_id });
                        }
                        Ok(Err(decode_err)) => {
                            let _ = self.events.try_send(WorkerEvent::DecodeError {
                                camera_id,
                                detail: decode_err.to_string(),
                            });
                            self.publish_failed(slot);
                        }
                        Err(protocol_err) => {
                            warn!("camera {camera_id}: {protocol_err}");
                            let err = NetworkError::Persistent {
                                camera_id,
                                attempts: 1,
                                source: io::Error::new(io::ErrorKind::InvalidData, protocol_err.to_string()),
                            };
                            self.emit_network_error(&err, true);
                            self.publish_failed(slot);
                            break;
                        }
                    }
                }
                Err(io_err)
                    if io_err.kind() == io::ErrorKind::WouldBlock
                        || io_err.kind() == io::ErrorKind::TimedOut =>
                {
                    // Read timeout: just a chance to re-check shutdown.
                    continue;
                }
                Err(io_err) => {
                    transient_failures += 1;
                    if transient_failures >= MAX_TRANSIENT_RETRIES {
                        let err = NetworkError::Persistent {
                            camera_id,
                            attempts: transient_failures,
                            source: io_err,
                        };
                        self.emit_network_error(&err, true);
                        self.publish_worker_failed_sentinel();
                        break;
                    }
                    let err = NetworkError::Transient {
                        camera_id,
                        source: io_err,
                    };
                    warn!("camera {camera_id}: {err}, retrying ({transient_failures}/{MAX_TRANSIENT_RETRIES})");
                    let _ = self.events.try_send(WorkerEvent::NetworkError {
                        camera_id,
                        detail: err.to_string(),
                        fatal: false,
                    });
                    std::thread::sleep(INITIAL_BACKOFF * transient_failures);
                }
            }
        }

        let _ = self.events.try_send(WorkerEvent::Stopped { camera_id });
    }

    fn connect(&self) -> Result<TcpStream, NetworkError> {
        let stream = TcpStream::connect(self.camera.stream_addr).map_err(|source| {
            NetworkError::Persistent {
                camera_id: self.camera.id,
                attempts: 1,
                source,
            }
        })?;

        let socket = Socket::from(stream);
        socket
            .set_read_timeout(Some(READ_TIMEOUT))
            .map_err(|source| NetworkError::Transient {
                camera_id: self.camera.id,
                source,
            })?;
        Ok(socket.into())
    }

    /// Blocks (spin-with-yield) until an empty buffer is available. This is
    /// the intended backpressure point: if the synchronizer stalls, this
    /// spin — and therefore the camera's network stream — backs up.
    fn acquire_empty_slot(&mut self) -> TimestampedFrame {
        loop {
            if let Some(slot) = self.empty_consumer.dequeue() {
                return slot;
            }
            std::thread::yield_now();
        }
    }

    /// Publishes a buffer whose decode failed, stamped with the same
    /// sentinel timestamp used for a persistently failed worker. `empty_q[i]`'s
    /// producer end belongs to the synchronizer under the SPSC single-writer
    /// contract, so this worker cannot recycle directly — instead it hands
    /// the buffer onward through `filled_q[i]` with a timestamp the
    /// synchronizer's own alignment step (always "older than the newest
    /// capture") will recycle on its next iteration. See DESIGN.md.
    fn publish_failed(&mut self, mut slot: TimestampedFrame) {
        slot.timestamp = FAILED_WORKER_TIMESTAMP;
        self.filled_producer
            .enqueue(slot)
            .unwrap_or_else(|_| unreachable!(
                "filled_q[{}] must have room by the pool invariant",
                self.camera.id
            ));
    }

    /// Acquires a fresh empty slot and publishes it as the failed-worker
    /// sentinel. For use by fatal paths that give up before (or without)
    /// already holding a slot of their own — connect failure, closed-by-peer,
    /// a fatal protocol error read off the wire, and persistent transient
    /// exhaustion. The decode-failure path publishes through `publish_failed`
    /// directly instead, since it already holds the slot it decoded into.
    fn publish_worker_failed_sentinel(&mut self) {
        let slot = self.acquire_empty_slot();
        self.publish_failed(slot);
    }

    /// Logs and reports a network failure over the diagnostic channel.
    fn emit_network_error(&self, err: &NetworkError, fatal: bool) {
        warn!("camera {}: {err}", self.camera.id);
        let _ = self.events.try_send(WorkerEvent::NetworkError {
            camera_id: self.camera.id,
            detail: err.to_string(),
            fatal,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::RawYuvDecoder;
    use motioncap_queue::build_pool;
    use std::io::Write;
    use std::net::TcpListener;

    fn spawn_camera_stub(addr: std::net::SocketAddr, frames: Vec<(u64, Vec<u8>)>) {
        let listener = TcpListener::bind(addr).unwrap();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            for (ts, payload) in frames {
                stream.write_all(&(payload.len() as u32).to_le_bytes()).unwrap();
                stream.write_all(&ts.to_le_bytes()).unwrap();
                stream.write_all(&payload).unwrap();
            }
            stream.flush().unwrap();
            // Hold the connection open briefly so the worker's shutdown path
            // (not EOF) is what ends the test.
            std::thread::sleep(Duration::from_millis(500));
        });
    }

    #[test]
    fn decodes_and_publishes_frames_in_order() {
        let listener_addr: std::net::SocketAddr = "127.0.0.1:0".parse().unwrap();
        let bound = TcpListener::bind(listener_addr).unwrap();
        let addr = bound.local_addr().unwrap();
        drop(bound);

        let frame_len = motioncap_core::frame::yuv420_byte_len(4, 4);
        let frames = vec![
            (100u64, vec![1u8; frame_len]),
            (200u64, vec![2u8; frame_len]),
        ];
        spawn_camera_stub(addr, frames);

        let camera = CameraConfig {
            id: 0,
            command_addr: "127.0.0.1:0".parse().unwrap(),
            stream_addr: addr,
            width: 4,
            height: 4,
            codec: motioncap_core::CodecTag::RawYuv,
        };

        let handles = build_pool(4, 4, 4);
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker = IngestWorker::new(
            camera,
            Box::new(RawYuvDecoder::new(0)),
            handles.empty_consumer,
            handles.filled_producer,
            events_tx,
            Arc::clone(&shutdown),
        );

        let mut filled_consumer = handles.filled_consumer;
        let join = std::thread::spawn(move || worker.run());

        let first = wait_for_dequeue(&mut filled_consumer);
        assert_eq!(first.timestamp, 100);
        let second = wait_for_dequeue(&mut filled_consumer);
        assert_eq!(second.timestamp, 200);

        shutdown.store(true, Ordering::Release);
        join.join().unwrap();

        let saw_connected = events_rx
            .try_iter()
            .any(|e| matches!(e, WorkerEvent::Connected { .. }));
        assert!(saw_connected);
    }

    fn wait_for_dequeue(consumer: &mut motioncap_queue::Consumer<TimestampedFrame>) -> TimestampedFrame {
        loop {
            if let Some(f) = consumer.dequeue() {
                return f;
            }
            std::thread::yield_now();
        }
    }

    #[test]
    fn consumer_stall_backpressures_the_worker_without_dropping_frames() {
        let listener_addr: std::net::SocketAddr = "127.0.0.1:0".parse().unwrap();
        let bound = TcpListener::bind(listener_addr).unwrap();
        let addr = bound.local_addr().unwrap();
        drop(bound);

        let frame_len = motioncap_core::frame::yuv420_byte_len(4, 4);
        let timestamps = [100u64, 200, 300, 400, 500];
        let frames = timestamps.iter().map(|&ts| (ts, vec![ts as u8; frame_len])).collect();
        spawn_camera_stub(addr, frames);

        let camera = CameraConfig {
            id: 0,
            command_addr: "127.0.0.1:0".parse().unwrap(),
            stream_addr: addr,
            width: 4,
            height: 4,
            codec: motioncap_core::CodecTag::RawYuv,
        };

        // Capacity smaller than the number of frames the stub sends, so the
        // worker must block on `acquire_empty_slot` (the intended
        // backpressure point) rather than drop anything once the pool runs
        // dry.
        let handles = build_pool(2, 4, 4);
        let (events_tx, _events_rx) = crossbeam_channel::unbounded();
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker = IngestWorker::new(
            camera,
            Box::new(RawYuvDecoder::new(0)),
            handles.empty_consumer,
            handles.filled_producer,
            events_tx,
            Arc::clone(&shutdown),
        );

        let mut filled_consumer = handles.filled_consumer;
        let mut empty_producer = handles.empty_producer;
        let join = std::thread::spawn(move || worker.run());

        // Simulate a stalled synchronizer: wait before consuming anything,
        // giving the worker time to fill and then block on the empty pool.
        std::thread::sleep(Duration::from_millis(200));

        let mut seen = Vec::new();
        for _ in 0..timestamps.len() {
            let f = wait_for_dequeue(&mut filled_consumer);
            seen.push(f.timestamp);
            empty_producer.enqueue(f).unwrap();
        }

        shutdown.store(true, Ordering::Release);
        join.join().unwrap();

        assert_eq!(seen, timestamps.to_vec());
    }

    #[test]
    fn timestamp_regression_is_fatal_and_publishes_sentinel() {
        let listener_addr: std::net::SocketAddr = "127.0.0.1:0".parse().unwrap();
        let bound = TcpListener::bind(listener_addr).unwrap();
        let addr = bound.local_addr().unwrap();
        drop(bound);

        let frame_len = motioncap_core::frame::yuv420_byte_len(4, 4);
        let frames = vec![
            (200u64, vec![1u8; frame_len]),
            (100u64, vec![2u8; frame_len]), // regresses relative to 200
        ];
        spawn_camera_stub(addr, frames);

        let camera = CameraConfig {
            id: 0,
            command_addr: "127.0.0.1:0".parse().unwrap(),
            stream_addr: addr,
            width: 4,
            height: 4,
            codec: motioncap_core::CodecTag::RawYuv,
        };

        let handles = build_pool(4, 4, 4);
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker = IngestWorker::new(
            camera,
            Box::new(RawYuvDecoder::new(0)),
            handles.empty_consumer,
            handles.filled_producer,
            events_tx,
            Arc::clone(&shutdown),
        );

        let mut filled_consumer = handles.filled_consumer;
        let join = std::thread::spawn(move || worker.run());

        let first = wait_for_dequeue(&mut filled_consumer);
        assert_eq!(first.timestamp, 100);
        let sentinel = wait_for_dequeue(&mut filled_consumer);
        assert_eq!(sentinel.timestamp, FAILED_WORKER_TIMESTAMP);

        join.join().unwrap();

        let saw_fatal_network_error = events_rx
            .try_iter()
            .any(|e| matches!(e, WorkerEvent::NetworkError { fatal: true, .. }));
        assert!(saw_fatal_network_error);
    }

    #[test]
    fn closed_by_peer_publishes_sentinel() {
        let listener_addr: std::net::SocketAddr = "127.0.0.1:0".parse().unwrap();
        let bound = TcpListener::bind(listener_addr).unwrap();
        let addr = bound.local_addr().unwrap();
        drop(bound);

        // Stub closes the connection immediately without sending any frame.
        let listener = bound;
        std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            drop(stream);
        });

        let camera = CameraConfig {
            id: 0,
            command_addr: "127.0.0.1:0".parse().unwrap(),
            stream_addr: addr,
            width: 4,
            height: 4,
            codec: motioncap_core::CodecTag::RawYuv,
        };

        let handles = build_pool(4, 4, 4);
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker = IngestWorker::new(
            camera,
            Box::new(RawYuvDecoder::new(0)),
            handles.empty_consumer,
            handles.filled_producer,
            events_tx,
            Arc::clone(&shutdown),
        );

        let mut filled_consumer = handles.filled_consumer;
        let join = std::thread::spawn(move || worker.run());

        let sentinel = wait_for_dequeue(&mut filled_consumer);
        assert_eq!(sentinel.timestamp, FAILED_WORKER_TIMESTAMP);

        join.join().unwrap();

        let saw_fatal_network_error = events_rx
            .try_iter()
            .any(|e| matches!(e, WorkerEvent::NetworkError { fatal: true, .. }));
        assert!(saw_fatal_network_error);
    }
}
