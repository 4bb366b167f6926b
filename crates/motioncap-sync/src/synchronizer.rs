// crates/motioncap-sync/src/synchronizer.rs
//
// Cross-camera synchronizer (component E): drains one filled buffer per
// camera, aligns by timestamp equality, recycles mismatches, and emits
// AlignedSets to a downstream callback. Runs on a single thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{error, info};

use motioncap_core::time::format_duration_secs;
use motioncap_core::{AlignedSet, TimestampedFrame};
use motioncap_queue::{Consumer, Producer};

/// How often the periodic alignment-health summary is logged.
const SUMMARY_INTERVAL: Duration = Duration::from_secs(10);

/// Why the synchronizer stopped running.
#[derive(Debug, PartialEq, Eq)]
pub enum StopReason {
    /// `target_aligned_sets` was reached.
    TargetReached,
    /// The shared `stop` flag was observed (Ctrl-C / host shutdown request).
    ExternalStop,
    /// A camera never produced its first frame within `startup_timeout`.
    /// Dropped-camera recovery beyond this is explicitly out of scope.
    CameraStartupTimeout { camera_id: u32 },
}

/// One camera's pair of queue endpoints as seen by the synchronizer: it
/// reads filled buffers and writes recycled-empty buffers.
pub struct CameraEndpoints {
    pub camera_id: u32,
    pub filled_consumer: Consumer<TimestampedFrame>,
    pub empty_producer: Producer<TimestampedFrame>,
}

pub struct Synchronizer {
    endpoints: Vec<CameraEndpoints>,
    target_aligned_sets: Option<u64>,
    startup_timeout: Duration,
    stop: Arc<AtomicBool>,
}

impl Synchronizer {
    pub fn new(
        endpoints: Vec<CameraEndpoints>,
        target_aligned_sets: Option<u64>,
        startup_timeout: Duration,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            endpoints,
            target_aligned_sets,
            startup_timeout,
            stop,
        }
    }

    /// Runs until `target_aligned_sets` aligned sets have been emitted, the
    /// `stop` flag is observed, or a camera's startup timeout expires.
    /// `on_aligned_set` is called once per complete set; buffers are
    /// recycled to their empty queues immediately after it returns.
    pub fn run(mut self, mut on_aligned_set: impl FnMut(&AlignedSet)) -> StopReason {
        let n = self.endpoints.len();
        let mut current: Vec<Option<TimestampedFrame>> = (0..n).map(|_| None).collect();
        let mut recycle_counts = vec![0u64; n];
        let mut ever_filled = vec![false; n];
        let started_at = Instant::now();
        let mut last_summary = Instant::now();
        let mut emitted: u64 = 0;

        'run: loop {
            if let Some(target) = self.target_aligned_sets {
                if emitted >= target {
                    return StopReason::TargetReached;
                }
            }

            // Step 1: fill slots.
            loop {
                if self.stop.load(Ordering::Acquire) {
                    return StopReason::ExternalStop;
                }

                let mut all_filled = true;
                for i in 0..n {
                    if current[i].is_some() {
                        continue;
                    }
                    all_filled = false;
                    if let Some(frame) = self.endpoints[i].filled_consumer.dequeue() {
                        ever_filled[i] = true;
                        current[i] = Some(frame);
                    } else if !ever_filled[i] && started_at.elapsed() > self.startup_timeout {
                        let camera_id = self.endpoints[i].camera_id;
                        error!(
                            "camera {camera_id}: produced no frame within {:?} of startup, stopping",
                            self.startup_timeout
                        );
                        return StopReason::CameraStartupTimeout { camera_id };
                    }
                }

                if all_filled {
                    break;
                }
                std::thread::yield_now();
            }

            // Step 2: compute max.
            let t_max = current
                .iter()
                .map(|f| f.as_ref().expect("all slots filled above").timestamp)
                .max()
                .expect("n > 0");

            // Step 3: align — recycle anything older than the newest capture.
            let mut any_cleared = false;
            for i in 0..n {
                let ts = current[i].as_ref().expect("all slots filled above").timestamp;
                if ts < t_max {
                    let frame = current[i].take().unwrap();
                    recycle_counts[i] += 1;
                    self.endpoints[i]
                        .empty_producer
                        .enqueue(frame)
                        .unwrap_or_else(|_| {
                            unreachable!("empty_q[{}] must have room by the pool invariant", i)
                        });
                    any_cleared = true;
                }
            }
            if any_cleared {
                continue 'run;
            }

            // Step 4: commit. All timestamps equal — emit, then release.
            let frames: Vec<TimestampedFrame> = current
                .iter_mut()
                .map(|slot| slot.take().expect("all slots filled and aligned above"))
                .collect();
            let aligned = AlignedSet {
                timestamp: t_max,
                frames: &frames,
            };
            on_aligned_set(&aligned);
            emitted += 1;

            for (i, frame) in frames.into_iter().enumerate() {
                self.endpoints[i]
                    .empty_producer
                    .enqueue(frame)
                    .unwrap_or_else(|_| {
                        unreachable!("empty_q[{}] must have room by the pool invariant", i)
                    });
            }

            if last_summary.elapsed() >= SUMMARY_INTERVAL {
                info!(
                    "aligned {emitted} sets in {} (recycle counts: {recycle_counts:?})",
                    format_duration_secs(started_at.elapsed().as_secs_f64())
                );
                last_summary = Instant::now();
            }
        }
    }
}
