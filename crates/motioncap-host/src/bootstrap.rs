// crates/motioncap-host/src/bootstrap.rs
//
// Topology/bootstrap (component F): parse config, allocate pools, spawn
// workers, broadcast start, run the synchronizer, broadcast stop, join,
// free. See SPEC_FULL.md §4.F for the linear sequence this follows.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};

use motioncap_core::error::{ResourceError, StartupError};
use motioncap_core::{Command, SystemConfig};
use motioncap_ingest::IngestWorker;
use motioncap_sync::{CameraEndpoints, StopReason, Synchronizer};

use crate::affinity;
use crate::cli::Cli;

/// Per-camera startup grace period before the synchronizer gives up waiting
/// for a first frame. See SPEC_FULL.md §9 — dropped-camera recovery beyond
/// this point is out of scope, so expiry ends the run rather than retrying.
const CAMERA_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub enum RunOutcome {
    Clean,
    CameraStartupTimeout { camera_id: u32 },
}

pub fn run(cli: &Cli) -> Result<RunOutcome, StartupError> {
    let config = SystemConfig::load(&cli.config)?;
    let target_aligned_sets = cli.target_sets.or(config.target_aligned_sets);
    let n = config.camera_count();
    info!("loaded manifest: {n} cameras, {} buffers/camera", config.buffers_per_camera);

    let mut sync_endpoints = Vec::with_capacity(n);
    let mut worker_specs = Vec::with_capacity(n);
    for cam in &config.cameras {
        let pool = motioncap_queue::build_pool(config.buffers_per_camera, cam.width, cam.height);
        sync_endpoints.push(CameraEndpoints {
            camera_id: cam.id,
            filled_consumer: pool.filled_consumer,
            empty_producer: pool.empty_producer,
        });
        worker_specs.push((cam.clone(), pool.filled_producer, pool.empty_consumer));
    }

    let (events_tx, events_rx) = crossbeam_channel::bounded(1024);
    let shutdown = Arc::new(AtomicBool::new(false));
    let cores = affinity::available_cores();

    let mut worker_threads = Vec::with_capacity(n);
    for (i, (cam, filled_producer, empty_consumer)) in worker_specs.into_iter().enumerate() {
        let decoder = motioncap_ingest::decoder_for(cam.id, cam.codec, cam.width, cam.height).map_err(|e| {
            ResourceError::DecoderInit {
                camera_id: cam.id,
                detail: e.to_string(),
            }
        })?;

        let events_tx = events_tx.clone();
        let shutdown = Arc::clone(&shutdown);
        let camera_id = cam.id;
        let handle = std::thread::Builder::new()
            .name(format!("ingest-{camera_id}"))
            .spawn(move || {
                affinity::pin_current_thread(i % cores.max(1));
                let worker = IngestWorker::new(cam, decoder, empty_consumer, filled_producer, events_tx, shutdown);
                worker.run();
            })
            .map_err(|source| ResourceError::ThreadSpawn { camera_id, source })?;
        worker_threads.push(handle);
    }

    // Drain diagnostic events on a dedicated logging thread; it owns the
    // receiver for the rest of the run and exits once every sender is
    // dropped (all workers joined).
    let log_thread = std::thread::spawn(move || {
        for event in events_rx.iter() {
            log_worker_event(&event);
        }
    });

    motioncap_ingest::broadcast(
        &config.cameras,
        Command::StartAt(motioncap_core::time::start_anchor_ns(motioncap_core::constants::START_ANCHOR_DELAY)),
        true,
    )
    .map_err(StartupError::from)?;

    affinity::pin_current_thread(n % cores.max(1));
    let sync = Synchronizer::new(sync_endpoints, target_aligned_sets, CAMERA_STARTUP_TIMEOUT, Arc::clone(&shutdown));

    let outcome_reason = sync.run(|_aligned_set| {
        // Downstream consumer hook: this binary's job ends at emitting
        // aligned sets; a real deployment wires a dataset writer or 3D
        // reconstruction pipeline in here.
    });

    shutdown.store(true, Ordering::Release);
    if let Err(err) = motioncap_ingest::broadcast(&config.cameras, Command::Stop, false) {
        warn!("stop broadcast: {err}");
    }

    for handle in worker_threads {
        let _ = handle.join();
    }
    drop(events_tx);
    let _ = log_thread.join();

    match outcome_reason {
        StopReason::TargetReached | StopReason::ExternalStop => Ok(RunOutcome::Clean),
        StopReason::CameraStartupTimeout { camera_id } => {
            Ok(RunOutcome::CameraStartupTimeout { camera_id })
        }
    }
}

fn log_worker_event(event: &motioncap_core::WorkerEvent) {
    use motioncap_core::WorkerEvent::*;
    match event {
        Connected { camera_id } => info!("camera {camera_id}: connected"),
        Decoded { camera_id } => {
            let _ = camera_id; // per-frame, too noisy for INFO; kept for future TRACE wiring
        }
        DecodeError { camera_id, detail } => warn!("camera {camera_id}: decode error: {detail}"),
        NetworkError { camera_id, detail, fatal } => {
            if *fatal {
                error!("camera {camera_id}: {detail}");
            } else {
                warn!("camera {camera_id}: {detail}");
            }
        }
        Stopped { camera_id } => info!("camera {camera_id}: stopped"),
    }
}
