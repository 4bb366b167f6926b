// crates/motioncap-host/src/cli.rs
//
// Process-level controls (component J): config path, log path/level, and an
// optional override of the manifest's target aligned-set count.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "motioncap-host", about = "Multi-camera motion-capture ingest host")]
pub struct Cli {
    /// Path to the camera-fleet YAML manifest.
    #[arg(long)]
    pub config: PathBuf,

    /// Write logs to this file instead of stderr.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Minimum log level: error, warn, info, debug, trace.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Override the manifest's target aligned-set count. Omit to run until
    /// Ctrl-C (or the manifest's own `target_aligned_sets`, if set).
    #[arg(long)]
    pub target_sets: Option<u64>,
}
