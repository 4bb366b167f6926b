// crates/motioncap-host/src/main.rs

mod affinity;
mod bootstrap;
mod cli;

use std::fs::OpenOptions;
use std::process::ExitCode;

use clap::Parser;
use log::error;
use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    init_logging(&cli);

    ffmpeg_the_third::init().expect("ffmpeg init failed");

    match bootstrap::run(&cli) {
        Ok(bootstrap::RunOutcome::Clean) => ExitCode::SUCCESS,
        Ok(bootstrap::RunOutcome::CameraStartupTimeout { camera_id }) => {
            error!("camera {camera_id} never produced a first frame; stopping");
            ExitCode::from(4)
        }
        Err(err) => {
            error!("{err}");
            exit_code_for(err.exit_code())
        }
    }
}

fn exit_code_for(code: i32) -> ExitCode {
    ExitCode::from(code.unsigned_abs() as u8)
}

fn init_logging(cli: &cli::Cli) {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(&cli.log_level);

    if let Some(path) = &cli.log_file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => {
                eprintln!("failed to open log file {}: {e}; logging to stderr", path.display());
            }
        }
    }

    builder.init();
}
