// crates/motioncap-core/src/config.rs
//
// Camera-fleet manifest: an ordered list of camera records plus run-level
// parameters, loaded once at bootstrap. See SPEC_FULL.md §4.H for the
// external YAML shape.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Which codec a camera's frame stream is encoded with. Determines which
/// `FrameDecoder` the ingest worker instantiates for that camera.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CodecTag {
    H264,
    Mjpeg,
    /// Already-planar YUV420P, no decode needed — loopback/testing cameras.
    RawYuv,
}

fn default_codec() -> CodecTag {
    CodecTag::H264
}

/// One camera's immutable configuration. Created by bootstrap from the
/// manifest and borrowed read-only by the ingest worker, the broadcaster,
/// and the orchestrator for the lifetime of the run.
#[derive(Clone, Debug, Deserialize)]
pub struct CameraConfig {
    pub id: u32,
    pub command_addr: SocketAddr,
    pub stream_addr: SocketAddr,
    pub width: u32,
    pub height: u32,

    #[serde(default = "default_codec")]
    pub codec: CodecTag,
}

fn default_buffers_per_camera() -> usize {
    crate::constants::FRAME_BUFS_PER_THREAD
}

/// The full manifest: the camera fleet plus run parameters. Deserialized
/// directly from YAML — field names are the on-disk schema.
#[derive(Clone, Debug, Deserialize)]
pub struct SystemConfig {
    pub cameras: Vec<CameraConfig>,

    #[serde(default = "default_buffers_per_camera")]
    pub buffers_per_camera: usize,

    /// `None` means run until externally signaled (Ctrl-C / shutdown request).
    #[serde(default)]
    pub target_aligned_sets: Option<u64>,

    #[serde(default)]
    pub log_level: Option<String>,
}

impl SystemConfig {
    /// Parses and validates a manifest from `path`. Validation failures are
    /// reported before any thread is spawned, per the bootstrap contract.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::NotFound(path.to_path_buf()))?;
        let config: SystemConfig = serde_yaml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.cameras.is_empty() {
            return Err(ConfigError::NoCameras);
        }

        let mut seen = HashSet::with_capacity(self.cameras.len());
        for cam in &self.cameras {
            if !seen.insert(cam.id) {
                return Err(ConfigError::DuplicateCameraId(cam.id));
            }
            if cam.width == 0 || cam.height == 0 || cam.width % 2 != 0 || cam.height % 2 != 0 {
                return Err(ConfigError::InvalidDimensions {
                    id: cam.id,
                    width: cam.width,
                    height: cam.height,
                });
            }
        }

        Ok(())
    }

    pub fn camera_count(&self) -> usize {
        self.cameras.len()
    }
}
