// crates/motioncap-core/src/error.rs
//
// The error taxonomy for the ingest pipeline. Each variant maps to one of the
// five kinds from the error-handling design: Config, Resource, Network,
// Decode, Protocol. Fatal vs recoverable is a property of *where* an error is
// caught, not of the type — callers decide whether to propagate or recycle.

/// Fatal at startup: the camera manifest could not be turned into a valid run.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("camera manifest not found at {0}")]
    NotFound(std::path::PathBuf),

    #[error("failed to parse camera manifest: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("camera manifest declares zero cameras")]
    NoCameras,

    #[error("duplicate camera id {0} in manifest")]
    DuplicateCameraId(u32),

    #[error("camera {id}: frame dimensions {width}x{height} must be non-zero and even (4:2:0 chroma subsampling)")]
    InvalidDimensions { id: u32, width: u32, height: u32 },
}

/// Fatal: the process could not acquire a resource it needs to run.
/// CPU affinity failures are constructed but logged at WARN and otherwise
/// swallowed by the caller (see motioncap-host::affinity) — they are listed
/// here because they are still part of the taxonomy callers can observe.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("failed to allocate {bytes} bytes for camera {camera_id} buffer pool: {source}")]
    Allocation {
        camera_id: u32,
        bytes: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn ingest thread for camera {camera_id}: {source}")]
    ThreadSpawn {
        camera_id: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to pin thread to core {core}: {detail}")]
    Affinity { core: usize, detail: String },

    #[error("failed to initialize decoder for camera {camera_id}: {detail}")]
    DecoderInit { camera_id: u32, detail: String },
}

/// Per-camera, recoverable or fatal depending on persistence.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("camera {camera_id}: transient network error: {source}")]
    Transient {
        camera_id: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("camera {camera_id}: persistent network failure after {attempts} attempts: {source}")]
    Persistent {
        camera_id: u32,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("camera {camera_id}: connection closed by peer")]
    ClosedByPeer { camera_id: u32 },
}

/// Per-frame, always recoverable: the frame is dropped and the buffer recycled.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("camera {camera_id}: decode failed: {detail}")]
    Failed { camera_id: u32, detail: String },
}

/// Fatal: the wire protocol was violated in a way that cannot be locally
/// recovered from without risking silent data corruption.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("camera {camera_id}: timestamp regression: {prev} -> {next}")]
    TimestampRegression {
        camera_id: u32,
        prev: u64,
        next: u64,
    },

    #[error("camera {camera_id}: malformed frame length prefix {len}")]
    MalformedLength { camera_id: u32, len: u32 },

    #[error("camera {camera_id}: decoded frame size {got} does not match expected {expected}")]
    SizeMismatch {
        camera_id: u32,
        expected: usize,
        got: usize,
    },
}

/// Umbrella error returned by bootstrap-time fallible operations, so
/// `motioncap-host::main` has one type to match on for its exit code.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Network(#[from] NetworkError),
}

impl StartupError {
    /// Negative errno-style process exit code, per the external-interfaces
    /// contract: distinct codes per error kind so operators can script on it.
    pub fn exit_code(&self) -> i32 {
        match self {
            StartupError::Config(_) => -1,
            StartupError::Resource(_) => -2,
            StartupError::Network(_) => -3,
        }
    }
}
