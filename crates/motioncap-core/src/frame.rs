// crates/motioncap-core/src/frame.rs
//
// Pure data types that flow across the queue between an ingest worker and the
// synchronizer. No network I/O, no decoding — just the shapes.

/// Planar YUV 4:2:0 frame of fixed size `width * height * 3 / 2` bytes,
/// laid out as Y plane (packed, no stride) followed by U then V
/// (each `width/2 * height/2` bytes). This is the same packed layout used
/// throughout the decode pipeline: strides are removed so buffers of the
/// same dimensions are always the same byte length regardless of source.
#[derive(Clone, Debug)]
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    data: Vec<u8>,
}

impl FrameBuffer {
    /// Allocates a zeroed buffer of the exact size this (width, height) pair
    /// requires. Called once per slot at pool-allocation time; never again.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; yuv420_byte_len(width, height)],
        }
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// `width * height * 3 / 2` — the packed YUV420P frame size for the given
/// dimensions. `width` and `height` must both be even; the caller validates
/// this once at config-load time (see `config::validate`).
pub fn yuv420_byte_len(width: u32, height: u32) -> usize {
    let w = width as usize;
    let h = height as usize;
    w * h + 2 * ((w / 2) * (h / 2))
}

/// A decoded frame stamped with its capture time. The timestamp is written
/// once by the ingest worker before the buffer is published, and is read-only
/// thereafter until the buffer is recycled to the empty queue.
pub struct TimestampedFrame {
    pub timestamp: u64,
    pub buffer: FrameBuffer,
}

impl TimestampedFrame {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            timestamp: 0,
            buffer: FrameBuffer::new(width, height),
        }
    }
}

/// One timestamp-aligned sample: exactly one frame per camera, all sharing a
/// single capture timestamp. Transient — the synchronizer builds one,
/// hands it to the consumer callback, then dissolves it back into the pools.
pub struct AlignedSet<'a> {
    pub timestamp: u64,
    pub frames: &'a [TimestampedFrame],
}
