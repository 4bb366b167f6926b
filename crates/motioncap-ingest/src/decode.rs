// crates/motioncap-ingest/src/decode.rs
//
// FrameDecoder: the black-box boundary between "bytes off the wire" and "a
// packed YUV420P FrameBuffer". Two implementations ship — FfmpegDecoder for
// real camera codecs, RawYuvDecoder for loopback testing and cameras that
// already send planar YUV420P.

use ffmpeg_the_third as ffmpeg;
use ffmpeg::codec::{context::Context as CodecContext, packet::Packet};
use ffmpeg::decoder::video::Video as VideoDecoder;
use ffmpeg::format::Pixel;
use ffmpeg::software::scaling::{context::Context as SwsContext, flag::Flags};
use ffmpeg::util::frame::video::Video as VideoFrame;

use motioncap_core::error::{DecodeError, ProtocolError};
use motioncap_core::frame::FrameBuffer;
use motioncap_core::CodecTag;

use crate::yuv::extract_yuv;

/// Decodes one camera's encoded frame payloads into a caller-provided
/// `FrameBuffer`. Implementations own whatever per-stream decoder state they
/// need (e.g. inter-frame prediction); the worker calls `decode` once per
/// received payload and never touches the implementation directly.
///
/// The outer `Result` carries a fatal `ProtocolError` (the decoded/copied
/// payload doesn't match the buffer size the camera's manifest dimensions
/// require — a configuration problem, not a one-off garbled frame); the
/// inner `Result` carries a recoverable per-frame `DecodeError` that the
/// worker recycles and continues past. Mirrors `wire::read_frame`'s nested
/// `Result` for the same reason.
pub trait FrameDecoder: Send {
    fn decode(&mut self, encoded: &[u8], out: &mut FrameBuffer) -> Result<Result<(), DecodeError>, ProtocolError>;
}

/// Builds the `FrameDecoder` appropriate for a camera's configured codec.
pub fn decoder_for(camera_id: u32, codec: CodecTag, width: u32, height: u32) -> Result<Box<dyn FrameDecoder>, DecodeError> {
    match codec {
        CodecTag::RawYuv => Ok(Box::new(RawYuvDecoder::new(camera_id))),
        CodecTag::H264 | CodecTag::Mjpeg => {
            Ok(Box::new(FfmpegDecoder::new(camera_id, codec, width, height)?))
        }
    }
}

fn ffmpeg_codec_id(codec: CodecTag) -> ffmpeg::codec::Id {
    match codec {
        CodecTag::H264 => ffmpeg::codec::Id::H264,
        CodecTag::Mjpeg => ffmpeg::codec::Id::MJPEG,
        CodecTag::RawYuv => unreachable!("RawYuv never builds an FfmpegDecoder"),
    }
}

/// Real decode path: feeds each received payload to a persistent ffmpeg
/// decoder (so H.264 inter-frame prediction works across calls), scales the
/// result to YUV420P, and packs it into the caller's buffer.
pub struct FfmpegDecoder {
    camera_id: u32,
    decoder: VideoDecoder,
    scaler: Option<SwsContext>,
    width: u32,
    height: u32,
}

impl FfmpegDecoder {
    pub fn new(camera_id: u32, codec: CodecTag, width: u32, height: u32) -> Result<Self, DecodeError> {
        let codec_id = ffmpeg_codec_id(codec);
        let ff_codec = ffmpeg::decoder::find(codec_id).ok_or_else(|| DecodeError::Failed {
            camera_id,
            detail: format!("no ffmpeg decoder registered for {codec_id:?}"),
        })?;

        let ctx = CodecContext::new_with_codec(ff_codec);
        let decoder = ctx.decoder().video().map_err(|e| DecodeError::Failed {
            camera_id,
            detail: format!("opening {codec_id:?} decoder: {e}"),
        })?;

        Ok(Self {
            camera_id,
            decoder,
            scaler: None,
            width,
            height,
        })
    }

    fn scaler_for(&mut self) -> Result<&mut SwsContext, DecodeError> {
        if self.scaler.is_none() {
            let sws = SwsContext::get(
                self.decoder.format(),
                self.decoder.width(),
                self.decoder.height(),
                Pixel::YUV420P,
                self.width,
                self.height,
                Flags::BILINEAR,
            )
            .map_err(|e| DecodeError::Failed {
                camera_id: self.camera_id,
                detail: format!("building scaler: {e}"),
            })?;
            self.scaler = Some(sws);
        }
        Ok(self.scaler.as_mut().unwrap())
    }
}

impl FrameDecoder for FfmpegDecoder {
    fn decode(&mut self, encoded: &[u8], out: &mut FrameBuffer) -> Result<Result<(), DecodeError>, ProtocolError> {
        let packet = Packet::copy(encoded);
        if let Err(e) = self.decoder.send_packet(&packet) {
            return Ok(Err(DecodeError::Failed {
                camera_id: self.camera_id,
                detail: format!("send_packet: {e}"),
            }));
        }

        let mut decoded = VideoFrame::empty();
        if let Err(e) = self.decoder.receive_frame(&mut decoded) {
            return Ok(Err(DecodeError::Failed {
                camera_id: self.camera_id,
                detail: format!("receive_frame: {e}"),
            }));
        }

        let (width, height) = (self.width, self.height);
        let camera_id = self.camera_id;
        let scaler = match self.scaler_for() {
            Ok(s) => s,
            Err(e) => return Ok(Err(e)),
        };
        let mut scaled = VideoFrame::empty();
        if let Err(e) = scaler.run(&decoded, &mut scaled) {
            return Ok(Err(DecodeError::Failed {
                camera_id,
                detail: format!("scale: {e}"),
            }));
        }

        let uv_w = (width / 2) as usize;
        let uv_h = (height / 2) as usize;
        let packed = extract_yuv(&scaled, width as usize, height as usize, uv_w, uv_h);

        if packed.len() != out.byte_len() {
            return Err(ProtocolError::SizeMismatch {
                camera_id,
                expected: out.byte_len(),
                got: packed.len(),
            });
        }
        out.as_mut_slice().copy_from_slice(&packed);
        Ok(Ok(()))
    }
}

/// Passthrough decoder for cameras (or test harnesses) that already send
/// planar YUV420P payloads: validates size and copies, no ffmpeg involved.
pub struct RawYuvDecoder {
    camera_id: u32,
}

impl RawYuvDecoder {
    pub fn new(camera_id: u32) -> Self {
        Self { camera_id }
    }
}

impl FrameDecoder for RawYuvDecoder {
    fn decode(&mut self, encoded: &[u8], out: &mut FrameBuffer) -> Result<Result<(), DecodeError>, ProtocolError> {
        if encoded.len() != out.byte_len() {
            return Err(ProtocolError::SizeMismatch {
                camera_id: self.camera_id,
                expected: out.byte_len(),
                got: encoded.len(),
            });
        }
        out.as_mut_slice().copy_from_slice(encoded);
        Ok(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_yuv_decoder_copies_matching_payload() {
        let mut decoder = RawYuvDecoder::new(0);
        let mut buf = FrameBuffer::new(4, 4);
        let payload = vec![7u8; buf.byte_len()];
        decoder.decode(&payload, &mut buf).unwrap().unwrap();
        assert!(buf.as_slice().iter().all(|&b| b == 7));
    }

    #[test]
    fn raw_yuv_decoder_rejects_size_mismatch() {
        let mut decoder = RawYuvDecoder::new(0);
        let mut buf = FrameBuffer::new(4, 4);
        let payload = vec![7u8; buf.byte_len() - 1];
        let err = decoder.decode(&payload, &mut buf).unwrap_err();
        assert!(matches!(err, ProtocolError::SizeMismatch { .. }));
    }
}
