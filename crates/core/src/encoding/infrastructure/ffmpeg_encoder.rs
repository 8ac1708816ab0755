use std::collections::VecDeque;

use ffmpeg_next::codec::packet::side_data::Type as SideDataType;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::util::frame::video::Video;
use ffmpeg_next::{Dictionary, Packet, Rational};

use crate::encoding::domain::encoded_frame::{psnr_from_sse, EncodedFrame, FrameType};
use crate::encoding::domain::encoder_config::EncoderConfig;
use crate::encoding::domain::video_encoder::{
    EncoderBackend, EncoderError, Submission, VideoEncoder,
};
use crate::output::output_sink::OutputSink;
use crate::shared::constants::FRAME_ALIGNMENT;
use crate::shared::dimensions::{Dimensions, PLANE_COUNT};
use crate::shared::raw_frame::RawFrame;

/// libavcodec's fixed-point scale between QP and lambda.
const FF_QP2LAMBDA: u32 = 118;

/// Opens [`FfmpegEncoder`]s through libavcodec.
pub struct FfmpegEncoderBackend;

impl EncoderBackend for FfmpegEncoderBackend {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn open(&self, config: &EncoderConfig) -> Result<Box<dyn VideoEncoder>, EncoderError> {
        Ok(Box::new(FfmpegEncoder::open(config)?))
    }
}

/// Streams raw frames through a libavcodec video encoder and writes the
/// packets as a raw elementary stream.
///
/// Per-frame QP, picture type and per-plane squared error come from the
/// packets' quality-stats side data. When the sink has a reconstruction
/// stream, packets are decoded again and the decoded pictures are handed to
/// the sink.
pub struct FfmpegEncoder {
    encoder: ffmpeg_next::codec::encoder::video::Encoder,
    decoder: Option<ffmpeg_next::decoder::Video>,
    codec_name: String,
    codec_id: ffmpeg_next::codec::Id,
    dimensions: Dimensions,
    pending: VecDeque<EncodedFrame>,
    eof_sent: bool,
    exhausted: bool,
    finished: bool,
}

impl FfmpegEncoder {
    pub fn open(config: &EncoderConfig) -> Result<Self, EncoderError> {
        ffmpeg_next::init().map_err(|e| EncoderError::Open(e.to_string()))?;

        let codec = ffmpeg_next::encoder::find_by_name(&config.codec)
            .ok_or_else(|| EncoderError::CodecNotFound(config.codec.clone()))?;

        let dimensions = config.source.aligned_to(FRAME_ALIGNMENT);
        let (fps_num, fps_den) = config.fps;
        let rate = |term: u32| {
            i32::try_from(term)
                .map_err(|_| EncoderError::Open(format!("frame rate {fps_num}/{fps_den} out of range")))
        };
        let (rate_num, rate_den) = (rate(fps_num)?, rate(fps_den)?);

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(|e| EncoderError::Open(e.to_string()))?;

        encoder_ctx.set_width(dimensions.width);
        encoder_ctx.set_height(dimensions.height);
        encoder_ctx.set_format(Pixel::YUV420P);
        encoder_ctx.set_time_base(Rational(rate_den, rate_num));
        encoder_ctx.set_frame_rate(Some(Rational(rate_num, rate_den)));
        encoder_ctx.set_flags(ffmpeg_next::codec::Flags::PSNR);

        let encoder = encoder_ctx
            .open_with(encoder_options(config))
            .map_err(|e| EncoderError::Open(format!("{}: {e}", config.codec)))?;

        log::debug!(
            "Opened {} encoder at {dimensions} ({fps_num}/{fps_den} fps)",
            config.codec
        );

        Ok(Self {
            encoder,
            decoder: None,
            codec_name: config.codec.clone(),
            codec_id: codec.id(),
            dimensions,
            pending: VecDeque::new(),
            eof_sent: false,
            exhausted: false,
            finished: false,
        })
    }

    fn to_video(&self, frame: &RawFrame) -> Video {
        let mut picture = Video::new(
            Pixel::YUV420P,
            self.dimensions.width,
            self.dimensions.height,
        );

        for plane in 0..PLANE_COUNT {
            let (width, height) = self.dimensions.plane(plane);
            let stride = picture.stride(plane);
            let src = frame.plane(plane);
            let dst = picture.data_mut(plane);
            for row in 0..height {
                dst[row * stride..row * stride + width]
                    .copy_from_slice(&src[row * width..(row + 1) * width]);
            }
        }

        picture.set_pts(Some(frame.index() as i64));
        picture
    }

    fn receive_packets(&mut self, sink: &mut OutputSink) -> Result<(), EncoderError> {
        let mut packet = Packet::empty();
        loop {
            match self.encoder.receive_packet(&mut packet) {
                Ok(()) => {
                    let encoded = self.emit(&packet, sink)?;
                    self.pending.push_back(encoded);
                }
                Err(ffmpeg_next::Error::Eof) => {
                    self.exhausted = true;
                    return Ok(());
                }
                Err(ffmpeg_next::Error::Other { errno })
                    if errno == ffmpeg_next::util::error::EAGAIN =>
                {
                    return Ok(());
                }
                Err(e) => return Err(EncoderError::Submit(e.to_string())),
            }
        }
    }

    fn emit(&mut self, packet: &Packet, sink: &mut OutputSink) -> Result<EncodedFrame, EncoderError> {
        let payload = packet.data().unwrap_or(&[]);
        sink.write_bitstream(payload)?;

        if sink.wants_reconstruction() {
            self.reconstruct(packet, sink)?;
        }

        let stats = packet_quality_stats(packet);
        let frame_type = match stats {
            Some(stats) => FrameType::from_picture_type(stats.picture_type),
            None if packet.is_key() => FrameType::I,
            None => FrameType::Unknown,
        };

        Ok(EncodedFrame {
            poc: packet.pts().unwrap_or(0).max(0) as u64,
            frame_type,
            qp: stats.map(|s| s.qp()),
            byte_len: payload.len(),
            psnr: stats.and_then(|s| s.psnr(self.dimensions)),
        })
    }

    fn reconstruct(&mut self, packet: &Packet, sink: &mut OutputSink) -> Result<(), EncoderError> {
        if self.decoder.is_none() {
            self.decoder = Some(open_decoder(self.codec_id)?);
        }
        let Some(decoder) = self.decoder.as_mut() else {
            return Ok(());
        };
        decoder
            .send_packet(packet)
            .map_err(|e| EncoderError::Submit(format!("reconstruction decode: {e}")))?;
        receive_decoded(decoder, sink)
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn frame_dimensions(&self) -> Dimensions {
        self.dimensions
    }

    fn submit(
        &mut self,
        frame: Option<&RawFrame>,
        sink: &mut OutputSink,
    ) -> Result<Submission, EncoderError> {
        match frame {
            Some(frame) => {
                if self.eof_sent {
                    return Err(EncoderError::Submit(
                        "frame submitted after drain started".to_string(),
                    ));
                }
                if frame.dimensions() != self.dimensions {
                    return Err(EncoderError::Submit(format!(
                        "frame is {}, encoder expects {}",
                        frame.dimensions(),
                        self.dimensions
                    )));
                }

                let picture = self.to_video(frame);
                self.encoder
                    .send_frame(&picture)
                    .map_err(|e| EncoderError::Submit(e.to_string()))?;
                self.receive_packets(sink)?;

                Ok(self
                    .pending
                    .pop_front()
                    .map_or(Submission::Buffered, Submission::Output))
            }
            None => {
                if !self.eof_sent {
                    self.encoder
                        .send_eof()
                        .map_err(|e| EncoderError::Submit(e.to_string()))?;
                    self.eof_sent = true;
                    log::debug!("Draining {} encoder", self.codec_name);
                }
                if self.pending.is_empty() && !self.exhausted {
                    self.receive_packets(sink)?;
                }

                Ok(match self.pending.pop_front() {
                    Some(encoded) => Submission::Output(encoded),
                    None if self.exhausted => Submission::Drained,
                    None => Submission::Buffered,
                })
            }
        }
    }

    fn finish(&mut self, sink: &mut OutputSink) -> Result<(), EncoderError> {
        if self.finished {
            return Ok(());
        }
        if !self.exhausted {
            return Err(EncoderError::Finish(
                "encoder still has pending output".to_string(),
            ));
        }

        if let Some(decoder) = self.decoder.as_mut() {
            decoder
                .send_eof()
                .map_err(|e| EncoderError::Finish(e.to_string()))?;
            receive_decoded(decoder, sink)?;
        }

        self.finished = true;
        Ok(())
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        log::debug!("Closing {} encoder", self.codec_name);
    }
}

fn encoder_options(config: &EncoderConfig) -> Dictionary<'static> {
    let mut options = Dictionary::new();

    let threads = match config.threads {
        0 => "auto".to_string(),
        n => n.to_string(),
    };
    options.set("threads", &threads);

    if let Some(qp) = config.qp {
        options.set("qp", &qp.to_string());
    }
    for (key, value) in &config.options {
        options.set(key, value);
    }

    options
}

fn open_decoder(id: ffmpeg_next::codec::Id) -> Result<ffmpeg_next::decoder::Video, EncoderError> {
    let codec = ffmpeg_next::decoder::find(id)
        .ok_or_else(|| EncoderError::Open(format!("no decoder for {id:?}")))?;
    ffmpeg_next::codec::context::Context::new_with_codec(codec)
        .decoder()
        .video()
        .map_err(|e| EncoderError::Open(format!("reconstruction decoder: {e}")))
}

fn receive_decoded(
    decoder: &mut ffmpeg_next::decoder::Video,
    sink: &mut OutputSink,
) -> Result<(), EncoderError> {
    let mut decoded = Video::empty();
    while decoder.receive_frame(&mut decoded).is_ok() {
        match frame_from_video(&decoded) {
            Some(frame) => sink.write_reconstruction(frame)?,
            None => log::warn!(
                "Skipping reconstructed picture in unsupported format {:?}",
                decoded.format()
            ),
        }
    }
    Ok(())
}

/// Copies a decoded YUV420P picture into a tightly packed [`RawFrame`].
fn frame_from_video(video: &Video) -> Option<RawFrame> {
    if video.format() != Pixel::YUV420P {
        return None;
    }

    let dimensions = Dimensions::new(video.width(), video.height());
    let mut data = Vec::with_capacity(dimensions.frame_size());
    for plane in 0..PLANE_COUNT {
        let (width, height) = dimensions.plane(plane);
        let stride = video.stride(plane);
        let src = video.data(plane);
        for row in 0..height {
            data.extend_from_slice(&src[row * stride..row * stride + width]);
        }
    }

    let index = video.pts().unwrap_or(0).max(0) as u64;
    Some(RawFrame::new(data, dimensions, index))
}

/// Per-packet statistics from `AV_PKT_DATA_QUALITY_STATS`.
#[derive(Clone, Copy, Debug, PartialEq)]
struct QualityStats {
    quality: u32,
    picture_type: u8,
    errors: [Option<u64>; PLANE_COUNT],
}

impl QualityStats {
    fn qp(&self) -> u8 {
        ((self.quality + FF_QP2LAMBDA / 2) / FF_QP2LAMBDA).min(u8::MAX as u32) as u8
    }

    /// `None` unless the encoder reported an error sum for every plane.
    fn psnr(&self, dimensions: Dimensions) -> Option<[f64; PLANE_COUNT]> {
        let mut psnr = [0.0; PLANE_COUNT];
        for (plane, value) in psnr.iter_mut().enumerate() {
            let sse = self.errors[plane]?;
            *value = psnr_from_sse(sse, dimensions.plane_size(plane));
        }
        Some(psnr)
    }
}

fn packet_quality_stats(packet: &Packet) -> Option<QualityStats> {
    packet
        .side_data()
        .find(|side_data| side_data.kind() == SideDataType::QualityStats)
        .and_then(|side_data| parse_quality_stats(side_data.data()))
}

/// Parses the quality-stats side data layout:
/// `u32le quality, u8 picture type, u8 error count, u16 reserved,
/// u64le error[error count]`.
fn parse_quality_stats(data: &[u8]) -> Option<QualityStats> {
    if data.len() < 8 {
        return None;
    }

    let quality = u32::from_le_bytes(data[0..4].try_into().ok()?);
    let picture_type = data[4];
    let error_count = data[5] as usize;

    let mut errors = [None; PLANE_COUNT];
    for (plane, error) in errors.iter_mut().enumerate().take(error_count) {
        let start = 8 + plane * 8;
        *error = data
            .get(start..start + 8)
            .and_then(|bytes| bytes.try_into().ok())
            .map(u64::from_le_bytes);
    }

    Some(QualityStats {
        quality,
        picture_type,
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    const DIMS: Dimensions = Dimensions {
        width: 64,
        height: 48,
    };

    fn mpeg4_config() -> EncoderConfig {
        EncoderConfig {
            codec: "mpeg4".to_string(),
            ..EncoderConfig::new(DIMS)
        }
    }

    fn gradient_frame(index: u64) -> RawFrame {
        let data = (0..DIMS.frame_size())
            .map(|i| ((i as u64 + index * 7) % 251) as u8)
            .collect();
        RawFrame::new(data, DIMS, index)
    }

    fn stats_bytes(quality: u32, picture_type: u8, errors: &[u64]) -> Vec<u8> {
        let mut data = quality.to_le_bytes().to_vec();
        data.push(picture_type);
        data.push(errors.len() as u8);
        data.extend_from_slice(&[0, 0]);
        for e in errors {
            data.extend_from_slice(&e.to_le_bytes());
        }
        data
    }

    /// Submits `count` frames then drains; returns the completed outputs.
    fn encode_all(
        encoder: &mut FfmpegEncoder,
        sink: &mut OutputSink,
        count: u64,
    ) -> Vec<EncodedFrame> {
        let mut outputs = Vec::new();
        for i in 0..count {
            if let Submission::Output(f) = encoder.submit(Some(&gradient_frame(i)), sink).unwrap() {
                outputs.push(f);
            }
        }
        loop {
            match encoder.submit(None, sink).unwrap() {
                Submission::Output(f) => outputs.push(f),
                Submission::Buffered => {}
                Submission::Drained => break,
            }
        }
        encoder.finish(sink).unwrap();
        outputs
    }

    #[test]
    fn test_parse_quality_stats() {
        let data = stats_bytes(32 * FF_QP2LAMBDA, 1, &[10, 20, 30]);
        let stats = parse_quality_stats(&data).unwrap();
        assert_eq!(stats.qp(), 32);
        assert_eq!(stats.picture_type, 1);
        assert_eq!(stats.errors, [Some(10), Some(20), Some(30)]);
    }

    #[test]
    fn test_parse_quality_stats_without_errors() {
        let stats = parse_quality_stats(&stats_bytes(0, 2, &[])).unwrap();
        assert_eq!(stats.errors, [None, None, None]);
        assert_eq!(stats.psnr(DIMS), None);
    }

    #[test]
    fn test_parse_quality_stats_truncated() {
        assert!(parse_quality_stats(&[0, 0, 0]).is_none());
        // Claims three errors but carries only one.
        let mut data = stats_bytes(0, 1, &[5]);
        data[5] = 3;
        let stats = parse_quality_stats(&data).unwrap();
        assert_eq!(stats.errors, [Some(5), None, None]);
        assert_eq!(stats.psnr(DIMS), None);
    }

    #[test]
    fn test_quality_stats_psnr_uses_plane_sizes() {
        let luma = DIMS.plane_size(0) as u64;
        let chroma = DIMS.plane_size(1) as u64;
        let stats = parse_quality_stats(&stats_bytes(0, 1, &[luma, chroma, 0])).unwrap();
        let psnr = stats.psnr(DIMS).unwrap();
        // MSE of 1.0 on both luma and first chroma plane.
        assert_relative_eq!(psnr[0], psnr[1]);
        assert_relative_eq!(psnr[2], crate::shared::constants::MAX_PSNR);
    }

    #[test]
    fn test_unknown_codec_fails_to_open() {
        let config = EncoderConfig {
            codec: "no-such-encoder".to_string(),
            ..EncoderConfig::new(DIMS)
        };
        assert!(matches!(
            FfmpegEncoder::open(&config),
            Err(EncoderError::CodecNotFound(_))
        ));
    }

    #[test]
    fn test_odd_dimensions_are_aligned() {
        let config = EncoderConfig {
            codec: "mpeg4".to_string(),
            ..EncoderConfig::new(Dimensions::new(63, 47))
        };
        let encoder = FfmpegEncoder::open(&config).unwrap();
        assert_eq!(encoder.frame_dimensions(), DIMS);
    }

    #[test]
    fn test_every_submitted_frame_comes_out() {
        let out = SharedBuf::default();
        let mut sink = OutputSink::new(Box::new(out.clone()), None, DIMS).unwrap();
        let mut encoder = FfmpegEncoder::open(&mpeg4_config()).unwrap();

        let outputs = encode_all(&mut encoder, &mut sink, 3);

        assert_eq!(outputs.len(), 3);
        let total: usize = outputs.iter().map(|f| f.byte_len).sum();
        assert_eq!(sink.bytes_written(), total as u64);
        assert_eq!(out.0.lock().unwrap().len(), total);
        assert_eq!(outputs[0].frame_type, FrameType::I);
    }

    #[test]
    fn test_drained_is_sticky() {
        let mut sink = OutputSink::new(Box::new(SharedBuf::default()), None, DIMS).unwrap();
        let mut encoder = FfmpegEncoder::open(&mpeg4_config()).unwrap();
        encode_all(&mut encoder, &mut sink, 1);

        assert_eq!(encoder.submit(None, &mut sink).unwrap(), Submission::Drained);
        assert_eq!(encoder.submit(None, &mut sink).unwrap(), Submission::Drained);
    }

    #[test]
    fn test_submit_after_drain_fails() {
        let mut sink = OutputSink::new(Box::new(SharedBuf::default()), None, DIMS).unwrap();
        let mut encoder = FfmpegEncoder::open(&mpeg4_config()).unwrap();
        encode_all(&mut encoder, &mut sink, 1);

        assert!(encoder.submit(Some(&gradient_frame(5)), &mut sink).is_err());
    }

    #[test]
    fn test_wrong_frame_size_is_rejected() {
        let mut sink = OutputSink::new(Box::new(SharedBuf::default()), None, DIMS).unwrap();
        let mut encoder = FfmpegEncoder::open(&mpeg4_config()).unwrap();
        let small = RawFrame::blank(Dimensions::new(32, 32), 0);

        assert!(matches!(
            encoder.submit(Some(&small), &mut sink),
            Err(EncoderError::Submit(_))
        ));
    }

    #[test]
    fn test_finish_before_drain_fails() {
        let mut sink = OutputSink::new(Box::new(SharedBuf::default()), None, DIMS).unwrap();
        let mut encoder = FfmpegEncoder::open(&mpeg4_config()).unwrap();
        assert!(matches!(
            encoder.finish(&mut sink),
            Err(EncoderError::Finish(_))
        ));
    }

    #[test]
    fn test_reconstruction_written_for_every_frame() {
        let recon = SharedBuf::default();
        let mut sink = OutputSink::new(
            Box::new(SharedBuf::default()),
            Some(Box::new(recon.clone())),
            DIMS,
        )
        .unwrap();
        let mut encoder = FfmpegEncoder::open(&mpeg4_config()).unwrap();

        encode_all(&mut encoder, &mut sink, 3);
        sink.sync().unwrap();

        assert_eq!(recon.0.lock().unwrap().len(), 3 * DIMS.frame_size());
    }
}
