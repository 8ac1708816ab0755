use std::io;

use thiserror::Error;

use crate::encoding::domain::encoded_frame::EncodedFrame;
use crate::encoding::domain::video_encoder::{EncoderError, Submission, VideoEncoder};
use crate::input::domain::frame_source::FrameSource;
use crate::output::output_sink::OutputSink;
use crate::shared::dimensions::Dimensions;

use super::encode_logger::EncodeLogger;
use super::run_report::RunReport;
use super::stats_accumulator::StatsAccumulator;
use super::timing::{EncodingTimes, Timestamp};

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error(transparent)]
    Encoder(#[from] EncoderError),
    #[error("failed to flush output: {0}")]
    Output(#[from] io::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DriverState {
    Submitting,
    Flushing,
    Done,
}

/// Feeds frames through an encoder, drains it at end of input and reports
/// per-frame and total statistics.
///
/// The encoder may hold any number of frames before returning output, so
/// completed pictures are routed as they come back, not per submission.
/// Reading stops at the frame limit, at end of input, or at the first
/// unreadable frame; the latter is only a warning.
pub struct EncodeVideoUseCase {
    source_dimensions: Dimensions,
    frame_limit: u64,
}

impl EncodeVideoUseCase {
    /// `frame_limit` of 0 reads until the input runs out.
    pub fn new(source_dimensions: Dimensions, frame_limit: u64) -> Self {
        Self {
            source_dimensions,
            frame_limit,
        }
    }

    pub fn execute(
        &self,
        source: &mut dyn FrameSource,
        encoder: &mut dyn VideoEncoder,
        sink: &mut OutputSink,
        logger: &mut dyn EncodeLogger,
    ) -> Result<RunReport, EncodeError> {
        let mut run = Run {
            source,
            encoder,
            sink,
            logger,
            stats: StatsAccumulator::new(),
            source_dimensions: self.source_dimensions,
            frame_limit: self.frame_limit,
        };

        let start = Timestamp::now();
        let mut state = DriverState::Submitting;
        while state != DriverState::Done {
            state = match state {
                DriverState::Submitting => run.submit_next()?,
                DriverState::Flushing => run.drain_step()?,
                DriverState::Done => DriverState::Done,
            };
        }
        let end = Timestamp::now();

        let report = RunReport {
            stats: run.stats.finish(),
            encoding: EncodingTimes::between(start, end),
            total_cpu: end.cpu(),
        };
        run.logger.summary(&report);
        Ok(report)
    }
}

/// State of one `execute` call.
struct Run<'a> {
    source: &'a mut dyn FrameSource,
    encoder: &'a mut dyn VideoEncoder,
    sink: &'a mut OutputSink,
    logger: &'a mut dyn EncodeLogger,
    stats: StatsAccumulator,
    source_dimensions: Dimensions,
    frame_limit: u64,
}

impl Run<'_> {
    fn submit_next(&mut self) -> Result<DriverState, EncodeError> {
        if self.frame_limit != 0 && self.stats.frames_started() >= self.frame_limit {
            log::debug!("Frame limit of {} reached", self.frame_limit);
            return Ok(DriverState::Flushing);
        }

        let index = self.stats.frames_started();
        self.stats.frame_started();

        let target = self.encoder.frame_dimensions();
        let frame = match self
            .source
            .read_frame(self.source_dimensions, target, index)
        {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                log::debug!("End of input after {index} frames");
                return Ok(DriverState::Flushing);
            }
            Err(e) => {
                self.logger
                    .warn(&format!("Failed to read a frame {index}: {e}"));
                return Ok(DriverState::Flushing);
            }
        };

        if let Submission::Output(encoded) = self.encoder.submit(Some(&frame), self.sink)? {
            self.route(encoded);
        }
        Ok(DriverState::Submitting)
    }

    fn drain_step(&mut self) -> Result<DriverState, EncodeError> {
        match self.encoder.submit(None, self.sink)? {
            Submission::Output(encoded) => {
                self.route(encoded);
                Ok(DriverState::Flushing)
            }
            Submission::Buffered => Ok(DriverState::Flushing),
            Submission::Drained => {
                self.encoder.finish(self.sink)?;
                self.sink.sync()?;
                log::debug!(
                    "Flush barrier reached after {} frames",
                    self.stats.frames_completed()
                );
                Ok(DriverState::Done)
            }
        }
    }

    fn route(&mut self, encoded: EncodedFrame) {
        let metrics = self.stats.record(&encoded);
        self.logger.frame(&encoded, &metrics);
    }
}
