use std::io;

use thiserror::Error;

use crate::encoding::domain::encoded_frame::EncodedFrame;
use crate::encoding::domain::encoder_config::EncoderConfig;
use crate::output::output_sink::OutputSink;
use crate::shared::dimensions::Dimensions;
use crate::shared::raw_frame::RawFrame;

#[derive(Error, Debug)]
pub enum EncoderError {
    #[error("encoder '{0}' not found")]
    CodecNotFound(String),
    #[error("failed to open encoder: {0}")]
    Open(String),
    #[error("failed to encode image: {0}")]
    Submit(String),
    #[error("failed to complete pending encoder work: {0}")]
    Finish(String),
    #[error("failed to write encoder output: {0}")]
    Output(#[from] io::Error),
}

/// Result of one [`VideoEncoder::submit`] call.
#[derive(Debug, PartialEq)]
pub enum Submission {
    /// A picture completed during this call. It is not necessarily the one
    /// just submitted.
    Output(EncodedFrame),
    /// Nothing completed yet; the encoder is still holding frames.
    Buffered,
    /// Drain only: no output is pending and none will be produced again.
    Drained,
}

/// One open encoding session.
///
/// The encoder may buffer an arbitrary number of frames before it returns
/// the first output. Dropping the encoder closes it and must wait for any
/// work still running internally.
pub trait VideoEncoder {
    /// Dimensions every submitted frame must have.
    fn frame_dimensions(&self) -> Dimensions;

    /// Submits `frame`, or requests one drain step when `frame` is `None`.
    ///
    /// Encoded payload is written to `sink` as it is produced. At most one
    /// completed picture is returned per call.
    fn submit(
        &mut self,
        frame: Option<&RawFrame>,
        sink: &mut OutputSink,
    ) -> Result<Submission, EncoderError>;

    /// Blocks until all asynchronous work inside the encoder has finished.
    /// Only valid after a drain step returned [`Submission::Drained`].
    fn finish(&mut self, sink: &mut OutputSink) -> Result<(), EncoderError>;
}

/// Factory that opens encoders.
pub trait EncoderBackend {
    fn name(&self) -> &str;

    fn open(&self, config: &EncoderConfig) -> Result<Box<dyn VideoEncoder>, EncoderError>;
}
