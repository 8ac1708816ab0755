use std::io;

use thiserror::Error;

use crate::encoding::domain::video_encoder::{EncoderBackend, EncoderError, VideoEncoder};
use crate::input::domain::frame_source::{FrameReadError, FrameSource};
use crate::input::infrastructure::yuv_frame_source::YuvFrameSource;
use crate::output::domain::stream_provider::StreamProvider;
use crate::output::output_sink::OutputSink;
use crate::shared::dimensions::Dimensions;
use crate::shared::stream_path::StreamPath;

use super::encode_config::{ConfigError, EncodeConfig};
use super::encode_logger::EncodeLogger;
use super::encode_video_use_case::{EncodeError, EncodeVideoUseCase};
use super::run_report::RunReport;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("could not open input file '{path}': {source}")]
    OpenInput {
        path: StreamPath,
        #[source]
        source: io::Error,
    },
    #[error("could not open output file '{path}': {source}")]
    OpenOutput {
        path: StreamPath,
        #[source]
        source: io::Error,
    },
    #[error("could not open reconstruction file '{path}': {source}")]
    OpenDebug {
        path: StreamPath,
        #[source]
        source: io::Error,
    },
    #[error("could not initialize stream: {0}")]
    OutputSink(#[source] io::Error),
    #[error("failed to open encoder: {0}")]
    OpenEncoder(#[source] EncoderError),
    #[error("failed to seek {frames} frames: {source}")]
    Seek {
        frames: u64,
        #[source]
        source: FrameReadError,
    },
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Every resource of one encoding run.
///
/// Fields are declared in reverse acquisition order, so dropping the
/// session closes the encoder first, then the output streams, then the
/// input, then the configuration.
pub struct EncodingSession {
    encoder: Box<dyn VideoEncoder>,
    sink: OutputSink,
    source: Box<dyn FrameSource>,
    config: EncodeConfig,
}

impl EncodingSession {
    /// Validates `config` and acquires, in order: input stream, output
    /// stream, optional reconstruction stream, output sink, encoder.
    /// Then skips `config.seek` frames of input.
    ///
    /// On failure everything acquired so far is released before returning.
    pub fn open(
        config: EncodeConfig,
        streams: &dyn StreamProvider,
        backend: &dyn EncoderBackend,
        logger: &mut dyn EncodeLogger,
    ) -> Result<Self, SessionError> {
        config.validate()?;

        let input = streams
            .open_input(&config.input)
            .map_err(|source| SessionError::OpenInput {
                path: config.input.clone(),
                source,
            })?;
        let mut source: Box<dyn FrameSource> = Box::new(YuvFrameSource::new(input));

        let output = streams
            .open_output(&config.output)
            .map_err(|source| SessionError::OpenOutput {
                path: config.output.clone(),
                source,
            })?;

        let debug = match &config.debug {
            Some(path) => Some(streams.open_output(path).map_err(|source| {
                SessionError::OpenDebug {
                    path: path.clone(),
                    source,
                }
            })?),
            None => None,
        };

        let sink =
            OutputSink::new(output, debug, config.source()).map_err(SessionError::OutputSink)?;

        let encoder = backend
            .open(&config.encoder)
            .map_err(SessionError::OpenEncoder)?;
        log::debug!(
            "Opened {} encoder through {}",
            config.encoder.codec,
            backend.name()
        );

        logger.info(&format!("Input: {}, output: {}", config.input, config.output));
        logger.info(&format!(
            "  Video size: {} (input={})",
            encoder.frame_dimensions(),
            config.source()
        ));

        if config.seek > 0 {
            source
                .skip_frames(config.seek, config.source())
                .map_err(|source| SessionError::Seek {
                    frames: config.seek,
                    source,
                })?;
        }

        Ok(Self {
            encoder,
            sink,
            source,
            config,
        })
    }

    /// Dimensions frames are padded to before encoding.
    pub fn encoder_dimensions(&self) -> Dimensions {
        self.encoder.frame_dimensions()
    }

    /// Encodes the whole input and releases every resource.
    pub fn run(mut self, logger: &mut dyn EncodeLogger) -> Result<RunReport, SessionError> {
        let use_case = EncodeVideoUseCase::new(self.config.source(), self.config.frame_limit);
        let report = use_case.execute(
            self.source.as_mut(),
            self.encoder.as_mut(),
            &mut self.sink,
            logger,
        )?;
        Ok(report)
    }
}

impl Drop for EncodingSession {
    fn drop(&mut self) {
        log::debug!(
            "Closing session ({} written to {})",
            self.sink.bytes_written(),
            self.config.output
        );
    }
}
