use thiserror::Error;

use crate::encoding::domain::encoder_config::EncoderConfig;
use crate::shared::dimensions::Dimensions;
use crate::shared::stream_path::StreamPath;

/// Largest frame-rate term libavcodec's signed rationals can hold.
pub const MAX_FRAME_RATE_TERM: u32 = i32::MAX as u32;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("input resolution must be non-zero, got {0}")]
    ZeroDimensions(Dimensions),
    #[error("invalid frame rate '{0}': expected N or N/D with values in 1..=2147483647")]
    InvalidFrameRate(String),
    #[error("invalid codec option '{0}': expected KEY=VALUE")]
    InvalidCodecOption(String),
    #[error("no codec given")]
    MissingCodec,
    #[error("input and output are both '{0}'")]
    SameInputOutput(String),
}

/// Everything one encoding run needs, fixed before any resource is opened.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodeConfig {
    pub input: StreamPath,
    pub output: StreamPath,
    /// Optional stream receiving the reconstructed pictures.
    pub debug: Option<StreamPath>,
    /// Frames to encode; 0 encodes until the input runs out.
    pub frame_limit: u64,
    /// Whole frames skipped at the start of the input.
    pub seek: u64,
    pub encoder: EncoderConfig,
}

impl EncodeConfig {
    pub fn new(input: StreamPath, output: StreamPath, source: Dimensions) -> Self {
        Self {
            input,
            output,
            debug: None,
            frame_limit: 0,
            seek: 0,
            encoder: EncoderConfig::new(source),
        }
    }

    pub fn source(&self) -> Dimensions {
        self.encoder.source
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let source = self.encoder.source;
        if source.width == 0 || source.height == 0 {
            return Err(ConfigError::ZeroDimensions(source));
        }

        let (num, den) = self.encoder.fps;
        if !frame_rate_term_in_range(num) || !frame_rate_term_in_range(den) {
            return Err(ConfigError::InvalidFrameRate(format!("{num}/{den}")));
        }

        if self.encoder.codec.trim().is_empty() {
            return Err(ConfigError::MissingCodec);
        }

        if let Some((key, value)) = self.encoder.options.iter().find(|(k, _)| k.is_empty()) {
            return Err(ConfigError::InvalidCodecOption(format!("{key}={value}")));
        }

        if let StreamPath::File(path) = &self.input {
            let same = std::iter::once(&self.output)
                .chain(self.debug.as_ref())
                .any(|out| out.as_path() == Some(path.as_path()));
            if same {
                return Err(ConfigError::SameInputOutput(self.input.to_string()));
            }
        }

        Ok(())
    }
}

/// Parses `N` or `N/D` into a numerator / denominator pair, each in `1..=i32::MAX`.
pub fn parse_frame_rate(value: &str) -> Result<(u32, u32), ConfigError> {
    let invalid = || ConfigError::InvalidFrameRate(value.to_string());

    let (num, den) = match value.split_once('/') {
        Some((num, den)) => (num.trim(), den.trim()),
        None => (value.trim(), "1"),
    };
    let num: u32 = num.parse().map_err(|_| invalid())?;
    let den: u32 = den.parse().map_err(|_| invalid())?;
    if !frame_rate_term_in_range(num) || !frame_rate_term_in_range(den) {
        return Err(invalid());
    }
    Ok((num, den))
}

fn frame_rate_term_in_range(term: u32) -> bool {
    (1..=MAX_FRAME_RATE_TERM).contains(&term)
}

/// Parses one `KEY=VALUE` encoder option.
pub fn parse_codec_option(value: &str) -> Result<(String, String), ConfigError> {
    match value.split_once('=') {
        Some((key, val)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), val.to_string()))
        }
        _ => Err(ConfigError::InvalidCodecOption(value.to_string())),
    }
}
