use crate::shared::constants::{DEFAULT_CODEC, DEFAULT_FPS};
use crate::shared::dimensions::Dimensions;

/// Settings handed to an [`EncoderBackend`](super::video_encoder::EncoderBackend)
/// when a session opens its encoder.
#[derive(Clone, Debug, PartialEq)]
pub struct EncoderConfig {
    /// Encoder name as known to the backend (e.g. `libx265`, `mpeg4`).
    pub codec: String,
    /// Dimensions of the raw input, before any alignment padding.
    pub source: Dimensions,
    /// Frame rate as numerator / denominator.
    pub fps: (u32, u32),
    pub qp: Option<u8>,
    /// Worker threads inside the encoder; 0 lets the encoder decide.
    pub threads: usize,
    /// Extra backend-specific key/value options.
    pub options: Vec<(String, String)>,
}

impl EncoderConfig {
    pub fn new(source: Dimensions) -> Self {
        Self {
            codec: DEFAULT_CODEC.to_string(),
            source,
            fps: DEFAULT_FPS,
            qp: None,
            threads: 0,
            options: Vec::new(),
        }
    }
}
