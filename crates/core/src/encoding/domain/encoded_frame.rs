use std::fmt;

use crate::shared::constants::MAX_PSNR;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameType {
    I,
    P,
    B,
    Unknown,
}

impl FrameType {
    /// Maps an `AVPictureType` value.
    pub fn from_picture_type(value: u8) -> Self {
        match value {
            1 => FrameType::I,
            2 => FrameType::P,
            3 => FrameType::B,
            _ => FrameType::Unknown,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            FrameType::I => 'I',
            FrameType::P => 'P',
            FrameType::B => 'B',
            FrameType::Unknown => '?',
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// One completed picture handed back by the encoder.
///
/// Its payload has already been written to the output sink; this carries
/// only what the statistics and the report need.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedFrame {
    /// Picture order count (display index of the source frame).
    pub poc: u64,
    pub frame_type: FrameType,
    pub qp: Option<u8>,
    pub byte_len: usize,
    /// Y, U, V quality in dB, when the encoder measured it.
    pub psnr: Option<[f64; 3]>,
}

impl EncodedFrame {
    pub fn bits(&self) -> u64 {
        self.byte_len as u64 * 8
    }
}

/// Converts a plane's sum of squared errors over `samples` 8-bit samples to
/// PSNR in dB. A lossless plane reports [`MAX_PSNR`].
pub fn psnr_from_sse(sse: u64, samples: usize) -> f64 {
    if samples == 0 {
        return 0.0;
    }
    if sse == 0 {
        return MAX_PSNR;
    }
    let mse = sse as f64 / samples as f64;
    (10.0 * (255.0 * 255.0 / mse).log10()).min(MAX_PSNR)
}
