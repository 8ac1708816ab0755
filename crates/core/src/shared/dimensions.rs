use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Number of planes in a YUV 4:2:0 picture.
pub const PLANE_COUNT: usize = 3;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseDimensionsError {
    #[error("expected WIDTHxHEIGHT, got '{0}'")]
    Format(String),
    #[error("dimensions must be non-zero, got '{0}'")]
    Zero(String),
}

/// Luma width and height of a planar YUV 4:2:0 picture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Rounds both sides up to a multiple of `alignment`.
    pub fn aligned_to(self, alignment: u32) -> Self {
        let align = |v: u32| v.div_ceil(alignment) * alignment;
        Self {
            width: align(self.width),
            height: align(self.height),
        }
    }

    /// Width and height of one plane. Chroma planes round up for odd sizes.
    pub fn plane(self, plane: usize) -> (usize, usize) {
        if plane == 0 {
            (self.width as usize, self.height as usize)
        } else {
            (
                self.width.div_ceil(2) as usize,
                self.height.div_ceil(2) as usize,
            )
        }
    }

    pub fn plane_size(self, plane: usize) -> usize {
        let (w, h) = self.plane(plane);
        w * h
    }

    /// Bytes in one whole frame (all three planes).
    pub fn frame_size(self) -> usize {
        (0..PLANE_COUNT).map(|p| self.plane_size(p)).sum()
    }

    pub fn fits_within(self, other: Dimensions) -> bool {
        self.width <= other.width && self.height <= other.height
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Dimensions {
    type Err = ParseDimensionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| ParseDimensionsError::Format(s.to_string()))?;
        let width: u32 = w
            .trim()
            .parse()
            .map_err(|_| ParseDimensionsError::Format(s.to_string()))?;
        let height: u32 = h
            .trim()
            .parse()
            .map_err(|_| ParseDimensionsError::Format(s.to_string()))?;
        if width == 0 || height == 0 {
            return Err(ParseDimensionsError::Zero(s.to_string()));
        }
        Ok(Self { width, height })
    }
}
