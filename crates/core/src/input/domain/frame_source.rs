use std::io;

use thiserror::Error;

use crate::shared::dimensions::Dimensions;
use crate::shared::raw_frame::RawFrame;

#[derive(Error, Debug)]
pub enum FrameReadError {
    /// Input ended part-way through a frame.
    #[error("failed to read frame {index}: got {read} of {expected} bytes")]
    ShortRead {
        index: u64,
        expected: usize,
        read: usize,
    },
    #[error("input ended after {skipped} of {requested} frames while seeking")]
    SeekPastEnd { requested: u64, skipped: u64 },
    #[error("cannot seek {requested} frames: offset exceeds the addressable input")]
    SeekOutOfRange { requested: u64 },
    #[error("read error: {0}")]
    Io(#[from] io::Error),
}

/// Produces raw frames one at a time from an input stream.
///
/// `Ok(None)` from [`FrameSource::read_frame`] means the input ended cleanly
/// on a frame boundary; a partial trailing frame is an error instead.
pub trait FrameSource: Send {
    /// Discards `count` whole frames of size `dimensions`. Called at most
    /// once, before the first read.
    fn skip_frames(&mut self, count: u64, dimensions: Dimensions) -> Result<(), FrameReadError>;

    /// Reads one `source`-sized frame into a freshly allocated
    /// `target`-sized buffer, padding the edges when `target` is larger.
    fn read_frame(
        &mut self,
        source: Dimensions,
        target: Dimensions,
        index: u64,
    ) -> Result<Option<RawFrame>, FrameReadError>;
}
