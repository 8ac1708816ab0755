use std::io::{self, Read};

use crate::input::domain::frame_source::{FrameReadError, FrameSource};
use crate::shared::dimensions::Dimensions;
use crate::shared::raw_frame::RawFrame;

/// Reads headerless planar YUV 4:2:0 frames from any byte stream.
///
/// Works on pipes as well as files: seeking is done by reading and
/// discarding, so standard input is supported.
pub struct YuvFrameSource<R> {
    reader: R,
}

impl<R: Read> YuvFrameSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: Read + Send> FrameSource for YuvFrameSource<R> {
    fn skip_frames(&mut self, count: u64, dimensions: Dimensions) -> Result<(), FrameReadError> {
        let frame_size = dimensions.frame_size() as u64;
        let requested = count
            .checked_mul(frame_size)
            .ok_or(FrameReadError::SeekOutOfRange { requested: count })?;
        let skipped = io::copy(&mut (&mut self.reader).take(requested), &mut io::sink())?;
        if skipped < requested {
            return Err(FrameReadError::SeekPastEnd {
                requested: count,
                skipped: skipped / frame_size,
            });
        }
        log::debug!("Skipped {count} frames ({skipped} bytes)");
        Ok(())
    }

    fn read_frame(
        &mut self,
        source: Dimensions,
        target: Dimensions,
        index: u64,
    ) -> Result<Option<RawFrame>, FrameReadError> {
        let mut frame = RawFrame::blank(target, index);
        let mut packed = vec![0u8; source.frame_size()];

        let read = read_full(&mut self.reader, &mut packed)?;
        if read == 0 {
            return Ok(None);
        }
        if read < packed.len() {
            return Err(FrameReadError::ShortRead {
                index,
                expected: packed.len(),
                read,
            });
        }

        frame.fill_padded(&packed, source);
        Ok(Some(frame))
    }
}

/// Fills `buf` unless the stream ends first; returns the bytes read.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const DIMS: Dimensions = Dimensions {
        width: 4,
        height: 2,
    };

    /// `count` frames of 12 bytes each, every byte set to the frame number.
    fn yuv_bytes(count: u8) -> Vec<u8> {
        (0..count)
            .flat_map(|i| std::iter::repeat(i).take(DIMS.frame_size()))
            .collect()
    }

    /// Yields data in small chunks to exercise partial reads.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(3).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn test_reads_frames_in_order() {
        let mut source = YuvFrameSource::new(Cursor::new(yuv_bytes(2)));

        let first = source.read_frame(DIMS, DIMS, 0).unwrap().unwrap();
        let second = source.read_frame(DIMS, DIMS, 1).unwrap().unwrap();

        assert!(first.data().iter().all(|&b| b == 0));
        assert!(second.data().iter().all(|&b| b == 1));
        assert_eq!(second.index(), 1);
    }

    #[test]
    fn test_clean_end_of_stream_is_none() {
        let mut source = YuvFrameSource::new(Cursor::new(yuv_bytes(1)));
        source.read_frame(DIMS, DIMS, 0).unwrap();
        assert!(source.read_frame(DIMS, DIMS, 1).unwrap().is_none());
    }

    #[test]
    fn test_empty_input_is_none() {
        let mut source = YuvFrameSource::new(Cursor::new(Vec::new()));
        assert!(source.read_frame(DIMS, DIMS, 0).unwrap().is_none());
    }

    #[test]
    fn test_partial_frame_is_short_read() {
        let mut data = yuv_bytes(1);
        data.extend_from_slice(&[7, 7, 7]);
        let mut source = YuvFrameSource::new(Cursor::new(data));

        source.read_frame(DIMS, DIMS, 0).unwrap();
        let err = source.read_frame(DIMS, DIMS, 1).unwrap_err();
        assert!(matches!(
            err,
            FrameReadError::ShortRead {
                index: 1,
                expected: 12,
                read: 3
            }
        ));
    }

    #[test]
    fn test_trickled_input_assembles_whole_frames() {
        let mut source = YuvFrameSource::new(Trickle {
            data: yuv_bytes(2),
            pos: 0,
        });
        assert!(source.read_frame(DIMS, DIMS, 0).unwrap().is_some());
        assert!(source.read_frame(DIMS, DIMS, 1).unwrap().is_some());
        assert!(source.read_frame(DIMS, DIMS, 2).unwrap().is_none());
    }

    #[test]
    fn test_pads_to_target_dimensions() {
        let target = Dimensions::new(6, 4);
        let mut source = YuvFrameSource::new(Cursor::new(yuv_bytes(1)));
        let frame = source.read_frame(DIMS, target, 0).unwrap().unwrap();
        assert_eq!(frame.dimensions(), target);
        assert_eq!(frame.data().len(), target.frame_size());
    }

    #[test]
    fn test_skip_frames_discards_whole_frames() {
        let mut source = YuvFrameSource::new(Cursor::new(yuv_bytes(3)));
        source.skip_frames(2, DIMS).unwrap();
        let frame = source.read_frame(DIMS, DIMS, 0).unwrap().unwrap();
        assert!(frame.data().iter().all(|&b| b == 2));
    }

    #[test]
    fn test_skip_past_end_fails() {
        let mut source = YuvFrameSource::new(Cursor::new(yuv_bytes(1)));
        let err = source.skip_frames(3, DIMS).unwrap_err();
        assert!(matches!(
            err,
            FrameReadError::SeekPastEnd {
                requested: 3,
                skipped: 1
            }
        ));
    }

    #[test]
    fn test_skip_offset_overflow_fails_without_reading() {
        let dims = Dimensions::new(16, 16);
        let mut source = YuvFrameSource::new(Cursor::new(yuv_bytes(1)));

        // 2^57 frames of 384 bytes wraps a u64 byte offset to zero.
        let err = source.skip_frames(1 << 57, dims).unwrap_err();

        assert!(matches!(
            err,
            FrameReadError::SeekOutOfRange { requested } if requested == 1 << 57
        ));
        assert!(source.read_frame(DIMS, DIMS, 0).unwrap().is_some());
    }

    #[test]
    fn test_skip_zero_is_noop() {
        let mut source = YuvFrameSource::new(Cursor::new(yuv_bytes(1)));
        source.skip_frames(0, DIMS).unwrap();
        assert!(source.read_frame(DIMS, DIMS, 0).unwrap().is_some());
    }
}
