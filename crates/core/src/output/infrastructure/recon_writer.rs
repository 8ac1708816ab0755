use std::io::{self, Write};
use std::thread::JoinHandle;

use crossbeam_channel::Sender;

use crate::output::domain::stream_provider::OutputStream;
use crate::shared::constants::RECON_CHANNEL_CAPACITY;
use crate::shared::dimensions::Dimensions;
use crate::shared::raw_frame::RawFrame;

/// Writes reconstructed pictures to the debug stream on a dedicated thread.
///
/// Frames are cropped back to the source dimensions before writing, so the
/// output lines up byte-for-byte with the raw input. The thread owns the
/// stream and drops it when it exits.
pub struct ReconWriter {
    sender: Option<Sender<RawFrame>>,
    handle: Option<JoinHandle<io::Result<u64>>>,
    frames_written: u64,
    failure: Option<String>,
}

impl ReconWriter {
    pub fn spawn(output: OutputStream, crop: Dimensions) -> io::Result<Self> {
        let (sender, receiver) = crossbeam_channel::bounded::<RawFrame>(RECON_CHANNEL_CAPACITY);

        let handle = std::thread::Builder::new()
            .name("recon-writer".to_string())
            .spawn(move || -> io::Result<u64> {
                let mut output = output;
                let mut written = 0;
                for frame in receiver {
                    output.write_all(frame.cropped(crop).data())?;
                    written += 1;
                }
                output.flush()?;
                Ok(written)
            })?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
            frames_written: 0,
            failure: None,
        })
    }

    pub fn write(&mut self, frame: RawFrame) -> io::Result<()> {
        let Some(sender) = self.sender.as_ref() else {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "reconstruction writer already finished",
            ));
        };
        if sender.send(frame).is_ok() {
            return Ok(());
        }

        // The thread only hangs up early when a write failed.
        self.finish()?;
        Err(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "reconstruction writer stopped",
        ))
    }

    /// Closes the channel and waits for every queued frame to be written.
    /// Later calls return the same outcome without blocking.
    pub fn finish(&mut self) -> io::Result<u64> {
        self.sender = None;
        if let Some(handle) = self.handle.take() {
            let result = handle
                .join()
                .map_err(|_| io::Error::other("reconstruction writer panicked"))
                .and_then(|written| written);
            match result {
                Ok(written) => {
                    self.frames_written = written;
                    log::debug!("Reconstruction writer wrote {written} frames");
                }
                Err(e) => self.failure = Some(e.to_string()),
            }
        }
        match &self.failure {
            Some(message) => Err(io::Error::other(message.clone())),
            None => Ok(self.frames_written),
        }
    }
}

impl Drop for ReconWriter {
    fn drop(&mut self) {
        if self.handle.is_none() {
            return;
        }
        if let Err(e) = self.finish() {
            log::warn!("Reconstruction output failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn frame(dims: Dimensions, value: u8, index: u64) -> RawFrame {
        RawFrame::new(vec![value; dims.frame_size()], dims, index)
    }

    #[test]
    fn test_writes_frames_in_order() {
        let buf = SharedBuf::default();
        let dims = Dimensions::new(2, 2);
        let mut writer = ReconWriter::spawn(Box::new(buf.clone()), dims).unwrap();

        writer.write(frame(dims, 1, 0)).unwrap();
        writer.write(frame(dims, 2, 1)).unwrap();
        assert_eq!(writer.finish().unwrap(), 2);

        let data = buf.0.lock().unwrap();
        assert_eq!(&data[..], &[1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2]);
    }

    #[test]
    fn test_crops_to_source_dimensions() {
        let buf = SharedBuf::default();
        let source = Dimensions::new(1, 1);
        let mut writer = ReconWriter::spawn(Box::new(buf.clone()), source).unwrap();

        writer.write(frame(Dimensions::new(2, 2), 5, 0)).unwrap();
        writer.finish().unwrap();

        assert_eq!(buf.0.lock().unwrap().len(), source.frame_size());
    }

    #[test]
    fn test_finish_is_idempotent() {
        let dims = Dimensions::new(2, 2);
        let mut writer = ReconWriter::spawn(Box::new(SharedBuf::default()), dims).unwrap();
        writer.write(frame(dims, 0, 0)).unwrap();
        assert_eq!(writer.finish().unwrap(), 1);
        assert_eq!(writer.finish().unwrap(), 1);
    }

    #[test]
    fn test_write_after_finish_fails() {
        let dims = Dimensions::new(2, 2);
        let mut writer = ReconWriter::spawn(Box::new(SharedBuf::default()), dims).unwrap();
        writer.finish().unwrap();
        assert!(writer.write(frame(dims, 0, 0)).is_err());
    }

    #[test]
    fn test_write_error_surfaces_on_finish() {
        let dims = Dimensions::new(2, 2);
        let mut writer = ReconWriter::spawn(Box::new(FailingWriter), dims).unwrap();
        // The send itself may succeed before the thread fails.
        let _ = writer.write(frame(dims, 0, 0));
        assert!(writer.finish().is_err());
    }
}
