use std::io::{self, Write};

use crate::output::domain::stream_provider::OutputStream;
use crate::output::infrastructure::recon_writer::ReconWriter;
use crate::shared::dimensions::Dimensions;
use crate::shared::raw_frame::RawFrame;

/// Wraps the bitstream output and the optional reconstruction output.
///
/// Encoders write their payload here. Both streams are owned by the sink
/// and released when it is dropped, after a final flush.
pub struct OutputSink {
    bitstream: OutputStream,
    bytes_written: u64,
    recon: Option<ReconWriter>,
    finalized: bool,
}

impl OutputSink {
    /// Takes ownership of `bitstream` and, when given, starts the
    /// reconstruction writer on `recon` cropping frames to `source`.
    pub fn new(
        bitstream: OutputStream,
        recon: Option<OutputStream>,
        source: Dimensions,
    ) -> io::Result<Self> {
        let recon = match recon {
            Some(stream) => Some(ReconWriter::spawn(stream, source)?),
            None => None,
        };
        Ok(Self {
            bitstream,
            bytes_written: 0,
            recon,
            finalized: false,
        })
    }

    pub fn write_bitstream(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.bitstream.write_all(bytes)?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn wants_reconstruction(&self) -> bool {
        self.recon.is_some()
    }

    /// Queues a reconstructed picture; does nothing without a debug stream.
    pub fn write_reconstruction(&mut self, frame: RawFrame) -> io::Result<()> {
        match self.recon.as_mut() {
            Some(recon) => recon.write(frame),
            None => Ok(()),
        }
    }

    /// Flushes the bitstream and waits for the reconstruction writer to
    /// finish everything queued so far.
    pub fn sync(&mut self) -> io::Result<()> {
        self.bitstream.flush()?;
        if let Some(recon) = self.recon.as_mut() {
            recon.finish()?;
        }
        Ok(())
    }

    /// Final flush; only the first call does any work.
    pub fn finalize(&mut self) -> io::Result<()> {
        if self.finalized {
            return Ok(());
        }
        self.finalized = true;
        self.sync()
    }
}

impl Drop for OutputSink {
    fn drop(&mut self) {
        if let Err(e) = self.finalize() {
            log::warn!("Failed to finalize output: {e}");
        }
    }
}
