use std::fs::File;
use std::io::{self, BufReader, BufWriter};

use crate::output::domain::stream_provider::{InputStream, OutputStream, StreamProvider};
use crate::shared::stream_path::StreamPath;

/// Opens named files in binary mode, or the process's standard streams for
/// the `"-"` sentinel.
pub struct FileStreamProvider;

impl StreamProvider for FileStreamProvider {
    fn open_input(&self, path: &StreamPath) -> io::Result<InputStream> {
        log::debug!("Opening input {path}");
        match path {
            StreamPath::Stdio => Ok(Box::new(io::stdin())),
            StreamPath::File(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
        }
    }

    fn open_output(&self, path: &StreamPath) -> io::Result<OutputStream> {
        log::debug!("Opening output {path}");
        match path {
            StreamPath::Stdio => Ok(Box::new(BufWriter::new(io::stdout()))),
            StreamPath::File(path) => Ok(Box::new(BufWriter::new(File::create(path)?))),
        }
    }
}
