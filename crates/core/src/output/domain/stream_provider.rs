use std::io::{self, Read, Write};

use crate::shared::stream_path::StreamPath;

pub type InputStream = Box<dyn Read + Send>;
pub type OutputStream = Box<dyn Write + Send>;

/// Opens the byte streams a session reads from and writes to.
///
/// Each returned handle is released by dropping it.
pub trait StreamProvider {
    fn open_input(&self, path: &StreamPath) -> io::Result<InputStream>;

    fn open_output(&self, path: &StreamPath) -> io::Result<OutputStream>;
}
