use std::io::Write;

use crate::encoding::domain::encoded_frame::EncodedFrame;
use crate::pipeline::run_report::{frame_line, RunReport};
use crate::pipeline::stats_accumulator::FrameMetrics;

/// Receives the human-readable events of an encoding run.
///
/// Keeps the driver independent of where the report goes (stderr in the
/// CLI, nowhere in tests).
pub trait EncodeLogger: Send {
    /// Log a status message.
    fn info(&mut self, message: &str);

    /// Log a recoverable problem, such as a truncated trailing frame.
    fn warn(&mut self, message: &str);

    /// Report one completed picture.
    fn frame(&mut self, frame: &EncodedFrame, metrics: &FrameMetrics);

    /// Report the end-of-run totals.
    fn summary(&mut self, report: &RunReport);
}

/// Discards everything.
pub struct NullEncodeLogger;

impl EncodeLogger for NullEncodeLogger {
    fn info(&mut self, _message: &str) {}
    fn warn(&mut self, _message: &str) {}
    fn frame(&mut self, _frame: &EncodedFrame, _metrics: &FrameMetrics) {}
    fn summary(&mut self, _report: &RunReport) {}
}

/// Writes the report line by line to `out`.
///
/// Lines are streamed and dropped unless the logger was built with
/// [`ReportLogger::recording`].
pub struct ReportLogger<W> {
    out: W,
    lines: Option<Vec<String>>,
    write_failed: bool,
}

impl<W: Write + Send> ReportLogger<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            lines: None,
            write_failed: false,
        }
    }

    /// Like [`ReportLogger::new`], but also keeps every emitted line.
    pub fn recording(out: W) -> Self {
        Self {
            lines: Some(Vec::new()),
            ..Self::new(out)
        }
    }

    /// Lines emitted so far; always empty unless recording.
    pub fn lines(&self) -> &[String] {
        self.lines.as_deref().unwrap_or(&[])
    }

    fn emit(&mut self, line: String) {
        if let Err(e) = writeln!(self.out, "{line}") {
            if !self.write_failed {
                log::warn!("Failed to write report: {e}");
                self.write_failed = true;
            }
        }
        if let Some(lines) = self.lines.as_mut() {
            lines.push(line);
        }
    }
}

impl<W: Write + Send> EncodeLogger for ReportLogger<W> {
    fn info(&mut self, message: &str) {
        log::debug!("{message}");
        self.emit(message.to_string());
    }

    fn warn(&mut self, message: &str) {
        log::warn!("{message}");
        self.emit(message.to_string());
    }

    fn frame(&mut self, frame: &EncodedFrame, metrics: &FrameMetrics) {
        self.emit(frame_line(frame, metrics));
    }

    fn summary(&mut self, report: &RunReport) {
        for line in report.summary_lines() {
            self.emit(line);
        }
        if let Err(e) = self.out.flush() {
            log::warn!("Failed to flush report: {e}");
        }
    }
}
