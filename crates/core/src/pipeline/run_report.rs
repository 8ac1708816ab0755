use std::time::Duration;

use crate::encoding::domain::encoded_frame::EncodedFrame;
use crate::pipeline::stats_accumulator::{FinalStats, FrameMetrics};
use crate::pipeline::timing::EncodingTimes;

/// Outcome of a completed run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunReport {
    pub stats: FinalStats,
    /// Time between the start of the submission loop and the flush barrier.
    pub encoding: EncodingTimes,
    /// CPU time of the whole process at the end of the run.
    pub total_cpu: Duration,
}

impl RunReport {
    pub fn summary_lines(&self) -> Vec<String> {
        let stats = &self.stats;
        let mut lines = Vec::new();

        let avg_psnr = match stats.mean_psnr {
            Some([y, u, v]) => format!("{y:.4} {u:.4} {v:.4}"),
            None if stats.frames_completed == 0 => "no frames encoded".to_string(),
            None => "not reported".to_string(),
        };
        lines.push(format!(
            " Processed {} frames, {:10} bits AVG PSNR: {avg_psnr}",
            stats.frames_completed, stats.total_bits
        ));

        lines.push(format!(
            " Total CPU time: {:.3} s.",
            self.total_cpu.as_secs_f64()
        ));
        lines.push(format!(
            " Encoding time: {:.3} s.",
            self.encoding.cpu.as_secs_f64()
        ));
        lines.push(format!(
            " Encoding wall time: {:.3} s.",
            self.encoding.wall.as_secs_f64()
        ));
        lines.push(match self.encoding.cpu_usage_percent() {
            Some(pct) => format!(" Encoding CPU usage: {pct:.2}%"),
            None => " Encoding CPU usage: n/a".to_string(),
        });
        lines.push(match self.encoding.fps(stats.frames_completed) {
            Some(fps) => format!(" FPS: {fps:.2}"),
            None => " FPS: n/a".to_string(),
        });

        lines
    }
}

/// One report line for a completed picture.
pub fn frame_line(frame: &EncodedFrame, metrics: &FrameMetrics) -> String {
    let qp = frame
        .qp
        .map_or_else(|| "--".to_string(), |qp| format!("{qp:2}"));
    let psnr = metrics
        .psnr
        .map_or_else(|| "--".to_string(), |[y, u, v]| format!("{y:.4} {u:.4} {v:.4}"));
    format!(
        "POC {:4} QP {qp} ({}-frame) {:10} bits PSNR: {psnr}",
        frame.poc, frame.frame_type, metrics.bits
    )
}
