use crate::encoding::domain::encoded_frame::EncodedFrame;
use crate::shared::dimensions::PLANE_COUNT;

/// Metrics of one completed picture, as folded into the totals.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameMetrics {
    pub psnr: Option<[f64; PLANE_COUNT]>,
    pub bits: u64,
}

/// Totals for a whole run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FinalStats {
    pub frames_started: u64,
    pub frames_completed: u64,
    pub total_bits: u64,
    /// Mean PSNR per plane over the frames that reported it; `None` when
    /// none did.
    pub mean_psnr: Option<[f64; PLANE_COUNT]>,
}

/// Running totals across the encoder's uneven input/output cadence.
#[derive(Debug, Default)]
pub struct StatsAccumulator {
    frames_started: u64,
    frames_completed: u64,
    total_bits: u64,
    psnr_frames: u64,
    psnr_sum: [f64; PLANE_COUNT],
}

impl StatsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one read attempt, whether or not it yields a frame.
    pub fn frame_started(&mut self) {
        self.frames_started += 1;
    }

    pub fn record(&mut self, frame: &EncodedFrame) -> FrameMetrics {
        let metrics = FrameMetrics {
            psnr: frame.psnr,
            bits: frame.bits(),
        };

        self.frames_completed += 1;
        self.total_bits += metrics.bits;
        if let Some(psnr) = metrics.psnr {
            self.psnr_frames += 1;
            for (sum, value) in self.psnr_sum.iter_mut().zip(psnr) {
                *sum += value;
            }
        }

        metrics
    }

    pub fn frames_started(&self) -> u64 {
        self.frames_started
    }

    pub fn frames_completed(&self) -> u64 {
        self.frames_completed
    }

    pub fn finish(&self) -> FinalStats {
        let mean_psnr = (self.psnr_frames > 0).then(|| {
            let n = self.psnr_frames as f64;
            self.psnr_sum.map(|sum| sum / n)
        });

        FinalStats {
            frames_started: self.frames_started,
            frames_completed: self.frames_completed,
            total_bits: self.total_bits,
            mean_psnr,
        }
    }
}
