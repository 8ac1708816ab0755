use std::time::{Duration, Instant};

/// Wall-clock and process CPU time captured together.
#[derive(Clone, Copy, Debug)]
pub struct Timestamp {
    wall: Instant,
    cpu: Duration,
}

impl Timestamp {
    pub fn now() -> Self {
        Self {
            wall: Instant::now(),
            cpu: process_cpu_time(),
        }
    }

    /// CPU time the whole process had used when this was taken.
    pub fn cpu(&self) -> Duration {
        self.cpu
    }
}

/// Time spent between two [`Timestamp`]s.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EncodingTimes {
    pub cpu: Duration,
    pub wall: Duration,
}

impl EncodingTimes {
    pub fn between(start: Timestamp, end: Timestamp) -> Self {
        Self {
            cpu: end.cpu.saturating_sub(start.cpu),
            wall: end.wall.saturating_duration_since(start.wall),
        }
    }

    /// CPU time as a percentage of wall time. Above 100 with several
    /// busy threads; `None` if no wall time elapsed.
    pub fn cpu_usage_percent(&self) -> Option<f64> {
        let wall = self.wall.as_secs_f64();
        (wall > 0.0).then(|| self.cpu.as_secs_f64() / wall * 100.0)
    }

    pub fn fps(&self, frames: u64) -> Option<f64> {
        let wall = self.wall.as_secs_f64();
        (wall > 0.0).then(|| frames as f64 / wall)
    }
}

/// CPU time consumed by all threads of this process so far.
#[cfg(unix)]
pub fn process_cpu_time() -> Duration {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `ts` is a valid timespec owned by this frame.
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_PROCESS_CPUTIME_ID, &mut ts) };
    if rc != 0 {
        return Duration::ZERO;
    }
    Duration::new(ts.tv_sec as u64, ts.tv_nsec as u32)
}

#[cfg(not(unix))]
pub fn process_cpu_time() -> Duration {
    Duration::ZERO
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_between_is_non_negative() {
        let start = Timestamp::now();
        let end = Timestamp::now();
        let times = EncodingTimes::between(start, end);
        assert!(times.cpu >= Duration::ZERO);
        assert!(end.cpu() >= start.cpu());
    }

    #[test]
    fn test_reversed_timestamps_saturate() {
        let start = Timestamp::now();
        std::thread::sleep(Duration::from_millis(2));
        let end = Timestamp::now();
        let times = EncodingTimes::between(end, start);
        assert_eq!(times.wall, Duration::ZERO);
    }

    #[test]
    fn test_cpu_usage_and_fps() {
        let times = EncodingTimes {
            cpu: Duration::from_secs(3),
            wall: Duration::from_secs(2),
        };
        assert_relative_eq!(times.cpu_usage_percent().unwrap(), 150.0);
        assert_relative_eq!(times.fps(50).unwrap(), 25.0);
    }

    #[test]
    fn test_zero_wall_time_has_no_rates() {
        let times = EncodingTimes {
            cpu: Duration::ZERO,
            wall: Duration::ZERO,
        };
        assert_eq!(times.cpu_usage_percent(), None);
        assert_eq!(times.fps(10), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_process_cpu_time_advances_with_work() {
        let before = process_cpu_time();
        let mut acc = 0u64;
        for i in 0..5_000_000u64 {
            acc = acc.wrapping_mul(31).wrapping_add(i);
        }
        std::hint::black_box(acc);
        assert!(process_cpu_time() >= before);
    }
}
