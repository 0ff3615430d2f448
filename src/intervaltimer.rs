use std::thread;
use std::time::{Duration, Instant};

/// Outcome of pacing one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FramePacing {
    /// Time left to sleep before the next frame may start.
    pub sleep: Option<Duration>,
    /// Delta time the next frame animates with, in seconds.
    pub dt: f64,
    pub underrun: bool,
}

/// A frame that finishes early sleeps out the rest of its period and
/// reports the target period as dt, so sleep jitter never accumulates.
/// An overrun frame reports the measured time instead.
pub fn pace(elapsed: Duration, period: Option<Duration>) -> FramePacing {
    match period {
        Some(period) if elapsed < period => FramePacing {
            sleep: Some(period - elapsed),
            dt: period.as_secs_f64(),
            underrun: false,
        },
        Some(_) => FramePacing {
            sleep: None,
            dt: elapsed.as_secs_f64(),
            underrun: true,
        },
        None => FramePacing {
            sleep: None,
            dt: elapsed.as_secs_f64(),
            underrun: false,
        },
    }
}

pub struct IntervalTimer {
    period: Option<Duration>,
    frame_start: Instant,
}

impl IntervalTimer {
    /// A frequency of zero or below runs unbounded.
    pub fn new(freq_hz: f32) -> IntervalTimer {
        let period = if freq_hz > 0.0 && freq_hz.is_finite() {
            Some(Duration::from_secs_f64(1.0 / freq_hz as f64))
        } else {
            None
        };

        IntervalTimer {
            period,
            frame_start: Instant::now(),
        }
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// Restarts the measurement, e.g. before the first frame of a loop.
    pub fn start_frame(&mut self) {
        self.frame_start = Instant::now();
    }

    /// Sleeps out the rest of the period. The next frame is measured from
    /// here, so work done between two frames counts towards the next one.
    pub fn finish_frame(&mut self) -> FramePacing {
        let pacing = pace(self.frame_start.elapsed(), self.period);
        if let Some(sleep) = pacing.sleep {
            thread::sleep(sleep);
        }
        self.frame_start = Instant::now();
        pacing
    }
}

/// Fires at a fixed wall-clock interval, independent of the frame rate.
pub struct Cadence {
    interval: Duration,
    next: Instant,
}

impl Cadence {
    pub fn new(interval: Duration) -> Cadence {
        Cadence {
            interval,
            next: Instant::now() + interval,
        }
    }

    pub fn due(&mut self, now: Instant) -> bool {
        if now < self.next {
            return false;
        }
        // Skip missed slots instead of firing in a burst
        while self.next <= now {
            self.next += self.interval;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn early_frames_report_target_period() {
        let period = Duration::from_millis(16);
        let pacing = pace(Duration::from_millis(4), Some(period));
        assert_eq!(pacing.sleep, Some(Duration::from_millis(12)));
        assert_eq!(pacing.dt, period.as_secs_f64());
        assert!(!pacing.underrun);
    }

    #[test]
    fn overrun_frames_report_measured_time() {
        let pacing = pace(Duration::from_millis(25), Some(Duration::from_millis(16)));
        assert_eq!(pacing.sleep, None);
        assert_eq!(pacing.dt, 0.025);
        assert!(pacing.underrun);
    }

    #[test]
    fn unbounded_frames_never_underrun() {
        let pacing = pace(Duration::from_millis(3), None);
        assert_eq!(pacing.sleep, None);
        assert_eq!(pacing.dt, 0.003);
        assert!(!pacing.underrun);
    }

    #[test]
    fn non_positive_rate_is_unbounded() {
        assert_eq!(IntervalTimer::new(0.0).period(), None);
        assert_eq!(IntervalTimer::new(-5.0).period(), None);
        assert_eq!(IntervalTimer::new(50.0).period(), Some(Duration::from_millis(20)));
    }

    #[test]
    fn timer_sleeps_out_the_period() {
        let mut timer = IntervalTimer::new(100.0);
        let start = Instant::now();
        timer.start_frame();
        let pacing = timer.finish_frame();
        assert!(start.elapsed() >= Duration::from_millis(10));
        assert_eq!(pacing.dt, 0.01);
    }

    #[test]
    fn time_between_frames_is_not_lost() {
        let mut timer = IntervalTimer::new(0.0);
        timer.start_frame();
        timer.finish_frame();
        thread::sleep(Duration::from_millis(20));
        let pacing = timer.finish_frame();
        assert!(pacing.dt >= 0.02, "dt {}", pacing.dt);
    }

    #[test]
    fn cadence_fires_once_per_interval() {
        let start = Instant::now();
        let mut cadence = Cadence {
            interval: Duration::from_millis(500),
            next: start + Duration::from_millis(500),
        };
        assert!(!cadence.due(start));
        assert!(!cadence.due(start + Duration::from_millis(499)));
        assert!(cadence.due(start + Duration::from_millis(500)));
        assert!(!cadence.due(start + Duration::from_millis(600)));
        // A long stall fires once, then resumes on the grid
        assert!(cadence.due(start + Duration::from_millis(2300)));
        assert!(!cadence.due(start + Duration::from_millis(2400)));
        assert!(cadence.due(start + Duration::from_millis(2500)));
    }
}
