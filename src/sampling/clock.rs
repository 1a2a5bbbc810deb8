//! Fixed-rate sample clock
//!
//! Emission is anchored to the absolute schedule `t0 + n/sr` rather than
//! paced incrementally, so scheduling jitter never accumulates into drift.
//! When sensor reads run slower than the tick the clock emits no catch-up
//! burst; `dt` simply reflects the elapsed time.

use crate::sampling::FusedSample;
use serde::Serialize;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// One timestamped tick of fused sensor readings
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TimedSample {
    /// Monotonic tick index; gaps appear where a tick was skipped
    pub n: u64,
    /// Wall-clock seconds
    pub t: f64,
    /// Elapsed seconds since the previous emitted sample
    pub dt: f64,
    pub value: FusedSample,
}

/// Stamps readings with monotonic tick numbers and paces the acquisition
/// loop to the target sample rate.
pub struct SampleClock {
    sample_rate: f64,
    start: Instant,
    epoch: f64,
    t0: f64,
    last_t: f64,
    n: u64,
}

impl SampleClock {
    /// Start the clock; the first tick is due immediately.
    pub fn new(sample_rate: f64) -> Self {
        let start = Instant::now();
        let epoch = match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs_f64(),
            Err(_) => 0.0,
        };
        Self {
            sample_rate,
            start,
            epoch,
            t0: epoch,
            last_t: epoch - 1.0 / sample_rate,
            n: 0,
        }
    }

    /// Current time on the clock's axis: wall-clock seconds advanced by the
    /// monotonic clock, so `t` never goes backwards.
    fn now(&self) -> f64 {
        self.epoch + self.start.elapsed().as_secs_f64()
    }

    /// Wall-clock seconds at clock start
    pub fn start_time(&self) -> f64 {
        self.t0
    }

    /// Timestamp a reading and advance to the next tick
    pub fn stamp(&mut self, value: FusedSample) -> TimedSample {
        let t = self.now();
        let sample = TimedSample {
            n: self.n,
            t,
            dt: t - self.last_t,
            value,
        };
        self.last_t = t;
        self.n += 1;
        sample
    }

    /// Consume the current tick without emitting a sample. A read that
    /// failed still used its schedule slot; cadence must hold.
    pub fn skip(&mut self) {
        self.n += 1;
    }

    /// Sleep until the next scheduled tick, if it is still in the future
    pub fn pace(&self) {
        let target = self.t0 + self.n as f64 / self.sample_rate;
        let remaining = target - self.now();
        if remaining > 0.0 {
            thread::sleep(Duration::from_secs_f64(remaining));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALUE: FusedSample = FusedSample {
        slm: 0.0,
        cmh2o: 0.0,
    };

    #[test]
    fn test_numbering_and_dt() {
        let mut clock = SampleClock::new(100.0);
        let a = clock.stamp(VALUE);
        let b = clock.stamp(VALUE);
        assert_eq!(a.n, 0);
        assert_eq!(b.n, 1);
        assert!(a.dt >= 0.0);
        assert!(b.dt >= 0.0);
        assert!(b.t >= a.t);
    }

    #[test]
    fn test_skip_consumes_tick() {
        let mut clock = SampleClock::new(100.0);
        let a = clock.stamp(VALUE);
        clock.skip();
        let b = clock.stamp(VALUE);
        assert_eq!(a.n, 0);
        assert_eq!(b.n, 2);
    }

    #[test]
    fn test_anchored_schedule() {
        // Over N ticks the last timestamp stays within sleep resolution of
        // t0 + (N-1)/sr; jitter must not accumulate.
        let sr = 200.0;
        let n = 50;
        let mut clock = SampleClock::new(sr);
        let mut first = None;
        let mut last = None;
        for _ in 0..n {
            let s = clock.stamp(VALUE);
            first.get_or_insert(s.t);
            last = Some(s.t);
            clock.pace();
        }
        let span = last.unwrap() - first.unwrap();
        let expected = (n - 1) as f64 / sr;
        assert!(
            (span - expected).abs() < 0.06,
            "span {span:.4}s vs expected {expected:.4}s"
        );
    }
}
