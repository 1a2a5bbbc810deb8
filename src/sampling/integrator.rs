//! Flow-to-volume integration with breath-onset resynchronization
//!
//! Volume is an online Riemann sum of flow. The running total is zeroed at
//! each detected inspiration onset: a zero-crossing of flow from expiration
//! to inspiration, gated by two hysteresis timers so that noise around the
//! crossing and mid-breath wiggles cannot retrigger it.

use crate::sampling::TimedSample;
use serde::Serialize;

/// Minimum time between breath-onset resets, seconds
pub const RESET_HOLDOFF_SECS: f64 = 0.25;

/// After a reset, a new one is only accepted early if the running volume
/// has collapsed back toward baseline; after this window it is accepted
/// unconditionally. Seconds.
pub const PEAK_WINDOW_SECS: f64 = 10.0;

/// "Collapsed toward baseline" means below this fraction of the peak volume
/// seen since the last reset.
pub const PEAK_COLLAPSE_FRACTION: f64 = 0.1;

/// Milliliters of volume change for one tick
fn volume_increment_ml(dt: f64, slm: f64) -> f64 {
    dt * slm * 1000.0 / 60.0
}

/// One fully processed tick: timing, raw readings, and integrated volume
#[derive(Debug, Clone, Copy, Serialize)]
pub struct IntegratedSample {
    pub n: u64,
    pub t: f64,
    pub dt: f64,
    pub slm: f64,
    pub cmh2o: f64,
    /// Volume increment for this tick, mL
    pub dv: f64,
    /// Running tidal volume since the last detected inspiration onset, mL
    pub v: f64,
}

/// Running tidal-volume integrator with breath-onset reset
pub struct Integrator {
    v: f64,
    v_peak: f64,
    last_slm: f64,
    idled_until: f64,
    peak_until: f64,
}

impl Integrator {
    pub fn new() -> Self {
        Self {
            v: 0.0,
            v_peak: 0.0,
            last_slm: 0.0,
            idled_until: 0.0,
            peak_until: 0.0,
        }
    }

    /// Running tidal volume, mL
    pub fn volume(&self) -> f64 {
        self.v
    }

    /// Fold one timed sample into the running volume
    pub fn integrate(&mut self, sample: &TimedSample) -> IntegratedSample {
        let slm = sample.value.slm;
        let t = sample.t;

        if self.last_slm < 0.0
            && slm >= 0.0
            && t > self.idled_until
            && (t > self.peak_until || self.v < PEAK_COLLAPSE_FRACTION * self.v_peak)
        {
            self.v = 0.0;
            self.v_peak = 0.0;
            self.peak_until = t + PEAK_WINDOW_SECS;
            self.idled_until = t + RESET_HOLDOFF_SECS;
        }

        let dv = volume_increment_ml(sample.dt, slm);
        self.v += dv;
        self.v_peak = self.v_peak.max(self.v);
        self.last_slm = slm;

        IntegratedSample {
            n: sample.n,
            t: sample.t,
            dt: sample.dt,
            slm,
            cmh2o: sample.value.cmh2o,
            dv,
            v: self.v,
        }
    }
}

impl Default for Integrator {
    fn default() -> Self {
        Self::new()
    }
}
