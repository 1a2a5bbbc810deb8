//! Virtual sensors for demos and tests
//!
//! Deterministic generators driven by the wall clock: a sinusoidal flow and a
//! square-wave pressure, both with a 3-second breath period. They stand in
//! for the real drivers when `--fake` is given, or when tests need a sensor
//! pair without hardware.

use crate::MonitorError;
use crate::device::ScaledSensor;
use std::time::{SystemTime, UNIX_EPOCH};

/// Breath period of the synthetic pattern, seconds
const PERIOD_SECS: f64 = 3.0;

fn wall_clock_secs() -> f64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(_) => 0.0,
    }
}

/// Phase angle of the synthetic breath cycle at time `t`
fn phase(t: f64, freq: f64) -> f64 {
    (t % PERIOD_SECS) * (2.0 * std::f64::consts::PI) * freq
}

/// Sinusoidal flow source, -30..+30 slm by default
pub struct FakeFlow {
    min: f64,
    range: f64,
    freq: f64,
}

impl FakeFlow {
    pub fn new() -> Self {
        Self::with_limits(-30.0, 30.0)
    }

    pub fn with_limits(min: f64, max: f64) -> Self {
        Self {
            min,
            range: max - min,
            freq: 1.0 / PERIOD_SECS,
        }
    }
}

impl Default for FakeFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl ScaledSensor for FakeFlow {
    fn prepare(&mut self) -> Result<(), MonitorError> {
        Ok(())
    }

    fn read_scaled(&mut self) -> Result<f64, MonitorError> {
        let v = phase(wall_clock_secs(), self.freq);
        Ok((v.sin() + 1.0) * 0.5 * self.range + self.min)
    }
}

/// Square-wave pressure source, 2..20 cm H2O by default
pub struct FakePressure {
    min: f64,
    range: f64,
    freq: f64,
}

impl FakePressure {
    pub fn new() -> Self {
        Self::with_limits(2.0, 20.0)
    }

    pub fn with_limits(min: f64, max: f64) -> Self {
        Self {
            min,
            range: max - min,
            freq: 1.0 / PERIOD_SECS,
        }
    }
}

impl Default for FakePressure {
    fn default() -> Self {
        Self::new()
    }
}

impl ScaledSensor for FakePressure {
    fn prepare(&mut self) -> Result<(), MonitorError> {
        Ok(())
    }

    fn read_scaled(&mut self) -> Result<f64, MonitorError> {
        let v = phase(wall_clock_secs(), self.freq);
        Ok((v.sin().signum() + 1.0) * 0.5 * self.range + self.min)
    }
}
