//! Pairing of one flow and one pressure reading per tick

use crate::MonitorError;
use crate::device::{BoxedSensor, ScaledSensor};
use serde::Serialize;

/// One tick of combined sensor readings
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FusedSample {
    /// Mass flow in standard liters per minute, positive on inspiration
    pub slm: f64,
    /// Airway pressure in cm H2O
    pub cmh2o: f64,
}

/// The flow/pressure sensor pair owned by the acquisition worker
pub struct SensorPair {
    flow: BoxedSensor,
    pressure: BoxedSensor,
}

impl SensorPair {
    pub fn new(flow: BoxedSensor, pressure: BoxedSensor) -> Self {
        Self { flow, pressure }
    }

    /// Ready both sensors for continuous readings
    pub fn prepare(&mut self) -> Result<(), MonitorError> {
        self.flow.prepare()?;
        self.pressure.prepare()?;
        Ok(())
    }

    /// Read both sensors once, flow first
    pub fn read_fused(&mut self) -> Result<FusedSample, MonitorError> {
        let slm = self.flow.read_scaled()?;
        let cmh2o = self.pressure.read_scaled()?;
        Ok(FusedSample { slm, cmh2o })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{FakeFlow, FakePressure};

    #[test]
    fn test_fused_reading() {
        let mut pair = SensorPair::new(
            Box::new(FakeFlow::new()),
            Box::new(FakePressure::new()),
        );
        pair.prepare().unwrap();
        let sample = pair.read_fused().unwrap();
        assert!((-30.0..=30.0).contains(&sample.slm));
        assert!((2.0..=20.0).contains(&sample.cmh2o));
    }
}
