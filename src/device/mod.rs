//! Sensor drivers
//!
//! Real hardware lives behind `/dev/i2c-*`; the virtual sensors synthesize a
//! breathing pattern for demos and tests. All of them expose the same
//! capability set through [`ScaledSensor`], so the acquisition loop can hold
//! either kind as a trait object.

pub mod honeywell_ssc;
pub mod sfm3x00;
pub mod virtual_sensor;

pub use honeywell_ssc::HoneywellSsc;
pub use sfm3x00::Sfm3x00;
pub use virtual_sensor::{FakeFlow, FakePressure};

use crate::MonitorError;

/// A sensor that yields readings in physical units.
///
/// Implementations own their underlying descriptor; dropping the sensor
/// releases it exactly once on any exit path.
pub trait ScaledSensor {
    /// Ready the sensor for continuous readings. Called once before the
    /// first `read_scaled`.
    fn prepare(&mut self) -> Result<(), MonitorError>;

    /// Take one reading converted to physical units (slm for flow sensors,
    /// cm H2O for pressure sensors).
    fn read_scaled(&mut self) -> Result<f64, MonitorError>;
}

/// Boxed sensor handle used by the acquisition worker
pub type BoxedSensor = Box<dyn ScaledSensor + Send>;
