//! Fixed-rate acquisition: sensor fusion, sample clocking, volume integration

pub mod clock;
pub mod combine;
pub mod integrator;

pub use clock::{SampleClock, TimedSample};
pub use combine::{FusedSample, SensorPair};
pub use integrator::{IntegratedSample, Integrator};
