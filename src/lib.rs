//! Split-ventilator respiratory monitor
//!
//! Samples a Sensirion SFM3x00 mass-flow sensor and a Honeywell TruStability
//! SSC pressure sensor over I2C at a fixed rate, integrates flow into tidal
//! volume, and derives clinical breath metrics (respiratory rate, inspired and
//! expired tidal volume, minute volume, peak and end-expiratory pressure) for
//! per-limb monitoring of a shared ventilator circuit.
//!
//! Not a certified medical device; all outputs are advisory.

pub mod analysis;
pub mod constants;
pub mod device;
pub mod pipeline;
pub mod sampling;
pub mod storage;
pub mod ui;

// Re-export commonly used types
pub use analysis::{BreathAnalyzer, CircularBuffer, TidalMetrics};
pub use device::{FakeFlow, FakePressure, HoneywellSsc, ScaledSensor, Sfm3x00};
pub use sampling::{FusedSample, IntegratedSample, Integrator, SampleClock, SensorPair, TimedSample};

/// Result type alias for this crate
pub type Result<T> = anyhow::Result<T>;

/// Error types for sensor acquisition and analysis
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("sensor I/O error: {0}")]
    SensorIo(#[from] i2cdev::linux::LinuxI2CError),

    #[error("pressure sensor reported diagnostic status {status:#06x}")]
    SensorDiagnostic { status: u16 },

    #[error("breath analysis failed: {0}")]
    AnalysisFailure(String),

    #[error("no readings received within {0:?}")]
    QueueTimeout(std::time::Duration),

    #[error("unknown pressure range code: {0}")]
    UnknownRangeCode(String),

    #[error("unknown transfer function code: {0}")]
    UnknownTransferFunction(String),
}

impl MonitorError {
    /// True for conditions the pipeline survives by skipping the current
    /// tick or analysis cycle; false for conditions that must stop it.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MonitorError::SensorDiagnostic { .. } | MonitorError::AnalysisFailure(_)
        )
    }
}
