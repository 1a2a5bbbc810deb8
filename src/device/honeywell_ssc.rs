//! Honeywell TruStability SSC pressure sensor driver
//!
//! The SSC has no command phase: every transaction is a 2-byte big-endian
//! read. The top two bits carry sensor status (any nonzero value is a
//! diagnostic condition), the low 14 bits are the pressure count. Counts are
//! mapped to psig through the part's transfer function and range, then
//! converted to cm H2O.

use crate::MonitorError;
use crate::constants::ssc::SscConfig;
use crate::constants::{CMH2O_PER_PSI, HONEYWELL_SSC_I2C_ADDR, i2c_bus_path};
use crate::device::ScaledSensor;
use i2cdev::core::I2CDevice;
use i2cdev::linux::LinuxI2CDevice;
use log::{debug, info};

/// Status bits of the output word
pub const STATUS_MASK: u16 = 0xC000;

/// Pressure count bits of the output word
pub const COUNT_MASK: u16 = 0x3FFF;

/// Split a raw output word into its 14-bit count, rejecting any word whose
/// status bits signal a diagnostic condition.
pub fn decode_report(report: u16) -> Result<u16, MonitorError> {
    let status = report & STATUS_MASK;
    if status != 0 {
        return Err(MonitorError::SensorDiagnostic { status });
    }
    Ok(report & COUNT_MASK)
}

/// Honeywell SSC pressure sensor on a Linux I2C bus
pub struct HoneywellSsc {
    dev: LinuxI2CDevice,
    config: SscConfig,
}

impl HoneywellSsc {
    /// Open the sensor on the given bus at the default address (0x28)
    pub fn open(bus: u8, config: SscConfig) -> Result<Self, MonitorError> {
        Self::open_at(bus, HONEYWELL_SSC_I2C_ADDR, config)
    }

    /// Open the sensor at an explicit 7-bit address (0x28..0x78 depending on
    /// part options)
    pub fn open_at(bus: u8, addr: u16, config: SscConfig) -> Result<Self, MonitorError> {
        let path = i2c_bus_path(bus);
        info!(
            "Opening {} for pressure sensor at address {:#04x} ({}, transfer {})",
            path,
            addr,
            config.range.code(),
            config.transfer.code()
        );
        let dev = LinuxI2CDevice::new(&path, addr & 0x7F)?;
        Ok(Self { dev, config })
    }

    /// Sensor configuration (range and transfer function)
    pub fn config(&self) -> &SscConfig {
        &self.config
    }

    /// Read one raw 14-bit pressure count
    pub fn read_counts(&mut self) -> Result<u16, MonitorError> {
        let mut frame = [0u8; 2];
        self.dev.read(&mut frame)?;
        decode_report(u16::from_be_bytes(frame))
    }

    /// Read one pressure value in cm H2O
    pub fn read_pressure(&mut self) -> Result<f64, MonitorError> {
        let counts = self.read_counts()?;
        Ok(self.config.counts_to_psig(counts) * CMH2O_PER_PSI)
    }
}

impl ScaledSensor for HoneywellSsc {
    fn prepare(&mut self) -> Result<(), MonitorError> {
        // Command-less part; nothing to arm
        debug!("Pressure sensor requires no preparation");
        Ok(())
    }

    fn read_scaled(&mut self) -> Result<f64, MonitorError> {
        self.read_pressure()
    }
}
