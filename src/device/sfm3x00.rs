//! Sensirion SFM3x00 mass-flow sensor driver
//!
//! The sensor answers 2-byte big-endian command words with 3-byte frames: a
//! u16 value followed by a CRC byte. Calibration (offset, scale) is read once
//! at open; every steady-state frame is converted with
//! `slm = (raw - offset) / scale`.
//!
//! CRC bytes are read and discarded, matching the deployed behavior of the
//! reference circuit.

use crate::MonitorError;
use crate::constants::sfm3x00::{
    CMD_RD_OFFSET, CMD_RD_SCALE, CMD_RD_SERNUM_1, CMD_RESET, CMD_START_FLOW, STARTUP_DELAY_MS,
    encode_command,
};
use crate::constants::{SFM3X00_I2C_ADDR, i2c_bus_path};
use crate::device::ScaledSensor;
use i2cdev::core::I2CDevice;
use i2cdev::linux::LinuxI2CDevice;
use log::{debug, info};
use std::thread;
use std::time::Duration;

/// Convert a raw counter value to standard liters per minute
pub fn scale_flow(raw: u16, offset: u16, scale: u16) -> f64 {
    (raw as f64 - offset as f64) / scale as f64
}

/// Extract the u16 value from a 3-byte reply frame (byte 2 is the CRC)
pub fn parse_value_frame(frame: &[u8; 3]) -> u16 {
    u16::from_be_bytes([frame[0], frame[1]])
}

/// Assemble the 32-bit serial number from a 6-byte reply
/// (bytes 2 and 5 are CRCs)
pub fn parse_serial_frames(frame: &[u8; 6]) -> u32 {
    u32::from_be_bytes([frame[0], frame[1], frame[3], frame[4]])
}

/// Open SFM3x00 flow sensor on a Linux I2C bus
pub struct Sfm3x00 {
    dev: LinuxI2CDevice,
    offset: u16,
    scale: u16,
    serial_number: u32,
}

impl Sfm3x00 {
    /// Open the sensor on the given bus at the default address (0x40) and
    /// read its calibration words.
    pub fn open(bus: u8) -> Result<Self, MonitorError> {
        Self::open_at(bus, SFM3X00_I2C_ADDR)
    }

    /// Open the sensor at an explicit 7-bit address
    pub fn open_at(bus: u8, addr: u16) -> Result<Self, MonitorError> {
        let path = i2c_bus_path(bus);
        info!("Opening {} for flow sensor at address {:#04x}", path, addr);
        let mut dev = LinuxI2CDevice::new(&path, addr & 0x7F)?;

        let offset = Self::read_register(&mut dev, CMD_RD_OFFSET)?;
        let scale = Self::read_register(&mut dev, CMD_RD_SCALE)?;
        let serial_number = Self::read_serial(&mut dev)?;

        info!(
            "Flow sensor ready: serial={}, offset={}, scale={}",
            serial_number, offset, scale
        );

        Ok(Self {
            dev,
            offset,
            scale,
            serial_number,
        })
    }

    fn read_register(dev: &mut LinuxI2CDevice, cmd: u16) -> Result<u16, MonitorError> {
        dev.write(&encode_command(cmd))?;
        let mut frame = [0u8; 3];
        dev.read(&mut frame)?;
        Ok(parse_value_frame(&frame))
    }

    fn read_serial(dev: &mut LinuxI2CDevice) -> Result<u32, MonitorError> {
        dev.write(&encode_command(CMD_RD_SERNUM_1))?;
        let mut frame = [0u8; 6];
        dev.read(&mut frame)?;
        Ok(parse_serial_frames(&frame))
    }

    /// Factory calibration offset
    pub fn offset(&self) -> u16 {
        self.offset
    }

    /// Factory calibration scale
    pub fn scale(&self) -> u16 {
        self.scale
    }

    /// Device serial number
    pub fn serial_number(&self) -> u32 {
        self.serial_number
    }

    /// Issue a soft reset. The sensor must be prepared again afterwards.
    pub fn soft_reset(&mut self) -> Result<(), MonitorError> {
        info!("Resetting flow sensor");
        self.dev.write(&encode_command(CMD_RESET))?;
        Ok(())
    }

    /// Read one raw counter value from the measurement stream
    pub fn read_raw(&mut self) -> Result<u16, MonitorError> {
        let mut frame = [0u8; 3];
        self.dev.read(&mut frame)?;
        Ok(parse_value_frame(&frame))
    }

    /// Read one flow value in standard liters per minute
    pub fn read_flow(&mut self) -> Result<f64, MonitorError> {
        Ok(scale_flow(self.read_raw()?, self.offset, self.scale))
    }
}

impl ScaledSensor for Sfm3x00 {
    /// Start continuous measurement and discard the first (stale) frame
    fn prepare(&mut self) -> Result<(), MonitorError> {
        debug!("Starting continuous flow measurement");
        self.dev.write(&encode_command(CMD_START_FLOW))?;
        thread::sleep(Duration::from_millis(STARTUP_DELAY_MS));
        self.read_raw()?;
        Ok(())
    }

    fn read_scaled(&mut self) -> Result<f64, MonitorError> {
        self.read_flow()
    }
}

impl Drop for Sfm3x00 {
    fn drop(&mut self) {
        debug!("Closing flow sensor (serial={})", self.serial_number);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_frame() {
        // CRC byte is ignored
        assert_eq!(parse_value_frame(&[0x7D, 0x82, 0xFF]), 0x7D82);
        assert_eq!(parse_value_frame(&[0x00, 0x01, 0x00]), 1);
    }

    #[test]
    fn test_parse_serial_frames() {
        // Bytes 2 and 5 are CRCs and must not contribute
        assert_eq!(
            parse_serial_frames(&[0x12, 0x34, 0xAA, 0x56, 0x78, 0xBB]),
            0x12345678
        );
    }

    #[test]
    fn test_scale_flow() {
        // Datasheet example calibration: offset 32000, scale 140
        assert!((scale_flow(32000, 32000, 140) - 0.0).abs() < 1e-12);
        assert!((scale_flow(32140, 32000, 140) - 1.0).abs() < 1e-12);
        // Expiratory flow comes out negative
        assert!((scale_flow(32120, 32000, 120) - 1.0).abs() < 1e-12);
        assert!((scale_flow(31880, 32000, 120) + 1.0).abs() < 1e-12);
    }
}
