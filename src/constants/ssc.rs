//! Honeywell TruStability SSC range and transfer-function tables
//!
//! The part number encodes a pressure range and a transfer function; together
//! they map the 14-bit count in each reading onto physical pressure.

use crate::MonitorError;
use serde::{Deserialize, Serialize};

/// Full scale of the 14-bit output word
const FULL_SCALE: f64 = 16384.0; // 2^14

/// Calibrated pressure range (gauge)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SscRange {
    /// 0..5 psig
    R005Pg,
    /// 0..15 psig
    R015Pg,
}

impl SscRange {
    /// Parse a part-number range code, e.g. "015PG"
    pub fn from_code(code: &str) -> Result<Self, MonitorError> {
        match code.to_uppercase().as_str() {
            "005PG" => Ok(SscRange::R005Pg),
            "015PG" => Ok(SscRange::R015Pg),
            _ => Err(MonitorError::UnknownRangeCode(code.to_string())),
        }
    }

    /// Range endpoints in psig
    pub fn limits(&self) -> (f64, f64) {
        match self {
            SscRange::R005Pg => (0.0, 5.0),
            SscRange::R015Pg => (0.0, 15.0),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            SscRange::R005Pg => "005PG",
            SscRange::R015Pg => "015PG",
        }
    }
}

/// Analog transfer function: the fraction of the 2^14 count span used for
/// the calibrated range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SscTransferFunction {
    /// 10% to 90%
    A,
    /// 5% to 95%
    B,
    /// 5% to 85%
    C,
    /// 4% to 94%
    F,
}

impl SscTransferFunction {
    /// Parse a part-number transfer-function code
    pub fn from_code(code: &str) -> Result<Self, MonitorError> {
        match code.to_uppercase().as_str() {
            "A" => Ok(SscTransferFunction::A),
            "B" => Ok(SscTransferFunction::B),
            "C" => Ok(SscTransferFunction::C),
            "F" => Ok(SscTransferFunction::F),
            _ => Err(MonitorError::UnknownTransferFunction(code.to_string())),
        }
    }

    /// Count-domain endpoints `(report_min, report_max)`
    pub fn report_limits(&self) -> (f64, f64) {
        let (lo, hi) = match self {
            SscTransferFunction::A => (0.10, 0.90),
            SscTransferFunction::B => (0.05, 0.95),
            SscTransferFunction::C => (0.05, 0.85),
            SscTransferFunction::F => (0.04, 0.94),
        };
        (FULL_SCALE * lo, FULL_SCALE * hi)
    }

    pub fn code(&self) -> &'static str {
        match self {
            SscTransferFunction::A => "A",
            SscTransferFunction::B => "B",
            SscTransferFunction::C => "C",
            SscTransferFunction::F => "F",
        }
    }
}

/// Immutable per-sensor configuration for one SSC part
#[derive(Debug, Clone, Copy)]
pub struct SscConfig {
    pub range: SscRange,
    pub transfer: SscTransferFunction,
}

impl SscConfig {
    pub fn new(range: SscRange, transfer: SscTransferFunction) -> Self {
        Self { range, transfer }
    }

    /// Convert a 14-bit count to psig through the transfer function
    pub fn counts_to_psig(&self, raw: u16) -> f64 {
        let (range_min, range_max) = self.range.limits();
        let (report_min, report_max) = self.transfer.report_limits();
        ((range_max - range_min) / (report_max - report_min)) * (raw as f64 - report_min)
            + range_min
    }
}

impl Default for SscConfig {
    /// The part the reference circuit ships with: 015PG, transfer function A
    fn default() -> Self {
        Self::new(SscRange::R015Pg, SscTransferFunction::A)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_codes() {
        assert_eq!(SscRange::from_code("005PG").unwrap(), SscRange::R005Pg);
        assert_eq!(SscRange::from_code("015pg").unwrap(), SscRange::R015Pg);
        assert!(SscRange::from_code("030PG").is_err());
    }

    #[test]
    fn test_transfer_codes() {
        assert_eq!(
            SscTransferFunction::from_code("a").unwrap(),
            SscTransferFunction::A
        );
        assert!(SscTransferFunction::from_code("D").is_err());
    }

    #[test]
    fn test_transfer_limits() {
        let (lo, hi) = SscTransferFunction::A.report_limits();
        assert!((lo - 1638.4).abs() < 1e-9);
        assert!((hi - 14745.6).abs() < 1e-9);
    }

    #[test]
    fn test_counts_to_psig_midscale() {
        // Mid-span count maps to mid-range pressure
        let cfg = SscConfig::new(SscRange::R015Pg, SscTransferFunction::A);
        let psig = cfg.counts_to_psig(8192);
        assert!((psig - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_counts_to_psig_005pg() {
        let cfg = SscConfig::new(SscRange::R005Pg, SscTransferFunction::A);
        let psig = cfg.counts_to_psig(0x2000);
        assert!((psig - 2.5).abs() < 1e-9);
    }
}
