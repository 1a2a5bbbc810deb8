//! Tidal metrics from the rolling volume and pressure windows
//!
//! One analysis pass inspects the ordered volume window: the last three
//! extrema determine the most recent inspired and expired tidal volumes,
//! the peak-to-peak cadence gives the respiratory rate, and the pressure
//! window contributes peak and end-expiratory pressure. Expired volume is
//! averaged over a short ring before entering the minute-volume product, so
//! a single odd breath does not swing MVe.

use crate::MonitorError;
use crate::analysis::extrema::{resp_extrema, resp_stats};
use crate::analysis::ringbuf::CircularBuffer;
use serde::Serialize;

/// Breaths averaged into the expired minute volume
const VTE_AVERAGE_LEN: usize = 3;

/// Extrema needed before tidal volumes are trustworthy
const MIN_EXTREMA: usize = 5;

/// One set of derived breath metrics
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TidalMetrics {
    /// Inspired tidal volume, mL
    pub vti: f64,
    /// Expired tidal volume, mL
    pub vte: f64,
    /// Respiratory rate, breaths/min
    pub rr: f64,
    /// Expired minute volume, L/min
    pub mve: f64,
    /// Peak airway pressure, cm H2O
    pub ppk: f64,
    /// Positive end-expiratory pressure, cm H2O
    pub peep: f64,
}

/// Windowed breath-cycle analyzer
pub struct BreathAnalyzer {
    sample_rate: f64,
    volume: CircularBuffer<f64>,
    pressure: CircularBuffer<f64>,
    vte_ring: CircularBuffer<f64>,
}

impl BreathAnalyzer {
    /// `window_len` is the number of volume/pressure samples retained,
    /// normally twice the displayed duration at the pipeline sample rate.
    pub fn new(window_len: usize, sample_rate: f64) -> Self {
        Self {
            sample_rate,
            volume: CircularBuffer::new(window_len),
            pressure: CircularBuffer::new(window_len),
            vte_ring: CircularBuffer::new(VTE_AVERAGE_LEN),
        }
    }

    /// Append one tick of volume (mL) and pressure (cm H2O)
    pub fn push(&mut self, volume_ml: f64, cmh2o: f64) {
        self.volume.append(volume_ml);
        self.pressure.append(cmh2o);
    }

    /// Run one analysis pass over the current windows.
    ///
    /// Returns `Ok(None)` while the window holds too few extrema to read a
    /// breath. Unphysiological (negative) tidal volumes are passed through;
    /// masking them is a presentation concern.
    pub fn analyze(&mut self) -> Result<Option<TidalMetrics>, MonitorError> {
        let vsig = self.volume.ordered();
        let extrema = resp_extrema(&vsig, self.sample_rate);
        if extrema.len() < MIN_EXTREMA {
            return Ok(None);
        }

        let s: Vec<f64> = extrema.iter().map(|&i| vsig[i]).collect();
        let m = s.len();
        let (vti, vte) = if s[m - 1] < s[m - 2] {
            // window ends on a minimum: an expiration just finished
            (s[m - 2] - s[m - 3], s[m - 2] - s[m - 1])
        } else {
            // window ends on a maximum: an inspiration just finished
            (s[m - 1] - s[m - 2], s[m - 3] - s[m - 2])
        };

        self.vte_ring.append(vte);
        let avg_vte =
            self.vte_ring.raw().iter().sum::<f64>() / self.vte_ring.capacity() as f64;

        let stats = resp_stats(&extrema, &vsig, self.sample_rate)?;
        let rr = *stats
            .rate
            .last()
            .ok_or_else(|| MonitorError::AnalysisFailure("empty rate series".into()))?;
        let mve = (rr * avg_vte) / 1000.0;

        let ppk = self
            .pressure
            .raw()
            .iter()
            .cloned()
            .fold(f64::NEG_INFINITY, f64::max);
        let peep = self
            .pressure
            .raw()
            .iter()
            .cloned()
            .fold(f64::INFINITY, f64::min);

        Ok(Some(TidalMetrics {
            vti,
            vte,
            rr,
            mve,
            ppk,
            peep,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fill the analyzer with a sinusoidal volume and two-level pressure
    fn feed_sine(analyzer: &mut BreathAnalyzer, amplitude: f64, freq: f64, sr: f64, secs: f64) {
        let n = (sr * secs) as usize;
        for i in 0..n {
            let phase = 2.0 * std::f64::consts::PI * freq * i as f64 / sr;
            let v = amplitude * phase.sin();
            let p = if phase.sin() >= 0.0 { 20.0 } else { 5.0 };
            analyzer.push(v, p);
        }
    }

    #[test]
    fn test_empty_window_emits_nothing() {
        let mut analyzer = BreathAnalyzer::new(1500, 50.0);
        assert!(analyzer.analyze().unwrap().is_none());
    }

    #[test]
    fn test_constant_window_emits_nothing() {
        let mut analyzer = BreathAnalyzer::new(1500, 50.0);
        for _ in 0..1500 {
            analyzer.push(500.0, 10.0);
        }
        assert!(analyzer.analyze().unwrap().is_none());
    }

    #[test]
    fn test_sine_metrics() {
        // Amplitude 400 at 1/3 Hz: tidal volumes near 800 mL, 20 b/min
        let sr = 50.0;
        let mut analyzer = BreathAnalyzer::new(1500, sr);
        feed_sine(&mut analyzer, 400.0, 1.0 / 3.0, sr, 30.0);

        let metrics = analyzer.analyze().unwrap().expect("enough extrema");
        assert!((metrics.vti - 800.0).abs() < 80.0, "VTi {}", metrics.vti);
        assert!((metrics.vte - 800.0).abs() < 80.0, "VTe {}", metrics.vte);
        assert!((metrics.rr - 20.0).abs() < 2.0, "RR {}", metrics.rr);
        assert!((metrics.ppk - 20.0).abs() < 1e-9);
        assert!((metrics.peep - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_mve_uses_averaged_vte() {
        let sr = 50.0;
        let mut analyzer = BreathAnalyzer::new(1500, sr);
        feed_sine(&mut analyzer, 400.0, 1.0 / 3.0, sr, 30.0);

        let m1 = analyzer.analyze().unwrap().expect("enough extrema");
        // One VTe in a 3-slot ring: the average carries two empty slots
        let expected = m1.rr * (m1.vte / VTE_AVERAGE_LEN as f64) / 1000.0;
        assert!((m1.mve - expected).abs() < 1e-9);

        // Two more passes fill the ring; MVe settles near RR * VTe / 1000
        let _ = analyzer.analyze().unwrap();
        let m3 = analyzer.analyze().unwrap().expect("enough extrema");
        let settled = m3.rr * m3.vte / 1000.0;
        assert!(
            (m3.mve - settled).abs() < settled * 0.05,
            "MVe {} vs settled {}",
            m3.mve,
            settled
        );
    }

    #[test]
    fn test_pressure_extremes_after_wraparound() {
        let sr = 50.0;
        let mut analyzer = BreathAnalyzer::new(500, sr);
        // Overfill so the zero-initialized slots are all overwritten
        feed_sine(&mut analyzer, 400.0, 1.0 / 3.0, sr, 20.0);
        let metrics = analyzer.analyze().unwrap().expect("enough extrema");
        assert!((metrics.ppk - 20.0).abs() < 1e-9);
        assert!((metrics.peep - 5.0).abs() < 1e-9);
    }
}
