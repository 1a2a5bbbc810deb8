//! Respiratory-signal extremum detection
//!
//! `resp_extrema` turns a sampled volume signal into a strictly increasing
//! index sequence whose values alternate between local maxima and minima.
//! The signal's mean serves as the baseline: each baseline half-wave
//! contributes its extremum, adjacent extrema of the same kind collapse to
//! the more extreme one, and extrema closer together than half the shortest
//! plausible breath period are suppressed.
//!
//! `resp_stats` derives per-breath period, rate, and amplitude series from
//! such an index sequence.

use crate::MonitorError;
use crate::constants::physiological::min_extremum_spacing;

/// Signals flatter than this peak-to-peak span carry no breaths
const FLAT_SPAN: f64 = 1e-9;

/// Candidates closer to the baseline than this fraction of the half-span
/// are window-edge slivers or noise, not breath extrema
const MIN_AMPLITUDE_FRACTION: f64 = 0.05;

/// Per-breath statistics derived from an extremum sequence
#[derive(Debug, Clone)]
pub struct RespStats {
    /// Breath periods in seconds, one per consecutive peak pair
    pub period: Vec<f64>,
    /// Instantaneous rates in breaths/min, one per consecutive peak pair
    pub rate: Vec<f64>,
    /// Tidal amplitudes, one per peak
    pub amplitude: Vec<f64>,
}

/// Indices of alternating local maxima and minima of a respiratory signal
pub fn resp_extrema(signal: &[f64], sample_rate: f64) -> Vec<usize> {
    if signal.len() < 3 {
        return Vec::new();
    }

    let baseline = signal.iter().sum::<f64>() / signal.len() as f64;
    let lo = signal.iter().cloned().fold(f64::INFINITY, f64::min);
    let hi = signal.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if hi - lo < FLAT_SPAN {
        return Vec::new();
    }

    // One candidate per baseline half-wave: the argmax of segments above
    // the baseline, the argmin of segments below it.
    let mut cands: Vec<(usize, bool)> = Vec::new();
    let mut seg_start = 0usize;
    let mut seg_above = signal[0] >= baseline;
    for i in 1..=signal.len() {
        let above = if i < signal.len() {
            signal[i] >= baseline
        } else {
            !seg_above
        };
        if above != seg_above {
            cands.push((segment_extremum(signal, seg_start, i, seg_above), seg_above));
            seg_start = i;
            seg_above = above;
        }
    }

    // Partial half-waves at the window edges produce candidates hugging the
    // baseline; only deviations of breath-like amplitude count.
    let min_deviation = MIN_AMPLITUDE_FRACTION * (hi - lo) / 2.0;
    cands.retain(|&(idx, _)| (signal[idx] - baseline).abs() >= min_deviation);

    merge_same_kind(&mut cands, signal);

    // Suppress implausibly close pairs, dropping the shallower member, then
    // re-merge any same-kind neighbors the drop created.
    let min_gap = min_extremum_spacing(sample_rate).max(1);
    loop {
        let mut victim = None;
        for k in 0..cands.len().saturating_sub(1) {
            if cands[k + 1].0 - cands[k].0 < min_gap {
                let d0 = (signal[cands[k].0] - baseline).abs();
                let d1 = (signal[cands[k + 1].0] - baseline).abs();
                victim = Some(if d0 <= d1 { k } else { k + 1 });
                break;
            }
        }
        match victim {
            Some(k) => {
                cands.remove(k);
                merge_same_kind(&mut cands, signal);
            }
            None => break,
        }
    }

    cands.into_iter().map(|(idx, _)| idx).collect()
}

fn segment_extremum(signal: &[f64], start: usize, end: usize, is_max: bool) -> usize {
    let mut best = start;
    for i in start + 1..end {
        let better = if is_max {
            signal[i] > signal[best]
        } else {
            signal[i] < signal[best]
        };
        if better {
            best = i;
        }
    }
    best
}

/// Collapse runs of same-kind extrema to the single most extreme member
fn merge_same_kind(cands: &mut Vec<(usize, bool)>, signal: &[f64]) {
    let mut i = 0;
    while i + 1 < cands.len() {
        let (a, a_max) = cands[i];
        let (b, b_max) = cands[i + 1];
        if a_max == b_max {
            let keep_first = if a_max {
                signal[a] >= signal[b]
            } else {
                signal[a] <= signal[b]
            };
            cands.remove(if keep_first { i + 1 } else { i });
        } else {
            i += 1;
        }
    }
}

/// Breath period, rate, and amplitude series from an extremum sequence.
///
/// Peaks are the extrema that top their alternating neighbors; a breath is
/// the span between consecutive peaks. Fails when the sequence holds fewer
/// than two peaks.
pub fn resp_stats(
    extrema: &[usize],
    signal: &[f64],
    sample_rate: f64,
) -> Result<RespStats, MonitorError> {
    if extrema.len() < 2 {
        return Err(MonitorError::AnalysisFailure(
            "too few extrema for breath statistics".into(),
        ));
    }

    let mut peaks = Vec::new();
    let mut troughs = Vec::new();
    for (k, &idx) in extrema.iter().enumerate() {
        let neighbor = if k + 1 < extrema.len() {
            extrema[k + 1]
        } else {
            extrema[k - 1]
        };
        if signal[idx] > signal[neighbor] {
            peaks.push(idx);
        } else {
            troughs.push(idx);
        }
    }

    if peaks.len() < 2 {
        return Err(MonitorError::AnalysisFailure(
            "fewer than two breath peaks in window".into(),
        ));
    }

    let mut period = Vec::with_capacity(peaks.len() - 1);
    let mut rate = Vec::with_capacity(peaks.len() - 1);
    for pair in peaks.windows(2) {
        let secs = (pair[1] - pair[0]) as f64 / sample_rate;
        period.push(secs);
        rate.push(60.0 / secs);
    }

    // Amplitude: each peak against the nearest preceding trough (the first
    // peak falls back to the nearest following one).
    let amplitude = peaks
        .iter()
        .map(|&p| {
            let trough = troughs
                .iter()
                .rev()
                .find(|&&tr| tr < p)
                .or_else(|| troughs.iter().find(|&&tr| tr > p));
            match trough {
                Some(&tr) => signal[p] - signal[tr],
                None => 0.0,
            }
        })
        .collect();

    Ok(RespStats {
        period,
        rate,
        amplitude,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_wave(amplitude: f64, freq: f64, sample_rate: f64, secs: f64) -> Vec<f64> {
        let n = (sample_rate * secs) as usize;
        (0..n)
            .map(|i| {
                amplitude * (2.0 * std::f64::consts::PI * freq * i as f64 / sample_rate).sin()
            })
            .collect()
    }

    #[test]
    fn test_flat_signal_yields_nothing() {
        assert!(resp_extrema(&[0.0; 512], 50.0).is_empty());
        assert!(resp_extrema(&[3.25; 512], 50.0).is_empty());
    }

    #[test]
    fn test_tiny_signal_yields_nothing() {
        assert!(resp_extrema(&[1.0, 2.0], 50.0).is_empty());
    }

    #[test]
    fn test_sine_alternation_and_spacing() {
        let sr = 50.0;
        let signal = sine_wave(400.0, 1.0 / 3.0, sr, 30.0);
        let extrema = resp_extrema(&signal, sr);

        // 10 breaths of 3 s: one max and one min each
        assert!(extrema.len() >= 18, "found {} extrema", extrema.len());

        for pair in extrema.windows(2) {
            assert!(pair[0] < pair[1], "indices must strictly increase");
            assert!(pair[1] - pair[0] >= min_extremum_spacing(sr));
        }
        for triple in extrema.windows(3) {
            let (a, b, c) = (signal[triple[0]], signal[triple[1]], signal[triple[2]]);
            assert!(
                (a < b && b > c) || (a > b && b < c),
                "values must alternate max/min"
            );
        }
    }

    #[test]
    fn test_sine_extrema_magnitudes() {
        let sr = 50.0;
        let signal = sine_wave(400.0, 1.0 / 3.0, sr, 30.0);
        let extrema = resp_extrema(&signal, sr);
        for &idx in &extrema {
            assert!(
                signal[idx].abs() > 350.0,
                "extremum {idx} of value {} not near a crest",
                signal[idx]
            );
        }
    }

    #[test]
    fn test_noise_burst_suppressed() {
        // A single-sample glitch inside an expiration must not survive as
        // an extremum pair.
        let sr = 50.0;
        let mut signal = sine_wave(400.0, 1.0 / 3.0, sr, 30.0);
        signal[100] = signal[100] + 30.0;
        signal[101] = signal[101] - 30.0;
        let extrema = resp_extrema(&signal, sr);
        for pair in extrema.windows(2) {
            assert!(pair[1] - pair[0] >= min_extremum_spacing(sr));
        }
    }

    #[test]
    fn test_stats_on_sine() {
        let sr = 50.0;
        let signal = sine_wave(400.0, 1.0 / 3.0, sr, 30.0);
        let extrema = resp_extrema(&signal, sr);
        let stats = resp_stats(&extrema, &signal, sr).unwrap();

        let rate = *stats.rate.last().unwrap();
        assert!((rate - 20.0).abs() < 2.0, "rate {rate} b/min");

        let period = *stats.period.last().unwrap();
        assert!((period - 3.0).abs() < 0.3, "period {period} s");

        let amp = *stats.amplitude.last().unwrap();
        assert!((amp - 800.0).abs() < 80.0, "amplitude {amp}");
    }

    #[test]
    fn test_stats_need_two_peaks() {
        let signal = vec![0.0, 1.0, 0.0, -1.0, 0.0];
        assert!(resp_stats(&[1, 3], &signal, 50.0).is_err());
        assert!(resp_stats(&[1], &signal, 50.0).is_err());
    }
}
