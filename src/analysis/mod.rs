//! Breath-cycle analysis: rolling windows, extrema detection, tidal metrics

pub mod breath;
pub mod extrema;
pub mod ringbuf;

pub use breath::{BreathAnalyzer, TidalMetrics};
pub use extrema::{RespStats, resp_extrema, resp_stats};
pub use ringbuf::CircularBuffer;
