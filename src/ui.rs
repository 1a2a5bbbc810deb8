//! Console presentation helpers
//!
//! A fixed-width status line per refresh: wall-clock time, instantaneous
//! flow, two ANSI bar gauges (flow and running volume), the running volume
//! in mL, and the latest tidal metrics.

use crate::analysis::TidalMetrics;
use crate::sampling::IntegratedSample;
use chrono::{Local, TimeZone};

const ANSI_WHITE_ON_BLUE: &str = "\x1b[37;44;1m";
const ANSI_RESET: &str = "\x1b[0m";

/// Display range of the flow gauge, slm
pub const FLOW_SLM_MIN: f64 = -75.0;
pub const FLOW_SLM_MAX: f64 = 75.0;

/// Display range of the volume gauge, mL
pub const VOL_ML_MIN: f64 = -1000.0;
pub const VOL_ML_MAX: f64 = 5000.0;

/// Gauge width in the status line
pub const GAUGE_WIDTH: usize = 20;

/// Display welcome banner
pub fn display_banner() {
    println!("\n╔═══════════════════════════════════════════════════════════╗");
    println!("║                                                           ║");
    println!("║          splitvent monitor - respiratory pipeline         ║");
    println!("║                                                           ║");
    println!("║   SFM3x00 flow + Honeywell SSC pressure over Linux I2C    ║");
    println!("║                                                           ║");
    println!("╚═══════════════════════════════════════════════════════════╝\n");
}

/// Display success message
pub fn success(message: &str) {
    println!("✅ {}", message);
}

/// Display error message
pub fn error(message: &str) {
    eprintln!("❌ {}", message);
}

/// Display info message
pub fn info(message: &str) {
    println!("ℹ️  {}", message);
}

/// A one-line bar gauge: a reference dot at `refval` and a block marker at
/// `val`, both clamped into the `vmin..vmax` span.
pub fn gauge(vmin: f64, vmax: f64, width: usize, val: f64, refval: f64) -> String {
    if width == 0 {
        return String::new();
    }
    let scalefactor = width as f64 / (vmax - vmin);
    let pos = |v: f64| -> usize {
        (((v - vmin) * scalefactor).floor() as isize).clamp(0, width as isize - 1) as usize
    };
    let mut cells = vec![' '; width];
    cells[pos(refval)] = '.';
    cells[pos(val)] = '█';
    let bar: String = cells.into_iter().collect();
    format!("{ANSI_WHITE_ON_BLUE}{bar}{ANSI_RESET}")
}

/// Flow gauge over the standard display range
pub fn pos_slm(val: f64, width: usize) -> String {
    gauge(FLOW_SLM_MIN, FLOW_SLM_MAX, width, val, 0.0)
}

/// Volume gauge over the standard display range
pub fn pos_ml(val: f64, width: usize) -> String {
    gauge(VOL_ML_MIN, VOL_ML_MAX, width, val, 0.0)
}

/// The tidal-metrics suffix of the status line; blanks before the first
/// analysis pass completes.
pub fn tidal_label(tidal: Option<&TidalMetrics>) -> String {
    match tidal {
        Some(t) => format!(
            "VTi:{:>4.0} ml, VTe:{:>4.0} ml, RR:{:4.1} b/min, MVe:{:5.1} l/m",
            t.vti, t.vte, t.rr, t.mve
        ),
        None => "VTi:     ml, VTe:     ml, RR:      b/min, MVe:      l/m".to_string(),
    }
}

/// Render one status line for a sample.
///
/// `clock` carries the wall-clock time only when the second changed since
/// the previous line, matching a scrolling strip-chart layout.
pub fn status_line(
    sample: &IntegratedSample,
    tidal: Option<&TidalMetrics>,
    show_clock: bool,
) -> String {
    let clock = if show_clock {
        match Local.timestamp_opt(sample.t as i64, 0).single() {
            Some(dt) => format!("{}  n={:<8}", dt.format("%H:%M:%S"), sample.n),
            None => String::new(),
        }
    } else {
        String::new()
    };

    format!(
        "{:>20}  {:>4.0} slm  {}  {}  {:>5.0} ml  {}",
        clock,
        sample.slm,
        pos_slm(sample.slm, GAUGE_WIDTH),
        pos_ml(sample.v, GAUGE_WIDTH),
        sample.v,
        tidal_label(tidal)
    )
}
