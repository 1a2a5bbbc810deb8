//! splitvent monitor - main application
//!
//! Wires the sensor pair into the acquisition/analysis pipeline and consumes
//! its two output queues on the console.

use anyhow::Result;
use clap::Parser;
use log::debug;
use splitvent_monitor::analysis::TidalMetrics;
use splitvent_monitor::constants::DEFAULT_I2C_BUS;
use splitvent_monitor::constants::ssc::{SscConfig, SscRange, SscTransferFunction};
use splitvent_monitor::device::{FakeFlow, FakePressure, HoneywellSsc, Sfm3x00};
use splitvent_monitor::pipeline::{self, Pipeline, PipelineConfig};
use splitvent_monitor::sampling::SensorPair;
use splitvent_monitor::storage::SampleLog;
use splitvent_monitor::ui;
use std::io::BufRead;
use std::sync::mpsc::RecvTimeoutError;
use std::thread;
use std::time::Duration;

/// Rows assumed on the terminal; one status line scrolls per refresh
const TERMINAL_ROWS: f64 = 24.0;

#[derive(Parser)]
#[command(name = "splitvent-monitor")]
#[command(about = "Real-time respiratory monitoring for split-ventilator circuits")]
struct Args {
    /// Use synthetic sensor data for demo
    #[arg(long)]
    fake: bool,

    /// Flow measurement sampling rate in Hz
    #[arg(long = "samplerate", default_value_t = 50.0)]
    sample_rate: f64,

    /// Number of seconds of readings to display
    #[arg(long = "duration", default_value_t = 15.0)]
    display_duration: f64,

    /// Write readings to a logfile in the current directory
    #[arg(long)]
    log: bool,

    /// Don't update the display
    #[arg(long)]
    quiet: bool,

    /// I2C bus number for both sensors
    #[arg(long, default_value_t = DEFAULT_I2C_BUS)]
    bus: u8,

    /// Honeywell SSC sensor range code
    #[arg(long = "sscrange", default_value = "015PG")]
    ssc_range: String,

    /// Honeywell SSC sensor transfer function code
    #[arg(long = "sscxfer", default_value = "A")]
    ssc_xfer: String,
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    ui::display_banner();

    let ssc_config = SscConfig::new(
        SscRange::from_code(&args.ssc_range)?,
        SscTransferFunction::from_code(&args.ssc_xfer)?,
    );

    let sensors = if args.fake {
        ui::info("Using virtual sensors (--fake)");
        SensorPair::new(Box::new(FakeFlow::new()), Box::new(FakePressure::new()))
    } else {
        let flow = Sfm3x00::open(args.bus)?;
        ui::success(&format!(
            "Flow sensor: serial {}, offset {}, scale {}",
            flow.serial_number(),
            flow.offset(),
            flow.scale()
        ));
        let pressure = HoneywellSsc::open(args.bus, ssc_config)?;
        ui::success(&format!(
            "Pressure sensor: range {}, transfer function {}",
            pressure.config().range.code(),
            pressure.config().transfer.code()
        ));
        SensorPair::new(Box::new(flow), Box::new(pressure))
    };

    let log = if args.log {
        let writer = SampleLog::create(args.sample_rate)?;
        ui::info(&format!("Logging to {}", writer.path().display()));
        Some(writer)
    } else {
        None
    };

    let config = PipelineConfig {
        sample_rate: args.sample_rate,
        display_duration: args.display_duration,
    };
    let (pipeline, ui_rx, tidal_rx) = Pipeline::start(sensors, config, log);
    let controller = pipeline.controller();

    // Quit on 'q' (or end of input) from stdin
    {
        let controller = controller.clone();
        thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(text) if text.trim().eq_ignore_ascii_case("q") => break,
                    Ok(_) => continue,
                    Err(_) => break,
                }
            }
            controller.request();
        });
    }
    ui::info("Monitoring. Press q then Enter to quit.");

    // One status line per `skip` samples keeps the scroll rate near one
    // screenful per displayed duration.
    let skip = ((args.sample_rate * args.display_duration) / TERMINAL_ROWS).max(1.0) as u64;
    let mut tidal: Option<TidalMetrics> = None;
    let mut last_clock_second: i64 = 0;

    loop {
        if controller.is_requested() {
            break;
        }
        let batch = match pipeline::recv_batch(&ui_rx, Duration::from_secs(5)) {
            Ok(batch) => batch,
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                ui::error("No samples arriving from the acquisition worker");
                break;
            }
        };

        for metrics in tidal_rx.try_iter() {
            tidal = Some(metrics);
        }

        if args.quiet {
            continue;
        }
        for sample in &batch {
            if sample.n % skip != 0 {
                continue;
            }
            let second = sample.t as i64;
            let show_clock = second != last_clock_second;
            last_clock_second = second;
            println!("{}", ui::status_line(sample, tidal.as_ref(), show_clock));
        }
    }

    // Let in-flight sends finish before joining the workers
    controller.request();
    debug!("Draining output queues for shutdown");
    while ui_rx.recv_timeout(Duration::from_millis(250)).is_ok() {}
    while tidal_rx.recv_timeout(Duration::from_millis(250)).is_ok() {}

    let stats = pipeline.shutdown()?;
    ui::success(&format!(
        "Stopped after {} samples ({} skipped)",
        stats.emitted, stats.skipped
    ));

    Ok(())
}
