//! Sensor diagnostic tool
//!
//! Verifies connectivity with the flow and pressure sensors without starting
//! the full pipeline: prints the flow sensor's identity and calibration,
//! then dumps a burst of readings as JSON lines for offline inspection.
//!
//! Usage:
//!   cargo run --bin diagnostic
//!   cargo run --bin diagnostic -- --fake --samples 100

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use splitvent_monitor::constants::DEFAULT_I2C_BUS;
use splitvent_monitor::constants::ssc::{SscConfig, SscRange, SscTransferFunction};
use splitvent_monitor::device::{
    BoxedSensor, FakeFlow, FakePressure, HoneywellSsc, ScaledSensor, Sfm3x00,
};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "diagnostic")]
#[command(about = "Probe the splitvent sensors and dump raw readings")]
struct Args {
    /// Use synthetic sensor data instead of hardware
    #[arg(long)]
    fake: bool,

    /// I2C bus number for both sensors
    #[arg(long, default_value_t = DEFAULT_I2C_BUS)]
    bus: u8,

    /// Number of readings to dump
    #[arg(long, default_value_t = 50)]
    samples: u32,

    /// Soft-reset the flow sensor before reading
    #[arg(long)]
    reset: bool,

    /// Honeywell SSC sensor range code
    #[arg(long = "sscrange", default_value = "015PG")]
    ssc_range: String,

    /// Honeywell SSC sensor transfer function code
    #[arg(long = "sscxfer", default_value = "A")]
    ssc_xfer: String,
}

#[derive(Serialize)]
struct Reading {
    n: u32,
    t: f64,
    slm: f64,
    #[serde(rename = "cmH2O")]
    cmh2o: f64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    let args = Args::parse();

    println!();
    println!("═══════════════════════════════════════════════");
    println!("      splitvent monitor - DIAGNOSTIC MODE      ");
    println!("═══════════════════════════════════════════════");
    println!();

    let ssc_config = SscConfig::new(
        SscRange::from_code(&args.ssc_range)?,
        SscTransferFunction::from_code(&args.ssc_xfer)?,
    );

    let (mut flow, mut pressure): (BoxedSensor, BoxedSensor) = if args.fake {
        println!("Sensors: virtual (--fake)");
        (Box::new(FakeFlow::new()), Box::new(FakePressure::new()))
    } else {
        let mut flow = Sfm3x00::open(args.bus)?;
        println!("Flow sensor on bus {}:", args.bus);
        println!("  Serial number: {}", flow.serial_number());
        println!("  Value offset:  {}", flow.offset());
        println!("  Value scale:   {}", flow.scale());
        if args.reset {
            flow.soft_reset()?;
            thread::sleep(Duration::from_millis(100));
        }
        let pressure = HoneywellSsc::open(args.bus, ssc_config)?;
        println!(
            "Pressure sensor: range {}, transfer function {}",
            pressure.config().range.code(),
            pressure.config().transfer.code()
        );
        (Box::new(flow), Box::new(pressure))
    };

    flow.prepare()?;
    pressure.prepare()?;

    println!();
    println!("Reading {} samples:", args.samples);

    let start = Instant::now();
    for n in 0..args.samples {
        let reading = Reading {
            n,
            t: start.elapsed().as_secs_f64(),
            slm: flow.read_scaled()?,
            cmh2o: pressure.read_scaled()?,
        };
        println!("{}", serde_json::to_string(&reading)?);
        thread::sleep(Duration::from_millis(20));
    }

    println!();
    println!("Done: {} readings in {:.2}s", args.samples, start.elapsed().as_secs_f64());

    Ok(())
}
