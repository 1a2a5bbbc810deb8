//! JSON-lines sample log
//!
//! One object per acquired sample, timestamps relative to the first record:
//!
//! ```text
//! {"t":0.020000, "slm":12.50, "cmH2O": 5.20}
//! ```
//!
//! The decimal places are fixed (6 for time, 2 for the readings) so the
//! files diff cleanly and replay tooling can rely on the layout.

use crate::sampling::IntegratedSample;
use chrono::Local;
use log::info;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Line-oriented writer for acquired samples
pub struct SampleLog {
    writer: BufWriter<File>,
    path: PathBuf,
    t0: Option<f64>,
    record_count: usize,
}

impl SampleLog {
    /// Create `splitvent-<sr>hz-<YYYYMMDD_HHMMSS>.log` in the current
    /// directory
    pub fn create(sample_rate: f64) -> io::Result<Self> {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let filename = format!("splitvent-{}hz-{}.log", sample_rate as i64, stamp);
        Self::create_at(filename)
    }

    /// Create a sample log at an explicit path
    pub fn create_at<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        info!("Logging samples to {}", path.display());
        Ok(Self {
            writer: BufWriter::new(file),
            path,
            t0: None,
            record_count: 0,
        })
    }

    /// Append one sample. The first sample written defines t=0.
    pub fn write_sample(&mut self, sample: &IntegratedSample) -> io::Result<()> {
        let t0 = *self.t0.get_or_insert(sample.t);
        writeln!(
            self.writer,
            "{{\"t\":{:.6}, \"slm\":{:.2}, \"cmH2O\": {:.2}}}",
            sample.t - t0,
            sample.slm,
            sample.cmh2o
        )?;
        self.record_count += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Number of records written
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SampleLog {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
