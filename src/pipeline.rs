//! Concurrent acquisition/analysis pipeline
//!
//! Two worker threads joined by bounded channels:
//!
//! ```text
//! Acquire: sensors -> clock -> integrator -> ui queue + analysis queue
//! Analyze: analysis queue -> breath analyzer -> tidal queue
//! ```
//!
//! The consumer (normally the console view) reads the ui and tidal queues
//! and raises the shared shutdown flag to stop both workers. Backpressure is
//! blocking: a full queue stalls the producer for a tick, and the anchored
//! sample clock absorbs the slip without accumulating drift.

use crate::MonitorError;
use crate::analysis::{BreathAnalyzer, TidalMetrics};
use crate::sampling::{IntegratedSample, Integrator, SampleClock, SensorPair};
use crate::storage::SampleLog;
use anyhow::anyhow;
use log::{error, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How long Analyze waits for input before declaring the upstream dead
pub const ANALYSIS_INPUT_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause between analysis passes
pub const ANALYSIS_THROTTLE: Duration = Duration::from_millis(500);

/// Shared stop signal, raised once by the consumer (or by a fatally failed
/// worker) and polled by every loop turn.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Analysis-queue element: one tick of integrated volume and pressure
#[derive(Debug, Clone, Copy)]
pub struct VolumePressure {
    pub v: f64,
    pub cmh2o: f64,
}

/// Pipeline tuning derived from the CLI
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Acquisition rate, Hz
    pub sample_rate: f64,
    /// Seconds of data the display keeps on screen
    pub display_duration: f64,
}

impl PipelineConfig {
    /// Samples on screen at once
    pub fn display_window(&self) -> usize {
        (self.sample_rate * self.display_duration) as usize
    }

    /// Samples retained by the breath analyzer: twice the display window
    pub fn analysis_window(&self) -> usize {
        2 * self.display_window()
    }

    /// Bound on the sample queues: about four seconds of data
    pub fn queue_capacity(&self) -> usize {
        (self.sample_rate * 4.0).max(16.0) as usize
    }
}

/// Counters reported by the acquisition worker at exit
#[derive(Debug, Clone, Copy, Default)]
pub struct AcquireStats {
    /// Samples delivered to the ui queue
    pub emitted: u64,
    /// Ticks skipped on recoverable sensor errors
    pub skipped: u64,
}

/// Handles to the running workers
pub struct Pipeline {
    shutdown: ShutdownFlag,
    acquire: JoinHandle<Result<AcquireStats, MonitorError>>,
    analyze: JoinHandle<()>,
}

impl Pipeline {
    /// Spawn both workers. Returns the pipeline handle plus the two output
    /// queues: every integrated sample, and the derived tidal metrics.
    pub fn start(
        sensors: SensorPair,
        config: PipelineConfig,
        log: Option<SampleLog>,
    ) -> (Self, Receiver<IntegratedSample>, Receiver<TidalMetrics>) {
        let shutdown = ShutdownFlag::new();
        let (ui_tx, ui_rx) = mpsc::sync_channel(config.queue_capacity());
        let (analysis_tx, analysis_rx) = mpsc::sync_channel(config.queue_capacity());
        let (tidal_tx, tidal_rx) = mpsc::sync_channel(8);

        let acquire = {
            let shutdown = shutdown.clone();
            let sample_rate = config.sample_rate;
            thread::spawn(move || {
                let result = acquire_loop(sensors, sample_rate, log, ui_tx, analysis_tx, &shutdown);
                if let Err(e) = &result {
                    error!("acquisition stopped: {e}");
                }
                // With acquisition gone the rest of the pipeline must wind down
                shutdown.request();
                result
            })
        };

        let analyze = {
            let shutdown = shutdown.clone();
            let window = config.analysis_window();
            let sample_rate = config.sample_rate;
            thread::spawn(move || analyze_loop(window, sample_rate, analysis_rx, tidal_tx, &shutdown))
        };

        (
            Self {
                shutdown,
                acquire,
                analyze,
            },
            ui_rx,
            tidal_rx,
        )
    }

    /// A clone of the stop signal, for the consumer to raise
    pub fn controller(&self) -> ShutdownFlag {
        self.shutdown.clone()
    }

    /// Stop both workers and wait for them. Drain the output queues before
    /// calling this so a blocked send cannot hold a worker up.
    pub fn shutdown(self) -> crate::Result<AcquireStats> {
        self.shutdown.request();
        let stats = self
            .acquire
            .join()
            .map_err(|_| anyhow!("acquisition worker panicked"))??;
        self.analyze
            .join()
            .map_err(|_| anyhow!("analysis worker panicked"))?;
        info!(
            "Pipeline stopped: {} samples emitted, {} skipped",
            stats.emitted, stats.skipped
        );
        Ok(stats)
    }
}

/// Blocking receive of at least one element, then a non-blocking drain
pub fn recv_batch<T>(rx: &Receiver<T>, timeout: Duration) -> Result<Vec<T>, RecvTimeoutError> {
    let first = rx.recv_timeout(timeout)?;
    let mut batch = vec![first];
    batch.extend(rx.try_iter());
    Ok(batch)
}

fn acquire_loop(
    mut sensors: SensorPair,
    sample_rate: f64,
    mut log: Option<SampleLog>,
    ui_tx: SyncSender<IntegratedSample>,
    analysis_tx: SyncSender<VolumePressure>,
    shutdown: &ShutdownFlag,
) -> Result<AcquireStats, MonitorError> {
    sensors.prepare()?;
    let mut clock = SampleClock::new(sample_rate);
    let mut integrator = Integrator::new();
    let mut stats = AcquireStats::default();

    info!("Acquisition started at {} Hz", sample_rate);
    while !shutdown.is_requested() {
        match sensors.read_fused() {
            Ok(fused) => {
                let sample = integrator.integrate(&clock.stamp(fused));
                if let Some(writer) = log.as_mut() {
                    if let Err(e) = writer.write_sample(&sample) {
                        warn!("disabling sample log: {e}");
                        log = None;
                    }
                }
                if ui_tx.send(sample).is_err() {
                    break; // consumer went away
                }
                stats.emitted += 1;
                if analysis_tx
                    .send(VolumePressure {
                        v: sample.v,
                        cmh2o: sample.cmh2o,
                    })
                    .is_err()
                {
                    break;
                }
            }
            Err(e) if e.is_recoverable() => {
                warn!("skipping sample: {e}");
                clock.skip();
                stats.skipped += 1;
            }
            Err(e) => return Err(e),
        }
        clock.pace();
    }

    info!(
        "Acquisition finished: {} samples, {} skipped",
        stats.emitted, stats.skipped
    );
    Ok(stats)
}

fn analyze_loop(
    window_len: usize,
    sample_rate: f64,
    input: Receiver<VolumePressure>,
    output: SyncSender<TidalMetrics>,
    shutdown: &ShutdownFlag,
) {
    let mut analyzer = BreathAnalyzer::new(window_len, sample_rate);
    info!("Breath analysis started (window of {} samples)", window_len);

    while !shutdown.is_requested() {
        let batch = match recv_batch(&input, ANALYSIS_INPUT_TIMEOUT) {
            Ok(batch) => batch,
            Err(RecvTimeoutError::Timeout) => {
                error!(
                    "failed to get readings from acquisition: {}",
                    MonitorError::QueueTimeout(ANALYSIS_INPUT_TIMEOUT)
                );
                return;
            }
            Err(RecvTimeoutError::Disconnected) => return,
        };

        for reading in batch {
            analyzer.push(reading.v, reading.cmh2o);
        }

        match analyzer.analyze() {
            Ok(Some(metrics)) => {
                if output.send(metrics).is_err() {
                    return; // consumer went away
                }
            }
            Ok(None) => {}
            Err(e) => warn!("tidal failed: {e}"),
        }

        if shutdown.is_requested() {
            return;
        }
        thread::sleep(ANALYSIS_THROTTLE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{FakeFlow, FakePressure};
    use std::time::Instant;

    fn virtual_pair() -> SensorPair {
        SensorPair::new(Box::new(FakeFlow::new()), Box::new(FakePressure::new()))
    }

    #[test]
    fn test_config_windows() {
        let config = PipelineConfig {
            sample_rate: 50.0,
            display_duration: 15.0,
        };
        assert_eq!(config.display_window(), 750);
        assert_eq!(config.analysis_window(), 1500);
        assert_eq!(config.queue_capacity(), 200);
    }

    #[test]
    fn test_shutdown_joins_and_accounts_for_samples() {
        let config = PipelineConfig {
            sample_rate: 50.0,
            display_duration: 2.0,
        };
        let (pipeline, ui_rx, tidal_rx) = Pipeline::start(virtual_pair(), config, None);
        let controller = pipeline.controller();

        // Consume for about a second of real acquisition
        let mut received: u64 = 0;
        let deadline = Instant::now() + Duration::from_secs(1);
        while Instant::now() < deadline {
            if ui_rx.recv_timeout(Duration::from_millis(100)).is_ok() {
                received += 1;
            }
        }

        controller.request();

        // Drain in-flight samples so the workers can finish their sends
        while ui_rx.recv_timeout(Duration::from_millis(250)).is_ok() {
            received += 1;
        }
        while tidal_rx.recv_timeout(Duration::from_millis(250)).is_ok() {}

        let joined_at = Instant::now();
        let stats = pipeline.shutdown().unwrap();
        assert!(
            joined_at.elapsed() < Duration::from_secs(6),
            "workers must exit promptly after shutdown"
        );
        assert_eq!(
            stats.emitted, received,
            "every emitted sample must reach the consumer"
        );
        assert_eq!(stats.skipped, 0);
        assert!(received > 25, "expected about 50 samples, got {received}");
    }

    /// Pressure source that reports a diagnostic status on every 5th read
    struct FlakyPressure {
        reads: u32,
    }

    impl crate::device::ScaledSensor for FlakyPressure {
        fn prepare(&mut self) -> Result<(), MonitorError> {
            Ok(())
        }

        fn read_scaled(&mut self) -> Result<f64, MonitorError> {
            self.reads += 1;
            if self.reads % 5 == 0 {
                Err(MonitorError::SensorDiagnostic { status: 0x8000 })
            } else {
                Ok(10.0)
            }
        }
    }

    #[test]
    fn test_diagnostic_reads_skip_ticks() {
        let config = PipelineConfig {
            sample_rate: 50.0,
            display_duration: 2.0,
        };
        let sensors = SensorPair::new(
            Box::new(FakeFlow::new()),
            Box::new(FlakyPressure { reads: 0 }),
        );
        let (pipeline, ui_rx, tidal_rx) = Pipeline::start(sensors, config, None);
        let controller = pipeline.controller();

        let mut samples = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(1);
        while Instant::now() < deadline {
            if let Ok(sample) = ui_rx.recv_timeout(Duration::from_millis(100)) {
                samples.push(sample);
            }
        }
        controller.request();
        while let Ok(sample) = ui_rx.recv_timeout(Duration::from_millis(250)) {
            samples.push(sample);
        }
        while tidal_rx.recv_timeout(Duration::from_millis(250)).is_ok() {}

        let stats = pipeline.shutdown().unwrap();
        assert!(stats.skipped > 0, "diagnostic ticks must be skipped");
        assert_eq!(stats.emitted, samples.len() as u64);

        // Skipped ticks consume their slot: n keeps strictly increasing
        // and shows gaps where reads failed.
        for pair in samples.windows(2) {
            assert!(pair[1].n > pair[0].n);
        }
        assert!(
            samples.last().unwrap().n >= samples.len() as u64,
            "skipped ticks must leave gaps in the numbering"
        );
    }

    #[test]
    fn test_analyze_exits_on_disconnected_input() {
        let shutdown = ShutdownFlag::new();
        let (tx, rx) = mpsc::sync_channel::<VolumePressure>(4);
        let (tidal_tx, _tidal_rx) = mpsc::sync_channel(4);
        let worker = {
            let shutdown = shutdown.clone();
            thread::spawn(move || analyze_loop(100, 50.0, rx, tidal_tx, &shutdown))
        };
        drop(tx);
        // Disconnection must end the worker without a shutdown request
        let start = Instant::now();
        worker.join().unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_recv_batch_drains() {
        let (tx, rx) = mpsc::sync_channel(16);
        for v in 0..5 {
            tx.send(v).unwrap();
        }
        let batch = recv_batch(&rx, Duration::from_millis(100)).unwrap();
        assert_eq!(batch, vec![0, 1, 2, 3, 4]);
        assert!(matches!(
            recv_batch(&rx, Duration::from_millis(50)),
            Err(RecvTimeoutError::Timeout)
        ));
    }
}
