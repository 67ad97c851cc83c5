//! ---
//! sp_section: "04-telemetry-export"
//! sp_subsection: "module"
//! sp_type: "source"
//! sp_scope: "code"
//! sp_description: "Telemetry queue, worker, and scrape endpoint."
//! sp_version: "v0.0.0-prealpha"
//! sp_owner: "tbd"
//! ---
use std::net::SocketAddr;
use std::thread;

use simproxy_common::TelemetryConfig;
use thiserror::Error;
use tokio::runtime::{Handle, Runtime};
use tracing::{debug, info, warn};

use crate::channel::TelemetryChannel;
use crate::exporter::{spawn_exporter, Exporter};
use crate::metrics::{new_registry, SampleMetrics};
use crate::Sample;

/// Failures while starting the telemetry pipeline.
///
/// These are reported to the owning proxy, which logs them and keeps
/// running without telemetry; they never cross the orchestrator-facing
/// boundary.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to register telemetry metrics: {0}")]
    Metrics(#[from] prometheus::Error),
    #[error("failed to build telemetry runtime: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("failed to start telemetry exporter: {0}")]
    Exporter(#[source] anyhow::Error),
    #[error("failed to spawn telemetry worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}

/// Owns one running telemetry pipeline: channel, worker thread, and
/// scrape endpoint.
///
/// Shutdown follows a strict close-then-join protocol: the channel is
/// closed first, guaranteeing the worker drains the backlog and exits,
/// then the worker is joined, then the exporter is stopped. The
/// sequence is idempotent and runs from `Drop` as well.
pub struct TelemetryHandle {
    channel: TelemetryChannel,
    worker: Option<thread::JoinHandle<()>>,
    exporter: Option<Exporter>,
    runtime: Option<Runtime>,
    addr: SocketAddr,
}

impl TelemetryHandle {
    /// Start the pipeline for one named proxy instance.
    pub fn start(instance: &str, config: &TelemetryConfig) -> Result<Self, TelemetryError> {
        let registry = new_registry();
        let metrics = SampleMetrics::new(&registry)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name(format!("telemetry-http-{instance}"))
            .enable_all()
            .build()
            .map_err(TelemetryError::Runtime)?;

        let exporter = {
            let _guard = runtime.enter();
            spawn_exporter(registry, config.listen).map_err(TelemetryError::Exporter)?
        };
        let addr = exporter.addr();

        let channel = TelemetryChannel::new();
        let worker = {
            let channel = channel.clone();
            let instance = instance.to_owned();
            thread::Builder::new()
                .name(format!("telemetry-{instance}"))
                .spawn(move || drain_loop(&instance, &channel, &metrics))
                .map_err(TelemetryError::WorkerSpawn)?
        };

        info!(instance, endpoint = %addr, "telemetry pipeline started");
        Ok(Self {
            channel,
            worker: Some(worker),
            exporter: Some(exporter),
            runtime: Some(runtime),
            addr,
        })
    }

    /// Queue one sample for export. Never blocks the caller.
    pub fn push(&self, sample: Sample) {
        self.channel.push(sample);
    }

    /// A clone of the underlying channel, mainly for tests.
    pub fn channel(&self) -> TelemetryChannel {
        self.channel.clone()
    }

    /// Address of the scrape endpoint.
    pub fn endpoint(&self) -> SocketAddr {
        self.addr
    }

    /// Close the channel, join the worker, and stop the exporter.
    /// Safe to call repeatedly; later calls are no-ops.
    ///
    /// Callable from both sync and async contexts. On a plain thread
    /// the exporter shutdown is awaited; on an async worker thread,
    /// where blocking on or dropping the owned runtime would panic,
    /// the exporter is signaled and the runtime winds down in the
    /// background instead.
    pub fn shutdown(&mut self) {
        self.channel.close();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("telemetry worker panicked before shutdown");
            }
        }
        if let (Some(exporter), Some(runtime)) = (self.exporter.take(), self.runtime.take()) {
            if Handle::try_current().is_ok() {
                exporter.signal_shutdown();
                runtime.shutdown_background();
            } else if let Err(err) = runtime.block_on(exporter.shutdown()) {
                warn!(error = %err, "telemetry exporter shutdown failed");
            }
        }
    }
}

impl Drop for TelemetryHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn drain_loop(instance: &str, channel: &TelemetryChannel, metrics: &SampleMetrics) {
    debug!(instance, "telemetry worker started");
    while let Some(sample) = channel.pop() {
        metrics.record(instance, &sample);
    }
    debug!(instance, "telemetry channel closed and drained, worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TelemetryConfig {
        TelemetryConfig {
            enabled: true,
            listen: "127.0.0.1:0".parse().expect("loopback addr"),
        }
    }

    fn sample(time: f64) -> Sample {
        Sample {
            time,
            input: 1.0,
            output: 2.0,
            gain: 2.0,
        }
    }

    #[test]
    fn starts_and_shuts_down_cleanly() {
        let mut handle = TelemetryHandle::start("test-instance", &config()).expect("start");
        assert_ne!(handle.endpoint().port(), 0);
        for i in 0..10 {
            handle.push(sample(i as f64));
        }
        handle.shutdown();
        // The worker drained everything before exiting.
        assert!(handle.channel().is_empty());
    }

    #[test]
    fn shutdown_is_idempotent() {
        let mut handle = TelemetryHandle::start("test-instance", &config()).expect("start");
        handle.shutdown();
        handle.shutdown();
    }

    #[test]
    fn shutdown_completes_after_worker_already_exited() {
        let mut handle = TelemetryHandle::start("test-instance", &config()).expect("start");
        // Closing the channel from outside makes the worker exit early.
        handle.channel().close();
        handle.shutdown();
    }

    #[test]
    fn drop_runs_the_shutdown_protocol() {
        let handle = TelemetryHandle::start("test-instance", &config()).expect("start");
        let channel = handle.channel();
        drop(handle);
        assert!(channel.is_closed());
    }

    #[tokio::test]
    async fn drop_on_an_async_thread_does_not_panic() {
        let handle = tokio::task::spawn_blocking(|| {
            TelemetryHandle::start("test-instance", &config()).expect("start")
        })
        .await
        .expect("start completes");
        let channel = handle.channel();
        // Dropping here exercises the non-blocking teardown path.
        drop(handle);
        assert!(channel.is_closed());
    }
}
