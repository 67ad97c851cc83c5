//! ---
//! sp_section: "01-core-functionality"
//! sp_subsection: "module"
//! sp_type: "source"
//! sp_scope: "code"
//! sp_description: "Proxy lifecycle orchestration."
//! sp_version: "v0.0.0-prealpha"
//! sp_owner: "tbd"
//! ---
use std::net::SocketAddr;

use simproxy_common::{ProxyConfig, Signal, Status, TelemetryConfig};
use simproxy_engine::{uri_to_path, BindOptions, BindingError, EngineBinding, InnerEngine};
use simproxy_fault::FaultRule;
use simproxy_telemetry::{Sample, TelemetryHandle};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Construction failures surfaced to the instantiating host.
///
/// Everything here is fatal: no partially initialised proxy is ever
/// observable. Failures during the running lifecycle are reported as
/// [`Status`] codes instead and never escape as errors.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("failed to bind inner engine: {0}")]
    Binding(#[from] BindingError),
}

/// Lifecycle position of a proxy instance.
///
/// Transitions mirror the standardized call sequence one-to-one and
/// only advance when the forwarded call succeeded. The proxy forwards
/// calls in whatever order the orchestrator issues them; sequencing is
/// the orchestrator's contract, not ours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Constructed,
    ExperimentConfigured,
    Initializing,
    Stepping,
    Terminated,
}

/// One co-simulation proxy instance.
///
/// Owns exactly one inner engine, one fault rule, the signal caches,
/// and an optional telemetry pipeline. The caches are the
/// orchestrator's single source of truth between calls: `set`/`get`
/// never touch the inner engine, and `y` is refreshed once per
/// completed step.
pub struct ProxyInstance<E: InnerEngine> {
    name: String,
    state: LifecycleState,
    /// Cached input `u` as most recently set by the orchestrator.
    input: f64,
    /// Cached output `y` as of the last completed step.
    output: f64,
    /// Cached gain parameter `k`.
    gain: f64,
    current_time: f64,
    fault: FaultRule,
    // Declared ahead of the engine: drop order closes and joins the
    // telemetry pipeline before the engine is torn down.
    telemetry: Option<TelemetryHandle>,
    engine: E,
}

impl ProxyInstance<EngineBinding> {
    /// Instantiate a proxy against a dynamically loaded engine module.
    ///
    /// `resource_uri` is the orchestrator-supplied URI of the unpacked
    /// resource directory; the engine module is located beneath it via
    /// the standardized path convention. A binding failure aborts
    /// construction; a telemetry failure merely disables export.
    pub fn instantiate(
        name: &str,
        resource_uri: &str,
        config: &ProxyConfig,
    ) -> Result<Self, ProxyError> {
        let resource_dir = uri_to_path(resource_uri);
        let engine = EngineBinding::new(&BindOptions {
            resource_dir: &resource_dir,
            resource_uri,
            engine: &config.engine,
        })?;
        let telemetry = start_telemetry(name, &config.telemetry);
        info!(instance = name, module = %engine.module().display(), "proxy instantiated");
        Ok(Self::assemble(name, engine, config.fault, telemetry))
    }
}

impl<E: InnerEngine> ProxyInstance<E> {
    /// Build a proxy around an already-constructed engine. Used by the
    /// driver's builtin mode and by tests.
    pub fn with_engine(
        name: &str,
        engine: E,
        fault: FaultRule,
        telemetry: Option<TelemetryHandle>,
    ) -> Self {
        Self::assemble(name, engine, fault, telemetry)
    }

    fn assemble(
        name: &str,
        engine: E,
        fault: FaultRule,
        telemetry: Option<TelemetryHandle>,
    ) -> Self {
        Self {
            name: name.to_owned(),
            state: LifecycleState::Constructed,
            input: 0.0,
            output: 0.0,
            gain: 2.0,
            current_time: 0.0,
            fault,
            telemetry,
            engine,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Scrape endpoint of the telemetry pipeline, when one is running.
    pub fn telemetry_endpoint(&self) -> Option<SocketAddr> {
        self.telemetry.as_ref().map(TelemetryHandle::endpoint)
    }

    /// Forward the experiment window to the inner engine.
    pub fn setup_experiment(
        &mut self,
        tolerance: Option<f64>,
        start: f64,
        stop: Option<f64>,
    ) -> Status {
        self.current_time = start;
        let status = self.engine.setup_experiment(tolerance, start, stop);
        if status.is_ok() {
            self.state = LifecycleState::ExperimentConfigured;
        }
        status
    }

    pub fn enter_initialization(&mut self) -> Status {
        let status = self.engine.enter_initialization();
        if status.is_ok() {
            self.state = LifecycleState::Initializing;
        }
        status
    }

    /// Push the cached gain parameter to the inner engine, then leave
    /// initialization mode.
    ///
    /// The ordering is load-bearing: parameters must be visible to the
    /// engine before it exits initialization.
    pub fn exit_initialization(&mut self) -> Status {
        let status = self.engine.set_signal(Signal::Gain, self.gain);
        if !status.is_ok() {
            warn!(instance = %self.name, %status, "failed to forward gain before exit-initialization");
            return status;
        }
        let status = self.engine.exit_initialization();
        if status.is_ok() {
            self.state = LifecycleState::Stepping;
        }
        status
    }

    /// Update the signal cache. Never forwards to the inner engine; the
    /// cached value reaches the engine at the next step (input) or at
    /// exit-initialization (gain).
    pub fn set_signal(&mut self, signal: Signal, value: f64) -> Status {
        match signal {
            Signal::Input => self.input = value,
            Signal::Gain => self.gain = value,
            Signal::Output => {
                warn!(instance = %self.name, "ignoring write to computed output signal");
            }
        }
        Status::Ok
    }

    /// Read the cached signal value. Never queries the inner engine, so
    /// `y` is exactly as fresh as the last completed step.
    pub fn signal(&self, signal: Signal) -> f64 {
        match signal {
            Signal::Input => self.input,
            Signal::Output => self.output,
            Signal::Gain => self.gain,
        }
    }

    /// Advance the co-simulation by one communication step.
    ///
    /// The fault rule is evaluated fresh for this step's time; an
    /// active window perturbs only the value handed to the engine,
    /// never the cached `u` the orchestrator reads back. The first
    /// non-successful engine status is returned verbatim and no sample
    /// is emitted for the aborted step.
    pub fn step(&mut self, time: f64, step_size: f64, no_set_prior: bool) -> Status {
        self.current_time = time;
        let effective_input = self.fault.apply(time, self.input);

        let status = self.engine.set_signal(Signal::Input, effective_input);
        if !status.is_ok() {
            warn!(instance = %self.name, %status, "engine rejected input before step");
            return status;
        }
        let status = self.engine.step(time, step_size, no_set_prior);
        if !status.is_ok() {
            warn!(instance = %self.name, %status, time, "engine step failed");
            return status;
        }
        let (status, output) = self.engine.read_signal(Signal::Output);
        if !status.is_ok() {
            warn!(instance = %self.name, %status, "failed to read engine output after step");
            return status;
        }

        self.output = output;
        self.state = LifecycleState::Stepping;
        if let Some(telemetry) = &self.telemetry {
            telemetry.push(Sample {
                time,
                input: self.input,
                output: self.output,
                gain: self.gain,
            });
        }
        status
    }

    /// Forward terminate. Telemetry keeps running until the instance is
    /// freed, so late scrapes still see the final values.
    pub fn terminate(&mut self) -> Status {
        let status = self.engine.terminate();
        if status.is_ok() {
            self.state = LifecycleState::Terminated;
        }
        status
    }

    /// Uniform report for every standardized operation outside the
    /// supported set (state serialization, derivative queries, other
    /// data types, ...).
    pub fn unsupported(&self, operation: &str) -> Status {
        debug!(instance = %self.name, operation, "unsupported standardized operation");
        Status::Error
    }

    /// Destroy the instance: telemetry is closed and joined first, then
    /// the engine is terminated, freed, and unloaded.
    pub fn free(self) {
        // Field drop order does the work.
    }
}

/// Start the telemetry pipeline for an instance, degrading to no
/// export when disabled or failing. Used at instantiation and by hosts
/// that assemble a proxy around their own engine.
pub fn start_telemetry(name: &str, config: &TelemetryConfig) -> Option<TelemetryHandle> {
    if !config.enabled {
        debug!(instance = name, "telemetry disabled by configuration");
        return None;
    }
    match TelemetryHandle::start(name, config) {
        Ok(handle) => Some(handle),
        Err(err) => {
            warn!(instance = name, error = %err, "telemetry unavailable, continuing without export");
            None
        }
    }
}
