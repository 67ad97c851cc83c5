//! ---
//! sp_section: "04-telemetry-export"
//! sp_subsection: "module"
//! sp_type: "source"
//! sp_scope: "code"
//! sp_description: "Telemetry queue, worker, and scrape endpoint."
//! sp_version: "v0.0.0-prealpha"
//! sp_owner: "tbd"
//! ---

/// Immutable snapshot of proxy state taken once per completed step.
///
/// `input` always carries the orchestrator-set value, never the
/// fault-adjusted value forwarded to the inner engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Simulation time of the step that produced this snapshot.
    pub time: f64,
    /// Cached input `u` as set by the orchestrator.
    pub input: f64,
    /// Output `y` read back from the inner engine for this step.
    pub output: f64,
    /// Gain parameter `k` currently cached by the proxy.
    pub gain: f64,
}
