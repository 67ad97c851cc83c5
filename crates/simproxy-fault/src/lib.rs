//! ---
//! sp_section: "03-fault-injection"
//! sp_subsection: "module"
//! sp_type: "source"
//! sp_scope: "code"
//! sp_description: "Time-windowed fault rules for input perturbation."
//! sp_version: "v0.0.0-prealpha"
//! sp_owner: "tbd"
//! ---
//! Deterministic fault rules evaluated once per simulation step.
//!
//! A [`FaultRule`] is a pure function of simulation time: inside the
//! half-open window `[window_start, window_end)` the configured offset
//! is added to the input handed to the inner engine. The rule is
//! stateless and never mutates the proxy's own signal caches, so the
//! orchestrator keeps seeing the value it set.

use serde::{Deserialize, Serialize};

fn default_window_start() -> f64 {
    3.0
}

fn default_window_end() -> f64 {
    7.0
}

fn default_offset() -> f64 {
    0.5
}

/// Additive input fault active inside a half-open time window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaultRule {
    /// Inclusive simulation time at which the fault becomes active.
    #[serde(default = "default_window_start")]
    pub window_start: f64,
    /// Exclusive simulation time at which the fault stops applying.
    #[serde(default = "default_window_end")]
    pub window_end: f64,
    /// Offset added to the input signal while the window is active.
    #[serde(default = "default_offset")]
    pub offset: f64,
}

impl Default for FaultRule {
    fn default() -> Self {
        Self {
            window_start: default_window_start(),
            window_end: default_window_end(),
            offset: default_offset(),
        }
    }
}

impl FaultRule {
    /// Build a rule with an explicit window and offset.
    pub fn new(window_start: f64, window_end: f64, offset: f64) -> Self {
        Self {
            window_start,
            window_end,
            offset,
        }
    }

    /// A rule that never fires, for running the proxy transparently.
    pub fn disabled() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Whether the fault window covers the given simulation time.
    ///
    /// The window is half-open: `window_start <= time < window_end`.
    /// A degenerate window (`window_end <= window_start`) never fires.
    pub fn is_active(&self, time: f64) -> bool {
        time >= self.window_start && time < self.window_end
    }

    /// Offset contributed at the given simulation time.
    pub fn adjustment(&self, time: f64) -> f64 {
        if self.is_active(time) {
            self.offset
        } else {
            0.0
        }
    }

    /// Apply the rule to an input value for one step.
    pub fn apply(&self, time: f64, input: f64) -> f64 {
        let adjustment = self.adjustment(time);
        if adjustment != 0.0 {
            tracing::debug!(
                time,
                input,
                adjustment,
                "fault window active, perturbing engine input"
            );
        }
        input + adjustment
    }
}
