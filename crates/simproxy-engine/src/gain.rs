//! ---
//! sp_section: "02-engine-binding"
//! sp_subsection: "module"
//! sp_type: "source"
//! sp_scope: "code"
//! sp_description: "Engine interface and dynamic module binding."
//! sp_version: "v0.0.0-prealpha"
//! sp_owner: "tbd"
//! ---
use simproxy_common::{Signal, Status};

use crate::InnerEngine;

const DEFAULT_GAIN: f64 = 2.0;

/// In-process amplifier engine: `y = k * u`, default gain 2.0.
///
/// Behaviorally identical to the shipped Amplifier module, minus the
/// dynamic loading. Used by the driver's `--builtin` mode and by
/// lifecycle tests that should not depend on a compiled module.
#[derive(Debug, Clone)]
pub struct GainEngine {
    input: f64,
    output: f64,
    gain: f64,
}

impl Default for GainEngine {
    fn default() -> Self {
        Self {
            input: 0.0,
            output: 0.0,
            gain: DEFAULT_GAIN,
        }
    }
}

impl GainEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InnerEngine for GainEngine {
    fn setup_experiment(
        &mut self,
        _tolerance: Option<f64>,
        _start: f64,
        _stop: Option<f64>,
    ) -> Status {
        Status::Ok
    }

    fn enter_initialization(&mut self) -> Status {
        Status::Ok
    }

    fn exit_initialization(&mut self) -> Status {
        Status::Ok
    }

    fn set_signal(&mut self, signal: Signal, value: f64) -> Status {
        match signal {
            Signal::Input => self.input = value,
            Signal::Gain => self.gain = value,
            // The output is computed, never written.
            Signal::Output => return Status::Warning,
        }
        Status::Ok
    }

    fn read_signal(&mut self, signal: Signal) -> (Status, f64) {
        let value = match signal {
            Signal::Input => self.input,
            Signal::Output => self.output,
            Signal::Gain => self.gain,
        };
        (Status::Ok, value)
    }

    fn step(&mut self, _time: f64, _step_size: f64, _no_set_prior: bool) -> Status {
        self.output = self.gain * self.input;
        Status::Ok
    }

    fn terminate(&mut self) -> Status {
        Status::Ok
    }

    fn reset(&mut self) -> Status {
        *self = Self::default();
        Status::Ok
    }
}
