//! ---
//! sp_section: "02-engine-binding"
//! sp_subsection: "module"
//! sp_type: "source"
//! sp_scope: "code"
//! sp_description: "Engine interface and dynamic module binding."
//! sp_version: "v0.0.0-prealpha"
//! sp_owner: "tbd"
//! ---
//! Inner-engine interface and the dynamic binding that backs it.
//!
//! The proxy never talks to a shared module directly. It talks to an
//! [`InnerEngine`], normally an [`EngineBinding`] whose entry points
//! were resolved from a module located through the standardized path
//! convention `<root>/<engine>/binaries/<platform>/<module><ext>`.
//! [`GainEngine`] is an in-process reference engine used by tests and
//! the driver's builtin mode.

pub mod binding;
pub mod ffi;
pub mod gain;
pub mod platform;
pub mod uri;

pub use binding::{BindOptions, BindingError, EngineBinding, FunctionTable};
pub use gain::GainEngine;
pub use platform::{module_path, module_path_for, Platform};
pub use uri::uri_to_path;

use simproxy_common::{Signal, Status};

/// The closed operation set the proxy forwards to an inner engine.
///
/// Implementations return the standardized [`Status`] verbatim; the
/// proxy never upgrades or swallows a forwarded status.
pub trait InnerEngine {
    /// Forward the experiment window. `stop` and `tolerance` are optional
    /// in the standard and forwarded as "not defined" when absent.
    fn setup_experiment(&mut self, tolerance: Option<f64>, start: f64, stop: Option<f64>)
        -> Status;

    fn enter_initialization(&mut self) -> Status;

    fn exit_initialization(&mut self) -> Status;

    /// Write one signal value into the engine.
    fn set_signal(&mut self, signal: Signal, value: f64) -> Status;

    /// Read one signal value back. The value is only meaningful when the
    /// returned status is successful.
    fn read_signal(&mut self, signal: Signal) -> (Status, f64);

    /// Advance the engine by one communication step.
    fn step(&mut self, time: f64, step_size: f64, no_set_prior: bool) -> Status;

    fn terminate(&mut self) -> Status;

    fn reset(&mut self) -> Status;
}
