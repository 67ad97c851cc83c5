//! ---
//! sp_section: "01-core-functionality"
//! sp_subsection: "module"
//! sp_type: "source"
//! sp_scope: "code"
//! sp_description: "Shared primitives for the co-simulation proxy."
//! sp_version: "v0.0.0-prealpha"
//! sp_owner: "tbd"
//! ---
//! Shared primitives for the SimProxy workspace.
//! This crate exposes the standardized status enumeration, signal
//! references, configuration loading, and logging bootstrap consumed
//! by every other crate in the workspace.

pub mod config;
pub mod logging;
pub mod signal;
pub mod status;

pub use config::{EngineConfig, LoggingConfig, ProxyConfig, TelemetryConfig};
pub use logging::{init_tracing, LogFormat};
pub use signal::Signal;
pub use status::Status;
