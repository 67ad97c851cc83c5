//! ---
//! sp_section: "04-telemetry-export"
//! sp_subsection: "module"
//! sp_type: "source"
//! sp_scope: "code"
//! sp_description: "Telemetry queue, worker, and scrape endpoint."
//! sp_version: "v0.0.0-prealpha"
//! sp_owner: "tbd"
//! ---
//! Decoupled telemetry pipeline for proxy instances.
//!
//! The caller thread pushes one immutable [`Sample`] per step into a
//! [`TelemetryChannel`]; a dedicated worker thread drains it and
//! publishes the latest values as Prometheus gauges served on a local
//! `/metrics` endpoint. The pipeline is shut down with a
//! close-then-join protocol, so no thread ever outlives the channel.

pub mod channel;
pub mod exporter;
pub mod metrics;
pub mod sample;
pub mod worker;

pub use channel::TelemetryChannel;
pub use exporter::{spawn_exporter, Exporter};
pub use metrics::{new_registry, SampleMetrics, SharedRegistry};
pub use sample::Sample;
pub use worker::{TelemetryError, TelemetryHandle};
