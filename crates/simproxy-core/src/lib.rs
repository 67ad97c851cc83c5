//! ---
//! sp_section: "01-core-functionality"
//! sp_subsection: "module"
//! sp_type: "source"
//! sp_scope: "code"
//! sp_description: "Proxy lifecycle orchestration."
//! sp_version: "v0.0.0-prealpha"
//! sp_owner: "tbd"
//! ---
//! The proxy core: one [`ProxyInstance`] per orchestrator instantiate
//! call, forwarding the standardized lifecycle to an inner engine while
//! applying fault injection and exporting telemetry.

pub mod proxy;

pub use proxy::{start_telemetry, LifecycleState, ProxyError, ProxyInstance};

pub use simproxy_common::{ProxyConfig, Signal, Status};
pub use simproxy_engine::{EngineBinding, GainEngine, InnerEngine};
pub use simproxy_fault::FaultRule;
pub use simproxy_telemetry::{Sample, TelemetryHandle};
