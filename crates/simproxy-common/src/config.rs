//! ---
//! sp_section: "01-core-functionality"
//! sp_subsection: "module"
//! sp_type: "source"
//! sp_scope: "code"
//! sp_description: "Shared primitives for the co-simulation proxy."
//! sp_version: "v0.0.0-prealpha"
//! sp_owner: "tbd"
//! ---
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use simproxy_fault::FaultRule;
use tracing::debug;

use crate::logging::LogFormat;

fn default_engine_name() -> String {
    "Amplifier".to_owned()
}

fn default_engine_module() -> String {
    "model".to_owned()
}

fn default_engine_guid() -> String {
    "{8c4e810f-3df3-4a00-8276-176fa3c9f000}".to_owned()
}

fn default_telemetry_enabled() -> bool {
    true
}

fn default_telemetry_listen() -> SocketAddr {
    "0.0.0.0:9464"
        .parse()
        .expect("valid default telemetry address")
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

/// Primary configuration object for one proxy instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub fault: FaultRule,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where a [`ProxyConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedProxyConfig {
    pub config: ProxyConfig,
    pub source: PathBuf,
}

impl ProxyConfig {
    pub const ENV_CONFIG_PATH: &str = "SIMPROXY_CONFIG";

    /// Load configuration from disk, respecting the `SIMPROXY_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedProxyConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedProxyConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedProxyConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: PathBuf) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents.parse::<Self>()
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.engine.name.trim().is_empty() {
            return Err(anyhow!("engine.name must not be empty"));
        }
        if self.engine.module.trim().is_empty() {
            return Err(anyhow!("engine.module must not be empty"));
        }
        if !self.fault.window_end.is_finite() || !self.fault.window_start.is_finite() {
            return Err(anyhow!("fault window bounds must be finite"));
        }
        Ok(())
    }
}

impl std::str::FromStr for ProxyConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: ProxyConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Identity and instantiation flags of the inner engine module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory name of the engine beneath the resource root.
    #[serde(default = "default_engine_name")]
    pub name: String,
    /// Basename of the shared module inside `binaries/<platform>/`.
    #[serde(default = "default_engine_module")]
    pub module: String,
    /// GUID the inner engine expects at instantiation.
    #[serde(default = "default_engine_guid")]
    pub guid: String,
    /// Forwarded `visible` instantiation flag.
    #[serde(default)]
    pub visible: bool,
    /// Forwarded `loggingOn` instantiation flag.
    #[serde(default)]
    pub logging_on: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: default_engine_name(),
            module: default_engine_module(),
            guid: default_engine_guid(),
            visible: false,
            logging_on: false,
        }
    }
}

/// Telemetry export settings for one proxy instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,
    /// Scrape endpoint address. Port 0 binds an ephemeral port.
    #[serde(default = "default_telemetry_listen")]
    pub listen: SocketAddr,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            listen: default_telemetry_listen(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}
