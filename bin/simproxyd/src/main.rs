//! ---
//! sp_section: "01-core-functionality"
//! sp_subsection: "binary"
//! sp_type: "source"
//! sp_scope: "code"
//! sp_description: "Binary entrypoint for the SimProxy driver."
//! sp_version: "v0.0.0-prealpha"
//! sp_owner: "tbd"
//! ---
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use csv::ReaderBuilder;
use serde::Deserialize;
use simproxy_common::{init_tracing, ProxyConfig, Signal, Status};
use simproxy_core::{start_telemetry, InnerEngine, ProxyInstance};
use simproxy_engine::GainEngine;
use tracing::{debug, info, warn};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "SimProxy co-simulation driver",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(
        long,
        value_name = "DIR",
        help = "Resource root containing <engine>/binaries/<platform>/"
    )]
    resources: Option<PathBuf>,

    #[arg(
        long,
        default_value = "proxy",
        help = "Instance name used for logs and telemetry labels"
    )]
    instance: String,

    #[arg(
        long,
        help = "Run against the in-process gain engine instead of loading a module"
    )]
    builtin: bool,

    #[arg(long, default_value_t = 0.0, help = "Simulation start time")]
    start: f64,

    #[arg(long, default_value_t = 10.0, help = "Simulation stop time")]
    stop: f64,

    #[arg(long, default_value_t = 0.1, help = "Communication step size")]
    step_size: f64,

    #[arg(
        long,
        default_value_t = 1.0,
        help = "Constant input value when no schedule is given"
    )]
    input: f64,

    #[arg(
        long,
        value_name = "FILE",
        help = "CSV input schedule with time,u rows applied as step changes"
    )]
    input_csv: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "Write time,u,y results as CSV")]
    output_csv: Option<PathBuf>,

    #[arg(long, value_name = "ADDR", help = "Override the telemetry listen address")]
    metrics_listen: Option<SocketAddr>,
}

/// One row of the driver's input schedule.
#[derive(Debug, Deserialize)]
struct InputRow {
    time: f64,
    u: f64,
}

/// Piecewise-constant input signal: each row takes effect at its time
/// and holds until the next one.
#[derive(Debug)]
struct InputSchedule {
    rows: Vec<InputRow>,
}

impl InputSchedule {
    fn constant(u: f64) -> Self {
        Self {
            rows: vec![InputRow { time: f64::MIN, u }],
        }
    }

    fn from_csv(path: &PathBuf) -> Result<Self> {
        let file = fs::File::open(path)
            .with_context(|| format!("unable to open input schedule {}", path.display()))?;
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);
        let mut rows = Vec::new();
        for row in reader.deserialize::<InputRow>() {
            rows.push(row.with_context(|| format!("invalid input row in {}", path.display()))?);
        }
        if rows.is_empty() {
            bail!("input schedule {} contains no rows", path.display());
        }
        rows.sort_by(|a, b| a.time.total_cmp(&b.time));
        Ok(Self { rows })
    }

    /// Value in effect at the given time, if any row has taken effect yet.
    fn value_at(&self, time: f64) -> Option<f64> {
        self.rows
            .iter()
            .take_while(|row| row.time <= time)
            .last()
            .map(|row| row.u)
    }
}

/// One recorded result row.
struct ResultRow {
    time: f64,
    u: f64,
    y: f64,
}

/// Resolve the effective configuration.
///
/// Built-in defaults apply only when no configuration source exists at
/// all; an existing file that fails to read, parse, or validate is an
/// error, not a silent fallback.
fn load_config(cli: &Cli) -> Result<ProxyConfig> {
    let default_path = PathBuf::from("configs/simproxy.toml");
    let env_override = std::env::var(ProxyConfig::ENV_CONFIG_PATH)
        .map(|value| !value.trim().is_empty())
        .unwrap_or(false);
    if cli.config.is_none() && !env_override && !default_path.exists() {
        debug!("no configuration file found, using built-in defaults");
        return Ok(ProxyConfig::default());
    }

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(default_path);
    let loaded = ProxyConfig::load_with_source(&candidates)?;
    debug!(source = %loaded.source.display(), "configuration loaded");
    Ok(loaded.config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(&cli)?;
    if let Some(listen) = cli.metrics_listen {
        config.telemetry.listen = listen;
    }

    init_tracing("simproxyd", &config.logging)?;

    let schedule = match &cli.input_csv {
        Some(path) => InputSchedule::from_csv(path)?,
        None => InputSchedule::constant(cli.input),
    };

    let results = if cli.builtin {
        info!(instance = %cli.instance, "running against in-process gain engine");
        let telemetry = start_telemetry(&cli.instance, &config.telemetry);
        let mut proxy =
            ProxyInstance::with_engine(&cli.instance, GainEngine::new(), config.fault, telemetry);
        run_simulation(&mut proxy, &cli, &schedule)?
    } else {
        let resources = cli
            .resources
            .as_ref()
            .context("--resources is required unless --builtin is given")?;
        let resources = fs::canonicalize(resources)
            .with_context(|| format!("resource root {} not accessible", resources.display()))?;
        let resource_uri = format!("file://{}", resources.display());
        let mut proxy = ProxyInstance::instantiate(&cli.instance, &resource_uri, &config)?;
        run_simulation(&mut proxy, &cli, &schedule)?
    };

    if let Some(path) = &cli.output_csv {
        write_results(path, &results)?;
        info!(output = %path.display(), rows = results.len(), "results written");
    }

    Ok(())
}

fn run_simulation<E: InnerEngine>(
    proxy: &mut ProxyInstance<E>,
    cli: &Cli,
    schedule: &InputSchedule,
) -> Result<Vec<ResultRow>> {
    if cli.step_size <= 0.0 {
        bail!("step size must be positive");
    }

    ensure_ok(
        proxy.setup_experiment(None, cli.start, Some(cli.stop)),
        "setup-experiment",
    )?;
    ensure_ok(proxy.enter_initialization(), "enter-initialization")?;
    ensure_ok(proxy.exit_initialization(), "exit-initialization")?;

    if let Some(endpoint) = proxy.telemetry_endpoint() {
        info!(%endpoint, "telemetry scrape endpoint ready");
    }

    let mut results = Vec::new();
    let mut time = cli.start;
    while time < cli.stop {
        if let Some(u) = schedule.value_at(time) {
            proxy.set_signal(Signal::Input, u);
        }
        ensure_ok(proxy.step(time, cli.step_size, false), "step")?;
        results.push(ResultRow {
            time,
            u: proxy.signal(Signal::Input),
            y: proxy.signal(Signal::Output),
        });
        time += cli.step_size;
    }

    let status = proxy.terminate();
    if !status.is_ok() {
        warn!(%status, "terminate reported a non-success status");
    }

    info!(
        steps = results.len(),
        final_output = results.last().map(|row| row.y).unwrap_or(0.0),
        "simulation finished"
    );
    Ok(results)
}

fn ensure_ok(status: Status, operation: &str) -> Result<()> {
    if status.is_ok() {
        Ok(())
    } else {
        bail!("{operation} failed with status {status}")
    }
}

fn write_results(path: &PathBuf, results: &[ResultRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("unable to create result file {}", path.display()))?;
    writer.write_record(["time", "u", "y"])?;
    for row in results {
        writer.write_record([
            row.time.to_string(),
            row.u.to_string(),
            row.y.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn constant_schedule_always_applies() {
        let schedule = InputSchedule::constant(2.5);
        assert_eq!(schedule.value_at(0.0), Some(2.5));
        assert_eq!(schedule.value_at(1_000.0), Some(2.5));
    }

    #[test]
    fn csv_schedule_is_piecewise_constant() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "time,u").expect("header");
        writeln!(file, "0.0,1.0").expect("row");
        writeln!(file, "5.0,3.0").expect("row");
        file.flush().expect("flush");

        let schedule = InputSchedule::from_csv(&file.path().to_path_buf()).expect("parses");
        assert_eq!(schedule.value_at(0.0), Some(1.0));
        assert_eq!(schedule.value_at(4.9), Some(1.0));
        assert_eq!(schedule.value_at(5.0), Some(3.0));
        assert_eq!(schedule.value_at(9.0), Some(3.0));
    }

    #[test]
    fn malformed_config_file_is_an_error() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "[fault\nwindow_start = ").expect("write");
        file.flush().expect("flush");

        let cli = Cli::parse_from([
            "simproxyd",
            "--config",
            file.path().to_str().expect("utf-8 path"),
        ]);
        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn invalid_config_values_are_an_error() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "[engine]\nname = \"\"").expect("write");
        file.flush().expect("flush");

        let cli = Cli::parse_from([
            "simproxyd",
            "--config",
            file.path().to_str().expect("utf-8 path"),
        ]);
        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn missing_explicit_config_path_is_an_error() {
        let cli = Cli::parse_from(["simproxyd", "--config", "does/not/exist.toml"]);
        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn empty_schedule_is_rejected() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "time,u").expect("header");
        file.flush().expect("flush");
        assert!(InputSchedule::from_csv(&file.path().to_path_buf()).is_err());
    }
}
