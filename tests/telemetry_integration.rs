//! ---
//! sp_section: "15-testing-qa-runbook"
//! sp_subsection: "integration"
//! sp_type: "source"
//! sp_scope: "test"
//! sp_description: "End-to-end proxy plus telemetry scrape test."
//! sp_version: "v0.0.0-prealpha"
//! sp_owner: "tbd"
//! ---
//! Drives a full proxy lifecycle against the in-process gain engine
//! with a live telemetry pipeline, then scrapes the `/metrics`
//! endpoint over HTTP and checks the published gauges.

use std::time::Duration;

use simproxy_common::{Signal, Status, TelemetryConfig};
use simproxy_core::ProxyInstance;
use simproxy_engine::GainEngine;
use simproxy_fault::FaultRule;
use simproxy_telemetry::TelemetryHandle;

const INSTANCE: &str = "it-proxy";

/// The amplifier scenario: gain 2.0, u=3 before the fault window,
/// u=4 inside it, u=4 after it.
fn run_scenario() -> ProxyInstance<GainEngine> {
    let config = TelemetryConfig {
        enabled: true,
        listen: "127.0.0.1:0".parse().expect("loopback addr"),
    };
    let telemetry = TelemetryHandle::start(INSTANCE, &config).expect("telemetry starts");
    let mut proxy = ProxyInstance::with_engine(
        INSTANCE,
        GainEngine::new(),
        FaultRule::default(),
        Some(telemetry),
    );

    assert_eq!(proxy.setup_experiment(None, 0.0, Some(10.0)), Status::Ok);
    assert_eq!(proxy.enter_initialization(), Status::Ok);
    assert_eq!(proxy.exit_initialization(), Status::Ok);

    proxy.set_signal(Signal::Input, 3.0);
    assert_eq!(proxy.step(1.0, 1.0, false), Status::Ok);
    assert_eq!(proxy.signal(Signal::Output), 6.0);

    proxy.set_signal(Signal::Input, 4.0);
    assert_eq!(proxy.step(5.0, 1.0, false), Status::Ok);
    assert_eq!(proxy.signal(Signal::Output), 9.0);

    assert_eq!(proxy.step(8.0, 1.0, false), Status::Ok);
    assert_eq!(proxy.signal(Signal::Output), 8.0);

    assert_eq!(proxy.terminate(), Status::Ok);
    proxy
}

async fn scrape(endpoint: std::net::SocketAddr) -> anyhow::Result<String> {
    let body = reqwest::get(format!("http://{endpoint}/metrics"))
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(body)
}

#[tokio::test]
async fn gauges_converge_to_the_final_sample() {
    // The proxy is synchronous and its telemetry handle owns a runtime
    // of its own, so the lifecycle runs on a blocking thread.
    let proxy = tokio::task::spawn_blocking(run_scenario)
        .await
        .expect("scenario completes");
    let endpoint = proxy.telemetry_endpoint().expect("endpoint available");

    // The worker drains asynchronously; poll until the last sample
    // became visible.
    let mut body = String::new();
    for _ in 0..50 {
        body = scrape(endpoint).await.expect("scrape succeeds");
        if body.contains(&format!("time_seconds{{instance=\"{INSTANCE}\"}} 8")) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert!(
        body.contains(&format!("time_seconds{{instance=\"{INSTANCE}\"}} 8")),
        "time gauge missing in:\n{body}"
    );
    assert!(body.contains(&format!("input_u{{instance=\"{INSTANCE}\"}} 4")));
    assert!(body.contains(&format!("output_y{{instance=\"{INSTANCE}\"}} 8")));
    assert!(body.contains(&format!("parameter_k{{instance=\"{INSTANCE}\"}} 2")));

    // Freeing the proxy closes the channel, joins the worker, and
    // stops the exporter; block_on inside, so off the async thread.
    tokio::task::spawn_blocking(move || proxy.free())
        .await
        .expect("teardown completes");
}

#[tokio::test]
async fn endpoint_stops_serving_after_free() {
    let proxy = tokio::task::spawn_blocking(run_scenario)
        .await
        .expect("scenario completes");
    let endpoint = proxy.telemetry_endpoint().expect("endpoint available");

    scrape(endpoint).await.expect("endpoint serves while alive");

    tokio::task::spawn_blocking(move || proxy.free())
        .await
        .expect("teardown completes");

    // Connection attempts after shutdown must fail.
    let result = reqwest::Client::builder()
        .timeout(Duration::from_millis(500))
        .build()
        .expect("client builds")
        .get(format!("http://{endpoint}/metrics"))
        .send()
        .await;
    assert!(result.is_err(), "exporter still reachable after free");
}
