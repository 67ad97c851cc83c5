//! ---
//! sp_section: "04-telemetry-export"
//! sp_subsection: "module"
//! sp_type: "source"
//! sp_scope: "code"
//! sp_description: "Telemetry queue, worker, and scrape endpoint."
//! sp_version: "v0.0.0-prealpha"
//! sp_owner: "tbd"
//! ---
use std::net::{SocketAddr, TcpListener as StdTcpListener};

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, StatusCode};
use axum::routing::get;
use axum::{response::IntoResponse, Router};
use prometheus::{TextEncoder, TEXT_FORMAT};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::metrics::SharedRegistry;

/// Spawn an HTTP server exposing the registry at `/metrics`.
///
/// Must be called from within a tokio runtime context. The listener is
/// bound synchronously so bind failures surface to the caller and the
/// effective address (relevant when requesting port 0) is known
/// immediately.
pub fn spawn_exporter(registry: SharedRegistry, addr: SocketAddr) -> Result<Exporter> {
    let app = Router::new().route(
        "/metrics",
        get({
            let registry = registry.clone();
            move || scrape_handler(registry.clone())
        }),
    );

    let std_listener = StdTcpListener::bind(addr)
        .with_context(|| format!("failed to bind telemetry listener {}", addr))?;
    let local_addr = std_listener
        .local_addr()
        .context("failed to read telemetry listener address")?;
    std_listener
        .set_nonblocking(true)
        .context("failed to configure telemetry listener as non-blocking")?;
    let listener = TcpListener::from_std(std_listener)
        .context("failed to convert std listener into tokio listener")?;

    info!(address = %local_addr, "telemetry exporter starting");

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let service = app.into_make_service();
    let task: JoinHandle<Result<()>> = tokio::spawn(async move {
        axum::serve(listener, service)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
            .context("telemetry exporter encountered an error")?;
        Ok(())
    });

    Ok(Exporter {
        addr: local_addr,
        shutdown: Some(shutdown_tx),
        task,
    })
}

/// Prometheus scrape endpoint.
async fn scrape_handler(registry: SharedRegistry) -> impl IntoResponse {
    let families = registry.gather();
    let encoder = TextEncoder::new();
    match encoder.encode_to_string(&families) {
        Ok(body) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static(TEXT_FORMAT),
            )],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                String::from("metrics encoding error"),
            )
                .into_response()
        }
    }
}

/// Handle to the running scrape endpoint.
#[derive(Debug)]
pub struct Exporter {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl Exporter {
    /// The bound address, with any ephemeral port resolved.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signal shutdown and await task completion.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match (&mut self.task).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(err),
            Err(join_err) => Err(anyhow::Error::new(join_err)),
        }
    }

    /// Signal shutdown without waiting for the server task to finish.
    pub fn signal_shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
