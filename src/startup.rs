//! Exposition server lifecycle.
//!
//! [`MetricsServer`] serves the scrape endpoint from a background task;
//! [`run`] wires configuration, registry and server together for the binary.

use std::net::SocketAddr;
use std::sync::{Arc, Weak};
use std::time::Instant;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::ConfigV1;
use crate::error::MetricsError;
use crate::labels::Labels;
use crate::metrics::MetricRegistry;
use crate::query::QueryService;
use crate::routes;
use crate::state::AppState;

struct Running {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// HTTP listener exposing a registry at `/metrics`.
pub struct MetricsServer {
    state: AppState,
    running: Option<Running>,
}

impl MetricsServer {
    pub fn new(config: Arc<ConfigV1>, registry: Arc<MetricRegistry>) -> Self {
        Self {
            state: AppState { config, registry },
            running: None,
        }
    }

    /// Binds the configured address and starts serving in the background.
    ///
    /// Returns the bound address, which differs from the configured one when
    /// port 0 was requested. Calling it again while running is a no-op.
    pub async fn listen(&mut self) -> std::io::Result<SocketAddr> {
        if let Some(running) = &self.running {
            return Ok(running.local_addr);
        }

        let listener = TcpListener::bind(&self.state.config.server.bind_address).await?;
        let local_addr = listener.local_addr()?;
        let app = routes::create_router(self.state.clone());
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    // A dropped sender also stops the server.
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = served {
                error!(
                    event_name = "server.failed",
                    event_domain = "server",
                    "metrics server stopped with error: {}",
                    e
                );
            }
        });

        info!(
            event_name = "server.listening",
            event_domain = "server",
            address = %local_addr,
            "metrics server listening"
        );
        self.running = Some(Running {
            local_addr,
            shutdown,
            task,
        });
        Ok(local_addr)
    }

    /// Stops accepting connections and waits for in-flight requests to finish.
    pub async fn stop_listen(&mut self) -> std::io::Result<()> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };
        let _ = running.shutdown.send(());
        running.task.await.map_err(std::io::Error::other)?;
        info!(
            event_name = "server.stopped",
            event_domain = "server",
            "metrics server stopped"
        );
        Ok(())
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|running| running.local_addr)
    }

    pub fn registry(&self) -> &Arc<MetricRegistry> {
        &self.state.registry
    }
}

/// Registers collectors describing the facility itself.
pub fn register_self_metrics(registry: &Arc<MetricRegistry>) -> Result<(), MetricsError> {
    let weak: Weak<MetricRegistry> = Arc::downgrade(registry);
    registry.register_collector(
        "prometrics_registered_metrics",
        Labels::new(),
        "Number of metric handles currently registered",
        move |_| weak.upgrade().map_or(0.0, |registry| registry.len() as f64),
    )?;

    let started = Instant::now();
    registry.register_collector(
        "prometrics_uptime_seconds",
        Labels::new(),
        "Seconds since the metrics facility started",
        move |_| started.elapsed().as_secs_f64(),
    )?;
    Ok(())
}

/// Initializes and runs the metrics server until a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error if the server fails to bind to the configured address
/// or the self-describing metrics cannot be registered, or when the query
/// client is configured with an invalid address.
pub async fn run(config: Arc<ConfigV1>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(query) = &config.query {
        // Fail fast on an unusable Prometheus address.
        QueryService::new(query)?;
    }

    let registry = Arc::new(MetricRegistry::new());
    register_self_metrics(&registry)?;

    let mut server = MetricsServer::new(config, registry);
    server.listen().await?;

    shutdown_signal().await;
    server.stop_listen().await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("signal received, starting graceful shutdown");
}
