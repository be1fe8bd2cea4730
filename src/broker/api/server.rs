//! Broker API server
//!
//! Wraps the OSB router with basic-auth enforcement and request tracing and
//! runs it until shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use tower_http::validate_request::ValidateRequestHeaderLayer;
use tracing::info;

use super::rest::OsbRouter;
use crate::catalog::Service;
use crate::domain::ports::ServiceLifecycleRef;
use crate::error::{Error, Result};

// =============================================================================
// Server Configuration
// =============================================================================

/// Configuration for the broker API server
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Bind address
    pub addr: SocketAddr,
    /// Username the platform must present
    pub broker_username: String,
    /// Password the platform must present
    pub broker_password: String,
}

// =============================================================================
// API Server
// =============================================================================

/// The broker's HTTP front end
pub struct ApiServer {
    config: ApiServerConfig,
    lifecycle: ServiceLifecycleRef,
    catalog: Arc<Vec<Service>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ApiServer {
    pub fn new(
        config: ApiServerConfig,
        lifecycle: ServiceLifecycleRef,
        catalog: Arc<Vec<Service>>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            lifecycle,
            catalog,
            shutdown_tx,
        }
    }

    /// Serve until shutdown is triggered
    pub async fn run(&self) -> Result<()> {
        let router = OsbRouter::new(self.lifecycle.clone(), self.catalog.clone())
            .build()
            .layer(ValidateRequestHeaderLayer::basic(
                &self.config.broker_username,
                &self.config.broker_password,
            ))
            .layer(TraceLayer::new_for_http());

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        info!("Broker API listening on {}", self.config.addr);

        let listener = tokio::net::TcpListener::bind(self.config.addr)
            .await
            .map_err(|e| {
                Error::Configuration(format!("failed to bind {}: {}", self.config.addr, e))
            })?;

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("Broker API shutting down");
            })
            .await
            .map_err(|e| Error::Configuration(format!("broker API server error: {}", e)))?;

        Ok(())
    }

    /// Trigger graceful shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}
