//! The Gatepass node orchestrator.
//!
//! Opens the configured record store, wires the credential services over
//! it, and runs the HTTP API until shut down.

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use gatepass_credentials::{CredentialStore, MemoryStore};

use crate::config::{GatepassConfig, StorageBackend};
use crate::state::NodeState;
use crate::storage::RocksStore;

pub struct GatepassNode {
    config: GatepassConfig,
    state: Arc<NodeState>,
    /// Signals the API server to drain and stop.
    shutdown_tx: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<Result<()>>>,
    local_addr: Option<SocketAddr>,
}

impl GatepassNode {
    /// Create a node over the configured record store.
    pub fn new(config: GatepassConfig) -> Result<Self> {
        let store = Self::open_store(&config)?;
        let state = Arc::new(
            NodeState::new(store, config.validation.clone(), config.storage.backend)?
                .with_metrics_endpoint(config.metrics.enabled),
        );

        tracing::info!(
            backend = ?config.storage.backend,
            freshness_window_secs = config.validation.freshness_window_secs,
            enforce_freshness = config.validation.enforce_freshness,
            metrics = config.metrics.enabled,
            "Gatepass node created"
        );

        Ok(Self {
            config,
            state,
            shutdown_tx: None,
            server: None,
            local_addr: None,
        })
    }

    fn open_store(config: &GatepassConfig) -> Result<Arc<dyn CredentialStore>> {
        match config.storage.backend {
            StorageBackend::Memory => {
                tracing::warn!("using in-memory record store; records are lost on exit");
                Ok(Arc::new(MemoryStore::new()))
            }
            StorageBackend::RocksDb => {
                let store = RocksStore::open(&config.storage.data_dir)?;
                tracing::info!(path = %config.storage.data_dir.display(), "storage initialized");
                Ok(Arc::new(store))
            }
        }
    }

    /// Bind the API listener and start serving in the background.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        tracing::info!("starting Gatepass node");

        let listener = tokio::net::TcpListener::bind(self.config.api_addr()).await?;
        let local_addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let api_state = self.state.clone();
        let server = tokio::spawn(async move {
            crate::api::start_api_server(listener, api_state, async move {
                let _ = shutdown_rx.await;
            })
            .await
        });

        self.shutdown_tx = Some(shutdown_tx);
        self.server = Some(server);
        self.local_addr = Some(local_addr);
        Ok(local_addr)
    }

    /// Wait until the API server stops on its own.
    pub async fn run(&mut self) -> Result<()> {
        let server = self
            .server
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("node not started"))?;
        let result = server.await?;
        self.server = None;
        result
    }

    /// Gracefully shut down the node.
    pub async fn shutdown(&mut self) -> Result<()> {
        tracing::info!("shutting down Gatepass node");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(server) = self.server.take() {
            if let Err(e) = server.await? {
                tracing::error!(error = %e, "HTTP API server error");
            }
        }

        let metrics = self.state.scanner.metrics().snapshot();
        tracing::info!(
            scans = metrics.scans,
            granted = metrics.granted,
            denied = metrics.denied,
            infrastructure_errors = metrics.infrastructure_errors,
            log_failures = metrics.log_failures,
            "Gatepass node shut down"
        );
        Ok(())
    }

    pub fn state(&self) -> &Arc<NodeState> {
        &self.state
    }

    /// Address the API is bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}
