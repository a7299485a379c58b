// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Runbox Host - Closure Execution Server
//!
//! An HTTP server responsible for:
//! - Closure description documents (create, read, delete, batch create)
//! - Closure lifecycle (create, execute, observe, cancel)
//! - Image provisioning and dispatch to the compute-host adapter

use std::sync::Arc;

use tracing::{info, warn};

use runbox_core::MemoryStore;
use runbox_host::adapter::{AdapterClient, MockAdapter};
use runbox_host::config::Config;
use runbox_host::handlers::AppState;
use runbox_host::orchestrator::ClosureOrchestrator;
use runbox_host::provision::ImageProvisioner;
use runbox_host::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "runbox_host=info".into()),
        )
        .init();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    // Load configuration
    let config = Arc::new(Config::from_env()?);

    info!(
        bind_addr = %config.bind_addr,
        default_placement = %config.default_placement,
        "Starting Runbox Host"
    );

    // Embedded store backend; a replicated document store plugs in behind
    // the same trait.
    let store: Arc<dyn runbox_core::ResourceStore> = Arc::new(MemoryStore::new());

    // Loopback adapter; a remote compute-host adapter plugs in behind the
    // same trait.
    let adapter: Arc<dyn AdapterClient> = Arc::new(MockAdapter::new());
    info!(adapter_type = adapter.adapter_type(), "Adapter initialized");

    let provisioner = Arc::new(ImageProvisioner::new(adapter.clone(), config.clone()));
    let orchestrator =
        ClosureOrchestrator::new(store.clone(), adapter, provisioner, config.clone());
    let state = AppState::new(store, orchestrator);

    let bind_addr = config.bind_addr;
    let server_handle = tokio::spawn(server::serve(bind_addr, state));

    info!(addr = %bind_addr, "Runbox Host ready");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    server_handle.abort();

    info!("Runbox Host shut down");

    Ok(())
}
