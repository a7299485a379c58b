// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP server wiring.

use std::net::SocketAddr;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers::{
    AppState, closure_stats, create_closure, create_description, create_descriptions_batch,
    delete_closure, delete_description, execute_closure, get_closure, get_description,
    healthcheck,
};

/// Build the API router over the given state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/closure-descriptions", post(create_description))
        .route("/closure-descriptions/batch", post(create_descriptions_batch))
        .route(
            "/closure-descriptions/{id}",
            get(get_description).delete(delete_description),
        )
        .route("/closures", post(create_closure))
        .route(
            "/closures/{id}",
            post(execute_closure).get(get_closure).delete(delete_closure),
        )
        .route("/closures/{id}/stats", get(closure_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API on the given address until the task is aborted.
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "HTTP server listening");
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
