// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP API handlers.
//!
//! Thin axum handlers over the store and orchestrator. Execution is
//! asynchronous by design: the execute handler acknowledges acceptance
//! synchronously and the terminal state is observed via GET.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use runbox_core::batch;
use runbox_core::{Closure, ClosureDescription, CoreError, ResourceStore};

use crate::adapter::HostStats;
use crate::error::HostError;
use crate::orchestrator::ClosureOrchestrator;

/// Shared state for HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Resource store holding descriptions and closures.
    pub store: Arc<dyn ResourceStore>,
    /// Orchestrator driving closure executions.
    pub orchestrator: ClosureOrchestrator,
}

impl AppState {
    /// Create handler state over the given components.
    pub fn new(store: Arc<dyn ResourceStore>, orchestrator: ClosureOrchestrator) -> Self {
        Self {
            store,
            orchestrator,
        }
    }
}

/// API error response carrier.
///
/// Maps the error taxonomy to HTTP statuses and a `{code, message}` body.
pub struct ApiError(HostError);

impl From<HostError> for ApiError {
    fn from(err: HostError) -> Self {
        ApiError(err)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError(HostError::Core(err))
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            HostError::Core(e) => match e {
                CoreError::ValidationError { .. } | CoreError::InvalidState { .. } => {
                    StatusCode::BAD_REQUEST
                }
                CoreError::DescriptionNotFound { .. } | CoreError::ClosureNotFound { .. } => {
                    StatusCode::NOT_FOUND
                }
                CoreError::AlreadyExists { .. } => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            HostError::AdapterUnavailable(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "code": self.0.error_code(),
            "message": self.0.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Fixed "ok" marker.
    pub status: &'static str,
}

/// `GET /health`
pub async fn healthcheck() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// ============================================================================
// Closure descriptions
// ============================================================================

/// `POST /closure-descriptions` - create an immutable description.
pub async fn create_description(
    State(state): State<AppState>,
    Json(description): Json<ClosureDescription>,
) -> ApiResult<Json<ClosureDescription>> {
    let created = state.store.create_description(description).await?;
    info!(description_id = %created.id, runtime = %created.runtime, "Description created");
    Ok(Json(created))
}

/// `GET /closure-descriptions/{id}`
pub async fn get_description(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ClosureDescription>> {
    let description = state
        .store
        .get_description(&id)
        .await?
        .ok_or(CoreError::DescriptionNotFound {
            description_link: id,
        })?;
    Ok(Json(description))
}

/// `DELETE /closure-descriptions/{id}`
pub async fn delete_description(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if !state.store.delete_description(&id).await? {
        return Err(CoreError::DescriptionNotFound {
            description_link: id,
        }
        .into());
    }
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /closure-descriptions/batch` - create all documents in a
/// `---`-separated payload, or none.
pub async fn create_descriptions_batch(
    State(state): State<AppState>,
    body: String,
) -> ApiResult<Json<Vec<String>>> {
    let documents = batch::split_documents(&body);
    if documents.is_empty() {
        return Err(CoreError::ValidationError {
            field: "body".to_string(),
            message: "body is required".to_string(),
        }
        .into());
    }

    let mut specs = Vec::with_capacity(documents.len());
    for (index, document) in documents.iter().enumerate() {
        let spec: ClosureDescription = serde_json::from_str(document).map_err(|e| {
            CoreError::ValidationError {
                field: format!("document[{}]", index),
                message: e.to_string(),
            }
        })?;
        specs.push(spec);
    }

    let links = batch::create_all(state.store.as_ref(), specs).await?;
    Ok(Json(links))
}

// ============================================================================
// Closures
// ============================================================================

/// Request to create a closure instance.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClosureRequest {
    /// Id of the description to execute. Required.
    #[serde(default)]
    pub description_link: String,
    /// Free-form properties attached to the closure.
    #[serde(default)]
    pub custom_properties: HashMap<String, String>,
}

/// `POST /closures` - create a closure in `CREATED` state.
pub async fn create_closure(
    State(state): State<AppState>,
    Json(request): Json<CreateClosureRequest>,
) -> ApiResult<Json<Closure>> {
    if request.description_link.is_empty() {
        return Err(CoreError::ValidationError {
            field: "descriptionLink".to_string(),
            message: "descriptionLink is required".to_string(),
        }
        .into());
    }
    if state
        .store
        .get_description(&request.description_link)
        .await?
        .is_none()
    {
        return Err(CoreError::ValidationError {
            field: "descriptionLink".to_string(),
            message: format!(
                "description '{}' cannot be resolved",
                request.description_link
            ),
        }
        .into());
    }

    let closure = Closure::new(request.description_link)
        .with_custom_properties(request.custom_properties);
    let created = state.store.create_closure(closure).await?;
    info!(closure_id = %created.id, "Closure created");
    Ok(Json(created))
}

/// Execution request posted to a closure's own address.
#[derive(Debug, Default, Deserialize)]
pub struct ExecuteClosureRequest {
    /// Input values for the closure code.
    #[serde(default)]
    pub inputs: Map<String, Value>,
}

/// `POST /closures/{id}` - request execution of a created closure.
///
/// The response is a synchronous acknowledgement snapshot; the terminal
/// state is observed via `GET /closures/{id}`.
pub async fn execute_closure(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ExecuteClosureRequest>,
) -> ApiResult<Json<Closure>> {
    let snapshot = state.orchestrator.execute(&id, request.inputs).await?;
    Ok(Json(snapshot))
}

/// `GET /closures/{id}`
pub async fn get_closure(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Closure>> {
    let closure = state
        .store
        .get_closure(&id)
        .await?
        .ok_or(CoreError::ClosureNotFound { closure_id: id })?;
    Ok(Json(closure))
}

/// `GET /closures/{id}/stats` - stats side channel for the closure's host.
pub async fn closure_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<HostStats>> {
    let stats = state.orchestrator.stats(&id).await?;
    Ok(Json(stats))
}

/// `DELETE /closures/{id}` - cancel any in-flight execution and delete.
pub async fn delete_closure(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if !state.orchestrator.cancel_and_delete(&id).await? {
        return Err(CoreError::ClosureNotFound { closure_id: id }.into());
    }
    Ok(StatusCode::NO_CONTENT)
}
