// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Adapter client trait definitions.
//!
//! Defines the abstract interface to the remote compute-host adapter: image
//! load/build, execution dispatch, and the stats/cancel side channel.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::oneshot;

use runbox_core::{ResourceConstraints, RuntimeKind};

/// Errors from adapter operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AdapterError {
    /// Image load from a registry failed.
    #[error("Image load failed: {0}")]
    ImageLoad(String),

    /// Image build from source failed.
    #[error("Image build failed: {0}")]
    ImageBuild(String),

    /// Execution request was rejected or lost.
    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    /// Stats could not be collected from the host.
    #[error("Stats unavailable: {0}")]
    Stats(String),

    /// The compute host could not be reached.
    #[error("Host unreachable: {0}")]
    Unreachable(String),
}

/// Result type for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Request to load (pull) a runtime image onto a compute host.
#[derive(Debug, Clone)]
pub struct ImageLoadRequest {
    /// Runtime kind the image must satisfy.
    pub runtime: RuntimeKind,
    /// Registry to pull from; `None` means the platform's own host.
    pub registry: Option<String>,
    /// Target compute host.
    pub placement: String,
    /// Properties forwarded from the closure/description (carries test
    /// injection flags for mock adapters).
    pub custom_properties: HashMap<String, String>,
}

/// Request to build a runtime image from source on a compute host.
#[derive(Debug, Clone)]
pub struct ImageBuildRequest {
    /// Runtime kind the image must satisfy.
    pub runtime: RuntimeKind,
    /// External source location, when building for a `sourceURL` closure.
    pub source_url: Option<String>,
    /// Target compute host.
    pub placement: String,
    /// Properties forwarded from the closure/description.
    pub custom_properties: HashMap<String, String>,
}

/// Request to execute a closure on a provisioned image.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    /// Execution id; equals the closure document id.
    pub execution_id: String,
    /// Provisioned image to run in.
    pub image_ref: String,
    /// Runtime kind of the image.
    pub runtime: RuntimeKind,
    /// Inline source to execute, when the description carries one.
    pub source: Option<String>,
    /// External source location, when the description carries one.
    pub source_url: Option<String>,
    /// Input values for the closure.
    pub inputs: Map<String, Value>,
    /// Declared output keys the worker is expected to assign.
    pub output_names: Vec<String>,
    /// Target compute host.
    pub placement: String,
    /// Resource limits for the sandbox.
    pub constraints: ResourceConstraints,
}

/// Asynchronous result of one execution attempt.
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    /// The worker finished; outputs are a subset of the declared names.
    Completed {
        /// Output values assigned by the closure code.
        outputs: Map<String, Value>,
    },
    /// The worker reported a runtime or script error.
    Failed {
        /// Human-readable failure cause.
        error: String,
    },
}

/// Completion handle for a dispatched execution.
///
/// Single-assignment: the adapter resolves it exactly once. A dropped
/// sender (adapter crash, lost connection) is observed as a receive error
/// and treated as a dispatch failure by the orchestrator.
pub type Completion = oneshot::Receiver<ExecutionOutcome>;

/// Point-in-time resource statistics for a compute host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostStats {
    /// The host the stats were collected from.
    pub placement: String,
    /// Number of executions currently in flight on the host.
    pub active_executions: u32,
    /// CPU usage percentage, when the host reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_usage_pct: Option<f64>,
    /// Memory usage in bytes, when the host reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_usage_bytes: Option<u64>,
    /// When the stats were collected.
    pub collected_at: DateTime<Utc>,
}

/// Client for the remote compute-host adapter.
///
/// One delivery attempt per call; retries are never performed here and the
/// orchestrator does not add any. Adapters are pure transports: they do not
/// touch the resource store.
#[async_trait]
pub trait AdapterClient: Send + Sync {
    /// Adapter type identifier (e.g. "docker", "mock").
    fn adapter_type(&self) -> &'static str;

    /// Load a runtime image, pulling from the given registry or from the
    /// platform's own host. Returns the resulting image reference.
    async fn load_image(&self, request: &ImageLoadRequest) -> Result<String>;

    /// Build a runtime image from source. Returns the resulting image
    /// reference.
    async fn build_image(&self, request: &ImageBuildRequest) -> Result<String>;

    /// Dispatch an execution to the compute host.
    ///
    /// Returns the completion handle for the asynchronous result. A
    /// returned error means the single delivery attempt failed.
    async fn dispatch(&self, request: ExecutionRequest) -> Result<Completion>;

    /// Read-only stats side channel, independent of the dispatch lifecycle.
    async fn fetch_stats(&self, placement: &str) -> Result<HostStats>;

    /// Best-effort cancellation signal for an in-flight execution.
    ///
    /// The outcome never affects an already-decided closure state; callers
    /// fire and forget.
    async fn cancel(&self, placement: &str, execution_id: &str) -> Result<()>;
}
