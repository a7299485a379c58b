// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Closure resource model.
//!
//! Defines the two document kinds managed by runbox: the immutable
//! [`ClosureDescription`] template and the mutable [`Closure`] execution
//! instance, together with their wire representation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

/// Sandboxed runtime used to execute a closure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    /// Interpreted JavaScript (node).
    #[default]
    Nodejs,
    /// Interpreted Python.
    Python,
    /// Interpreted PowerShell.
    Powershell,
}

impl RuntimeKind {
    /// All known runtime kinds, used for configuration scans.
    pub const ALL: [RuntimeKind; 3] = [
        RuntimeKind::Nodejs,
        RuntimeKind::Python,
        RuntimeKind::Powershell,
    ];
}

impl std::fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeKind::Nodejs => write!(f, "nodejs"),
            RuntimeKind::Python => write!(f, "python"),
            RuntimeKind::Powershell => write!(f, "powershell"),
        }
    }
}

impl std::str::FromStr for RuntimeKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nodejs" => Ok(RuntimeKind::Nodejs),
            "python" => Ok(RuntimeKind::Python),
            "powershell" => Ok(RuntimeKind::Powershell),
            _ => Err(format!("Unknown runtime kind: {}", s)),
        }
    }
}

/// Execution state of a [`Closure`].
///
/// Transitions are monotonic: `CREATED -> STARTED -> {FINISHED | FAILED}`,
/// with `CANCELLED` reachable from any non-terminal state via an explicit
/// delete. Terminal states are never left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClosureState {
    /// Document exists, execution not yet requested.
    #[default]
    Created,
    /// Execution request accepted; provisioning/dispatch in flight.
    Started,
    /// Execution completed successfully; outputs populated.
    Finished,
    /// Execution failed; `error_msg` populated.
    Failed,
    /// Execution cancelled before natural completion.
    Cancelled,
}

impl ClosureState {
    /// Whether this state is terminal (no further transitions allowed).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ClosureState::Finished | ClosureState::Failed | ClosureState::Cancelled
        )
    }

    /// Returns the wire representation of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClosureState::Created => "CREATED",
            ClosureState::Started => "STARTED",
            ClosureState::Finished => "FINISHED",
            ClosureState::Failed => "FAILED",
            ClosureState::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for ClosureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource limits applied to a single closure execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceConstraints {
    /// Execution timeout in seconds. Must be positive.
    pub timeout_seconds: u64,
    /// CPU shares granted to the sandbox.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_shares: Option<u32>,
    /// Memory limit in megabytes.
    #[serde(default, rename = "ramMB", skip_serializing_if = "Option::is_none")]
    pub ram_mb: Option<u64>,
}

/// Default execution timeout when a description does not set one.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

impl Default for ResourceConstraints {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            cpu_shares: None,
            ram_mb: None,
        }
    }
}

/// Immutable closure template: code, runtime kind, and resource limits.
///
/// Created once via the description factory and referenced by any number of
/// [`Closure`] instances. Exactly one of `source` / `source_url` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosureDescription {
    /// Unique document id. Assigned by the store when left empty.
    #[serde(default)]
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Sandboxed runtime to execute in.
    pub runtime: RuntimeKind,
    /// Inline source code. Mutually exclusive with `source_url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// External source location, triggering an image build.
    /// Mutually exclusive with `source`.
    #[serde(default, rename = "sourceURL", skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Declared output keys, in order.
    #[serde(default)]
    pub output_names: Vec<String>,
    /// Resource limits for each execution of this description.
    #[serde(default, rename = "resourceConstraints")]
    pub resources: ResourceConstraints,
    /// Free-form properties. May carry a placement or registry hint.
    #[serde(default)]
    pub custom_properties: HashMap<String, String>,
    /// When the description was created.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl ClosureDescription {
    /// Validate the description invariants.
    ///
    /// Exactly one of `source` / `source_url` must be set, the name must be
    /// non-empty, and the timeout must be positive.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.is_empty() {
            return Err(CoreError::ValidationError {
                field: "name".to_string(),
                message: "name is required".to_string(),
            });
        }
        match (&self.source, &self.source_url) {
            (Some(_), Some(_)) => Err(CoreError::ValidationError {
                field: "source".to_string(),
                message: "source and sourceURL are mutually exclusive".to_string(),
            }),
            (None, None) => Err(CoreError::ValidationError {
                field: "source".to_string(),
                message: "either source or sourceURL is required".to_string(),
            }),
            _ => Ok(()),
        }?;
        if self.resources.timeout_seconds == 0 {
            return Err(CoreError::ValidationError {
                field: "resourceConstraints.timeoutSeconds".to_string(),
                message: "timeout must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Mutable closure execution instance.
///
/// References a [`ClosureDescription`] (read-only after creation) and moves
/// through the [`ClosureState`] machine exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Closure {
    /// Unique document id. Assigned by the store when left empty.
    #[serde(default)]
    pub id: String,
    /// Id of the description this closure executes. Required.
    pub description_link: String,
    /// Input values recorded when execution was requested.
    #[serde(default)]
    pub inputs: Map<String, Value>,
    /// Output values, empty until the closure reaches `FINISHED`.
    #[serde(default)]
    pub outputs: Map<String, Value>,
    /// Current execution state.
    #[serde(default)]
    pub state: ClosureState,
    /// Failure cause. Set iff `state == FAILED`, always non-empty then.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
    /// Free-form properties. May carry a placement hint or test injection.
    #[serde(default)]
    pub custom_properties: HashMap<String, String>,
    /// When the closure document was created.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// When execution was dispatched (entered `STARTED`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When the closure reached a terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Closure {
    /// Create a new closure in `CREATED` state for the given description.
    pub fn new(description_link: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            description_link: description_link.into(),
            inputs: Map::new(),
            outputs: Map::new(),
            state: ClosureState::Created,
            error_msg: None,
            custom_properties: HashMap::new(),
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Attach custom properties to the closure.
    pub fn with_custom_properties(mut self, properties: HashMap<String, String>) -> Self {
        self.custom_properties = properties;
        self
    }
}
