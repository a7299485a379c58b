// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Closure task orchestration.
//!
//! Owns the per-closure state machine: accepts an execution request,
//! provisions the runtime image, dispatches to the compute-host adapter,
//! waits for completion under the description's timeout, and finalizes the
//! closure document. All terminal writes go through the store's optimistic
//! update, so racing completions resolve to first-writer-wins and late
//! callbacks degrade to no-ops.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use runbox_core::store::{ClosureUpdate, UpdateOutcome};
use runbox_core::{Closure, ClosureDescription, ClosureState, CoreError, ResourceStore};

use crate::adapter::{AdapterClient, ExecutionOutcome, ExecutionRequest, HostStats};
use crate::config::Config;
use crate::error::{HostError, Result};
use crate::provision::{ImageProvisioner, ProvisionRequest};

/// Custom property carrying the placement (compute host) hint.
pub const PLACEMENT_PROPERTY: &str = "runbox.placement";

/// Custom property carrying a per-description registry override.
pub const REGISTRY_PROPERTY: &str = "runbox.registry";

/// Error message recorded when the execution timer fires first.
pub const TIMEOUT_ERROR_MSG: &str = "execution timeout";

/// States from which a terminal transition may still be taken.
const NON_TERMINAL: &[ClosureState] = &[ClosureState::Created, ClosureState::Started];

/// Orchestrates closure executions against the store and adapter.
///
/// Cheap to clone; clones share the underlying components.
#[derive(Clone)]
pub struct ClosureOrchestrator {
    store: Arc<dyn ResourceStore>,
    adapter: Arc<dyn AdapterClient>,
    provisioner: Arc<ImageProvisioner>,
    config: Arc<Config>,
}

impl ClosureOrchestrator {
    /// Create an orchestrator over the given components.
    pub fn new(
        store: Arc<dyn ResourceStore>,
        adapter: Arc<dyn AdapterClient>,
        provisioner: Arc<ImageProvisioner>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            store,
            adapter,
            provisioner,
            config,
        }
    }

    /// Accept an execution request for a closure in `CREATED` state.
    ///
    /// Validates that the closure exists, has not been started, and that
    /// its description still resolves; on any validation failure the
    /// closure is left untouched. On success the closure transitions to
    /// `STARTED`, a detached task drives the execution, and the `STARTED`
    /// snapshot is returned synchronously. The terminal state is observed
    /// via polling or the store's watch primitive.
    pub async fn execute(&self, closure_id: &str, inputs: Map<String, Value>) -> Result<Closure> {
        let closure = self
            .store
            .get_closure(closure_id)
            .await?
            .ok_or_else(|| CoreError::ClosureNotFound {
                closure_id: closure_id.to_string(),
            })?;

        if closure.state != ClosureState::Created {
            return Err(CoreError::InvalidState {
                closure_id: closure_id.to_string(),
                expected: ClosureState::Created.to_string(),
                actual: closure.state.to_string(),
            }
            .into());
        }

        let description = self
            .store
            .get_description(&closure.description_link)
            .await?
            .ok_or_else(|| CoreError::ValidationError {
                field: "descriptionLink".to_string(),
                message: format!(
                    "description '{}' cannot be resolved",
                    closure.description_link
                ),
            })?;

        // Extra input keys are stored as-is and ignored by the runtime;
        // missing keys pass through as unset.
        let outcome = self
            .store
            .update_closure_if(
                closure_id,
                &[ClosureState::Created],
                ClosureUpdate::started(inputs),
            )
            .await?;
        let started = match outcome {
            UpdateOutcome::Applied(c) => c,
            UpdateOutcome::Stale(current) => {
                // Lost a race with a concurrent execute or delete.
                return Err(CoreError::InvalidState {
                    closure_id: closure_id.to_string(),
                    expected: ClosureState::Created.to_string(),
                    actual: current.state.to_string(),
                }
                .into());
            }
        };

        info!(
            closure_id = %closure_id,
            runtime = %description.runtime,
            timeout_seconds = description.resources.timeout_seconds,
            "Closure execution accepted"
        );

        let orchestrator = self.clone();
        let snapshot = started.clone();
        tokio::spawn(async move {
            orchestrator.run(snapshot, description).await;
        });

        Ok(started)
    }

    /// Drive one closure execution to a terminal state.
    ///
    /// Provisioning always completes (success or failure) before dispatch
    /// is attempted; no dispatch is ever issued without a provisioned
    /// image. A single attempt each: neither step is retried.
    async fn run(&self, closure: Closure, description: ClosureDescription) {
        let closure_id = closure.id.clone();
        let timeout = Duration::from_secs(description.resources.timeout_seconds);
        let placement = self.resolve_placement(&closure, Some(&description));
        let custom_properties = merged_properties(&description, &closure);
        let registry_hint = custom_properties.get(REGISTRY_PROPERTY).cloned();

        let provisioned = match self
            .provisioner
            .provision(&ProvisionRequest {
                runtime: description.runtime,
                registry_hint,
                source_url: description.source_url.clone(),
                placement: placement.clone(),
                custom_properties,
            })
            .await
        {
            Ok(image) => image,
            Err(e) => {
                self.finalize_failed(&closure_id, e.to_string()).await;
                return;
            }
        };

        let request = ExecutionRequest {
            execution_id: closure_id.clone(),
            image_ref: provisioned.image_ref,
            runtime: description.runtime,
            source: description.source.clone(),
            source_url: description.source_url.clone(),
            inputs: closure.inputs.clone(),
            output_names: description.output_names.clone(),
            placement: placement.clone(),
            constraints: description.resources.clone(),
        };

        let completion = match self.adapter.dispatch(request).await {
            Ok(completion) => completion,
            Err(e) => {
                let cause = HostError::DispatchFailed(e.to_string());
                self.finalize_failed(&closure_id, cause.to_string()).await;
                return;
            }
        };

        tokio::select! {
            outcome = completion => match outcome {
                Ok(ExecutionOutcome::Completed { outputs }) => {
                    let outputs = retain_declared(outputs, &description.output_names);
                    self.finalize_finished(&closure_id, outputs).await;
                }
                Ok(ExecutionOutcome::Failed { error }) => {
                    self.finalize_failed(&closure_id, error).await;
                }
                Err(_) => {
                    self.finalize_failed(
                        &closure_id,
                        "adapter connection lost before completion".to_string(),
                    )
                    .await;
                }
            },
            _ = tokio::time::sleep(timeout) => {
                warn!(closure_id = %closure_id, "Execution timed out");
                self.finalize_failed(&closure_id, TIMEOUT_ERROR_MSG.to_string()).await;
                // Best-effort signal to the remote side; its outcome does
                // not affect the already-decided state.
                if let Err(e) = self.adapter.cancel(&placement, &closure_id).await {
                    debug!(closure_id = %closure_id, error = %e, "Cancel signal failed");
                }
            }
        }
    }

    /// Cancel any in-flight execution and remove the closure document.
    ///
    /// Returns whether a document was removed. No state transition is
    /// observable after the delete.
    pub async fn cancel_and_delete(&self, closure_id: &str) -> Result<bool> {
        let Some(closure) = self.store.get_closure(closure_id).await? else {
            return Ok(false);
        };

        if !closure.state.is_terminal() {
            info!(closure_id = %closure_id, state = %closure.state, "Cancelling closure");

            // Seal the document first so racing completions become no-ops.
            let _ = self
                .store
                .update_closure_if(
                    closure_id,
                    NON_TERMINAL,
                    ClosureUpdate {
                        state: Some(ClosureState::Cancelled),
                        ..ClosureUpdate::default()
                    },
                )
                .await;

            let description = self
                .store
                .get_description(&closure.description_link)
                .await
                .ok()
                .flatten();
            let placement = self.resolve_placement(&closure, description.as_ref());
            if let Err(e) = self.adapter.cancel(&placement, closure_id).await {
                debug!(closure_id = %closure_id, error = %e, "Best-effort cancel failed");
            }
        }

        Ok(self.store.delete_closure(closure_id).await?)
    }

    /// Fetch stats from the compute host the closure is placed on.
    pub async fn stats(&self, closure_id: &str) -> Result<HostStats> {
        let closure = self
            .store
            .get_closure(closure_id)
            .await?
            .ok_or_else(|| CoreError::ClosureNotFound {
                closure_id: closure_id.to_string(),
            })?;
        let description = self
            .store
            .get_description(&closure.description_link)
            .await?;
        let placement = self.resolve_placement(&closure, description.as_ref());

        self.adapter
            .fetch_stats(&placement)
            .await
            .map_err(|e| HostError::AdapterUnavailable(e.to_string()))
    }

    /// Resolve the execution placement: closure hint, then description
    /// hint, then the platform default.
    fn resolve_placement(
        &self,
        closure: &Closure,
        description: Option<&ClosureDescription>,
    ) -> String {
        closure
            .custom_properties
            .get(PLACEMENT_PROPERTY)
            .cloned()
            .or_else(|| {
                description.and_then(|d| d.custom_properties.get(PLACEMENT_PROPERTY).cloned())
            })
            .unwrap_or_else(|| self.config.default_placement.clone())
    }

    async fn finalize_finished(&self, closure_id: &str, outputs: Map<String, Value>) {
        match self
            .store
            .update_closure_if(closure_id, NON_TERMINAL, ClosureUpdate::finished(outputs))
            .await
        {
            Ok(UpdateOutcome::Applied(_)) => {
                info!(closure_id = %closure_id, "Closure finished");
            }
            Ok(UpdateOutcome::Stale(current)) => {
                debug!(
                    closure_id = %closure_id,
                    state = %current.state,
                    "Completion after terminal state ignored"
                );
            }
            Err(e) => {
                debug!(closure_id = %closure_id, error = %e, "Closure gone before completion");
            }
        }
    }

    async fn finalize_failed(&self, closure_id: &str, error_msg: String) {
        let error_msg = if error_msg.is_empty() {
            "execution failed".to_string()
        } else {
            error_msg
        };
        match self
            .store
            .update_closure_if(closure_id, NON_TERMINAL, ClosureUpdate::failed(error_msg.as_str()))
            .await
        {
            Ok(UpdateOutcome::Applied(_)) => {
                info!(closure_id = %closure_id, error = %error_msg, "Closure failed");
            }
            Ok(UpdateOutcome::Stale(current)) => {
                debug!(
                    closure_id = %closure_id,
                    state = %current.state,
                    "Failure after terminal state ignored"
                );
            }
            Err(e) => {
                debug!(closure_id = %closure_id, error = %e, "Closure gone before failure");
            }
        }
    }
}

/// Merge description and closure custom properties; closure entries win.
fn merged_properties(
    description: &ClosureDescription,
    closure: &Closure,
) -> HashMap<String, String> {
    let mut merged = description.custom_properties.clone();
    merged.extend(
        closure
            .custom_properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );
    merged
}

/// Keep only outputs the description declares.
fn retain_declared(mut outputs: Map<String, Value>, declared: &[String]) -> Map<String, Value> {
    outputs.retain(|key, _| declared.iter().any(|name| name == key));
    outputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MockAdapter;
    use runbox_core::MemoryStore;

    fn orchestrator(store: Arc<MemoryStore>) -> ClosureOrchestrator {
        let adapter: Arc<dyn AdapterClient> = Arc::new(MockAdapter::new());
        let config = Arc::new(Config::default());
        let provisioner = Arc::new(ImageProvisioner::new(adapter.clone(), config.clone()));
        ClosureOrchestrator::new(store, adapter, provisioner, config)
    }

    #[tokio::test]
    async fn test_execute_unknown_closure() {
        let orchestrator = orchestrator(Arc::new(MemoryStore::new()));
        let err = orchestrator.execute("missing", Map::new()).await.unwrap_err();
        assert_eq!(err.error_code(), "CLOSURE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_execute_with_dangling_description_leaves_closure_created() {
        let store = Arc::new(MemoryStore::new());
        let closure = store
            .create_closure(Closure::new("no-such-description"))
            .await
            .unwrap();
        let orchestrator = orchestrator(store.clone());

        let err = orchestrator
            .execute(&closure.id, Map::new())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");

        let unchanged = store.get_closure(&closure.id).await.unwrap().unwrap();
        assert_eq!(unchanged.state, ClosureState::Created);
    }

    #[test]
    fn test_retain_declared_drops_undeclared_outputs() {
        let mut outputs = Map::new();
        outputs.insert("result".to_string(), serde_json::json!(4));
        outputs.insert("scratch".to_string(), serde_json::json!("x"));

        let retained = retain_declared(outputs, &["result".to_string()]);

        assert_eq!(retained.len(), 1);
        assert_eq!(retained["result"], serde_json::json!(4));
    }
}
