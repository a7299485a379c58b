// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mock adapter for testing.
//!
//! A simple adapter implementation that simulates image provisioning and
//! closure execution without a real compute host. Failure injection is
//! driven either by constructor knobs or by well-known custom properties
//! on the dispatched closure.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, oneshot};

use super::traits::*;

/// Custom property that makes the mock adapter fail image loads for a
/// closure, simulating an unreachable registry or a broken image.
pub const FAILURE_EXPECTED_PROPERTY: &str = "mock.image-load.failure";

/// Mock adapter for testing.
pub struct MockAdapter {
    /// Simulated execution time in milliseconds.
    pub execution_delay_ms: u64,
    /// If true, dispatch calls fail outright (network-level failure).
    pub fail_dispatch: bool,
    /// If true, dispatched executions complete with a worker-reported error.
    pub fail_executions: bool,
    /// If true, dispatched executions never complete on their own; resolve
    /// them manually via [`MockAdapter::complete_execution`]. Useful for
    /// testing timeout enforcement.
    pub never_complete: bool,
    /// If true, all image loads fail.
    pub fail_image_loads: bool,
    /// If true, all image builds fail (e.g. unreachable source URL).
    pub fail_image_builds: bool,

    scripted_outputs: Mutex<Option<Map<String, Value>>>,
    pending: Mutex<HashMap<String, oneshot::Sender<ExecutionOutcome>>>,
    cancels: Mutex<Vec<(String, String)>>,
    image_loads: Mutex<Vec<ImageLoadRequest>>,
    image_builds: Mutex<Vec<ImageBuildRequest>>,
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAdapter {
    /// Create a new mock adapter that completes executions successfully.
    pub fn new() -> Self {
        Self {
            execution_delay_ms: 10,
            fail_dispatch: false,
            fail_executions: false,
            never_complete: false,
            fail_image_loads: false,
            fail_image_builds: false,
            scripted_outputs: Mutex::new(None),
            pending: Mutex::new(HashMap::new()),
            cancels: Mutex::new(Vec::new()),
            image_loads: Mutex::new(Vec::new()),
            image_builds: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock adapter whose dispatch calls fail.
    pub fn failing_dispatch() -> Self {
        Self {
            fail_dispatch: true,
            ..Self::new()
        }
    }

    /// Create a mock adapter whose executions report a worker error.
    pub fn failing_executions() -> Self {
        Self {
            fail_executions: true,
            ..Self::new()
        }
    }

    /// Create a mock adapter whose executions never complete on their own.
    pub fn never_completing() -> Self {
        Self {
            execution_delay_ms: 0,
            never_complete: true,
            ..Self::new()
        }
    }

    /// Script the outputs delivered by subsequent completions.
    pub async fn script_outputs(&self, outputs: Map<String, Value>) {
        *self.scripted_outputs.lock().await = Some(outputs);
    }

    /// Resolve a pending execution manually. Returns false when no such
    /// execution is pending (e.g. it already completed).
    pub async fn complete_execution(&self, execution_id: &str, outcome: ExecutionOutcome) -> bool {
        let sender = self.pending.lock().await.remove(execution_id);
        match sender {
            Some(tx) => tx.send(outcome).is_ok(),
            None => false,
        }
    }

    /// Whether a cancel signal was received for the given execution.
    pub async fn cancelled(&self, execution_id: &str) -> bool {
        self.cancels
            .lock()
            .await
            .iter()
            .any(|(_, id)| id == execution_id)
    }

    /// Number of image load requests received.
    pub async fn image_load_count(&self) -> usize {
        self.image_loads.lock().await.len()
    }

    /// The most recent image load request, if any.
    pub async fn last_image_load(&self) -> Option<ImageLoadRequest> {
        self.image_loads.lock().await.last().cloned()
    }

    /// Number of image build requests received.
    pub async fn image_build_count(&self) -> usize {
        self.image_builds.lock().await.len()
    }

    async fn default_outcome(&self, request: &ExecutionRequest) -> ExecutionOutcome {
        if self.fail_executions {
            return ExecutionOutcome::Failed {
                error: "Mock execution failure".to_string(),
            };
        }
        if let Some(outputs) = self.scripted_outputs.lock().await.clone() {
            return ExecutionOutcome::Completed { outputs };
        }
        // Echo declared outputs from the inputs.
        let mut outputs = Map::new();
        for name in &request.output_names {
            outputs.insert(
                name.clone(),
                request.inputs.get(name).cloned().unwrap_or(Value::Null),
            );
        }
        ExecutionOutcome::Completed { outputs }
    }
}

#[async_trait]
impl AdapterClient for MockAdapter {
    fn adapter_type(&self) -> &'static str {
        "mock"
    }

    async fn load_image(&self, request: &ImageLoadRequest) -> Result<String> {
        self.image_loads.lock().await.push(request.clone());

        let injected = request
            .custom_properties
            .get(FAILURE_EXPECTED_PROPERTY)
            .is_some_and(|v| v == "true");
        if self.fail_image_loads || injected {
            return Err(AdapterError::ImageLoad(format!(
                "unable to load image for runtime '{}'",
                request.runtime
            )));
        }

        let registry = request.registry.as_deref().unwrap_or("local");
        Ok(format!("{}/runbox-{}", registry, request.runtime))
    }

    async fn build_image(&self, request: &ImageBuildRequest) -> Result<String> {
        self.image_builds.lock().await.push(request.clone());

        if self.fail_image_builds {
            let source = request.source_url.as_deref().unwrap_or("inline source");
            return Err(AdapterError::ImageBuild(format!(
                "unable to build image from {}",
                source
            )));
        }

        Ok(format!(
            "built/runbox-{}-{}",
            request.runtime,
            &uuid::Uuid::new_v4().to_string()[..8]
        ))
    }

    async fn dispatch(&self, request: ExecutionRequest) -> Result<Completion> {
        if self.fail_dispatch {
            return Err(AdapterError::Dispatch(
                "Mock dispatch failure".to_string(),
            ));
        }

        let (tx, rx) = oneshot::channel();

        if self.never_complete {
            // Keep the sender parked until complete_execution resolves it.
            self.pending
                .lock()
                .await
                .insert(request.execution_id.clone(), tx);
            return Ok(rx);
        }

        let outcome = self.default_outcome(&request).await;
        let delay = self.execution_delay_ms;
        tokio::spawn(async move {
            if delay > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            }
            let _ = tx.send(outcome);
        });

        Ok(rx)
    }

    async fn fetch_stats(&self, placement: &str) -> Result<HostStats> {
        Ok(HostStats {
            placement: placement.to_string(),
            active_executions: self.pending.lock().await.len() as u32,
            cpu_usage_pct: None,
            memory_usage_bytes: None,
            collected_at: Utc::now(),
        })
    }

    async fn cancel(&self, placement: &str, execution_id: &str) -> Result<()> {
        self.cancels
            .lock()
            .await
            .push((placement.to_string(), execution_id.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runbox_core::{ResourceConstraints, RuntimeKind};

    fn execution_request() -> ExecutionRequest {
        let mut inputs = Map::new();
        inputs.insert("a".to_string(), serde_json::json!(3));
        ExecutionRequest {
            execution_id: "exec-1".to_string(),
            image_ref: "local/runbox-nodejs".to_string(),
            runtime: RuntimeKind::Nodejs,
            source: Some("result = inputs.a;".to_string()),
            source_url: None,
            inputs,
            output_names: vec!["result".to_string()],
            placement: "local".to_string(),
            constraints: ResourceConstraints::default(),
        }
    }

    fn load_request() -> ImageLoadRequest {
        ImageLoadRequest {
            runtime: RuntimeKind::Nodejs,
            registry: None,
            placement: "local".to_string(),
            custom_properties: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_mock_dispatch_completes_with_echoed_outputs() {
        let adapter = MockAdapter::new();

        let completion = adapter.dispatch(execution_request()).await.unwrap();
        let outcome = completion.await.unwrap();

        match outcome {
            ExecutionOutcome::Completed { outputs } => {
                assert_eq!(outputs["result"], serde_json::Value::Null);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_mock_dispatch_scripted_outputs() {
        let adapter = MockAdapter::new();
        let mut outputs = Map::new();
        outputs.insert("result".to_string(), serde_json::json!(4));
        adapter.script_outputs(outputs).await;

        let completion = adapter.dispatch(execution_request()).await.unwrap();
        match completion.await.unwrap() {
            ExecutionOutcome::Completed { outputs } => {
                assert_eq!(outputs["result"], serde_json::json!(4));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_mock_dispatch_failure() {
        let adapter = MockAdapter::failing_dispatch();
        let result = adapter.dispatch(execution_request()).await;
        assert!(matches!(result, Err(AdapterError::Dispatch(_))));
    }

    #[tokio::test]
    async fn test_mock_never_completing_resolved_manually() {
        let adapter = MockAdapter::never_completing();

        let completion = adapter.dispatch(execution_request()).await.unwrap();

        assert!(
            adapter
                .complete_execution(
                    "exec-1",
                    ExecutionOutcome::Failed {
                        error: "boom".to_string()
                    }
                )
                .await
        );
        match completion.await.unwrap() {
            ExecutionOutcome::Failed { error } => assert_eq!(error, "boom"),
            other => panic!("unexpected outcome: {:?}", other),
        }
        // Second resolution finds nothing pending.
        assert!(
            !adapter
                .complete_execution(
                    "exec-1",
                    ExecutionOutcome::Completed {
                        outputs: Map::new()
                    }
                )
                .await
        );
    }

    #[tokio::test]
    async fn test_mock_image_load_failure_injection() {
        let adapter = MockAdapter::new();

        let mut request = load_request();
        assert!(adapter.load_image(&request).await.is_ok());

        request
            .custom_properties
            .insert(FAILURE_EXPECTED_PROPERTY.to_string(), "true".to_string());
        assert!(matches!(
            adapter.load_image(&request).await,
            Err(AdapterError::ImageLoad(_))
        ));
        assert_eq!(adapter.image_load_count().await, 2);
    }

    #[tokio::test]
    async fn test_mock_records_cancels() {
        let adapter = MockAdapter::new();
        adapter.cancel("local", "exec-9").await.unwrap();
        assert!(adapter.cancelled("exec-9").await);
        assert!(!adapter.cancelled("exec-0").await);
    }
}
