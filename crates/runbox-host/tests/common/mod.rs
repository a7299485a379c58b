// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared test harness for runbox-host integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use runbox_core::{
    Closure, ClosureDescription, MemoryStore, ResourceConstraints, ResourceStore, RuntimeKind,
};
use runbox_host::adapter::{AdapterClient, MockAdapter};
use runbox_host::config::Config;
use runbox_host::handlers::AppState;
use runbox_host::orchestrator::ClosureOrchestrator;
use runbox_host::provision::ImageProvisioner;

/// Fully wired in-memory host with an injectable mock adapter.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub adapter: Arc<MockAdapter>,
    pub orchestrator: ClosureOrchestrator,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_adapter(MockAdapter::new(), Config::default())
    }

    pub fn with_adapter(adapter: MockAdapter, config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let adapter = Arc::new(adapter);
        let config = Arc::new(config);

        let dyn_store: Arc<dyn ResourceStore> = store.clone();
        let dyn_adapter: Arc<dyn AdapterClient> = adapter.clone();
        let provisioner = Arc::new(ImageProvisioner::new(dyn_adapter.clone(), config.clone()));
        let orchestrator = ClosureOrchestrator::new(dyn_store, dyn_adapter, provisioner, config);

        Self {
            store,
            adapter,
            orchestrator,
        }
    }

    pub fn app_state(&self) -> AppState {
        let store: Arc<dyn ResourceStore> = self.store.clone();
        AppState::new(store, self.orchestrator.clone())
    }

    pub async fn create_description(&self, description: ClosureDescription) -> ClosureDescription {
        self.store
            .create_description(description)
            .await
            .expect("Failed to create description")
    }

    pub async fn create_closure(&self, description_link: &str) -> Closure {
        self.store
            .create_closure(Closure::new(description_link))
            .await
            .expect("Failed to create closure")
    }

    pub async fn create_closure_with_properties(
        &self,
        description_link: &str,
        properties: HashMap<String, String>,
    ) -> Closure {
        self.store
            .create_closure(Closure::new(description_link).with_custom_properties(properties))
            .await
            .expect("Failed to create closure")
    }

    /// Wait for the closure to reach a terminal state via the store's
    /// watch primitive.
    pub async fn wait_for_terminal(&self, closure_id: &str) -> Closure {
        let mut rx = self
            .store
            .watch_closure(closure_id)
            .await
            .expect("Failed to watch closure");

        tokio::time::timeout(Duration::from_secs(10), async move {
            loop {
                let current = rx.borrow().clone();
                if current.state.is_terminal() {
                    return current;
                }
                rx.changed()
                    .await
                    .expect("Closure deleted before reaching a terminal state");
            }
        })
        .await
        .expect("Timed out waiting for a terminal state")
    }
}

/// Description mirroring the canonical JS fixture: a function incrementing
/// its input, assigned to a declared output.
pub fn js_description(timeout_seconds: u64) -> ClosureDescription {
    source_description(
        "function test(x) {print('Hello number: ' + x); return x + 1;} var b = 3; result = test(inputs.a);",
        &["result"],
        timeout_seconds,
    )
}

pub fn source_description(
    source: &str,
    output_names: &[&str],
    timeout_seconds: u64,
) -> ClosureDescription {
    ClosureDescription {
        id: String::new(),
        name: "test".to_string(),
        runtime: RuntimeKind::Nodejs,
        source: Some(source.to_string()),
        source_url: None,
        output_names: output_names.iter().map(|s| s.to_string()).collect(),
        resources: ResourceConstraints {
            timeout_seconds,
            ..ResourceConstraints::default()
        },
        custom_properties: HashMap::new(),
        created_at: chrono::Utc::now(),
    }
}

pub fn source_url_description(source_url: &str, timeout_seconds: u64) -> ClosureDescription {
    let mut description = source_description("", &["result"], timeout_seconds);
    description.source = None;
    description.source_url = Some(source_url.to_string());
    description
}
