// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory resource store backend.
//!
//! Reference [`ResourceStore`] implementation backed by hash maps. Used by
//! the embedded host binary and by tests; a replicated document store can
//! be slotted in behind the same trait.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{RwLock, watch};
use tracing::debug;

use super::{ClosureUpdate, ResourceStore, UpdateOutcome};
use crate::error::{CoreError, Result};
use crate::model::{Closure, ClosureDescription, ClosureState};

struct ClosureEntry {
    doc: Closure,
    notify: watch::Sender<Closure>,
}

impl ClosureEntry {
    fn publish(&mut self) {
        // Receivers may all be gone; that is fine.
        let _ = self.notify.send(self.doc.clone());
    }
}

/// In-memory store of closure documents.
#[derive(Default)]
pub struct MemoryStore {
    descriptions: RwLock<HashMap<String, ClosureDescription>>,
    closures: RwLock<HashMap<String, ClosureEntry>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of descriptions currently stored. Test/diagnostic helper.
    pub async fn description_count(&self) -> usize {
        self.descriptions.read().await.len()
    }

    /// Number of closures currently stored. Test/diagnostic helper.
    pub async fn closure_count(&self) -> usize {
        self.closures.read().await.len()
    }
}

fn assign_id(id: &str) -> String {
    if id.is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        id.to_string()
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn create_description(&self, mut desc: ClosureDescription) -> Result<ClosureDescription> {
        desc.validate()?;
        desc.id = assign_id(&desc.id);

        let mut descriptions = self.descriptions.write().await;
        if descriptions.contains_key(&desc.id) {
            return Err(CoreError::AlreadyExists {
                id: desc.id.clone(),
            });
        }
        descriptions.insert(desc.id.clone(), desc.clone());
        debug!(description_id = %desc.id, runtime = %desc.runtime, "Description created");
        Ok(desc)
    }

    async fn get_description(&self, id: &str) -> Result<Option<ClosureDescription>> {
        Ok(self.descriptions.read().await.get(id).cloned())
    }

    async fn delete_description(&self, id: &str) -> Result<bool> {
        Ok(self.descriptions.write().await.remove(id).is_some())
    }

    async fn create_closure(&self, mut closure: Closure) -> Result<Closure> {
        if closure.description_link.is_empty() {
            return Err(CoreError::ValidationError {
                field: "descriptionLink".to_string(),
                message: "descriptionLink is required".to_string(),
            });
        }
        closure.id = assign_id(&closure.id);

        let mut closures = self.closures.write().await;
        if closures.contains_key(&closure.id) {
            return Err(CoreError::AlreadyExists {
                id: closure.id.clone(),
            });
        }
        let (notify, _) = watch::channel(closure.clone());
        closures.insert(
            closure.id.clone(),
            ClosureEntry {
                doc: closure.clone(),
                notify,
            },
        );
        debug!(closure_id = %closure.id, "Closure created");
        Ok(closure)
    }

    async fn get_closure(&self, id: &str) -> Result<Option<Closure>> {
        Ok(self.closures.read().await.get(id).map(|e| e.doc.clone()))
    }

    async fn delete_closure(&self, id: &str) -> Result<bool> {
        // Dropping the entry drops the watch sender, closing subscriptions.
        Ok(self.closures.write().await.remove(id).is_some())
    }

    async fn update_closure_if(
        &self,
        id: &str,
        from: &[ClosureState],
        update: ClosureUpdate,
    ) -> Result<UpdateOutcome> {
        let mut closures = self.closures.write().await;
        let entry = closures
            .get_mut(id)
            .ok_or_else(|| CoreError::ClosureNotFound {
                closure_id: id.to_string(),
            })?;

        if !from.contains(&entry.doc.state) {
            debug!(
                closure_id = %id,
                state = %entry.doc.state,
                "Stale closure update discarded"
            );
            return Ok(UpdateOutcome::Stale(entry.doc.clone()));
        }

        if let Some(inputs) = update.inputs {
            entry.doc.inputs = inputs;
        }
        if let Some(outputs) = update.outputs {
            entry.doc.outputs = outputs;
        }
        if let Some(error_msg) = update.error_msg {
            entry.doc.error_msg = Some(error_msg);
        }
        if let Some(state) = update.state {
            entry.doc.state = state;
            if state == ClosureState::Started {
                entry.doc.started_at = Some(Utc::now());
            }
            if state.is_terminal() {
                entry.doc.finished_at = Some(Utc::now());
            }
        }
        entry.publish();
        Ok(UpdateOutcome::Applied(entry.doc.clone()))
    }

    async fn watch_closure(&self, id: &str) -> Result<watch::Receiver<Closure>> {
        let closures = self.closures.read().await;
        let entry = closures.get(id).ok_or_else(|| CoreError::ClosureNotFound {
            closure_id: id.to_string(),
        })?;
        Ok(entry.notify.subscribe())
    }
}
