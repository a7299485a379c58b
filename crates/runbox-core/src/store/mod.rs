//! Resource store interface and backends for runbox-core.
//!
//! This module defines the store abstraction the orchestrator runs against
//! and the in-memory reference backend. The store is the single source of
//! truth for closure state: terminal transitions go through the optimistic
//! [`ResourceStore::update_closure_if`] write, which rejects updates once
//! the persisted state has left the caller's expected set.

/// In-memory reference backend.
pub mod memory;

pub use self::memory::MemoryStore;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::error::Result;
use crate::model::{Closure, ClosureDescription, ClosureState};

/// A state-changing update to a closure document.
///
/// Timestamps are maintained by the store: entering `STARTED` records
/// `started_at`, entering a terminal state records `finished_at`.
#[derive(Debug, Clone, Default)]
pub struct ClosureUpdate {
    /// The state to transition to.
    pub state: Option<ClosureState>,
    /// Replace the recorded inputs.
    pub inputs: Option<Map<String, Value>>,
    /// Replace the recorded outputs.
    pub outputs: Option<Map<String, Value>>,
    /// Set the failure cause.
    pub error_msg: Option<String>,
}

impl ClosureUpdate {
    /// Update that transitions to `STARTED` recording the given inputs.
    pub fn started(inputs: Map<String, Value>) -> Self {
        Self {
            state: Some(ClosureState::Started),
            inputs: Some(inputs),
            ..Self::default()
        }
    }

    /// Update that transitions to `FINISHED` with the given outputs.
    pub fn finished(outputs: Map<String, Value>) -> Self {
        Self {
            state: Some(ClosureState::Finished),
            outputs: Some(outputs),
            ..Self::default()
        }
    }

    /// Update that transitions to `FAILED` with the given cause.
    pub fn failed(error_msg: impl Into<String>) -> Self {
        Self {
            state: Some(ClosureState::Failed),
            error_msg: Some(error_msg.into()),
            ..Self::default()
        }
    }
}

/// Outcome of an optimistic closure update.
#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    /// The update was applied; carries the updated document.
    Applied(Closure),
    /// The persisted state was no longer in the expected set; the update
    /// was discarded. Carries the current document.
    Stale(Closure),
}

impl UpdateOutcome {
    /// Whether the update was applied.
    pub fn is_applied(&self) -> bool {
        matches!(self, UpdateOutcome::Applied(_))
    }

    /// The current document, updated or not.
    pub fn into_closure(self) -> Closure {
        match self {
            UpdateOutcome::Applied(c) | UpdateOutcome::Stale(c) => c,
        }
    }
}

/// Durable store of closure documents.
///
/// Backends must provide read-modify-write with staleness detection for
/// closure state (first terminal writer wins) and a watch primitive for
/// observing state changes without polling.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Create a closure description. Validates the document and assigns an
    /// id when none is given. Fails with `ALREADY_EXISTS` on id collision.
    async fn create_description(&self, desc: ClosureDescription) -> Result<ClosureDescription>;

    /// Get a description by id.
    async fn get_description(&self, id: &str) -> Result<Option<ClosureDescription>>;

    /// Delete a description. Returns whether a document was removed.
    async fn delete_description(&self, id: &str) -> Result<bool>;

    /// Create a closure instance. Assigns an id when none is given.
    async fn create_closure(&self, closure: Closure) -> Result<Closure>;

    /// Get a closure by id.
    async fn get_closure(&self, id: &str) -> Result<Option<Closure>>;

    /// Delete a closure. Returns whether a document was removed.
    async fn delete_closure(&self, id: &str) -> Result<bool>;

    /// Optimistically update a closure.
    ///
    /// The update is applied only while the persisted state is still one of
    /// `from`; otherwise the write is discarded and the current document is
    /// returned as [`UpdateOutcome::Stale`]. This is the tie-break primitive:
    /// competing terminal writes resolve to whichever reached the store
    /// first, and late completions degrade to no-ops.
    async fn update_closure_if(
        &self,
        id: &str,
        from: &[ClosureState],
        update: ClosureUpdate,
    ) -> Result<UpdateOutcome>;

    /// Subscribe to changes of a closure document.
    ///
    /// The receiver yields the current document immediately and every
    /// subsequent update. The channel closes when the document is deleted.
    async fn watch_closure(&self, id: &str) -> Result<watch::Receiver<Closure>>;
}
