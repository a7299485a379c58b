// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Batch materialization of closure descriptions.
//!
//! Turns one multi-document submission into N created resources, all or
//! nothing: creations run concurrently, and when any of them fails the
//! successfully created subset is compensated away with deletes before a
//! single aggregate error is reported. Compensation failures are logged
//! and never mask the primary error.

use futures::future::join_all;
use tracing::{info, warn};

use crate::error::{CoreError, Result};
use crate::model::ClosureDescription;
use crate::store::ResourceStore;

/// Delimiter line separating documents in a multi-document payload.
pub const DOCUMENT_DELIMITER: &str = "---";

/// Split a raw multi-document payload into individual documents.
///
/// Documents are separated by lines consisting of [`DOCUMENT_DELIMITER`];
/// empty fragments are dropped.
pub fn split_documents(body: &str) -> Vec<String> {
    let mut documents = Vec::new();
    let mut current = String::new();
    for line in body.lines() {
        if line.trim() == DOCUMENT_DELIMITER {
            if !current.trim().is_empty() {
                documents.push(current.trim().to_string());
            }
            current.clear();
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    if !current.trim().is_empty() {
        documents.push(current.trim().to_string());
    }
    documents
}

/// Create all descriptions, or none.
///
/// Creations are issued concurrently and joined. On success the created ids
/// are returned in input order. If any creation fails, the subset that did
/// succeed is deleted (also concurrently) and the caller receives a single
/// `CREATE_FAILED` error; repeated calls are not deduplicated.
pub async fn create_all<S>(store: &S, specs: Vec<ClosureDescription>) -> Result<Vec<String>>
where
    S: ResourceStore + ?Sized,
{
    let results = join_all(
        specs
            .into_iter()
            .map(|spec| store.create_description(spec)),
    )
    .await;

    let mut created = Vec::new();
    let mut first_error: Option<CoreError> = None;
    for result in results {
        match result {
            Ok(desc) => created.push(desc.id),
            Err(e) => {
                warn!(error = %e, "Failed to create closure description");
                first_error.get_or_insert(e);
            }
        }
    }

    let Some(error) = first_error else {
        info!(count = created.len(), "Batch creation completed");
        return Ok(created);
    };

    if !created.is_empty() {
        warn!(
            count = created.len(),
            "Cleaning successfully created closure descriptions"
        );
        let deletions = join_all(created.iter().map(|id| store.delete_description(id))).await;
        for (id, deletion) in created.iter().zip(deletions) {
            if let Err(e) = deletion {
                // Orphaned document; left for external reconciliation.
                warn!(description_id = %id, error = %e, "Compensating delete failed");
            }
        }
    }

    Err(CoreError::CreateFailed {
        message: error.to_string(),
    })
}
