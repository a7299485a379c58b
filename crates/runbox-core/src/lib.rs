// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Runbox Core - Closure Resource Model
//!
//! This crate provides the document model and store abstraction for the
//! runbox closure execution platform: closure description templates,
//! closure execution instances, the durable resource store interface with
//! optimistic state writes, and the batch materializer used to turn one
//! multi-document submission into N resources atomically.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           runbox-host                                    │
//! │        (Orchestrator, Image Provisioner, Adapter, HTTP API)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      runbox-core (This Crate)                            │
//! │  ┌──────────────┐  ┌────────────────────┐  ┌──────────────────────┐     │
//! │  │    Model     │  │   ResourceStore    │  │  Batch Materializer  │     │
//! │  │ Descriptions │  │  CRUD + optimistic │  │  create-all-or-none  │     │
//! │  │  + Closures  │  │  writes + watch    │  │  with compensation   │     │
//! │  └──────────────┘  └────────────────────┘  └──────────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Closure State Machine
//!
//! ```text
//!      ┌─────────┐
//!      │ CREATED │─────────────────┐
//!      └────┬────┘                 │
//!           │ execute              │
//!           ▼                      │ delete
//!      ┌─────────┐                 │
//!      │ STARTED │────────────┐    │
//!      └────┬────┘            │    ▼
//!           │            fail │ ┌───────────┐
//!   complete│         timeout │ │ CANCELLED │
//!           ▼                 ▼ └───────────┘
//!      ┌──────────┐      ┌────────┐
//!      │ FINISHED │      │ FAILED │
//!      └──────────┘      └────────┘
//! ```
//!
//! Terminal transitions race (natural completion vs. timeout vs. delete);
//! the store's optimistic write resolves the race: the first writer to
//! persist a terminal state wins and later writes degrade to no-ops.
//!
//! # Modules
//!
//! - [`batch`]: Batch materializer with compensating deletes
//! - [`error`]: Error types with API error code mapping
//! - [`model`]: Closure description and instance documents
//! - [`store`]: Resource store trait and in-memory backend

#![deny(missing_docs)]

/// Batch materializer: all-or-nothing multi-document creation.
pub mod batch;

/// Error types for core operations with API error code mapping.
pub mod error;

/// Closure description and instance documents.
pub mod model;

/// Resource store trait and backends.
pub mod store;

pub use error::CoreError;
pub use model::{Closure, ClosureDescription, ClosureState, ResourceConstraints, RuntimeKind};
pub use store::{ClosureUpdate, MemoryStore, ResourceStore, UpdateOutcome};
