// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Runbox Host - Closure Execution Orchestration
//!
//! This crate provides the control plane for executing closures: image
//! provisioning, dispatch to the compute-host adapter, per-closure task
//! orchestration under timeouts, and the HTTP document API.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          External Clients                                │
//! │                        (HTTP document API)                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     runbox-host (This Crate)                             │
//! │  ┌─────────────┐  ┌──────────────┐  ┌─────────────┐  ┌──────────────┐   │
//! │  │   Image     │  │   Closure    │  │   Batch     │  │   Adapter    │   │
//! │  │ Provisioner │  │ Orchestrator │  │ Endpoint    │  │   Client     │   │
//! │  └─────────────┘  └──────────────┘  └─────────────┘  └──────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//!           │                 │                                │
//!           │ load/build      │ persist state                  │ dispatch
//!           ▼                 ▼                                ▼
//! ┌───────────────────┐ ┌───────────────────┐      ┌─────────────────────────┐
//! │  Image Registry   │ │   Resource Store  │      │   Compute-Host Adapter  │
//! │  (per runtime)    │ │   (runbox-core)   │      │   (sandboxed workers)   │
//! └───────────────────┘ └───────────────────┘      └─────────────────────────┘
//! ```
//!
//! # HTTP API
//!
//! | Operation | Description |
//! |-----------|-------------|
//! | `POST /closure-descriptions` | Create an immutable description template |
//! | `POST /closure-descriptions/batch` | Create all documents of a `---`-separated payload, or none |
//! | `GET/DELETE /closure-descriptions/{id}` | Read or delete a description |
//! | `POST /closures` | Create a closure instance in `CREATED` state |
//! | `POST /closures/{id}` | Request execution; synchronous acknowledgement only |
//! | `GET /closures/{id}` | Read the closure, including `state`, `outputs`, `errorMsg` |
//! | `GET /closures/{id}/stats` | Stats side channel for the closure's compute host |
//! | `DELETE /closures/{id}` | Cancel any in-flight execution and delete |
//! | `GET /health` | Server health |
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
//! Within one closure, provisioning always completes before dispatch is
//! attempted, and neither step is retried: a provisioning or dispatch
//! failure is terminal for that execution attempt. When a timeout and a
//! legitimate completion race, the first transition to reach the store
//! wins; the loser degrades to a no-op.
//!
//! # Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `RUNBOX_BIND_ADDR` | No | `0.0.0.0:8080` | HTTP API bind address |
//! | `RUNBOX_DEFAULT_PLACEMENT` | No | `local` | Placement when no hint is given |
//! | `RUNBOX_IMAGE_REGISTRY_<RUNTIME>` | No | - | Registry URL per runtime kind |
//!
//! # Modules
//!
//! - [`adapter`]: Compute-host adapter clients (trait + mock backend)
//! - [`config`]: Server configuration from environment variables
//! - [`error`]: Error types for host operations
//! - [`handlers`]: HTTP API handlers
//! - [`orchestrator`]: Per-closure task orchestration
//! - [`provision`]: Image provisioning (pull/build decision, image cache)
//! - [`server`]: HTTP server wiring

#![deny(missing_docs)]

/// Compute-host adapter clients.
pub mod adapter;

/// Server configuration loaded from environment variables.
pub mod config;

/// Error types for host operations.
pub mod error;

/// HTTP API handlers.
pub mod handlers;

/// Per-closure task orchestration.
pub mod orchestrator;

/// Image provisioning.
pub mod provision;

/// HTTP server wiring.
pub mod server;

pub use config::Config;
pub use error::HostError;
pub use orchestrator::ClosureOrchestrator;
