// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Compute-host adapter clients.
//!
//! The adapter is the remote component that loads/builds runtime images,
//! executes closure code, and reports container stats on a compute host.
//! This module defines the client interface and the mock backend used for
//! embedded operation and deterministic tests.

/// Mock adapter backend with failure injection.
pub mod mock;

/// Adapter client trait and request/response types.
pub mod traits;

pub use mock::{FAILURE_EXPECTED_PROPERTY, MockAdapter};
pub use traits::{
    AdapterClient, AdapterError, Completion, ExecutionOutcome, ExecutionRequest, HostStats,
    ImageBuildRequest, ImageLoadRequest,
};
