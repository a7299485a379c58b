// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for runbox-host.

use thiserror::Error;

/// Host errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HostError {
    /// Configuration loading failed.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Core store operation failed.
    #[error(transparent)]
    Core(#[from] runbox_core::CoreError),

    /// Image pull or build failed. Not retried; the closure fails.
    #[error("Image provisioning failed: {0}")]
    ProvisionFailed(String),

    /// Remote adapter rejected or lost the execution request.
    #[error("Execution dispatch failed: {0}")]
    DispatchFailed(String),

    /// Adapter side channel (stats, cancel) could not be reached.
    #[error("Adapter unavailable: {0}")]
    AdapterUnavailable(String),
}

impl HostError {
    /// Get the error code string for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Core(e) => e.error_code(),
            Self::ProvisionFailed(_) => "PROVISION_FAILED",
            Self::DispatchFailed(_) => "DISPATCH_FAILED",
            Self::AdapterUnavailable(_) => "ADAPTER_UNAVAILABLE",
        }
    }
}

/// Result type using HostError.
pub type Result<T> = std::result::Result<T, HostError>;
