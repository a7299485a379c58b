// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

use std::collections::HashMap;
use std::net::SocketAddr;

use runbox_core::RuntimeKind;

/// Environment variable prefix for per-runtime image registry overrides.
///
/// The registry for a runtime kind is looked up as
/// `RUNBOX_IMAGE_REGISTRY_<RUNTIME>` (e.g. `RUNBOX_IMAGE_REGISTRY_NODEJS`).
/// When absent, images are pulled from the platform's own host.
pub const REGISTRY_ENV_PREFIX: &str = "RUNBOX_IMAGE_REGISTRY_";

/// Runbox host configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP API bind address
    pub bind_addr: SocketAddr,
    /// Placement used when neither description nor closure carries a hint
    pub default_placement: String,
    registries: HashMap<RuntimeKind, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            default_placement: "local".to_string(),
            registries: HashMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional (with defaults):
    /// - `RUNBOX_BIND_ADDR`: HTTP bind address (default: `0.0.0.0:8080`)
    /// - `RUNBOX_DEFAULT_PLACEMENT`: default execution placement (default: `local`)
    /// - `RUNBOX_IMAGE_REGISTRY_<RUNTIME>`: registry URL per runtime kind
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr: SocketAddr = std::env::var("RUNBOX_BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid("RUNBOX_BIND_ADDR", "must be a valid socket address")
            })?;

        let default_placement =
            std::env::var("RUNBOX_DEFAULT_PLACEMENT").unwrap_or_else(|_| "local".to_string());

        let mut registries = HashMap::new();
        for kind in RuntimeKind::ALL {
            let var = format!("{}{}", REGISTRY_ENV_PREFIX, kind.to_string().to_uppercase());
            if let Ok(url) = std::env::var(&var) {
                if !url.is_empty() {
                    registries.insert(kind, url);
                }
            }
        }

        Ok(Self {
            bind_addr,
            default_placement,
            registries,
        })
    }

    /// Configured registry URL for a runtime kind, if any.
    pub fn registry_for(&self, runtime: RuntimeKind) -> Option<&str> {
        self.registries.get(&runtime).map(String::as_str)
    }

    /// Set a registry URL for a runtime kind. Builder-style, used by
    /// embedders and tests.
    pub fn with_registry(mut self, runtime: RuntimeKind, url: impl Into<String>) -> Self {
        self.registries.insert(runtime, url.into());
        self
    }

    /// Set the default placement. Builder-style.
    pub fn with_default_placement(mut self, placement: impl Into<String>) -> Self {
        self.default_placement = placement.into();
        self
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
