// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Image provisioning.
//!
//! Decides whether a runtime image already exists on the target host
//! (cache hit), must be pulled from a registry, or must be built from
//! source, and issues the corresponding adapter request. Provisioning
//! failures are reported to the caller and never retried here.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use runbox_core::RuntimeKind;

use crate::adapter::{AdapterClient, ImageBuildRequest, ImageLoadRequest};
use crate::config::Config;
use crate::error::{HostError, Result};

/// Request to provision a runtime image.
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    /// Runtime kind the image must satisfy.
    pub runtime: RuntimeKind,
    /// Explicit registry override; falls back to the configuration lookup.
    pub registry_hint: Option<String>,
    /// External source location; forces the build path when present.
    pub source_url: Option<String>,
    /// Target compute host.
    pub placement: String,
    /// Properties forwarded to the adapter.
    pub custom_properties: HashMap<String, String>,
}

/// A provisioned (or cached) runtime image.
#[derive(Debug, Clone)]
pub struct ProvisionedImage {
    /// Image reference usable in an execution request.
    pub image_ref: String,
    /// Whether an already-provisioned image was reused.
    pub reused: bool,
}

/// Provisions runtime images through the compute-host adapter.
///
/// Successfully provisioned images are cached per (runtime kind, placement)
/// so later closures targeting the same runtime reuse them.
pub struct ImageProvisioner {
    adapter: Arc<dyn AdapterClient>,
    config: Arc<Config>,
    cache: Mutex<HashMap<(RuntimeKind, String), String>>,
}

impl ImageProvisioner {
    /// Create a provisioner over the given adapter and configuration.
    pub fn new(adapter: Arc<dyn AdapterClient>, config: Arc<Config>) -> Self {
        Self {
            adapter,
            config,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Provision an image for the request, reusing a cached one when
    /// possible.
    ///
    /// Path selection is deterministic: a `source_url` forces a build;
    /// otherwise the image is pulled, from the hinted/configured registry
    /// when one resolves, from the platform's own host when none does.
    pub async fn provision(&self, request: &ProvisionRequest) -> Result<ProvisionedImage> {
        let cache_key = (request.runtime, request.placement.clone());
        if let Some(image_ref) = self.cache.lock().await.get(&cache_key) {
            debug!(
                runtime = %request.runtime,
                placement = %request.placement,
                image_ref = %image_ref,
                "Reusing provisioned image"
            );
            return Ok(ProvisionedImage {
                image_ref: image_ref.clone(),
                reused: true,
            });
        }

        let image_ref = if request.source_url.is_some() {
            self.adapter
                .build_image(&ImageBuildRequest {
                    runtime: request.runtime,
                    source_url: request.source_url.clone(),
                    placement: request.placement.clone(),
                    custom_properties: request.custom_properties.clone(),
                })
                .await
                .map_err(|e| HostError::ProvisionFailed(e.to_string()))?
        } else {
            let registry = request
                .registry_hint
                .clone()
                .or_else(|| self.config.registry_for(request.runtime).map(String::from));
            self.adapter
                .load_image(&ImageLoadRequest {
                    runtime: request.runtime,
                    registry,
                    placement: request.placement.clone(),
                    custom_properties: request.custom_properties.clone(),
                })
                .await
                .map_err(|e| HostError::ProvisionFailed(e.to_string()))?
        };

        info!(
            runtime = %request.runtime,
            placement = %request.placement,
            image_ref = %image_ref,
            "Image provisioned"
        );
        self.cache.lock().await.insert(cache_key, image_ref.clone());

        Ok(ProvisionedImage {
            image_ref,
            reused: false,
        })
    }
}
