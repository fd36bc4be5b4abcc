//! One retrieval service per store location.
//!
//! Services for different locations share nothing: each has its own provider
//! cell, index cache and gates. Callers that serve several stores from one
//! process go through the registry so repeated opens reuse the warm service.

use crate::service::RetrievalService;
use semdoc_core::AppResult;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: Mutex<HashMap<PathBuf, Arc<RetrievalService>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the service for `location`, building it with `build` on first
    /// request. `build` runs at most once per location while it stays
    /// registered.
    pub fn get_or_open<F>(&self, location: &Path, build: F) -> AppResult<Arc<RetrievalService>>
    where
        F: FnOnce() -> AppResult<RetrievalService>,
    {
        let key = registry_key(location);
        let mut services = self.services.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(service) = services.get(&key) {
            return Ok(Arc::clone(service));
        }

        tracing::debug!("Opening retrieval service for {}", key.display());
        let service = Arc::new(build()?);
        services.insert(key, Arc::clone(&service));

        Ok(service)
    }

    /// Forget the service for `location`. Holders of the `Arc` keep using it.
    pub fn evict(&self, location: &Path) -> bool {
        self.services
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&registry_key(location))
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.services
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn registry_key(location: &Path) -> PathBuf {
    std::path::absolute(location).unwrap_or_else(|_| location.to_path_buf())
}
