//! Model registry keyed by optional id.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use diffeq_core::{DiffeqError, Result};
use diffeq_runtime::{ModelInstance, DEFAULT_MODEL_ID};

/// Map from model id to loaded model. `None` is the default slot.
///
/// Entries are shared as `Arc`s. Replacing or removing an entry never
/// invalidates instances callers already hold: their handles keep working
/// against the superseded instance until the last `Arc` is dropped.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: RwLock<HashMap<Option<String>, Arc<ModelInstance>>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `model` under its own id, returning the entry it replaced.
    pub fn register(&self, model: Arc<ModelInstance>) -> Option<Arc<ModelInstance>> {
        let key = model.id().map(str::to_owned);
        let previous = self
            .models
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::clone(&model));

        match &previous {
            Some(old) => tracing::info!(
                event = "model_replaced",
                model = model.display_id(),
                instance = %model.instance_id(),
                replaced = %old.instance_id(),
                "Replaced registered model"
            ),
            None => tracing::info!(
                event = "model_registered",
                model = model.display_id(),
                instance = %model.instance_id(),
                "Registered model"
            ),
        }
        previous
    }

    pub fn get(&self, id: Option<&str>) -> Option<Arc<ModelInstance>> {
        self.models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id.map(str::to_owned))
            .cloned()
    }

    /// Like [`ModelRegistry::get`], failing with `ModelNotFound` when absent.
    pub fn require(&self, id: Option<&str>) -> Result<Arc<ModelInstance>> {
        self.get(id)
            .ok_or_else(|| DiffeqError::ModelNotFound(id.unwrap_or(DEFAULT_MODEL_ID).to_string()))
    }

    pub fn remove(&self, id: Option<&str>) -> Option<Arc<ModelInstance>> {
        let removed = self
            .models
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id.map(str::to_owned));
        if removed.is_some() {
            tracing::info!(
                event = "model_removed",
                model = id.unwrap_or(DEFAULT_MODEL_ID),
                "Removed model"
            );
        }
        removed
    }

    pub fn contains(&self, id: Option<&str>) -> bool {
        self.models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id.map(str::to_owned))
    }

    /// Registered ids, sorted with the default slot first.
    pub fn ids(&self) -> Vec<Option<String>> {
        let mut ids: Vec<_> = self
            .models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
