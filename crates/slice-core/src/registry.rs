//! Slice registry
//!
//! Read-only catalog of slice definitions with lookup by name and by
//! classification key. Built once at startup; duplicate names or keys
//! are a fatal configuration error. Explicitly constructed and passed
//! by handle, so tests can run isolated instances side by side.

use crate::error::{SliceError, SliceResult};
use crate::slice::SliceDefinition;
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Catalog of slice definitions, immutable after construction.
#[derive(Debug)]
pub struct SliceRegistry {
    by_name: HashMap<String, Arc<SliceDefinition>>,
    by_key: HashMap<u16, Arc<SliceDefinition>>,
    /// All slices sorted by descending priority
    ordered: Vec<Arc<SliceDefinition>>,
}

impl SliceRegistry {
    /// Build a registry from slice definitions.
    ///
    /// Fails if a name or classification key is duplicated.
    pub fn from_definitions(definitions: Vec<SliceDefinition>) -> SliceResult<Self> {
        let mut by_name = HashMap::new();
        let mut by_key = HashMap::new();
        let mut ordered = Vec::with_capacity(definitions.len());

        for def in definitions {
            let def = Arc::new(def);
            if by_name.insert(def.name.clone(), def.clone()).is_some() {
                return Err(SliceError::DuplicateSliceName(def.name.clone()));
            }
            if by_key.insert(def.classification_key, def.clone()).is_some() {
                return Err(SliceError::DuplicateClassificationKey(def.classification_key));
            }
            ordered.push(def);
        }

        // Priority descending; name breaks ties deterministically
        ordered.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.name.cmp(&b.name)));

        info!(slices = ordered.len(), "slice registry loaded");
        Ok(Self { by_name, by_key, ordered })
    }

    /// Registry with the three default 5G slices (URLLC, eMBB, mMTC).
    pub fn with_default_slices() -> Self {
        Self::from_definitions(SliceDefinition::default_slices())
            .expect("default slices are unique")
    }

    /// Look up a slice by its classification key.
    pub fn by_classification_key(&self, key: u16) -> Option<Arc<SliceDefinition>> {
        self.by_key.get(&key).cloned()
    }

    /// Look up a slice by name.
    pub fn by_name(&self, name: &str) -> Option<Arc<SliceDefinition>> {
        self.by_name.get(name).cloned()
    }

    /// All slices, sorted by descending priority.
    pub fn all(&self) -> &[Arc<SliceDefinition>] {
        &self.ordered
    }

    /// Number of registered slices.
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// True when no slices are registered.
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Export all slice definitions as a JSON document keyed by name.
    pub fn export_config(&self, path: &Path) -> SliceResult<()> {
        let doc: serde_json::Map<String, serde_json::Value> = self
            .ordered
            .iter()
            .map(|s| (s.name.clone(), json!(**s)))
            .collect();
        std::fs::write(path, serde_json::to_string_pretty(&doc)?)?;
        info!(path = %path.display(), "slice configuration exported");
        Ok(())
    }
}
