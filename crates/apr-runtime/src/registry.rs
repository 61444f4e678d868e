// SPDX-License-Identifier: MIT OR Apache-2.0
//! Named lookup from a cognitive layer's identity to its implementation.

use std::collections::HashMap;
use std::sync::Arc;

use apr_core::SourceLayer;
use apr_layer::Layer;

/// Maps each [`SourceLayer`] to the [`Layer`] implementation that plays
/// it for the lifetime of the registry. A runner refuses to execute a
/// step whose `owner_layer` has no registered implementation.
#[derive(Default)]
pub struct LayerRegistry {
    layers: HashMap<SourceLayer, Arc<dyn Layer>>,
}

impl LayerRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `layer` under its own `layer_id()`, replacing any
    /// previous registration for that layer.
    pub fn register(&mut self, layer: Arc<dyn Layer>) {
        self.layers.insert(layer.layer_id(), layer);
    }

    /// Look up the implementation registered for `layer_id`.
    #[must_use]
    pub fn get(&self, layer_id: SourceLayer) -> Option<Arc<dyn Layer>> {
        self.layers.get(&layer_id).cloned()
    }

    /// Which layers currently have a registered implementation.
    #[must_use]
    pub fn registered_layers(&self) -> Vec<SourceLayer> {
        let mut layers: Vec<_> = self.layers.keys().copied().collect();
        layers.sort_by_key(|l| format!("{l:?}"));
        layers
    }
}
