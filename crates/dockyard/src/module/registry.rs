//! Handler Registry
//!
//! Per-module mapping from event type to the adapters declared for exactly
//! that type. Adapters become visible to dispatch only once a whole batch has
//! been built and published.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::{TypeId, TypeInfo};

use super::HandlerAdapter;

/// Adapters keyed by their declared event type
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<TypeId, Vec<Arc<HandlerAdapter>>>>,
}

impl HandlerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a batch of fully built adapters visible to dispatch
    pub fn publish(&self, adapters: Vec<Arc<HandlerAdapter>>) {
        if adapters.is_empty() {
            return;
        }
        let mut handlers = self.handlers.write();
        for adapter in adapters {
            handlers
                .entry(adapter.accepts().id())
                .or_insert_with(|| Vec::with_capacity(4))
                .push(adapter);
        }
    }

    /// Snapshot of the adapters registered for exactly `ty`
    pub fn handlers_for(&self, ty: &TypeInfo) -> Vec<Arc<HandlerAdapter>> {
        self.handlers
            .read()
            .get(&ty.id())
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of registered adapters
    pub fn len(&self) -> usize {
        self.handlers.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct event types with at least one adapter
    pub fn type_count(&self) -> usize {
        self.handlers.read().len()
    }
}
