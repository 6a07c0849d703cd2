//! Delivery substrate for replicated fields.
//!
//! The real peer transport is an external collaborator. Everything above this
//! trait only assumes "the latest value written eventually shows up", so a
//! stronger transport can be swapped in without touching consumers.

use dashmap::DashMap;
use serde_json::Value;

use super::field::{FieldKey, Scope};

/// Key/value delivery for replicated fields
pub trait Transport: Send + Sync {
    /// Replace the value stored under `key`. No ordering is promised relative
    /// to other keys.
    fn publish(&self, key: &FieldKey, value: Value);

    /// Most recently delivered value, if any arrived yet
    fn latest(&self, key: &FieldKey) -> Option<Value>;

    /// Drop every field stored in `scope`
    fn release(&self, scope: Scope);

    /// Number of fields currently held
    fn len(&self) -> usize;
}

/// In-process transport: every peer living in this process shares one map,
/// so a publish is visible to all readers immediately.
#[derive(Default)]
pub struct MemoryTransport {
    fields: DashMap<FieldKey, Value>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for MemoryTransport {
    fn publish(&self, key: &FieldKey, value: Value) {
        self.fields.insert(key.clone(), value);
    }

    fn latest(&self, key: &FieldKey) -> Option<Value> {
        self.fields.get(key).map(|entry| entry.value().clone())
    }

    fn release(&self, scope: Scope) {
        self.fields.retain(|key, _| key.scope != scope);
    }

    fn len(&self) -> usize {
        self.fields.len()
    }
}
