//! Typed replicated fields

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use super::authority::HostToken;
use super::transport::Transport;

/// Identifier of one participant process
pub type PeerId = Uuid;

/// Where a field lives: the shared room, or one peer's state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Room,
    Peer(PeerId),
}

/// Address of one replicated value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldKey {
    pub scope: Scope,
    pub name: &'static str,
}

impl FieldKey {
    pub fn new(scope: Scope, name: &'static str) -> Self {
        Self { scope, name }
    }
}

/// Read side of a replicated value. Anyone may hold one.
pub struct Field<T> {
    key: FieldKey,
    initial: T,
    transport: Arc<dyn Transport>,
}

impl<T: Clone> Clone for Field<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            initial: self.initial.clone(),
            transport: self.transport.clone(),
        }
    }
}

impl<T: DeserializeOwned + Clone> Field<T> {
    /// Latest delivered value, or the declared initial value if nothing has
    /// arrived. Never blocks.
    pub fn read(&self) -> T {
        let Some(value) = self.transport.latest(&self.key) else {
            return self.initial.clone();
        };

        match serde_json::from_value(value) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(field = self.key.name, error = %e, "Undecodable replicated value, using default");
                self.initial.clone()
            }
        }
    }
}

/// Write side of a replicated value. Exactly one exists per field, held by
/// the field's owner.
pub struct FieldWriter<T> {
    field: Field<T>,
    last_sent: Option<Value>,
}

impl<T: Serialize + DeserializeOwned + Clone> FieldWriter<T> {
    /// Replace the field's value. Unchanged values are not re-sent.
    pub fn write(&mut self, value: &T) {
        let encoded = match serde_json::to_value(value) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(field = self.field.key.name, error = %e, "Failed to encode replicated value");
                return;
            }
        };

        if self.last_sent.as_ref() == Some(&encoded) {
            return;
        }

        self.field.transport.publish(&self.field.key, encoded.clone());
        self.last_sent = Some(encoded);
    }
}

/// One process's view of the replication layer: the shared transport plus
/// the identity of the local peer.
#[derive(Clone)]
pub struct Replica {
    transport: Arc<dyn Transport>,
    local: PeerId,
}

impl Replica {
    pub fn new(transport: Arc<dyn Transport>, local: PeerId) -> Self {
        Self { transport, local }
    }

    pub fn local_peer(&self) -> PeerId {
        self.local
    }

    /// Declare a field in the local peer's own scope. Only this process can
    /// obtain the writer.
    pub fn declare<T>(&self, name: &'static str, initial: T) -> FieldWriter<T> {
        self.writer(Scope::Peer(self.local), name, initial)
    }

    /// Declare a room-wide field. Only the host writes shared lists.
    pub fn declare_shared<T>(&self, _host: &HostToken, name: &'static str, initial: T) -> FieldWriter<T> {
        self.writer(Scope::Room, name, initial)
    }

    /// Declare a host-owned field stored in another peer's scope (combat
    /// stats, authoritative transform).
    pub fn declare_for<T>(
        &self,
        _host: &HostToken,
        peer: PeerId,
        name: &'static str,
        initial: T,
    ) -> FieldWriter<T> {
        self.writer(Scope::Peer(peer), name, initial)
    }

    /// Read-only handle to any field
    pub fn observe<T>(&self, scope: Scope, name: &'static str, initial: T) -> Field<T> {
        Field {
            key: FieldKey::new(scope, name),
            initial,
            transport: self.transport.clone(),
        }
    }

    /// Drop every field stored under a departed peer
    pub fn release(&self, _host: &HostToken, peer: PeerId) {
        self.transport.release(Scope::Peer(peer));
    }

    fn writer<T>(&self, scope: Scope, name: &'static str, initial: T) -> FieldWriter<T> {
        FieldWriter {
            field: self.observe(scope, name, initial),
            last_sent: None,
        }
    }
}
