//! Which socket currently speaks for each controller peer
//!
//! Every connection gets a fresh generation. A dropped socket only tears its
//! peer down if no newer socket has picked the peer up in the meantime.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::sync::PeerId;

#[derive(Debug, Default)]
pub struct Presence {
    sessions: DashMap<PeerId, u64>,
    next_generation: AtomicU64,
}

impl Presence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a new socket to `peer`, superseding any earlier one
    pub fn connect(&self, peer: PeerId) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        self.sessions.insert(peer, generation);
        generation
    }

    /// Whether `peer` is still held, connected or within its grace period
    pub fn is_known(&self, peer: PeerId) -> bool {
        self.sessions.contains_key(&peer)
    }

    /// Drop `peer` if `generation` is still its latest socket. Returns true
    /// when the caller should release the peer's seat.
    pub fn release(&self, peer: PeerId, generation: u64) -> bool {
        self.sessions
            .remove_if(&peer, |_, current| *current == generation)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }
}
