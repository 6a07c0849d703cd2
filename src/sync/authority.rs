//! Host authority as a capability.
//!
//! Simulation authority belongs to exactly one peer, chosen by the session
//! collaborator. Mutating entry points take a [`HostToken`], and the only way
//! to get one is to be told by the session that this process is the host.

use uuid::Uuid;

use super::field::PeerId;

/// Proof that this process holds simulation authority. Not `Clone`: the
/// token moves into the single component that mutates shared state.
#[derive(Debug)]
pub struct HostToken {
    _sealed: (),
}

/// What the networking collaborator tells us about this process
pub trait Session: Send + Sync {
    fn local_peer(&self) -> PeerId;
    fn is_host(&self) -> bool;
}

/// Role of this process, decided once at construction
#[derive(Debug)]
pub enum Authority {
    Host(HostToken),
    Observer,
}

impl Authority {
    pub fn from_session(session: &dyn Session) -> Self {
        if session.is_host() {
            Self::Host(HostToken { _sealed: () })
        } else {
            Self::Observer
        }
    }

    pub fn is_host(&self) -> bool {
        matches!(self, Self::Host(_))
    }
}

/// Session of the stream-screen process. It opens the room, so the room
/// elects it host.
#[derive(Debug, Clone)]
pub struct StreamSession {
    peer: PeerId,
    host: bool,
}

impl StreamSession {
    pub(crate) fn new(peer: PeerId, host: bool) -> Self {
        Self { peer, host }
    }

    /// A fresh stream screen opening its own room
    pub(crate) fn host() -> Self {
        Self::new(Uuid::new_v4(), true)
    }
}

impl Session for StreamSession {
    fn local_peer(&self) -> PeerId {
        self.peer
    }

    fn is_host(&self) -> bool {
        self.host
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_host_sessions_get_a_token() {
        assert!(Authority::from_session(&StreamSession::host()).is_host());
        assert!(!Authority::from_session(&StreamSession::new(Uuid::new_v4(), false)).is_host());
    }
}
