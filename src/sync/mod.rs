//! Peer state replication: single-writer fields delivered latest-value-wins,
//! and the host authority capability that gates every mutating entry point.

pub mod authority;
pub mod field;
pub mod transport;

pub use authority::{Authority, HostToken, Session, StreamSession};
pub use field::{Field, FieldWriter, PeerId, Replica, Scope};
pub use transport::{MemoryTransport, Transport};
