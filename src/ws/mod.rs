pub mod handler;
pub mod presence;
pub mod protocol;

pub use presence::Presence;
