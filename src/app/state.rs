//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::RoomHandle;
use crate::util::rate_limit::{create_limiter, Limiter, CONSOLE_RATE_LIMIT};
use crate::ws::Presence;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub room: RoomHandle,
    /// Controller sockets and their reconnect generations
    pub presence: Arc<Presence>,
    /// Shared limiter for the host console (launch/reset)
    pub console_limiter: Arc<Limiter>,
}

impl AppState {
    pub fn new(config: Config, room: RoomHandle) -> Self {
        Self {
            config: Arc::new(config),
            room,
            presence: Arc::new(Presence::new()),
            console_limiter: create_limiter(CONSOLE_RATE_LIMIT),
        }
    }
}
