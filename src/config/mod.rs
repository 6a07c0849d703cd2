//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::game::MAX_PLAYERS_SUPPORTED;

/// Reconnect grace when `RECONNECT_GRACE_MS` is unset
const DEFAULT_RECONNECT_GRACE_MS: u64 = 10_000;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON log lines (`LOG_FORMAT=json`)
    pub log_json: bool,
    /// Allowed client origins for CORS, comma-separated
    pub client_origin: String,
    pub room: RoomOptions,
}

/// Room configuration as the session layer hands it to the game
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomOptions {
    /// Seats available to controllers
    pub max_peers: usize,
    /// How long a dropped controller keeps its combatant
    pub reconnect_grace: Duration,
    /// Fixed seed for spawn shuffles and weapon draws; random when unset
    pub spawn_seed: Option<u64>,
}

impl Default for RoomOptions {
    fn default() -> Self {
        Self {
            max_peers: MAX_PLAYERS_SUPPORTED,
            reconnect_grace: Duration::from_millis(DEFAULT_RECONNECT_GRACE_MS),
            spawn_seed: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let max_peers = parse_var("MAX_PEERS")?.unwrap_or(MAX_PLAYERS_SUPPORTED);
        if max_peers == 0 || max_peers > MAX_PLAYERS_SUPPORTED {
            return Err(ConfigError::Invalid("MAX_PEERS"));
        }

        let reconnect_grace_ms = parse_var("RECONNECT_GRACE_MS")?.unwrap_or(DEFAULT_RECONNECT_GRACE_MS);

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_json: env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")),

            client_origin: env::var("CLIENT_ORIGIN")
                .map_err(|_| ConfigError::Missing("CLIENT_ORIGIN"))?,

            room: RoomOptions {
                max_peers,
                reconnect_grace: Duration::from_millis(reconnect_grace_ms),
                spawn_seed: parse_var("SPAWN_SEED")?,
            },
        })
    }
}

/// Optional numeric variable; present but unparsable is an error
fn parse_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
