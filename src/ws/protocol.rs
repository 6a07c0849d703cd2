//! WebSocket protocol message definitions
//! These are the wire types between the room and phone controllers / screens

use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::combat::{ImpactEffect, Projectile};
use crate::game::{Animation, RoundState, Weapon};

/// Messages sent from a controller to the room
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Take a seat in the room
    Join {
        name: String,
        /// CSS colour of the player's badge
        color: String,
        #[serde(default)]
        photo: Option<String>,
    },

    /// Joystick and trigger state for the current frame
    Input {
        /// Stick direction in radians, absent when the stick is centred
        #[serde(default)]
        angle: Option<f32>,
        moving: bool,
        firing: bool,
    },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },

    /// Leave the room for good
    Leave,
}

/// Messages sent from the room to a socket
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        peer_id: Uuid,
        server_time: u64,
        /// True when the socket picked up a seat kept during reconnect grace
        resumed: bool,
    },

    /// Confirmation of a join
    Joined { peer_id: Uuid, weapon: Weapon },

    /// Room state, sent at the snapshot rate
    Frame {
        tick: u64,
        round: RoundState,
        /// Countdown label while counting down
        countdown: Option<String>,
        combatants: Vec<CombatantView>,
        projectiles: Vec<Projectile>,
        impacts: Vec<ImpactEffect>,
        leaderboard: Vec<LeaderboardEntry>,
    },

    /// Error message
    Error { code: String, message: String },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

impl ServerMsg {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// One combatant as the replicated fields describe it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatantView {
    pub peer_id: Uuid,
    pub name: String,
    pub color: String,
    pub photo: Option<String>,
    pub weapon: Option<Weapon>,
    pub health: u32,
    pub deaths: u32,
    pub kills: u32,
    pub dead: bool,
    pub eliminated: bool,
    pub position: Vec3,
    /// Facing in radians about the vertical axis
    pub rotation: f32,
    pub animation: Animation,
}

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based position
    pub rank: usize,
    pub peer_id: Uuid,
    pub name: String,
    pub color: String,
    pub lives: u32,
    pub kills: u32,
    pub eliminated: bool,
    /// Crown on the first row
    pub leader: bool,
}

/// What a phone shows for its own combatant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerStatus {
    pub peer_id: Uuid,
    pub health: u32,
    pub lives: u32,
    pub kills: u32,
    pub dead: bool,
    pub eliminated: bool,
    pub weapon: Option<Weapon>,
    pub round: RoundState,
}
