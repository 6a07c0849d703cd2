//! Game simulation modules

pub mod combat;
pub mod combatant;
pub mod physics;
pub mod ranking;
pub mod room;
pub mod round;
pub mod scene;
pub mod snapshot;
pub mod spawn;

pub use room::{Room, RoomHandle};
pub use round::{RoomError, RoundState};

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::util::time::Millis;

/// Lives per combatant per round
pub const MAX_LIVES: u32 = 3;
/// Full health
pub const MAX_HEALTH: u32 = 100;
/// Damage dealt by every shot, whatever the weapon
pub const BULLET_DAMAGE: u32 = 10;
/// Bullet travel speed (units per second)
pub const BULLET_SPEED: f32 = 20.0;
/// Minimum gap between two accepted shots from one combatant
pub const FIRE_RATE_MS: Millis = 380;
/// Time spent dead before respawning
pub const RESPAWN_DELAY_MS: Millis = 2_000;
/// Travel budget of a shot that never meets anything
pub const PROJECTILE_TTL_MS: Millis = 2_000;
/// Lifetime of an impact effect
pub const IMPACT_DURATION_MS: Millis = 800;
/// Movement impulse per second of held input
pub const MOVEMENT_SPEED: f32 = 202.0;
/// Room capacity the spawn queue is sized for
pub const MAX_PLAYERS_SUPPORTED: usize = 10;

/// Replicated field names
pub mod keys {
    pub const HEALTH: &str = "health";
    pub const DEATHS: &str = "deaths";
    pub const KILLS: &str = "kills";
    pub const DEAD: &str = "dead";
    pub const ELIMINATED: &str = "eliminated";
    pub const WEAPON: &str = "weapon";
    pub const PROFILE: &str = "profile";
    pub const POSITION: &str = "pos";
    pub const ROTATION: &str = "rotation";
    pub const ANIMATION: &str = "animation";
    pub const INPUT: &str = "input";

    pub const ROUND: &str = "round";
    pub const BULLETS: &str = "bullets";
    pub const HITS: &str = "hits";
}

/// Immutable per-session identity of a peer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub color: String,
    pub photo: Option<String>,
}

/// Weapon model carried by a combatant. Cosmetic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weapon {
    GrenadeLauncher,
    #[serde(rename = "AK")]
    Ak,
    Pistol,
    Revolver,
    #[serde(rename = "Revolver_Small")]
    RevolverSmall,
    RocketLauncher,
    ShortCannon,
    #[serde(rename = "SMG")]
    Smg,
    Shotgun,
    Sniper,
    #[serde(rename = "Sniper_2")]
    Sniper2,
}

impl Weapon {
    pub const ALL: [Weapon; 11] = [
        Weapon::GrenadeLauncher,
        Weapon::Ak,
        Weapon::Pistol,
        Weapon::Revolver,
        Weapon::RevolverSmall,
        Weapon::RocketLauncher,
        Weapon::ShortCannon,
        Weapon::Smg,
        Weapon::Shotgun,
        Weapon::Sniper,
        Weapon::Sniper2,
    ];

    /// Uniform draw, used once when a peer joins
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

/// Controller input for one frame, replicated from the owning peer
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlInput {
    /// Stick direction in radians, `None` while the stick is released
    pub angle: Option<f32>,
    pub moving: bool,
    pub firing: bool,
}

/// Animation tag the renderer plays for a combatant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Animation {
    #[default]
    Idle,
    Run,
    #[serde(rename = "Idle_Shoot")]
    IdleShoot,
    #[serde(rename = "Run_Shoot")]
    RunShoot,
    Death,
}

/// Unit direction on the arena floor for an angle measured from +Z
pub fn heading(angle: f32) -> Vec3 {
    Vec3::new(angle.sin(), 0.0, angle.cos())
}
