//! Projectile lifecycle - firing, travel, collision resolution, expiry

use std::collections::HashMap;
use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::sync::PeerId;
use crate::util::time::{elapsed_since, Millis};

use super::physics::{ContactTarget, SensorContact};
use super::{heading, BULLET_DAMAGE, BULLET_SPEED, FIRE_RATE_MS, IMPACT_DURATION_MS, PROJECTILE_TTL_MS};

/// Muzzle position relative to the body, before rotating by the firing angle
pub const WEAPON_OFFSET: Vec3 = Vec3::new(-0.2, 1.4, 0.8);

/// Owner id plus fire time. Unique per peer without coordination because a
/// peer cannot fire twice within [`FIRE_RATE_MS`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectileId(String);

impl ProjectileId {
    pub fn new(owner: PeerId, fired_at: Millis) -> Self {
        Self(format!("{owner}-{fired_at}"))
    }
}

impl fmt::Display for ProjectileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A shot in flight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub id: ProjectileId,
    pub owner: PeerId,
    pub origin: Vec3,
    pub position: Vec3,
    pub angle: f32,
    pub velocity: Vec3,
    pub damage: u32,
    pub created_at: Millis,
}

impl Projectile {
    pub fn new(owner: PeerId, origin: Vec3, angle: f32, now: Millis) -> Self {
        Self {
            id: ProjectileId::new(owner, now),
            owner,
            origin,
            position: origin,
            angle,
            velocity: heading(angle) * BULLET_SPEED,
            damage: BULLET_DAMAGE,
            created_at: now,
        }
    }

    /// Integrate position over `dt` seconds
    pub fn advance(&mut self, dt: f32) {
        self.position += self.velocity * dt;
    }

    pub fn is_expired(&self, now: Millis) -> bool {
        elapsed_since(self.created_at, now) >= PROJECTILE_TTL_MS
    }
}

/// Where a shot fired at `angle` leaves a body standing at `body`
pub fn muzzle_origin(body: Vec3, angle: f32) -> Vec3 {
    let (sin, cos) = angle.sin_cos();
    let offset = Vec3::new(
        WEAPON_OFFSET.x * cos + WEAPON_OFFSET.z * sin,
        WEAPON_OFFSET.y,
        -WEAPON_OFFSET.x * sin + WEAPON_OFFSET.z * cos,
    );
    body + offset
}

/// Cosmetic marker at a hit location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactEffect {
    pub id: ProjectileId,
    pub position: Vec3,
    pub created_at: Millis,
}

/// A shot that landed on a combatant other than its owner
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub projectile_id: ProjectileId,
    pub shooter_id: PeerId,
    pub target_id: PeerId,
    pub damage: u32,
    pub position: Vec3,
}

/// Result of resolving one sensor contact
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Owner, other shot, or a projectile already resolved
    Ignored,
    /// Stopped by level geometry
    Blocked,
    Hit(Hit),
}

/// Host-side projectile and impact lists plus per-combatant fire cooldowns
#[derive(Debug, Default)]
pub struct Armory {
    projectiles: Vec<Projectile>,
    impacts: Vec<ImpactEffect>,
    last_shoot: HashMap<PeerId, Millis>,
}

impl Armory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub fn impacts(&self) -> &[ImpactEffect] {
        &self.impacts
    }

    /// Check if `owner` may fire at `now`
    pub fn can_fire(&self, owner: PeerId, now: Millis) -> bool {
        self.last_shoot
            .get(&owner)
            .map_or(true, |&last| elapsed_since(last, now) >= FIRE_RATE_MS)
    }

    /// Create a projectile unless `owner` is still cooling down
    pub fn fire(&mut self, owner: PeerId, origin: Vec3, angle: f32, now: Millis) -> Option<&Projectile> {
        if !self.can_fire(owner, now) {
            return None;
        }

        self.last_shoot.insert(owner, now);
        self.projectiles.push(Projectile::new(owner, origin, angle, now));
        self.projectiles.last()
    }

    /// Move every projectile and drop those past their travel budget.
    /// Returns how many expired.
    pub fn advance(&mut self, dt: f32, now: Millis) -> usize {
        for projectile in &mut self.projectiles {
            projectile.advance(dt);
        }
        self.expire(now)
    }

    /// Drop projectiles past their travel budget without moving the rest
    pub fn expire(&mut self, now: Millis) -> usize {
        let before = self.projectiles.len();
        self.projectiles.retain(|p| !p.is_expired(now));
        before - self.projectiles.len()
    }

    /// Resolve a sensor contact reported by physics
    pub fn resolve(&mut self, contact: &SensorContact, now: Millis) -> Resolution {
        let Some(index) = self.projectiles.iter().position(|p| p.id == contact.projectile) else {
            return Resolution::Ignored;
        };

        let target_id = match contact.other {
            ContactTarget::Projectile(_) => return Resolution::Ignored,
            ContactTarget::Combatant(id) if id == self.projectiles[index].owner => {
                return Resolution::Ignored;
            }
            ContactTarget::Combatant(id) => Some(id),
            ContactTarget::Scenery => None,
        };

        let projectile = self.projectiles.remove(index);
        self.impacts.push(ImpactEffect {
            id: projectile.id.clone(),
            position: contact.position,
            created_at: now,
        });

        match target_id {
            Some(target_id) => Resolution::Hit(Hit {
                projectile_id: projectile.id,
                shooter_id: projectile.owner,
                target_id,
                damage: projectile.damage,
                position: contact.position,
            }),
            None => {
                debug!(projectile_id = %projectile.id, "Projectile stopped by scenery");
                Resolution::Blocked
            }
        }
    }

    /// Drop impact effects older than [`IMPACT_DURATION_MS`]
    pub fn retire_impacts(&mut self, now: Millis) -> usize {
        let before = self.impacts.len();
        self.impacts
            .retain(|hit| elapsed_since(hit.created_at, now) < IMPACT_DURATION_MS);
        before - self.impacts.len()
    }

    /// Tear down everything a departed combatant left behind
    pub fn forget(&mut self, owner: PeerId) {
        self.last_shoot.remove(&owner);
        self.projectiles.retain(|p| p.owner != owner);
    }

    /// Empty every list (round reset)
    pub fn clear(&mut self) {
        self.projectiles.clear();
        self.impacts.clear();
        self.last_shoot.clear();
    }
}
