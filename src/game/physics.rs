//! Physics boundary: combatant bodies and projectile sensor contacts
//!
//! The host's own simulation of each body is what collision checks use, never
//! the replicated position. [`ArenaPhysics`] is a kinematic stand-in for the
//! rigid-body engine: damped capsule bodies on the floor plane and overlap
//! tests against projectile sensors.

use std::collections::BTreeMap;

use glam::Vec3;

use crate::sync::PeerId;

use super::combat::{Projectile, ProjectileId};

/// Capsule radius of a combatant body
pub const BODY_RADIUS: f32 = 0.6;
/// Body mass used to turn impulses into velocity
pub const BODY_MASS: f32 = 2.5;
/// Linear damping applied every step
pub const LINEAR_DAMPING: f32 = 12.0;
/// Sensor radius of a projectile
pub const PROJECTILE_RADIUS: f32 = 0.09;
/// Walls sit at +/- this distance from the arena centre on X and Z
pub const ARENA_HALF_EXTENT: f32 = 24.0;

/// What a projectile sensor overlapped
#[derive(Debug, Clone, PartialEq)]
pub enum ContactTarget {
    Combatant(PeerId),
    Projectile(ProjectileId),
    Scenery,
}

/// One sensor-overlap event
#[derive(Debug, Clone, PartialEq)]
pub struct SensorContact {
    pub projectile: ProjectileId,
    pub other: ContactTarget,
    /// Projectile position at the moment of overlap
    pub position: Vec3,
}

/// Rigid-body world as the host drives it
pub trait PhysicsWorld: Send {
    fn insert_body(&mut self, id: PeerId, at: Vec3);
    fn remove_body(&mut self, id: PeerId);
    /// Disabled bodies neither move nor collide
    fn set_enabled(&mut self, id: PeerId, enabled: bool);
    fn teleport(&mut self, id: PeerId, to: Vec3);
    fn apply_impulse(&mut self, id: PeerId, impulse: Vec3);
    fn position(&self, id: PeerId) -> Option<Vec3>;
    fn step(&mut self, dt: f32);
    fn contacts(&self, projectiles: &[Projectile]) -> Vec<SensorContact>;
}

#[derive(Debug, Clone)]
struct Body {
    position: Vec3,
    velocity: Vec3,
    enabled: bool,
}

/// Kinematic arena world
#[derive(Debug, Default)]
pub struct ArenaPhysics {
    bodies: BTreeMap<PeerId, Body>,
}

impl ArenaPhysics {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_in_arena(position: Vec3) -> bool {
        position.x.abs() <= ARENA_HALF_EXTENT && position.z.abs() <= ARENA_HALF_EXTENT
    }

    /// Overlap of two circles on the floor plane
    fn check_overlap(a: Vec3, radius_a: f32, b: Vec3, radius_b: f32) -> bool {
        let dx = a.x - b.x;
        let dz = a.z - b.z;
        let combined = radius_a + radius_b;
        dx * dx + dz * dz <= combined * combined
    }
}

impl PhysicsWorld for ArenaPhysics {
    fn insert_body(&mut self, id: PeerId, at: Vec3) {
        self.bodies.insert(
            id,
            Body {
                position: at,
                velocity: Vec3::ZERO,
                enabled: true,
            },
        );
    }

    fn remove_body(&mut self, id: PeerId) {
        self.bodies.remove(&id);
    }

    fn set_enabled(&mut self, id: PeerId, enabled: bool) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.enabled = enabled;
            if !enabled {
                body.velocity = Vec3::ZERO;
            }
        }
    }

    fn teleport(&mut self, id: PeerId, to: Vec3) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.position = to;
            body.velocity = Vec3::ZERO;
        }
    }

    fn apply_impulse(&mut self, id: PeerId, impulse: Vec3) {
        if let Some(body) = self.bodies.get_mut(&id).filter(|b| b.enabled) {
            body.velocity += impulse / BODY_MASS;
        }
    }

    fn position(&self, id: PeerId) -> Option<Vec3> {
        self.bodies.get(&id).map(|b| b.position)
    }

    fn step(&mut self, dt: f32) {
        let limit = ARENA_HALF_EXTENT - BODY_RADIUS;
        for body in self.bodies.values_mut().filter(|b| b.enabled) {
            body.velocity *= 1.0 / (1.0 + dt * LINEAR_DAMPING);
            body.position += body.velocity * dt;
            body.position.x = body.position.x.clamp(-limit, limit);
            body.position.z = body.position.z.clamp(-limit, limit);
        }
    }

    fn contacts(&self, projectiles: &[Projectile]) -> Vec<SensorContact> {
        let mut contacts = Vec::new();

        for (i, projectile) in projectiles.iter().enumerate() {
            if !Self::is_in_arena(projectile.position) {
                contacts.push(SensorContact {
                    projectile: projectile.id.clone(),
                    other: ContactTarget::Scenery,
                    position: projectile.position,
                });
                continue;
            }

            for (id, body) in self.bodies.iter().filter(|(_, b)| b.enabled) {
                if Self::check_overlap(projectile.position, PROJECTILE_RADIUS, body.position, BODY_RADIUS) {
                    contacts.push(SensorContact {
                        projectile: projectile.id.clone(),
                        other: ContactTarget::Combatant(*id),
                        position: projectile.position,
                    });
                }
            }

            for other in projectiles.iter().skip(i + 1) {
                if Self::check_overlap(
                    projectile.position,
                    PROJECTILE_RADIUS,
                    other.position,
                    PROJECTILE_RADIUS,
                ) {
                    contacts.push(SensorContact {
                        projectile: projectile.id.clone(),
                        other: ContactTarget::Projectile(other.id.clone()),
                        position: projectile.position,
                    });
                }
            }
        }

        contacts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_impulse_moves_and_damps() {
        let mut world = ArenaPhysics::new();
        let id = Uuid::new_v4();
        world.insert_body(id, Vec3::ZERO);
        world.apply_impulse(id, Vec3::new(0.0, 0.0, 5.0));

        world.step(0.1);
        let first = world.position(id).unwrap();
        assert!(first.z > 0.0);

        for _ in 0..50 {
            world.step(0.1);
        }
        let settled = world.position(id).unwrap();
        world.step(0.1);
        assert!((world.position(id).unwrap() - settled).length() < 1e-3);
    }

    #[test]
    fn test_bodies_stay_inside_walls() {
        let mut world = ArenaPhysics::new();
        let id = Uuid::new_v4();
        world.insert_body(id, Vec3::new(23.0, 0.0, 0.0));
        world.apply_impulse(id, Vec3::new(1_000.0, 0.0, 0.0));
        world.step(0.1);
        assert!(world.position(id).unwrap().x <= ARENA_HALF_EXTENT - BODY_RADIUS);
    }

    #[test]
    fn test_disabled_body_ignores_impulse_and_contacts() {
        let mut world = ArenaPhysics::new();
        let id = Uuid::new_v4();
        world.insert_body(id, Vec3::ZERO);
        world.set_enabled(id, false);
        world.apply_impulse(id, Vec3::X * 10.0);
        world.step(0.1);
        assert_eq!(world.position(id), Some(Vec3::ZERO));

        let shot = Projectile::new(Uuid::new_v4(), Vec3::new(0.1, 1.4, 0.0), 0.0, 0);
        assert!(world.contacts(&[shot]).is_empty());
    }

    #[test]
    fn test_contacts_report_every_overlap() {
        let mut world = ArenaPhysics::new();
        let owner = Uuid::new_v4();
        let target = Uuid::new_v4();
        world.insert_body(owner, Vec3::new(-0.3, 0.0, 0.0));
        world.insert_body(target, Vec3::new(0.3, 0.0, 0.0));

        let shot = Projectile::new(owner, Vec3::new(0.0, 1.4, 0.0), 0.0, 0);
        let contacts = world.contacts(&[shot]);
        assert_eq!(contacts.len(), 2);
        assert!(contacts.iter().any(|c| c.other == ContactTarget::Combatant(owner)));
        assert!(contacts.iter().any(|c| c.other == ContactTarget::Combatant(target)));
    }

    #[test]
    fn test_shot_leaving_arena_hits_scenery() {
        let world = ArenaPhysics::new();
        let shot = Projectile::new(Uuid::new_v4(), Vec3::new(ARENA_HALF_EXTENT + 1.0, 1.4, 0.0), 0.0, 0);
        let contacts = world.contacts(&[shot]);
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].other, ContactTarget::Scenery);
    }

    #[test]
    fn test_overlapping_shots_report_each_other() {
        let world = ArenaPhysics::new();
        let a = Projectile::new(Uuid::new_v4(), Vec3::new(5.0, 1.4, 5.0), 0.0, 0);
        let b = Projectile::new(Uuid::new_v4(), Vec3::new(5.05, 1.4, 5.0), 0.0, 0);
        let contacts = world.contacts(&[a, b.clone()]);
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].other, ContactTarget::Projectile(b.id));
    }
}
