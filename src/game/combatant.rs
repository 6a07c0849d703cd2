//! Per-combatant health, lives and elimination (host authoritative)

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::sync::{FieldWriter, HostToken, PeerId, Replica};
use crate::util::time::Millis;

use super::{keys, Animation, ControlInput, Profile, Weapon, MAX_HEALTH, MAX_LIVES, RESPAWN_DELAY_MS};

/// Where a combatant stands in the life cycle of one round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifeState {
    Alive,
    Respawning,
    Eliminated,
}

/// Outcome of a hit delivered to a combatant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// Target was not alive; nothing changed
    Ignored,
    Wounded { health: u32 },
    /// Lost a life, respawn scheduled
    Downed { deaths: u32 },
    /// Lost the last life
    Eliminated { deaths: u32 },
}

impl HitOutcome {
    /// Whether the shooter earns a kill
    pub fn is_kill(&self) -> bool {
        matches!(self, Self::Downed { .. } | Self::Eliminated { .. })
    }
}

/// What a combatant wants to do this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intent {
    /// Direction to push the body
    pub movement: Option<f32>,
    /// Direction to fire
    pub fire: Option<f32>,
}

impl Intent {
    const STILL: Self = Self {
        movement: None,
        fire: None,
    };
}

/// One playable entity, bound to a peer
#[derive(Debug, Clone)]
pub struct Combatant {
    pub id: PeerId,
    pub profile: Profile,
    pub weapon: Weapon,
    health: u32,
    deaths: u32,
    kills: u32,
    dead: bool,
    eliminated: bool,
    facing: f32,
    animation: Animation,
    /// Pending respawn deadline; dropped with the combatant when its peer quits
    respawn_at: Option<Millis>,
}

impl Combatant {
    pub fn new(id: PeerId, profile: Profile, weapon: Weapon) -> Self {
        Self {
            id,
            profile,
            weapon,
            health: MAX_HEALTH,
            deaths: 0,
            kills: 0,
            dead: false,
            eliminated: false,
            facing: 0.0,
            animation: Animation::Idle,
            respawn_at: None,
        }
    }

    pub fn state(&self) -> LifeState {
        if self.eliminated {
            LifeState::Eliminated
        } else if self.dead {
            LifeState::Respawning
        } else {
            LifeState::Alive
        }
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn deaths(&self) -> u32 {
        self.deaths
    }

    pub fn kills(&self) -> u32 {
        self.kills
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn is_eliminated(&self) -> bool {
        self.eliminated
    }

    pub fn lives_remaining(&self) -> u32 {
        MAX_LIVES.saturating_sub(self.deaths)
    }

    pub fn facing(&self) -> f32 {
        self.facing
    }

    pub fn animation(&self) -> Animation {
        self.animation
    }

    pub fn respawn_at(&self) -> Option<Millis> {
        self.respawn_at
    }

    /// Take `damage` from a shot. Only an alive combatant can be hurt.
    pub fn apply_hit(&mut self, damage: u32, now: Millis) -> HitOutcome {
        if self.state() != LifeState::Alive {
            return HitOutcome::Ignored;
        }

        let remaining = self.health.saturating_sub(damage);
        if remaining > 0 {
            self.health = remaining;
            return HitOutcome::Wounded { health: remaining };
        }

        self.health = 0;
        self.dead = true;
        self.deaths += 1;

        if self.deaths >= MAX_LIVES {
            self.eliminated = true;
            self.respawn_at = None;
            HitOutcome::Eliminated {
                deaths: self.deaths,
            }
        } else {
            self.respawn_at = Some(now + RESPAWN_DELAY_MS);
            HitOutcome::Downed {
                deaths: self.deaths,
            }
        }
    }

    pub fn credit_kill(&mut self) {
        self.kills += 1;
    }

    pub fn respawn_due(&self, now: Millis) -> bool {
        self.state() == LifeState::Respawning && self.respawn_at.is_some_and(|at| now >= at)
    }

    /// Back to full health. The caller has already placed the body.
    /// Returns false if the combatant was not waiting to respawn.
    pub fn respawn(&mut self) -> bool {
        if self.state() != LifeState::Respawning {
            return false;
        }
        self.health = MAX_HEALTH;
        self.dead = false;
        self.respawn_at = None;
        true
    }

    /// Creation defaults, keeping identity, profile and weapon
    pub fn reset(&mut self) {
        *self = Self::new(self.id, self.profile.clone(), self.weapon);
    }

    /// Turn this frame's input into an intent. While `frozen` (countdown,
    /// lobby, round over) input is read but not acted on.
    pub fn drive(&mut self, input: &ControlInput, frozen: bool) -> Intent {
        if self.dead {
            self.animation = Animation::Death;
            return Intent::STILL;
        }

        if frozen {
            self.animation = Animation::Idle;
            return Intent::STILL;
        }

        let movement = input.angle.filter(|_| input.moving);
        if let Some(angle) = movement {
            self.facing = angle;
        }

        let fire = input.firing.then(|| input.angle.unwrap_or(self.facing));

        self.animation = match (movement.is_some(), fire.is_some()) {
            (true, true) => Animation::RunShoot,
            (true, false) => Animation::Run,
            (false, true) => Animation::IdleShoot,
            (false, false) => Animation::Idle,
        };

        Intent { movement, fire }
    }
}

/// Host-owned replicated fields describing one combatant
pub struct CombatantFields {
    health: FieldWriter<u32>,
    deaths: FieldWriter<u32>,
    kills: FieldWriter<u32>,
    dead: FieldWriter<bool>,
    eliminated: FieldWriter<bool>,
    weapon: FieldWriter<Option<Weapon>>,
    profile: FieldWriter<Option<Profile>>,
    position: FieldWriter<Vec3>,
    rotation: FieldWriter<f32>,
    animation: FieldWriter<Animation>,
}

impl CombatantFields {
    pub fn declare(replica: &Replica, host: &HostToken, peer: PeerId) -> Self {
        Self {
            health: replica.declare_for(host, peer, keys::HEALTH, MAX_HEALTH),
            deaths: replica.declare_for(host, peer, keys::DEATHS, 0),
            kills: replica.declare_for(host, peer, keys::KILLS, 0),
            dead: replica.declare_for(host, peer, keys::DEAD, false),
            eliminated: replica.declare_for(host, peer, keys::ELIMINATED, false),
            weapon: replica.declare_for(host, peer, keys::WEAPON, None),
            profile: replica.declare_for(host, peer, keys::PROFILE, None),
            position: replica.declare_for(host, peer, keys::POSITION, Vec3::ZERO),
            rotation: replica.declare_for(host, peer, keys::ROTATION, 0.0),
            animation: replica.declare_for(host, peer, keys::ANIMATION, Animation::Idle),
        }
    }

    /// Push the combatant's current state. Each field travels on its own.
    pub fn publish(&mut self, combatant: &Combatant, position: Vec3) {
        self.weapon.write(&Some(combatant.weapon));
        self.profile.write(&Some(combatant.profile.clone()));
        self.health.write(&combatant.health);
        self.deaths.write(&combatant.deaths);
        self.kills.write(&combatant.kills);
        self.dead.write(&combatant.is_dead());
        self.eliminated.write(&combatant.eliminated);
        self.position.write(&position);
        self.rotation.write(&combatant.facing());
        self.animation.write(&combatant.animation());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::BULLET_DAMAGE;
    use uuid::Uuid;

    fn fresh() -> Combatant {
        Combatant::new(Uuid::new_v4(), Profile::default(), Weapon::Pistol)
    }

    fn down(c: &mut Combatant, now: Millis) -> HitOutcome {
        let mut last = HitOutcome::Ignored;
        while c.state() == LifeState::Alive {
            last = c.apply_hit(BULLET_DAMAGE, now);
        }
        last
    }

    fn assert_invariants(c: &Combatant) {
        assert!(c.health() <= MAX_HEALTH);
        if c.is_eliminated() {
            assert!(c.deaths() >= MAX_LIVES);
        }
        assert_eq!(c.health() == 0, c.is_dead());
    }

    #[test]
    fn test_new_combatant_defaults() {
        let c = fresh();
        assert_eq!(c.state(), LifeState::Alive);
        assert_eq!(c.health(), 100);
        assert_eq!((c.deaths(), c.kills()), (0, 0));
        assert_eq!(c.lives_remaining(), MAX_LIVES);
    }

    #[test]
    fn test_non_lethal_hit_wounds() {
        let mut c = fresh();
        assert_eq!(c.apply_hit(10, 0), HitOutcome::Wounded { health: 90 });
        assert_eq!(c.state(), LifeState::Alive);
    }

    #[test]
    fn test_lethal_hit_schedules_respawn() {
        let mut c = fresh();
        for _ in 0..9 {
            c.apply_hit(10, 0);
        }
        assert_eq!(c.health(), 10);

        assert_eq!(c.apply_hit(10, 500), HitOutcome::Downed { deaths: 1 });
        assert_eq!(c.state(), LifeState::Respawning);
        assert_eq!(c.health(), 0);
        assert_eq!(c.respawn_at(), Some(500 + RESPAWN_DELAY_MS));
        assert_invariants(&c);
    }

    #[test]
    fn test_overkill_clamps_health_at_zero() {
        let mut c = fresh();
        c.apply_hit(95, 0);
        assert!(c.apply_hit(40, 0).is_kill());
        assert_eq!(c.health(), 0);
    }

    #[test]
    fn test_hits_while_respawning_are_ignored() {
        let mut c = fresh();
        down(&mut c, 0);
        assert_eq!(c.apply_hit(10, 10), HitOutcome::Ignored);
        assert_eq!(c.deaths(), 1);
    }

    #[test]
    fn test_respawn_waits_for_delay() {
        let mut c = fresh();
        down(&mut c, 1_000);
        assert!(!c.respawn_due(1_000 + RESPAWN_DELAY_MS - 1));
        assert!(c.respawn_due(1_000 + RESPAWN_DELAY_MS));

        assert!(c.respawn());
        assert_eq!(c.state(), LifeState::Alive);
        assert_eq!(c.health(), MAX_HEALTH);
        assert!(!c.respawn());
    }

    #[test]
    fn test_last_life_eliminates() {
        let mut c = fresh();
        for life in 1..MAX_LIVES {
            assert_eq!(down(&mut c, 0), HitOutcome::Downed { deaths: life });
            c.respawn();
        }
        assert_eq!(down(&mut c, 0), HitOutcome::Eliminated { deaths: MAX_LIVES });
        assert_eq!(c.state(), LifeState::Eliminated);
        assert_eq!(c.respawn_at(), None);
        assert_invariants(&c);
    }

    #[test]
    fn test_elimination_is_terminal_until_reset() {
        let mut c = fresh();
        for _ in 0..MAX_LIVES {
            down(&mut c, 0);
            c.respawn();
        }
        assert_eq!(c.state(), LifeState::Eliminated);

        assert_eq!(c.apply_hit(10, 99_999), HitOutcome::Ignored);
        assert!(!c.respawn_due(u64::MAX));
        assert!(!c.respawn());
        assert_eq!(c.state(), LifeState::Eliminated);

        c.reset();
        assert_eq!(c.state(), LifeState::Alive);
        assert_eq!(c.deaths(), 0);
    }

    #[test]
    fn test_counters_never_decrease_during_play() {
        let mut c = fresh();
        let mut last = (0, 0);
        for step in 0..200u64 {
            if step % 7 == 0 {
                c.credit_kill();
            }
            c.apply_hit(BULLET_DAMAGE, step * 100);
            if c.respawn_due(step * 100) {
                c.respawn();
            }
            assert!(c.deaths() >= last.0 && c.kills() >= last.1);
            last = (c.deaths(), c.kills());
            assert_invariants(&c);
        }
    }

    #[test]
    fn test_reset_keeps_identity() {
        let mut c = fresh();
        c.profile.name = "Rudolph".into();
        c.credit_kill();
        down(&mut c, 0);

        c.reset();
        assert_eq!(c.profile.name, "Rudolph");
        assert_eq!(c.weapon, Weapon::Pistol);
        assert_eq!(c.kills(), 0);
        assert_eq!(c.respawn_at(), None);
    }

    #[test]
    fn test_drive_moves_and_fires() {
        let mut c = fresh();
        let input = ControlInput {
            angle: Some(1.0),
            moving: true,
            firing: true,
        };
        let intent = c.drive(&input, false);
        assert_eq!(intent.movement, Some(1.0));
        assert_eq!(intent.fire, Some(1.0));
        assert_eq!(c.animation(), Animation::RunShoot);
        assert_eq!(c.facing(), 1.0);
    }

    #[test]
    fn test_standing_fire_uses_last_facing() {
        let mut c = fresh();
        c.drive(
            &ControlInput {
                angle: Some(2.0),
                moving: true,
                firing: false,
            },
            false,
        );
        let intent = c.drive(
            &ControlInput {
                angle: None,
                moving: false,
                firing: true,
            },
            false,
        );
        assert_eq!(intent.movement, None);
        assert_eq!(intent.fire, Some(2.0));
        assert_eq!(c.animation(), Animation::IdleShoot);
    }

    #[test]
    fn test_frozen_ignores_input() {
        let mut c = fresh();
        let input = ControlInput {
            angle: Some(0.5),
            moving: true,
            firing: true,
        };
        let intent = c.drive(&input, true);
        assert_eq!(intent, Intent::STILL);
        assert_eq!(c.animation(), Animation::Idle);
        assert_eq!(c.facing(), 0.0);
    }

    #[test]
    fn test_dead_plays_death() {
        let mut c = fresh();
        down(&mut c, 0);
        let intent = c.drive(&ControlInput::default(), false);
        assert_eq!(c.animation(), Animation::Death);
        assert_eq!(intent.fire, None);
    }
}
