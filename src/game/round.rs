//! Round lifecycle, combat resolution and win detection (host only)

use std::collections::HashMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::sync::{Field, FieldWriter, HostToken, PeerId, Replica, Scope};
use crate::util::time::{elapsed_since, Millis};

use super::combat::{muzzle_origin, Armory, Hit, ImpactEffect, Projectile, Resolution};
use super::combatant::{Combatant, CombatantFields, HitOutcome};
use super::physics::PhysicsWorld;
use super::ranking::rank;
use super::spawn::{SpawnAllocator, DEFAULT_SPAWN};
use super::{heading, keys, ControlInput, Profile, Weapon, MOVEMENT_SPEED};

/// Round phase as published to every peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum RoundState {
    /// Accepting joins, no simulation
    Lobby,
    /// Timed intro, everyone frozen
    Countdown { step: usize },
    Active,
    RoundEnd { winner: PeerId },
}

impl RoundState {
    /// Label of the countdown step on screen, if counting down
    pub fn countdown_label(&self) -> Option<&'static str> {
        match self {
            Self::Countdown { step } => COUNTDOWN_STEPS.get(*step).map(|s| s.label),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// One timed step of the pre-round countdown
#[derive(Debug, Clone, Copy)]
pub struct CountdownStep {
    pub label: &'static str,
    pub hold_ms: Millis,
}

pub const COUNTDOWN_STEPS: [CountdownStep; 4] = [
    CountdownStep { label: "3", hold_ms: 1_000 },
    CountdownStep { label: "2", hold_ms: 1_000 },
    CountdownStep { label: "1", hold_ms: 1_000 },
    CountdownStep { label: "GO!", hold_ms: 800 },
];

/// Join rejections
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("Room is full ({0} peers)")]
    Full(usize),

    #[error("Peer already joined")]
    AlreadyJoined,

    #[error("Room is not running")]
    Closed,
}

impl RoomError {
    /// Stable code for the wire
    pub fn code(&self) -> &'static str {
        match self {
            Self::Full(_) => "room_full",
            Self::AlreadyJoined => "already_joined",
            Self::Closed => "room_closed",
        }
    }
}

/// A combatant plus its replication plumbing
struct Seat {
    combatant: Combatant,
    fields: CombatantFields,
    input: Field<ControlInput>,
}

/// Owns every combatant of the room and is the single place where shared
/// state changes. Constructing one requires the host capability.
pub struct RoundController {
    host: HostToken,
    replica: Replica,
    state: RoundState,
    step_started: Millis,
    /// Combatants present when the round went active (plus late joiners)
    entrants: usize,
    seats: HashMap<PeerId, Seat>,
    /// Join order, for stable iteration and ranking ties
    roster: Vec<PeerId>,
    spawns: SpawnAllocator,
    armory: Armory,
    physics: Box<dyn PhysicsWorld>,
    rng: ChaCha8Rng,
    max_peers: usize,
    round_field: FieldWriter<RoundState>,
    bullets_field: FieldWriter<Vec<Projectile>>,
    hits_field: FieldWriter<Vec<ImpactEffect>>,
}

impl RoundController {
    pub fn new(
        host: HostToken,
        replica: Replica,
        spawns: SpawnAllocator,
        physics: Box<dyn PhysicsWorld>,
        max_peers: usize,
        seed: u64,
    ) -> Self {
        let round_field = replica.declare_shared(&host, keys::ROUND, RoundState::Lobby);
        let bullets_field = replica.declare_shared(&host, keys::BULLETS, Vec::new());
        let hits_field = replica.declare_shared(&host, keys::HITS, Vec::new());

        Self {
            host,
            replica,
            state: RoundState::Lobby,
            step_started: 0,
            entrants: 0,
            seats: HashMap::new(),
            roster: Vec::new(),
            spawns,
            armory: Armory::new(),
            physics,
            rng: ChaCha8Rng::seed_from_u64(seed),
            max_peers,
            round_field,
            bullets_field,
            hits_field,
        }
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn winner(&self) -> Option<PeerId> {
        match self.state {
            RoundState::RoundEnd { winner } => Some(winner),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn combatant(&self, id: PeerId) -> Option<&Combatant> {
        self.seats.get(&id).map(|seat| &seat.combatant)
    }

    /// Combatants in join order
    pub fn combatants(&self) -> impl Iterator<Item = &Combatant> + '_ {
        self.roster
            .iter()
            .filter_map(|id| self.seats.get(id).map(|seat| &seat.combatant))
    }

    /// Seat a joining peer. Returns the weapon it was dealt.
    pub fn join(&mut self, peer: PeerId, profile: Profile) -> Result<Weapon, RoomError> {
        if self.seats.contains_key(&peer) {
            return Err(RoomError::AlreadyJoined);
        }
        if self.seats.len() >= self.max_peers {
            return Err(RoomError::Full(self.max_peers));
        }

        let weapon = Weapon::random(&mut self.rng);
        let combatant = Combatant::new(peer, profile, weapon);
        let spawn = self.spawns.next();
        self.physics.insert_body(peer, spawn);

        let mut fields = CombatantFields::declare(&self.replica, &self.host, peer);
        fields.publish(&combatant, spawn);
        let input = self
            .replica
            .observe(Scope::Peer(peer), keys::INPUT, ControlInput::default());

        info!(
            peer_id = %peer,
            name = %combatant.profile.name,
            weapon = ?weapon,
            player_count = self.seats.len() + 1,
            "Combatant joined"
        );

        self.seats.insert(
            peer,
            Seat {
                combatant,
                fields,
                input,
            },
        );
        self.roster.push(peer);
        if self.state.is_active() {
            self.entrants += 1;
        }

        Ok(weapon)
    }

    /// Tear down a departed peer: combatant, pending respawn, body, shots,
    /// cooldown and replicated fields.
    pub fn quit(&mut self, peer: PeerId) -> bool {
        let Some(seat) = self.seats.remove(&peer) else {
            // seatless sockets still wrote their input on the way out
            self.replica.release(&self.host, peer);
            return false;
        };

        self.roster.retain(|id| *id != peer);
        self.physics.remove_body(peer);
        self.armory.forget(peer);
        drop(seat.fields);
        self.replica.release(&self.host, peer);

        info!(
            peer_id = %peer,
            pending_respawn = seat.combatant.respawn_at().is_some(),
            player_count = self.seats.len(),
            "Combatant left"
        );

        if self.seats.is_empty() && self.state != RoundState::Lobby {
            info!("Room emptied, back to lobby");
            self.armory.clear();
            self.spawns.invalidate();
            self.state = RoundState::Lobby;
            self.entrants = 0;
        } else {
            self.check_round_end();
        }

        self.publish();
        true
    }

    /// Host's launch action: start the countdown
    pub fn launch(&mut self, now: Millis) -> bool {
        if self.state != RoundState::Lobby {
            warn!(state = ?self.state, "Launch ignored outside lobby");
            return false;
        }

        self.state = RoundState::Countdown { step: 0 };
        self.step_started = now;
        info!(player_count = self.seats.len(), "Countdown started");
        self.publish();
        true
    }

    /// Host's reset action: every combatant back to creation defaults on a
    /// fresh spawn, empty lists, lobby.
    pub fn reset(&mut self) {
        self.spawns.invalidate();
        self.armory.clear();

        for id in &self.roster {
            let Some(seat) = self.seats.get_mut(id) else {
                continue;
            };
            seat.combatant.reset();
            let spawn = self.spawns.next();
            self.physics.teleport(*id, spawn);
            self.physics.set_enabled(*id, true);
        }

        info!(
            previous = ?self.state,
            player_count = self.seats.len(),
            spawns_left = self.spawns.remaining(),
            "Round reset"
        );
        self.state = RoundState::Lobby;
        self.entrants = 0;
        self.publish();
    }

    /// Run one frame of the host simulation and publish the result
    pub fn tick(&mut self, now: Millis, dt: f32) {
        self.advance_countdown(now);

        let active = self.state.is_active();
        if active {
            self.respawn_due(now);
        }

        self.drive_combatants(now, dt, !active);

        if active {
            self.physics.step(dt);
            let expired = self.armory.advance(dt, now);
            if expired > 0 {
                debug!(expired, "Projectiles expired");
            }
            self.resolve_contacts(now);
            self.check_round_end();
        } else {
            self.armory.expire(now);
        }

        self.armory.retire_impacts(now);
        self.publish();
    }

    fn advance_countdown(&mut self, now: Millis) {
        let RoundState::Countdown { step } = self.state else {
            return;
        };

        if elapsed_since(self.step_started, now) < COUNTDOWN_STEPS[step].hold_ms {
            return;
        }

        self.step_started = now;
        if step + 1 < COUNTDOWN_STEPS.len() {
            self.state = RoundState::Countdown { step: step + 1 };
        } else {
            self.state = RoundState::Active;
            self.entrants = self.seats.len();
            info!(player_count = self.entrants, "Round active");
        }
    }

    fn respawn_due(&mut self, now: Millis) {
        for id in &self.roster {
            let Some(seat) = self.seats.get_mut(id) else {
                continue;
            };
            if !seat.combatant.respawn_due(now) {
                continue;
            }

            let spawn = self.spawns.next();
            self.physics.teleport(*id, spawn);
            self.physics.set_enabled(*id, true);
            seat.combatant.respawn();
            info!(peer_id = %id, x = spawn.x, z = spawn.z, "Combatant respawned");
        }
    }

    fn drive_combatants(&mut self, now: Millis, dt: f32, frozen: bool) {
        for id in &self.roster {
            let Some(seat) = self.seats.get_mut(id) else {
                continue;
            };

            let input = seat.input.read();
            let intent = seat.combatant.drive(&input, frozen);

            if let Some(angle) = intent.movement {
                self.physics
                    .apply_impulse(*id, heading(angle) * MOVEMENT_SPEED * dt);
            }

            let Some(angle) = intent.fire else {
                continue;
            };
            let Some(body) = self.physics.position(*id) else {
                continue;
            };
            if let Some(projectile) = self.armory.fire(*id, muzzle_origin(body, angle), angle, now) {
                debug!(peer_id = %id, projectile_id = %projectile.id, "Shot fired");
            }
        }
    }

    fn resolve_contacts(&mut self, now: Millis) {
        let contacts = self.physics.contacts(self.armory.projectiles());
        for contact in contacts {
            if let Resolution::Hit(hit) = self.armory.resolve(&contact, now) {
                self.apply_hit(hit, now);
            }
        }
    }

    fn apply_hit(&mut self, hit: Hit, now: Millis) -> HitOutcome {
        let Some(target) = self.seats.get_mut(&hit.target_id) else {
            return HitOutcome::Ignored;
        };

        let outcome = target.combatant.apply_hit(hit.damage, now);
        match outcome {
            HitOutcome::Ignored => {
                debug!(target_id = %hit.target_id, "Hit on non-alive combatant ignored");
                return outcome;
            }
            HitOutcome::Wounded { health } => {
                debug!(
                    projectile_id = %hit.projectile_id,
                    shooter_id = %hit.shooter_id,
                    target_id = %hit.target_id,
                    health,
                    "Combatant hit"
                );
            }
            HitOutcome::Downed { deaths } => {
                info!(
                    killer_id = %hit.shooter_id,
                    victim_id = %hit.target_id,
                    deaths,
                    x = hit.position.x,
                    z = hit.position.z,
                    "Combatant killed"
                );
            }
            HitOutcome::Eliminated { deaths } => {
                info!(
                    killer_id = %hit.shooter_id,
                    victim_id = %hit.target_id,
                    deaths,
                    x = hit.position.x,
                    z = hit.position.z,
                    "Combatant eliminated"
                );
            }
        }

        if outcome.is_kill() {
            self.physics.set_enabled(hit.target_id, false);
            if let Some(shooter) = self.seats.get_mut(&hit.shooter_id) {
                shooter.combatant.credit_kill();
            }
        }
        outcome
    }

    /// Sole survivor among several combatants wins; so does the last one
    /// left when everyone else quits mid-round. If nobody survives, the
    /// ranking picks the winner.
    fn check_round_end(&mut self) {
        if !self.state.is_active() {
            return;
        }

        let total = self.seats.len();
        let survivors: Vec<PeerId> = self
            .combatants()
            .filter(|c| !c.is_eliminated())
            .map(|c| c.id)
            .collect();

        let winner = if survivors.len() == 1 && total > 1 {
            survivors.first().copied()
        } else if survivors.is_empty() && total > 1 {
            // last lives traded in the same frame: best standing takes it
            rank(self.combatants()).first().map(|c| c.id)
        } else if total == 1 && self.entrants > 1 {
            self.roster.first().copied()
        } else {
            None
        };

        if let Some(winner) = winner {
            self.state = RoundState::RoundEnd { winner };
            info!(winner_id = %winner, player_count = total, "Round won");
        }
    }

    fn publish(&mut self) {
        self.round_field.write(&self.state);
        self.bullets_field.write(&self.armory.projectiles().to_vec());
        self.hits_field.write(&self.armory.impacts().to_vec());

        for (id, seat) in self.seats.iter_mut() {
            let position = self.physics.position(*id).unwrap_or(DEFAULT_SPAWN);
            seat.fields.publish(&seat.combatant, position);
        }
    }
}
