//! Observer-side view of the room and frame building
//!
//! Everything here reads replicated fields only, so any peer (not just the
//! host) can build the same frame. Values may lag one another; a field that
//! has not arrived yet reads as its default.

use glam::Vec3;

use crate::sync::{Field, PeerId, Replica, Scope};
use crate::ws::protocol::{CombatantView, ControllerStatus, LeaderboardEntry, ServerMsg};

use super::combat::{ImpactEffect, Projectile};
use super::ranking::{rank, Standing};
use super::round::RoundState;
use super::{keys, Animation, Profile, Weapon, MAX_HEALTH, MAX_LIVES};

impl Standing for CombatantView {
    fn deaths(&self) -> u32 {
        self.deaths
    }

    fn kills(&self) -> u32 {
        self.kills
    }

    fn is_eliminated(&self) -> bool {
        self.eliminated
    }
}

/// Read handles for one combatant's fields
struct CombatantMirror {
    peer: PeerId,
    profile: Field<Option<Profile>>,
    weapon: Field<Option<Weapon>>,
    health: Field<u32>,
    deaths: Field<u32>,
    kills: Field<u32>,
    dead: Field<bool>,
    eliminated: Field<bool>,
    position: Field<Vec3>,
    rotation: Field<f32>,
    animation: Field<Animation>,
}

impl CombatantMirror {
    fn new(replica: &Replica, peer: PeerId) -> Self {
        let scope = Scope::Peer(peer);
        Self {
            peer,
            profile: replica.observe(scope, keys::PROFILE, None),
            weapon: replica.observe(scope, keys::WEAPON, None),
            health: replica.observe(scope, keys::HEALTH, MAX_HEALTH),
            deaths: replica.observe(scope, keys::DEATHS, 0),
            kills: replica.observe(scope, keys::KILLS, 0),
            dead: replica.observe(scope, keys::DEAD, false),
            eliminated: replica.observe(scope, keys::ELIMINATED, false),
            position: replica.observe(scope, keys::POSITION, Vec3::ZERO),
            rotation: replica.observe(scope, keys::ROTATION, 0.0),
            animation: replica.observe(scope, keys::ANIMATION, Animation::Idle),
        }
    }

    fn read(&self) -> CombatantView {
        let profile = self.profile.read().unwrap_or_default();
        CombatantView {
            peer_id: self.peer,
            name: profile.name,
            color: profile.color,
            photo: profile.photo,
            weapon: self.weapon.read(),
            health: self.health.read().min(MAX_HEALTH),
            deaths: self.deaths.read(),
            kills: self.kills.read(),
            dead: self.dead.read(),
            eliminated: self.eliminated.read(),
            position: self.position.read(),
            rotation: self.rotation.read(),
            animation: self.animation.read(),
        }
    }
}

/// A peer's read-only picture of the room
pub struct RoomMirror {
    replica: Replica,
    round: Field<RoundState>,
    bullets: Field<Vec<Projectile>>,
    hits: Field<Vec<ImpactEffect>>,
    /// Join order
    combatants: Vec<CombatantMirror>,
}

impl RoomMirror {
    pub fn new(replica: Replica) -> Self {
        Self {
            round: replica.observe(Scope::Room, keys::ROUND, RoundState::Lobby),
            bullets: replica.observe(Scope::Room, keys::BULLETS, Vec::new()),
            hits: replica.observe(Scope::Room, keys::HITS, Vec::new()),
            combatants: Vec::new(),
            replica,
        }
    }

    /// Start following a peer's combatant
    pub fn track(&mut self, peer: PeerId) {
        if self.combatants.iter().any(|c| c.peer == peer) {
            return;
        }
        self.combatants.push(CombatantMirror::new(&self.replica, peer));
    }

    pub fn untrack(&mut self, peer: PeerId) {
        self.combatants.retain(|c| c.peer != peer);
    }

    pub fn round(&self) -> RoundState {
        self.round.read()
    }

    pub fn projectiles(&self) -> Vec<Projectile> {
        self.bullets.read()
    }

    pub fn impacts(&self) -> Vec<ImpactEffect> {
        self.hits.read()
    }

    pub fn combatants(&self) -> Vec<CombatantView> {
        self.combatants.iter().map(CombatantMirror::read).collect()
    }

    /// Ranked rows, recomputed on every call
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let views = self.combatants();
        rank(&views)
            .into_iter()
            .enumerate()
            .map(|(i, view)| LeaderboardEntry {
                rank: i + 1,
                peer_id: view.peer_id,
                name: view.name.clone(),
                color: view.color.clone(),
                lives: view.lives_remaining(),
                kills: view.kills,
                eliminated: view.eliminated,
                leader: i == 0,
            })
            .collect()
    }

    /// Status panel for one controller
    pub fn controller_status(&self, peer: PeerId) -> Option<ControllerStatus> {
        let view = self.combatants.iter().find(|c| c.peer == peer)?.read();
        Some(ControllerStatus {
            peer_id: peer,
            health: view.health,
            lives: MAX_LIVES.saturating_sub(view.deaths),
            kills: view.kills,
            dead: view.dead,
            eliminated: view.eliminated,
            weapon: view.weapon,
            round: self.round(),
        })
    }
}

/// Paces frame broadcasts below the simulation rate
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force snapshot on next check (joins, quits, round changes)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    pub fn build(&self, tick: u64, mirror: &RoomMirror) -> ServerMsg {
        let round = mirror.round();
        ServerMsg::Frame {
            tick,
            round,
            countdown: round.countdown_label().map(str::to_string),
            combatants: mirror.combatants(),
            projectiles: mirror.projectiles(),
            impacts: mirror.impacts(),
            leaderboard: mirror.leaderboard(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{Authority, MemoryTransport, StreamSession, Transport};
    use std::sync::Arc;
    use uuid::Uuid;

    fn setup() -> (Arc<dyn Transport>, Replica) {
        let transport: Arc<dyn Transport> = Arc::new(MemoryTransport::new());
        let replica = Replica::new(transport.clone(), Uuid::new_v4());
        (transport, replica)
    }

    #[test]
    fn test_missing_fields_read_as_defaults() {
        let (_, replica) = setup();
        let mut mirror = RoomMirror::new(replica);
        let peer = Uuid::new_v4();
        mirror.track(peer);
        mirror.track(peer);

        let views = mirror.combatants();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].health, MAX_HEALTH);
        assert_eq!(views[0].weapon, None);
        assert_eq!(mirror.round(), RoundState::Lobby);
        assert!(mirror.projectiles().is_empty());
    }

    #[test]
    fn test_leaderboard_crowns_first() {
        let (transport, replica) = setup();
        let Authority::Host(host) = Authority::from_session(&StreamSession::host()) else {
            panic!("stream session must be host");
        };
        let host_replica = Replica::new(transport, Uuid::new_v4());

        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let mut mirror = RoomMirror::new(replica);
        for (peer, deaths, kills, eliminated) in [(c, 3, 0, true), (b, 1, 9, false), (a, 0, 5, false)] {
            host_replica.declare_for(&host, peer, keys::DEATHS, 0u32).write(&deaths);
            host_replica.declare_for(&host, peer, keys::KILLS, 0u32).write(&kills);
            host_replica
                .declare_for(&host, peer, keys::ELIMINATED, false)
                .write(&eliminated);
            mirror.track(peer);
        }

        let board = mirror.leaderboard();
        let order: Vec<PeerId> = board.iter().map(|row| row.peer_id).collect();
        assert_eq!(order, vec![a, b, c]);
        assert_eq!(board.iter().filter(|row| row.leader).count(), 1);
        assert!(board[0].leader);
        assert_eq!((board[0].rank, board[0].lives), (1, MAX_LIVES));
        assert_eq!(board[2].lives, 0);

        let status = mirror.controller_status(b).unwrap();
        assert_eq!((status.lives, status.kills), (MAX_LIVES - 1, 9));
        assert!(mirror.controller_status(Uuid::new_v4()).is_none());

        mirror.untrack(a);
        assert_eq!(mirror.leaderboard()[0].peer_id, b);
    }

    #[test]
    fn test_snapshot_pacing() {
        let mut builder = SnapshotBuilder::new(3);
        let sent: Vec<bool> = (0..6).map(|_| builder.should_send()).collect();
        assert_eq!(sent, vec![false, false, true, false, false, true]);

        builder.force_next();
        assert!(builder.should_send());
    }

    #[test]
    fn test_frame_carries_countdown_label() {
        let (transport, replica) = setup();
        let Authority::Host(host) = Authority::from_session(&StreamSession::host()) else {
            panic!("stream session must be host");
        };
        Replica::new(transport, Uuid::new_v4())
            .declare_shared(&host, keys::ROUND, RoundState::Lobby)
            .write(&RoundState::Countdown { step: 1 });

        let mirror = RoomMirror::new(replica);
        let ServerMsg::Frame { countdown, round, .. } = SnapshotBuilder::new(1).build(7, &mirror) else {
            panic!("expected a frame");
        };
        assert_eq!(round, RoundState::Countdown { step: 1 });
        assert_eq!(countdown.as_deref(), Some("2"));
    }
}
