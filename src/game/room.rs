//! Room task: owns the round controller and runs the host tick loop

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::interval;
use tracing::{debug, info};

use crate::config::RoomOptions;
use crate::sync::{HostToken, PeerId, Replica, Transport};
use crate::util::time::{tick_delta, unix_millis, SIMULATION_TPS, SNAPSHOT_TPS, TICK_DURATION_MICROS};
use crate::ws::protocol::{ControllerStatus, LeaderboardEntry, ServerMsg};

use super::physics::ArenaPhysics;
use super::round::{RoomError, RoundController, RoundState};
use super::scene::ArenaScene;
use super::snapshot::{RoomMirror, SnapshotBuilder};
use super::spawn::{SpawnAllocator, ROUND_CAPACITY};
use super::{Profile, Weapon};

/// Requests into the room task
pub enum RoomCommand {
    Join {
        peer: PeerId,
        profile: Profile,
        reply: oneshot::Sender<Result<Weapon, RoomError>>,
    },
    Quit {
        peer: PeerId,
        reply: oneshot::Sender<bool>,
    },
    Launch {
        reply: oneshot::Sender<bool>,
    },
    Reset {
        reply: oneshot::Sender<RoundState>,
    },
    Leaderboard {
        reply: oneshot::Sender<Vec<LeaderboardEntry>>,
    },
    Status {
        peer: PeerId,
        reply: oneshot::Sender<Option<ControllerStatus>>,
    },
}

/// Handle to the running room
#[derive(Clone)]
pub struct RoomHandle {
    commands: mpsc::Sender<RoomCommand>,
    frames: broadcast::Sender<ServerMsg>,
    transport: Arc<dyn Transport>,
    peer_count: Arc<AtomicUsize>,
}

impl RoomHandle {
    pub fn peer_count(&self) -> usize {
        self.peer_count.load(Ordering::Relaxed)
    }

    /// Fields currently held by the replication layer
    pub fn replicated_fields(&self) -> usize {
        self.transport.len()
    }

    /// Frames broadcast at the snapshot rate
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.frames.subscribe()
    }

    /// Replication view for a controller peer; it owns its `input` field
    pub fn controller_replica(&self, peer: PeerId) -> Replica {
        Replica::new(self.transport.clone(), peer)
    }

    pub async fn join(&self, peer: PeerId, profile: Profile) -> Result<Weapon, RoomError> {
        self.request(|reply| RoomCommand::Join { peer, profile, reply })
            .await?
    }

    pub async fn quit(&self, peer: PeerId) -> Result<bool, RoomError> {
        self.request(|reply| RoomCommand::Quit { peer, reply }).await
    }

    pub async fn launch(&self) -> Result<bool, RoomError> {
        self.request(|reply| RoomCommand::Launch { reply }).await
    }

    pub async fn reset(&self) -> Result<RoundState, RoomError> {
        self.request(|reply| RoomCommand::Reset { reply }).await
    }

    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, RoomError> {
        self.request(|reply| RoomCommand::Leaderboard { reply }).await
    }

    pub async fn controller_status(&self, peer: PeerId) -> Result<Option<ControllerStatus>, RoomError> {
        self.request(|reply| RoomCommand::Status { peer, reply }).await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| RoomError::Closed)?;
        response.await.map_err(|_| RoomError::Closed)
    }
}

/// The host's room
pub struct Room {
    controller: RoundController,
    mirror: RoomMirror,
    commands: mpsc::Receiver<RoomCommand>,
    frames: broadcast::Sender<ServerMsg>,
    snapshot_builder: SnapshotBuilder,
    peer_count: Arc<AtomicUsize>,
    tick: u64,
    /// Round state seen at the end of the previous tick
    last_round: RoundState,
}

impl Room {
    /// Create the room. Only a host can.
    pub fn new(
        host: HostToken,
        transport: Arc<dyn Transport>,
        local: PeerId,
        options: &RoomOptions,
    ) -> (Self, RoomHandle) {
        let (command_tx, command_rx) = mpsc::channel(256);
        let (frame_tx, _) = broadcast::channel(64);
        let peer_count = Arc::new(AtomicUsize::new(0));

        let seed = options.spawn_seed.unwrap_or_else(rand::random);
        let replica = Replica::new(transport.clone(), local);
        let replica_peer = replica.local_peer();
        let spawns = SpawnAllocator::new(Box::new(ArenaScene::default()), ROUND_CAPACITY, seed);
        let controller = RoundController::new(
            host,
            replica.clone(),
            spawns,
            Box::new(ArenaPhysics::new()),
            options.max_peers,
            seed.rotate_left(32),
        );

        let handle = RoomHandle {
            commands: command_tx,
            frames: frame_tx.clone(),
            transport,
            peer_count: peer_count.clone(),
        };

        let room = Self {
            controller,
            mirror: RoomMirror::new(replica),
            commands: command_rx,
            frames: frame_tx,
            snapshot_builder: SnapshotBuilder::new(SIMULATION_TPS / SNAPSHOT_TPS),
            peer_count,
            tick: 0,
            last_round: RoundState::Lobby,
        };

        info!(
            host_peer = %replica_peer,
            max_peers = options.max_peers,
            seed,
            "Room created"
        );
        (room, handle)
    }

    /// Run the host tick loop until every handle is dropped
    pub async fn run(mut self) {
        info!("Room open");

        let mut tick_interval = interval(Duration::from_micros(TICK_DURATION_MICROS));
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;

            if !self.process_commands() {
                info!("All room handles dropped, closing room");
                break;
            }

            self.tick += 1;
            self.controller.tick(unix_millis(), tick_delta());

            let round = self.controller.state();
            if round != self.last_round {
                self.round_changed(round);
            }

            if self.snapshot_builder.should_send() {
                let frame = self.snapshot_builder.build(self.tick, &self.mirror);
                // No receivers is fine
                let _ = self.frames.send(frame);
            }
        }
    }

    /// Drain pending commands. Returns false once no handle is left.
    fn process_commands(&mut self) -> bool {
        loop {
            match self.commands.try_recv() {
                Ok(command) => self.handle_command(command),
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    fn handle_command(&mut self, command: RoomCommand) {
        match command {
            RoomCommand::Join {
                peer,
                profile,
                reply,
            } => {
                let result = self.controller.join(peer, profile);
                if result.is_ok() {
                    self.mirror.track(peer);
                    self.roster_changed();
                }
                let _ = reply.send(result);
            }
            RoomCommand::Quit { peer, reply } => {
                let removed = self.controller.quit(peer);
                if removed {
                    self.mirror.untrack(peer);
                    self.roster_changed();
                }
                let _ = reply.send(removed);
            }
            RoomCommand::Launch { reply } => {
                let launched = self.controller.launch(unix_millis());
                self.snapshot_builder.force_next();
                let _ = reply.send(launched);
            }
            RoomCommand::Reset { reply } => {
                self.controller.reset();
                self.snapshot_builder.force_next();
                let _ = reply.send(self.controller.state());
            }
            RoomCommand::Leaderboard { reply } => {
                let _ = reply.send(self.mirror.leaderboard());
            }
            RoomCommand::Status { peer, reply } => {
                let _ = reply.send(self.mirror.controller_status(peer));
            }
        }
    }

    fn round_changed(&mut self, round: RoundState) {
        self.last_round = round;
        self.snapshot_builder.force_next();

        let Some(winner) = self.controller.winner() else {
            debug!(round = ?round, "Round state changed");
            return;
        };
        let name = self
            .controller
            .combatant(winner)
            .map(|c| c.profile.name.as_str())
            .unwrap_or_default();
        info!(winner_id = %winner, name, "Round over");
    }

    fn roster_changed(&mut self) {
        self.peer_count.store(self.controller.len(), Ordering::Relaxed);
        self.snapshot_builder.force_next();
        debug!(player_count = self.controller.len(), "Roster changed");
    }
}
