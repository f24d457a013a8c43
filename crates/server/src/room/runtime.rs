//! Room runtime.
//!
//! Each room runs as its own tokio task. Joins, leaves, keypresses,
//! snapshot requests and the three timers (start delay, tick interval,
//! disposal delay) are all serialized through one `select!` loop, so the
//! [`Room`] never needs a lock.

use super::{JoinOutcome, Room, RoomError, RoomId, RoomPhase};
use crate::config::TimingConfig;
use protocol::state::{RoomSnapshot, StateDelta};
use protocol::SessionId;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{interval_at, sleep_until, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};

const COMMAND_CAPACITY: usize = 64;
const UPDATE_CAPACITY: usize = 64;

/// Message published by a room to every joined session.
#[derive(Debug, Clone)]
pub enum RoomUpdate {
    /// State changed. `seq` increases by one per published delta.
    Delta { seq: u64, delta: Arc<StateDelta> },
    /// Both players are in; the start countdown has begun.
    GameReady,
    /// The room was disposed. No further updates follow.
    Closed,
}

/// Published snapshot together with the sequence number of the last delta it includes.
#[derive(Debug, Clone)]
pub struct VersionedSnapshot {
    pub seq: u64,
    pub snapshot: RoomSnapshot,
}

/// Handed to a session once its join is accepted.
#[derive(Debug)]
pub struct JoinAccepted {
    pub state: VersionedSnapshot,
    /// Subscribed at the same point `state` was taken.
    pub updates: broadcast::Receiver<RoomUpdate>,
}

enum RoomCommand {
    Join {
        session_id: SessionId,
        reply: oneshot::Sender<Result<JoinAccepted, RoomError>>,
    },
    Leave {
        session_id: SessionId,
    },
    Keypress {
        session_id: SessionId,
        key: String,
    },
    Snapshot {
        reply: oneshot::Sender<VersionedSnapshot>,
    },
}

/// Cheap, cloneable handle to a running room.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    id: RoomId,
    mode: Arc<str>,
    commands: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    /// True once the room task has exited.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    pub async fn join(&self, session_id: SessionId) -> Result<JoinAccepted, RoomError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(RoomCommand::Join { session_id, reply })
            .await
            .map_err(|_| RoomError::Disposed)?;
        response.await.map_err(|_| RoomError::Disposed)?
    }

    /// Report a lost connection. A room that is already gone needs no notice.
    pub async fn leave(&self, session_id: SessionId) {
        let _ = self.commands.send(RoomCommand::Leave { session_id }).await;
    }

    pub async fn keypress(&self, session_id: SessionId, key: String) {
        let _ = self
            .commands
            .send(RoomCommand::Keypress { session_id, key })
            .await;
    }

    /// Current published state, or `None` if the room is gone.
    pub async fn snapshot(&self) -> Option<VersionedSnapshot> {
        let (reply, response) = oneshot::channel();
        self.commands.send(RoomCommand::Snapshot { reply }).await.ok()?;
        response.await.ok()
    }
}

/// Create a room and spawn its task.
pub fn spawn_room(id: RoomId, mode: &str, timing: TimingConfig) -> RoomHandle {
    let (commands, receiver) = mpsc::channel(COMMAND_CAPACITY);
    let (updates, _) = broadcast::channel(UPDATE_CAPACITY);

    let task = RoomTask {
        room: Room::new(id),
        timing,
        updates,
        published: VersionedSnapshot {
            seq: 0,
            snapshot: RoomSnapshot::default(),
        },
        ticker: None,
        start_at: None,
        dispose_at: None,
    };
    info!("Room {} created (mode {:?})", id, mode);
    tokio::spawn(task.run(receiver));

    RoomHandle {
        id,
        mode: Arc::from(mode),
        commands,
    }
}

struct RoomTask {
    room: Room,
    timing: TimingConfig,
    updates: broadcast::Sender<RoomUpdate>,
    published: VersionedSnapshot,
    /// Repeating simulation timer. Present only while playing.
    ticker: Option<Interval>,
    start_at: Option<Instant>,
    dispose_at: Option<Instant>,
}

impl RoomTask {
    async fn run(mut self, mut commands: mpsc::Receiver<RoomCommand>) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => self.dispose(),
                },
                _ = next_tick(&mut self.ticker) => self.on_tick(),
                _ = deadline(self.start_at) => {
                    self.start_at = None;
                    self.on_start();
                }
                _ = deadline(self.dispose_at) => {
                    self.dispose_at = None;
                    self.dispose();
                }
            }

            if self.room.phase() == RoomPhase::Disposed {
                break;
            }
        }
        debug!("Room {} task finished", self.room.id());
    }

    fn handle_command(&mut self, command: RoomCommand) {
        match command {
            RoomCommand::Join { session_id, reply } => {
                let result = self.room.join(session_id);
                let outcome = match result {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        let _ = reply.send(Err(e));
                        return;
                    }
                };

                // Existing sessions see the new player as a delta; the new
                // session gets it in its full snapshot.
                self.publish();
                let accepted = JoinAccepted {
                    state: self.published.clone(),
                    updates: self.updates.subscribe(),
                };
                let _ = reply.send(Ok(accepted));

                if outcome == JoinOutcome::Ready {
                    let _ = self.updates.send(RoomUpdate::GameReady);
                    self.start_at = Some(Instant::now() + self.timing.start_delay());
                }
            }
            RoomCommand::Leave { session_id } => {
                if self.room.leave(&session_id) {
                    self.publish();
                    if self.room.connected_count() == 0 {
                        info!("Room {}: all sessions left", self.room.id());
                        self.dispose();
                    }
                }
            }
            RoomCommand::Keypress { session_id, key } => {
                if self.room.handle_keypress(&session_id, &key) {
                    self.publish();
                }
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.published.clone());
            }
        }
    }

    fn on_start(&mut self) {
        if !self.room.start() {
            return;
        }
        self.publish();

        let period = self.timing.tick_interval();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.ticker = Some(ticker);
    }

    fn on_tick(&mut self) {
        if self.room.tick().is_some() {
            self.ticker = None;
            self.dispose_at = Some(Instant::now() + self.timing.dispose_delay());
        }
        self.publish();
    }

    fn dispose(&mut self) {
        self.ticker = None;
        self.start_at = None;
        self.dispose_at = None;
        if self.room.dispose() {
            let _ = self.updates.send(RoomUpdate::Closed);
        }
    }

    /// Diff against the last published snapshot and broadcast any change.
    fn publish(&mut self) {
        let snapshot = self.room.snapshot();
        let delta = snapshot.diff(&self.published.snapshot);
        if delta.is_empty() {
            return;
        }

        self.published.seq += 1;
        self.published.snapshot = snapshot;
        let _ = self.updates.send(RoomUpdate::Delta {
            seq: self.published.seq,
            delta: Arc::new(delta),
        });
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn deadline(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
