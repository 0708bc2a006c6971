//! Sync gateway between the store and the layout server.
//!
//! The gateway does no I/O itself. It consumes transport events, turns
//! server messages into store actions, turns committed drags into store
//! actions plus outgoing frames, and queues those frames for the caller to
//! send (see [`crate::client::SyncClient`]).

use serde_json::Value;
use thiserror::Error;

use crate::action::Action;
use crate::config::ClientConfig;
use crate::dataset::Dataset;
use crate::dispatcher::DispatchError;
use crate::drag::CommittedMove;
use crate::protocol::{ClientMessage, MoveReport, ServerMessage};
use crate::store::Store;
use crate::sync::SyncEvent;

/// Gateway errors.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),
    #[error("Encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Where the gateway is in the connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayPhase {
    /// No connection. Committed moves are dropped.
    Disconnected,
    /// Connected, snapshot requested but not received yet.
    AwaitingSnapshot,
    /// Snapshot applied; moves flow both ways.
    Synced,
}

/// Things the caller may want to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    Connected,
    /// A snapshot replaced the dataset.
    SnapshotApplied { points: usize },
    /// The server acknowledged a move. Not applied to state.
    MoveAcknowledged(Value),
    /// The connection dropped; a reconnect will follow.
    Disconnected,
    /// Reconnecting failed too many times in a row.
    PersistentDisconnect,
    /// The server reported an error.
    ServerError(String),
}

/// Bridges transport events and committed drags to the store.
pub struct SyncGateway {
    store: Store,
    phase: GatewayPhase,
    /// Acks that arrived before the snapshot.
    pending_acks: Vec<Value>,
    /// Pending outgoing messages (JSON strings).
    outgoing: Vec<String>,
    /// Connection attempts that failed since the last applied snapshot.
    failed_attempts: u32,
    /// `PersistentDisconnect` was already reported.
    gave_up: bool,
    max_reconnect_attempts: u32,
    suppress_zero_moves: bool,
}

impl SyncGateway {
    /// Create a gateway feeding `store`.
    pub fn new(store: Store, config: &ClientConfig) -> Self {
        Self {
            store,
            phase: GatewayPhase::Disconnected,
            pending_acks: Vec::new(),
            outgoing: Vec::new(),
            failed_attempts: 0,
            gave_up: false,
            max_reconnect_attempts: config.max_reconnect_attempts,
            suppress_zero_moves: config.suppress_zero_moves,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn phase(&self) -> GatewayPhase {
        self.phase
    }

    /// Whether reconnecting has been given up.
    pub fn is_persistently_disconnected(&self) -> bool {
        self.phase == GatewayPhase::Disconnected && self.gave_up
    }

    /// Allow reconnecting again after a persistent disconnect.
    pub fn reset_reconnects(&mut self) {
        self.failed_attempts = 0;
        self.gave_up = false;
    }

    // --- Transport events ---

    /// Feed one transport event.
    pub fn handle_event(&mut self, event: SyncEvent) -> Result<Vec<GatewayEvent>, GatewayError> {
        match event {
            SyncEvent::Connected => Ok(self.on_connected()),
            SyncEvent::Disconnected => Ok(self.on_disconnected()),
            SyncEvent::Message(json) => self.handle_message(&json),
            SyncEvent::Error { message } => {
                log::warn!("Transport error: {}", message);
                Ok(Vec::new())
            }
        }
    }

    /// Socket opened: ask for the snapshot. The attempt only counts as
    /// successful once the snapshot arrives.
    pub fn on_connected(&mut self) -> Vec<GatewayEvent> {
        log::info!("Connected, requesting initial data");
        self.pending_acks.clear();
        self.outgoing.clear();
        self.phase = GatewayPhase::AwaitingSnapshot;
        self.queue(&ClientMessage::RequestInitialData);
        vec![GatewayEvent::Connected]
    }

    /// Socket closed, or a connection attempt failed.
    pub fn on_disconnected(&mut self) -> Vec<GatewayEvent> {
        self.outgoing.clear();
        self.pending_acks.clear();

        match self.phase {
            GatewayPhase::Synced => {
                log::warn!("Connection lost");
                self.phase = GatewayPhase::Disconnected;
                vec![GatewayEvent::Disconnected]
            }
            GatewayPhase::AwaitingSnapshot => {
                log::warn!("Connection lost before the snapshot arrived");
                self.phase = GatewayPhase::Disconnected;
                let mut events = vec![GatewayEvent::Disconnected];
                events.extend(self.note_failed_attempt());
                events
            }
            GatewayPhase::Disconnected => self.note_failed_attempt(),
        }
    }

    /// A connection attempt could not even be started.
    pub fn note_failed_attempt(&mut self) -> Vec<GatewayEvent> {
        self.failed_attempts = self.failed_attempts.saturating_add(1);
        log::warn!(
            "Connection attempt failed ({}/{})",
            self.failed_attempts,
            self.max_reconnect_attempts
        );
        if self.failed_attempts >= self.max_reconnect_attempts && !self.gave_up {
            self.gave_up = true;
            log::error!(
                "Giving up after {} failed connection attempts",
                self.failed_attempts
            );
            return vec![GatewayEvent::PersistentDisconnect];
        }
        Vec::new()
    }

    /// Handle an incoming server frame. Undecodable frames are logged and
    /// ignored.
    pub fn handle_message(&mut self, json: &str) -> Result<Vec<GatewayEvent>, GatewayError> {
        let msg = match serde_json::from_str::<ServerMessage>(json) {
            Ok(msg) => msg,
            Err(e) => {
                log::warn!("Failed to parse server message: {} ({})", json, e);
                return Ok(Vec::new());
            }
        };

        match msg {
            ServerMessage::Hello(payload) => {
                log::info!("Server says hello: {}", payload);
                Ok(Vec::new())
            }
            ServerMessage::InitialData(records) => {
                if self.phase == GatewayPhase::Disconnected {
                    log::warn!("Snapshot received while disconnected, ignoring");
                    return Ok(Vec::new());
                }
                let dataset = Dataset::from_records(records);
                let points = dataset.len();
                log::info!("Server initial data: {} points", points);
                self.store.dispatch(Action::refresh_dataset(dataset))?;
                self.phase = GatewayPhase::Synced;
                self.failed_attempts = 0;
                self.gave_up = false;

                let mut events = vec![GatewayEvent::SnapshotApplied { points }];
                for payload in std::mem::take(&mut self.pending_acks) {
                    events.push(self.acknowledge(payload));
                }
                Ok(events)
            }
            ServerMessage::ClientMoveOk(payload) => match self.phase {
                GatewayPhase::Synced => Ok(vec![self.acknowledge(payload)]),
                GatewayPhase::AwaitingSnapshot => {
                    log::debug!("Ack before snapshot, buffering");
                    self.pending_acks.push(payload);
                    Ok(Vec::new())
                }
                GatewayPhase::Disconnected => Ok(Vec::new()),
            },
            ServerMessage::Error { message } => {
                log::warn!("Server error: {}", message);
                Ok(vec![GatewayEvent::ServerError(message)])
            }
        }
    }

    fn acknowledge(&self, payload: Value) -> GatewayEvent {
        log::info!("Server update client moving: {}", payload);
        GatewayEvent::MoveAcknowledged(payload)
    }

    // --- Local moves ---

    /// Apply a finished drag locally and queue its report.
    ///
    /// Returns `Ok(false)` when the move was dropped: not synced, or a zero
    /// move with suppression on.
    pub fn commit_move(&mut self, committed: CommittedMove) -> Result<bool, GatewayError> {
        if self.phase != GatewayPhase::Synced {
            log::debug!("Not synced, dropping move of '{}'", committed.id);
            return Ok(false);
        }
        if self.suppress_zero_moves && committed.is_zero() {
            return Ok(false);
        }

        log::info!("Client move point: {}", committed.id);
        self.store
            .dispatch(Action::move_point(committed.id.clone(), committed.delta))?;

        // Report where the store put the point. A snapshot may have landed
        // mid-drag, so the drag's own end position can be stale.
        let position = match self.store.get_state().dataset.get(&committed.id) {
            Some(point) => point.position(),
            None => {
                log::debug!("Point '{}' is gone, not reporting move", committed.id);
                return Ok(false);
            }
        };
        self.queue_checked(&ClientMessage::InformClientMove(MoveReport {
            id: committed.id,
            x: position.x,
            y: position.y,
        }))?;
        Ok(true)
    }

    // --- Outgoing queue ---

    /// Take pending outgoing messages (drains the queue).
    pub fn take_outgoing(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outgoing)
    }

    /// Check if there are pending outgoing messages.
    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    fn queue(&mut self, msg: &ClientMessage) {
        if let Err(e) = self.queue_checked(msg) {
            log::error!("Dropping outgoing message: {}", e);
        }
    }

    fn queue_checked(&mut self, msg: &ClientMessage) -> Result<(), GatewayError> {
        self.outgoing.push(serde_json::to_string(msg)?);
        Ok(())
    }
}
