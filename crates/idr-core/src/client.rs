//! Sync client: drives a [`Transport`] through a [`SyncGateway`].
//!
//! Call [`SyncClient::poll`] once per frame. It drains transport events,
//! flushes queued frames, and reconnects after a delay when the connection
//! is gone.

use std::time::{Duration, Instant};

use crate::config::ClientConfig;
use crate::drag::CommittedMove;
use crate::gateway::{GatewayError, GatewayEvent, GatewayPhase, SyncGateway};
use crate::store::Store;
use crate::sync::{ConnectionState, SyncError, Transport};

/// Owns the transport and the gateway of one client session.
pub struct SyncClient<T: Transport> {
    transport: T,
    gateway: SyncGateway,
    url: String,
    reconnect_delay: Duration,
    /// When the next reconnect attempt is due.
    reconnect_at: Option<Instant>,
    started: bool,
}

impl<T: Transport> SyncClient<T> {
    pub fn new(transport: T, store: Store, config: &ClientConfig) -> Self {
        Self {
            transport,
            gateway: SyncGateway::new(store, config),
            url: config.server_url.clone(),
            reconnect_delay: config.reconnect_delay(),
            reconnect_at: None,
            started: false,
        }
    }

    pub fn store(&self) -> &Store {
        self.gateway.store()
    }

    pub fn gateway(&self) -> &SyncGateway {
        &self.gateway
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn phase(&self) -> GatewayPhase {
        self.gateway.phase()
    }

    /// Open the connection. URL errors are returned right away; anything
    /// else shows up through `poll`.
    pub fn start(&mut self) -> Result<(), SyncError> {
        log::info!("Client connect: {}", self.url);
        self.started = true;
        self.reconnect_at = None;
        self.transport.connect(&self.url)
    }

    /// Close the connection and stop reconnecting.
    pub fn stop(&mut self) {
        self.started = false;
        self.reconnect_at = None;
        self.transport.disconnect();
        if self.gateway.phase() != GatewayPhase::Disconnected {
            self.gateway.on_disconnected();
        }
    }

    /// Pump the session once.
    pub fn poll(&mut self, now: Instant) -> Result<Vec<GatewayEvent>, GatewayError> {
        let mut events = Vec::new();
        for event in self.transport.poll_events() {
            events.extend(self.gateway.handle_event(event)?);
        }

        self.maybe_reconnect(now, &mut events);
        self.flush();
        Ok(events)
    }

    /// Report a finished drag. Returns whether it was applied and sent.
    pub fn commit_move(&mut self, committed: CommittedMove) -> Result<bool, GatewayError> {
        let applied = self.gateway.commit_move(committed)?;
        self.flush();
        Ok(applied)
    }

    fn maybe_reconnect(&mut self, now: Instant, events: &mut Vec<GatewayEvent>) {
        if !self.started
            || self.gateway.phase() != GatewayPhase::Disconnected
            || self.gateway.is_persistently_disconnected()
            || matches!(
                self.transport.state(),
                ConnectionState::Connecting | ConnectionState::Connected
            )
        {
            self.reconnect_at = None;
            return;
        }

        match self.reconnect_at {
            None => self.reconnect_at = Some(now + self.reconnect_delay),
            Some(due) if now >= due => {
                self.reconnect_at = None;
                log::info!("Reconnecting to {}", self.url);
                if let Err(e) = self.transport.connect(&self.url) {
                    log::warn!("Reconnect failed: {}", e);
                    events.extend(self.gateway.note_failed_attempt());
                }
            }
            Some(_) => {}
        }
    }

    fn flush(&mut self) {
        for msg in self.gateway.take_outgoing() {
            if let Err(e) = self.transport.send(&msg) {
                log::warn!("Dropping outgoing message: {}", e);
            }
        }
    }
}
