//! Headless application shell.
//!
//! Wires the store, the drag controller and the sync client together and
//! logs every state change. A visual front end would call
//! [`App::handle_pointer`] and render [`App::render_positions`].

use std::rc::Rc;
use std::time::{Duration, Instant};

use idr_core::{
    ClientConfig, ConfigError, Dataset, DragController, DragUpdate, GatewayError, GatewayEvent,
    NativeWebSocket, PointId, PointerEvent, Store, StoreState, SyncClient, SyncError, Transport,
};
use kurbo::Point;
use thiserror::Error;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Connection error: {0}")]
    Sync(#[from] SyncError),
    #[error("Sync error: {0}")]
    Gateway(#[from] GatewayError),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub client: ClientConfig,
    /// Pause between polls of the connection.
    pub tick: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            tick: Duration::from_millis(16),
        }
    }
}

/// Point under `pointer`, topmost first. Returns its id and display position.
pub fn hit_test(dataset: &Dataset, pointer: Point) -> Option<(PointId, Point)> {
    dataset
        .iter()
        .rev()
        .find(|p| p.position().distance(pointer) <= p.radius)
        .map(|p| (p.id.clone(), p.position()))
}

fn log_state(state: &Rc<StoreState>) {
    log::info!(
        "State changed: {} points, {} todos",
        state.dataset.len(),
        state.todos.len()
    );
    for point in state.dataset.iter() {
        log::debug!("  {} at ({}, {}) [{}]", point.id, point.x, point.y, point.color);
    }
}

/// Main application struct.
pub struct App<T: Transport = NativeWebSocket> {
    config: AppConfig,
    client: SyncClient<T>,
    drag: DragController,
}

impl App<NativeWebSocket> {
    /// Create an application talking to the configured server.
    pub fn new(config: AppConfig) -> Self {
        Self::with_transport(config, NativeWebSocket::new())
    }
}

impl<T: Transport> App<T> {
    pub fn with_transport(config: AppConfig, transport: T) -> Self {
        let store = Store::new();
        store.subscribe(log_state);
        let client = SyncClient::new(transport, store, &config.client);
        Self {
            config,
            client,
            drag: DragController::new(),
        }
    }

    pub fn store(&self) -> &Store {
        self.client.store()
    }

    pub fn client(&self) -> &SyncClient<T> {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut SyncClient<T> {
        &mut self.client
    }

    /// Route a pointer event. A finished drag is committed to the store and
    /// reported to the server.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> Result<DragUpdate, AppError> {
        let state = self.store().get_state();
        let update = self
            .drag
            .handle_event(event, |pointer| hit_test(&state.dataset, pointer));
        if let DragUpdate::Committed(committed) = &update {
            self.client.commit_move(committed.clone())?;
        }
        Ok(update)
    }

    /// Positions to draw, with the dragged point at its optimistic position.
    pub fn render_positions(&self) -> Vec<(PointId, Point)> {
        self.store()
            .get_state()
            .dataset
            .iter()
            .map(|p| {
                let pos = self.drag.override_position(&p.id).unwrap_or(p.position());
                (p.id.clone(), pos)
            })
            .collect()
    }

    /// Poll once. Returns false once the connection is lost for good.
    pub fn tick(&mut self, now: Instant) -> Result<bool, AppError> {
        for event in self.client.poll(now)? {
            match event {
                GatewayEvent::Connected => log::info!("Connected to server"),
                GatewayEvent::SnapshotApplied { points } => {
                    log::info!("Snapshot with {} points", points)
                }
                GatewayEvent::MoveAcknowledged(payload) => log::debug!("Move ok: {}", payload),
                GatewayEvent::Disconnected => {
                    if self.drag.cancel() {
                        log::debug!("Drag dropped with the connection");
                    }
                    log::warn!("Disconnected, will retry");
                }
                GatewayEvent::ServerError(message) => log::warn!("Server error: {}", message),
                GatewayEvent::PersistentDisconnect => {
                    log::error!("Server unreachable, giving up");
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Connect and keep polling until the connection is lost for good.
    pub fn run(&mut self) -> Result<(), AppError> {
        self.client.start()?;
        while self.tick(Instant::now())? {
            std::thread::sleep(self.config.tick);
        }
        Ok(())
    }
}
