//! Interactive Data Relay layout server
//!
//! Serves a point snapshot to each client and acknowledges the moves they
//! report. Positions are kept in a shared last-writer-wins table, so a
//! client that (re)connects sees every move made so far.
//!
//! ## Protocol
//!
//! Frames are JSON `{"event": ..., "data": ...}`:
//! ```json
//! { "event": "request_initial_data" }
//! { "event": "inform_client_move", "data": { "id": "p3", "x": 1.5, "y": -0.2 } }
//! ```

mod datasets;

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use idr_core::{ClientMessage, MoveReport, PointRecord, ServerMessage};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default bind address
const DEFAULT_ADDR: &str = "127.0.0.1:9990";
/// Environment variable overriding the bind address
const ADDR_ENV: &str = "IDR_SERVER_ADDR";
/// Environment variable naming a JSON dataset file
const DATASET_ENV: &str = "IDR_DATASET";

/// Shared application state
struct AppState {
    /// Snapshot order and initial records
    records: Vec<PointRecord>,
    /// Latest reported position per point id
    positions: DashMap<String, (f64, f64)>,
}

impl AppState {
    fn new(records: Vec<PointRecord>) -> Self {
        let positions = records
            .iter()
            .filter_map(|r| r.id.clone().map(|id| (id, (r.x, r.y))))
            .collect();
        Self { records, positions }
    }

    /// Current snapshot: initial records with the latest positions.
    fn snapshot(&self) -> Vec<PointRecord> {
        self.records
            .iter()
            .map(|record| {
                let mut record = record.clone();
                if let Some(pos) = record.id.as_ref().and_then(|id| self.positions.get(id)) {
                    (record.x, record.y) = *pos;
                }
                record
            })
            .collect()
    }

    /// Record a move. Returns false for unknown ids.
    fn apply_move(&self, report: &MoveReport) -> bool {
        match self.positions.get_mut(&report.id) {
            Some(mut pos) => {
                *pos = (report.x, report.y);
                true
            }
            None => false,
        }
    }

    /// Answer one text frame.
    fn respond(&self, peer_id: &str, text: &str) -> ServerMessage {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(ClientMessage::RequestInitialData) => {
                let snapshot = self.snapshot();
                info!("Sending {} points to {}", snapshot.len(), peer_id);
                ServerMessage::InitialData(snapshot)
            }
            Ok(ClientMessage::InformClientMove(report)) => {
                if !self.apply_move(&report) {
                    warn!("Move of unknown point {} from {}", report.id, peer_id);
                    return ServerMessage::Error {
                        message: format!("Unknown point: {}", report.id),
                    };
                }
                debug!("Client {} moved {} to ({}, {})", peer_id, report.id, report.x, report.y);
                ServerMessage::ClientMoveOk(json!({
                    "id": report.id,
                    "x": report.x,
                    "y": report.y,
                    "random_color": random_color(),
                }))
            }
            Err(e) => {
                warn!("Invalid message from {}: {}", peer_id, e);
                ServerMessage::Error {
                    message: format!("Invalid message: {}", e),
                }
            }
        }
    }
}

/// A random `#RRGGBB` colour.
fn random_color() -> String {
    let bytes = Uuid::new_v4().into_bytes();
    format!("#{:02X}{:02X}{:02X}", bytes[0], bytes[1], bytes[2])
}

fn load_records() -> Result<Vec<PointRecord>, Box<dyn std::error::Error>> {
    match std::env::var(DATASET_ENV) {
        Ok(path) => {
            let records = datasets::load(&path)?;
            info!("Loaded {} points from {}", records.len(), path);
            Ok(records)
        }
        Err(_) => Ok(datasets::builtin()),
    }
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "idr_server=info,tower_http=info".into()),
        )
        .init();

    let state = Arc::new(AppState::new(load_records()?));

    let addr: SocketAddr = std::env::var(ADDR_ENV)
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Layout server listening on {}", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Index page
async fn index() -> &'static str {
    "Interactive Data Relay server - connect via WebSocket at /ws"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn send_json(
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> bool {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to encode reply: {}", e);
            return true;
        }
    };
    sender.send(Message::Text(json.into())).await.is_ok()
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let peer_id = Uuid::new_v4().to_string();
    info!("New connection: {}", peer_id);

    let (mut sender, mut receiver) = socket.split();

    let hello = ServerMessage::Hello(json!({ "data": "Hello from the layout server" }));
    if !send_json(&mut sender, &hello).await {
        return;
    }

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let reply = state.respond(&peer_id, text.as_str());
                if !send_json(&mut sender, &reply).await {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {} // Ignore binary, ping, pong
            Err(e) => {
                warn!("WebSocket error for {}: {}", peer_id, e);
                break;
            }
        }
    }

    info!("Connection closed: {}", peer_id);
}
