//! Interactive Data Relay core library
//!
//! Platform-agnostic state, drag handling and server sync for the
//! interactive point-layout client.

pub mod action;
pub mod client;
pub mod config;
pub mod dataset;
pub mod dispatcher;
pub mod drag;
pub mod gateway;
pub mod input;
pub mod point;
pub mod protocol;
pub mod store;
pub mod sync;
pub mod todo;

pub use action::Action;
pub use client::SyncClient;
pub use config::{ClientConfig, ConfigError};
pub use dataset::Dataset;
pub use dispatcher::{DispatchError, Dispatcher, SubscriptionId};
pub use drag::{CommittedMove, DragController, DragPhase, DragSession, DragUpdate};
pub use gateway::{GatewayError, GatewayEvent, GatewayPhase, SyncGateway};
pub use input::{MouseButton, PointerEvent};
pub use point::{DataPoint, PointId};
pub use protocol::{ClientMessage, MoveReport, PointRecord, ServerMessage};
pub use store::{Store, StoreState};
pub use sync::{ConnectionState, NativeWebSocket, SyncError, SyncEvent, Transport};
pub use todo::Todo;
