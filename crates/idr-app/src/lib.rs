//! Interactive Data Relay application
//!
//! Headless client shell: configuration, store, drag handling and the
//! server connection.

mod app;

pub use app::{App, AppConfig, AppError, hit_test};
