//! Main application entry point (native).

use idr_app::{App, AppConfig, AppError};
use idr_core::ClientConfig;

fn main() {
    env_logger::init();
    log::info!("Starting Interactive Data Relay client");

    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    // Optional first argument: path to a JSON client config.
    let client = match std::env::args().nth(1) {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    }
    .with_env_overrides();

    let mut app = App::new(AppConfig {
        client,
        ..AppConfig::default()
    });
    app.run()
}
