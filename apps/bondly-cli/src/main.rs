mod bridge;
mod commands;
mod config;
mod logging;
mod state;
mod view;

use std::{
    process,
    sync::{Arc, Mutex},
};

use client_core::ClientCommand;
use client_http::{HttpApi, RuntimeConfig, spawn_runtime};
use client_platform::FileDurableStore;
use tracing::{error, info};

use crate::{bridge::CliBridge, config::CliConfig, state::AppState};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    logging::init();

    let config = match CliConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("bondly-cli: {err}");
            process::exit(2);
        }
    };
    info!(
        api_url = %config.api_url,
        session_path = %config.session_path().display(),
        network_policy = %config.network_policy,
        "starting bondly-cli"
    );

    let api = match HttpApi::new(config.api_url.as_str()) {
        Ok(api) => api,
        Err(err) => {
            eprintln!("bondly-cli: {err}");
            process::exit(2);
        }
    };
    let store = FileDurableStore::new(config.session_path());
    let handle = spawn_runtime(
        api,
        store,
        RuntimeConfig {
            network_policy: config.network_policy,
            ..RuntimeConfig::default()
        },
    );

    let state = Arc::new(Mutex::new(AppState::new()));
    let bridge = CliBridge::start(handle, state, commands::print_lines);

    if let Err(err) = bridge.dispatch(ClientCommand::RestoreSession).await {
        error!(error = %err, "could not restore session");
        process::exit(1);
    }

    if let Err(err) = commands::run(&bridge, &config).await {
        error!(error = %err, "repl stopped");
        eprintln!("bondly-cli: {err}");
        process::exit(1);
    }
}
