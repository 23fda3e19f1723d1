use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use checklist_server::{
    api,
    config::{ServerArgs, StoreConfig, STORE_KEY_VAR, STORE_URL_VAR},
    store::StoreHandle,
    AppState,
};
use tracing_subscriber::EnvFilter;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> checklist_server::errors::ServerResult<()> {
    let args = ServerArgs::parse();

    let filter = match &args.log {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("checklist_server=debug,tower_http=debug")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let store = match StoreConfig::from_env() {
        Some(config) => match StoreHandle::open(&config) {
            Ok(store) => {
                tracing::info!(backend = store.backend(), url = %config.url, "Store configured");
                Some(store)
            }
            Err(e) => {
                tracing::error!(%e, "Failed to open store");
                return Ok(());
            }
        },
        None => {
            tracing::warn!(
                "{} / {} not set, serving the built-in checklist only",
                STORE_URL_VAR,
                STORE_KEY_VAR
            );
            None
        }
    };

    let state = Arc::new(AppState::new(store));
    let max_idle = args.session_idle();
    state
        .sessions
        .spawn_sweeper(max_idle, max_idle.clamp(Duration::from_secs(1), SWEEP_INTERVAL));
    let app = api::router(state);

    let addr = args.bind_address();
    tracing::info!("Starting checklist server on {}", addr);

    if let Err(e) = api::serve(&addr, app).await {
        tracing::error!(%e, addr = %addr, "Server stopped");
        return Err(e);
    }

    Ok(())
}
