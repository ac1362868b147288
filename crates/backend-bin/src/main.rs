use std::sync::Arc;

use backend_lib::{config, handlers, store::FlatFileStore, ws_router, AppState};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = config::load_settings()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let store = Arc::new(FlatFileStore::new(&settings.data_dir)?);
    let state = AppState::new(store, settings.clone());

    // Drop the in-memory caches of rooms nobody has rejoined.
    let coordinator = Arc::clone(&state.coordinator);
    let ttl = settings.empty_room_ttl();
    let mut sweep = tokio::time::interval(settings.sweep_interval());
    tokio::spawn(async move {
        loop {
            sweep.tick().await;
            coordinator.sweep_idle(ttl);
        }
    });

    let app = ws_router::create_router(state.clone())
        .merge(handlers::create_router(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = TcpListener::bind(settings.bind_addr).await?;
    info!(addr = %settings.bind_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
