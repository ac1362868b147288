// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Core backend-lib functionality for the watch-party server.

pub mod codes;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod presence;
pub mod store;
pub mod whiteboard;
pub mod ws_router;

use std::sync::Arc;

use crate::config::Settings;
use crate::coordinator::RoomCoordinator;
use crate::store::PartyStore;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Durable storage backend
    pub store: Arc<dyn PartyStore>,
    /// Real-time room coordinator
    pub coordinator: Arc<RoomCoordinator>,
    /// Settings manager
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Create a new application state
    pub fn new(store: Arc<dyn PartyStore>, settings: Settings) -> Self {
        let coordinator = Arc::new(RoomCoordinator::new(Arc::clone(&store)));
        Self {
            store,
            coordinator,
            settings: Arc::new(settings),
        }
    }
}
