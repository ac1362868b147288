// ============================
// crates/backend-lib/src/handlers/mod.rs
// ============================
//! REST surface for durable party data.
//!
//! Everything here is plain request/response; nothing in these modules
//! touches a live room. The coordinator picks up durable changes lazily
//! (late joiners fetch history and media state over these endpoints).

pub mod feedback;
pub mod media;
pub mod messages;
pub mod participants;
pub mod parties;

use axum::routing::{delete, get, patch, post, put};
use axum::Router;

use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/parties", post(parties::create).get(parties::list))
        .route(
            "/api/parties/{id}",
            get(parties::get).patch(parties::update).delete(parties::remove),
        )
        .route("/api/parties/code/{code}", get(parties::by_code))
        .route("/api/parties/{id}/participants", get(participants::list))
        .route("/api/participants/join", post(participants::join))
        .route("/api/participants/{id}", patch(participants::update))
        .route("/api/participants/{id}/leave", post(participants::leave))
        .route(
            "/api/parties/{id}/messages",
            post(messages::create).get(messages::list),
        )
        .route("/api/messages/{id}", delete(messages::remove))
        .route("/api/media/{party_id}", get(media::get))
        .route("/api/media", put(media::upsert))
        .route("/api/feedback", post(feedback::create))
        .with_state(state)
}
