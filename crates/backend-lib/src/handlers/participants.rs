// ============================
// crates/backend-lib/src/handlers/participants.rs
// ============================
//! Durable participant membership.
//!
//! Joining is where the party's cached counter is kept honest: a
//! signed-in user re-joining a party they already have a record in
//! reuses that record without touching the counter, while anonymous
//! guests always get a fresh record (there is no identity to dedupe on).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use metrics::counter;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::AppError;
use crate::metrics as keys;
use crate::models::{Participant, ParticipantId, PartyId, UserId};
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub party: PartyId,
    #[serde(default)]
    pub user: Option<UserId>,
    pub display_name: String,
    #[serde(default)]
    pub avatar: String,
    /// Signed-in users may still join anonymously; guests always are.
    #[serde(default)]
    pub is_anonymous: Option<bool>,
}

pub async fn join(
    State(state): State<AppState>,
    Json(req): Json<JoinRequest>,
) -> Result<(StatusCode, Json<Participant>), AppError> {
    if req.display_name.trim().is_empty() {
        return Err(AppError::InvalidInput("display name cannot be empty".into()));
    }
    let party = state
        .store
        .party(req.party)
        .await?
        .ok_or(AppError::PartyNotFound)?;

    // reuse the existing record for a returning signed-in user
    if let Some(user) = req.user {
        if let Some(mut existing) = state.store.participant_for_user(req.party, user).await? {
            existing.display_name = req.display_name;
            existing.avatar = req.avatar;
            existing.last_active_at = Utc::now();
            state.store.update_participant(&existing).await?;
            state.store.touch_party(req.party).await?;
            return Ok((StatusCode::OK, Json(existing)));
        }
    }

    let mut participant = Participant::new(req.party, req.user, req.display_name);
    participant.avatar = req.avatar;
    participant.is_anonymous = req.is_anonymous.unwrap_or(req.user.is_none());
    participant.is_host = req.user == Some(party.host);

    state.store.insert_participant(&participant).await?;
    state.store.increment_participants(req.party).await?;
    counter!(keys::PARTICIPANT_JOINED).increment(1);
    info!(party = %req.party, participant = %participant.id, "participant joined");
    Ok((StatusCode::CREATED, Json(participant)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateParticipantRequest {
    pub display_name: Option<String>,
    pub avatar: Option<String>,
    pub is_muted: Option<bool>,
    pub is_video_on: Option<bool>,
    pub is_screen_sharing: Option<bool>,
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<ParticipantId>,
    Json(req): Json<UpdateParticipantRequest>,
) -> Result<Json<Participant>, AppError> {
    let mut participant = state
        .store
        .participant(id)
        .await?
        .ok_or(AppError::ParticipantNotFound)?;

    if let Some(display_name) = req.display_name {
        if display_name.trim().is_empty() {
            return Err(AppError::InvalidInput("display name cannot be empty".into()));
        }
        participant.display_name = display_name;
    }
    if let Some(avatar) = req.avatar {
        participant.avatar = avatar;
    }
    if let Some(is_muted) = req.is_muted {
        participant.is_muted = is_muted;
    }
    if let Some(is_video_on) = req.is_video_on {
        participant.is_video_on = is_video_on;
    }
    if let Some(is_screen_sharing) = req.is_screen_sharing {
        participant.is_screen_sharing = is_screen_sharing;
    }
    participant.last_active_at = Utc::now();

    state.store.update_participant(&participant).await?;
    Ok(Json(participant))
}

/// Clean REST leave. Safe to race against the socket-disconnect cleanup:
/// whoever deletes the record first also decrements the counter, and the
/// loser finds nothing to do.
pub async fn leave(
    State(state): State<AppState>,
    Path(id): Path<ParticipantId>,
) -> Result<Json<Value>, AppError> {
    if let Some(participant) = state.store.participant(id).await? {
        if state.store.delete_participant(id).await? {
            state.store.decrement_participants(participant.party).await?;
        }
    }
    Ok(Json(json!({ "left": true })))
}

pub async fn list(
    State(state): State<AppState>,
    Path(id): Path<PartyId>,
) -> Result<Json<Vec<Participant>>, AppError> {
    if state.store.party(id).await?.is_none() {
        return Err(AppError::PartyNotFound);
    }
    Ok(Json(state.store.list_participants(id).await?))
}
