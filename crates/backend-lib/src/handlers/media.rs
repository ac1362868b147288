// ============================
// crates/backend-lib/src/handlers/media.rs
// ============================
//! Durable media state, one row per party.
//!
//! The row is created lazily on first read and patched field-by-field on
//! write, so clients can sync a single knob (say, volume) without
//! clobbering the rest.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use watchparty_common::MediaProvider;

use crate::error::AppError;
use crate::models::{MediaState, PartyId};
use crate::AppState;

pub async fn get(
    State(state): State<AppState>,
    Path(party): Path<PartyId>,
) -> Result<Json<MediaState>, AppError> {
    match state.store.media_state(party).await? {
        Some(existing) => Ok(Json(existing)),
        None => {
            let fresh = MediaState::empty(party);
            state.store.upsert_media_state(&fresh).await?;
            Ok(Json(fresh))
        },
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertMediaRequest {
    pub party: PartyId,
    pub video_url: Option<String>,
    pub provider: Option<MediaProvider>,
    pub current_time: Option<f64>,
    pub is_playing: Option<bool>,
    pub playback_rate: Option<f64>,
    pub volume: Option<f64>,
}

pub async fn upsert(
    State(state): State<AppState>,
    Json(req): Json<UpsertMediaRequest>,
) -> Result<Json<MediaState>, AppError> {
    let mut media = state
        .store
        .media_state(req.party)
        .await?
        .unwrap_or_else(|| MediaState::empty(req.party));

    if let Some(video_url) = req.video_url {
        media.video_url = video_url;
    }
    if let Some(provider) = req.provider {
        media.provider = provider;
    }
    if let Some(current_time) = req.current_time {
        media.current_time = current_time;
    }
    if let Some(is_playing) = req.is_playing {
        media.is_playing = is_playing;
    }
    if let Some(playback_rate) = req.playback_rate {
        media.playback_rate = playback_rate;
    }
    if let Some(volume) = req.volume {
        media.volume = volume;
    }
    media.last_updated = Utc::now();

    state.store.upsert_media_state(&media).await?;
    Ok(Json(media))
}
