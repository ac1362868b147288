// ============================
// crates/backend-lib/src/handlers/messages.rs
// ============================
//! Durable chat history. The live fan-out happens over the socket; these
//! endpoints exist so late joiners can backfill.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use metrics::counter;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::AppError;
use crate::metrics as keys;
use crate::models::{Message, PartyId, UserId};
use crate::AppState;
use watchparty_common::MessageKind;

const DEFAULT_LIMIT: usize = 200;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    #[serde(default)]
    pub user: Option<UserId>,
    #[serde(default)]
    pub sender_name: String,
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
}

pub async fn create(
    State(state): State<AppState>,
    Path(party): Path<PartyId>,
    Json(req): Json<CreateMessageRequest>,
) -> Result<(StatusCode, Json<Message>), AppError> {
    if req.content.trim().is_empty() {
        return Err(AppError::InvalidInput("message content cannot be empty".into()));
    }
    if state.store.party(party).await?.is_none() {
        return Err(AppError::PartyNotFound);
    }

    let mut message = Message::new(party, req.user, req.sender_name, req.content);
    message.kind = req.kind;
    state.store.insert_message(&message).await?;
    state.store.touch_party(party).await?;
    counter!(keys::MESSAGE_STORED).increment(1);
    Ok((StatusCode::CREATED, Json(message)))
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

pub async fn list(
    State(state): State<AppState>,
    Path(party): Path<PartyId>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Message>>, AppError> {
    if state.store.party(party).await?.is_none() {
        return Err(AppError::PartyNotFound);
    }
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    Ok(Json(state.store.messages(party, limit).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    if !state.store.delete_message(id).await? {
        return Err(AppError::MessageNotFound);
    }
    Ok(Json(json!({ "deleted": true })))
}
