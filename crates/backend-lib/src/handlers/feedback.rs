// ============================
// crates/backend-lib/src/handlers/feedback.rs
// ============================
//! Service feedback intake.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Feedback, UserId};
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    #[serde(default)]
    pub user: Option<UserId>,
    pub message: String,
    pub rating: Option<u8>,
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<FeedbackRequest>,
) -> Result<(StatusCode, Json<Feedback>), AppError> {
    if req.message.trim().is_empty() {
        return Err(AppError::InvalidInput("feedback message cannot be empty".into()));
    }
    let rating = req.rating.unwrap_or(5);
    if !(1..=5).contains(&rating) {
        return Err(AppError::InvalidInput("rating must be between 1 and 5".into()));
    }

    let feedback = Feedback {
        id: Uuid::new_v4(),
        user: req.user,
        message: req.message,
        rating,
        created_at: Utc::now(),
    };
    state.store.insert_feedback(&feedback).await?;
    Ok((StatusCode::CREATED, Json(feedback)))
}
