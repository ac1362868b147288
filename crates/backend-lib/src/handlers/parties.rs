// ============================
// crates/backend-lib/src/handlers/parties.rs
// ============================
//! Party CRUD and discovery.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, Utc};
use metrics::counter;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::codes::generate_party_code;
use crate::error::AppError;
use crate::metrics as keys;
use crate::models::{Party, PartyId, PartySettings, UserId};
use crate::AppState;

/// Discovery window: a party counts as "recent" if it saw activity in
/// the last five minutes.
const RECENT_WINDOW_MINUTES: i64 = 5;
const LIST_LIMIT: usize = 100;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePartyRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub host: UserId,
    #[serde(default)]
    pub is_private: bool,
    /// Already hashed by the caller; stored opaquely.
    #[serde(default)]
    pub password_hash: Option<String>,
    #[serde(default)]
    pub settings: Option<PartySettings>,
    /// Top-level shorthand, applied after `settings`.
    #[serde(default)]
    pub max_participants: Option<u32>,
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreatePartyRequest>,
) -> Result<(StatusCode, Json<Party>), AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::InvalidInput("party name cannot be empty".into()));
    }

    // regenerate on the (rare) code collision
    let mut code = generate_party_code();
    while state.store.party_by_code(&code).await?.is_some() {
        code = generate_party_code();
    }

    let mut party = Party::new(req.name, req.host, code);
    party.description = req.description;
    party.is_private = req.is_private;
    party.password_hash = req.password_hash;
    if let Some(settings) = req.settings {
        party.settings = settings;
    }
    if let Some(max_participants) = req.max_participants {
        party.settings.max_participants = max_participants;
    }

    state.store.create_party(party.clone()).await?;
    counter!(keys::PARTY_CREATED).increment(1);
    info!(party = %party.id, code = %party.code, "party created");
    Ok((StatusCode::CREATED, Json(party)))
}

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub public: bool,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Party>>, AppError> {
    let since = Utc::now() - Duration::minutes(RECENT_WINDOW_MINUTES);
    let parties = state
        .store
        .list_recent_parties(since, query.public, LIST_LIMIT)
        .await?;
    Ok(Json(parties))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<PartyId>,
) -> Result<Json<Party>, AppError> {
    let party = state.store.party(id).await?.ok_or(AppError::PartyNotFound)?;
    Ok(Json(party))
}

pub async fn by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Party>, AppError> {
    let party = state
        .store
        .party_by_code(&code.to_uppercase())
        .await?
        .ok_or(AppError::PartyNotFound)?;
    Ok(Json(party))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePartyRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_private: Option<bool>,
    pub settings: Option<PartySettings>,
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<PartyId>,
    Json(req): Json<UpdatePartyRequest>,
) -> Result<Json<Party>, AppError> {
    let mut party = state.store.party(id).await?.ok_or(AppError::PartyNotFound)?;

    if let Some(name) = req.name {
        if name.trim().is_empty() {
            return Err(AppError::InvalidInput("party name cannot be empty".into()));
        }
        party.name = name;
    }
    if let Some(description) = req.description {
        party.description = description;
    }
    if let Some(is_private) = req.is_private {
        party.is_private = is_private;
    }
    if let Some(settings) = req.settings {
        party.settings = settings;
    }
    party.updated_at = Utc::now();

    state.store.update_party(&party).await?;
    Ok(Json(party))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<PartyId>,
) -> Result<Json<Value>, AppError> {
    if !state.store.delete_party(id).await? {
        return Err(AppError::PartyNotFound);
    }
    Ok(Json(json!({ "deleted": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_util::{get_request, json_body, json_request, test_app};
    use tower::ServiceExt;
    use uuid::Uuid;

    #[tokio::test]
    async fn create_then_fetch_by_id_and_code() {
        let (_, router) = test_app();

        let response = router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/parties",
                json!({ "name": "movie night", "host": Uuid::new_v4() }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let party: Party = json_body(response).await;
        assert_eq!(party.name, "movie night");
        assert_eq!(party.code.len(), crate::codes::CODE_LEN);

        let response = router
            .clone()
            .oneshot(get_request(&format!("/api/parties/{}", party.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(get_request(&format!("/api/parties/code/{}", party.code)))
            .await
            .unwrap();
        let by_code: Party = json_body(response).await;
        assert_eq!(by_code.id, party.id);
    }

    #[tokio::test]
    async fn create_accepts_top_level_max_participants() {
        let (_, router) = test_app();
        let response = router
            .oneshot(json_request(
                "POST",
                "/api/parties",
                json!({
                    "name": "small party",
                    "host": Uuid::new_v4(),
                    "settings": { "enableChat": false },
                    "maxParticipants": 4
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let party: Party = json_body(response).await;
        // the shorthand wins over whatever the settings block carried
        assert_eq!(party.settings.max_participants, 4);
        assert!(!party.settings.enable_chat);
    }

    #[tokio::test]
    async fn create_rejects_blank_name() {
        let (_, router) = test_app();
        let response = router
            .oneshot(json_request(
                "POST",
                "/api/parties",
                json!({ "name": "   ", "host": Uuid::new_v4() }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_public_hides_private_parties() {
        let (_, router) = test_app();

        for (name, is_private) in [("open", false), ("closed", true)] {
            let response = router
                .clone()
                .oneshot(json_request(
                    "POST",
                    "/api/parties",
                    json!({ "name": name, "host": Uuid::new_v4(), "isPrivate": is_private }),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = router
            .clone()
            .oneshot(get_request("/api/parties?public=true"))
            .await
            .unwrap();
        let parties: Vec<Party> = json_body(response).await;
        assert_eq!(parties.len(), 1);
        assert_eq!(parties[0].name, "open");

        let response = router.oneshot(get_request("/api/parties")).await.unwrap();
        let parties: Vec<Party> = json_body(response).await;
        assert_eq!(parties.len(), 2);
    }

    #[tokio::test]
    async fn patch_updates_only_provided_fields() {
        let (_, router) = test_app();

        let response = router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/parties",
                json!({ "name": "before", "host": Uuid::new_v4(), "description": "keep me" }),
            ))
            .await
            .unwrap();
        let party: Party = json_body(response).await;

        let response = router
            .clone()
            .oneshot(json_request(
                "PATCH",
                &format!("/api/parties/{}", party.id),
                json!({ "name": "after" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let updated: Party = json_body(response).await;
        assert_eq!(updated.name, "after");
        assert_eq!(updated.description, "keep me");
        assert!(updated.updated_at >= party.updated_at);
    }

    #[tokio::test]
    async fn delete_is_not_idempotent() {
        let (_, router) = test_app();

        let response = router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/parties",
                json!({ "name": "gone soon", "host": Uuid::new_v4() }),
            ))
            .await
            .unwrap();
        let party: Party = json_body(response).await;

        let delete_request = || {
            axum::http::Request::builder()
                .method("DELETE")
                .uri(format!("/api/parties/{}", party.id))
                .body(axum::body::Body::empty())
                .unwrap()
        };
        let response = router.clone().oneshot(delete_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let response = router.oneshot(delete_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_party_is_404() {
        let (_, router) = test_app();
        let response = router
            .oneshot(get_request(&format!("/api/parties/{}", Uuid::new_v4())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
