// ============================
// crates/backend-lib/src/models.rs
// ============================
//! Durable record types persisted through the [`PartyStore`] seam.
//!
//! These mirror the document shapes the REST surface exchanges with
//! clients: a `Party` is a room, a `Participant` is one identity's
//! membership in it, and `Message`/`MediaState`/`Feedback` hang off a
//! party. Live presence is deliberately *not* here; it lives in the
//! in-memory registry and dies with the process.
//!
//! [`PartyStore`]: crate::store::PartyStore

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use watchparty_common::{MediaProvider, MessageKind};

pub type PartyId = Uuid;
pub type ParticipantId = Uuid;
pub type UserId = Uuid;

/// Per-party feature toggles, set by the host at creation time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PartySettings {
    pub allow_anonymous: bool,
    pub enable_chat: bool,
    pub enable_audio: bool,
    pub enable_video: bool,
    pub enable_whiteboard: bool,
    pub theme: String,
    pub max_participants: u32,
}

impl Default for PartySettings {
    fn default() -> Self {
        Self {
            allow_anonymous: false,
            enable_chat: true,
            enable_audio: true,
            enable_video: true,
            enable_whiteboard: true,
            theme: "default".to_string(),
            max_participants: 50,
        }
    }
}

/// A watch party (room).
///
/// `participants_count` is a cached counter kept in step with durable
/// [`Participant`] records; it never goes below zero. `last_active` is
/// the sole freshness signal and is bumped by essentially every room
/// event, so it only ever moves forward.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub id: PartyId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub host: UserId,
    /// Human-readable join code, unique across parties.
    pub code: String,
    #[serde(default)]
    pub is_private: bool,
    /// Hashed upstream by the (out of scope) auth layer; stored opaquely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(default)]
    pub settings: PartySettings,
    #[serde(default)]
    pub participants_count: u32,
    pub is_active: bool,
    pub last_active: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Party {
    pub fn new(name: String, host: UserId, code: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description: String::new(),
            host,
            code,
            is_private: false,
            password_hash: None,
            settings: PartySettings::default(),
            participants_count: 0,
            is_active: true,
            last_active: now,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Durable record of one identity's membership in one party.
///
/// Signed-in users get at most one record per party, reused on rejoin;
/// anonymous guests (`user: None`) get a fresh record every time since
/// there is no identity to dedupe on.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub party: PartyId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserId>,
    pub display_name: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub is_host: bool,
    #[serde(default)]
    pub is_anonymous: bool,
    #[serde(default)]
    pub is_muted: bool,
    #[serde(default)]
    pub is_video_on: bool,
    #[serde(default)]
    pub is_screen_sharing: bool,
    pub joined_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl Participant {
    pub fn new(party: PartyId, user: Option<UserId>, display_name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            party,
            user,
            display_name,
            avatar: String::new(),
            is_host: false,
            is_anonymous: false,
            is_muted: false,
            is_video_on: false,
            is_screen_sharing: false,
            joined_at: now,
            last_active_at: now,
        }
    }
}

/// Durable chat entry. Immutable once written, except for deletion.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub party: PartyId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserId>,
    #[serde(default)]
    pub sender_name: String,
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(party: PartyId, user: Option<UserId>, sender_name: String, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            party,
            user,
            sender_name,
            content,
            kind: MessageKind::Text,
            created_at: Utc::now(),
        }
    }
}

/// Durable mirror of the live player state, one row per party, upserted
/// on change so late joiners can resume where the room is.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaState {
    pub party: PartyId,
    #[serde(default)]
    pub video_url: String,
    #[serde(default)]
    pub provider: MediaProvider,
    #[serde(default)]
    pub current_time: f64,
    #[serde(default)]
    pub is_playing: bool,
    pub playback_rate: f64,
    pub volume: f64,
    pub last_updated: DateTime<Utc>,
}

impl MediaState {
    /// Default row for a party that has no media state yet.
    pub fn empty(party: PartyId) -> Self {
        Self {
            party,
            video_url: String::new(),
            provider: MediaProvider::Other,
            current_time: 0.0,
            is_playing: false,
            playback_rate: 1.0,
            volume: 1.0,
            last_updated: Utc::now(),
        }
    }
}

/// User feedback about the service itself (not tied to a party).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserId>,
    pub message: String,
    /// 1..=5, defaulting to 5.
    pub rating: u8,
    pub created_at: DateTime<Utc>,
}
