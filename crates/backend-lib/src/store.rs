// ============================
// crates/backend-lib/src/store.rs
// ============================
//! Durable store abstraction with flat-file and in-memory implementations.
//!
//! The room coordinator only ever touches the store through fire-and-forget
//! background tasks, so every operation here is fallible and none of them
//! are on the broadcast path. `MemoryStore` doubles as the injectable fake
//! for coordinator tests.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::{fs as tokio_fs, io::AsyncWriteExt, sync::Mutex};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    Feedback, MediaState, Message, Participant, ParticipantId, Party, PartyId, UserId,
};

/// Trait for durable storage backends.
#[async_trait]
pub trait PartyStore: Send + Sync {
    async fn create_party(&self, party: Party) -> Result<(), AppError>;

    async fn party(&self, id: PartyId) -> Result<Option<Party>, AppError>;

    async fn party_by_code(&self, code: &str) -> Result<Option<Party>, AppError>;

    /// Parties with activity since `since`, newest first, capped at `limit`.
    async fn list_recent_parties(
        &self,
        since: DateTime<Utc>,
        public_only: bool,
        limit: usize,
    ) -> Result<Vec<Party>, AppError>;

    /// Full-document write. Fails if the party does not exist.
    async fn update_party(&self, party: &Party) -> Result<(), AppError>;

    async fn delete_party(&self, id: PartyId) -> Result<bool, AppError>;

    /// Bump `last_active` to now and flag the party active. Unknown
    /// parties are a no-op; activity touches are best-effort.
    async fn touch_party(&self, id: PartyId) -> Result<(), AppError>;

    /// Atomically add one to the cached participant count.
    async fn increment_participants(&self, id: PartyId) -> Result<u32, AppError>;

    /// Atomically subtract one, floored at zero. Flips `is_active` off
    /// when the count reaches zero and bumps `last_active` either way.
    async fn decrement_participants(&self, id: PartyId) -> Result<u32, AppError>;

    async fn insert_participant(&self, participant: &Participant) -> Result<(), AppError>;

    async fn participant(&self, id: ParticipantId) -> Result<Option<Participant>, AppError>;

    /// The at-most-one participant record for a signed-in user in a party.
    async fn participant_for_user(
        &self,
        party: PartyId,
        user: UserId,
    ) -> Result<Option<Participant>, AppError>;

    async fn update_participant(&self, participant: &Participant) -> Result<(), AppError>;

    /// Returns false when the record was already gone (e.g. removed via
    /// the REST leave endpoint before the disconnect cleanup ran).
    async fn delete_participant(&self, id: ParticipantId) -> Result<bool, AppError>;

    async fn list_participants(&self, party: PartyId) -> Result<Vec<Participant>, AppError>;

    async fn insert_message(&self, message: &Message) -> Result<(), AppError>;

    /// Messages for a party in chronological order, capped at `limit`
    /// newest entries.
    async fn messages(&self, party: PartyId, limit: usize) -> Result<Vec<Message>, AppError>;

    async fn delete_message(&self, id: Uuid) -> Result<bool, AppError>;

    async fn media_state(&self, party: PartyId) -> Result<Option<MediaState>, AppError>;

    /// Upsert keyed on the party id (one row per party).
    async fn upsert_media_state(&self, state: &MediaState) -> Result<(), AppError>;

    async fn insert_feedback(&self, feedback: &Feedback) -> Result<(), AppError>;
}

// ---------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------

/// DashMap-backed store. Used by tests and as the injectable fake for
/// the coordinator; nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    parties: DashMap<PartyId, Party>,
    participants: DashMap<ParticipantId, Participant>,
    messages: DashMap<PartyId, Vec<Message>>,
    media: DashMap<PartyId, MediaState>,
    feedback: Mutex<Vec<Feedback>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PartyStore for MemoryStore {
    async fn create_party(&self, party: Party) -> Result<(), AppError> {
        self.parties.insert(party.id, party);
        Ok(())
    }

    async fn party(&self, id: PartyId) -> Result<Option<Party>, AppError> {
        Ok(self.parties.get(&id).map(|p| p.clone()))
    }

    async fn party_by_code(&self, code: &str) -> Result<Option<Party>, AppError> {
        Ok(self
            .parties
            .iter()
            .find(|p| p.code == code)
            .map(|p| p.clone()))
    }

    async fn list_recent_parties(
        &self,
        since: DateTime<Utc>,
        public_only: bool,
        limit: usize,
    ) -> Result<Vec<Party>, AppError> {
        let mut parties: Vec<Party> = self
            .parties
            .iter()
            .filter(|p| p.last_active >= since && !(public_only && p.is_private))
            .map(|p| p.clone())
            .collect();
        parties.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        parties.truncate(limit);
        Ok(parties)
    }

    async fn update_party(&self, party: &Party) -> Result<(), AppError> {
        match self.parties.get_mut(&party.id) {
            Some(mut existing) => {
                *existing = party.clone();
                Ok(())
            },
            None => Err(AppError::PartyNotFound),
        }
    }

    async fn delete_party(&self, id: PartyId) -> Result<bool, AppError> {
        Ok(self.parties.remove(&id).is_some())
    }

    async fn touch_party(&self, id: PartyId) -> Result<(), AppError> {
        if let Some(mut party) = self.parties.get_mut(&id) {
            party.last_active = Utc::now();
            party.is_active = true;
        }
        Ok(())
    }

    async fn increment_participants(&self, id: PartyId) -> Result<u32, AppError> {
        let mut party = self.parties.get_mut(&id).ok_or(AppError::PartyNotFound)?;
        party.participants_count += 1;
        party.last_active = Utc::now();
        party.is_active = true;
        Ok(party.participants_count)
    }

    async fn decrement_participants(&self, id: PartyId) -> Result<u32, AppError> {
        let mut party = self.parties.get_mut(&id).ok_or(AppError::PartyNotFound)?;
        party.participants_count = party.participants_count.saturating_sub(1);
        party.last_active = Utc::now();
        if party.participants_count == 0 {
            party.is_active = false;
        }
        Ok(party.participants_count)
    }

    async fn insert_participant(&self, participant: &Participant) -> Result<(), AppError> {
        self.participants
            .insert(participant.id, participant.clone());
        Ok(())
    }

    async fn participant(&self, id: ParticipantId) -> Result<Option<Participant>, AppError> {
        Ok(self.participants.get(&id).map(|p| p.clone()))
    }

    async fn participant_for_user(
        &self,
        party: PartyId,
        user: UserId,
    ) -> Result<Option<Participant>, AppError> {
        Ok(self
            .participants
            .iter()
            .find(|p| p.party == party && p.user == Some(user))
            .map(|p| p.clone()))
    }

    async fn update_participant(&self, participant: &Participant) -> Result<(), AppError> {
        match self.participants.get_mut(&participant.id) {
            Some(mut existing) => {
                *existing = participant.clone();
                Ok(())
            },
            None => Err(AppError::ParticipantNotFound),
        }
    }

    async fn delete_participant(&self, id: ParticipantId) -> Result<bool, AppError> {
        Ok(self.participants.remove(&id).is_some())
    }

    async fn list_participants(&self, party: PartyId) -> Result<Vec<Participant>, AppError> {
        let mut list: Vec<Participant> = self
            .participants
            .iter()
            .filter(|p| p.party == party)
            .map(|p| p.clone())
            .collect();
        list.sort_by(|a, b| a.joined_at.cmp(&b.joined_at));
        Ok(list)
    }

    async fn insert_message(&self, message: &Message) -> Result<(), AppError> {
        self.messages
            .entry(message.party)
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn messages(&self, party: PartyId, limit: usize) -> Result<Vec<Message>, AppError> {
        let mut messages = self
            .messages
            .get(&party)
            .map(|m| m.clone())
            .unwrap_or_default();
        if messages.len() > limit {
            messages = messages.split_off(messages.len() - limit);
        }
        Ok(messages)
    }

    async fn delete_message(&self, id: Uuid) -> Result<bool, AppError> {
        for mut entry in self.messages.iter_mut() {
            let before = entry.len();
            entry.retain(|m| m.id != id);
            if entry.len() != before {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn media_state(&self, party: PartyId) -> Result<Option<MediaState>, AppError> {
        Ok(self.media.get(&party).map(|s| s.clone()))
    }

    async fn upsert_media_state(&self, state: &MediaState) -> Result<(), AppError> {
        self.media.insert(state.party, state.clone());
        Ok(())
    }

    async fn insert_feedback(&self, feedback: &Feedback) -> Result<(), AppError> {
        self.feedback.lock().await.push(feedback.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------
// Flat-file implementation
// ---------------------------------------------------------------------

/// Flat-file implementation of the [`PartyStore`] trait.
///
/// One JSON document per party/participant/media row, a jsonl log per
/// party for messages, and a single jsonl log for feedback. A single
/// lock serializes read-modify-write cycles so counter updates stay
/// atomic without touching the broadcast path.
pub struct FlatFileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FlatFileStore {
    pub fn new<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(root.join("parties"))?;
        std::fs::create_dir_all(root.join("participants"))?;
        std::fs::create_dir_all(root.join("messages"))?;
        std::fs::create_dir_all(root.join("media"))?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    fn party_path(&self, id: PartyId) -> PathBuf {
        self.root.join("parties").join(format!("{id}.json"))
    }

    fn participant_path(&self, id: ParticipantId) -> PathBuf {
        self.root.join("participants").join(format!("{id}.json"))
    }

    fn messages_path(&self, party: PartyId) -> PathBuf {
        self.root.join("messages").join(format!("{party}.jsonl"))
    }

    fn media_path(&self, party: PartyId) -> PathBuf {
        self.root.join("media").join(format!("{party}.json"))
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        path: &Path,
    ) -> Result<Option<T>, AppError> {
        match tokio_fs::read_to_string(path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(value)?;
        tokio_fs::write(path, json).await?;
        Ok(())
    }

    async fn scan_parties(&self) -> Result<Vec<Party>, AppError> {
        let mut parties = Vec::new();
        let mut dir = tokio_fs::read_dir(self.root.join("parties")).await?;
        while let Some(entry) = dir.next_entry().await? {
            if let Some(party) = Self::read_json::<Party>(&entry.path()).await? {
                parties.push(party);
            }
        }
        Ok(parties)
    }

    async fn scan_participants(&self) -> Result<Vec<Participant>, AppError> {
        let mut participants = Vec::new();
        let mut dir = tokio_fs::read_dir(self.root.join("participants")).await?;
        while let Some(entry) = dir.next_entry().await? {
            if let Some(participant) = Self::read_json::<Participant>(&entry.path()).await? {
                participants.push(participant);
            }
        }
        Ok(participants)
    }

    async fn read_messages(&self, party: PartyId) -> Result<Vec<Message>, AppError> {
        let path = self.messages_path(party);
        let content = match tokio_fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut messages = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            messages.push(serde_json::from_str(line)?);
        }
        Ok(messages)
    }

    async fn append_jsonl<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
        let json = serde_json::to_string(value)?;
        let mut file = tokio_fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(json.as_bytes()).await?;
        file.write_all(b"\n").await?;
        Ok(())
    }
}

#[async_trait]
impl PartyStore for FlatFileStore {
    async fn create_party(&self, party: Party) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        Self::write_json(&self.party_path(party.id), &party).await
    }

    async fn party(&self, id: PartyId) -> Result<Option<Party>, AppError> {
        Self::read_json(&self.party_path(id)).await
    }

    async fn party_by_code(&self, code: &str) -> Result<Option<Party>, AppError> {
        Ok(self.scan_parties().await?.into_iter().find(|p| p.code == code))
    }

    async fn list_recent_parties(
        &self,
        since: DateTime<Utc>,
        public_only: bool,
        limit: usize,
    ) -> Result<Vec<Party>, AppError> {
        let mut parties: Vec<Party> = self
            .scan_parties()
            .await?
            .into_iter()
            .filter(|p| p.last_active >= since && !(public_only && p.is_private))
            .collect();
        parties.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        parties.truncate(limit);
        Ok(parties)
    }

    async fn update_party(&self, party: &Party) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        let path = self.party_path(party.id);
        if Self::read_json::<Party>(&path).await?.is_none() {
            return Err(AppError::PartyNotFound);
        }
        Self::write_json(&path, party).await
    }

    async fn delete_party(&self, id: PartyId) -> Result<bool, AppError> {
        let _guard = self.write_lock.lock().await;
        match tokio_fs::remove_file(self.party_path(id)).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn touch_party(&self, id: PartyId) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        let path = self.party_path(id);
        if let Some(mut party) = Self::read_json::<Party>(&path).await? {
            party.last_active = Utc::now();
            party.is_active = true;
            Self::write_json(&path, &party).await?;
        }
        Ok(())
    }

    async fn increment_participants(&self, id: PartyId) -> Result<u32, AppError> {
        let _guard = self.write_lock.lock().await;
        let path = self.party_path(id);
        let mut party = Self::read_json::<Party>(&path)
            .await?
            .ok_or(AppError::PartyNotFound)?;
        party.participants_count += 1;
        party.last_active = Utc::now();
        party.is_active = true;
        let count = party.participants_count;
        Self::write_json(&path, &party).await?;
        Ok(count)
    }

    async fn decrement_participants(&self, id: PartyId) -> Result<u32, AppError> {
        let _guard = self.write_lock.lock().await;
        let path = self.party_path(id);
        let mut party = Self::read_json::<Party>(&path)
            .await?
            .ok_or(AppError::PartyNotFound)?;
        party.participants_count = party.participants_count.saturating_sub(1);
        party.last_active = Utc::now();
        if party.participants_count == 0 {
            party.is_active = false;
        }
        let count = party.participants_count;
        Self::write_json(&path, &party).await?;
        Ok(count)
    }

    async fn insert_participant(&self, participant: &Participant) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        Self::write_json(&self.participant_path(participant.id), participant).await
    }

    async fn participant(&self, id: ParticipantId) -> Result<Option<Participant>, AppError> {
        Self::read_json(&self.participant_path(id)).await
    }

    async fn participant_for_user(
        &self,
        party: PartyId,
        user: UserId,
    ) -> Result<Option<Participant>, AppError> {
        Ok(self
            .scan_participants()
            .await?
            .into_iter()
            .find(|p| p.party == party && p.user == Some(user)))
    }

    async fn update_participant(&self, participant: &Participant) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        let path = self.participant_path(participant.id);
        if Self::read_json::<Participant>(&path).await?.is_none() {
            return Err(AppError::ParticipantNotFound);
        }
        Self::write_json(&path, participant).await
    }

    async fn delete_participant(&self, id: ParticipantId) -> Result<bool, AppError> {
        let _guard = self.write_lock.lock().await;
        match tokio_fs::remove_file(self.participant_path(id)).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn list_participants(&self, party: PartyId) -> Result<Vec<Participant>, AppError> {
        let mut list: Vec<Participant> = self
            .scan_participants()
            .await?
            .into_iter()
            .filter(|p| p.party == party)
            .collect();
        list.sort_by(|a, b| a.joined_at.cmp(&b.joined_at));
        Ok(list)
    }

    async fn insert_message(&self, message: &Message) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        Self::append_jsonl(&self.messages_path(message.party), message).await
    }

    async fn messages(&self, party: PartyId, limit: usize) -> Result<Vec<Message>, AppError> {
        let mut messages = self.read_messages(party).await?;
        if messages.len() > limit {
            messages = messages.split_off(messages.len() - limit);
        }
        Ok(messages)
    }

    async fn delete_message(&self, id: Uuid) -> Result<bool, AppError> {
        let _guard = self.write_lock.lock().await;
        let mut dir = tokio_fs::read_dir(self.root.join("messages")).await?;
        while let Some(entry) = dir.next_entry().await? {
            let content = tokio_fs::read_to_string(entry.path()).await?;
            let mut messages: Vec<Message> = Vec::new();
            let mut found = false;
            for line in content.lines().filter(|l| !l.trim().is_empty()) {
                let message: Message = serde_json::from_str(line)?;
                if message.id == id {
                    found = true;
                } else {
                    messages.push(message);
                }
            }
            if found {
                let mut out = String::new();
                for message in &messages {
                    out.push_str(&serde_json::to_string(message)?);
                    out.push('\n');
                }
                tokio_fs::write(entry.path(), out).await?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn media_state(&self, party: PartyId) -> Result<Option<MediaState>, AppError> {
        Self::read_json(&self.media_path(party)).await
    }

    async fn upsert_media_state(&self, state: &MediaState) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        Self::write_json(&self.media_path(state.party), state).await
    }

    async fn insert_feedback(&self, feedback: &Feedback) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        Self::append_jsonl(&self.root.join("feedback.jsonl"), feedback).await
    }
}
