// ============================
// crates/backend-lib/src/presence.rs
// ============================
//! Process-local presence registry: which connections are live in which
//! room right now.
//!
//! This is intentionally ephemeral state. It is rebuilt from scratch on
//! restart and never persisted; the durable participant records are
//! reconciled against it by the coordinator, not by this module. A
//! connection belongs to at most one room at a time (enforced by the
//! coordinator's Bound tag), but [`PresenceRegistry::remove_all_for_connection`]
//! still sweeps every room in case that discipline was violated.

use dashmap::DashMap;
use uuid::Uuid;
use watchparty_common::{ConnectionId, PresenceEntry};

use crate::models::PartyId;

/// Room id → ordered presence entries (insertion order).
#[derive(Default)]
pub struct PresenceRegistry {
    rooms: DashMap<PartyId, Vec<PresenceEntry>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room. If the connection already has an entry
    /// in this room it is replaced in place (a re-join refreshes the
    /// participant id and display name without changing the order).
    pub fn add(
        &self,
        room: PartyId,
        connection_id: ConnectionId,
        participant_id: Uuid,
        display_name: String,
    ) {
        let mut entries = self.rooms.entry(room).or_default();
        let entry = PresenceEntry {
            connection_id,
            participant_id,
            display_name,
        };
        match entries.iter_mut().find(|e| e.connection_id == connection_id) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
    }

    /// Remove a connection from one room. Unknown rooms or connections
    /// are a no-op.
    pub fn remove(&self, room: PartyId, connection_id: ConnectionId) {
        if let Some(mut entries) = self.rooms.get_mut(&room) {
            entries.retain(|e| e.connection_id != connection_id);
        }
    }

    /// Remove a connection from every room it is part of and return the
    /// removed entries with their rooms, for cascading durable cleanup.
    /// Safe to call once per disconnect; a second call returns nothing.
    pub fn remove_all_for_connection(
        &self,
        connection_id: ConnectionId,
    ) -> Vec<(PartyId, PresenceEntry)> {
        let mut removed = Vec::new();
        for mut room in self.rooms.iter_mut() {
            let party = *room.key();
            let mut kept = Vec::with_capacity(room.len());
            for entry in room.drain(..) {
                if entry.connection_id == connection_id {
                    removed.push((party, entry));
                } else {
                    kept.push(entry);
                }
            }
            *room.value_mut() = kept;
        }
        removed
    }

    /// Current presence snapshot for a room, in join order. Empty (not
    /// an error) for rooms never seen.
    pub fn list(&self, room: PartyId) -> Vec<PresenceEntry> {
        self.rooms
            .get(&room)
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn is_empty(&self, room: PartyId) -> bool {
        self.rooms.get(&room).map_or(true, |e| e.is_empty())
    }

    /// Drop a room's (empty) entry entirely. Used by the idle sweep.
    pub fn prune(&self, room: PartyId) {
        self.rooms.remove_if(&room, |_, entries| entries.is_empty());
    }
}
