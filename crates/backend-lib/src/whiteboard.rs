// ============================
// crates/backend-lib/src/whiteboard.rs
// ============================
//! Per-room whiteboard history: an ordered, in-memory stroke log that is
//! replayed verbatim to late joiners. Cleared on an explicit clear event
//! or process restart; never persisted.

use dashmap::DashMap;
use watchparty_common::Stroke;

use crate::models::PartyId;

#[derive(Default)]
pub struct WhiteboardHistory {
    strokes: DashMap<PartyId, Vec<Stroke>>,
}

impl WhiteboardHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, room: PartyId, stroke: Stroke) {
        self.strokes.entry(room).or_default().push(stroke);
    }

    /// Reset to an empty sequence. The key stays so a subsequent append
    /// needs no special-casing for absence.
    pub fn clear(&self, room: PartyId) {
        self.strokes.entry(room).or_default().clear();
    }

    /// Ordered copy of the room's strokes; empty for unknown rooms.
    pub fn snapshot(&self, room: PartyId) -> Vec<Stroke> {
        self.strokes
            .get(&room)
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Drop a room's entry entirely. Used by the idle sweep.
    pub fn prune(&self, room: PartyId) {
        self.strokes.remove(&room);
    }
}
