// ============================
// crates/backend-lib/src/coordinator.rs
// ============================
//! The room coordinator: central hub for all real-time events.
//!
//! Every inbound event is handled as a short, run-to-completion step:
//! mutate the in-memory registries, fan the result out to the right
//! subset of connections, and only then dispatch any durable-store work
//! as a fire-and-forget background task. Store failures are logged and
//! swallowed; they never block or fail a broadcast.
//!
//! Fan-out rules per event:
//! - presence changes broadcast the *full* current list to the whole
//!   room (snapshots are self-correcting, deltas are not),
//! - chat, whiteboard clear and host controls go to the whole room
//!   including the sender,
//! - media sync, whiteboard draw, AV and screen-share status go to
//!   everyone *except* the sender,
//! - WebRTC signaling goes only to the addressed connection,
//! - the whiteboard history replay goes only to a new joiner.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use metrics::counter;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;
use watchparty_common::{ClientEvent, ConnectionId, ServerEvent};

use crate::metrics as keys;
use crate::models::PartyId;
use crate::presence::PresenceRegistry;
use crate::store::PartyStore;
use crate::whiteboard::WhiteboardHistory;

pub struct RoomCoordinator {
    registry: PresenceRegistry,
    whiteboards: WhiteboardHistory,
    /// Outbound channel per live connection.
    senders: DashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>,
    /// Unbound/Bound tag: the one room a connection currently belongs to.
    bound: DashMap<ConnectionId, PartyId>,
    /// When each room last became empty, for the idle sweep.
    empty_since: DashMap<PartyId, Instant>,
    store: Arc<dyn PartyStore>,
}

impl RoomCoordinator {
    pub fn new(store: Arc<dyn PartyStore>) -> Self {
        Self {
            registry: PresenceRegistry::new(),
            whiteboards: WhiteboardHistory::new(),
            senders: DashMap::new(),
            bound: DashMap::new(),
            empty_since: DashMap::new(),
            store,
        }
    }

    /// Register a freshly accepted connection and hand back the stream
    /// of events the socket task must forward to it.
    pub fn register(&self, connection_id: ConnectionId) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.insert(connection_id, tx);
        rx
    }

    pub fn connection_count(&self) -> usize {
        self.senders.len()
    }

    /// Handle one inbound event. Must be called from within a tokio
    /// runtime: durable side effects are spawned, never awaited.
    pub fn handle_event(&self, connection_id: ConnectionId, event: ClientEvent) {
        match event {
            ClientEvent::JoinRoom {
                party_id,
                participant_id,
                display_name,
            } => self.handle_join(connection_id, party_id, participant_id, display_name),
            ClientEvent::LeaveRoom { party_id } => self.handle_leave(connection_id, party_id),
            ClientEvent::ChatSend { message } => {
                let party_id = message.party;
                self.broadcast(party_id, ServerEvent::ChatNew { message });
                self.touch_party(party_id);
            },
            ClientEvent::MediaSync { party_id, state } => {
                self.relay_to_others(party_id, connection_id, ServerEvent::MediaUpdate { state });
                self.touch_party(party_id);
            },
            ClientEvent::WhiteboardDraw { party_id, stroke } => {
                self.whiteboards.append(party_id, stroke.clone());
                self.relay_to_others(
                    party_id,
                    connection_id,
                    ServerEvent::WhiteboardUpdate { stroke },
                );
                self.touch_party(party_id);
            },
            ClientEvent::WhiteboardClear { party_id } => {
                self.whiteboards.clear(party_id);
                self.broadcast(party_id, ServerEvent::WhiteboardClear);
                self.touch_party(party_id);
            },
            ClientEvent::AvUpdate {
                party_id,
                participant_id,
                status,
            } => {
                self.relay_to_others(
                    party_id,
                    connection_id,
                    ServerEvent::AvUpdate {
                        participant_id,
                        status,
                    },
                );
                self.touch_party(party_id);
            },
            ClientEvent::ScreenShare {
                party_id,
                participant_id,
                is_sharing,
            } => {
                self.relay_to_others(
                    party_id,
                    connection_id,
                    ServerEvent::ScreenShare {
                        participant_id,
                        is_sharing,
                    },
                );
                self.touch_party(party_id);
            },
            // Host controls are relayed as-is; authorization happened
            // upstream at the REST layer.
            ClientEvent::HostKick {
                party_id,
                participant_id,
            } => {
                self.broadcast(party_id, ServerEvent::HostKick { participant_id });
                self.touch_party(party_id);
            },
            ClientEvent::HostToggleChat { party_id, value } => {
                self.broadcast(party_id, ServerEvent::HostToggleChat { value });
                self.touch_party(party_id);
            },
            ClientEvent::HostToggleScreen { party_id, value } => {
                self.broadcast(party_id, ServerEvent::HostToggleScreen { value });
                self.touch_party(party_id);
            },
            ClientEvent::WebrtcOffer {
                party_id,
                to,
                offer,
            } => {
                self.send_to(
                    to,
                    ServerEvent::WebrtcOffer {
                        from: connection_id,
                        party_id,
                        offer,
                    },
                );
                self.touch_party(party_id);
            },
            ClientEvent::WebrtcAnswer {
                party_id,
                to,
                answer,
            } => {
                self.send_to(
                    to,
                    ServerEvent::WebrtcAnswer {
                        from: connection_id,
                        party_id,
                        answer,
                    },
                );
                self.touch_party(party_id);
            },
            ClientEvent::WebrtcIceCandidate {
                party_id,
                to,
                candidate,
            } => {
                self.send_to(
                    to,
                    ServerEvent::WebrtcIceCandidate {
                        from: connection_id,
                        party_id,
                        candidate,
                    },
                );
                self.touch_party(party_id);
            },
        }
    }

    fn handle_join(
        &self,
        connection_id: ConnectionId,
        party_id: PartyId,
        participant_id: Uuid,
        display_name: String,
    ) {
        // One room per connection: a join for a different room while
        // still Bound is a caller error and is dropped. Re-joining the
        // same room just refreshes the entry.
        if let Some(current) = self.bound.get(&connection_id) {
            if *current != party_id {
                warn!(
                    connection = %connection_id,
                    bound = %*current,
                    requested = %party_id,
                    "join while bound to another room, dropping"
                );
                return;
            }
        }

        self.registry
            .add(party_id, connection_id, participant_id, display_name);
        self.bound.insert(connection_id, party_id);
        self.empty_since.remove(&party_id);

        self.broadcast_presence(party_id);

        // History replay goes to the new connection only, never the room.
        let strokes = self.whiteboards.snapshot(party_id);
        if !strokes.is_empty() {
            self.send_to(
                connection_id,
                ServerEvent::WhiteboardState { party_id, strokes },
            );
        }

        self.touch_party(party_id);
    }

    fn handle_leave(&self, connection_id: ConnectionId, party_id: PartyId) {
        self.registry.remove(party_id, connection_id);
        self.bound
            .remove_if(&connection_id, |_, bound| *bound == party_id);

        // The leaver is no longer in the list but still hears the final
        // snapshot; it only stops receiving room traffic after this.
        let participants = self.registry.list(party_id);
        self.broadcast(
            party_id,
            ServerEvent::ParticipantsUpdate {
                participants: participants.clone(),
            },
        );
        self.send_to(connection_id, ServerEvent::ParticipantsUpdate { participants });

        self.note_if_empty(party_id);
        self.touch_party(party_id);
    }

    /// Transport-level disconnect: equivalent to a leave from every room
    /// the connection was bound to, plus durable cleanup of each removed
    /// participant. Idempotent; a second signal for the same connection
    /// is a no-op.
    pub fn disconnect(&self, connection_id: ConnectionId) {
        if self.senders.remove(&connection_id).is_none() {
            return;
        }
        self.bound.remove(&connection_id);

        let removed = self.registry.remove_all_for_connection(connection_id);
        if removed.is_empty() {
            return;
        }

        let mut rooms: Vec<PartyId> = removed.iter().map(|(room, _)| *room).collect();
        rooms.dedup();
        for room in rooms {
            self.broadcast_presence(room);
            self.note_if_empty(room);
        }

        // Durable bookkeeping happens strictly after the broadcasts.
        for (_, entry) in removed {
            let store = Arc::clone(&self.store);
            tokio::spawn(async move {
                if let Err(err) = cleanup_participant(&*store, entry.participant_id).await {
                    warn!(
                        participant = %entry.participant_id,
                        %err,
                        "participant cleanup after disconnect failed"
                    );
                }
            });
        }
    }

    /// Prune presence and whiteboard state of rooms that have been empty
    /// longer than `ttl`. Returns how many rooms were pruned.
    pub fn sweep_idle(&self, ttl: Duration) -> usize {
        let expired: Vec<PartyId> = self
            .empty_since
            .iter()
            .filter(|e| e.value().elapsed() >= ttl)
            .map(|e| *e.key())
            .collect();

        let mut pruned = 0;
        for room in expired {
            // a join may have repopulated the room since the marker was
            // set; its history must survive
            if !self.registry.is_empty(room) {
                continue;
            }
            self.registry.prune(room);
            self.whiteboards.prune(room);
            self.empty_since.remove(&room);
            debug!(room = %room, "pruned idle room caches");
            pruned += 1;
        }
        if pruned > 0 {
            counter!(keys::ROOM_SWEPT).increment(pruned as u64);
        }
        pruned
    }

    fn note_if_empty(&self, room: PartyId) {
        if self.registry.is_empty(room) {
            self.empty_since.insert(room, Instant::now());
        }
    }

    fn send_to(&self, connection_id: ConnectionId, event: ServerEvent) {
        if let Some(tx) = self.senders.get(&connection_id) {
            // a failed send means the socket task is already gone
            let _ = tx.send(event);
        }
    }

    fn broadcast(&self, room: PartyId, event: ServerEvent) {
        for entry in self.registry.list(room) {
            self.send_to(entry.connection_id, event.clone());
        }
    }

    fn relay_to_others(&self, room: PartyId, sender: ConnectionId, event: ServerEvent) {
        for entry in self.registry.list(room) {
            if entry.connection_id != sender {
                self.send_to(entry.connection_id, event.clone());
            }
        }
    }

    fn broadcast_presence(&self, room: PartyId) {
        let participants = self.registry.list(room);
        self.broadcast(room, ServerEvent::ParticipantsUpdate { participants });
    }

    fn touch_party(&self, room: PartyId) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(err) = store.touch_party(room).await {
                warn!(room = %room, %err, "failed to bump party activity");
            }
        });
    }
}

/// Delete the durable participant record and settle the party's cached
/// counter. The record may already be gone if the client managed a clean
/// REST leave before the socket dropped; that is not an error.
async fn cleanup_participant(
    store: &dyn PartyStore,
    participant_id: Uuid,
) -> Result<(), crate::error::AppError> {
    let Some(participant) = store.participant(participant_id).await? else {
        return Ok(());
    };

    store.delete_participant(participant_id).await?;
    store.decrement_participants(participant.party).await?;
    Ok(())
}
