// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! used for communication between the watch-party client and server.
//! This module defines the real-time event protocol and supporting types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Identifier of one live WebSocket connection (one browser tab).
pub type ConnectionId = Uuid;

/// Events sent from client to server.
///
/// Every event is a JSON object tagged with an `event` field; payload
/// fields ride alongside the tag in camelCase. Frames that fail to
/// deserialize (unknown event, missing required field) are dropped by
/// the server without a reply.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "event", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Announce this connection as a participant of a party.
    #[serde(rename = "join-room")]
    JoinRoom {
        party_id: Uuid,
        participant_id: Uuid,
        display_name: String,
    },
    /// Logical leave; the connection stays open and may join again.
    #[serde(rename = "leave-room")]
    LeaveRoom { party_id: Uuid },
    /// Re-broadcast an already-persisted chat message to the room.
    #[serde(rename = "chat:send")]
    ChatSend {
        #[serde(flatten)]
        message: ChatMessage,
    },
    /// Relay the sender's player state to everyone else in the room.
    #[serde(rename = "media:sync")]
    MediaSync { party_id: Uuid, state: MediaSnapshot },
    #[serde(rename = "whiteboard:draw")]
    WhiteboardDraw { party_id: Uuid, stroke: Stroke },
    #[serde(rename = "whiteboard:clear")]
    WhiteboardClear { party_id: Uuid },
    /// Camera/microphone status change for one participant.
    #[serde(rename = "av:update")]
    AvUpdate {
        party_id: Uuid,
        participant_id: Uuid,
        status: Value,
    },
    #[serde(rename = "screen-share")]
    ScreenShare {
        party_id: Uuid,
        participant_id: Uuid,
        is_sharing: bool,
    },
    #[serde(rename = "host:kick")]
    HostKick { party_id: Uuid, participant_id: Uuid },
    #[serde(rename = "host:toggle-chat")]
    HostToggleChat { party_id: Uuid, value: bool },
    #[serde(rename = "host:toggle-screen")]
    HostToggleScreen { party_id: Uuid, value: bool },
    /// WebRTC signaling, delivered only to the `to` connection.
    #[serde(rename = "webrtc:offer")]
    WebrtcOffer {
        party_id: Uuid,
        to: ConnectionId,
        offer: Value,
    },
    #[serde(rename = "webrtc:answer")]
    WebrtcAnswer {
        party_id: Uuid,
        to: ConnectionId,
        answer: Value,
    },
    #[serde(rename = "webrtc:ice-candidate")]
    WebrtcIceCandidate {
        party_id: Uuid,
        to: ConnectionId,
        candidate: Value,
    },
}

/// Events sent from server to client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Full presence snapshot for the room, sent after every join/leave.
    #[serde(rename = "participants-update")]
    ParticipantsUpdate { participants: Vec<PresenceEntry> },
    #[serde(rename = "chat:new")]
    ChatNew {
        #[serde(flatten)]
        message: ChatMessage,
    },
    #[serde(rename = "media:update")]
    MediaUpdate { state: MediaSnapshot },
    /// Whiteboard history replay, sent only to a newly joined connection.
    #[serde(rename = "whiteboard:state")]
    WhiteboardState { party_id: Uuid, strokes: Vec<Stroke> },
    #[serde(rename = "whiteboard:update")]
    WhiteboardUpdate { stroke: Stroke },
    #[serde(rename = "whiteboard:clear")]
    WhiteboardClear,
    #[serde(rename = "av:update")]
    AvUpdate { participant_id: Uuid, status: Value },
    #[serde(rename = "screen-share")]
    ScreenShare {
        participant_id: Uuid,
        is_sharing: bool,
    },
    #[serde(rename = "host:kick")]
    HostKick { participant_id: Uuid },
    #[serde(rename = "host:toggle-chat")]
    HostToggleChat { value: bool },
    #[serde(rename = "host:toggle-screen")]
    HostToggleScreen { value: bool },
    #[serde(rename = "webrtc:offer")]
    WebrtcOffer {
        from: ConnectionId,
        party_id: Uuid,
        offer: Value,
    },
    #[serde(rename = "webrtc:answer")]
    WebrtcAnswer {
        from: ConnectionId,
        party_id: Uuid,
        answer: Value,
    },
    #[serde(rename = "webrtc:ice-candidate")]
    WebrtcIceCandidate {
        from: ConnectionId,
        party_id: Uuid,
        candidate: Value,
    },
}

/// One live connection in a room: who is actually here right now.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEntry {
    pub connection_id: ConnectionId,
    pub participant_id: Uuid,
    pub display_name: String,
}

/// One whiteboard line segment, replayed verbatim to late joiners.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    pub prev_x: f64,
    pub prev_y: f64,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
}

/// Source of the currently playing video.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaProvider {
    Youtube,
    Direct,
    Drive,
    #[default]
    Other,
}

/// Live player state, relayed between connections as-is. All fields are
/// optional so a client can sync just the part that changed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MediaSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<MediaProvider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_playing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playback_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

/// Chat message kind.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    System,
}

/// Chat message as it travels over the socket. The message is persisted
/// through the REST surface first; the socket layer re-broadcasts it
/// verbatim, so everything except `party` and `content` is optional.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub party: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Uuid>,
    #[serde(default)]
    pub sender_name: String,
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_event_join_room_wire_shape() {
        let party = Uuid::new_v4();
        let participant = Uuid::new_v4();
        let json = format!(
            r#"{{"event":"join-room","partyId":"{party}","participantId":"{participant}","displayName":"Alice"}}"#
        );

        let parsed: ClientEvent = serde_json::from_str(&json).unwrap();
        match parsed {
            ClientEvent::JoinRoom {
                party_id,
                participant_id,
                display_name,
            } => {
                assert_eq!(party_id, party);
                assert_eq!(participant_id, participant);
                assert_eq!(display_name, "Alice");
            },
            other => panic!("Wrong variant: {other:?}"),
        }
    }

    #[test]
    fn client_event_missing_field_is_an_error() {
        // join-room without a participantId must fail to parse; the
        // server drops such frames silently.
        let json = r#"{"event":"join-room","partyId":"6e4ff0f1-1687-44ac-ad9f-7cbf4ad6eea5"}"#;
        assert!(serde_json::from_str::<ClientEvent>(json).is_err());

        let json = r#"{"event":"no-such-event"}"#;
        assert!(serde_json::from_str::<ClientEvent>(json).is_err());
    }

    #[test]
    fn server_event_tags_match_protocol_names() {
        let ev = ServerEvent::ParticipantsUpdate {
            participants: vec![PresenceEntry {
                connection_id: Uuid::new_v4(),
                participant_id: Uuid::new_v4(),
                display_name: "Bob".into(),
            }],
        };
        let value: Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(value["event"], "participants-update");
        assert_eq!(value["participants"][0]["displayName"], "Bob");

        let value = serde_json::to_value(ServerEvent::WhiteboardClear).unwrap();
        assert_eq!(value["event"], "whiteboard:clear");
    }

    #[test]
    fn chat_message_flattens_into_event() {
        let msg = ChatMessage {
            id: None,
            party: Uuid::new_v4(),
            user: None,
            sender_name: "Alice".into(),
            content: "hello".into(),
            kind: MessageKind::Text,
            created_at: None,
        };
        let value = serde_json::to_value(ServerEvent::ChatNew {
            message: msg.clone(),
        })
        .unwrap();
        assert_eq!(value["event"], "chat:new");
        assert_eq!(value["content"], "hello");
        assert_eq!(value["type"], "text");
        assert_eq!(value["party"], Value::String(msg.party.to_string()));
    }

    #[test]
    fn media_snapshot_roundtrip_keeps_partial_fields() {
        let json = r#"{"currentTime":42.5,"isPlaying":true}"#;
        let snap: MediaSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.current_time, Some(42.5));
        assert_eq!(snap.is_playing, Some(true));
        assert!(snap.video_url.is_none());

        let out = serde_json::to_value(&snap).unwrap();
        assert!(out.get("videoUrl").is_none());
    }

    #[test]
    fn stroke_uses_camel_case_points() {
        let json = r##"{"prevX":1.0,"prevY":2.0,"x":3.0,"y":4.0,"color":"#fff"}"##;
        let stroke: Stroke = serde_json::from_str(json).unwrap();
        assert_eq!(stroke.prev_x, 1.0);
        assert_eq!(stroke.y, 4.0);
        assert_eq!(stroke.color.as_deref(), Some("#fff"));
        assert!(stroke.size.is_none());
    }
}
