// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for Prometheus metric keys
pub const WS_CONNECTION: &str = "ws.connection";
pub const WS_ACTIVE: &str = "ws.active";
pub const WS_EVENT: &str = "ws.event";
pub const WS_MALFORMED: &str = "ws.malformed";
pub const PARTY_CREATED: &str = "party.created";
pub const PARTICIPANT_JOINED: &str = "participant.joined";
pub const MESSAGE_STORED: &str = "message.stored";
pub const ROOM_SWEPT: &str = "room.swept";
