// ============================
// crates/backend-lib/tests/room_lifecycle.rs
// ============================
//! End-to-end exercise of the real-time layer: two participants share a
//! room through a full join / chat / draw / sync / disconnect cycle and
//! the durable records are reconciled behind them.

use std::sync::Arc;
use std::time::Duration;

use backend_lib::coordinator::RoomCoordinator;
use backend_lib::models::{Participant, Party};
use backend_lib::store::{MemoryStore, PartyStore};
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;
use watchparty_common::{
    ChatMessage, ClientEvent, ConnectionId, MediaSnapshot, ServerEvent, Stroke,
};

fn drain(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn stroke(x: f64) -> Stroke {
    Stroke {
        prev_x: x - 1.0,
        prev_y: 0.0,
        x,
        y: 0.0,
        color: Some("#000000".into()),
        size: Some(2.0),
    }
}

fn join_event(room: Uuid, participant: Uuid, name: &str) -> ClientEvent {
    ClientEvent::JoinRoom {
        party_id: room,
        participant_id: participant,
        display_name: name.to_string(),
    }
}

#[tokio::test]
async fn two_participant_session() {
    let store = Arc::new(MemoryStore::new());
    let coordinator = RoomCoordinator::new(store.clone() as Arc<dyn PartyStore>);

    let host = Uuid::new_v4();
    let party = Party::new("movie night".into(), host, "ABC234".into());
    let room = party.id;
    store.create_party(party).await.unwrap();

    let alice = Participant::new(room, Some(host), "Alice".into());
    let bob = Participant::new(room, None, "Bob".into());
    for p in [&alice, &bob] {
        store.insert_participant(p).await.unwrap();
        store.increment_participants(room).await.unwrap();
    }

    let (conn_a, conn_b): (ConnectionId, ConnectionId) = (Uuid::new_v4(), Uuid::new_v4());
    let mut rx_a = coordinator.register(conn_a);
    let mut rx_b = coordinator.register(conn_b);

    // Alice joins and draws before Bob arrives.
    coordinator.handle_event(conn_a, join_event(room, alice.id, "Alice"));
    coordinator.handle_event(
        conn_a,
        ClientEvent::WhiteboardDraw {
            party_id: room,
            stroke: stroke(1.0),
        },
    );
    coordinator.handle_event(
        conn_a,
        ClientEvent::WhiteboardDraw {
            party_id: room,
            stroke: stroke(2.0),
        },
    );
    drain(&mut rx_a);

    // Bob joins: the whole room hears the presence change, only Bob gets
    // the stroke replay.
    coordinator.handle_event(conn_b, join_event(room, bob.id, "Bob"));
    let bob_events = drain(&mut rx_b);
    let replay = bob_events
        .iter()
        .find_map(|e| match e {
            ServerEvent::WhiteboardState { strokes, .. } => Some(strokes.clone()),
            _ => None,
        })
        .expect("replay for the late joiner");
    assert_eq!(replay.iter().map(|s| s.x).collect::<Vec<_>>(), vec![1.0, 2.0]);

    let alice_events = drain(&mut rx_a);
    assert!(alice_events
        .iter()
        .all(|e| !matches!(e, ServerEvent::WhiteboardState { .. })));
    let ServerEvent::ParticipantsUpdate { participants } = alice_events.last().unwrap() else {
        panic!("expected a presence update");
    };
    assert_eq!(participants.len(), 2);

    // Chat reaches everyone, sender included.
    let chat = ChatMessage {
        id: Some(Uuid::new_v4()),
        party: room,
        user: Some(host),
        sender_name: "Alice".into(),
        content: "hello".into(),
        kind: Default::default(),
        created_at: None,
    };
    coordinator.handle_event(
        conn_a,
        ClientEvent::ChatSend {
            message: chat.clone(),
        },
    );
    for rx in [&mut rx_a, &mut rx_b] {
        let events = drain(rx);
        assert_eq!(events, vec![ServerEvent::ChatNew {
            message: chat.clone()
        }]);
    }

    // Media sync skips the sender.
    let snapshot = MediaSnapshot {
        current_time: Some(90.0),
        is_playing: Some(true),
        ..Default::default()
    };
    coordinator.handle_event(
        conn_b,
        ClientEvent::MediaSync {
            party_id: room,
            state: snapshot.clone(),
        },
    );
    assert!(drain(&mut rx_b).is_empty());
    assert_eq!(drain(&mut rx_a), vec![ServerEvent::MediaUpdate {
        state: snapshot
    }]);

    // Alice's socket drops: Bob sees the one-entry presence list at once
    // and the durable side catches up shortly after.
    coordinator.disconnect(conn_a);
    let events = drain(&mut rx_b);
    let ServerEvent::ParticipantsUpdate { participants } = events.last().unwrap() else {
        panic!("expected a presence update");
    };
    assert_eq!(participants.len(), 1);
    assert_eq!(participants[0].display_name, "Bob");

    for _ in 0..200 {
        if store.participant(alice.id).await.unwrap().is_none() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(store.participant(alice.id).await.unwrap().is_none());
    let party = store.party(room).await.unwrap().unwrap();
    assert_eq!(party.participants_count, 1);
    assert!(party.is_active);

    // Bob leaves cleanly; the room is now empty and the sweep may prune it.
    coordinator.handle_event(conn_b, ClientEvent::LeaveRoom { party_id: room });
    coordinator.disconnect(conn_b);
    assert_eq!(coordinator.sweep_idle(Duration::ZERO), 1);
}

#[tokio::test]
async fn interleaved_draws_from_two_senders_keep_arrival_order() {
    let store = Arc::new(MemoryStore::new());
    let coordinator = RoomCoordinator::new(store as Arc<dyn PartyStore>);
    let room = Uuid::new_v4();

    let (conn_a, conn_b, observer) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let mut rx_a = coordinator.register(conn_a);
    let mut rx_b = coordinator.register(conn_b);
    let mut rx_obs = coordinator.register(observer);

    coordinator.handle_event(conn_a, join_event(room, Uuid::new_v4(), "Alice"));
    coordinator.handle_event(conn_b, join_event(room, Uuid::new_v4(), "Bob"));
    coordinator.handle_event(observer, join_event(room, Uuid::new_v4(), "Cara"));
    drain(&mut rx_a);
    drain(&mut rx_b);
    drain(&mut rx_obs);

    // Alice sends even strokes, Bob odd ones, strictly alternating.
    for x in 0..20 {
        let sender = if x % 2 == 0 { conn_a } else { conn_b };
        coordinator.handle_event(
            sender,
            ClientEvent::WhiteboardDraw {
                party_id: room,
                stroke: stroke(f64::from(x)),
            },
        );
    }

    let drawn_xs = |events: Vec<ServerEvent>| -> Vec<f64> {
        events
            .into_iter()
            .filter_map(|e| match e {
                ServerEvent::WhiteboardUpdate { stroke } => Some(stroke.x),
                _ => None,
            })
            .collect()
    };

    // The bystander sees everything in arrival order; each sender sees
    // exactly the other's strokes, once each, still in order.
    let expected_all: Vec<f64> = (0..20).map(f64::from).collect();
    assert_eq!(drawn_xs(drain(&mut rx_obs)), expected_all);
    let odds: Vec<f64> = (0..20).filter(|x| x % 2 == 1).map(f64::from).collect();
    let evens: Vec<f64> = (0..20).filter(|x| x % 2 == 0).map(f64::from).collect();
    assert_eq!(drawn_xs(drain(&mut rx_a)), odds);
    assert_eq!(drawn_xs(drain(&mut rx_b)), evens);

    // The cache replays the merged sequence to a late joiner.
    let late = Uuid::new_v4();
    let mut rx_late = coordinator.register(late);
    coordinator.handle_event(late, join_event(room, Uuid::new_v4(), "Dave"));
    let replay = drain(&mut rx_late)
        .into_iter()
        .find_map(|e| match e {
            ServerEvent::WhiteboardState { strokes, .. } => Some(strokes),
            _ => None,
        })
        .expect("late joiner replay");
    assert_eq!(replay.iter().map(|s| s.x).collect::<Vec<_>>(), expected_all);
}

#[tokio::test]
async fn disconnect_without_join_is_harmless() {
    let store = Arc::new(MemoryStore::new());
    let coordinator = RoomCoordinator::new(store as Arc<dyn PartyStore>);

    let conn = Uuid::new_v4();
    let _rx = coordinator.register(conn);
    coordinator.disconnect(conn);
    coordinator.disconnect(conn);
    assert_eq!(coordinator.connection_count(), 0);
}
