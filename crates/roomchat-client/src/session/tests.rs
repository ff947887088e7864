use std::time::Duration;

use tokio::sync::mpsc;

use super::*;
use crate::error::ClientError;
use crate::message::Message;
use crate::protocol::{InboundEvent, JoinRoomPayload, OutboundEvent, SendMessagePayload};
use crate::testing::MockConnector;
use crate::transport::{
    DisconnectReason, ReconnectPolicy, TransportCommand, TransportEvent, TransportRemote,
};

type Opened = mpsc::UnboundedReceiver<(ReconnectPolicy, TransportRemote)>;

fn manager() -> (ConnectionManager<MockConnector>, Opened) {
    let (connector, opened) = MockConnector::new();
    (
        ConnectionManager::new(connector, ReconnectPolicy::default()),
        opened,
    )
}

fn take_remote(opened: &mut Opened) -> TransportRemote {
    opened.try_recv().expect("a transport was opened").1
}

/// Join `room1` as alice and complete the connection.
fn connected(mgr: &mut ConnectionManager<MockConnector>, opened: &mut Opened) -> TransportRemote {
    mgr.join("room1", Some("alice")).unwrap();
    let mut remote = take_remote(opened);
    remote.events.send(TransportEvent::Connected).unwrap();
    mgr.process_pending();
    match remote.commands.try_recv() {
        Ok(TransportCommand::Emit(OutboundEvent::JoinRoom(_))) => {}
        other => panic!("expected join_room, got {other:?}"),
    }
    remote
}

fn deliver(
    mgr: &mut ConnectionManager<MockConnector>,
    remote: &TransportRemote,
    event: TransportEvent,
) {
    remote.events.send(event).unwrap();
    mgr.process_pending();
}

fn contents(mgr: &ConnectionManager<MockConnector>) -> Vec<String> {
    mgr.snapshot()
        .messages
        .iter()
        .map(|m| m.content.clone())
        .collect()
}

// ---------------------------------------------------------------------------
// join
// ---------------------------------------------------------------------------

#[test]
fn blank_room_id_opens_nothing() {
    let (mut mgr, mut opened) = manager();
    let before = mgr.snapshot();

    assert!(matches!(mgr.join("", None), Err(ClientError::EmptyRoomId)));
    assert!(matches!(mgr.join("   ", Some("alice")), Err(ClientError::EmptyRoomId)));

    assert!(opened.try_recv().is_err());
    assert!(!mgr.has_transport());
    assert_eq!(mgr.snapshot(), before);
}

#[test]
fn blank_room_id_leaves_existing_session_alone() {
    let (mut mgr, mut opened) = manager();
    let _remote = connected(&mut mgr, &mut opened);

    assert!(mgr.join(" ", None).is_err());
    assert_eq!(mgr.status(), ConnectionStatus::Connected);
    assert_eq!(mgr.snapshot().room_id, "room1");
}

#[test]
fn join_starts_connecting_with_empty_log() {
    let (mut mgr, mut opened) = manager();
    mgr.join("  room1 ", Some("  ")).unwrap();

    let snap = mgr.snapshot();
    assert_eq!(snap.room_id, "room1");
    assert_eq!(snap.display_name, None);
    assert_eq!(snap.status, ConnectionStatus::Connecting);
    assert!(snap.messages.is_empty());

    let (policy, _remote) = opened.try_recv().unwrap();
    assert_eq!(policy, ReconnectPolicy::default());
}

#[test]
fn connect_sends_join_room_with_user_name() {
    let (mut mgr, mut opened) = manager();
    mgr.join("room1", Some("alice")).unwrap();
    let mut remote = take_remote(&mut opened);

    deliver(&mut mgr, &remote, TransportEvent::Connected);

    assert_eq!(mgr.status(), ConnectionStatus::Connected);
    assert_eq!(
        remote.commands.try_recv().unwrap(),
        TransportCommand::Emit(OutboundEvent::JoinRoom(JoinRoomPayload {
            room_id: "room1".into(),
            user_name: Some("alice".into()),
        }))
    );
}

#[test]
fn second_join_closes_first_transport() {
    let (mut mgr, mut opened) = manager();
    let mut first = connected(&mut mgr, &mut opened);
    deliver(
        &mut mgr,
        &first,
        TransportEvent::Inbound(InboundEvent::Message(Message::chat("bob", "old"))),
    );

    mgr.join("room2", None).unwrap();
    let second = take_remote(&mut opened);

    assert_eq!(first.commands.try_recv().unwrap(), TransportCommand::Close);
    // Late events from the first transport cannot reach the new session.
    assert!(first
        .events
        .send(TransportEvent::Inbound(InboundEvent::Message(Message::chat(
            "bob", "stale"
        ))))
        .is_err());

    mgr.process_pending();
    let snap = mgr.snapshot();
    assert_eq!(snap.room_id, "room2");
    assert_eq!(snap.status, ConnectionStatus::Connecting);
    assert!(snap.messages.is_empty());
    drop(second);
}

// ---------------------------------------------------------------------------
// inbound
// ---------------------------------------------------------------------------

#[test]
fn history_then_message_scenario() {
    let (mut mgr, mut opened) = manager();
    let remote = connected(&mut mgr, &mut opened);

    deliver(
        &mut mgr,
        &remote,
        TransportEvent::Inbound(InboundEvent::History(vec![])),
    );
    let hi: Message =
        serde_json::from_value(serde_json::json!({"content": "hi", "isSelf": false})).unwrap();
    deliver(
        &mut mgr,
        &remote,
        TransportEvent::Inbound(InboundEvent::Message(hi.clone())),
    );

    assert_eq!(mgr.snapshot().messages.to_vec(), vec![hi]);
}

#[test]
fn history_replaces_log_in_order() {
    let (mut mgr, mut opened) = manager();
    let remote = connected(&mut mgr, &mut opened);
    let batch = vec![
        Message::chat("a", "one"),
        Message::system("two"),
        Message::chat("b", "three"),
    ];

    deliver(
        &mut mgr,
        &remote,
        TransportEvent::Inbound(InboundEvent::History(batch.clone())),
    );

    assert_eq!(mgr.snapshot().messages.to_vec(), batch);
}

#[test]
fn each_message_appends_one_entry() {
    let (mut mgr, mut opened) = manager();
    let remote = connected(&mut mgr, &mut opened);
    deliver(
        &mut mgr,
        &remote,
        TransportEvent::Inbound(InboundEvent::History(vec![Message::system("h")])),
    );

    for (i, text) in ["a", "b", "a"].iter().enumerate() {
        deliver(
            &mut mgr,
            &remote,
            TransportEvent::Inbound(InboundEvent::Message(Message::chat("x", *text))),
        );
        let snap = mgr.snapshot();
        assert_eq!(snap.messages.len(), i + 2);
        assert_eq!(snap.messages.last().unwrap().content, *text);
    }
}

#[test]
fn history_after_live_message_keeps_live_message() {
    let (mut mgr, mut opened) = manager();
    let remote = connected(&mut mgr, &mut opened);

    deliver(
        &mut mgr,
        &remote,
        TransportEvent::Inbound(InboundEvent::Message(Message::chat("c", "live"))),
    );
    deliver(
        &mut mgr,
        &remote,
        TransportEvent::Inbound(InboundEvent::History(vec![Message::chat("a", "h1")])),
    );

    assert_eq!(contents(&mgr), vec!["h1", "live"]);
}

#[test]
fn unknown_events_do_not_publish() {
    let (mut mgr, mut opened) = manager();
    let remote = connected(&mut mgr, &mut opened);
    let mut state = mgr.subscribe();
    state.mark_unchanged();

    deliver(
        &mut mgr,
        &remote,
        TransportEvent::Inbound(InboundEvent::Other {
            name: "typing".into(),
        }),
    );

    assert!(!state.has_changed().unwrap());
}

// ---------------------------------------------------------------------------
// send
// ---------------------------------------------------------------------------

#[test]
fn send_emits_trimmed_text_without_touching_log() {
    let (mut mgr, mut opened) = manager();
    let mut remote = connected(&mut mgr, &mut opened);

    mgr.send("  hello ").unwrap();

    assert_eq!(
        remote.commands.try_recv().unwrap(),
        TransportCommand::Emit(OutboundEvent::SendMessage(SendMessagePayload::new(
            "room1", "hello"
        )))
    );
    assert!(mgr.snapshot().messages.is_empty());
}

#[test]
fn send_empty_while_connected_emits_nothing() {
    let (mut mgr, mut opened) = manager();
    let mut remote = connected(&mut mgr, &mut opened);

    assert!(matches!(mgr.send(""), Err(ClientError::EmptyMessage)));
    assert!(matches!(mgr.send(" \t "), Err(ClientError::EmptyMessage)));
    assert!(remote.commands.try_recv().is_err());
    assert!(mgr.snapshot().messages.is_empty());
}

#[test]
fn send_while_disconnected_emits_nothing() {
    let (mut mgr, mut opened) = manager();
    assert!(matches!(mgr.send("hi"), Err(ClientError::NotConnected)));

    mgr.join("room1", None).unwrap();
    let mut remote = take_remote(&mut opened);
    assert!(matches!(mgr.send("hi"), Err(ClientError::NotConnected)));
    assert!(remote.commands.try_recv().is_err());

    deliver(&mut mgr, &remote, TransportEvent::Connected);
    remote.commands.try_recv().unwrap();
    deliver(
        &mut mgr,
        &remote,
        TransportEvent::Disconnected {
            reason: DisconnectReason::TransportClosed,
        },
    );
    assert!(matches!(mgr.send("hi"), Err(ClientError::NotConnected)));
    assert!(remote.commands.try_recv().is_err());
    assert!(mgr.snapshot().messages.is_empty());
}

#[test]
fn send_after_transport_task_ended_is_rejected() {
    let (mut mgr, mut opened) = manager();
    let remote = connected(&mut mgr, &mut opened);
    remote
        .events
        .send(TransportEvent::Disconnected {
            reason: DisconnectReason::ServerDisconnect,
        })
        .unwrap();
    drop(remote);
    let mut notices = mgr.subscribe_notices();

    let err = mgr.send("hi").unwrap_err();
    assert!(matches!(err, ClientError::NotConnected));
    assert!(err.is_rejection());

    assert!(mgr.snapshot().messages.is_empty());
    assert!(!mgr.has_transport());
    assert_eq!(mgr.status(), ConnectionStatus::Disconnected);
    // The queued disconnect was still handled.
    assert_eq!(notices.try_recv().unwrap(), SessionNotice::ServerClosed);
    assert!(matches!(mgr.send("hi"), Err(ClientError::NotConnected)));
}

// ---------------------------------------------------------------------------
// disconnect / reconnect
// ---------------------------------------------------------------------------

#[test]
fn disconnect_keeps_log() {
    let (mut mgr, mut opened) = manager();
    let remote = connected(&mut mgr, &mut opened);
    deliver(
        &mut mgr,
        &remote,
        TransportEvent::Inbound(InboundEvent::History(vec![Message::chat("a", "h1")])),
    );

    deliver(
        &mut mgr,
        &remote,
        TransportEvent::Disconnected {
            reason: DisconnectReason::PingTimeout,
        },
    );

    let snap = mgr.snapshot();
    assert_eq!(snap.status, ConnectionStatus::Disconnected);
    assert_eq!(contents(&mgr), vec!["h1"]);
    assert!(mgr.has_transport());
}

#[test]
fn messages_while_disconnected_are_ignored() {
    let (mut mgr, mut opened) = manager();
    let remote = connected(&mut mgr, &mut opened);
    deliver(
        &mut mgr,
        &remote,
        TransportEvent::Disconnected {
            reason: DisconnectReason::TransportError,
        },
    );
    deliver(
        &mut mgr,
        &remote,
        TransportEvent::Inbound(InboundEvent::Message(Message::chat("a", "late"))),
    );
    assert!(mgr.snapshot().messages.is_empty());
}

#[test]
fn reconnect_rejoins_room() {
    let (mut mgr, mut opened) = manager();
    let mut remote = connected(&mut mgr, &mut opened);
    deliver(
        &mut mgr,
        &remote,
        TransportEvent::Disconnected {
            reason: DisconnectReason::TransportClosed,
        },
    );
    deliver(&mut mgr, &remote, TransportEvent::Connected);

    assert_eq!(mgr.status(), ConnectionStatus::Connected);
    assert!(matches!(
        remote.commands.try_recv(),
        Ok(TransportCommand::Emit(OutboundEvent::JoinRoom(_)))
    ));
}

#[test]
fn reconnect_exhaustion_publishes_terminal_notice() {
    let (mut mgr, mut opened) = manager();
    let mut notices = mgr.subscribe_notices();
    let remote = connected(&mut mgr, &mut opened);

    deliver(&mut mgr, &remote, TransportEvent::Error("refused".into()));
    deliver(
        &mut mgr,
        &remote,
        TransportEvent::ReconnectFailed { attempts: 5 },
    );

    assert_eq!(
        notices.try_recv().unwrap(),
        SessionNotice::TransportError("refused".into())
    );
    assert_eq!(
        notices.try_recv().unwrap(),
        SessionNotice::ReconnectExhausted { attempts: 5 }
    );
    let snap = mgr.snapshot();
    assert!(snap.reconnect_exhausted);
    assert_eq!(snap.status, ConnectionStatus::Disconnected);
}

#[test]
fn transport_error_does_not_change_status() {
    let (mut mgr, mut opened) = manager();
    let remote = connected(&mut mgr, &mut opened);
    deliver(&mut mgr, &remote, TransportEvent::Error("bad packet".into()));
    assert_eq!(mgr.status(), ConnectionStatus::Connected);
}

#[test]
fn server_disconnect_publishes_server_closed() {
    let (mut mgr, mut opened) = manager();
    let mut notices = mgr.subscribe_notices();
    let remote = connected(&mut mgr, &mut opened);

    deliver(
        &mut mgr,
        &remote,
        TransportEvent::Disconnected {
            reason: DisconnectReason::ServerDisconnect,
        },
    );

    assert_eq!(notices.try_recv().unwrap(), SessionNotice::ServerClosed);
    assert_eq!(mgr.status(), ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn ended_transport_marks_session_disconnected() {
    let (mut mgr, mut opened) = manager();
    mgr.join("room1", None).unwrap();
    let remote = take_remote(&mut opened);
    drop(remote);

    let next = tokio::time::timeout(Duration::from_secs(1), mgr.next_event())
        .await
        .unwrap();
    assert_eq!(next, None);
    assert!(!mgr.has_transport());
    assert_eq!(mgr.status(), ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn pump_handles_events_until_transport_ends() {
    let (mut mgr, mut opened) = manager();
    mgr.join("room1", None).unwrap();
    let remote = take_remote(&mut opened);
    remote.events.send(TransportEvent::Connected).unwrap();
    remote
        .events
        .send(TransportEvent::Inbound(InboundEvent::History(vec![
            Message::system("welcome"),
        ])))
        .unwrap();
    drop(remote);

    tokio::time::timeout(Duration::from_secs(1), mgr.pump())
        .await
        .unwrap();

    assert_eq!(contents(&mgr), vec!["welcome"]);
    assert_eq!(mgr.status(), ConnectionStatus::Disconnected);
}

// ---------------------------------------------------------------------------
// leave / teardown
// ---------------------------------------------------------------------------

#[test]
fn leave_is_idempotent_and_keeps_log() {
    let (mut mgr, mut opened) = manager();
    let mut remote = connected(&mut mgr, &mut opened);
    deliver(
        &mut mgr,
        &remote,
        TransportEvent::Inbound(InboundEvent::History(vec![Message::chat("a", "h1")])),
    );

    mgr.leave();
    mgr.leave();

    assert_eq!(remote.commands.try_recv().unwrap(), TransportCommand::Close);
    assert!(remote.commands.try_recv().is_err());
    assert!(!mgr.has_transport());
    assert_eq!(mgr.status(), ConnectionStatus::Disconnected);
    assert_eq!(contents(&mgr), vec!["h1"]);
}

#[test]
fn leave_without_session_is_a_no_op() {
    let (mut mgr, _opened) = manager();
    mgr.leave();
    assert_eq!(mgr.snapshot(), SessionSnapshot::default());
}

#[test]
fn teardown_publishes_empty_snapshot() {
    let (mut mgr, mut opened) = manager();
    let mut state = mgr.subscribe();
    let mut remote = connected(&mut mgr, &mut opened);
    deliver(
        &mut mgr,
        &remote,
        TransportEvent::Inbound(InboundEvent::Message(Message::chat("a", "x"))),
    );

    mgr.teardown();

    assert_eq!(remote.commands.try_recv().unwrap(), TransportCommand::Close);
    assert!(state.has_changed().unwrap());
    assert_eq!(*state.borrow_and_update(), SessionSnapshot::default());
}

#[test]
fn dropping_manager_closes_transport() {
    let (mut mgr, mut opened) = manager();
    let mut remote = connected(&mut mgr, &mut opened);
    drop(mgr);
    assert_eq!(remote.commands.try_recv().unwrap(), TransportCommand::Close);
}

#[test]
fn subscribers_see_every_change() {
    let (mut mgr, mut opened) = manager();
    let mut state = mgr.subscribe();

    mgr.join("room1", None).unwrap();
    assert!(state.has_changed().unwrap());
    assert_eq!(
        state.borrow_and_update().status,
        ConnectionStatus::Connecting
    );

    let remote = take_remote(&mut opened);
    deliver(&mut mgr, &remote, TransportEvent::Connected);
    assert!(state.has_changed().unwrap());
    assert_eq!(state.borrow_and_update().status, ConnectionStatus::Connected);
}
