use crate::integration::init_tracing;
use crate::utils::*;
use liveroom_core::{RoomId, SessionDescription, SignalBody, SignalMessage};

#[tokio::test]
async fn test_two_sockets_exchange_offer_and_answer() {
    init_tracing();
    let url = spawn_relay().await.expect("relay starts");

    let (mut alice, success) = WsClient::join(&url, "a").await.expect("a joins");
    assert!(matches!(success.body, SignalBody::JoinSuccess { is_host: true, .. }));
    let (mut bob, _) = WsClient::join(&url, "b").await.expect("b joins");

    let joined = alice.expect("user-joined").await.expect("a hears about b");
    assert_eq!(joined.from, Some(id("b")));

    alice
        .send(
            SignalMessage::new(SignalBody::Offer(SessionDescription::offer("sdp-a")))
                .addressed_to(id("b")),
        )
        .await
        .expect("send offer");
    let offer = bob.expect("offer").await.expect("b gets the offer");
    assert_eq!(offer.from, Some(id("a")));
    assert_eq!(offer.room_id, Some(RoomId::from(ROOM)));

    bob.send(
        SignalMessage::new(SignalBody::Answer(SessionDescription::answer("sdp-b")))
            .addressed_to(id("a")),
    )
    .await
    .expect("send answer");
    let answer = alice.expect("answer").await.expect("a gets the answer");
    assert_eq!(answer.body, SignalBody::Answer(SessionDescription::answer("sdp-b")));
}

#[tokio::test]
async fn test_closing_socket_announces_departure() {
    init_tracing();
    let url = spawn_relay().await.expect("relay starts");

    let (mut alice, _) = WsClient::join(&url, "a").await.expect("a joins");
    let (bob, _) = WsClient::join(&url, "b").await.expect("b joins");
    bob.close().await.expect("close");

    let left = alice.expect("user-left").await.expect("departure announced");
    assert_eq!(left.from, Some(id("b")));
}

#[tokio::test]
async fn test_kicked_socket_is_closed_by_relay() {
    init_tracing();
    let url = spawn_relay().await.expect("relay starts");

    let (mut alice, _) = WsClient::join(&url, "a").await.expect("a joins");
    let (mut bob, _) = WsClient::join(&url, "b").await.expect("b joins");

    alice
        .send(SignalMessage::new(SignalBody::KickUser).addressed_to(id("b")))
        .await
        .expect("send kick");

    bob.expect("kick-user").await.expect("b is told");
    assert!(bob.recv().await.expect("clean close").is_none());
    alice.expect("user-left").await.expect("room is told");
}

#[tokio::test]
async fn test_messages_before_join_are_ignored() {
    init_tracing();
    let url = spawn_relay().await.expect("relay starts");

    let mut early = WsClient::connect(&url).await.expect("connect");
    early
        .send(chat("too early").sent_by(id("x")))
        .await
        .expect("send chat");
    let (mut alice, _) = WsClient::join(&url, "a").await.expect("a joins");

    // the early socket can still join afterwards
    early
        .send(
            SignalMessage::new(SignalBody::Join { username: None })
                .sent_by(id("x"))
                .in_room(RoomId::from(ROOM)),
        )
        .await
        .expect("send join");
    early.expect("join-success").await.expect("x joins");

    let joined = alice.expect("user-joined").await.expect("a hears about x");
    assert_eq!(joined.from, Some(id("x")));
    alice
        .send(chat("hello"))
        .await
        .expect("send chat");
    let hello = early.expect("chat").await.expect("x gets chat");
    assert_eq!(
        hello.body,
        SignalBody::Chat {
            username: Some("name-a".into()),
            content: "hello".into(),
        }
    );
}
