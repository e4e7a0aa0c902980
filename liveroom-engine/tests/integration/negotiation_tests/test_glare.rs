use crate::integration::init_tracing;
use crate::utils::*;
use liveroom_core::{ParticipantId, RoomId, SessionDescription, SignalBody, SignalMessage};
use liveroom_engine::peer::OfferOutcome;
use liveroom_engine::signaling::Outbound;
use liveroom_engine::{LinkState, OutboundFrame, PeerLinkManager, SignalingChannel};
use std::sync::Arc;
use tokio::sync::mpsc;

struct Side {
    id: ParticipantId,
    manager: PeerLinkManager,
    factory: MockTransportFactory,
    out: Outbound,
    sent: mpsc::UnboundedReceiver<OutboundFrame>,
    _events: mpsc::Receiver<liveroom_engine::TransportEvent>,
}

impl Side {
    fn new(user: &str) -> Self {
        let (channel, sent, _inbox, _inbound) = SignalingChannel::in_memory();
        let (tx, rx) = mpsc::channel(16);
        let factory = MockTransportFactory::new();
        Self {
            id: id(user),
            manager: PeerLinkManager::new(Arc::new(factory.clone()), tx),
            factory,
            out: Outbound::new(channel, id(user), RoomId::from(ROOM)),
            sent,
            _events: rx,
        }
    }

    fn next_description(&mut self) -> SessionDescription {
        let Ok(OutboundFrame::Text(text)) = self.sent.try_recv() else {
            panic!("{} sent nothing", self.id);
        };
        match SignalMessage::decode(&text).expect("valid frame").body {
            SignalBody::Offer(d) | SignalBody::Answer(d) => d,
            other => panic!("expected a description, got {}", other.kind()),
        }
    }
}

#[tokio::test]
async fn test_simultaneous_offers_settle_on_one_session() {
    init_tracing();
    let mut a = Side::new("u1");
    let mut b = Side::new("u2");

    a.manager
        .initiate(&b.id, &[], &a.out)
        .await
        .expect("u1 offers");
    b.manager
        .initiate(&a.id, &[], &b.out)
        .await
        .expect("u2 offers");
    let offer_a = a.next_description();
    let offer_b = b.next_description();

    let outcome = a
        .manager
        .handle_offer(&a.id, &b.id, offer_b, &[], &a.out)
        .await
        .expect("u1 handles the crossing offer");
    assert_eq!(outcome, OfferOutcome::KeptLocalOffer);
    assert_eq!(a.manager.state(&b.id), Some(LinkState::AwaitingAnswer));

    let outcome = b
        .manager
        .handle_offer(&b.id, &a.id, offer_a, &[], &b.out)
        .await
        .expect("u2 yields");
    assert_eq!(outcome, OfferOutcome::Answered);
    assert_eq!(b.manager.state(&a.id), Some(LinkState::Stable));

    let answer = b.next_description();
    a.manager
        .handle_answer(&b.id, answer)
        .await
        .expect("u1 applies the answer");
    assert_eq!(a.manager.state(&b.id), Some(LinkState::Stable));

    // both ends describe the same session
    let ta = a.factory.latest(&b.id).expect("u1 transport");
    let tb = b.factory.latest(&a.id).expect("u2 transport");
    assert_eq!(ta.local_description(), tb.remote_description());
    assert_eq!(ta.remote_description(), tb.local_description());

    let yielded = b.factory.created_for(&a.id);
    assert_eq!(yielded.len(), 2);
    assert!(yielded[0].is_closed());
    assert_eq!(a.factory.created_for(&b.id).len(), 1);
}

#[tokio::test]
async fn test_initiator_ignores_crossing_offer() {
    init_tracing();
    let mut h = EngineHarness::start("u1").await;
    h.join_room(&["u2"], false, Some("u2")).await;
    h.expect_sent("offer").await.expect("u1 offers");

    h.deliver(
        from("u2", SignalBody::Offer(SessionDescription::offer("offer from u2")))
            .addressed_to(id("u1")),
    )
    .await;
    h.sync_inbound().await;

    assert!(h.drain_sent().iter().all(|m| m.kind() != "answer"));
    assert_eq!(h.factory.created_for(&id("u2")).len(), 1);
    assert_eq!(
        h.handle.snapshot().link_state(&id("u2")),
        Some(LinkState::AwaitingAnswer)
    );

    h.deliver(
        from("u2", SignalBody::Answer(SessionDescription::answer("answer from u2")))
            .addressed_to(id("u1")),
    )
    .await;
    h.wait_state(|s| s.link_state(&id("u2")) == Some(LinkState::Stable))
        .await
        .expect("kept offer completes");
}

#[tokio::test]
async fn test_offer_on_stable_link_recreates_it() {
    init_tracing();
    let mut h = EngineHarness::start("u2").await;
    h.join_room(&["u1"], false, Some("u1")).await;

    for round in 1..=2 {
        h.deliver(
            from(
                "u1",
                SignalBody::Offer(SessionDescription::offer(format!("offer {round}"))),
            )
            .addressed_to(id("u2")),
        )
        .await;
        h.expect_sent("answer").await.expect("answer each offer");
    }

    let transports = h.factory.created_for(&id("u1"));
    assert_eq!(transports.len(), 2);
    assert!(transports[0].is_closed());
    assert_eq!(
        transports[1].remote_description(),
        Some(SessionDescription::offer("offer 2"))
    );
    h.wait_state(|s| s.link_state(&id("u1")) == Some(LinkState::Stable) && s.links.len() == 1)
        .await
        .expect("single stable link");
}

#[tokio::test]
async fn test_unparseable_offer_closes_link() {
    init_tracing();
    let mut h = EngineHarness::start("u2").await;
    h.join_room(&["u1"], false, Some("u1")).await;

    h.deliver(
        from("u1", SignalBody::Offer(SessionDescription::offer("corrupt")))
            .addressed_to(id("u2")),
    )
    .await;

    h.expect_event(|e| {
        matches!(e, liveroom_engine::EngineEvent::Warning { kind, .. }
            if *kind == liveroom_engine::ErrorKind::Negotiation)
    })
    .await
    .expect("negotiation failure surfaced");
    h.sync_inbound().await;

    assert!(h.drain_sent().iter().all(|m| m.kind() != "answer"));
    assert!(!h.handle.snapshot().links.contains_key(&id("u1")));
    assert!(h.factory.latest(&id("u1")).expect("transport").is_closed());
}
