//! End-to-end requester round tests.
//!
//! A scripted peer socket plays the responders: it waits for the broadcast,
//! then injects a fixed sequence of raw datagrams back to the requester.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use quorum::protocol::CloseReason;
use quorum::transport::{Transport, UdpTransport};
use quorum::{Requester, RequesterSettings};

const WAIT: Duration = Duration::from_millis(500);

/// Requester whose only target is `peer`, plus the peer itself.
async fn setup() -> (Requester<UdpTransport>, UdpTransport) {
    let peer = UdpTransport::localhost("peer", 0).await.unwrap();
    let transport = UdpTransport::localhost("requester", 0).await.unwrap();
    let requester = Requester::new(
        transport,
        vec![peer.local_addr()],
        RequesterSettings::immediate(WAIT),
    );
    (requester, peer)
}

/// Wait for the broadcast, then send `replies` to its source in order.
fn script(peer: UdpTransport, replies: &[&[u8]]) -> tokio::task::JoinHandle<()> {
    let replies: Vec<Vec<u8>> = replies.iter().map(|r| r.to_vec()).collect();
    tokio::spawn(async move {
        let mut buf = [0u8; 32];
        let (_, requester): (usize, SocketAddr) = peer.recv_from(&mut buf).await.unwrap();
        for reply in replies {
            peer.send_to(&reply, requester).await.unwrap();
        }
        // Keep the socket open until the round is over
        tokio::time::sleep(WAIT * 2).await;
    })
}

#[tokio::test]
async fn test_ok_ok_satisfies_and_closes_early() {
    let (mut requester, peer) = setup().await;
    let peer_task = script(peer, &[b"Ok_1", b"Ok_1"]);

    let start = Instant::now();
    let outcome = requester.run_round(1).await.unwrap();

    assert!(outcome.satisfied);
    assert_eq!(outcome.reason, CloseReason::Quorum);
    assert_eq!(outcome.affirmative, 2);
    assert!(start.elapsed() < WAIT, "quorum must close the round early");
    peer_task.abort();
}

#[tokio::test]
async fn test_ok_no_no_fails_at_deadline() {
    let (mut requester, peer) = setup().await;
    let peer_task = script(peer, &[b"Ok_1", b"No_1", b"No_1"]);

    let outcome = requester.run_round(1).await.unwrap();

    assert!(!outcome.satisfied);
    assert_eq!(outcome.reason, CloseReason::Timeout);
    assert_eq!(outcome.affirmative, 1);
    assert_eq!(outcome.negative, 2);
    assert!(outcome.elapsed >= WAIT);
    peer_task.abort();
}

#[tokio::test]
async fn test_no_replies_bounded_by_wait_budget() {
    let (mut requester, peer) = setup().await;
    let peer_task = script(peer, &[]);

    let start = Instant::now();
    let outcome = requester.run_round(1).await.unwrap();

    assert!(!outcome.satisfied);
    assert_eq!(outcome.affirmative, 0);
    assert!(start.elapsed() >= WAIT);
    assert!(start.elapsed() < WAIT + Duration::from_millis(300));
    peer_task.abort();
}

#[tokio::test]
async fn test_stale_replies_do_not_count() {
    let (mut requester, peer) = setup().await;
    let peer_task = script(peer, &[b"Ok_2", b"Ok_2", b"Ok_0", b"Ok_1"]);

    let outcome = requester.run_round(1).await.unwrap();

    assert!(!outcome.satisfied);
    assert_eq!(outcome.affirmative, 1);
    assert_eq!(requester.metrics().stale_replies(), 2);
    // "Ok_0" is not a valid period at all
    assert_eq!(requester.metrics().malformed_datagrams(), 1);
    peer_task.abort();
}

#[tokio::test]
async fn test_malformed_replies_are_noise() {
    let (mut requester, peer) = setup().await;
    let peer_task = script(
        peer,
        &[
            b"garbage",
            b"Ok",
            b"Ok_",
            b"Yes_1",
            b"ok_1",
            b"#NeedSupport_1",
            b"\xff\x00\x13",
            b"Ok_1",
            b"Ok_1",
        ],
    );

    let outcome = requester.run_round(1).await.unwrap();

    assert!(outcome.satisfied);
    assert_eq!(outcome.affirmative, 2);
    assert_eq!(requester.metrics().malformed_datagrams(), 7);
    peer_task.abort();
}

#[tokio::test]
async fn test_metrics_accumulate_across_rounds() {
    let (mut requester, peer) = setup().await;

    let peer_task = tokio::spawn(async move {
        let mut buf = [0u8; 32];
        // Round 1: quorum
        let (_, requester) = peer.recv_from(&mut buf).await.unwrap();
        peer.send_to(b"Ok_1", requester).await.unwrap();
        peer.send_to(b"Ok_1", requester).await.unwrap();
        // Round 2: a late Ok for round 1 and a single Ok for round 2
        peer.recv_from(&mut buf).await.unwrap();
        peer.send_to(b"Ok_1", requester).await.unwrap();
        peer.send_to(b"Ok_2", requester).await.unwrap();
        tokio::time::sleep(WAIT * 2).await;
    });

    requester.run_round(1).await.unwrap();
    requester.run_round(2).await.unwrap();

    let metrics = requester.metrics();
    assert_eq!(metrics.periods(), 2);
    assert_eq!(metrics.satisfied(), 1);
    assert_eq!(metrics.satisfaction_percent(), 50.0);
    assert_eq!(metrics.stale_replies(), 1);
    assert_eq!(metrics.rounds()[1].affirmative, 1);
    peer_task.abort();
}
