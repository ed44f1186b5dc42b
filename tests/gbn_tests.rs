//! Integration tests for the Go-Back-N sender and receiver.
//!
//! The state machines are driven directly through their public handlers; the
//! "network" in between is a plain queue owned by the test, so every loss and
//! every corruption is chosen by hand.

use std::collections::VecDeque;
use std::sync::Arc;

use gbn_rdt::gbn_receiver::GbnReceiver;
use gbn_rdt::gbn_sender::GbnSender;
use gbn_rdt::{Action, Event, Message, NetStats, ProtocolConfig, ProtocolError, Segment};
use proptest::prelude::*;

fn endpoints(window_size: usize) -> (GbnSender, GbnReceiver, Arc<NetStats>) {
    let stats = Arc::new(NetStats::new());
    let config = ProtocolConfig {
        window_size,
        pending_capacity: 8,
        retransmit_timeout: 100.0,
    };
    (
        GbnSender::new(&config, Arc::clone(&stats)),
        GbnReceiver::new(Arc::clone(&stats)),
        stats,
    )
}

fn transmitted(actions: &[Action]) -> Vec<Segment> {
    actions
        .iter()
        .filter_map(|a| match a {
            Action::Transmit(seg) => Some(seg.clone()),
            _ => None,
        })
        .collect()
}

fn delivered(actions: &[Action]) -> Vec<String> {
    actions
        .iter()
        .filter_map(|a| match a {
            Action::Deliver(p) => Some(p.clone()),
            _ => None,
        })
        .collect()
}

fn msg(s: &str) -> Message {
    Message::new(Some(s))
}

// ---------------------------------------------------------------------------
// Test 1: a window of four slides on a cumulative ACK
// ---------------------------------------------------------------------------

#[test]
fn test_window_of_four_slides_on_ack() {
    let (mut a, _b, _) = endpoints(4);

    let mut actions = Vec::new();
    for p in ["m1", "m2", "m3", "m4"] {
        actions.extend(a.on_message(msg(p)));
    }
    let seqs: Vec<i32> = transmitted(&actions).iter().map(|s| s.seq).collect();
    assert_eq!(seqs, vec![1, 2, 3, 4]);
    let starts = actions
        .iter()
        .filter(|a| matches!(a, Action::StartTimer(_)))
        .count();
    assert_eq!(starts, 1, "only the first segment arms the timer");
    assert!(!a.can_send());

    // A fifth message waits for room.
    assert!(a.on_message(msg("m5")).is_empty());
    assert_eq!(a.pending(), 1);

    let actions = a.on_segment(Segment::ack(2)).expect("valid ACK");
    assert_eq!(a.base(), 3);
    let sent = transmitted(&actions);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].seq, 5);
    assert_eq!(sent[0].payload, "m5");

    let in_window: Vec<i32> = a.window_entries().map(|e| e.segment.seq).collect();
    assert_eq!(in_window, vec![3, 4, 5]);
    assert_eq!(a.pending(), 0);
    assert!(a.timer_running());
}

// ---------------------------------------------------------------------------
// Test 2: a payload flipped in transit draws a NACK
// ---------------------------------------------------------------------------

#[test]
fn test_flipped_payload_is_nacked() {
    let (_a, mut b, stats) = endpoints(4);

    let mut seg = Segment::data(1, "AB7");
    seg.payload = "AB8".to_owned();
    assert!(seg.is_corrupted());

    let actions = b.on_segment(seg);
    assert_eq!(actions, vec![Action::Transmit(Segment::ack(0))]);
    assert_eq!(b.expected_seq(), 1);
    assert_eq!(stats.snapshot().segments_corrupted, 1);
}

#[test]
fn test_nack_makes_sender_retransmit_window() {
    let (mut a, _b, _) = endpoints(4);
    a.on_message(msg("x"));
    a.on_message(msg("y"));

    let actions = a.on_segment(Segment::ack(0)).expect("NACK is valid");
    let seqs: Vec<i32> = transmitted(&actions).iter().map(|s| s.seq).collect();
    assert_eq!(seqs, vec![1, 2]);
    assert_eq!(a.base(), 1);
    assert_eq!(a.next_seq(), 3);
}

#[test]
fn test_ack_beyond_next_seq_is_rejected() {
    let (mut a, _b, _) = endpoints(4);
    a.on_message(msg("x"));

    let err = a.on_segment(Segment::ack(7)).unwrap_err();
    assert_eq!(
        err,
        ProtocolError::AckBeyondNextSeq {
            ack: 7,
            next_seq: 2
        }
    );
}

// ---------------------------------------------------------------------------
// Test 3: sender and receiver wired back to back
// ---------------------------------------------------------------------------

/// Shuttle segments between A and B until both directions are empty.
/// `drop_to_b` decides, per DATA transmission index, whether it is lost.
fn pump(
    a: &mut GbnSender,
    b: &mut GbnReceiver,
    first: Vec<Action>,
    mut drop_to_b: impl FnMut(usize) -> bool,
) -> Vec<String> {
    let mut to_b: VecDeque<Segment> = VecDeque::new();
    let mut to_a: VecDeque<Segment> = VecDeque::new();
    let mut out = Vec::new();
    let mut data_sent = 0usize;

    let mut enqueue_from_a = |actions: Vec<Action>, to_b: &mut VecDeque<Segment>| {
        for seg in transmitted(&actions) {
            if !drop_to_b(data_sent) {
                to_b.push_back(seg);
            }
            data_sent += 1;
        }
    };
    enqueue_from_a(first, &mut to_b);

    for _ in 0..10_000 {
        if let Some(seg) = to_b.pop_front() {
            let actions = b.handle(Event::Segment(seg));
            out.extend(delivered(&actions));
            to_a.extend(transmitted(&actions));
        } else if let Some(seg) = to_a.pop_front() {
            let actions = a.handle(Event::Segment(seg)).expect("no protocol error");
            enqueue_from_a(actions, &mut to_b);
        } else if a.has_unacked() {
            // Nothing on the wire: the retransmit timer is what fires next.
            let actions = a.handle(Event::TimerFired).expect("timeout never fails");
            enqueue_from_a(actions, &mut to_b);
        } else {
            break;
        }
    }
    out
}

#[test]
fn test_direct_wiring_delivers_in_order() {
    let (mut a, mut b, stats) = endpoints(3);

    let mut first = Vec::new();
    let payloads: Vec<String> = (0..6).map(|i| format!("p{i}")).collect();
    for p in &payloads {
        first.extend(a.on_message(msg(p)));
    }
    assert_eq!(a.pending(), 3);

    let out = pump(&mut a, &mut b, first, |_| false);
    assert_eq!(out, payloads);
    assert!(!a.has_unacked());
    assert!(!a.timer_running());
    assert_eq!(b.expected_seq(), 7);
    assert_eq!(stats.snapshot().messages_delivered, 6);
}

// ---------------------------------------------------------------------------
// Test 4: recovery after losses
// ---------------------------------------------------------------------------

#[test]
fn test_recovers_after_losing_first_transmissions() {
    let (mut a, mut b, stats) = endpoints(4);

    let mut first = Vec::new();
    let payloads = ["one", "two", "three", "four"];
    for p in payloads {
        first.extend(a.on_message(msg(p)));
    }

    // The whole first window and one retransmission are lost.
    let out = pump(&mut a, &mut b, first, |i| i < 5);
    assert_eq!(out, payloads);
    assert!(!a.has_unacked());

    let snap = stats.snapshot();
    assert_eq!(snap.messages_delivered, 4);
    assert!(snap.segments_lost >= 1);
}

#[test]
fn test_lost_middle_segment_is_discarded_then_resent() {
    let (mut a, mut b, _) = endpoints(4);

    let mut first = Vec::new();
    for p in ["a", "b", "c"] {
        first.extend(a.on_message(msg(p)));
    }

    // Drop seq 2 on its first trip; seq 3 arrives out of order and is ignored.
    let out = pump(&mut a, &mut b, first, |i| i == 1);
    assert_eq!(out, vec!["a", "b", "c"]);
    assert_eq!(b.expected_seq(), 4);
}

// ---------------------------------------------------------------------------
// Test 5: in-order delivery for arbitrary workloads and loss patterns
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn test_any_workload_is_delivered_in_order(
        window_size in 1usize..6,
        // Window plus the 8-slot pending queue, so nothing is dropped.
        payloads in proptest::collection::vec("[a-zA-Z0-9 ]{0,20}", 1..=9),
        losses in proptest::collection::vec(any::<bool>(), 0..40),
    ) {
        let (mut a, mut b, stats) = endpoints(window_size);

        let mut first = Vec::new();
        for p in &payloads {
            first.extend(a.on_message(msg(p)));
        }

        let out = pump(&mut a, &mut b, first, |i| losses.get(i).copied().unwrap_or(false));
        prop_assert_eq!(&out, &payloads);
        prop_assert!(!a.has_unacked());
        prop_assert_eq!(stats.snapshot().messages_dropped, 0);
        prop_assert_eq!(stats.snapshot().messages_delivered, payloads.len() as u64);
    }
}
