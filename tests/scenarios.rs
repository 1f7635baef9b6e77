//! Multi-node integration scenarios (spec §8 S1, S6), kept separate from the
//! per-module unit tests in `src/` because they wire up more than one node
//! as real spawned dispatch loops rather than driving a single `Node` value
//! directly.

use std::time::Duration;

use meshsim::{Edge, Neighbor, Node, SimConfig};

/// spec §8 S6: a three-node line, one origination from A; after flooding
/// settles, B and C hold a route to A and A holds none to itself.
#[tokio::test(start_paused = true)]
async fn three_node_line_flooding_quiesces() {
    let config = SimConfig::default();

    let (mut a, a_handle) = Node::new("A", config);
    let (mut b, b_handle) = Node::new("B", config);
    let (mut c, c_handle) = Node::new("C", config);

    let ab = Edge::new("A->B", 1_000_000.0, 20.0, b_handle.mailbox());
    let ba = Edge::new("B->A", 1_000_000.0, 20.0, a_handle.mailbox());
    let bc = Edge::new("B->C", 1_000_000.0, 20.0, c_handle.mailbox());
    let cb = Edge::new("C->B", 1_000_000.0, 20.0, b_handle.mailbox());

    a.add_neighbor(Neighbor { address: b_handle.address.clone(), packet_success: 0.99, edge: ab });
    b.add_neighbor(Neighbor { address: a_handle.address.clone(), packet_success: 0.99, edge: ba });
    b.add_neighbor(Neighbor { address: c_handle.address.clone(), packet_success: 0.99, edge: bc });
    c.add_neighbor(Neighbor { address: b_handle.address.clone(), packet_success: 0.99, edge: cb });

    let a_task = tokio::spawn(a.run());
    let b_task = tokio::spawn(b.run());
    let c_task = tokio::spawn(c.run());

    // Exactly one origination, not a ticker: `tokio::time::interval` fires
    // on its immediate tick plus every elapsed period, so advancing past
    // one period would originate more than once and the asserted sequence
    // numbers below would no longer hold.
    a_handle.originate();

    // The flood settles synchronously at t=0 (edges here are far under
    // capacity, so transmission delay is negligible); give the three
    // dispatch tasks a moment to drain their mailboxes.
    tokio::time::advance(Duration::from_millis(10)).await;

    let b_route = b_handle.route_to(a_handle.address.clone()).await;
    let c_route = c_handle.route_to(a_handle.address.clone()).await;
    let a_self_route = a_handle.route_to(a_handle.address.clone()).await;

    a_task.abort();
    b_task.abort();
    c_task.abort();

    let (b_next_hop, _, b_seq) = b_route.expect("B should learn a route to A");
    assert_eq!(b_next_hop, a_handle.address);
    assert_eq!(b_seq, 1);

    let (c_next_hop, _, c_seq) = c_route.expect("C should learn a route to A");
    assert_eq!(c_next_hop, b_handle.address);
    assert_eq!(c_seq, 1);

    assert!(a_self_route.is_none(), "A must never hold a forwarding entry to itself (I5/P4)");
}

/// spec §8 S1, run end-to-end through two real nodes rather than a bare
/// `Edge`: a saturated link drops a concurrent send but recovers.
#[tokio::test(start_paused = true)]
async fn edge_drop_recovers_between_two_live_nodes() {
    let config = SimConfig::default();
    let (mut a, a_handle) = Node::new("A", config);
    let (_b, b_handle) = Node::new("B", config);

    let edge = Edge::new("A->B", 1_000_000.0, 20.0, b_handle.mailbox());
    a.add_neighbor(Neighbor { address: b_handle.address.clone(), packet_success: 1.0, edge: edge.clone() });

    let _a_task = tokio::spawn(a.run());

    edge.send(meshsim::Packet {
        source: a_handle.address.clone(),
        destination: b_handle.address.clone(),
        payload: meshsim::Payload::Data(vec![0u8; 100_000]),
    });
    assert!(edge.is_saturated());

    edge.send(meshsim::Packet {
        source: a_handle.address.clone(),
        destination: b_handle.address.clone(),
        payload: meshsim::Payload::Data(vec![0u8; 100_000]),
    });

    tokio::time::advance(Duration::from_millis(900)).await;
    assert!(!edge.is_saturated());
}
