use super::*;
use std::collections::HashSet;

#[test]
fn ring_pairs_every_ordered_pair_once() {
    for num_peers in 2..9 {
        let mut seen = HashSet::new();
        for phase in 1..num_peers {
            for me in 0..num_peers {
                let (_, send_to) = ring_partners(me, phase, num_peers);
                assert_ne!(me, send_to);
                assert!(seen.insert((me, send_to)));
            }
        }
        assert_eq!(seen.len(), num_peers * (num_peers - 1));
    }
}

#[test]
fn ring_partners_are_symmetric() {
    // If `a` sends to `b` at some phase, `b` receives from `a` at the same phase.
    let num_peers = 5;
    for phase in 1..num_peers {
        for me in 0..num_peers {
            let (_, send_to) = ring_partners(me, phase, num_peers);
            let (recv_from, _) = ring_partners(send_to, phase, num_peers);
            assert_eq!(recv_from, me);
        }
    }
}

#[test]
#[should_panic]
fn ring_partners_rejects_phase_zero() {
    ring_partners(0, 0, 4);
}

#[test]
fn transpose_bytes_counts_read_and_write() {
    assert_eq!(transpose_bytes(4), 2 * 8 * 16);
}
