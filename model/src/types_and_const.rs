#[cfg(test)]
#[path = "tests/types_and_const_tests.rs"]
pub mod types_and_const_tests;

/// Index of a peer in the committee, in `0..num_peers`.
pub type PeerId = usize;
/// Step of the ring exchange, in `1..num_peers`.
pub type Phase = usize;
/// Iteration of the benchmark loop. Iteration 0 is the warm-up.
pub type Iteration = usize;
/// Position of a collective operation in the sequence every peer executes.
pub type Sequence = u64;

/// The peer that validates parameters and receives reductions.
pub const ROOT: PeerId = 0;

/// The default channel capacity.
pub const CHANNEL_CAPACITY: usize = 1_000;

/// Largest frame accepted on the wire. One frame carries one block, which bounds the block
/// order of runs over the network.
pub const MAX_FRAME_SIZE: usize = 1 << 31;

/// Upper bound on the number of threads a peer may request.
pub const MAX_THREADS: usize = 512;

/// Tile order used when none is given on the command line.
pub const DEFAULT_TILE_ORDER: usize = 32;

/// Aggregate absolute error under which a run validates.
pub const EPSILON: f64 = 1.0e-8;

/// Value the destination matrix holds before the first transpose.
pub const SENTINEL: f64 = -1.0;

/// Returns `(recv_from, send_to)` for `me` at `phase` of the ring exchange.
///
/// The two partners are offset by `phase` in opposite directions, so over phases
/// `1..num_peers` every ordered pair of distinct peers is matched exactly once.
pub fn ring_partners(me: PeerId, phase: Phase, num_peers: usize) -> (PeerId, PeerId) {
    assert!(num_peers > 0, "num_peers must be positive");
    assert!(phase > 0 && phase < num_peers, "phase must be in 1..num_peers");

    let recv_from = (me + phase) % num_peers;
    let send_to = (me + num_peers - phase) % num_peers;
    (recv_from, send_to)
}

/// Bytes moved by one transpose of an `order x order` matrix of `f64`: every element
/// is read from the source and written to the destination once.
pub fn transpose_bytes(order: usize) -> usize {
    2 * std::mem::size_of::<f64>() * order * order
}
