use config::Parameters;
use model::types_and_const::{Iteration, PeerId, Phase, Sequence};
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "tests/messages_tests.rs"]
pub mod messages_tests;

/// Everything peers send to each other.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum PeerMessage {
    /// One transposed block of the ring exchange, `block_order^2` doubles in column-major order.
    Block {
        sender: PeerId,
        iteration: Iteration,
        phase: Phase,
        data: Vec<f64>,
    },
    /// A contribution to (or the result of) a collective operation.
    Collective {
        sender: PeerId,
        sequence: Sequence,
        payload: CollectivePayload,
    },
    /// The sender hit a fatal error; no peer should wait for it anymore.
    Abort { sender: PeerId, reason: String },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum CollectivePayload {
    Arrive,
    Release,
    Value(f64),
    Flag(bool),
    /// Parameters validated by the root, or `None` if the root rejected them.
    Parameters(Option<Parameters>),
}

/// Identifies the single message a peer waits for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    Block {
        sender: PeerId,
        iteration: Iteration,
        phase: Phase,
    },
    Collective {
        sender: PeerId,
        sequence: Sequence,
    },
}

impl PeerMessage {
    pub fn sender(&self) -> PeerId {
        match self {
            PeerMessage::Block { sender, .. }
            | PeerMessage::Collective { sender, .. }
            | PeerMessage::Abort { sender, .. } => *sender,
        }
    }

    /// `Abort` messages are not waited for, so they have no tag.
    pub fn tag(&self) -> Option<Tag> {
        match self {
            PeerMessage::Block {
                sender,
                iteration,
                phase,
                ..
            } => Some(Tag::Block {
                sender: *sender,
                iteration: *iteration,
                phase: *phase,
            }),
            PeerMessage::Collective {
                sender, sequence, ..
            } => Some(Tag::Collective {
                sender: *sender,
                sequence: *sequence,
            }),
            PeerMessage::Abort { .. } => None,
        }
    }
}
