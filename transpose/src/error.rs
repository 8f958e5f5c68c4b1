use crate::messages::Tag;
use crate::report::Report;
use config::ConfigError;
use model::types_and_const::PeerId;
use network::NetworkError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransposeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Peer {peer} failed to allocate {what}")]
    Allocation { peer: PeerId, what: &'static str },

    #[error("Another peer failed to set up the run")]
    RemoteSetup,

    #[error("Failed to build a pool of {threads} threads: {source}")]
    ThreadPool {
        threads: usize,
        source: rayon::ThreadPoolBuildError,
    },

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("Failed to (de)serialize message: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Peer {peer} did not acknowledge a message")]
    MissingAck { peer: PeerId },

    #[error("Peer {peer} sent a block of {received} elements instead of {expected}")]
    BlockSize {
        peer: PeerId,
        expected: usize,
        received: usize,
    },

    #[error("Unexpected message from peer {peer}: {message}")]
    UnexpectedMessage { peer: PeerId, message: String },

    #[error("Received {0:?} twice")]
    DuplicateMessage(Tag),

    #[error("Peer {peer} aborted the run: {reason}")]
    Aborted { peer: PeerId, reason: String },

    #[error("Inbound message channel closed")]
    InboundClosed,

    #[error("Peer {0} is not part of the run")]
    Unreachable(PeerId),

    #[error("Solution does not validate")]
    Validation { report: Option<Box<Report>> },
}

impl TransposeError {
    /// Errors every peer observes at the same point of the run, after agreeing on them.
    /// Any other error is only seen locally and must be announced with an `Abort`.
    pub fn is_collective(&self) -> bool {
        matches!(
            self,
            TransposeError::Config(_)
                | TransposeError::Allocation { .. }
                | TransposeError::RemoteSetup
                | TransposeError::ThreadPool { .. }
                | TransposeError::Aborted { .. }
                | TransposeError::Validation { .. }
        )
    }
}
