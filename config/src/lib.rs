// Copyright(C) Facebook, Inc. and its affiliates.
use log::info;
use model::file_io::{Export, FileIoError, Import};
use model::types_and_const::{PeerId, DEFAULT_TILE_ORDER, MAX_THREADS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::fmt;
use std::net::SocketAddr;
use thiserror::Error;

#[cfg(test)]
#[path = "tests/config_tests.rs"]
pub mod config_tests;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid number of threads: {0} (must be in 1..={max})", max = MAX_THREADS)]
    InvalidThreads(usize),

    #[error("Iterations must be >= 1: {0}")]
    InvalidIterations(usize),

    #[error("Matrix order {order} should be at least the number of peers {peers}")]
    OrderTooSmall { order: usize, peers: usize },

    #[error("Matrix order {order} should be divisible by the number of peers {peers}")]
    OrderNotDivisible { order: usize, peers: usize },

    #[error("Blocks of order {block_order} exceed the {max_len} elements a message can carry")]
    BlockTooLarge { block_order: usize, max_len: usize },

    #[error("Not enough ports from {base_port} for {peers} peers")]
    PortOutOfRange { base_port: u16, peers: usize },

    #[error("Peer {0} is not in the committee")]
    NotInCommittee(PeerId),

    #[error("Committee peers must be numbered 0..{0}")]
    MalformedCommittee(usize),

    #[error("The root peer aborted the run because of invalid parameters")]
    RejectedByRoot,

    #[error(transparent)]
    File(#[from] FileIoError),
}

/// How blocks are exchanged with the ring partners at every phase.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeMode {
    /// A single combined send-and-receive per phase.
    Blocking,
    /// The send is issued and the next outgoing block is transposed while the
    /// current exchange completes.
    Overlapped,
}

impl fmt::Display for ExchangeMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExchangeMode::Blocking => write!(f, "Blocking messages"),
            ExchangeMode::Overlapped => write!(f, "Non-Blocking messages"),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Parameters {
    /// The number of threads each peer uses for its local work.
    pub threads: usize,
    /// The number of timed iterations. One extra warm-up iteration always runs first.
    pub iterations: usize,
    /// The order of the global (square) matrix.
    pub order: usize,
    /// The side of the tiles used by the local transpose. Zero disables tiling.
    pub tile_order: usize,
    /// How blocks are exchanged between peers.
    pub exchange: ExchangeMode,
    /// Iterate tiles along both block dimensions in parallel.
    pub collapse: bool,
    /// Turn tiling off when there are fewer tiles to work on than threads.
    pub idle_thread_guard: bool,
    /// Compress blocks on the wire.
    pub compress: bool,
    /// Print the summed error along with the report.
    pub verbose: bool,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            threads: 1,
            iterations: 10,
            order: 1_024,
            tile_order: DEFAULT_TILE_ORDER,
            exchange: ExchangeMode::Overlapped,
            collapse: false,
            idle_thread_guard: true,
            compress: false,
            verbose: false,
        }
    }
}

impl Import for Parameters {}
impl Export for Parameters {}

impl Parameters {
    /// Checks the parameters against the number of peers taking part in the run.
    pub fn validate(&self, num_peers: usize) -> Result<(), ConfigError> {
        if self.threads < 1 || self.threads > MAX_THREADS {
            return Err(ConfigError::InvalidThreads(self.threads));
        }
        if self.iterations < 1 {
            return Err(ConfigError::InvalidIterations(self.iterations));
        }
        if self.order < num_peers {
            return Err(ConfigError::OrderTooSmall {
                order: self.order,
                peers: num_peers,
            });
        }
        if self.order % num_peers != 0 {
            return Err(ConfigError::OrderNotDivisible {
                order: self.order,
                peers: num_peers,
            });
        }
        Ok(())
    }

    /// Checks that one block fits in a message of at most `max_len` elements. A single peer
    /// sends no block.
    pub fn check_block_len(&self, num_peers: usize, max_len: usize) -> Result<(), ConfigError> {
        let block_order = self.order / num_peers;
        let fits = block_order
            .checked_mul(block_order)
            .map_or(false, |len| len <= max_len);
        if num_peers > 1 && !fits {
            return Err(ConfigError::BlockTooLarge {
                block_order,
                max_len,
            });
        }
        Ok(())
    }

    pub fn log(&self) {
        info!("Threads per peer set to {}", self.threads);
        info!("Iterations set to {}", self.iterations);
        info!("Matrix order set to {}", self.order);
        info!("Tile order set to {}", self.tile_order);
        info!("Exchange mode set to {:?}", self.exchange);
        info!("Loop collapse set to {}", self.collapse);
        info!("Idle thread guard set to {}", self.idle_thread_guard);
        info!("Block compression set to {}", self.compress);
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PeerAddresses {
    /// Address to receive blocks and collective messages from the other peers.
    pub transpose: SocketAddr,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Committee {
    pub peers: BTreeMap<PeerId, PeerAddresses>,
}

impl Import for Committee {}
impl Export for Committee {}

impl Committee {
    /// Builds a committee of `size` peers listening on consecutive localhost ports.
    pub fn local(size: usize, base_port: u16) -> Result<Self, ConfigError> {
        let peers = (0..size)
            .map(|id| {
                let port = u16::try_from(id)
                    .ok()
                    .and_then(|offset| base_port.checked_add(offset))
                    .ok_or(ConfigError::PortOutOfRange {
                        base_port,
                        peers: size,
                    })?;
                let transpose = SocketAddr::from(([127, 0, 0, 1], port));
                Ok((id, PeerAddresses { transpose }))
            })
            .collect::<Result<_, ConfigError>>()?;
        Ok(Self { peers })
    }

    /// Returns the number of peers.
    pub fn size(&self) -> usize {
        self.peers.len()
    }

    /// Ensures the peers are numbered `0..size` without gaps.
    pub fn check(&self) -> Result<(), ConfigError> {
        let contiguous = !self.peers.is_empty()
            && self.peers.keys().enumerate().all(|(idx, id)| idx == *id);
        if contiguous {
            Ok(())
        } else {
            Err(ConfigError::MalformedCommittee(self.size()))
        }
    }

    /// Returns the address of the target peer.
    pub fn address(&self, to: PeerId) -> Result<SocketAddr, ConfigError> {
        self.peers
            .get(&to)
            .map(|x| x.transpose)
            .ok_or(ConfigError::NotInCommittee(to))
    }

    /// Returns the addresses of all peers except `myself`.
    pub fn others(&self, myself: PeerId) -> Vec<(PeerId, SocketAddr)> {
        self.peers
            .iter()
            .filter(|(id, _)| **id != myself)
            .map(|(id, addresses)| (*id, addresses.transpose))
            .collect()
    }
}
