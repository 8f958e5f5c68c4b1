use crate::comm::{Communicator, Transport};
use crate::error::TransposeError;
use crate::messages::PeerMessage;
use async_trait::async_trait;
use bytes::Bytes;
use config::Committee;
use futures::sink::SinkExt as _;
use log::info;
use model::types_and_const::{PeerId, CHANNEL_CAPACITY, MAX_FRAME_SIZE};
use network::{
    CancelHandler, MessageHandler, Receiver as NetworkReceiver, ReliableSender, Writer,
};
use std::error::Error;
use std::net::SocketAddr;
use tokio::sync::mpsc::{channel, Receiver, Sender};

#[cfg(test)]
#[path = "tests/network_transport_tests.rs"]
pub mod network_transport_tests;

/// Room left in a frame for the message envelope and the worst-case zlib expansion.
const FRAME_HEADROOM: usize = 1 << 22;

/// Sends messages over TCP with one `ReliableSender` connection per destination.
pub struct NetworkTransport {
    sender: ReliableSender,
    addresses: Vec<SocketAddr>,
}

impl NetworkTransport {
    /// Starts listening on `listen` and returns the transport together with the channel
    /// carrying every message received from the other peers. `addresses` is indexed by peer id.
    pub async fn spawn(
        listen: SocketAddr,
        addresses: Vec<SocketAddr>,
    ) -> Result<(Self, Receiver<PeerMessage>), TransposeError> {
        let (tx_inbound, rx_inbound) = channel(CHANNEL_CAPACITY);
        let bound = NetworkReceiver::spawn(
            listen,
            PeerMessageHandler {
                deliver: tx_inbound,
            },
        )
        .await?;
        info!("Peer listening to messages on {}", bound);

        let transport = Self {
            sender: ReliableSender::default(),
            addresses,
        };
        Ok((transport, rx_inbound))
    }
}

#[async_trait]
impl Transport for NetworkTransport {
    async fn post(
        &mut self,
        to: PeerId,
        message: PeerMessage,
    ) -> Result<CancelHandler, TransposeError> {
        let address = *self
            .addresses
            .get(to)
            .ok_or(TransposeError::Unreachable(to))?;
        let bytes = bincode::serialize(&message)?;
        Ok(self.sender.send(address, &bytes).await?)
    }

    fn set_compression(&mut self, compress: bool) {
        self.sender.set_compression(compress);
    }

    /// A block travels in a single frame.
    fn max_block_len(&self) -> Option<usize> {
        Some((MAX_FRAME_SIZE - FRAME_HEADROOM) / std::mem::size_of::<f64>())
    }
}

impl Communicator {
    /// Boots peer `me` of `committee`, listening on `listen`.
    pub async fn connect(
        me: PeerId,
        committee: &Committee,
        listen: SocketAddr,
    ) -> Result<Self, TransposeError> {
        committee.check()?;
        let size = committee.size();
        let addresses = (0..size)
            .map(|id| committee.address(id))
            .collect::<Result<Vec<_>, _>>()?;
        if me >= size {
            return Err(config::ConfigError::NotInCommittee(me).into());
        }

        let (transport, inbound) = NetworkTransport::spawn(listen, addresses).await?;
        Ok(Communicator::new(me, size, Box::new(transport), inbound))
    }
}

/// Decodes incoming frames and hands the messages to the mailbox of the peer.
#[derive(Clone)]
pub struct PeerMessageHandler {
    deliver: Sender<PeerMessage>,
}

#[async_trait]
impl MessageHandler for PeerMessageHandler {
    async fn dispatch(&self, writer: &mut Writer, serialized: Bytes) -> Result<(), Box<dyn Error>> {
        // An undecodable message is not acknowledged: the error closes the connection.
        let message: PeerMessage = bincode::deserialize(&serialized)?;
        writer.send(Bytes::from("Ack")).await?;
        self.deliver.send(message).await?;
        Ok(())
    }
}
