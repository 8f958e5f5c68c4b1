use crate::comm::{Communicator, Transport};
use crate::error::TransposeError;
use crate::messages::PeerMessage;
use async_trait::async_trait;
use bytes::Bytes;
use model::types_and_const::{PeerId, CHANNEL_CAPACITY};
use network::CancelHandler;
use tokio::sync::mpsc::{channel, Sender};
use tokio::sync::oneshot;

/// Delivers messages through in-process channels. A message is acknowledged as soon as it
/// sits in the inbound channel of its destination.
pub struct LocalTransport {
    peers: Vec<Sender<PeerMessage>>,
}

#[async_trait]
impl Transport for LocalTransport {
    async fn post(
        &mut self,
        to: PeerId,
        message: PeerMessage,
    ) -> Result<CancelHandler, TransposeError> {
        let peer = self.peers.get(to).ok_or(TransposeError::Unreachable(to))?;
        peer.send(message)
            .await
            .map_err(|_| TransposeError::Unreachable(to))?;

        let (sender, receiver) = oneshot::channel();
        let _ = sender.send(Bytes::from("Ack"));
        Ok(receiver)
    }
}

/// Connects `size` communicators to each other, one per peer, indexed by peer id.
pub fn local_mesh(size: usize) -> Vec<Communicator> {
    let (senders, receivers): (Vec<_>, Vec<_>) =
        (0..size).map(|_| channel(CHANNEL_CAPACITY)).unzip();
    receivers
        .into_iter()
        .enumerate()
        .map(|(me, inbound)| {
            let transport = LocalTransport {
                peers: senders.clone(),
            };
            Communicator::new(me, size, Box::new(transport), inbound)
        })
        .collect()
}
