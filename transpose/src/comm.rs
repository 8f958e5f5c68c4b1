use crate::error::TransposeError;
use crate::mailbox::Mailbox;
use crate::messages::{CollectivePayload, PeerMessage, Tag};
use async_trait::async_trait;
use config::Parameters;
use futures::future::join_all;
use log::debug;
use model::types_and_const::{Iteration, PeerId, Phase, Sequence, ROOT};
use network::CancelHandler;
use tokio::sync::mpsc::Receiver;

#[cfg(test)]
#[path = "tests/comm_tests.rs"]
pub mod comm_tests;

/// Moves messages from one peer to another.
#[async_trait]
pub trait Transport: Send {
    /// Hands `message` over for delivery to peer `to`. The returned handler resolves once the
    /// destination acknowledged it.
    async fn post(
        &mut self,
        to: PeerId,
        message: PeerMessage,
    ) -> Result<CancelHandler, TransposeError>;

    /// Turns compression of outgoing messages on or off.
    fn set_compression(&mut self, _compress: bool) {}

    /// Largest number of elements a block message may carry, if bounded.
    fn max_block_len(&self) -> Option<usize> {
        None
    }
}

/// Point-to-point and collective messaging between the peers of a run.
///
/// Collectives are rooted at `ROOT` and must be called by every peer in the same order: each
/// one consumes a sequence number, which is how matching messages find each other.
pub struct Communicator {
    me: PeerId,
    size: usize,
    transport: Box<dyn Transport>,
    mailbox: Mailbox,
    sequence: Sequence,
}

fn unexpected(peer: PeerId, payload: &CollectivePayload) -> TransposeError {
    TransposeError::UnexpectedMessage {
        peer,
        message: format!("{:?}", payload),
    }
}

impl Communicator {
    pub fn new(
        me: PeerId,
        size: usize,
        transport: Box<dyn Transport>,
        inbound: Receiver<PeerMessage>,
    ) -> Self {
        assert!(me < size, "peer {} is out of range", me);
        Self {
            me,
            size,
            transport,
            mailbox: Mailbox::new(inbound),
            sequence: 0,
        }
    }

    pub fn me(&self) -> PeerId {
        self.me
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_root(&self) -> bool {
        self.me == ROOT
    }

    pub fn max_block_len(&self) -> Option<usize> {
        self.transport.max_block_len()
    }

    /// Applies the run parameters that affect messaging.
    pub fn configure(&mut self, parameters: &Parameters) {
        self.transport.set_compression(parameters.compress);
    }

    /// Hands `message` to the transport unless some peer already aborted the run.
    async fn post(
        &mut self,
        to: PeerId,
        message: PeerMessage,
    ) -> Result<CancelHandler, TransposeError> {
        self.mailbox.poll_abort()?;
        match self.transport.post(to, message).await {
            Ok(handler) => Ok(handler),
            Err(e) => {
                // A peer that is gone may have said why.
                self.mailbox.poll_abort()?;
                Err(e)
            }
        }
    }

    /// Starts sending a block to `to`. The send is complete once the returned handler resolves.
    pub async fn isend_block(
        &mut self,
        to: PeerId,
        iteration: Iteration,
        phase: Phase,
        block: &[f64],
    ) -> Result<CancelHandler, TransposeError> {
        let message = PeerMessage::Block {
            sender: self.me,
            iteration,
            phase,
            data: block.to_vec(),
        };
        self.post(to, message).await
    }

    /// Waits for `to` to acknowledge a message.
    pub async fn confirm(to: PeerId, handler: CancelHandler) -> Result<(), TransposeError> {
        handler
            .await
            .map(|_| ())
            .map_err(|_| TransposeError::MissingAck { peer: to })
    }

    /// Waits for the block `from` sent at `phase` of `iteration` and copies it into `into`.
    pub async fn recv_block(
        &mut self,
        from: PeerId,
        iteration: Iteration,
        phase: Phase,
        into: &mut [f64],
    ) -> Result<(), TransposeError> {
        let tag = Tag::Block {
            sender: from,
            iteration,
            phase,
        };
        match self.mailbox.take(tag).await? {
            PeerMessage::Block { data, .. } if data.len() == into.len() => {
                into.copy_from_slice(&data);
                Ok(())
            }
            PeerMessage::Block { data, .. } => Err(TransposeError::BlockSize {
                peer: from,
                expected: into.len(),
                received: data.len(),
            }),
            message => Err(TransposeError::UnexpectedMessage {
                peer: from,
                message: format!("{:?}", message),
            }),
        }
    }

    /// Sends `outgoing` to `to` and receives `incoming` from `from`, returning once both
    /// the acknowledgement and the block arrived.
    pub async fn send_recv(
        &mut self,
        to: PeerId,
        from: PeerId,
        iteration: Iteration,
        phase: Phase,
        outgoing: &[f64],
        incoming: &mut [f64],
    ) -> Result<(), TransposeError> {
        let handler = self.isend_block(to, iteration, phase, outgoing).await?;
        let (sent, received) = tokio::join!(
            Self::confirm(to, handler),
            self.recv_block(from, iteration, phase, incoming)
        );
        sent.and(received)
    }

    fn next_sequence(&mut self) -> Sequence {
        let sequence = self.sequence;
        self.sequence += 1;
        sequence
    }

    async fn post_collective(
        &mut self,
        to: PeerId,
        sequence: Sequence,
        payload: CollectivePayload,
    ) -> Result<CancelHandler, TransposeError> {
        let message = PeerMessage::Collective {
            sender: self.me,
            sequence,
            payload,
        };
        self.post(to, message).await
    }

    async fn take_collective(
        &mut self,
        from: PeerId,
        sequence: Sequence,
    ) -> Result<CollectivePayload, TransposeError> {
        let tag = Tag::Collective {
            sender: from,
            sequence,
        };
        match self.mailbox.take(tag).await? {
            PeerMessage::Collective { payload, .. } => Ok(payload),
            message => Err(TransposeError::UnexpectedMessage {
                peer: from,
                message: format!("{:?}", message),
            }),
        }
    }

    /// Every peer contributes `payload`. The root gets all contributions indexed by peer id;
    /// the other peers get `None`.
    pub async fn gather(
        &mut self,
        payload: CollectivePayload,
    ) -> Result<Option<Vec<CollectivePayload>>, TransposeError> {
        let sequence = self.next_sequence();
        if !self.is_root() {
            let handler = self.post_collective(ROOT, sequence, payload).await?;
            Self::confirm(ROOT, handler).await?;
            return Ok(None);
        }

        let mut payloads = Vec::with_capacity(self.size);
        for peer in 0..self.size {
            if peer == self.me {
                payloads.push(payload.clone());
            } else {
                payloads.push(self.take_collective(peer, sequence).await?);
            }
        }
        Ok(Some(payloads))
    }

    /// The root sends the payload built by `make` to every peer; every peer returns it.
    /// `make` only runs at the root.
    pub async fn broadcast<F>(&mut self, make: F) -> Result<CollectivePayload, TransposeError>
    where
        F: FnOnce() -> CollectivePayload + Send,
    {
        let sequence = self.next_sequence();
        if !self.is_root() {
            return self.take_collective(ROOT, sequence).await;
        }

        let payload = make();
        let mut handlers = Vec::with_capacity(self.size);
        for peer in 0..self.size {
            if peer != self.me {
                let handler = self.post_collective(peer, sequence, payload.clone()).await?;
                handlers.push((peer, handler));
            }
        }
        for (peer, handler) in handlers {
            Self::confirm(peer, handler).await?;
        }
        Ok(payload)
    }

    /// Returns once every peer called `barrier`.
    pub async fn barrier(&mut self) -> Result<(), TransposeError> {
        if let Some(payloads) = self.gather(CollectivePayload::Arrive).await? {
            for (peer, payload) in payloads.iter().enumerate() {
                if *payload != CollectivePayload::Arrive {
                    return Err(unexpected(peer, payload));
                }
            }
        }
        match self.broadcast(|| CollectivePayload::Release).await? {
            CollectivePayload::Release => Ok(()),
            payload => Err(unexpected(ROOT, &payload)),
        }
    }

    async fn reduce(
        &mut self,
        value: f64,
        op: fn(f64, f64) -> f64,
    ) -> Result<Option<f64>, TransposeError> {
        let payloads = match self.gather(CollectivePayload::Value(value)).await? {
            Some(payloads) => payloads,
            None => return Ok(None),
        };
        let mut values = Vec::with_capacity(payloads.len());
        for (peer, payload) in payloads.into_iter().enumerate() {
            match payload {
                CollectivePayload::Value(value) => values.push(value),
                payload => return Err(unexpected(peer, &payload)),
            }
        }
        Ok(values.into_iter().reduce(op))
    }

    /// Largest of the values of all peers, at the root only.
    pub async fn reduce_max(&mut self, value: f64) -> Result<Option<f64>, TransposeError> {
        self.reduce(value, f64::max).await
    }

    /// Sum of the values of all peers in peer order, at the root only.
    pub async fn reduce_sum(&mut self, value: f64) -> Result<Option<f64>, TransposeError> {
        self.reduce(value, |a, b| a + b).await
    }

    /// Returns on every peer whether any peer passed `true`.
    pub async fn all_reduce_or(&mut self, flag: bool) -> Result<bool, TransposeError> {
        let mut any = false;
        if let Some(payloads) = self.gather(CollectivePayload::Flag(flag)).await? {
            for (peer, payload) in payloads.iter().enumerate() {
                match payload {
                    CollectivePayload::Flag(flag) => any |= *flag,
                    payload => return Err(unexpected(peer, payload)),
                }
            }
        }
        match self.broadcast(|| CollectivePayload::Flag(any)).await? {
            CollectivePayload::Flag(any) => Ok(any),
            payload => Err(unexpected(ROOT, &payload)),
        }
    }

    /// Tells every other peer that this one gave up. Delivery failures are ignored.
    pub async fn abort(&mut self, reason: &str) {
        let me = self.me;
        let mut handlers = Vec::with_capacity(self.size);
        for peer in (0..self.size).filter(|peer| *peer != me) {
            let message = PeerMessage::Abort {
                sender: me,
                reason: reason.to_string(),
            };
            match self.transport.post(peer, message).await {
                Ok(handler) => handlers.push(handler),
                Err(e) => debug!("Failed to notify peer {} of the abort: {}", peer, e),
            }
        }
        join_all(handlers).await;
    }
}
