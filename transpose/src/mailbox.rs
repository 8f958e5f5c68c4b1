use crate::error::TransposeError;
use crate::messages::{PeerMessage, Tag};
use log::{debug, warn};
use model::types_and_const::PeerId;
use std::collections::HashMap;
use tokio::sync::mpsc::Receiver;

/// Inbound side of a peer. Messages arrive in any order across senders; the mailbox parks
/// the ones nobody waits for yet until they are asked for by tag.
pub struct Mailbox {
    inbound: Receiver<PeerMessage>,
    pending: HashMap<Tag, PeerMessage>,
    aborted: Option<(PeerId, String)>,
}

impl Mailbox {
    pub fn new(inbound: Receiver<PeerMessage>) -> Self {
        Self {
            inbound,
            pending: HashMap::new(),
            aborted: None,
        }
    }

    /// Waits for the message identified by `tag`. Fails as soon as any peer aborts the run.
    pub async fn take(&mut self, tag: Tag) -> Result<PeerMessage, TransposeError> {
        loop {
            self.check_abort()?;
            if let Some(message) = self.pending.remove(&tag) {
                return Ok(message);
            }
            let message = self
                .inbound
                .recv()
                .await
                .ok_or(TransposeError::InboundClosed)?;
            self.file(message)?;
        }
    }

    /// Files the messages that already arrived and fails if one of them is an `Abort`.
    pub fn poll_abort(&mut self) -> Result<(), TransposeError> {
        while let Ok(message) = self.inbound.try_recv() {
            self.file(message)?;
        }
        self.check_abort()
    }

    fn check_abort(&self) -> Result<(), TransposeError> {
        match &self.aborted {
            Some((peer, reason)) => Err(TransposeError::Aborted {
                peer: *peer,
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    fn file(&mut self, message: PeerMessage) -> Result<(), TransposeError> {
        match message.tag() {
            Some(tag) => {
                debug!("Received {:?}", tag);
                if self.pending.insert(tag, message).is_some() {
                    return Err(TransposeError::DuplicateMessage(tag));
                }
            }
            None => {
                if let PeerMessage::Abort { sender, reason } = message {
                    warn!("Peer {} aborted the run: {}", sender, reason);
                    if self.aborted.is_none() {
                        self.aborted = Some((sender, reason));
                    }
                }
            }
        }
        Ok(())
    }
}
