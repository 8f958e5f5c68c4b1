use crate::error::NetworkError;
use crate::frame::encode_frame;
use bytes::Bytes;
use futures::sink::SinkExt as _;
use futures::stream::StreamExt as _;
use log::{debug, info, warn};
use model::types_and_const::{CHANNEL_CAPACITY, MAX_FRAME_SIZE};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{channel, Receiver, Sender};
use tokio::sync::oneshot;
use tokio::time::sleep;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

#[cfg(test)]
#[path = "tests/reliable_sender_tests.rs"]
pub mod reliable_sender_tests;

/// Resolves with the receiver's acknowledgement once the message has been delivered. It fails
/// if the connection carrying the message breaks first.
pub type CancelHandler = oneshot::Receiver<Bytes>;

/// How many times a connection is attempted before the destination is declared unreachable.
const CONNECT_ATTEMPTS: usize = 40;
/// Delay before the first reconnection attempt; doubled after every failure.
const INITIAL_RETRY_DELAY: u64 = 50;
/// Upper bound on the reconnection delay. Denominated in ms.
const MAX_RETRY_DELAY: u64 = 1_000;

/// Sends messages over TCP and hands back a `CancelHandler` per message that resolves when the
/// destination acknowledges it. Messages to the same destination are delivered in order.
///
/// Connections are only retried while they are being established: once a connection is up, any
/// failure is final and every message still waiting for its ACK fails with it.
pub struct ReliableSender {
    /// A map holding the channels to our connections.
    connections: HashMap<SocketAddr, Sender<InnerMessage>>,
    /// Compress every outgoing frame.
    compress: bool,
}

impl std::default::Default for ReliableSender {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ReliableSender {
    pub fn new(compress: bool) -> Self {
        Self {
            connections: HashMap::new(),
            compress,
        }
    }

    /// Applies to the messages sent from now on.
    pub fn set_compression(&mut self, compress: bool) {
        self.compress = compress;
    }

    /// Helper function to spawn a new connection.
    fn spawn_connection(address: SocketAddr) -> Sender<InnerMessage> {
        let (tx, rx) = channel(CHANNEL_CAPACITY);
        Connection::spawn(address, rx);
        tx
    }

    /// Reliably send a message to a specific address.
    pub async fn send(
        &mut self,
        address: SocketAddr,
        data: &[u8],
    ) -> Result<CancelHandler, NetworkError> {
        let frame = encode_frame(data, self.compress)?;
        let (sender, receiver) = oneshot::channel();
        let message = InnerMessage {
            data: frame,
            cancel_handler: sender,
        };
        self.connections
            .entry(address)
            .or_insert_with(|| Self::spawn_connection(address))
            .send(message)
            .await
            .map_err(|_| NetworkError::ConnectionClosed(address))?;
        Ok(receiver)
    }
}

/// Simple message used by `ReliableSender` to communicate with its connections.
#[derive(Debug)]
struct InnerMessage {
    /// The data to send.
    data: Bytes,
    /// A channel to resolve once the destination acknowledges the data.
    cancel_handler: oneshot::Sender<Bytes>,
}

/// A connection is responsible to establish and keep alive (if possible) a connection with a single peer.
struct Connection {
    /// The destination address.
    address: SocketAddr,
    /// Channel from which the connection receives its commands.
    receiver: Receiver<InnerMessage>,
}

impl Connection {
    fn spawn(address: SocketAddr, receiver: Receiver<InnerMessage>) {
        tokio::spawn(async move {
            Self { address, receiver }.run().await;
        });
    }

    /// Main loop trying to connect to the peer and transmit messages.
    async fn run(&mut self) {
        let stream = match self.connect().await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("{}", e);
                return;
            }
        };
        info!("Outgoing connection established with {}", self.address);

        // Returning drops the handlers still waiting for an ACK, which tells every waiting
        // caller that its message is lost.
        if let Err(e) = self.keep_alive(stream).await {
            warn!("{}", e);
        }
    }

    /// Connect to the peer, backing off between attempts while its listener comes up.
    async fn connect(&self) -> Result<TcpStream, NetworkError> {
        let mut delay = INITIAL_RETRY_DELAY;
        let mut attempt = 1;
        loop {
            match TcpStream::connect(self.address).await {
                Ok(stream) => return Ok(stream),
                Err(e) if attempt >= CONNECT_ATTEMPTS => {
                    return Err(NetworkError::FailedToConnect(self.address, attempt, e));
                }
                Err(e) => {
                    debug!(
                        "Attempt {} to connect to {} failed: {}",
                        attempt, self.address, e
                    );
                    sleep(Duration::from_millis(delay)).await;
                    delay = (delay * 2).min(MAX_RETRY_DELAY);
                    attempt += 1;
                }
            }
        }
    }

    /// Transmit messages once we have established a connection.
    async fn keep_alive(&mut self, stream: TcpStream) -> Result<(), NetworkError> {
        let codec = LengthDelimitedCodec::builder()
            .max_frame_length(MAX_FRAME_SIZE)
            .new_codec();
        let (mut writer, mut reader) = Framed::new(stream, codec).split();
        // Messages written to the socket and still waiting for their ACK, oldest first.
        let mut pending_replies: VecDeque<oneshot::Sender<Bytes>> = VecDeque::new();

        loop {
            tokio::select! {
                message = self.receiver.recv() => match message {
                    Some(InnerMessage { data, cancel_handler }) => {
                        writer
                            .send(data)
                            .await
                            .map_err(|e| NetworkError::FailedToSendMessage(self.address, e))?;
                        pending_replies.push_back(cancel_handler);
                    }
                    // The `ReliableSender` is gone: collect the outstanding ACKs and close.
                    None => break,
                },
                response = reader.next() => match response {
                    Some(Ok(ack)) => match pending_replies.pop_front() {
                        Some(handler) => {
                            let _ = handler.send(ack.freeze());
                        }
                        None => warn!("Unexpected ACK from {}", self.address),
                    },
                    Some(Err(e)) => {
                        return Err(NetworkError::FailedToReceiveMessage(self.address, e));
                    }
                    None => return Err(NetworkError::ConnectionClosed(self.address)),
                },
            }
        }

        while let Some(handler) = pending_replies.pop_front() {
            match reader.next().await {
                Some(Ok(ack)) => {
                    let _ = handler.send(ack.freeze());
                }
                _ => return Err(NetworkError::FailedToReceiveAck(self.address)),
            }
        }
        Ok(())
    }
}
