// Copyright(C) Facebook, Inc. and its affiliates.
use crate::error::NetworkError;
use crate::frame::decode_frame;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::SplitSink;
use futures::stream::StreamExt as _;
use log::{debug, info, warn};
use model::types_and_const::MAX_FRAME_SIZE;
use std::error::Error;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

#[cfg(test)]
#[path = "tests/receiver_tests.rs"]
pub mod receiver_tests;

/// Convenient alias for the writer end of the TCP channel.
pub type Writer = SplitSink<Framed<TcpStream, LengthDelimitedCodec>, Bytes>;

#[async_trait]
pub trait MessageHandler: Clone + Send + Sync + 'static {
    /// Defines how to handle an incoming message. A typical usage is to define a `MessageHandler` with a
    /// number of `Sender<T>` channels. Then implement `dispatch` to deserialize incoming messages and
    /// forward them through the appropriate delivery channel. Then `writer` can be used to send back
    /// responses or acknowledgements to the sender machine (see unit tests for examples).
    async fn dispatch(&self, writer: &mut Writer, message: Bytes) -> Result<(), Box<dyn Error>>;
}

/// For each incoming request, we spawn a new runner responsible to receive messages and forward them
/// through the provided deliver channel.
pub struct Receiver<Handler: MessageHandler> {
    /// Socket the receiver accepts connections on.
    listener: TcpListener,
    /// Struct responsible to define how to handle received messages.
    handler: Handler,
}

impl<Handler: MessageHandler> Receiver<Handler> {
    /// Bind `address` and spawn a new network receiver handling connections from any incoming peer.
    /// Returns the bound address, which differs from `address` when port 0 was requested.
    pub async fn spawn(address: SocketAddr, handler: Handler) -> Result<SocketAddr, NetworkError> {
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|e| NetworkError::FailedToBind(address, e))?;
        let local = listener
            .local_addr()
            .map_err(|e| NetworkError::FailedToBind(address, e))?;
        debug!("Listening on {}", local);

        tokio::spawn(async move {
            Self { listener, handler }.run().await;
        });
        Ok(local)
    }

    /// Main loop responsible to accept incoming connections and spawn a new runner to handle it.
    async fn run(&self) {
        loop {
            let (socket, peer) = match self.listener.accept().await {
                Ok(value) => value,
                Err(e) => {
                    warn!("{}", NetworkError::FailedToListen(e));
                    continue;
                }
            };
            info!("Incoming connection established with {}", peer);
            Self::spawn_runner(socket, peer, self.handler.clone()).await;
        }
    }

    /// Spawn a new runner to handle a specific TCP connection. It receives messages and process them
    /// using the provided handler. A frame that cannot be decoded closes the connection, so the
    /// sender observes the failure instead of waiting for an acknowledgement.
    async fn spawn_runner(socket: TcpStream, peer: SocketAddr, handler: Handler) {
        tokio::spawn(async move {
            let codec = LengthDelimitedCodec::builder()
                .max_frame_length(MAX_FRAME_SIZE)
                .new_codec();
            let transport = Framed::new(socket, codec);
            let (mut writer, mut reader) = transport.split();
            while let Some(frame) = reader.next().await {
                let message = match frame
                    .map_err(|e| NetworkError::FailedToReceiveMessage(peer, e))
                    .and_then(|frame| decode_frame(frame.freeze()))
                {
                    Ok(message) => message,
                    Err(e) => {
                        warn!("{}", e);
                        return;
                    }
                };
                if let Err(e) = handler.dispatch(&mut writer, message).await {
                    warn!("{}", e);
                    return;
                }
            }
            warn!("Connection closed by peer {}", peer);
        });
    }
}
