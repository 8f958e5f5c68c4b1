use std::io;
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Failed to bind {0}: {1}")]
    FailedToBind(SocketAddr, io::Error),

    #[error("Failed to accept connection: {0}")]
    FailedToListen(io::Error),

    #[error("Failed to connect to {0} after {1} attempts: {2}")]
    FailedToConnect(SocketAddr, usize, io::Error),

    #[error("Failed to send message to {0}: {1}")]
    FailedToSendMessage(SocketAddr, io::Error),

    #[error("Failed to receive message from {0}: {1}")]
    FailedToReceiveMessage(SocketAddr, io::Error),

    #[error("Failed to receive ACK from {0}")]
    FailedToReceiveAck(SocketAddr),

    #[error("Connection to {0} is closed")]
    ConnectionClosed(SocketAddr),

    #[error("Received an empty frame")]
    EmptyFrame,

    #[error("Invalid compression flag {0}")]
    InvalidFlag(u8),

    #[error("Failed to (de)compress frame: {0}")]
    Compression(io::Error),
}
