mod error;
mod frame;
mod receiver;
mod reliable_sender;

#[cfg(test)]
#[path = "tests/common.rs"]
pub mod common;

pub use crate::error::NetworkError;
pub use crate::frame::{decode_frame, encode_frame, FLAG_RAW, FLAG_ZLIB};
pub use crate::receiver::{MessageHandler, Receiver, Writer};
pub use crate::reliable_sender::{CancelHandler, ReliableSender};
