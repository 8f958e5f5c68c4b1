use crate::error::NetworkError;
use bytes::{BufMut as _, Bytes, BytesMut};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read as _, Write as _};

/// The payload follows the flag as is.
pub const FLAG_RAW: u8 = 0x00;
/// The payload following the flag is zlib-compressed.
pub const FLAG_ZLIB: u8 = 0x01;

/// Prefixes `payload` with a one-byte compression flag, compressing it first if asked.
pub fn encode_frame(payload: &[u8], compress: bool) -> Result<Bytes, NetworkError> {
    if !compress {
        let mut frame = BytesMut::with_capacity(payload.len() + 1);
        frame.put_u8(FLAG_RAW);
        frame.extend_from_slice(payload);
        return Ok(frame.freeze());
    }

    let mut encoder = ZlibEncoder::new(vec![FLAG_ZLIB], Compression::fast());
    encoder
        .write_all(payload)
        .map_err(NetworkError::Compression)?;
    let frame = encoder.finish().map_err(NetworkError::Compression)?;
    Ok(Bytes::from(frame))
}

/// Strips the compression flag off `frame` and returns the original payload.
pub fn decode_frame(frame: Bytes) -> Result<Bytes, NetworkError> {
    let flag = *frame.first().ok_or(NetworkError::EmptyFrame)?;
    match flag {
        FLAG_RAW => Ok(frame.slice(1..)),
        FLAG_ZLIB => {
            let mut decoder = ZlibDecoder::new(&frame[1..]);
            let mut decompressed = Vec::new();
            decoder
                .read_to_end(&mut decompressed)
                .map_err(NetworkError::Compression)?;
            Ok(decompressed.into())
        }
        _ => Err(NetworkError::InvalidFlag(flag)),
    }
}
