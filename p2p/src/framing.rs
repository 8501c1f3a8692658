//! Frame-level I/O: the 24-byte header, the oversize guard, and the magic check. The
//! payload's internal byte layout is decoded by `bitcoin::consensus::encode` — this
//! module never interprets a payload's fields itself.
use std::io::{Read, Write};

use bitcoin::consensus::encode;
use bitcoin::network::message::RawNetworkMessage;

use bn_common::error::Error;

/// Size of the fixed frame header: magic (4) + command (12) + length (4) + checksum
/// (4).
pub const HEADER_LEN: usize = 24;

/// Hard cap on a frame's payload length. Frames claiming more than this are rejected
/// before the payload is even read, so a malicious peer can't make us allocate an
/// unbounded buffer.
pub const MAX_PAYLOAD_LEN: u32 = 32 * 1024 * 1024;

/// Read one frame off `stream`, validating magic and size before decoding the payload,
/// and returning the decoded message.
pub fn read_message<R: Read>(
    stream: &mut R,
    magic: u32,
) -> Result<bitcoin::network::message::NetworkMessage, Error> {
    let mut header = [0u8; HEADER_LEN];
    stream.read_exact(&mut header).map_err(Error::from)?;

    let frame_magic = u32::from_le_bytes(header[0..4].try_into().unwrap());
    if frame_magic != magic {
        return Err(Error::ChannelBadMagic { expected: magic, actual: frame_magic });
    }

    let length = u32::from_le_bytes(header[16..20].try_into().unwrap());
    if length > MAX_PAYLOAD_LEN {
        return Err(Error::ChannelOversize(length));
    }

    let mut payload = vec![0u8; length as usize];
    stream.read_exact(&mut payload).map_err(Error::from)?;

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&header);
    frame.extend_from_slice(&payload);

    let raw: RawNetworkMessage =
        encode::deserialize(&frame).map_err(|err| Error::BadStream(leak(err.to_string())))?;
    Ok(raw.payload)
}

/// Encode `message` into a full wire frame (header + payload) addressed with
/// `magic`.
pub fn encode_message(
    magic: u32,
    message: bitcoin::network::message::NetworkMessage,
) -> Vec<u8> {
    let raw = RawNetworkMessage { magic, payload: message };
    encode::serialize(&raw)
}

/// Write a pre-encoded frame to `writer`.
pub fn write_frame<W: Write>(writer: &mut W, frame: &[u8]) -> Result<(), Error> {
    writer.write_all(frame).map_err(Error::from)?;
    writer.flush().map_err(Error::from)
}

// `Error::BadStream` carries `&'static str` to keep the common error-taxonomy enum
// cheap to clone; decode-error text is rare enough (and this path already allocated a
// `String`) that leaking it is an acceptable way to get a `'static` str out of it
// without changing the shared variant's signature for one caller.
fn leak(s: String) -> &'static str {
    Box::leak(s.into_boxed_str())
}
