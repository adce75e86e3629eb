//! JSON codec and length-prefixed framing for bridge messages.
//!
//! Wire format on a stream: `[u32 length (big-endian)][JSON payload]`.
//! Decoding is defensive at both layers: a frame that is not valid JSON
//! for the expected message set yields `None` and is dropped by the
//! caller, never an error that could tear down the session.

use std::io::{self, Read, Write};

use serde::{de::DeserializeOwned, Serialize};

/// Messages stay small; anything larger is a corrupt or hostile frame.
const MAX_FRAME_BYTES: usize = 64 * 1024;

/// Encode a message as its JSON wire form.
pub fn encode<T: Serialize>(msg: &T) -> io::Result<String> {
    serde_json::to_string(msg).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Decode a message, ignoring anything malformed or unknown.
pub fn decode<T: DeserializeOwned>(text: &str) -> Option<T> {
    match serde_json::from_str(text) {
        Ok(msg) => Some(msg),
        Err(e) => {
            log::debug!(target: "bridge", "ignoring malformed message: {}", e);
            None
        }
    }
}

/// Write a length-prefixed JSON message to a stream.
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, msg: &T) -> io::Result<()> {
    let payload = encode(msg)?;

    let len = payload.len() as u32;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(payload.as_bytes())?;
    writer.flush()?;

    Ok(())
}

/// Read one length-prefixed frame from a stream. Returns the raw JSON
/// text; shape validation happens in [`decode`] so an unknown message
/// only skips the frame.
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<String> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf) as usize;

    if len > MAX_FRAME_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame too large: {} bytes", len),
        ));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;

    String::from_utf8(payload).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
