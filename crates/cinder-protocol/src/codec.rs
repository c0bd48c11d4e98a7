//! The codec trait and the small helpers every codec shares.
//!
//! A codec maps one message type to and from the bytes of a frame's
//! payload. Codecs hold no state: everything they need to look up arrives
//! through the [`CodecContext`], so a single instance serves every
//! connection on every thread.
//!
//! Field order inside a codec is the wire contract. Reordering two writes
//! is a protocol change.

use cinder_buffer::ByteBuffer;

use crate::{CodecContext, ProtocolError};

/// Encodes and decodes one message type.
///
/// ## Trait bounds
///
/// - `Send + Sync` so one codec can be shared by every connection task.
/// - `'static` so codecs can be boxed into a long-lived
///   [`ProtocolTable`](crate::ProtocolTable).
pub trait Codec: Send + Sync + 'static {
    type Message;

    /// Writes the message's fields, in order, after the opcode.
    fn encode(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        message: &Self::Message,
    ) -> Result<(), ProtocolError>;

    /// Reads the message's fields. On error nothing is returned; the
    /// caller discards whatever was consumed.
    fn decode(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
    ) -> Result<Self::Message, ProtocolError>;
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Writes a collection length as a varint.
pub(crate) fn write_len(buf: &mut ByteBuffer, len: usize) -> Result<(), ProtocolError> {
    let len = i32::try_from(len)
        .map_err(|_| ProtocolError::Unencodable(format!("list of {len} elements")))?;
    Ok(buf.write_var_int(len)?)
}

/// Reads a varint-prefixed list of strings.
pub(crate) fn read_string_list(
    buf: &mut ByteBuffer,
    max_chars: usize,
) -> Result<Vec<String>, ProtocolError> {
    let count = buf.read_length()?;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(buf.read_string_limited(max_chars)?);
    }
    Ok(out)
}

pub(crate) fn write_string_list(buf: &mut ByteBuffer, items: &[String]) -> Result<(), ProtocolError> {
    write_len(buf, items.len())?;
    for item in items {
        buf.write_string(item)?;
    }
    Ok(())
}
