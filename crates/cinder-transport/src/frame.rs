//! Length-prefixed framing over any async byte stream.
//!
//! ```text
//! [varint length][length bytes of payload]
//! ```
//!
//! The length never counts itself. Both sides enforce the same maximum so
//! a peer cannot make the other allocate arbitrarily large buffers.

use std::io::ErrorKind;

use cinder_buffer::{encode_var_int, MAX_VAR_INT_LEN};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::TransportError;

/// Largest payload a three byte varint prefix can describe.
pub const DEFAULT_MAX_FRAME_LEN: usize = 2_097_151;

/// Reads one frame.
///
/// Returns `Ok(None)` if the stream ends cleanly before the first byte of
/// a frame. A stream that ends inside a frame is a receive failure.
pub async fn read_frame<R>(reader: &mut R, max_len: usize) -> Result<Option<Vec<u8>>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut raw: u32 = 0;
    for i in 0..MAX_VAR_INT_LEN {
        let byte = match reader.read_u8().await {
            Ok(byte) => byte,
            Err(e) if i == 0 && e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(TransportError::ReceiveFailed(e)),
        };
        raw |= u32::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            let len = usize::try_from(raw as i32).map_err(|_| {
                TransportError::MalformedFrame(format!("negative length {}", raw as i32))
            })?;
            if len > max_len {
                return Err(TransportError::FrameTooLarge { len, max: max_len });
            }
            let mut payload = vec![0; len];
            reader
                .read_exact(&mut payload)
                .await
                .map_err(TransportError::ReceiveFailed)?;
            return Ok(Some(payload));
        }
    }
    Err(TransportError::MalformedFrame(
        "length prefix longer than five bytes".into(),
    ))
}

/// Writes one frame with a single write call.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8], max_len: usize) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > max_len {
        return Err(TransportError::FrameTooLarge {
            len: payload.len(),
            max: max_len,
        });
    }
    let len = i32::try_from(payload.len()).map_err(|_| TransportError::FrameTooLarge {
        len: payload.len(),
        max: max_len,
    })?;
    let mut prefix = [0u8; MAX_VAR_INT_LEN];
    let prefix_len = encode_var_int(len, &mut prefix);

    let mut frame = Vec::with_capacity(prefix_len + payload.len());
    frame.extend_from_slice(&prefix[..prefix_len]);
    frame.extend_from_slice(payload);
    writer
        .write_all(&frame)
        .await
        .map_err(TransportError::SendFailed)?;
    writer.flush().await.map_err(TransportError::SendFailed)
}
