//! Error types for the buffer layer.
//!
//! Everything that can go wrong while reading or writing raw bytes lands
//! here. Higher layers wrap [`BufferError`] instead of inventing their own
//! variants for the same failures.

/// Errors that can occur while reading from or writing to a
/// [`ByteBuffer`](crate::ByteBuffer).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    /// A read needed more bytes than the buffer has readable.
    #[error("buffer underflow: needed {needed} bytes, {available} available")]
    Underflow { needed: usize, available: usize },

    /// A write would grow the buffer past its maximum capacity.
    ///
    /// Slices have a fixed capacity, so writing past the end of a slice
    /// also ends up here.
    #[error("capacity exceeded: {requested} bytes requested, max {max}")]
    CapacityExceeded { requested: usize, max: usize },

    /// An absolute index or cursor position is outside the valid range.
    #[error("index {index} out of bounds (limit {limit})")]
    IndexOutOfBounds { index: usize, limit: usize },

    /// A varint kept its continuation bit set past the fifth byte.
    ///
    /// Byte alignment of the stream is lost; the connection cannot be
    /// recovered.
    #[error("malformed varint: more than 5 bytes")]
    MalformedVarInt,

    /// A varlong kept its continuation bit set past the tenth byte.
    #[error("malformed varlong: more than 10 bytes")]
    MalformedVarLong,

    /// A length prefix was negative.
    #[error("negative length prefix: {0}")]
    NegativeLength(i32),

    /// A string exceeded the limit allowed at this position.
    #[error("string too long: {len} (max {max})")]
    StringTooLong { len: usize, max: usize },

    /// String bytes were not valid UTF-8.
    #[error("invalid UTF-8 in string")]
    InvalidUtf8,

    /// A compound tag contained a tag id this codec doesn't know.
    #[error("unknown tag type id {0}")]
    UnknownTagType(u8),

    /// A list tag held elements of different tag types.
    #[error("list tag mixes element types")]
    MixedListTag,

    /// Compound tags were nested deeper than the decoder allows.
    #[error("tag nesting exceeds depth {0}")]
    TagDepthExceeded(usize),
}

impl BufferError {
    /// Returns `true` if this error means the byte stream itself is
    /// corrupt, so nothing after it can be trusted.
    pub fn is_framing_corruption(&self) -> bool {
        matches!(self, Self::MalformedVarInt | Self::MalformedVarLong)
    }
}
