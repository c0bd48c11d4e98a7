//! Byte buffers for the Cinder wire protocol.
//!
//! - [`ByteBuffer`]: growable buffer with read/write cursors, marks,
//!   shared-storage slices and typed reads/writes (fixed-width
//!   primitives, varints, strings, compound tags).
//! - [`BufferPool`]: recycles buffer storage between messages.
//! - [`CompoundTag`] / [`Tag`]: the nested key/value data attached to
//!   item stacks.
//!
//! This crate knows nothing about messages or registries; it only moves
//! bytes.

mod buffer;
mod error;
mod pool;
mod tag;

pub use buffer::{
    encode_var_int, encode_var_long, var_int_len, var_long_len, ByteBuffer,
    ByteOrder, DEFAULT_INITIAL_CAPACITY, DEFAULT_MAX_CAPACITY,
    MAX_UTF_LEN, MAX_VAR_INT_LEN, MAX_VAR_LONG_LEN,
};
pub use error::BufferError;
pub use pool::BufferPool;
pub use tag::{CompoundTag, Tag, MAX_TAG_DEPTH};
