//! The [`ByteBuffer`] type: a growable byte store with independent read
//! and write cursors.
//!
//! ```text
//!      +-------------------+------------------+------------------+
//!      | discardable bytes |  readable bytes  |  writable bytes  |
//!      +-------------------+------------------+------------------+
//!      0      <=      reader_index   <=   writer_index    <=    capacity
//! ```
//!
//! Storage is shared between a buffer and every slice taken from it, and
//! is reference counted with an [`Arc`]. When the last handle is dropped
//! the bytes are freed, or handed back to the [`BufferPool`] they came
//! from.
//!
//! [`BufferPool`]: crate::BufferPool

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::pool::PoolShared;
use crate::BufferError;

/// Capacity of a buffer created with [`ByteBuffer::new`].
pub const DEFAULT_INITIAL_CAPACITY: usize = 256;

/// Upper bound on how large a root buffer may grow by default.
pub const DEFAULT_MAX_CAPACITY: usize = i32::MAX as usize;

/// Maximum encoded length of a varint.
pub const MAX_VAR_INT_LEN: usize = 5;

/// Maximum encoded length of a varlong.
pub const MAX_VAR_LONG_LEN: usize = 10;

/// Maximum byte length of a legacy (16-bit prefixed) string.
pub const MAX_UTF_LEN: usize = u16::MAX as usize;

/// Smallest capacity a buffer grows to.
const MIN_GROWTH: usize = 64;

// ---------------------------------------------------------------------------
// Varint helpers
// ---------------------------------------------------------------------------

/// Returns the number of bytes `value` takes as a varint.
pub fn var_int_len(value: i32) -> usize {
    let bits = 32 - (value as u32).leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

/// Returns the number of bytes `value` takes as a varlong.
pub fn var_long_len(value: i64) -> usize {
    let bits = 64 - (value as u64).leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

/// Encodes `value` as a varint into `out`, returning the encoded length.
///
/// The bit pattern is treated as unsigned, so negative values always take
/// the full five bytes.
pub fn encode_var_int(value: i32, out: &mut [u8; MAX_VAR_INT_LEN]) -> usize {
    let mut remaining = value as u32;
    let mut i = 0;
    loop {
        if remaining & !0x7F == 0 {
            out[i] = remaining as u8;
            return i + 1;
        }
        out[i] = (remaining & 0x7F) as u8 | 0x80;
        remaining >>= 7;
        i += 1;
    }
}

/// Encodes `value` as a varlong into `out`, returning the encoded length.
pub fn encode_var_long(
    value: i64,
    out: &mut [u8; MAX_VAR_LONG_LEN],
) -> usize {
    let mut remaining = value as u64;
    let mut i = 0;
    loop {
        if remaining & !0x7F == 0 {
            out[i] = remaining as u8;
            return i + 1;
        }
        out[i] = (remaining & 0x7F) as u8 | 0x80;
        remaining >>= 7;
        i += 1;
    }
}

// ---------------------------------------------------------------------------
// ByteOrder
// ---------------------------------------------------------------------------

/// Byte order used for fixed-width reads and writes.
///
/// The wire protocol is big-endian; little-endian exists for the odd
/// payload that embeds foreign data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    BigEndian,
    LittleEndian,
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// The bytes behind a buffer and all of its slices.
///
/// `Vec::len()` is the capacity of the root buffer: the vector is always
/// zero-filled up to capacity so slices can address any byte in it.
#[derive(Debug)]
pub(crate) struct Storage {
    bytes: Mutex<Vec<u8>>,
    pool: Option<Arc<PoolShared>>,
}

impl Storage {
    pub(crate) fn new(bytes: Vec<u8>, pool: Option<Arc<PoolShared>>) -> Self {
        Self {
            bytes: Mutex::new(bytes),
            pool,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        // A poisoned lock only means another handle panicked mid-copy; the
        // bytes are still plain memory.
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Storage {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            let bytes = std::mem::take(
                self.bytes.get_mut().unwrap_or_else(PoisonError::into_inner),
            );
            pool.recycle(bytes);
        }
    }
}

// ---------------------------------------------------------------------------
// ByteBuffer
// ---------------------------------------------------------------------------

/// A growable, index-addressable byte buffer with separate read and write
/// cursors.
///
/// All typed writes go through [`ensure_writable`](Self::ensure_writable),
/// so a root buffer grows on demand up to its maximum capacity. Slices
/// have a fixed capacity and never grow.
///
/// A `ByteBuffer` is not internally synchronized for concurrent use: it
/// is meant to be owned by one connection or one encode/decode call.
pub struct ByteBuffer {
    storage: Arc<Storage>,
    /// Start of this view inside the shared storage (0 for a root buffer).
    offset: usize,
    /// Fixed capacity for slices; `None` for a growable root buffer.
    fixed: Option<usize>,
    reader: usize,
    writer: usize,
    marked_reader: usize,
    marked_writer: usize,
    order: ByteOrder,
    max_capacity: usize,
}

/// Generates a write/read pair for a fixed-width primitive.
macro_rules! fixed_width {
    ($($write:ident, $read:ident, $ty:ty;)*) => {$(
        #[doc = concat!("Writes a `", stringify!($ty), "` in the buffer's byte order.")]
        pub fn $write(&mut self, value: $ty) -> Result<(), BufferError> {
            let bytes = match self.order {
                ByteOrder::BigEndian => value.to_be_bytes(),
                ByteOrder::LittleEndian => value.to_le_bytes(),
            };
            self.write_raw(&bytes)
        }

        #[doc = concat!("Reads a `", stringify!($ty), "` in the buffer's byte order.")]
        pub fn $read(&mut self) -> Result<$ty, BufferError> {
            let bytes =
                self.read_array::<{ std::mem::size_of::<$ty>() }>()?;
            Ok(match self.order {
                ByteOrder::BigEndian => <$ty>::from_be_bytes(bytes),
                ByteOrder::LittleEndian => <$ty>::from_le_bytes(bytes),
            })
        }
    )*};
}

impl ByteBuffer {
    /// Creates an empty buffer with the default initial capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_INITIAL_CAPACITY)
    }

    /// Creates an empty buffer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_max_capacity(capacity, DEFAULT_MAX_CAPACITY)
    }

    /// Creates an empty buffer that never grows beyond `max_capacity`.
    pub fn with_max_capacity(capacity: usize, max_capacity: usize) -> Self {
        let capacity = capacity.min(max_capacity);
        let storage = Storage::new(vec![0; capacity], None);
        Self::from_storage(storage, 0, max_capacity)
    }

    /// Creates a buffer whose readable bytes are a copy of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::wrap(bytes.to_vec())
    }

    /// Creates a buffer that takes ownership of `bytes`; all of them are
    /// readable.
    pub fn wrap(bytes: Vec<u8>) -> Self {
        let len = bytes.len();
        let max = DEFAULT_MAX_CAPACITY.max(len);
        Self::from_storage(Storage::new(bytes, None), len, max)
    }

    pub(crate) fn from_storage(
        storage: Storage,
        writer: usize,
        max_capacity: usize,
    ) -> Self {
        Self {
            storage: Arc::new(storage),
            offset: 0,
            fixed: None,
            reader: 0,
            writer,
            marked_reader: 0,
            marked_writer: 0,
            order: ByteOrder::default(),
            max_capacity,
        }
    }

    // -- Cursors and capacity ------------------------------------------------

    /// Number of bytes the buffer can hold without growing.
    pub fn capacity(&self) -> usize {
        match self.fixed {
            Some(len) => len,
            None => self.storage.lock().len(),
        }
    }

    /// Largest capacity this buffer may grow to.
    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    pub fn reader_index(&self) -> usize {
        self.reader
    }

    pub fn writer_index(&self) -> usize {
        self.writer
    }

    /// Moves the read cursor. It may not pass the write cursor.
    pub fn set_reader_index(&mut self, index: usize) -> Result<(), BufferError> {
        if index > self.writer {
            return Err(BufferError::IndexOutOfBounds {
                index,
                limit: self.writer,
            });
        }
        self.reader = index;
        Ok(())
    }

    /// Moves the write cursor. It must stay between the read cursor and
    /// the capacity.
    pub fn set_writer_index(&mut self, index: usize) -> Result<(), BufferError> {
        let capacity = self.capacity();
        if index < self.reader || index > capacity {
            return Err(BufferError::IndexOutOfBounds {
                index,
                limit: capacity,
            });
        }
        self.writer = index;
        Ok(())
    }

    /// Bytes between the read and write cursors.
    pub fn readable_bytes(&self) -> usize {
        self.writer - self.reader
    }

    /// Bytes that can be written without growing.
    pub fn writable_bytes(&self) -> usize {
        self.capacity() - self.writer
    }

    pub fn is_readable(&self) -> bool {
        self.writer > self.reader
    }

    /// Resets both cursors and marks to zero. The bytes are left as-is.
    pub fn clear(&mut self) {
        self.reader = 0;
        self.writer = 0;
        self.marked_reader = 0;
        self.marked_writer = 0;
    }

    /// Advances the read cursor by `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<(), BufferError> {
        self.check_readable(n)?;
        self.reader += n;
        Ok(())
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    /// Changes the byte order used by fixed-width reads and writes on
    /// this handle. Slices inherit the order at the time they are taken.
    pub fn set_order(&mut self, order: ByteOrder) {
        self.order = order;
    }

    /// Guarantees that `n` more bytes can be written.
    ///
    /// Root buffers grow to `max(required, 2 × capacity)`, bounded by the
    /// maximum capacity. Slices cannot grow.
    ///
    /// # Errors
    /// Returns [`BufferError::CapacityExceeded`] when the write would pass
    /// the maximum capacity.
    pub fn ensure_writable(&mut self, n: usize) -> Result<(), BufferError> {
        let required = self.writer.checked_add(n).ok_or(
            BufferError::CapacityExceeded {
                requested: usize::MAX,
                max: self.max_capacity,
            },
        )?;
        let capacity = self.capacity();
        if required <= capacity {
            return Ok(());
        }
        if self.fixed.is_some() || required > self.max_capacity {
            return Err(BufferError::CapacityExceeded {
                requested: required,
                max: self.max_capacity,
            });
        }

        let new_capacity = required
            .max(capacity.saturating_mul(2))
            .max(MIN_GROWTH)
            .min(self.max_capacity);
        self.storage.lock().resize(new_capacity, 0);
        tracing::trace!(from = capacity, to = new_capacity, "buffer grew");
        Ok(())
    }

    // -- Marks -----------------------------------------------------------------

    /// Remembers the current read cursor.
    pub fn mark_read(&mut self) {
        self.marked_reader = self.reader;
    }

    /// Restores the read cursor saved by [`mark_read`](Self::mark_read).
    pub fn reset_read(&mut self) -> Result<(), BufferError> {
        self.set_reader_index(self.marked_reader)
    }

    /// Remembers the current write cursor.
    pub fn mark_write(&mut self) {
        self.marked_writer = self.writer;
    }

    /// Restores the write cursor saved by [`mark_write`](Self::mark_write).
    pub fn reset_write(&mut self) -> Result<(), BufferError> {
        self.set_writer_index(self.marked_writer)
    }

    // -- Views, copies and lifetime -------------------------------------------

    /// Returns a view over the readable bytes that shares this buffer's
    /// storage.
    pub fn slice(&self) -> ByteBuffer {
        self.view(self.reader, self.readable_bytes())
    }

    /// Returns a view over `length` bytes starting at absolute `index`.
    ///
    /// The slice starts with its read cursor at 0 and its write cursor at
    /// `length`. Writes through it land in the parent's storage.
    pub fn slice_at(
        &self,
        index: usize,
        length: usize,
    ) -> Result<ByteBuffer, BufferError> {
        let capacity = self.capacity();
        let end = index.checked_add(length).ok_or(
            BufferError::IndexOutOfBounds {
                index,
                limit: capacity,
            },
        )?;
        if end > capacity {
            return Err(BufferError::IndexOutOfBounds {
                index: end,
                limit: capacity,
            });
        }
        Ok(self.view(index, length))
    }

    fn view(&self, index: usize, length: usize) -> ByteBuffer {
        ByteBuffer {
            storage: Arc::clone(&self.storage),
            offset: self.offset + index,
            fixed: Some(length),
            reader: 0,
            writer: length,
            marked_reader: 0,
            marked_writer: 0,
            order: self.order,
            max_capacity: length,
        }
    }

    /// Returns an independent buffer holding a copy of the readable bytes.
    pub fn copy(&self) -> ByteBuffer {
        let mut copy = ByteBuffer::wrap(self.to_vec());
        copy.order = self.order;
        copy
    }

    /// Copies the readable bytes out into a vector.
    pub fn to_vec(&self) -> Vec<u8> {
        self.with_readable(<[u8]>::to_vec)
    }

    /// Runs `f` over the readable bytes without copying them.
    pub fn with_readable<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        let bytes = self.storage.lock();
        let start = self.offset + self.reader;
        f(&bytes[start..self.offset + self.writer])
    }

    /// Number of live handles (this buffer plus its slices) on the
    /// underlying storage.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.storage)
    }

    /// Gives up this handle.
    ///
    /// Returns `true` if this was the last handle, meaning the storage was
    /// freed or returned to its pool. The buffer is consumed, so it cannot
    /// be used afterwards.
    pub fn release(self) -> bool {
        // Dropping the returned storage frees it or hands it back to the pool.
        Arc::into_inner(self.storage).is_some()
    }

    // -- Absolute access -------------------------------------------------------

    /// Reads the byte at absolute `index` without moving any cursor.
    pub fn get_u8(&self, index: usize) -> Result<u8, BufferError> {
        self.check_index(index, 1)?;
        Ok(self.storage.lock()[self.offset + index])
    }

    /// Writes the byte at absolute `index` without moving any cursor.
    pub fn set_u8(&mut self, index: usize, value: u8) -> Result<(), BufferError> {
        self.check_index(index, 1)?;
        self.storage.lock()[self.offset + index] = value;
        Ok(())
    }

    /// Fills `dst` from absolute `index` without moving any cursor.
    pub fn get_bytes(
        &self,
        index: usize,
        dst: &mut [u8],
    ) -> Result<(), BufferError> {
        self.check_index(index, dst.len())?;
        let start = self.offset + index;
        dst.copy_from_slice(&self.storage.lock()[start..start + dst.len()]);
        Ok(())
    }

    /// Copies `src` to absolute `index` without moving any cursor.
    pub fn set_bytes(
        &mut self,
        index: usize,
        src: &[u8],
    ) -> Result<(), BufferError> {
        self.check_index(index, src.len())?;
        let start = self.offset + index;
        self.storage.lock()[start..start + src.len()].copy_from_slice(src);
        Ok(())
    }

    // -- Fixed-width primitives ------------------------------------------------

    fixed_width! {
        write_u8, read_u8, u8;
        write_i8, read_i8, i8;
        write_u16, read_u16, u16;
        write_i16, read_i16, i16;
        write_i32, read_i32, i32;
        write_i64, read_i64, i64;
        write_f32, read_f32, f32;
        write_f64, read_f64, f64;
    }

    pub fn write_bool(&mut self, value: bool) -> Result<(), BufferError> {
        self.write_u8(u8::from(value))
    }

    /// Reads a boolean; any non-zero byte is `true`.
    pub fn read_bool(&mut self) -> Result<bool, BufferError> {
        Ok(self.read_u8()? != 0)
    }

    /// Writes raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), BufferError> {
        self.write_raw(bytes)
    }

    /// Reads exactly `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, BufferError> {
        self.check_readable(len)?;
        let start = self.offset + self.reader;
        let out = self.storage.lock()[start..start + len].to_vec();
        self.reader += len;
        Ok(out)
    }

    // -- Variable-length integers ----------------------------------------------

    pub fn write_var_int(&mut self, value: i32) -> Result<(), BufferError> {
        let mut scratch = [0u8; MAX_VAR_INT_LEN];
        let len = encode_var_int(value, &mut scratch);
        self.write_raw(&scratch[..len])
    }

    /// Reads a varint.
    ///
    /// On underflow the read cursor is left where it was, so a caller
    /// assembling a stream can retry once more bytes arrive.
    ///
    /// # Errors
    /// [`BufferError::MalformedVarInt`] if the fifth byte still carries
    /// the continuation bit.
    pub fn read_var_int(&mut self) -> Result<i32, BufferError> {
        let start = self.reader;
        let mut result: u32 = 0;
        for i in 0..MAX_VAR_INT_LEN {
            let byte = match self.read_u8() {
                Ok(byte) => byte,
                Err(e) => {
                    self.reader = start;
                    return Err(e);
                }
            };
            result |= u32::from(byte & 0x7F) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(result as i32);
            }
        }
        Err(BufferError::MalformedVarInt)
    }

    pub fn write_var_long(&mut self, value: i64) -> Result<(), BufferError> {
        let mut scratch = [0u8; MAX_VAR_LONG_LEN];
        let len = encode_var_long(value, &mut scratch);
        self.write_raw(&scratch[..len])
    }

    /// Reads a varlong; same rules as [`read_var_int`](Self::read_var_int)
    /// with a ten byte limit.
    pub fn read_var_long(&mut self) -> Result<i64, BufferError> {
        let start = self.reader;
        let mut result: u64 = 0;
        for i in 0..MAX_VAR_LONG_LEN {
            let byte = match self.read_u8() {
                Ok(byte) => byte,
                Err(e) => {
                    self.reader = start;
                    return Err(e);
                }
            };
            result |= u64::from(byte & 0x7F) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(result as i64);
            }
        }
        Err(BufferError::MalformedVarLong)
    }

    // -- Strings -----------------------------------------------------------------

    /// Writes a varint byte-length prefix followed by the UTF-8 bytes.
    pub fn write_string(&mut self, value: &str) -> Result<(), BufferError> {
        let len = i32::try_from(value.len()).map_err(|_| {
            BufferError::StringTooLong {
                len: value.len(),
                max: i32::MAX as usize,
            }
        })?;
        self.ensure_writable(var_int_len(len) + value.len())?;
        self.write_var_int(len)?;
        self.write_raw(value.as_bytes())
    }

    /// Reads a varint length-prefixed UTF-8 string of any length.
    pub fn read_string(&mut self) -> Result<String, BufferError> {
        let len = self.read_length()?;
        self.read_utf8(len)
    }

    /// Reads a varint length-prefixed string of at most `max_chars`
    /// characters.
    pub fn read_string_limited(
        &mut self,
        max_chars: usize,
    ) -> Result<String, BufferError> {
        let len = self.read_length()?;
        // A char is at most four UTF-8 bytes.
        let max_bytes = max_chars.saturating_mul(4);
        if len > max_bytes {
            return Err(BufferError::StringTooLong {
                len,
                max: max_bytes,
            });
        }
        let value = self.read_utf8(len)?;
        let chars = value.chars().count();
        if chars > max_chars {
            return Err(BufferError::StringTooLong {
                len: chars,
                max: max_chars,
            });
        }
        Ok(value)
    }

    /// Writes a legacy string: unsigned 16-bit byte length, then UTF-8.
    pub fn write_utf(&mut self, value: &str) -> Result<(), BufferError> {
        let len = u16::try_from(value.len()).map_err(|_| {
            BufferError::StringTooLong {
                len: value.len(),
                max: MAX_UTF_LEN,
            }
        })?;
        self.ensure_writable(2 + value.len())?;
        self.write_u16(len)?;
        self.write_raw(value.as_bytes())
    }

    /// Reads a legacy 16-bit length-prefixed string.
    pub fn read_utf(&mut self) -> Result<String, BufferError> {
        let len = usize::from(self.read_u16()?);
        self.read_utf8(len)
    }

    /// Reads a varint length prefix and checks it against the readable
    /// bytes before anything is allocated.
    pub fn read_length(&mut self) -> Result<usize, BufferError> {
        let len = self.read_var_int()?;
        let len =
            usize::try_from(len).map_err(|_| BufferError::NegativeLength(len))?;
        self.check_readable(len)?;
        Ok(len)
    }

    fn read_utf8(&mut self, len: usize) -> Result<String, BufferError> {
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes).map_err(|_| BufferError::InvalidUtf8)
    }

    // -- Internals -------------------------------------------------------------

    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), BufferError> {
        self.ensure_writable(bytes.len())?;
        let start = self.offset + self.writer;
        self.storage.lock()[start..start + bytes.len()].copy_from_slice(bytes);
        self.writer += bytes.len();
        Ok(())
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], BufferError> {
        self.check_readable(N)?;
        let mut out = [0u8; N];
        let start = self.offset + self.reader;
        out.copy_from_slice(&self.storage.lock()[start..start + N]);
        self.reader += N;
        Ok(out)
    }

    pub(crate) fn check_readable(&self, n: usize) -> Result<(), BufferError> {
        let available = self.readable_bytes();
        if n > available {
            return Err(BufferError::Underflow {
                needed: n,
                available,
            });
        }
        Ok(())
    }

    fn check_index(&self, index: usize, len: usize) -> Result<(), BufferError> {
        let capacity = self.capacity();
        match index.checked_add(len) {
            Some(end) if end <= capacity => Ok(()),
            _ => Err(BufferError::IndexOutOfBounds {
                index,
                limit: capacity,
            }),
        }
    }
}

impl Default for ByteBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteBuffer")
            .field("reader", &self.reader)
            .field("writer", &self.writer)
            .field("capacity", &self.capacity())
            .field("slice", &self.fixed.is_some())
            .field("order", &self.order)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_is_empty() {
        let buf = ByteBuffer::new();
        assert_eq!(buf.reader_index(), 0);
        assert_eq!(buf.writer_index(), 0);
        assert_eq!(buf.capacity(), DEFAULT_INITIAL_CAPACITY);
        assert!(!buf.is_readable());
    }

    #[test]
    fn test_fixed_width_is_big_endian_by_default() {
        let mut buf = ByteBuffer::new();
        buf.write_i32(0x0102_0304).unwrap();
        assert_eq!(buf.to_vec(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_little_endian_override() {
        let mut buf = ByteBuffer::new();
        buf.set_order(ByteOrder::LittleEndian);
        buf.write_i16(0x0102).unwrap();
        assert_eq!(buf.to_vec(), vec![2, 1]);
        assert_eq!(buf.read_i16().unwrap(), 0x0102);
    }

    #[test]
    fn test_primitive_round_trip() {
        let mut buf = ByteBuffer::new();
        buf.write_bool(true).unwrap();
        buf.write_i8(-5).unwrap();
        buf.write_u16(65_000).unwrap();
        buf.write_i64(i64::MIN).unwrap();
        buf.write_f32(1.5).unwrap();
        buf.write_f64(-0.25).unwrap();

        assert!(buf.read_bool().unwrap());
        assert_eq!(buf.read_i8().unwrap(), -5);
        assert_eq!(buf.read_u16().unwrap(), 65_000);
        assert_eq!(buf.read_i64().unwrap(), i64::MIN);
        assert_eq!(buf.read_f32().unwrap(), 1.5);
        assert_eq!(buf.read_f64().unwrap(), -0.25);
        assert!(!buf.is_readable());
    }

    #[test]
    fn test_grows_past_initial_capacity() {
        let mut buf = ByteBuffer::with_capacity(4);
        for i in 0..100 {
            buf.write_i32(i).unwrap();
        }
        assert_eq!(buf.readable_bytes(), 400);
        assert!(buf.capacity() >= 400);
    }

    #[test]
    fn test_max_capacity_is_enforced() {
        let mut buf = ByteBuffer::with_max_capacity(2, 3);
        buf.write_u16(1).unwrap();
        let err = buf.write_u16(2).unwrap_err();
        assert_eq!(
            err,
            BufferError::CapacityExceeded {
                requested: 4,
                max: 3
            }
        );
    }

    #[test]
    fn test_underflow_reports_needed_and_available() {
        let mut buf = ByteBuffer::from_bytes(&[1, 2]);
        let err = buf.read_i32().unwrap_err();
        assert_eq!(
            err,
            BufferError::Underflow {
                needed: 4,
                available: 2
            }
        );
    }

    #[test]
    fn test_var_int_known_encodings() {
        let cases: [(i32, &[u8]); 7] = [
            (0, &[0x00]),
            (1, &[0x01]),
            (127, &[0x7F]),
            (128, &[0x80, 0x01]),
            (255, &[0xFF, 0x01]),
            (2_147_483_647, &[0xFF, 0xFF, 0xFF, 0xFF, 0x07]),
            (-1, &[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]),
        ];
        for (value, expected) in cases {
            let mut buf = ByteBuffer::new();
            buf.write_var_int(value).unwrap();
            assert_eq!(buf.to_vec(), expected, "encoding {value}");
            assert_eq!(var_int_len(value), expected.len());
            assert_eq!(buf.read_var_int().unwrap(), value);
        }
    }

    #[test]
    fn test_var_int_rejects_sixth_byte() {
        let mut buf =
            ByteBuffer::from_bytes(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01]);
        assert_eq!(buf.read_var_int(), Err(BufferError::MalformedVarInt));
    }

    #[test]
    fn test_var_int_underflow_restores_reader() {
        let mut buf = ByteBuffer::from_bytes(&[0x80, 0x80]);
        assert!(matches!(
            buf.read_var_int(),
            Err(BufferError::Underflow { .. })
        ));
        assert_eq!(buf.reader_index(), 0);
    }

    #[test]
    fn test_var_long_rejects_eleventh_byte() {
        let mut bytes = vec![0x80; 10];
        bytes.push(0x01);
        let mut buf = ByteBuffer::from_bytes(&bytes);
        assert_eq!(buf.read_var_long(), Err(BufferError::MalformedVarLong));
    }

    #[test]
    fn test_var_long_extremes() {
        for value in [0, 1, -1, i64::MAX, i64::MIN] {
            let mut buf = ByteBuffer::new();
            buf.write_var_long(value).unwrap();
            assert_eq!(buf.readable_bytes(), var_long_len(value));
            assert_eq!(buf.read_var_long().unwrap(), value);
        }
        assert_eq!(var_long_len(-1), MAX_VAR_LONG_LEN);
    }

    #[test]
    fn test_string_prefix_is_byte_length() {
        let mut buf = ByteBuffer::new();
        buf.write_string("héllo").unwrap();
        // 'é' is two bytes in UTF-8.
        assert_eq!(buf.read_var_int().unwrap(), 6);
    }

    #[test]
    fn test_read_string_limited_rejects_long_strings() {
        let mut buf = ByteBuffer::new();
        buf.write_string("abcdef").unwrap();
        assert!(matches!(
            buf.read_string_limited(3),
            Err(BufferError::StringTooLong { .. })
        ));
    }

    #[test]
    fn test_negative_string_length_is_rejected() {
        let mut buf = ByteBuffer::new();
        buf.write_var_int(-2).unwrap();
        assert_eq!(buf.read_string(), Err(BufferError::NegativeLength(-2)));
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let mut buf = ByteBuffer::new();
        buf.write_var_int(2).unwrap();
        buf.write_bytes(&[0xC3, 0x28]).unwrap();
        assert_eq!(buf.read_string(), Err(BufferError::InvalidUtf8));
    }

    #[test]
    fn test_utf_uses_u16_prefix() {
        let mut buf = ByteBuffer::new();
        buf.write_utf("abc").unwrap();
        assert_eq!(buf.to_vec(), vec![0, 3, b'a', b'b', b'c']);
        assert_eq!(buf.read_utf().unwrap(), "abc");
    }

    #[test]
    fn test_utf_rejects_oversized_strings() {
        let long = "x".repeat(MAX_UTF_LEN + 1);
        let mut buf = ByteBuffer::new();
        assert!(matches!(
            buf.write_utf(&long),
            Err(BufferError::StringTooLong { .. })
        ));
    }

    #[test]
    fn test_mark_and_reset() {
        let mut buf = ByteBuffer::new();
        buf.write_i32(7).unwrap();
        buf.mark_read();
        assert_eq!(buf.read_i32().unwrap(), 7);
        buf.reset_read().unwrap();
        assert_eq!(buf.read_i32().unwrap(), 7);

        buf.mark_write();
        buf.write_i32(8).unwrap();
        buf.reset_write().unwrap();
        assert_eq!(buf.writer_index(), 4);
    }

    #[test]
    fn test_set_reader_index_cannot_pass_writer() {
        let mut buf = ByteBuffer::from_bytes(&[1, 2, 3]);
        assert!(buf.set_reader_index(3).is_ok());
        assert!(matches!(
            buf.set_reader_index(4),
            Err(BufferError::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_slice_shares_storage_both_ways() {
        let mut parent = ByteBuffer::from_bytes(&[0, 0, 0, 0]);
        let mut slice = parent.slice_at(1, 2).unwrap();
        slice.set_u8(0, 0xAA).unwrap();
        assert_eq!(parent.get_u8(1).unwrap(), 0xAA);

        parent.set_u8(2, 0xBB).unwrap();
        assert_eq!(slice.get_u8(1).unwrap(), 0xBB);
    }

    #[test]
    fn test_slice_cannot_grow() {
        let parent = ByteBuffer::from_bytes(&[1, 2, 3, 4]);
        let mut slice = parent.slice_at(0, 2).unwrap();
        slice.clear();
        slice.write_u16(9).unwrap();
        assert!(matches!(
            slice.write_u8(1),
            Err(BufferError::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn test_slice_out_of_range() {
        let parent = ByteBuffer::from_bytes(&[1, 2, 3]);
        assert!(parent.slice_at(2, 5).is_err());
    }

    #[test]
    fn test_copy_is_independent() {
        let mut original = ByteBuffer::from_bytes(&[1, 2, 3]);
        let copy = original.copy();
        original.set_u8(0, 9).unwrap();
        assert_eq!(copy.to_vec(), vec![1, 2, 3]);
        assert_eq!(copy.ref_count(), 1);
    }

    #[test]
    fn test_ref_count_tracks_slices() {
        let parent = ByteBuffer::from_bytes(&[1, 2, 3]);
        let slice = parent.slice();
        assert_eq!(parent.ref_count(), 2);
        assert!(!slice.release());
        assert_eq!(parent.ref_count(), 1);
        assert!(parent.release());
    }

    #[test]
    fn test_concurrent_release_reports_exactly_one_last_handle() {
        for _ in 0..100 {
            let parent = ByteBuffer::from_bytes(&[1, 2, 3, 4]);
            let handles: Vec<ByteBuffer> = (0..4).map(|_| parent.slice()).collect();
            let threads: Vec<_> = std::iter::once(parent)
                .chain(handles)
                .map(|buf| std::thread::spawn(move || buf.release()))
                .collect();
            let last = threads
                .into_iter()
                .map(|t| t.join().unwrap())
                .filter(|&last| last)
                .count();
            assert_eq!(last, 1);
        }
    }
}
