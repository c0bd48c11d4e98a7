//! A pool of reusable buffer storage.
//!
//! Acquiring a buffer hands out an ordinary [`ByteBuffer`] whose storage
//! remembers the pool it came from. When the buffer and every slice of it
//! are gone, the storage is cleared and pushed back onto the free list.
//! There is no explicit "return" call to forget.

use std::sync::{Arc, Mutex, PoisonError};

use crate::buffer::{Storage, DEFAULT_MAX_CAPACITY};
use crate::ByteBuffer;

#[derive(Debug)]
pub(crate) struct PoolShared {
    free: Mutex<Vec<Vec<u8>>>,
    initial_capacity: usize,
    max_pooled: usize,
}

impl PoolShared {
    pub(crate) fn recycle(&self, mut bytes: Vec<u8>) {
        bytes.clear();
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        if free.len() < self.max_pooled {
            free.push(bytes);
            tracing::trace!(pooled = free.len(), "buffer storage recycled");
        } else {
            tracing::trace!("buffer pool full, freeing storage");
        }
    }
}

/// Hands out buffers backed by recycled storage.
///
/// Cheap to clone; clones share the same free list.
#[derive(Debug, Clone)]
pub struct BufferPool {
    shared: Arc<PoolShared>,
}

impl BufferPool {
    /// Creates a pool whose buffers start at `initial_capacity` bytes and
    /// which keeps at most `max_pooled` idle vectors around.
    pub fn new(initial_capacity: usize, max_pooled: usize) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                free: Mutex::new(Vec::new()),
                initial_capacity,
                max_pooled,
            }),
        }
    }

    /// Takes a buffer from the pool, allocating fresh storage if the free
    /// list is empty.
    pub fn acquire(&self) -> ByteBuffer {
        let mut bytes = self
            .shared
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_default();
        bytes.resize(self.shared.initial_capacity, 0);
        let storage = Storage::new(bytes, Some(Arc::clone(&self.shared)));
        ByteBuffer::from_storage(storage, 0, DEFAULT_MAX_CAPACITY)
    }

    /// Number of idle vectors waiting to be reused.
    pub fn pooled(&self) -> usize {
        self.shared
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_released_buffer_returns_to_pool() {
        let pool = BufferPool::new(64, 4);
        let mut buf = pool.acquire();
        buf.write_i32(1).unwrap();
        assert_eq!(pool.pooled(), 0);
        assert!(buf.release());
        assert_eq!(pool.pooled(), 1);
    }

    #[test]
    fn test_storage_returns_only_after_last_slice() {
        let pool = BufferPool::new(64, 4);
        let mut buf = pool.acquire();
        buf.write_i64(42).unwrap();
        let slice = buf.slice();

        assert!(!buf.release());
        assert_eq!(pool.pooled(), 0);

        assert_eq!(slice.to_vec(), 42i64.to_be_bytes().to_vec());
        drop(slice);
        assert_eq!(pool.pooled(), 1);
    }

    #[test]
    fn test_reacquired_buffer_starts_empty() {
        let pool = BufferPool::new(16, 4);
        let mut buf = pool.acquire();
        buf.write_i32(7).unwrap();
        drop(buf);

        let buf = pool.acquire();
        assert_eq!(pool.pooled(), 0);
        assert_eq!(buf.readable_bytes(), 0);
        assert_eq!(buf.capacity(), 16);
        assert_eq!(buf.get_u8(0).unwrap(), 0);
    }

    #[test]
    fn test_pool_caps_idle_storage() {
        let pool = BufferPool::new(8, 1);
        let a = pool.acquire();
        let b = pool.acquire();
        drop(a);
        drop(b);
        assert_eq!(pool.pooled(), 1);
    }
}
