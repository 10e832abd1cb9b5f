use std::fmt::{Debug, Formatter};
use std::ops::Deref;
use std::sync::Arc;

use bytes::Bytes;
use tessera_error::{TesseraResult, tessera_bail};

use crate::pool::memory_pool;

/// A fixed-length region of raw memory with shared ownership.
///
/// Cloning a `Buffer` shares the underlying memory; [`Buffer::share_count`]
/// reports how many handles currently share it. A buffer never changes length
/// after construction — "resizing" always means allocating a new buffer.
#[derive(Clone)]
pub struct Buffer {
    inner: Arc<Inner>,
}

enum Inner {
    /// Memory owned by this buffer, drawn from the global pool. Mutable
    /// while uniquely held.
    Owned(Allocation),
    /// Externally owned memory wrapped zero-copy. Always immutable.
    External(Bytes),
}

struct Allocation {
    words: Vec<u64>,
    len: usize,
    charged: usize,
}

impl Drop for Allocation {
    fn drop(&mut self) {
        if self.charged > 0 {
            memory_pool().release(self.charged);
        }
    }
}

impl Buffer {
    /// Allocate a zeroed, mutable buffer of `nbytes` from the global pool.
    ///
    /// Owned buffers are 8-byte aligned so that any native element type can
    /// be viewed over them.
    pub fn allocate(nbytes: usize) -> TesseraResult<Self> {
        let words = memory_pool().allocate(nbytes)?;
        Ok(Self {
            inner: Arc::new(Inner::Owned(Allocation {
                words,
                len: nbytes,
                charged: nbytes,
            })),
        })
    }

    /// Allocate a mutable buffer holding a copy of `data`.
    pub fn copy_from(data: &[u8]) -> TesseraResult<Self> {
        let mut buffer = Self::allocate(data.len())?;
        buffer.as_mut_slice()?.copy_from_slice(data);
        Ok(buffer)
    }

    /// Wrap externally owned memory zero-copy. The resulting buffer is
    /// immutable.
    pub fn from_bytes(bytes: Bytes) -> Self {
        Self {
            inner: Arc::new(Inner::External(bytes)),
        }
    }

    /// An empty, mutable buffer. Does not allocate.
    pub fn empty() -> Self {
        Self {
            inner: Arc::new(Inner::Owned(Allocation {
                words: Vec::new(),
                len: 0,
                charged: 0,
            })),
        }
    }

    /// Length of the buffer in bytes.
    pub fn len(&self) -> usize {
        match self.inner.as_ref() {
            Inner::Owned(alloc) => alloc.len,
            Inner::External(bytes) => bytes.len(),
        }
    }

    /// Whether the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this buffer permits mutation at all. Mutation additionally
    /// requires exclusive ownership; see [`Buffer::as_mut_slice`].
    pub fn is_mutable(&self) -> bool {
        matches!(self.inner.as_ref(), Inner::Owned(_))
    }

    /// The number of handles currently sharing this buffer's memory.
    pub fn share_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Whether this handle is the sole owner of the memory.
    pub fn is_unique(&self) -> bool {
        self.share_count() == 1
    }

    /// The buffer's bytes.
    pub fn as_slice(&self) -> &[u8] {
        match self.inner.as_ref() {
            Inner::Owned(alloc) => {
                // SAFETY: the words vector holds at least `len` initialized
                // bytes, and u64 alignment satisfies u8.
                unsafe { std::slice::from_raw_parts(alloc.words.as_ptr().cast::<u8>(), alloc.len) }
            }
            Inner::External(bytes) => bytes.as_ref(),
        }
    }

    /// Writable access to the buffer's bytes.
    ///
    /// Fails with `InvalidArgument` if the buffer is immutable or still
    /// shared; callers must detach (copy) first.
    pub fn as_mut_slice(&mut self) -> TesseraResult<&mut [u8]> {
        if !self.is_mutable() {
            tessera_bail!("buffer is immutable");
        }
        let refs = self.share_count();
        match Arc::get_mut(&mut self.inner) {
            None => tessera_bail!("buffer is shared by {} handles; copy it first", refs),
            Some(Inner::Owned(alloc)) => {
                // SAFETY: same layout argument as `as_slice`, and exclusive
                // access is guaranteed by `Arc::get_mut`.
                Ok(unsafe {
                    std::slice::from_raw_parts_mut(alloc.words.as_mut_ptr().cast::<u8>(), alloc.len)
                })
            }
            Some(Inner::External(_)) => tessera_bail!("buffer is immutable"),
        }
    }

    /// Copy a byte range into a freshly allocated buffer. Never aliases the
    /// source, regardless of the range.
    pub fn copy(&self, byte_offset: usize, byte_length: usize) -> TesseraResult<Self> {
        let end = byte_offset
            .checked_add(byte_length)
            .filter(|end| *end <= self.len());
        let Some(end) = end else {
            tessera_bail!(
                "copy range [{}, {}) exceeds buffer length {}",
                byte_offset,
                byte_offset.wrapping_add(byte_length),
                self.len()
            );
        };
        log::trace!("copying {byte_length} buffer bytes");
        Buffer::copy_from(&self.as_slice()[byte_offset..end])
    }
}

impl Debug for Buffer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        const TRUNC_SIZE: usize = 64;
        let mut s = f.debug_struct("Buffer");
        s.field("length", &self.len())
            .field("mutable", &self.is_mutable())
            .field("share_count", &self.share_count());
        if self.len() > TRUNC_SIZE {
            s.field("truncated", &true);
        }
        s.field("bytes", &&self.as_slice()[..self.len().min(TRUNC_SIZE)])
            .finish()
    }
}

impl Deref for Buffer {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl PartialEq for Buffer {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for Buffer {}
