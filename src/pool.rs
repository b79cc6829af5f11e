//! Reusable output buffers for streaming serializers.
//!
//! Idle buffers sit in a lock-free bounded queue. A checkout pops one
//! (or allocates), so two concurrent checkouts never share storage. The
//! [`PooledBuffer`] handle owns its vector until it is released, and
//! release consumes the handle: there is nothing left to write through
//! afterwards. Every checkout gets a fresh number so traces can tell
//! reuses apart.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_queue::ArrayQueue;
use tracing::trace;

use crate::{
    config::{BufferPoolConfig, ByteOrder},
    io::ObjectDataOutput,
};

/// Counters describing pool activity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Total checkouts.
    pub checkouts: u64,
    /// Checkouts that had to allocate.
    pub allocations: u64,
    /// Checkouts served from an idle buffer.
    pub reuses: u64,
    /// Released buffers that were dropped (oversized or pool full).
    pub discards: u64,
    /// Buffers currently idle in the pool.
    pub idle: usize,
}

/// Pool of output buffers.
#[derive(Debug)]
pub struct BufferPool {
    free: Option<ArrayQueue<Vec<u8>>>,
    config: BufferPoolConfig,
    checkouts: AtomicU64,
    allocations: AtomicU64,
    reuses: AtomicU64,
    discards: AtomicU64,
}

impl BufferPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new(config: BufferPoolConfig) -> Self {
        Self {
            free: (config.capacity > 0).then(|| ArrayQueue::new(config.capacity)),
            config,
            checkouts: AtomicU64::new(0),
            allocations: AtomicU64::new(0),
            reuses: AtomicU64::new(0),
            discards: AtomicU64::new(0),
        }
    }

    /// Checks out an empty buffer.
    pub fn acquire_output(&self) -> PooledBuffer<'_> {
        let checkout = self.checkouts.fetch_add(1, Ordering::Relaxed) + 1;

        let buf = match self.free.as_ref().and_then(ArrayQueue::pop) {
            Some(mut buf) => {
                self.reuses.fetch_add(1, Ordering::Relaxed);
                buf.clear();
                buf
            }
            None => {
                self.allocations.fetch_add(1, Ordering::Relaxed);
                Vec::with_capacity(self.config.initial_buffer_size)
            }
        };

        trace!(checkout, capacity = buf.capacity(), "Buffer checked out");

        PooledBuffer {
            buf,
            checkout,
            pool: self,
        }
    }

    /// Returns a buffer to the pool. Same as dropping it.
    pub fn release(&self, buffer: PooledBuffer<'_>) {
        debug_assert!(std::ptr::eq(self, buffer.pool));
        drop(buffer);
    }

    fn give_back(&self, mut buf: Vec<u8>, checkout: u64) {
        if buf.capacity() > self.config.max_retained_size {
            trace!(checkout, capacity = buf.capacity(), "Dropping oversized buffer");
            self.discards.fetch_add(1, Ordering::Relaxed);
            return;
        }

        buf.clear();
        let pushed = self.free.as_ref().is_some_and(|free| free.push(buf).is_ok());
        if pushed {
            trace!(checkout, "Buffer released");
        } else {
            trace!(checkout, "Pool full, dropping buffer");
            self.discards.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            checkouts: self.checkouts.load(Ordering::Relaxed),
            allocations: self.allocations.load(Ordering::Relaxed),
            reuses: self.reuses.load(Ordering::Relaxed),
            discards: self.discards.load(Ordering::Relaxed),
            idle: self.free.as_ref().map_or(0, ArrayQueue::len),
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(BufferPoolConfig::default())
    }
}

/// A buffer checked out of a [`BufferPool`].
///
/// Goes back to the pool when released or dropped.
#[derive(Debug)]
pub struct PooledBuffer<'p> {
    buf: Vec<u8>,
    checkout: u64,
    pool: &'p BufferPool,
}

impl PooledBuffer<'_> {
    /// Number identifying this checkout.
    #[must_use]
    pub const fn checkout(&self) -> u64 {
        self.checkout
    }

    /// Bytes written so far.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// `true` if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Appends raw bytes.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Opens a writer appending to this buffer.
    pub fn output(&mut self, order: ByteOrder) -> ObjectDataOutput<'_> {
        ObjectDataOutput::new(&mut self.buf, order)
    }
}

impl Extend<u8> for PooledBuffer<'_> {
    fn extend<I: IntoIterator<Item = u8>>(&mut self, iter: I) {
        self.buf.extend(iter);
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.give_back(std::mem::take(&mut self.buf), self.checkout);
    }
}
