//! In-memory backing store.

use crate::error::Result;
use crate::storage::backend::BackingStore;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Default)]
struct MemoryInner {
    data: RwLock<Vec<u8>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    syncs: AtomicUsize,
    closed: AtomicBool,
}

/// A fixed-size image held in memory.
///
/// Clones share the same buffer and counters, so a caller can hand one
/// clone to an engine and keep another to inspect what the engine did.
#[derive(Debug, Clone, Default)]
pub struct MemoryImage {
    inner: Arc<MemoryInner>,
}

impl MemoryImage {
    /// Create a zero-filled image of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self::from_bytes(vec![0u8; size])
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                data: RwLock::new(data),
                ..Default::default()
            }),
        }
    }

    /// Copy of the current contents.
    pub fn contents(&self) -> Vec<u8> {
        self.inner
            .data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of `read_at` calls served.
    pub fn read_calls(&self) -> usize {
        self.inner.reads.load(Ordering::SeqCst)
    }

    /// Number of `write_at` calls served.
    pub fn write_calls(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    pub fn sync_calls(&self) -> usize {
        self.inner.syncs.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

impl BackingStore for MemoryImage {
    fn size(&self) -> Result<u64> {
        let data = self.inner.data.read().unwrap_or_else(PoisonError::into_inner);
        Ok(data.len() as u64)
    }

    fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        self.inner.reads.fetch_add(1, Ordering::SeqCst);
        let data = self.inner.data.read().unwrap_or_else(PoisonError::into_inner);

        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
        let end = start.saturating_add(len).min(data.len());
        Ok(data[start..end].to_vec())
    }

    fn write_at(&self, offset: u64, buf: &[u8]) -> Result<usize> {
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        let mut data = self.inner.data.write().unwrap_or_else(PoisonError::into_inner);

        // Fixed size: bytes past the end are dropped.
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
        let end = start.saturating_add(buf.len()).min(data.len());
        data[start..end].copy_from_slice(&buf[..end - start]);
        Ok(end - start)
    }

    fn sync(&self) -> Result<()> {
        self.inner.syncs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.inner.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
