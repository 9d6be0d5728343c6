//! Backing store abstraction for the simulated device.
//!
//! The engine never touches the image directly; it goes through this trait
//! so the same fault logic runs over a file or an in-memory buffer.

use crate::error::Result;

/// Trait for byte storage behind the simulated device.
///
/// Implementations must support concurrent positioned I/O from several
/// threads through `&self`.
pub trait BackingStore: Send + Sync {
    /// Current size of the store in bytes.
    fn size(&self) -> Result<u64>;

    /// Read up to `len` bytes at `offset`.
    ///
    /// May return fewer bytes if the store ends before `offset + len`.
    fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>>;

    /// Write `data` at `offset`, returning the number of bytes written.
    fn write_at(&self, offset: u64, data: &[u8]) -> Result<usize>;

    /// Flush written data to durable storage.
    fn sync(&self) -> Result<()>;

    /// Release the store. Called once, after a final `sync`.
    fn close(self: Box<Self>) -> Result<()>;

    /// Get the name of this backend (for logging).
    fn name(&self) -> &'static str;
}
