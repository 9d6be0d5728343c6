//! The fault-injecting device.
//!
//! [`Engine`] sits between a caller and a [`BackingStore`]. Every request is
//! mapped to the sectors it covers; reads covering a bad sector fail, writes
//! covering one first remap it to a reserve sector and fail only when the
//! reserve is exhausted.

mod range;

pub use range::{sector_range, SectorRange};

use crate::config::{DeviceConfig, Geometry};
use crate::error::{Error, Result};
use crate::sector::{SectorState, SectorStats};
use crate::storage::{BackingStore, ImageFile};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// A simulated drive with bad sectors over a backing store.
///
/// `Engine` is `Send + Sync`; share it between threads with `Arc`.
pub struct Engine {
    geometry: Geometry,
    state: RwLock<SectorState>,
    /// `None` once shut down. Requests hold the read side while they run.
    store: RwLock<Option<Box<dyn BackingStore>>>,
}

impl Engine {
    /// Open the disk image named by `config` and build the fault state.
    ///
    /// Fails if the bad sector list is malformed or the image cannot be
    /// opened for reading and writing.
    pub fn open(config: &DeviceConfig) -> Result<Self> {
        config.validate()?;
        let state = SectorState::from_spec(&config.bad_sectors, config.reserve_sectors)?;
        let image = ImageFile::open(&config.disk_image)?;

        info!(path = %image.path().display(), "opened disk image");
        Self::with_store(Box::new(image), state)
    }

    /// Build an engine over an already opened store.
    ///
    /// The store size is read once here and used for the whole session.
    pub fn with_store(store: Box<dyn BackingStore>, state: SectorState) -> Result<Self> {
        let geometry = Geometry::new(store.size()?);

        info!(
            backend = store.name(),
            device_size = geometry.device_size,
            bad_sectors = state.bad_count(),
            reserve_sectors = state.reserve(),
            "device ready"
        );

        Ok(Self {
            geometry,
            state: RwLock::new(state),
            store: RwLock::new(Some(store)),
        })
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn device_size(&self) -> u64 {
        self.geometry.device_size
    }

    /// Whether `sector` is currently bad.
    pub fn is_bad(&self, sector: u64) -> bool {
        self.state().is_bad(sector)
    }

    pub fn stats(&self) -> SectorStats {
        self.state().stats()
    }

    /// Currently bad sectors in ascending order.
    pub fn bad_sectors(&self) -> Vec<u64> {
        self.state().bad_sectors()
    }

    pub fn is_shut_down(&self) -> bool {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Read up to `length` bytes at `offset`.
    ///
    /// Reads starting at or past the end of the device return no data.
    /// Reads running past the end are truncated. If any sector in the
    /// request's range is bad, fails with [`Error::DeviceFault`] without
    /// touching the backing store.
    pub fn read(&self, offset: u64, length: usize) -> Result<Vec<u8>> {
        self.in_flight(|store| {
            debug!(offset, length, "read");
            let Some(length) = self.clamp(offset, length, "read") else {
                return Ok(Vec::new());
            };

            let range = sector_range(offset, length as u64);
            if let Some(sector) = self.state().first_bad_in(range.sectors()) {
                warn!(sector, offset, length, "read hit bad sector");
                return Err(Error::DeviceFault { sector });
            }

            store.read_at(offset, length)
        })
    }

    /// Write `data` at `offset`, returning the number of bytes written.
    ///
    /// Bad sectors in the request's range are remapped in ascending order,
    /// one reserve sector each. If the reserve runs out the write fails with
    /// [`Error::DeviceFault`] and nothing is written, but sectors remapped
    /// before the failure stay remapped.
    pub fn write(&self, offset: u64, data: &[u8]) -> Result<usize> {
        self.in_flight(|store| {
            debug!(offset, length = data.len(), "write");
            let Some(length) = self.clamp(offset, data.len(), "write") else {
                return Ok(0);
            };

            self.remap(sector_range(offset, length as u64))?;
            store.write_at(offset, &data[..length])
        })
    }

    /// Flush the backing store.
    pub fn sync(&self) -> Result<()> {
        self.in_flight(|store| store.sync())
    }

    /// Wait for in-flight requests, then sync and close the backing store.
    ///
    /// Later requests fail with [`Error::ShutDown`]. Calling this again is a
    /// no-op.
    pub fn shutdown(&self) -> Result<()> {
        let mut slot = self.store.write().unwrap_or_else(PoisonError::into_inner);
        let Some(store) = slot.take() else {
            return Ok(());
        };

        let stats = self.stats();
        info!(
            bad_sectors = stats.bad_sectors,
            reserve_remaining = stats.reserve_remaining,
            repaired = stats.repaired,
            "shutting down device"
        );

        // Close even if the final sync fails; report the first error.
        let synced = store.sync();
        let closed = store.close();
        synced.and(closed)
    }

    /// Run `op` against the store while holding off shutdown.
    fn in_flight<T>(&self, op: impl FnOnce(&dyn BackingStore) -> Result<T>) -> Result<T> {
        let slot = self.store.read().unwrap_or_else(PoisonError::into_inner);
        let store = slot.as_deref().ok_or(Error::ShutDown)?;
        op(store)
    }

    /// Clamp a request to the device, or `None` if it starts past the end.
    fn clamp(&self, offset: u64, length: usize, op: &'static str) -> Option<usize> {
        let device_size = self.geometry.device_size;
        if offset >= device_size {
            warn!(op, offset, device_size, "request starts after the end of the device");
            return None;
        }

        let available = device_size - offset;
        if length as u64 > available {
            warn!(
                op,
                offset,
                length,
                truncated = available,
                "request runs past the end of the device, truncating"
            );
            return Some(available as usize);
        }
        Some(length)
    }

    /// Remap every bad sector in `range`, lowest first.
    ///
    /// The state lock is taken per sector so concurrent requests interleave
    /// between repairs but never inside one.
    fn remap(&self, range: SectorRange) -> Result<()> {
        let mut next = range.first;
        while next <= range.last {
            let mut state = self.state_mut();
            let Some(sector) = state.first_bad_in(next..=range.last) else {
                break;
            };

            if !state.repair(sector) {
                warn!(sector, "no reserve sectors left, write failed");
                return Err(Error::DeviceFault { sector });
            }
            info!(
                sector,
                reserve_remaining = state.reserve(),
                "remapped bad sector"
            );
            next = sector + 1;
        }
        Ok(())
    }

    fn state(&self) -> RwLockReadGuard<'_, SectorState> {
        // Every mutation of the state is a single call, so a poisoned lock
        // still guards consistent data.
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&self) -> RwLockWriteGuard<'_, SectorState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "failed to shut down device cleanly");
        }
    }
}
