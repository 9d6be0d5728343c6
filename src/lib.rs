//! Bad Sector Simulator
//!
//! Makes a disk image behave like a drive with bad sectors, for testing how
//! filesystems, RAID layers and backup tools cope with sector failures.
//!
//! # Features
//!
//! - **Bad sector lists**: compact `"10-20,64"` syntax, expanded at startup
//! - **Read faults**: any read covering a bad sector fails with an I/O error
//! - **Remap on write**: writes reallocate bad sectors to a limited reserve
//! - **Thread safe**: one [`Engine`] can serve concurrent readers and writers
//!
//! # Architecture
//!
//! ```text
//! Request → Sector range → Bad sector check / remap → Backing store
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use badsector_sim::{DeviceConfig, Engine};
//!
//! let config = DeviceConfig::new("disk.img")
//!     .with_bad_sectors("100-103")
//!     .with_reserve_sectors(2);
//! let engine = Engine::open(&config).unwrap();
//!
//! // Reading sector 100 fails like a real bad sector
//! assert!(engine.read(100 * 512, 512).is_err());
//!
//! // Writing it remaps the sector to a spare
//! engine.write(100 * 512, &[0u8; 512]).unwrap();
//! engine.shutdown().unwrap();
//! ```

pub mod batch;
pub mod config;
pub mod engine;
pub mod error;
pub mod sector;
pub mod storage;

#[cfg(test)]
mod proptests;

pub use config::{DeviceConfig, Geometry, SECTOR_SIZE};
pub use engine::Engine;
pub use error::{Error, Result};
pub use sector::{ParseError, SectorState, SectorStats};
