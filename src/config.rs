//! Configuration constants and types for the bad sector simulator.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Logical sector size of the simulated device, in bytes.
pub const SECTOR_SIZE: u64 = 512;

/// Upper bound on the number of sectors a bad sector spec may expand to.
///
/// 16 Mi sectors covers an 8 GiB device entirely.
pub const MAX_SPEC_SECTORS: u64 = 16 * 1024 * 1024;

/// Configuration for opening a simulated device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Path to the backing disk image.
    pub disk_image: PathBuf,

    /// Bad sector list, e.g. `"10-20,64"`. Empty means no bad sectors.
    #[serde(default)]
    pub bad_sectors: String,

    /// Number of spare sectors available for reallocation on write.
    #[serde(default)]
    pub reserve_sectors: u64,
}

impl DeviceConfig {
    /// Create a configuration with no bad sectors and no reserve.
    pub fn new(disk_image: impl Into<PathBuf>) -> Self {
        Self {
            disk_image: disk_image.into(),
            bad_sectors: String::new(),
            reserve_sectors: 0,
        }
    }

    pub fn with_bad_sectors(mut self, spec: impl Into<String>) -> Self {
        self.bad_sectors = spec.into();
        self
    }

    pub fn with_reserve_sectors(mut self, reserve: u64) -> Self {
        self.reserve_sectors = reserve;
        self
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// The sector spec itself is checked by the parser when the engine opens.
    pub fn validate(&self) -> Result<()> {
        if self.disk_image.as_os_str().is_empty() {
            return Err(Error::InvalidConfig(
                "disk image path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Geometry of the simulated device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Sector size in bytes.
    pub sector_size: u64,
    /// Device size in bytes, taken from the backing store once at open.
    pub device_size: u64,
}

impl Geometry {
    pub fn new(device_size: u64) -> Self {
        Self {
            sector_size: SECTOR_SIZE,
            device_size,
        }
    }

    /// Number of sectors holding at least one byte of the device.
    pub fn sector_count(&self) -> u64 {
        self.device_size.div_ceil(self.sector_size)
    }
}
