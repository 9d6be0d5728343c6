//! Storage layer behind the simulated device.
//!
//! This module handles:
//! - The backing store trait the engine reads and writes through
//! - Disk image files
//! - In-memory images

mod backend;
mod image;
mod memory;

pub use backend::BackingStore;
pub use image::ImageFile;
pub use memory::MemoryImage;
