//! Mapping byte requests onto sectors.

use crate::config::SECTOR_SIZE;
use std::ops::RangeInclusive;

/// Sectors checked for a request, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorRange {
    pub first: u64,
    pub last: u64,
}

impl SectorRange {
    pub fn sectors(&self) -> RangeInclusive<u64> {
        self.first..=self.last
    }
}

/// Sectors checked for a request of `length` bytes at `offset`.
///
/// `last` is `ceil((offset + length) / SECTOR_SIZE)` and is scanned
/// inclusively. For any non-empty request that is the sector after the one
/// holding the last byte, so one sector beyond the request is checked too.
pub fn sector_range(offset: u64, length: u64) -> SectorRange {
    let end = offset.saturating_add(length);
    SectorRange {
        first: offset / SECTOR_SIZE,
        last: end.div_ceil(SECTOR_SIZE),
    }
}
