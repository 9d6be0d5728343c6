//! Bad sector bookkeeping: which sectors fail and how many spares remain.

use super::spec::{parse_sector_spec, ParseError};
use std::collections::BTreeSet;
use std::ops::RangeInclusive;

/// Snapshot of the fault state counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorStats {
    /// Sectors that are currently bad.
    pub bad_sectors: usize,
    /// Spare sectors still available for reallocation.
    pub reserve_remaining: u64,
    /// Sectors repaired so far in this session.
    pub repaired: u64,
}

/// The set of bad sectors and the remaining reserve.
///
/// Sectors only ever leave the bad set, through [`SectorState::repair`],
/// and each repair consumes exactly one reserve sector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectorState {
    bad: BTreeSet<u64>,
    reserve: u64,
    repaired: u64,
}

impl SectorState {
    pub fn new(bad: impl IntoIterator<Item = u64>, reserve: u64) -> Self {
        Self {
            bad: bad.into_iter().collect(),
            reserve,
            repaired: 0,
        }
    }

    /// Build the state from a bad sector list such as `"10-20,64"`.
    pub fn from_spec(spec: &str, reserve: u64) -> Result<Self, ParseError> {
        Ok(Self::new(parse_sector_spec(spec)?, reserve))
    }

    /// Whether the sector currently fails.
    pub fn is_bad(&self, sector: u64) -> bool {
        self.bad.contains(&sector)
    }

    /// Reallocate a bad sector to a spare.
    ///
    /// Returns `false` without changing anything if the sector is not bad or
    /// no spare is left.
    pub fn repair(&mut self, sector: u64) -> bool {
        if self.reserve == 0 || !self.bad.remove(&sector) {
            return false;
        }
        self.reserve -= 1;
        self.repaired += 1;
        true
    }

    /// Lowest bad sector within `sectors`, if any.
    pub fn first_bad_in(&self, sectors: RangeInclusive<u64>) -> Option<u64> {
        // `BTreeSet::range` panics on a reversed range.
        if sectors.is_empty() {
            return None;
        }
        self.bad.range(sectors).next().copied()
    }

    pub fn bad_count(&self) -> usize {
        self.bad.len()
    }

    pub fn reserve(&self) -> u64 {
        self.reserve
    }

    pub fn repaired(&self) -> u64 {
        self.repaired
    }

    /// Currently bad sectors in ascending order.
    pub fn bad_sectors(&self) -> Vec<u64> {
        self.bad.iter().copied().collect()
    }

    pub fn stats(&self) -> SectorStats {
        SectorStats {
            bad_sectors: self.bad.len(),
            reserve_remaining: self.reserve,
            repaired: self.repaired,
        }
    }
}
