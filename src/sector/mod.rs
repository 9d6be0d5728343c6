//! Sector fault model.
//!
//! This module handles:
//! - Parsing and formatting bad sector lists
//! - Tracking bad sectors and the reserve used to repair them

mod spec;
mod state;

pub use spec::{format_sector_spec, parse_sector_spec, ParseError};
pub use state::{SectorState, SectorStats};
