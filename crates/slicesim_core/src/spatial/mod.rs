//! # Spatial Decomposition
//!
//! The domain is cut into `S` equal-width slices along x. Forces are short range,
//! so a particle only interacts with particles in its own slice and the two
//! adjacent ones:
//!
//! ```text
//!   0        1        2        3            S-1
//! ┌────────┬────────┬────────┬────────┬───┬────────┐
//! │        │ ░░░░░░ │ ██████ │ ░░░░░░ │...│        │
//! └────────┴────────┴────────┴────────┴───┴────────┘
//!            i-1       i        i+1
//! ```
//!
//! The index is rebuilt from scratch every step by the coordinator.

mod binning;
mod index;

pub use binning::{Binning, OutOfRange, Placement};
pub use index::{RebuildStats, Slice, SliceEntry, SpatialIndex};
