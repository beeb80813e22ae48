//! # Static Work Partition
//!
//! Each worker owns a contiguous slice range for the force phase and a contiguous
//! particle range for the movement phase. Both are the same proportional split:
//!
//! ```text
//!   slices    [pid*S/W, (pid+1)*S/W)
//!   particles [pid*n/W, (pid+1)*n/W)
//! ```
//!
//! The split ignores slice occupancy. It is computed once when the pool is built
//! and never rebalanced.

use std::ops::Range;

use crate::error::{SimError, SimResult};

/// The `part`-th of `parts` proportional, contiguous sub-ranges of `0..total`.
///
/// Consecutive parts share boundaries, so the parts tile `0..total` exactly.
#[inline]
#[must_use]
pub fn proportional_range(total: usize, parts: usize, part: usize) -> Range<usize> {
    debug_assert!(part < parts, "part {part} outside 0..{parts}");
    boundary(total, parts, part)..boundary(total, parts, part + 1)
}

#[inline]
fn boundary(total: usize, parts: usize, part: usize) -> usize {
    // u128 keeps total * part exact for any usize inputs.
    let scaled = total as u128 * part as u128 / parts as u128;
    usize::try_from(scaled).unwrap_or(total)
}

/// The ranges statically assigned to one worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerRange {
    /// Worker index.
    pub pid: usize,
    /// Slices whose particles this worker computes forces for.
    pub slices: Range<usize>,
    /// Particles this worker integrates.
    pub particles: Range<usize>,
}

/// Static assignment of slices and particles to a fixed set of workers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkPartition {
    ranges: Vec<WorkerRange>,
    slices: usize,
    particles: usize,
}

impl WorkPartition {
    /// Splits `slices` slices and `particles` particles across `workers` workers.
    ///
    /// Workers may receive empty ranges when there are fewer slices or particles
    /// than workers.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] if any count is zero.
    pub fn new(slices: usize, particles: usize, workers: usize) -> SimResult<Self> {
        if workers == 0 {
            return Err(SimError::InvalidConfig("worker count must be > 0".into()));
        }
        if slices == 0 {
            return Err(SimError::InvalidConfig("slice count must be > 0".into()));
        }
        if particles == 0 {
            return Err(SimError::InvalidConfig("particle count must be > 0".into()));
        }

        let ranges = (0..workers)
            .map(|pid| WorkerRange {
                pid,
                slices: proportional_range(slices, workers, pid),
                particles: proportional_range(particles, workers, pid),
            })
            .collect();

        Ok(Self { ranges, slices, particles })
    }

    /// Number of workers.
    #[inline]
    #[must_use]
    pub fn workers(&self) -> usize {
        self.ranges.len()
    }

    /// Total number of slices covered.
    #[inline]
    #[must_use]
    pub const fn slices(&self) -> usize {
        self.slices
    }

    /// Total number of particles covered.
    #[inline]
    #[must_use]
    pub const fn particles(&self) -> usize {
        self.particles
    }

    /// All worker ranges, ordered by `pid`.
    #[inline]
    #[must_use]
    pub fn ranges(&self) -> &[WorkerRange] {
        &self.ranges
    }

    /// Ranges of worker `pid`.
    #[inline]
    #[must_use]
    pub fn range(&self, pid: usize) -> &WorkerRange {
        &self.ranges[pid]
    }

    /// Worker that integrates particle `index`.
    #[must_use]
    pub fn particle_owner(&self, index: usize) -> usize {
        debug_assert!(index < self.particles);
        // Last worker whose range starts at or before `index`; empty ranges that
        // share the start are skipped because they come first.
        self.ranges
            .partition_point(|range| range.particles.start <= index)
            .saturating_sub(1)
    }

    /// Worker that computes forces for slice `slice`.
    #[must_use]
    pub fn slice_owner(&self, slice: usize) -> usize {
        debug_assert!(slice < self.slices);
        self.ranges
            .partition_point(|range| range.slices.start <= slice)
            .saturating_sub(1)
    }
}
