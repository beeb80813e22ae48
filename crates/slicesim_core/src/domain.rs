//! # Simulation Domain
//!
//! The square box `[0, size)²` and its decomposition into `slices` equal-width
//! bands along x. Both values are fixed for the whole run.

use std::ops::Range;

use crate::error::{SimError, SimResult};
use crate::physics::DENSITY;

/// Particles per slice used to derive the default slice count.
pub const PARTICLES_PER_SLICE: usize = 10;

/// Geometry of one run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Domain {
    particles: usize,
    slices: usize,
    size: f64,
}

impl Domain {
    /// Derives the domain for `particles` particles at constant density.
    ///
    /// `S = n < 10 ? 1 : n / 10` and `size = sqrt(DENSITY * n)`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] when `particles` is zero.
    pub fn for_particles(particles: usize) -> SimResult<Self> {
        if particles == 0 {
            return Err(SimError::InvalidConfig("particle count must be > 0".into()));
        }
        let slices = if particles < PARTICLES_PER_SLICE {
            1
        } else {
            particles / PARTICLES_PER_SLICE
        };
        #[allow(clippy::cast_precision_loss)]
        let size = (DENSITY * particles as f64).sqrt();
        Ok(Self { particles, slices, size })
    }

    /// Builds a domain with an explicit slice count.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] for zero counts or a size that is not
    /// finite and positive.
    pub fn with_slices(particles: usize, slices: usize, size: f64) -> SimResult<Self> {
        if particles == 0 {
            return Err(SimError::InvalidConfig("particle count must be > 0".into()));
        }
        if slices == 0 {
            return Err(SimError::InvalidConfig("slice count must be > 0".into()));
        }
        if !size.is_finite() || size <= 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "domain size must be finite and > 0, got {size}"
            )));
        }
        Ok(Self { particles, slices, size })
    }

    /// Number of particles `n`.
    #[inline]
    #[must_use]
    pub const fn particles(&self) -> usize {
        self.particles
    }

    /// Number of slices `S`.
    #[inline]
    #[must_use]
    pub const fn slices(&self) -> usize {
        self.slices
    }

    /// Side length of the square domain.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> f64 {
        self.size
    }

    /// Slices whose particles interact with particles of `slice`.
    #[inline]
    #[must_use]
    pub fn neighbor_slices(&self, slice: usize) -> Range<usize> {
        neighbor_range(slice, self.slices)
    }
}

/// The slice itself plus its immediate neighbors, clamped to `[0, slices)`.
#[inline]
#[must_use]
pub fn neighbor_range(slice: usize, slices: usize) -> Range<usize> {
    debug_assert!(slice < slices, "slice {slice} outside 0..{slices}");
    slice.saturating_sub(1)..(slice + 2).min(slices)
}
