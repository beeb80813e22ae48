//! # Spatial Index
//!
//! `S` slices along x. Each entry references a particle by its store index and
//! carries a frozen copy of it taken at rebuild time, so the force phase reads a
//! single consistent step no matter what happens to the store afterwards.

use tracing::debug;

use super::binning::{Binning, OutOfRange, Placement};
use crate::domain::Domain;
use crate::error::{SimError, SimResult};
use crate::particle::Particle;

/// One particle as seen by the force phase.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SliceEntry {
    /// Store index of the particle.
    pub index: usize,
    /// Copy of the particle at rebuild time.
    pub particle: Particle,
}

/// All particles whose x currently falls inside one band.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Slice {
    entries: Vec<SliceEntry>,
}

impl Slice {
    /// Number of particles in the slice.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the slice is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates the entries.
    pub fn iter(&self) -> std::slice::Iter<'_, SliceEntry> {
        self.entries.iter()
    }

    /// Store indices of the particles in the slice.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|entry| entry.index)
    }
}

/// Summary of one rebuild.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RebuildStats {
    /// Particles placed.
    pub binned: usize,
    /// Particles whose slice had to be clamped into range.
    pub clamped: usize,
    /// Largest slice after the rebuild.
    pub max_occupancy: usize,
}

/// Slice decomposition of the domain, rebuilt from scratch every step.
#[derive(Clone, Debug)]
pub struct SpatialIndex {
    slices: Vec<Slice>,
    domain: Domain,
    binning: Binning,
    out_of_range: OutOfRange,
}

impl SpatialIndex {
    /// Creates an empty index with `domain.slices()` slices.
    #[must_use]
    pub fn new(domain: Domain, binning: Binning, out_of_range: OutOfRange) -> Self {
        Self {
            slices: vec![Slice::default(); domain.slices()],
            domain,
            binning,
            out_of_range,
        }
    }

    /// Number of slices.
    #[inline]
    #[must_use]
    pub fn slice_count(&self) -> usize {
        self.slices.len()
    }

    /// The slice at `slice`.
    #[inline]
    #[must_use]
    pub fn slice(&self, slice: usize) -> &Slice {
        &self.slices[slice]
    }

    /// All slices in order.
    #[inline]
    #[must_use]
    pub fn slices(&self) -> &[Slice] {
        &self.slices
    }

    /// Total number of entries across all slices.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.slices.iter().map(Slice::len).sum()
    }

    /// Entries of `slice` and of its immediate neighbors.
    pub fn neighborhood(&self, slice: usize) -> impl Iterator<Item = &SliceEntry> + '_ {
        self.slices[self.domain.neighbor_slices(slice)]
            .iter()
            .flat_map(Slice::iter)
    }

    /// Slice for the particle at store index `index`, applying the out-of-range
    /// policy. Returns the slice and whether it was clamped.
    ///
    /// # Errors
    ///
    /// [`SimError::NonFiniteParticle`] for NaN or infinite x, and
    /// [`SimError::OutOfDomain`] for out-of-range x under [`OutOfRange::Reject`].
    pub fn locate(&self, index: usize, particle: &Particle) -> SimResult<(usize, bool)> {
        self.locate_scaled(index, particle, self.binning.scale(&self.domain))
    }

    fn locate_scaled(&self, index: usize, particle: &Particle, scale: f64) -> SimResult<(usize, bool)> {
        let slices = self.slices.len();
        let clamp_to = match Binning::place(particle.x, scale, slices) {
            Placement::Inside(slice) => return Ok((slice, false)),
            Placement::NonFinite => return Err(SimError::NonFiniteParticle { index }),
            Placement::Below => 0,
            Placement::Above => slices - 1,
        };
        match self.out_of_range {
            OutOfRange::Clamp => Ok((clamp_to, true)),
            OutOfRange::Reject => Err(SimError::OutOfDomain {
                index,
                x: particle.x,
                slices,
            }),
        }
    }

    /// Clears every slice, then bins `particles` in order; the position in the
    /// iterator is the store index.
    ///
    /// On error the index is left empty.
    ///
    /// # Errors
    ///
    /// See [`SpatialIndex::locate`].
    pub fn rebuild<'p, I>(&mut self, particles: I) -> SimResult<RebuildStats>
    where
        I: IntoIterator<Item = &'p Particle>,
    {
        for slice in &mut self.slices {
            slice.entries.clear();
        }

        let scale = self.binning.scale(&self.domain);
        let mut stats = RebuildStats::default();
        for (index, particle) in particles.into_iter().enumerate() {
            let (slice, clamped) = match self.locate_scaled(index, particle, scale) {
                Ok(placed) => placed,
                Err(err) => {
                    for slice in &mut self.slices {
                        slice.entries.clear();
                    }
                    return Err(err);
                }
            };
            if clamped {
                debug!(index, x = particle.x, slice, "clamped particle into slice range");
                stats.clamped += 1;
            }
            self.slices[slice].entries.push(SliceEntry {
                index,
                particle: *particle,
            });
            stats.binned += 1;
        }

        stats.max_occupancy = self.slices.iter().map(Slice::len).max().unwrap_or(0);
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spread(n: usize, size: f64) -> Vec<Particle> {
        (0..n)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let t = (i as f64 * 0.618_033_988_75).fract();
                Particle::at(t * size, 0.5 * size)
            })
            .collect()
    }

    fn expected_slice(x: f64, scale: f64, slices: usize) -> usize {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let raw = (x * scale).floor() as usize;
        raw.min(slices - 1)
    }

    #[test]
    fn test_every_particle_in_exactly_one_slice() {
        for binning in [Binning::Natural, Binning::Legacy] {
            let domain = Domain::for_particles(137).unwrap();
            let particles = spread(137, domain.size());
            let mut index = SpatialIndex::new(domain, binning, OutOfRange::Clamp);
            let stats = index.rebuild(&particles).unwrap();

            assert_eq!(stats.binned, 137);
            assert_eq!(index.entry_count(), 137);

            let scale = binning.scale(&domain);
            let mut seen = vec![0u32; particles.len()];
            for (s, slice) in index.slices().iter().enumerate() {
                for entry in slice.iter() {
                    seen[entry.index] += 1;
                    assert_eq!(s, expected_slice(entry.particle.x, scale, domain.slices()));
                    assert_eq!(entry.particle, particles[entry.index]);
                }
            }
            assert!(seen.iter().all(|&c| c == 1));
        }
    }

    #[test]
    fn test_legacy_formula_deviates_from_natural() {
        // n = 250: S = 25, size = sqrt(0.125) ≈ 0.3536, S / size ≈ 70.71.
        let domain = Domain::for_particles(250).unwrap();
        let particles = spread(250, domain.size());
        let mut natural = SpatialIndex::new(domain, Binning::Natural, OutOfRange::Clamp);
        let mut legacy = SpatialIndex::new(domain, Binning::Legacy, OutOfRange::Clamp);
        natural.rebuild(&particles).unwrap();
        legacy.rebuild(&particles).unwrap();

        let moved = particles
            .iter()
            .enumerate()
            .filter(|(i, p)| natural.locate(*i, p).unwrap() != legacy.locate(*i, p).unwrap())
            .count();
        assert!(moved > 0, "floored scale should misplace some particles");
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let domain = Domain::for_particles(64).unwrap();
        let particles = spread(64, domain.size());
        let mut index = SpatialIndex::new(domain, Binning::Natural, OutOfRange::Clamp);
        index.rebuild(&particles).unwrap();
        let first = index.slices().to_vec();
        index.rebuild(&particles).unwrap();
        assert_eq!(index.slices(), first.as_slice());
    }

    #[test]
    fn test_rebuild_clears_stale_entries() {
        let domain = Domain::for_particles(20).unwrap();
        let mut index = SpatialIndex::new(domain, Binning::Natural, OutOfRange::Clamp);
        let left = vec![Particle::at(0.01, 0.05); 20];
        let right = vec![Particle::at(0.09, 0.05); 20];
        index.rebuild(&left).unwrap();
        assert_eq!(index.slice(0).len(), 20);
        index.rebuild(&right).unwrap();
        assert!(index.slice(0).is_empty());
        assert_eq!(index.slice(1).len(), 20);
    }

    #[test]
    fn test_wall_particle_is_clamped() {
        let domain = Domain::for_particles(20).unwrap();
        let mut particles = spread(20, domain.size());
        particles[3].x = domain.size();
        particles[4].x = -1e-9;

        let mut index = SpatialIndex::new(domain, Binning::Natural, OutOfRange::Clamp);
        let stats = index.rebuild(&particles).unwrap();
        assert_eq!(stats.clamped, 2);
        assert!(index.slice(1).indices().any(|i| i == 3));
        assert!(index.slice(0).indices().any(|i| i == 4));
    }

    #[test]
    fn test_reject_policy_reports_out_of_domain() {
        let domain = Domain::for_particles(20).unwrap();
        let mut particles = spread(20, domain.size());
        particles[7].x = 2.0 * domain.size();

        let mut index = SpatialIndex::new(domain, Binning::Natural, OutOfRange::Reject);
        let err = index.rebuild(&particles).unwrap_err();
        assert!(matches!(err, SimError::OutOfDomain { index: 7, slices: 2, .. }));
        assert_eq!(index.entry_count(), 0);
    }

    #[test]
    fn test_non_finite_is_always_an_error() {
        let domain = Domain::for_particles(20).unwrap();
        let mut particles = spread(20, domain.size());
        particles[0].x = f64::NAN;
        let mut index = SpatialIndex::new(domain, Binning::Natural, OutOfRange::Clamp);
        assert_eq!(
            index.rebuild(&particles),
            Err(SimError::NonFiniteParticle { index: 0 })
        );
    }

    #[test]
    fn test_single_slice_neighborhood() {
        let domain = Domain::for_particles(5).unwrap();
        assert_eq!(domain.slices(), 1);
        let particles = spread(5, domain.size());
        let mut index = SpatialIndex::new(domain, Binning::Natural, OutOfRange::Clamp);
        index.rebuild(&particles).unwrap();
        assert_eq!(index.neighborhood(0).count(), 5);
    }
}
