//! # Worker Blocks
//!
//! While the pool runs, the store is split with `split_at_mut` into one block per
//! worker, following the particle ranges of the [`WorkPartition`]. Disjointness is
//! therefore a property of the borrow, not of convention.
//!
//! Each block sits behind its own mutex. The protocol decides who may touch a
//! block at any moment, so the locks are never contended for long:
//!
//! ```text
//!   Building   coordinator locks every block (read, build index)
//!   Computing  workers lock foreign blocks briefly to deposit accelerations
//!   Moving     each worker locks only its own block
//!   StepDone   coordinator locks every block (optional snapshot)
//! ```

use parking_lot::{Mutex, MutexGuard};

use super::Particle;
use crate::error::{SimError, SimResult};
use crate::partition::WorkPartition;

/// Acceleration computed for one particle during the force phase.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceSample {
    /// Store index of the particle.
    pub index: usize,
    /// Accumulated acceleration along x.
    pub ax: f64,
    /// Accumulated acceleration along y.
    pub ay: f64,
}

/// The particle store split into per-worker mutable blocks.
pub struct ParticleBlocks<'a> {
    blocks: Vec<Mutex<&'a mut [Particle]>>,
    starts: Vec<usize>,
    len: usize,
}

impl<'a> ParticleBlocks<'a> {
    /// Splits `particles` along the particle ranges of `partition`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] if the partition was built for a
    /// different particle count.
    pub fn split(particles: &'a mut [Particle], partition: &WorkPartition) -> SimResult<Self> {
        if particles.len() != partition.particles() {
            return Err(SimError::InvalidConfig(format!(
                "partition covers {} particles but the store holds {}",
                partition.particles(),
                particles.len()
            )));
        }

        let len = particles.len();
        let mut blocks = Vec::with_capacity(partition.workers());
        let mut starts = Vec::with_capacity(partition.workers());
        let mut rest = particles;
        for range in partition.ranges() {
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(range.particles.len());
            starts.push(range.particles.start);
            blocks.push(Mutex::new(head));
            rest = tail;
        }
        debug_assert!(rest.is_empty());

        Ok(Self { blocks, starts, len })
    }

    /// Number of blocks (one per worker).
    #[inline]
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Total number of particles across all blocks.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true when there are no particles.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store index of the first particle in `block`.
    #[inline]
    #[must_use]
    pub fn block_start(&self, block: usize) -> usize {
        self.starts[block]
    }

    /// Takes exclusive access to one block.
    pub fn lock(&self, block: usize) -> MutexGuard<'_, &'a mut [Particle]> {
        self.blocks[block].lock()
    }

    /// Writes force results into `block`.
    ///
    /// Every sample must belong to the block; the caller routes samples by owner.
    pub fn deposit(&self, block: usize, samples: &[ForceSample]) {
        if samples.is_empty() {
            return;
        }
        let start = self.starts[block];
        let mut guard = self.blocks[block].lock();
        for sample in samples {
            debug_assert!(
                (start..start + guard.len()).contains(&sample.index),
                "sample for particle {} routed to block {block}",
                sample.index
            );
            let particle = &mut guard[sample.index - start];
            particle.ax = sample.ax;
            particle.ay = sample.ay;
        }
    }

    /// Locks every block in order and returns a read view of the whole store.
    #[must_use]
    pub fn view(&self) -> StoreView<'_, 'a> {
        StoreView {
            guards: self.blocks.iter().map(|block| block.lock()).collect(),
            len: self.len,
        }
    }
}

/// Read view of the whole store, in store order, holding every block lock.
pub struct StoreView<'g, 'a> {
    guards: Vec<MutexGuard<'g, &'a mut [Particle]>>,
    len: usize,
}

impl StoreView<'_, '_> {
    /// Number of particles.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true when the view is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates all particles in store order.
    pub fn iter(&self) -> Box<dyn Iterator<Item = &Particle> + '_> {
        Box::new(self.guards.iter().flat_map(|block| block.iter()))
    }
}
