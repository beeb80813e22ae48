//! # Particle Store
//!
//! The flat particle array owned for the lifetime of a run, and its split into
//! disjoint per-worker blocks while the pool is running.

mod blocks;

pub use blocks::{ForceSample, ParticleBlocks, StoreView};

use std::ops::Index;

/// One point particle. All fields are double precision.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Particle {
    /// Position along the slicing axis.
    pub x: f64,
    /// Position along the second axis.
    pub y: f64,
    /// Velocity along x.
    pub vx: f64,
    /// Velocity along y.
    pub vy: f64,
    /// Acceleration along x accumulated by the force phase.
    pub ax: f64,
    /// Acceleration along y accumulated by the force phase.
    pub ay: f64,
}

impl Particle {
    /// Creates a particle at rest.
    #[inline]
    #[must_use]
    pub const fn at(x: f64, y: f64) -> Self {
        Self { x, y, vx: 0.0, vy: 0.0, ax: 0.0, ay: 0.0 }
    }

    /// Creates a particle with an initial velocity and no acceleration.
    #[inline]
    #[must_use]
    pub const fn moving(x: f64, y: f64, vx: f64, vy: f64) -> Self {
        Self { x, y, vx, vy, ax: 0.0, ay: 0.0 }
    }

    /// Returns true when both coordinates are finite.
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Contiguous collection of every particle in the run.
///
/// The length is fixed at construction; the engine never grows or reallocates it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParticleStore {
    particles: Vec<Particle>,
}

impl ParticleStore {
    /// Takes ownership of an initialized particle array.
    #[must_use]
    pub fn from_particles(particles: Vec<Particle>) -> Self {
        Self { particles }
    }

    /// Number of particles.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// Returns true when the store holds no particles.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Read access to the whole array.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    /// Write access to the whole array, used to split it into worker blocks.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// Iterates particles in store order.
    pub fn iter(&self) -> std::slice::Iter<'_, Particle> {
        self.particles.iter()
    }

    /// Consumes the store and returns the particle array.
    #[must_use]
    pub fn into_particles(self) -> Vec<Particle> {
        self.particles
    }
}

impl Index<usize> for ParticleStore {
    type Output = Particle;

    fn index(&self, index: usize) -> &Particle {
        &self.particles[index]
    }
}

impl<'a> IntoIterator for &'a ParticleStore {
    type Item = &'a Particle;
    type IntoIter = std::slice::Iter<'a, Particle>;

    fn into_iter(self) -> Self::IntoIter {
        self.particles.iter()
    }
}
