//! # Short-Range Physics
//!
//! The repulsive short-range model driven by the step engine. The engine only
//! depends on the [`ForceLaw`] trait; [`ShortRange`] is the model the driver runs.
//!
//! ## Units
//!
//! Density, mass, cutoff and time step are fixed for every run. The domain side
//! follows from the particle count so that density stays constant.

use rand::Rng;

use crate::particle::{Particle, ParticleStore};

/// Particles per unit area.
pub const DENSITY: f64 = 0.0005;
/// Mass of every particle.
pub const MASS: f64 = 0.01;
/// Interaction radius. Pairs further apart exert no force.
pub const CUTOFF: f64 = 0.01;
/// Distance floor used when two particles (nearly) coincide.
pub const MIN_R: f64 = CUTOFF / 100.0;
/// Integration time step.
pub const DT: f64 = 0.0005;
/// Default number of steps per run.
pub const NSTEPS: usize = 1000;

/// Pairwise force plus per-particle integration, as seen by a worker.
///
/// Implementations are shared by reference across every worker thread, so they
/// must not carry per-call mutable state.
pub trait ForceLaw: Sync {
    /// Adds the acceleration `source` exerts on `target`.
    fn apply_force(&self, target: &mut Particle, source: &Particle);

    /// Advances one particle by one time step.
    fn integrate(&self, particle: &mut Particle);
}

/// The default repulsive model in a square box of side `size`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShortRange {
    size: f64,
}

impl ShortRange {
    /// Creates the model for a box of side `size`.
    #[must_use]
    pub const fn new(size: f64) -> Self {
        Self { size }
    }
}

impl ForceLaw for ShortRange {
    #[inline]
    fn apply_force(&self, target: &mut Particle, source: &Particle) {
        let dx = source.x - target.x;
        let dy = source.y - target.y;
        let mut r2 = dx * dx + dy * dy;
        if r2 > CUTOFF * CUTOFF {
            return;
        }
        r2 = r2.max(MIN_R * MIN_R);
        let r = r2.sqrt();

        let coef = (1.0 - CUTOFF / r) / r2 / MASS;
        target.ax += coef * dx;
        target.ay += coef * dy;
    }

    #[inline]
    fn integrate(&self, particle: &mut Particle) {
        integrate(particle, self.size);
    }
}

/// Semi-implicit Euler update followed by reflection off the walls at `0`
/// and `size`.
///
/// A coordinate that is already non-finite is left alone; the next index
/// rebuild reports it.
#[inline]
pub fn integrate(particle: &mut Particle, size: f64) {
    particle.vx += particle.ax * DT;
    particle.vy += particle.ay * DT;
    particle.x += particle.vx * DT;
    particle.y += particle.vy * DT;

    reflect(&mut particle.x, &mut particle.vx, size);
    reflect(&mut particle.y, &mut particle.vy, size);
}

/// Folds `pos` back into `[0, size]` in one step, however far outside it is.
///
/// Crossing `k` walls mirrors the coordinate `k` times; the velocity flips only
/// when `k` is odd.
#[inline]
fn reflect(pos: &mut f64, vel: &mut f64, size: f64) {
    if !pos.is_finite() || (0.0..=size).contains(&*pos) {
        return;
    }
    let crossings = (*pos / size).floor();
    let folded = pos.rem_euclid(2.0 * size);
    *pos = if folded > size { 2.0 * size - folded } else { folded };
    if crossings.rem_euclid(2.0) > 0.5 {
        *vel = -*vel;
    }
}

/// Lays `n` particles on a regular grid inside `[0, size)²`, visited in a
/// random order, with velocities uniform in `[-1, 1)`.
///
/// The store order is a random permutation of the grid, so neighboring store
/// indices are not spatial neighbors.
pub fn init_particles<R: Rng + ?Sized>(n: usize, size: f64, rng: &mut R) -> ParticleStore {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let sx = (n as f64).sqrt().ceil() as usize;
    let sx = sx.max(1);
    let sy = (n + sx - 1) / sx;

    let mut cells: Vec<usize> = (0..n).collect();
    let mut particles = Vec::with_capacity(n);
    for i in 0..n {
        // Draw without replacement from the cells not yet used.
        let remaining = n - i;
        let j = rng.gen_range(0..remaining);
        let k = cells[j];
        cells[j] = cells[remaining - 1];

        #[allow(clippy::cast_precision_loss)]
        let (col, row, sx_f, sy_f) = ((k % sx) as f64, (k / sx) as f64, sx as f64, sy as f64);
        let x = size * (1.0 + col) / (1.0 + sx_f);
        let y = size * (1.0 + row) / (1.0 + sy_f);
        let vx = rng.gen::<f64>() * 2.0 - 1.0;
        let vy = rng.gen::<f64>() * 2.0 - 1.0;
        particles.push(Particle::moving(x, y, vx, vy));
    }

    ParticleStore::from_particles(particles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_force_beyond_cutoff_is_noop() {
        let law = ShortRange::new(1.0);
        let mut target = Particle::at(0.5, 0.5);
        law.apply_force(&mut target, &Particle::at(0.5 + 2.0 * CUTOFF, 0.5));
        assert_eq!(target.ax, 0.0);
        assert_eq!(target.ay, 0.0);
    }

    #[test]
    fn test_close_pair_repels() {
        let law = ShortRange::new(1.0);
        let mut target = Particle::at(0.5, 0.5);
        law.apply_force(&mut target, &Particle::at(0.5 + CUTOFF / 2.0, 0.5));
        assert!(target.ax < 0.0, "target should be pushed away from the source");
        assert_eq!(target.ay, 0.0);
    }

    #[test]
    fn test_coincident_particles_stay_finite() {
        let law = ShortRange::new(1.0);
        let mut target = Particle::at(0.5, 0.5);
        law.apply_force(&mut target, &Particle::at(0.5, 0.5));
        assert!(target.ax.is_finite() && target.ay.is_finite());
    }

    #[test]
    fn test_integrate_reflects_off_walls() {
        let size = 0.1;
        let mut low = Particle::moving(0.0, 0.05, -1.0, 0.0);
        integrate(&mut low, size);
        assert!(low.x >= 0.0 && low.x <= size);
        assert!(low.vx > 0.0);

        let mut high = Particle::moving(0.05, size, 0.0, 1.0);
        integrate(&mut high, size);
        assert!(high.y >= 0.0 && high.y <= size);
        assert!(high.vy < 0.0);
    }

    #[test]
    fn test_integrate_far_outside_returns_inside() {
        let size = 0.1;
        let mut fast = Particle::moving(0.05, 0.05, 1e20, 0.0);
        integrate(&mut fast, size);
        assert!(fast.x >= 0.0 && fast.x <= size, "x = {}", fast.x);

        let mut fast_low = Particle::moving(0.05, 0.05, 0.0, -1e20);
        integrate(&mut fast_low, size);
        assert!(fast_low.y >= 0.0 && fast_low.y <= size, "y = {}", fast_low.y);
    }

    #[test]
    fn test_reflection_parity() {
        let size = 1.0;
        // Two walls crossed: back inside, moving the same way.
        let (mut pos, mut vel) = (2.25, 1.0);
        reflect(&mut pos, &mut vel, size);
        assert!((pos - 0.25).abs() < 1e-12);
        assert_eq!(vel, 1.0);

        // One wall crossed on each side.
        let (mut pos, mut vel) = (1.25, 1.0);
        reflect(&mut pos, &mut vel, size);
        assert!((pos - 0.75).abs() < 1e-12);
        assert_eq!(vel, -1.0);

        let (mut pos, mut vel) = (-0.25, -1.0);
        reflect(&mut pos, &mut vel, size);
        assert!((pos - 0.25).abs() < 1e-12);
        assert_eq!(vel, 1.0);
    }

    #[test]
    fn test_integrate_at_rest_is_stationary() {
        let mut p = Particle::at(0.03, 0.07);
        integrate(&mut p, 0.1);
        assert_eq!(p, Particle::at(0.03, 0.07));
    }

    #[test]
    fn test_integrate_leaves_non_finite_alone() {
        let mut p = Particle::moving(f64::INFINITY, 0.05, 1.0, 0.0);
        integrate(&mut p, 0.1);
        assert!(!p.is_finite());
    }

    #[test]
    fn test_init_particles_in_domain_and_distinct() {
        let size = (DENSITY * 97.0_f64).sqrt();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let store = init_particles(97, size, &mut rng);
        assert_eq!(store.len(), 97);

        let mut cells: Vec<(u64, u64)> = store.iter().map(|p| (p.x.to_bits(), p.y.to_bits())).collect();
        cells.sort_unstable();
        cells.dedup();
        assert_eq!(cells.len(), 97, "every particle gets its own grid cell");

        for p in &store {
            assert!(p.x > 0.0 && p.x < size);
            assert!(p.y > 0.0 && p.y < size);
            assert!((-1.0..1.0).contains(&p.vx));
            assert!((-1.0..1.0).contains(&p.vy));
        }
    }

    #[test]
    fn test_init_particles_is_deterministic() {
        let a = init_particles(50, 0.2, &mut ChaCha8Rng::seed_from_u64(11));
        let b = init_particles(50, 0.2, &mut ChaCha8Rng::seed_from_u64(11));
        let c = init_particles(50, 0.2, &mut ChaCha8Rng::seed_from_u64(12));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_init_particles_is_shuffled() {
        let store = init_particles(100, 1.0, &mut ChaCha8Rng::seed_from_u64(5));
        let sorted = store
            .as_slice()
            .windows(2)
            .all(|w| (w[0].y, w[0].x) <= (w[1].y, w[1].x));
        assert!(!sorted);
    }
}
