//! # Step Engine
//!
//! The coordinator (the calling thread) and a fixed pool of `W` workers advance
//! the particle store one step at a time.
//!
//! ## Step Protocol
//!
//! ```text
//!   coordinator                        worker pid (x W)
//!   ───────────                        ────────────────
//!   rebuild index  (Building)
//!   publish(k) ─────────────────────▶  wait_open(k)
//!                                      forces for owned slices  (Computing)
//!                                      deposit into owning blocks
//!                                      Barrier-1
//!                                      pid 0: close(k)
//!                                      integrate owned block    (Moving)
//!                                      Barrier-2
//!   recv() ◀──────────── StepDone(k) ─ pid 0
//!   snapshot (optional)
//! ```
//!
//! The coordinator only rebuilds step `k + 1` once it has observed StepDone for
//! step `k`, and by then every worker and the gate have dropped their handle on
//! the index, so `Arc::get_mut` hands it back without copying.
//!
//! ## Failure
//!
//! A run is all-or-nothing. Any error or panic halts the gate and the barrier,
//! which releases every blocked worker; all threads are joined before
//! [`Simulation::run`] returns.

mod worker;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crossbeam_channel::Receiver;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, debug_span, error, info};

use crate::config::SimConfig;
use crate::domain::Domain;
use crate::error::{SimError, SimResult};
use crate::particle::{ParticleBlocks, ParticleStore};
use crate::partition::WorkPartition;
use crate::physics::{self, ForceLaw};
use crate::snapshot::SnapshotSink;
use crate::spatial::SpatialIndex;
use crate::sync::{PhaseBarrier, PublishError, ReadyGate};

use worker::{HaltOnPanic, Worker};

/// Wall-clock statistics over completed steps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepTimings {
    /// Fastest step, in microseconds.
    pub min_step_us: u64,
    /// Slowest step, in microseconds.
    pub max_step_us: u64,
    /// Mean step duration, in microseconds.
    pub avg_step_us: u64,
    /// Steps measured.
    pub total_steps: u64,
    total_us: u64,
}

impl StepTimings {
    /// Adds one step duration.
    pub fn record(&mut self, duration: Duration) {
        let us = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        self.min_step_us = if self.total_steps == 0 { us } else { self.min_step_us.min(us) };
        self.max_step_us = self.max_step_us.max(us);
        self.total_steps += 1;
        self.total_us = self.total_us.saturating_add(us);
        self.avg_step_us = self.total_us / self.total_steps;
    }
}

/// Outcome of a completed run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Steps completed.
    pub steps: usize,
    /// Snapshots handed to the sink.
    pub snapshots: usize,
    /// Particles clamped into the slice range, summed over all steps.
    pub clamped: usize,
    /// Largest slice occupancy seen in any step.
    pub max_occupancy: usize,
    /// Per-step wall-clock timings.
    pub timings: StepTimings,
    /// Wall-clock duration of the whole run.
    pub elapsed: Duration,
}

/// A particle store together with the geometry and partition it is run with.
#[derive(Debug)]
pub struct Simulation {
    config: SimConfig,
    domain: Domain,
    partition: WorkPartition,
    store: ParticleStore,
    index: Arc<SpatialIndex>,
}

impl Simulation {
    /// Validates `config` and initializes `config.particles` particles.
    ///
    /// Without a configured seed the seed is taken from the system clock.
    ///
    /// # Errors
    ///
    /// [`SimError::InvalidConfig`] for degenerate parameters.
    pub fn new(config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        let domain = config.domain()?;
        let seed = config.seed.unwrap_or_else(clock_seed);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let store = physics::init_particles(domain.particles(), domain.size(), &mut rng);
        info!(particles = domain.particles(), seed, "initialized particles");
        Self::assemble(config, domain, store)
    }

    /// Runs `config` on an existing store.
    ///
    /// # Errors
    ///
    /// [`SimError::InvalidConfig`] for degenerate parameters or a store whose
    /// length differs from `config.particles`.
    pub fn from_store(config: SimConfig, store: ParticleStore) -> SimResult<Self> {
        config.validate()?;
        if store.len() != config.particles {
            return Err(SimError::InvalidConfig(format!(
                "store holds {} particles, configuration expects {}",
                store.len(),
                config.particles
            )));
        }
        let domain = config.domain()?;
        Self::assemble(config, domain, store)
    }

    fn assemble(config: SimConfig, domain: Domain, store: ParticleStore) -> SimResult<Self> {
        let partition = WorkPartition::new(domain.slices(), domain.particles(), config.workers)?;
        let index = Arc::new(SpatialIndex::new(domain, config.binning, config.out_of_range));
        Ok(Self {
            config,
            domain,
            partition,
            store,
            index,
        })
    }

    /// Configuration of the run.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Geometry of the run.
    #[must_use]
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Static assignment of work to the pool.
    #[must_use]
    pub fn partition(&self) -> &WorkPartition {
        &self.partition
    }

    /// The particle store, as left by the last completed step.
    #[must_use]
    pub fn store(&self) -> &ParticleStore {
        &self.store
    }

    /// The index as built for the last step.
    #[must_use]
    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    /// Runs `config.steps` steps with a fresh pool of `config.workers` threads.
    ///
    /// If `sink` is given it receives the store after every `snapshot_every`-th
    /// step, on the calling thread.
    ///
    /// # Errors
    ///
    /// - binning errors from the index rebuild,
    /// - [`SimError::Snapshot`] from the sink,
    /// - [`SimError::WorkerPanicked`] if a worker thread panicked,
    /// - [`SimError::IndexStillShared`] / [`SimError::StepSignalLost`] if the
    ///   step protocol was violated.
    ///
    /// On error the store holds whatever the last completed phase left in it.
    pub fn run<F: ForceLaw>(&mut self, physics: &F, sink: Option<&mut dyn SnapshotSink>) -> SimResult<RunReport> {
        let steps = self.config.steps;
        let snapshot_every = self.config.snapshot_every;
        let partition = &self.partition;
        let blocks = ParticleBlocks::split(self.store.as_mut_slice(), partition)?;
        let gate = ReadyGate::new();
        let barrier = PhaseBarrier::new(partition.workers());
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);

        info!(
            particles = blocks.len(),
            slices = partition.slices(),
            workers = partition.workers(),
            steps,
            "starting run"
        );

        let started = Instant::now();
        let mut done_tx = Some(done_tx);
        let outcome = thread::scope(|scope| {
            let handles: Vec<_> = partition
                .ranges()
                .iter()
                .map(|range| {
                    let worker = Worker {
                        range,
                        partition,
                        blocks: &blocks,
                        gate: &gate,
                        barrier: &barrier,
                        physics,
                        steps,
                        done: if range.pid == 0 { done_tx.take() } else { None },
                    };
                    scope.spawn(move || worker.run())
                })
                .collect();

            let mut coordinator = Coordinator {
                blocks: &blocks,
                gate: &gate,
                barrier: &barrier,
                done: done_rx,
                index: &mut self.index,
                steps,
                snapshot_every,
            };
            let driven = coordinator.drive(sink);
            if let Err(err) = &driven {
                error!(%err, "run failed, halting workers");
                gate.halt();
                barrier.halt();
            }

            let mut panicked = None;
            for (pid, handle) in handles.into_iter().enumerate() {
                if handle.join().is_err() && panicked.is_none() {
                    panicked = Some(pid);
                }
            }
            match panicked {
                Some(pid) => Err(SimError::WorkerPanicked { pid }),
                None => driven,
            }
        });

        let mut report = outcome?;
        report.elapsed = started.elapsed();
        info!(
            steps = report.steps,
            snapshots = report.snapshots,
            clamped = report.clamped,
            avg_step_us = report.timings.avg_step_us,
            elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            "run complete"
        );
        Ok(report)
    }
}

/// The calling thread's side of the step protocol.
struct Coordinator<'r, 'a> {
    blocks: &'r ParticleBlocks<'a>,
    gate: &'r ReadyGate<SpatialIndex>,
    barrier: &'r PhaseBarrier,
    done: Receiver<usize>,
    index: &'r mut Arc<SpatialIndex>,
    steps: usize,
    snapshot_every: usize,
}

impl Coordinator<'_, '_> {
    fn drive(&mut self, mut sink: Option<&mut dyn SnapshotSink>) -> SimResult<RunReport> {
        let _halt = HaltOnPanic::new(self.gate, self.barrier);
        let mut report = RunReport::default();

        for step in 0..self.steps {
            let _span = debug_span!("step", step).entered();
            let started = Instant::now();

            let index = Arc::get_mut(self.index).ok_or(SimError::IndexStillShared { step })?;
            let stats = {
                let view = self.blocks.view();
                index.rebuild(view.iter())?
            };
            report.clamped += stats.clamped;
            report.max_occupancy = report.max_occupancy.max(stats.max_occupancy);

            self.gate
                .publish(step, Arc::clone(self.index))
                .map_err(|err| match err {
                    PublishError::StillOpen(_) => SimError::IndexStillShared { step },
                    PublishError::Halted(_) => SimError::StepSignalLost { step },
                })?;

            match self.done.recv() {
                Ok(done) if done == step => {}
                _ => return Err(SimError::StepSignalLost { step }),
            }

            if step % self.snapshot_every == 0 {
                if let Some(sink) = sink.as_deref_mut() {
                    sink.save(step, &self.blocks.view())?;
                    report.snapshots += 1;
                }
            }

            report.timings.record(started.elapsed());
            report.steps += 1;
            debug!(clamped = stats.clamped, max_occupancy = stats.max_occupancy, "step done");
        }

        Ok(report)
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            #[allow(clippy::cast_possible_truncation)]
            let nanos = elapsed.as_nanos() as u64;
            nanos
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_timings() {
        let mut timings = StepTimings::default();
        timings.record(Duration::from_micros(30));
        timings.record(Duration::from_micros(10));
        timings.record(Duration::from_micros(20));
        assert_eq!(timings.min_step_us, 10);
        assert_eq!(timings.max_step_us, 30);
        assert_eq!(timings.avg_step_us, 20);
        assert_eq!(timings.total_steps, 3);
    }

    #[test]
    fn test_from_store_rejects_length_mismatch() {
        let config = SimConfig {
            particles: 10,
            ..SimConfig::default()
        };
        let store = ParticleStore::from_particles(vec![crate::Particle::at(0.0, 0.0); 9]);
        assert!(matches!(
            Simulation::from_store(config, store),
            Err(SimError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_new_is_deterministic_with_seed() {
        let config = SimConfig {
            particles: 64,
            seed: Some(17),
            ..SimConfig::default()
        };
        let a = Simulation::new(config.clone()).unwrap();
        let b = Simulation::new(config).unwrap();
        assert_eq!(a.store(), b.store());
        assert_eq!(a.domain().slices(), 6);
        assert_eq!(a.partition().workers(), 4);
    }

    #[test]
    fn test_index_reflects_last_step() {
        let config = SimConfig {
            particles: 40,
            steps: 3,
            seed: Some(1),
            ..SimConfig::default()
        };
        let mut sim = Simulation::new(config).unwrap();
        let law = physics::ShortRange::new(sim.domain().size());
        let report = sim.run(&law, None).unwrap();
        assert_eq!(report.steps, 3);
        assert_eq!(report.snapshots, 0);
        assert_eq!(report.timings.total_steps, 3);
        assert_eq!(sim.index().entry_count(), 40);
    }
}
