//! # Worker Loop
//!
//! One long-lived thread per [`WorkerRange`]. Per step:
//!
//! 1. wait for the gate to open for this step;
//! 2. compute accelerations for every particle in the owned slices, reading
//!    only the frozen copies inside the index;
//! 3. release the index and deposit results into the owning blocks;
//! 4. Barrier-1, after which worker 0 closes the gate;
//! 5. integrate the owned particle block;
//! 6. Barrier-2, after which worker 0 sends StepDone.

use std::thread;

use crossbeam_channel::Sender;
use tracing::{debug, warn};

use crate::particle::{ForceSample, ParticleBlocks};
use crate::partition::{WorkPartition, WorkerRange};
use crate::physics::ForceLaw;
use crate::spatial::SpatialIndex;
use crate::sync::{Halted, PhaseBarrier, ReadyGate};

/// Halts the step primitives if the owning thread unwinds, so nobody else
/// blocks on a party that will never arrive.
pub(super) struct HaltOnPanic<'r> {
    gate: &'r ReadyGate<SpatialIndex>,
    barrier: &'r PhaseBarrier,
}

impl<'r> HaltOnPanic<'r> {
    pub(super) fn new(gate: &'r ReadyGate<SpatialIndex>, barrier: &'r PhaseBarrier) -> Self {
        Self { gate, barrier }
    }
}

impl Drop for HaltOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            warn!("thread panicked during a step, halting the pool");
            self.gate.halt();
            self.barrier.halt();
        }
    }
}

/// Everything a worker borrows for the duration of the run.
pub(super) struct Worker<'r, 'a, F> {
    pub(super) range: &'r WorkerRange,
    pub(super) partition: &'r WorkPartition,
    pub(super) blocks: &'r ParticleBlocks<'a>,
    pub(super) gate: &'r ReadyGate<SpatialIndex>,
    pub(super) barrier: &'r PhaseBarrier,
    pub(super) physics: &'r F,
    pub(super) steps: usize,
    /// StepDone sender, held by worker 0 only.
    pub(super) done: Option<Sender<usize>>,
}

impl<F: ForceLaw> Worker<'_, '_, F> {
    /// Runs every step, returning early if the pool is halted.
    pub(super) fn run(self) {
        let _halt = HaltOnPanic::new(self.gate, self.barrier);
        let pid = self.range.pid;

        // One outgoing buffer per destination block, reused across steps.
        let mut outbox: Vec<Vec<ForceSample>> = vec![Vec::new(); self.blocks.block_count()];

        for step in 0..self.steps {
            if let Err(Halted) = self.step(step, &mut outbox) {
                debug!(pid, step, "worker released by halt");
                return;
            }
        }
        debug!(pid, steps = self.steps, "worker finished");
    }

    fn step(&self, step: usize, outbox: &mut [Vec<ForceSample>]) -> Result<(), Halted> {
        let index = self.gate.wait_open(step)?;
        self.compute_forces(&index, outbox);
        drop(index);

        for (block, samples) in outbox.iter_mut().enumerate() {
            self.blocks.deposit(block, samples);
            samples.clear();
        }

        self.barrier.wait()?;
        if self.range.pid == 0 {
            self.gate.close(step);
        }

        {
            let mut block = self.blocks.lock(self.range.pid);
            for particle in block.iter_mut() {
                self.physics.integrate(particle);
            }
        }

        self.barrier.wait()?;
        if let Some(done) = &self.done {
            done.send(step).map_err(|_| Halted)?;
        }
        Ok(())
    }

    fn compute_forces(&self, index: &SpatialIndex, outbox: &mut [Vec<ForceSample>]) {
        for slice in self.range.slices.clone() {
            for entry in index.slice(slice).iter() {
                let mut target = entry.particle;
                target.ax = 0.0;
                target.ay = 0.0;
                for source in index.neighborhood(slice) {
                    if source.index != entry.index {
                        self.physics.apply_force(&mut target, &source.particle);
                    }
                }

                let owner = self.partition.particle_owner(entry.index);
                outbox[owner].push(ForceSample {
                    index: entry.index,
                    ax: target.ax,
                    ay: target.ay,
                });
            }
        }
    }
}
