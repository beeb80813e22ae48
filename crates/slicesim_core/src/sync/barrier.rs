//! # Phase Barrier
//!
//! Reusable rendezvous for a fixed number of parties. The last arrival resets the
//! counter, bumps the generation and wakes everyone. Waiters sleep until the
//! generation they arrived in has ended, so a spurious wakeup just loops and a
//! fast party can never release itself from the next round early.

use parking_lot::{Condvar, Mutex};

use super::Halted;

#[derive(Debug)]
struct BarrierState {
    arrived: usize,
    generation: u64,
    halted: bool,
}

/// Outcome of one successful [`PhaseBarrier::wait`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BarrierWait {
    /// True for exactly one party per generation: the last to arrive.
    pub leader: bool,
    /// Generation that was just completed.
    pub generation: u64,
}

/// Counting barrier for exactly `parties` participants.
#[derive(Debug)]
pub struct PhaseBarrier {
    parties: usize,
    state: Mutex<BarrierState>,
    released: Condvar,
}

impl PhaseBarrier {
    /// Creates a barrier for `parties` participants.
    ///
    /// # Panics
    ///
    /// Panics if `parties` is zero.
    #[must_use]
    pub fn new(parties: usize) -> Self {
        assert!(parties > 0, "a barrier needs at least one party");
        Self {
            parties,
            state: Mutex::new(BarrierState {
                arrived: 0,
                generation: 0,
                halted: false,
            }),
            released: Condvar::new(),
        }
    }

    /// Blocks until all parties of the current generation have arrived.
    ///
    /// # Errors
    ///
    /// Returns [`Halted`] if the barrier was halted before or while waiting.
    pub fn wait(&self) -> Result<BarrierWait, Halted> {
        let mut state = self.state.lock();
        if state.halted {
            return Err(Halted);
        }

        let generation = state.generation;
        state.arrived += 1;
        if state.arrived == self.parties {
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            self.released.notify_all();
            return Ok(BarrierWait { leader: true, generation });
        }

        while state.generation == generation && !state.halted {
            self.released.wait(&mut state);
        }
        if state.generation == generation {
            // Halted before this round completed.
            return Err(Halted);
        }
        Ok(BarrierWait { leader: false, generation })
    }

    /// Releases every current and future waiter with [`Halted`].
    pub fn halt(&self) {
        let mut state = self.state.lock();
        state.halted = true;
        self.released.notify_all();
    }

    /// Returns true once [`PhaseBarrier::halt`] has been called.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.state.lock().halted
    }
}
