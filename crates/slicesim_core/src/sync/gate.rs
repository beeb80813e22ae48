//! # Ready Gate
//!
//! Step-numbered handoff from one producer to many consumers. The producer opens
//! the gate for step `k` with a shared payload; consumers block until the gate is
//! open *for their step*, so a consumer can neither see a stale payload nor run
//! ahead into a step that has not been published yet.
//!
//! ```text
//!   Closed ──publish(k)──▶ Open(k) ──close(k)──▶ Closed ──publish(k+1)──▶ ...
//!      │                      │
//!      └──────── halt ────────┴──────▶ Halted (every waiter returns Err)
//! ```

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use super::Halted;

#[derive(Debug)]
enum GateState<T> {
    Closed,
    Open { step: usize, payload: Arc<T> },
    Halted,
}

/// Why [`ReadyGate::publish`] refused to open the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    /// The gate is still open for an earlier step.
    #[error("gate still open for step {0}")]
    StillOpen(usize),
    /// The gate was halted.
    #[error(transparent)]
    Halted(#[from] Halted),
}

/// Single-producer, multi-consumer gate carrying one payload per step.
#[derive(Debug)]
pub struct ReadyGate<T> {
    state: Mutex<GateState<T>>,
    opened: Condvar,
}

impl<T> Default for ReadyGate<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ReadyGate<T> {
    /// Creates a closed gate.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState::Closed),
            opened: Condvar::new(),
        }
    }

    /// Opens the gate for `step` and wakes every waiter.
    ///
    /// # Errors
    ///
    /// Fails if the gate is still open or has been halted.
    pub fn publish(&self, step: usize, payload: Arc<T>) -> Result<(), PublishError> {
        let mut state = self.state.lock();
        match &*state {
            GateState::Open { step: open, .. } => return Err(PublishError::StillOpen(*open)),
            GateState::Halted => return Err(PublishError::Halted(Halted)),
            GateState::Closed => {}
        }
        *state = GateState::Open { step, payload };
        self.opened.notify_all();
        Ok(())
    }

    /// Blocks until the gate is open for `step` and returns its payload.
    ///
    /// # Errors
    ///
    /// Returns [`Halted`] if the gate is halted before it opens for `step`.
    pub fn wait_open(&self, step: usize) -> Result<Arc<T>, Halted> {
        let mut state = self.state.lock();
        loop {
            match &*state {
                GateState::Open { step: open, payload } if *open == step => {
                    return Ok(Arc::clone(payload));
                }
                GateState::Halted => return Err(Halted),
                _ => {}
            }
            self.opened.wait(&mut state);
        }
    }

    /// Closes the gate after `step`, dropping the gate's copy of the payload.
    ///
    /// Returns false if the gate was not open for `step`.
    pub fn close(&self, step: usize) -> bool {
        let mut state = self.state.lock();
        let open_for_step = matches!(&*state, GateState::Open { step: open, .. } if *open == step);
        if open_for_step {
            *state = GateState::Closed;
        }
        open_for_step
    }

    /// Releases every current and future waiter with [`Halted`].
    pub fn halt(&self) {
        let mut state = self.state.lock();
        *state = GateState::Halted;
        self.opened.notify_all();
    }

    /// Returns true while the gate is open for any step.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(&*self.state.lock(), GateState::Open { .. })
    }
}
