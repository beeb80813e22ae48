//! # Synchronization Primitives for the Worker Pool
//!
//! Two blocking primitives order the phases of a step:
//!
//! ```text
//!   coordinator ──publish(k)──▶ [ReadyGate] ──▶ W workers compute forces
//!                                                   │
//!                                             [PhaseBarrier]  (Barrier-1)
//!                                                   │
//!                                              workers move
//!                                                   │
//!                                             [PhaseBarrier]  (Barrier-2)
//!                                                   │
//!   coordinator ◀────────── StepDone(k) ───────── worker 0
//! ```
//!
//! Every wait loops on its predicate; nothing is polled. Both primitives can be
//! halted, which turns every pending and future wait into [`Halted`].

mod barrier;
mod gate;

pub use barrier::{BarrierWait, PhaseBarrier};
pub use gate::{PublishError, ReadyGate};

/// A wait was abandoned because the primitive was halted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("synchronization halted")]
pub struct Halted;
