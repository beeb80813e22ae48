//! # SLICESIM Core
//!
//! Parallel, slice-decomposed step engine for short-range particle simulations.
//!
//! ## Design Principles
//!
//! 1. **Static partition** - each worker owns a contiguous slice range for the
//!    force phase and a contiguous particle range for the movement phase
//! 2. **Disjointness by construction** - the store is split with `split_at_mut`;
//!    there is no unsafe code
//! 3. **Blocking waits only** - every wait sits on a condition variable or a
//!    channel and re-checks its predicate
//! 4. **All-or-nothing runs** - any failure halts the pool and joins every thread
//!
//! ## Example
//!
//! ```rust,ignore
//! use slicesim_core::{ShortRange, SimConfig, Simulation};
//!
//! let config = SimConfig { particles: 2000, seed: Some(42), ..SimConfig::default() };
//! let mut sim = Simulation::new(config)?;
//! let law = ShortRange::new(sim.domain().size());
//! let report = sim.run(&law, None)?;
//! println!("avg step: {} us", report.timings.avg_step_us);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod particle;
pub mod partition;
pub mod physics;
pub mod snapshot;
pub mod spatial;
pub mod sync;

pub use config::SimConfig;
pub use domain::Domain;
pub use engine::{RunReport, Simulation, StepTimings};
pub use error::{SimError, SimResult};
pub use particle::{Particle, ParticleStore};
pub use partition::{WorkPartition, WorkerRange};
pub use physics::{ForceLaw, ShortRange};
pub use snapshot::{append_summary, SnapshotSink, TextSnapshot};
pub use spatial::{Binning, OutOfRange, SpatialIndex};
