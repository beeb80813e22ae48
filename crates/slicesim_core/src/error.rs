//! # Simulation Error Types
//!
//! All errors that can end a run. A run is all-or-nothing: none of these are
//! retried, they are reported to the caller and the pool is torn down.

use thiserror::Error;

/// Errors that can occur while configuring or running a simulation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// Degenerate or inconsistent run parameters, rejected before any thread starts.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The TOML run file could not be read or parsed.
    #[error("failed to load configuration: {0}")]
    ConfigParse(String),

    /// A particle binned outside `[0, slices)` under the `reject` policy.
    #[error("particle {index} at x = {x} falls outside slices 0..{slices}")]
    OutOfDomain {
        /// Store index of the particle.
        index: usize,
        /// Offending x coordinate.
        x: f64,
        /// Number of slices in the index.
        slices: usize,
    },

    /// A particle position is NaN or infinite and cannot be binned.
    #[error("particle {index} has a non-finite position")]
    NonFiniteParticle {
        /// Store index of the particle.
        index: usize,
    },

    /// A worker still held the spatial index when the next rebuild started.
    #[error("spatial index still shared with workers at step {step}")]
    IndexStillShared {
        /// Step whose rebuild was refused.
        step: usize,
    },

    /// The pool stopped before signalling completion of a step.
    #[error("worker pool stopped before completing step {step}")]
    StepSignalLost {
        /// Step that never completed.
        step: usize,
    },

    /// A worker thread panicked.
    #[error("worker {pid} panicked")]
    WorkerPanicked {
        /// Index of the failed worker.
        pid: usize,
    },

    /// Writing a snapshot or summary failed.
    #[error("snapshot output failed: {0}")]
    Snapshot(String),
}

impl From<std::io::Error> for SimError {
    fn from(err: std::io::Error) -> Self {
        Self::Snapshot(err.to_string())
    }
}

/// Result type for simulation operations.
pub type SimResult<T> = Result<T, SimError>;
