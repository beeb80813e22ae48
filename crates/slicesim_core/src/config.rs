//! # Run Configuration
//!
//! Every tunable of a run, loaded once from TOML before any thread exists.
//!
//! ```toml
//! particles = 2000
//! steps = 500
//! workers = 8
//! seed = 42
//! binning = "legacy"
//! out_of_range = "reject"
//! snapshot_every = 10
//! ```
//!
//! Missing keys take their defaults; unknown keys are an error.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::error::{SimError, SimResult};
use crate::physics::{DENSITY, NSTEPS};
use crate::spatial::{Binning, OutOfRange};

/// Default size of the worker pool.
pub const DEFAULT_WORKERS: usize = 4;

/// Default particle count.
pub const DEFAULT_PARTICLES: usize = 1000;

/// Parameters of one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    /// Number of particles `n`.
    pub particles: usize,
    /// Number of steps to simulate.
    pub steps: usize,
    /// Number of worker threads `W`.
    pub workers: usize,
    /// Slice count override; derived from `particles` when absent.
    pub slices: Option<usize>,
    /// Seed for particle initialization; taken from the clock when absent.
    pub seed: Option<u64>,
    /// Slice assignment formula.
    pub binning: Binning,
    /// Policy for particles that bin outside the slice range.
    pub out_of_range: OutOfRange,
    /// Snapshot every k-th step when a sink is attached.
    pub snapshot_every: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            particles: DEFAULT_PARTICLES,
            steps: NSTEPS,
            workers: DEFAULT_WORKERS,
            slices: None,
            seed: None,
            binning: Binning::default(),
            out_of_range: OutOfRange::default(),
            snapshot_every: 1,
        }
    }
}

impl SimConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// [`SimError::ConfigParse`] for malformed TOML or unknown keys. The result
    /// is not validated.
    pub fn from_toml_str(text: &str) -> SimResult<Self> {
        toml::from_str(text).map_err(|e| SimError::ConfigParse(e.to_string()))
    }

    /// Reads and parses the TOML file at `path`.
    ///
    /// # Errors
    ///
    /// [`SimError::ConfigParse`] if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> SimResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SimError::ConfigParse(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Rejects degenerate parameters.
    ///
    /// # Errors
    ///
    /// [`SimError::InvalidConfig`] naming the first offending key.
    pub fn validate(&self) -> SimResult<()> {
        let checks = [
            ("particles", self.particles),
            ("steps", self.steps),
            ("workers", self.workers),
            ("snapshot_every", self.snapshot_every),
            ("slices", self.slices.unwrap_or(1)),
        ];
        match checks.iter().find(|(_, value)| *value == 0) {
            Some((key, _)) => Err(SimError::InvalidConfig(format!("{key} must be > 0"))),
            None => Ok(()),
        }
    }

    /// Geometry implied by the particle count and the optional slice override.
    ///
    /// # Errors
    ///
    /// [`SimError::InvalidConfig`] for zero particles or slices.
    pub fn domain(&self) -> SimResult<Domain> {
        match self.slices {
            None => Domain::for_particles(self.particles),
            Some(slices) => {
                #[allow(clippy::cast_precision_loss)]
                let size = (DENSITY * self.particles as f64).sqrt();
                Domain::with_slices(self.particles, slices, size)
            }
        }
    }
}
