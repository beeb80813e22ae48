//! # Slice Binning
//!
//! Maps an x coordinate to a slice index.
//!
//! Two formulas exist:
//!
//! - [`Binning::Natural`]: `floor(x * S / size)`, one slice per `size / S` band.
//! - [`Binning::Legacy`]: `floor(x * floor(S / size))`. The scale is floored
//!   before multiplying, so unless `S / size` is integral the bands are wider
//!   than `size / S` and the upper slices receive fewer (or no) particles.
//!   Kept for bit-for-bit compatibility with existing trajectories.

use serde::{Deserialize, Serialize};

use crate::domain::Domain;

/// Slice assignment formula.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Binning {
    /// `floor(x * S / size)`.
    #[default]
    Natural,
    /// `floor(x * floor(S / size))`.
    Legacy,
}

impl Binning {
    /// Multiplier applied to x before flooring.
    #[inline]
    #[must_use]
    pub fn scale(self, domain: &Domain) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let ratio = domain.slices() as f64 / domain.size();
        match self {
            Self::Natural => ratio,
            Self::Legacy => ratio.floor(),
        }
    }

    /// Places a coordinate given a precomputed `scale`.
    ///
    /// The result is classified against `0..slices`; nothing here can index out
    /// of bounds.
    #[inline]
    #[must_use]
    pub fn place(x: f64, scale: f64, slices: usize) -> Placement {
        if !x.is_finite() {
            return Placement::NonFinite;
        }
        let raw = (x * scale).floor();
        #[allow(clippy::cast_precision_loss)]
        let upper = slices as f64;
        if raw < 0.0 {
            Placement::Below
        } else if raw >= upper {
            Placement::Above
        } else {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let slice = raw as usize;
            Placement::Inside(slice)
        }
    }
}

/// What to do with a particle whose slice falls outside `0..S`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutOfRange {
    /// Clamp into `0..S` and count the event.
    #[default]
    Clamp,
    /// Fail the rebuild.
    Reject,
}

/// Classification of one coordinate against the slice range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// A valid slice index.
    Inside(usize),
    /// The raw index was negative.
    Below,
    /// The raw index was `S` or more.
    Above,
    /// The coordinate is NaN or infinite.
    NonFinite,
}
