//! Spatial refine/coarsen operators, time interpolation and particle
//! splitting.
//!
//! Operators work in AMR index space and return stencils: the indices on
//! the other level and the weights to combine them with.

use std::fmt;

use hamr_core::{Centering, Particle};
use smallvec::{smallvec, SmallVec};

use crate::{HierarchyError, REFINEMENT_RATIO};

/// Indices on the source level and their weights.
pub type Stencil = SmallVec<[(i32, f64); 3]>;

/// Interpolates fine values from a coarser level.
pub trait RefineOperator: fmt::Debug + Send + Sync {
    /// Operator name, for logs.
    fn name(&self) -> &'static str;

    /// Coarse stencil of the fine index `fine`.
    fn stencil(&self, centering: Centering, fine: i32) -> Stencil;
}

/// Restricts fine values onto a coarser level.
pub trait CoarsenOperator: fmt::Debug + Send + Sync {
    /// Operator name, for logs.
    fn name(&self) -> &'static str;

    /// Fine stencil of the coarse index `coarse`.
    fn stencil(&self, centering: Centering, coarse: i32) -> Stencil;
}

/// Interpolates a value between two time snapshots.
pub trait TimeInterpolateOperator: fmt::Debug + Send + Sync {
    /// Value at `t` given `old` at `t_old` and `current` at `t_current`.
    fn interpolate(&self, old: f64, current: f64, t_old: f64, t_current: f64, t: f64) -> f64;
}

/// Linear interpolation between the two nearest coarse points of the same
/// centering. Reproduces affine functions exactly.
#[derive(Clone, Copy, Debug, Default)]
pub struct FieldLinearRefine;

impl RefineOperator for FieldLinearRefine {
    fn name(&self) -> &'static str {
        "field_linear_refine"
    }

    fn stencil(&self, centering: Centering, fine: i32) -> Stencil {
        let r = REFINEMENT_RATIO;
        // position of the fine point in coarse units is num / den
        let (num, den) = match centering {
            Centering::Primal => (fine, r),
            Centering::Dual => (2 * fine + 1 - r, 2 * r),
        };
        let coarse = num.div_euclid(den);
        let rem = num.rem_euclid(den);
        if rem == 0 {
            smallvec![(coarse, 1.0)]
        } else {
            let frac = rem as f64 / den as f64;
            smallvec![(coarse, 1.0 - frac), (coarse + 1, frac)]
        }
    }
}

/// Restriction by weighted average of the fine points covering a coarse
/// point: 1/4, 1/2, 1/4 on nodes, 1/2, 1/2 on cells.
#[derive(Clone, Copy, Debug, Default)]
pub struct FieldCoarsen;

impl CoarsenOperator for FieldCoarsen {
    fn name(&self) -> &'static str {
        "field_coarsen"
    }

    fn stencil(&self, centering: Centering, coarse: i32) -> Stencil {
        let fine = coarse * REFINEMENT_RATIO;
        match centering {
            Centering::Primal => smallvec![(fine - 1, 0.25), (fine, 0.5), (fine + 1, 0.25)],
            Centering::Dual => smallvec![(fine, 0.5), (fine + 1, 0.5)],
        }
    }
}

/// `value(t) = α·old + (1−α)·current` with
/// `α = (t_current − t)/(t_current − t_old)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FieldLinearTimeInterpolate;

impl FieldLinearTimeInterpolate {
    /// Weight of the old snapshot at `t`. Zero when both snapshots share a
    /// time.
    pub fn alpha(t_old: f64, t_current: f64, t: f64) -> f64 {
        let span = t_current - t_old;
        if span == 0.0 {
            0.0
        } else {
            (t_current - t) / span
        }
    }
}

impl TimeInterpolateOperator for FieldLinearTimeInterpolate {
    fn interpolate(&self, old: f64, current: f64, t_old: f64, t_current: f64, t: f64) -> f64 {
        let alpha = Self::alpha(t_old, t_current, t);
        alpha * old + (1.0 - alpha) * current
    }
}

/// Splits a coarse particle into fine particles.
///
/// Children keep the parent's charge and velocity; their positions are
/// spread symmetrically around the parent and their weights are density
/// normalized on the fine level, so the total content `Σ w·dx` is
/// conserved.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleSplit {
    nbr_refined: usize,
}

impl ParticleSplit {
    /// Split into two children at ±0.551569 fine cells.
    pub const DELTA_2: f64 = 0.551569;

    /// Split operator producing `nbr_refined` children (2 or 3).
    pub fn new(nbr_refined: usize) -> Result<Self, HierarchyError> {
        match nbr_refined {
            2 | 3 => Ok(Self { nbr_refined }),
            _ => Err(HierarchyError::UnsupportedSplit { nbr_refined }),
        }
    }

    /// Number of children per particle.
    pub fn nbr_refined(&self) -> usize {
        self.nbr_refined
    }

    fn pattern(&self) -> &'static [(f64, f64)] {
        match self.nbr_refined {
            2 => &[(-Self::DELTA_2, 0.5), (Self::DELTA_2, 0.5)],
            _ => &[(-1.0, 0.25), (0.0, 0.5), (1.0, 0.25)],
        }
    }

    /// Children of `coarse` in the index space of the next finer level.
    pub fn split(&self, coarse: &Particle) -> SmallVec<[Particle; 3]> {
        let r = REFINEMENT_RATIO as f64;
        let center = coarse.position() * r;
        self.pattern()
            .iter()
            .map(|(offset, fraction)| {
                Particle::at_position(
                    center + offset,
                    coarse.weight * r * fraction,
                    coarse.charge,
                    coarse.v,
                )
            })
            .collect()
    }
}

impl Default for ParticleSplit {
    fn default() -> Self {
        Self { nbr_refined: 2 }
    }
}
