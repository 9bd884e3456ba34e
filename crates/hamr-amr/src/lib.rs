//! Block-structured AMR substrate for hamr.
//!
//! A [`PatchHierarchy`] holds levels of patches; every patch carries a
//! table of [`PatchData`] indexed by the [`ResourceId`](hamr_core::ResourceId)s
//! handed out by the [`ResourcesManager`]. Data moves between patches and
//! levels through precomputed schedules:
//!
//! - [`RefineSchedule`]: ghost, initialization and regrid fills of fields,
//!   with optional linear time interpolation of the coarser source.
//! - [`CoarsenSchedule`]: fine-to-coarse restriction of fields.
//! - [`ParticleRefineSchedule`]: patch-ghost, level-ghost and domain fills
//!   of particles, splitting coarse particles when refining.
//!
//! Schedules are plans: they are built from the hierarchy shape once per
//! level (and rebuilt after regrid) and executed against the hierarchy as
//! often as needed.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod coarsen;
pub mod error;
pub mod geometry;
pub mod hierarchy;
pub mod operators;
pub mod particles;
pub mod patch_data;
pub mod refine;
pub mod resources;

pub use coarsen::{CoarsenAlgorithm, CoarsenItem, CoarsenSchedule};
pub use error::HierarchyError;
pub use geometry::{GridGeometry, NESTING_BUFFER, REFINEMENT_RATIO};
pub use hierarchy::{Patch, PatchHierarchy, PatchLevel};
pub use operators::{
    CoarsenOperator, FieldCoarsen, FieldLinearRefine, FieldLinearTimeInterpolate, ParticleSplit,
    RefineOperator, Stencil, TimeInterpolateOperator,
};
pub use particles::{ParticleDestination, ParticleRefineAlgorithm, ParticleRefineSchedule};
pub use patch_data::{FieldData, ParticlesData, PatchData};
pub use refine::{RefineAlgorithm, RefineItem, RefineSchedule, RefineScheduleKind};
pub use resources::{ResourceKind, ResourcesManager};
