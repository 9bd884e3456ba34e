//! Level integration and simulation driver of hamr.
//!
//! - [`MultiPhysicsIntegrator`] registers models and solvers over level
//!   ranges, builds one messenger per pair of neighbouring models and
//!   advances, initializes and synchronizes single levels.
//! - [`TimeRefinementIntegrator`] subcycles the levels in time through any
//!   [`LevelStrategy`] and rebuilds levels from tagged cells.
//! - [`tagging`] turns magnetic field jumps into refinement boxes.
//! - [`Simulator`] wires it all from a [`SimulationConfig`] and writes
//!   diagnostics along the run.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod multiphysics;
pub mod simulator;
pub mod tagging;
pub mod time_refinement;

pub use config::{DiagnosticsConfig, SimulationConfig, TaggingConfig};
pub use error::{IntegratorError, Registered, SimulatorError};
pub use multiphysics::MultiPhysicsIntegrator;
pub use simulator::Simulator;
pub use tagging::{GradientTagger, Tags};
pub use time_refinement::{GriddingConfig, LevelStrategy, TimeRefinementIntegrator};
