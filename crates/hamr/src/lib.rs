//! hamr: hybrid particle-in-cell plasma simulation on block-structured
//! adaptive mesh refinement.
//!
//! This is the facade crate re-exporting the public API of the hamr
//! sub-crates.
//!
//! # Quick start
//!
//! ```no_run
//! use hamr::prelude::*;
//!
//! let job = Dict::from_json_str(r#"{
//!     "simulation": {
//!         "time_step_nbr": 10, "time_step": 0.001,
//!         "grid": { "nbr_cells": 32, "meshsize": 0.2 }
//!     },
//!     "ions": { "nbrPopulations": 1, "pop0": {
//!         "name": "protons",
//!         "particle_initializer": { "density": 1.0, "nbr_part_per_cell": 50 } } },
//!     "electrons": { "pressure_closure": { "Te": 0.1 } }
//! }"#).unwrap();
//! let mut simulator = Simulator::from_dict(&job).unwrap();
//! simulator.run().unwrap();
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `hamr-core` | boxes, Yee layout, quantities, particles, job dictionary |
//! | [`amr`] | `hamr-amr` | patch hierarchy, resources, refine and coarsen schedules |
//! | [`model`] | `hamr-model` | hybrid and MHD models |
//! | [`messenger`] | `hamr-messenger` | inter-level communication |
//! | [`solver`] | `hamr-solver` | PPC and MHD solvers |
//! | [`engine`] | `hamr-engine` | level integrators, tagging, simulator |
//! | [`diagnostics`] | `hamr-diagnostics` | JSON-lines dumps |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Index boxes, layouts, particles and the job dictionary (`hamr-core`).
pub use hamr_core as types;

/// Patch hierarchy and transfer schedules (`hamr-amr`).
pub use hamr_amr as amr;

/// Physical models (`hamr-model`).
pub use hamr_model as model;

/// Messengers between levels (`hamr-messenger`).
pub use hamr_messenger as messenger;

/// Level solvers (`hamr-solver`).
pub use hamr_solver as solver;

/// Integrators and the [`engine::Simulator`] (`hamr-engine`).
pub use hamr_engine as engine;

/// Diagnostic output (`hamr-diagnostics`).
pub use hamr_diagnostics as diagnostics;

/// Common imports for running simulations.
pub mod prelude {
    pub use hamr_core::{AmrBox, Dict, DictError};

    pub use hamr_amr::{GridGeometry, PatchHierarchy};

    pub use hamr_model::{HybridModel, MhdModel, PhysicalModel};

    pub use hamr_solver::{Pusher, SolverMhd, SolverPpc};

    pub use hamr_engine::{
        MultiPhysicsIntegrator, SimulationConfig, Simulator, SimulatorError,
        TimeRefinementIntegrator,
    };

    pub use hamr_diagnostics::{DiagnosticsManager, JsonDiagnosticWriter};
}
