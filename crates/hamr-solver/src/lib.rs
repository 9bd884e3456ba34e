//! Level solvers of hamr.
//!
//! A solver advances the data of one level from `current_time` to
//! `new_time`, reading and writing interiors only; every ghost node and
//! ghost particle it needs comes from the messenger of the level.
//!
//! - [`SolverPpc`] advances a [`HybridModel`](hamr_model::HybridModel)
//!   with the predictor-predictor-corrector scheme: two predictions of
//!   the fields with ion pushes through time-centered fields, then the
//!   corrected fields.
//! - [`SolverMhd`] advances an [`MhdModel`](hamr_model::MhdModel) by ideal
//!   induction.
//!
//! The discrete operators of the 1D Yee layout live in [`numerics`] and
//! the particle pusher in [`pusher`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod access;
pub mod error;
pub mod mhd;
pub mod numerics;
pub mod ppc;
pub mod pusher;
pub mod solver;

pub use error::SolverError;
pub use mhd::SolverMhd;
pub use ppc::SolverPpc;
pub use pusher::{ModifiedBoris, PushMode, Pusher};
pub use solver::Solver;
