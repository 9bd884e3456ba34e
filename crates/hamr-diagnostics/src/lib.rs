//! Diagnostics of hamr hierarchies.
//!
//! A [`DiagnosticsManager`] walks every patch of every level and hands
//! the entries of each [`DiagnosticKind`] (electromagnetic fields, fluid
//! moments, particle arrays) to a [`JsonDiagnosticWriter`], one JSON-lines
//! stream per kind. Patch counts are reduced through a [`Collective`] so
//! that every rank writes the same number of entries per level.
//!
//! Dumps read the hierarchy only and must happen between advances.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod collective;
pub mod error;
pub mod json;
pub mod manager;
pub mod writers;

pub use collective::{Collective, LocalCollective};
pub use error::DiagnosticError;
pub use json::JsonDiagnosticWriter;
pub use manager::DiagnosticsManager;
pub use writers::{DiagnosticKind, Entry};
