//! Test fixtures for hamr development.
//!
//! Builders for small periodic hierarchies, uniform hybrid and MHD
//! models, and helpers to set and inspect fields with analytic profiles.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::*;
