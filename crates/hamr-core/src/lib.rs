//! Core types for the hamr hybrid particle-in-cell simulator.
//!
//! This is the leaf crate of the workspace. It holds everything that does
//! not depend on the patch hierarchy: identifiers, AMR boxes, the 1D Yee
//! grid layout, physical quantity descriptors, macro-particles and the
//! hierarchical configuration dictionary.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod amr_box;
pub mod dict;
pub mod error;
pub mod id;
pub mod layout;
pub mod particle;
pub mod quantity;

pub use amr_box::AmrBox;
pub use dict::{Dict, DictValue, FromDictValue, ScalarFunction};
pub use error::DictError;
pub use id::{PatchId, ResourceId};
pub use layout::{Centering, GridLayout, INTERP_ORDER};
pub use particle::{Particle, ParticleArray};
pub use quantity::{Component, Quantity, VecFieldDescriptor, VectorQuantity};
