//! Inter-level communication for hamr.
//!
//! A messenger moves data between a level and its coarser neighbour:
//! ghost fills (spatially refined and, when the coarse side advances in
//! time, linearly interpolated in time), initialization and regrid of new
//! levels, particle refinement and restriction of fine results. Messengers
//! are named `"<Coarse>-<Fine>"` after the models they bridge:
//!
//! - [`MhdMessenger`] between two MHD levels;
//! - [`HybridMessenger`] for hybrid levels, running a
//!   [`HybridMessengerStrategy`] chosen by the coarse model.
//!
//! The [`MessengerFactory`] builds them by name and
//! [`MessengerRegistration`] wires the quantities declared by models and
//! solvers into their [`Communicator`]s.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod communicator;
pub mod error;
pub mod factory;
pub mod hybrid_messenger;
pub mod messenger;
pub mod mhd_messenger;
pub mod registration;
pub mod strategy;

pub use communicator::{Communicator, CommunicatorKind, ParticleRefiner, Refiner, Synchronizer};
pub use error::MessengerError;
pub use factory::{make_descriptors, MessengerDescriptor, MessengerFactory};
pub use hamr_model::{HybridMessengerInfo, MessengerInfo, MhdMessengerInfo, PopulationInfo};
pub use hybrid_messenger::HybridMessenger;
pub use messenger::Messenger;
pub use mhd_messenger::MhdMessenger;
pub use registration::{MessengerRegistration, SolverQuantities};
pub use strategy::{HybridHybridStrategy, HybridMessengerStrategy, MhdHybridStrategy};
