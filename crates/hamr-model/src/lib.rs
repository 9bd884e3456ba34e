//! Physical models of hamr.
//!
//! Two models exist: the [`HybridModel`] (kinetic ions pushed as
//! macro-particles, massless isothermal electrons, fields on the Yee grid)
//! and the [`MhdModel`] used on coarse levels. Models own the names of
//! their quantities; the resources manager turns those names into ids and
//! allocates the data on patches.
//!
//! The crate also holds what the models need to set up and feed a level:
//! the [`MaxwellianInitializer`], the linear [`interpolator`], and the
//! [`MessengerInfo`] through which models declare what messengers must
//! communicate.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod electromag;
pub mod error;
pub mod hybrid;
pub mod info;
pub mod interpolator;
pub mod ions;
pub mod maxwellian;
pub mod mhd;
pub mod model;

pub use electromag::{Electromag, ElectromagIds, ElectromagInitializer, VecIds};
pub use error::ModelError;
pub use hybrid::{Electrons, HybridIds, HybridModel};
pub use info::{HybridMessengerInfo, MessengerInfo, MhdMessengerInfo, PopulationInfo};
pub use ions::{IonPopulation, Ions, IonsIds, MomentBuffers, PopulationIds};
pub use maxwellian::{Basis, CellMoments, MaxwellianInitializer};
pub use mhd::{MhdIds, MhdModel};
pub use model::PhysicalModel;
