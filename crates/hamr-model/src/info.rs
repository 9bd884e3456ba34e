//! What a messenger must communicate, as declared by models and solvers.
//!
//! A messenger hands out an empty [`MessengerInfo`] of the variant it
//! understands; the physical model and solver of the relevant side fill
//! it with quantity descriptors; the filled info is then moved into the
//! messenger's `register_quantities`.
//!
//! Descriptors are grouped by purpose:
//!
//! - `model_*`: the model's own quantities, refined at initialization,
//!   ghost filled and synchronized onto coarser levels;
//! - `init_*`: quantities only refined when a level is created;
//! - `ghost_*`: quantities only ghost filled (solver temporaries).

use hamr_core::VecFieldDescriptor;

/// Resources of one ion population.
#[derive(Clone, Debug, PartialEq)]
pub struct PopulationInfo {
    /// Population name.
    pub name: String,
    /// Particle resource name.
    pub particles: String,
    /// Density resource name.
    pub density: String,
    /// Flux resource.
    pub flux: VecFieldDescriptor,
    /// Particle mass.
    pub mass: f64,
}

/// Quantities exchanged with a hybrid level.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HybridMessengerInfo {
    /// Model electric field.
    pub model_electric: Option<VecFieldDescriptor>,
    /// Model magnetic field.
    pub model_magnetic: Option<VecFieldDescriptor>,
    /// Model current density.
    pub model_current: Option<VecFieldDescriptor>,
    /// Total ion density.
    pub model_ion_density: Option<String>,
    /// Ion bulk velocity.
    pub model_ion_bulk_velocity: Option<VecFieldDescriptor>,
    /// Electric fields refined at level creation only.
    pub init_electric: Vec<VecFieldDescriptor>,
    /// Magnetic fields refined at level creation only.
    pub init_magnetic: Vec<VecFieldDescriptor>,
    /// Electric fields whose ghosts are filled.
    pub ghost_electric: Vec<VecFieldDescriptor>,
    /// Magnetic fields whose ghosts are filled.
    pub ghost_magnetic: Vec<VecFieldDescriptor>,
    /// Current densities whose ghosts are filled.
    pub ghost_current: Vec<VecFieldDescriptor>,
    /// Ion populations.
    pub populations: Vec<PopulationInfo>,
}

/// Quantities exchanged with an MHD level.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MhdMessengerInfo {
    /// Model magnetic field.
    pub model_magnetic: Option<VecFieldDescriptor>,
    /// Model electric field.
    pub model_electric: Option<VecFieldDescriptor>,
    /// Model bulk velocity.
    pub model_velocity: Option<VecFieldDescriptor>,
    /// Model mass density.
    pub model_density: Option<String>,
    /// Isothermal fluid temperature, used to load particles from the
    /// fluid.
    pub temperature: Option<f64>,
    /// Magnetic fields whose ghosts are filled.
    pub ghost_magnetic: Vec<VecFieldDescriptor>,
    /// Electric fields whose ghosts are filled.
    pub ghost_electric: Vec<VecFieldDescriptor>,
}

/// A messenger info of either physics.
#[derive(Clone, Debug, PartialEq)]
pub enum MessengerInfo {
    /// Hybrid side.
    Hybrid(HybridMessengerInfo),
    /// MHD side.
    Mhd(MhdMessengerInfo),
}

impl MessengerInfo {
    /// Empty hybrid info.
    pub fn hybrid() -> Self {
        Self::Hybrid(HybridMessengerInfo::default())
    }

    /// Empty MHD info.
    pub fn mhd() -> Self {
        Self::Mhd(MhdMessengerInfo::default())
    }

    /// Variant name, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Hybrid(_) => "hybrid",
            Self::Mhd(_) => "MHD",
        }
    }

    /// The hybrid content, if this is a hybrid info.
    pub fn as_hybrid(&self) -> Option<&HybridMessengerInfo> {
        match self {
            Self::Hybrid(info) => Some(info),
            Self::Mhd(_) => None,
        }
    }

    /// Mutable hybrid content.
    pub fn as_hybrid_mut(&mut self) -> Option<&mut HybridMessengerInfo> {
        match self {
            Self::Hybrid(info) => Some(info),
            Self::Mhd(_) => None,
        }
    }

    /// The MHD content, if this is an MHD info.
    pub fn as_mhd(&self) -> Option<&MhdMessengerInfo> {
        match self {
            Self::Mhd(info) => Some(info),
            Self::Hybrid(_) => None,
        }
    }

    /// Mutable MHD content.
    pub fn as_mhd_mut(&mut self) -> Option<&mut MhdMessengerInfo> {
        match self {
            Self::Mhd(info) => Some(info),
            Self::Hybrid(_) => None,
        }
    }
}
