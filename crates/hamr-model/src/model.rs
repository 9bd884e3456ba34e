//! The closed set of physical models.

use hamr_amr::{Patch, PatchHierarchy, ResourcesManager};

use crate::{HybridModel, MessengerInfo, MhdModel, ModelError};

/// A physical model assigned to a range of levels.
#[derive(Clone, Debug)]
pub enum PhysicalModel {
    /// Hybrid PIC.
    Hybrid(HybridModel),
    /// Ideal MHD.
    Mhd(MhdModel),
}

impl PhysicalModel {
    /// Model name (`"HybridModel"` or `"MHDModel"`).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hybrid(_) => HybridModel::NAME,
            Self::Mhd(_) => MhdModel::NAME,
        }
    }

    /// Register every model resource.
    pub fn register_resources(
        &mut self,
        resources: &mut ResourcesManager,
    ) -> Result<(), ModelError> {
        match self {
            Self::Hybrid(m) => m.register_resources(resources),
            Self::Mhd(m) => m.register_resources(resources),
        }
    }

    /// Allocate every model resource on `patch`.
    pub fn allocate(
        &self,
        resources: &ResourcesManager,
        patch: &mut Patch,
        time: f64,
    ) -> Result<(), ModelError> {
        match self {
            Self::Hybrid(m) => m.allocate(resources, patch, time),
            Self::Mhd(m) => m.allocate(resources, patch, time),
        }
    }

    /// Declare the model quantities to a messenger.
    pub fn fill_messenger_info(&self, info: &mut MessengerInfo) -> Result<(), ModelError> {
        match self {
            Self::Hybrid(m) => m.fill_messenger_info(info),
            Self::Mhd(m) => m.fill_messenger_info(info),
        }
    }

    /// Set initial conditions on `level`.
    pub fn initialize(
        &self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<(), ModelError> {
        match self {
            Self::Hybrid(m) => m.initialize(hierarchy, level, time),
            Self::Mhd(m) => m.initialize(hierarchy, level, time),
        }
    }

    /// The hybrid model, if this is one.
    pub fn as_hybrid(&self) -> Option<&HybridModel> {
        match self {
            Self::Hybrid(m) => Some(m),
            Self::Mhd(_) => None,
        }
    }

    /// The MHD model, if this is one.
    pub fn as_mhd(&self) -> Option<&MhdModel> {
        match self {
            Self::Mhd(m) => Some(m),
            Self::Hybrid(_) => None,
        }
    }
}

impl From<HybridModel> for PhysicalModel {
    fn from(m: HybridModel) -> Self {
        Self::Hybrid(m)
    }
}

impl From<MhdModel> for PhysicalModel {
    fn from(m: MhdModel) -> Self {
        Self::Mhd(m)
    }
}
