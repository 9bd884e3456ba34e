//! The messenger contract shared by every pair of models.

use hamr_amr::{Patch, PatchHierarchy, PatchLevel, ResourcesManager};
use hamr_model::{MessengerInfo, MhdModel, PhysicalModel};

use crate::{HybridMessenger, MessengerError, MhdMessenger};

/// A messenger between two levels, named `"<Coarse>-<Fine>"` after the
/// models it bridges.
#[derive(Debug)]
pub enum Messenger {
    /// Hybrid fine level.
    Hybrid(HybridMessenger),
    /// MHD fine and coarse levels.
    Mhd(MhdMessenger),
}

impl Messenger {
    /// `"<Coarse>-<Fine>"`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hybrid(m) => m.name(),
            Self::Mhd(_) => MhdMessenger::NAME,
        }
    }

    /// Model of the finer level.
    pub fn fine_model_name(&self) -> &'static str {
        match self {
            Self::Hybrid(m) => m.fine_model_name(),
            Self::Mhd(_) => MhdModel::NAME,
        }
    }

    /// Model of the coarser level.
    pub fn coarse_model_name(&self) -> &'static str {
        match self {
            Self::Hybrid(m) => m.coarse_model_name(),
            Self::Mhd(_) => MhdModel::NAME,
        }
    }

    /// Empty info for the fine model and solver to fill.
    pub fn empty_info_from_coarser(&self) -> MessengerInfo {
        match self {
            Self::Hybrid(m) => m.empty_info_from_coarser(),
            Self::Mhd(_) => MessengerInfo::mhd(),
        }
    }

    /// Empty info for the coarse model to fill.
    pub fn empty_info_from_finer(&self) -> MessengerInfo {
        match self {
            Self::Hybrid(m) => m.empty_info_from_finer(),
            Self::Mhd(_) => MessengerInfo::mhd(),
        }
    }

    /// The hybrid messenger, if this is one.
    pub fn as_hybrid(&self) -> Option<&HybridMessenger> {
        match self {
            Self::Hybrid(m) => Some(m),
            Self::Mhd(_) => None,
        }
    }

    /// The MHD messenger, if this is one.
    pub fn as_mhd(&self) -> Option<&MhdMessenger> {
        match self {
            Self::Mhd(m) => Some(m),
            Self::Hybrid(_) => None,
        }
    }

    /// Allocate the messenger scratch data on `patch`.
    pub fn allocate(
        &self,
        resources: &ResourcesManager,
        patch: &mut Patch,
        time: f64,
    ) -> Result<(), MessengerError> {
        match self {
            Self::Hybrid(m) => m.allocate(resources, patch, time),
            Self::Mhd(m) => m.allocate(resources, patch, time),
        }
    }

    /// Wire the communicators from filled infos.
    pub fn register_quantities(
        &mut self,
        from_coarser: MessengerInfo,
        from_finer: MessengerInfo,
        resources: &ResourcesManager,
    ) -> Result<(), MessengerError> {
        match self {
            Self::Hybrid(m) => m.register_quantities(from_coarser, from_finer, resources),
            Self::Mhd(m) => m.register_quantities(from_coarser, from_finer, resources),
        }
    }

    /// Rebuild the schedules of `level`.
    pub fn register_level(
        &mut self,
        hierarchy: &PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        match self {
            Self::Hybrid(m) => m.register_level(hierarchy, level),
            Self::Mhd(m) => m.register_level(hierarchy, level),
        }
    }

    /// Drop the schedules of levels finer than `level`.
    pub fn remove_finer(&mut self, level: usize) {
        match self {
            Self::Hybrid(m) => m.remove_finer(level),
            Self::Mhd(m) => m.remove_finer(level),
        }
    }

    /// Fill the rebuilt `level` and rebuild its schedules.
    pub fn regrid(
        &mut self,
        model: &PhysicalModel,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        old_level: &PatchLevel,
        time: f64,
    ) -> Result<(), MessengerError> {
        match self {
            Self::Hybrid(m) => m.regrid(model, hierarchy, level, old_level, time),
            Self::Mhd(m) => m.regrid(hierarchy, level, old_level, time),
        }
    }

    /// First fill of the new `level`.
    pub fn init_level(
        &mut self,
        model: &PhysicalModel,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<(), MessengerError> {
        match self {
            Self::Hybrid(m) => m.init_level(model, hierarchy, level, time),
            Self::Mhd(m) => m.init_level(hierarchy, level, time),
        }
    }

    /// Open the substeps of `level` within the coarse step ending at
    /// `coarse_time`.
    pub fn first_step(
        &mut self,
        model: &PhysicalModel,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        coarse_time: f64,
    ) -> Result<(), MessengerError> {
        match self {
            Self::Hybrid(m) => m.first_step(model, hierarchy, level, coarse_time),
            Self::Mhd(_) => Ok(()),
        }
    }

    /// Close the substeps of `level`.
    pub fn last_step(
        &mut self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        match self {
            Self::Hybrid(m) => m.last_step(hierarchy, level),
            Self::Mhd(_) => Ok(()),
        }
    }

    /// Snapshot the coarse `model` fields of `level` before the next
    /// finer level substeps.
    pub fn prepare_step(
        &mut self,
        model: &PhysicalModel,
        hierarchy: &mut PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        match self {
            Self::Hybrid(m) => m.prepare_step(model, hierarchy, level),
            Self::Mhd(m) => {
                let model = model.as_mhd().ok_or_else(|| MessengerError::WrongPhysics {
                    messenger: MhdMessenger::NAME.to_string(),
                    expected: "the MHD model",
                })?;
                m.prepare_step(model, hierarchy, level)
            }
        }
    }

    /// Same-level ghost fill of the coarsest level of the messenger.
    pub fn fill_root_ghosts(
        &self,
        model: &PhysicalModel,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<(), MessengerError> {
        match self {
            Self::Hybrid(m) => m.fill_root_ghosts(model, hierarchy, level, time),
            Self::Mhd(m) => m.fill_root_ghosts(hierarchy, level, time),
        }
    }

    /// Restrict `level` onto the coarser level.
    pub fn synchronize(
        &self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        match self {
            Self::Hybrid(m) => m.synchronize(hierarchy, level),
            Self::Mhd(m) => m.synchronize(hierarchy, level),
        }
    }
}

impl From<HybridMessenger> for Messenger {
    fn from(m: HybridMessenger) -> Self {
        Self::Hybrid(m)
    }
}

impl From<MhdMessenger> for Messenger {
    fn from(m: MhdMessenger) -> Self {
        Self::Mhd(m)
    }
}
