//! Strategies of the hybrid messenger, one per kind of coarse level.

pub(crate) mod common;
mod hybrid_hybrid;
mod mhd_hybrid;

pub use hybrid_hybrid::HybridHybridStrategy;
pub use mhd_hybrid::MhdHybridStrategy;

use hamr_amr::{Patch, PatchHierarchy, PatchLevel, ResourcesManager};
use hamr_core::{ResourceId, VecFieldDescriptor};
use hamr_model::{HybridModel, MessengerInfo, MhdModel, PhysicalModel};

use crate::MessengerError;

/// How a hybrid level talks to its coarser level.
#[derive(Debug)]
pub enum HybridMessengerStrategy {
    /// Hybrid coarse level.
    HybridHybrid(HybridHybridStrategy),
    /// MHD coarse level.
    MhdHybrid(MhdHybridStrategy),
}

macro_rules! dispatch {
    ($self:expr, $s:ident => $body:expr) => {
        match $self {
            HybridMessengerStrategy::HybridHybrid($s) => $body,
            HybridMessengerStrategy::MhdHybrid($s) => $body,
        }
    };
}

impl HybridMessengerStrategy {
    /// `"<Coarse>-<Fine>"`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::HybridHybrid(_) => HybridHybridStrategy::NAME,
            Self::MhdHybrid(_) => MhdHybridStrategy::NAME,
        }
    }

    /// Model of the coarser level.
    pub fn coarse_model_name(&self) -> &'static str {
        match self {
            Self::HybridHybrid(_) => HybridModel::NAME,
            Self::MhdHybrid(_) => MhdModel::NAME,
        }
    }

    /// Model of the finer level.
    pub fn fine_model_name(&self) -> &'static str {
        HybridModel::NAME
    }

    /// Lowest hybrid level.
    pub fn first_level(&self) -> usize {
        dispatch!(self, s => s.first_level())
    }

    /// Empty info to be filled by the fine model and solver.
    pub fn empty_info_from_coarser(&self) -> MessengerInfo {
        MessengerInfo::hybrid()
    }

    /// Empty info to be filled by the coarse model.
    pub fn empty_info_from_finer(&self) -> MessengerInfo {
        match self {
            Self::HybridHybrid(_) => MessengerInfo::hybrid(),
            Self::MhdHybrid(_) => MessengerInfo::mhd(),
        }
    }

    /// Allocate the strategy scratch data on `patch`.
    pub fn allocate(
        &self,
        resources: &ResourcesManager,
        patch: &mut Patch,
        time: f64,
    ) -> Result<(), MessengerError> {
        dispatch!(self, s => s.allocate(resources, patch, time))
    }

    /// Wire every communicator from the filled infos.
    pub fn register_quantities(
        &mut self,
        from_coarser: MessengerInfo,
        from_finer: MessengerInfo,
        resources: &ResourcesManager,
    ) -> Result<(), MessengerError> {
        dispatch!(self, s => s.register_quantities(from_coarser, from_finer, resources))
    }

    /// Rebuild every schedule of `level`.
    pub fn register_level(
        &mut self,
        hierarchy: &PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        dispatch!(self, s => s.register_level(hierarchy, level))
    }

    /// Drop the schedules of levels finer than `level`.
    pub fn remove_finer(&mut self, level: usize) {
        dispatch!(self, s => s.remove_finer(level))
    }

    fn hybrid<'a>(&self, model: &'a PhysicalModel) -> Result<&'a HybridModel, MessengerError> {
        model.as_hybrid().ok_or_else(|| MessengerError::WrongPhysics {
            messenger: self.name().to_string(),
            expected: "the hybrid model",
        })
    }

    /// Fill the rebuilt `level`.
    pub fn regrid(
        &mut self,
        model: &PhysicalModel,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        old_level: &PatchLevel,
        time: f64,
    ) -> Result<(), MessengerError> {
        let model = self.hybrid(model)?;
        dispatch!(self, s => s.regrid(model, hierarchy, level, old_level, time))
    }

    /// First fill of the new `level`.
    pub fn init_level(
        &mut self,
        model: &PhysicalModel,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<(), MessengerError> {
        let model = self.hybrid(model)?;
        dispatch!(self, s => s.init_level(model, hierarchy, level, time))
    }

    /// Open the substeps of `level` within a coarse step ending at
    /// `coarse_time`.
    pub fn first_step(
        &mut self,
        model: &PhysicalModel,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        coarse_time: f64,
    ) -> Result<(), MessengerError> {
        let model = self.hybrid(model)?;
        match self {
            Self::HybridHybrid(s) => s.first_step(hierarchy, level, coarse_time),
            Self::MhdHybrid(s) => s.first_step(model, hierarchy, level, coarse_time),
        }
    }

    /// Close the substeps of `level`.
    pub fn last_step(
        &mut self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        dispatch!(self, s => s.last_step(hierarchy, level))
    }

    /// Snapshot the coarse `model` fields on `level`.
    pub fn prepare_step(
        &mut self,
        model: &PhysicalModel,
        hierarchy: &mut PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        let name = self.name();
        let wrong = |expected| MessengerError::WrongPhysics {
            messenger: name.to_string(),
            expected,
        };
        match self {
            Self::HybridHybrid(s) => {
                let model = model.as_hybrid().ok_or_else(|| wrong("the hybrid model"))?;
                s.prepare_step(model, hierarchy, level)
            }
            Self::MhdHybrid(s) => {
                let model = model.as_mhd().ok_or_else(|| wrong("the MHD model"))?;
                s.prepare_step(model, hierarchy, level)
            }
        }
    }

    /// Same-level ghost fill of the coarsest hybrid level.
    pub fn fill_root_ghosts(
        &self,
        model: &PhysicalModel,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<(), MessengerError> {
        let model = self.hybrid(model)?;
        match self {
            Self::HybridHybrid(s) => s.fill_root_ghosts(model, hierarchy, level, time),
            Self::MhdHybrid(_) => Err(MessengerError::NoCoarserLevel {
                messenger: self.name().to_string(),
                level,
            }),
        }
    }

    /// Fill the ghost nodes of magnetic `field` on `level` at `time`.
    pub fn fill_magnetic_ghosts(
        &self,
        field: &VecFieldDescriptor,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<(), MessengerError> {
        dispatch!(self, s => s.fill_magnetic_ghosts(field, hierarchy, level, time))
    }

    /// Fill the ghost nodes of electric `field` on `level` at `time`.
    pub fn fill_electric_ghosts(
        &self,
        field: &VecFieldDescriptor,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<(), MessengerError> {
        dispatch!(self, s => s.fill_electric_ghosts(field, hierarchy, level, time))
    }

    /// Fill the ghost nodes of current `field` on `level` at `time`.
    pub fn fill_current_ghosts(
        &self,
        field: &VecFieldDescriptor,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<(), MessengerError> {
        dispatch!(self, s => s.fill_current_ghosts(field, hierarchy, level, time))
    }

    /// Refresh the ghost particles of `level`.
    pub fn fill_ion_ghost_particles(
        &self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<(), MessengerError> {
        dispatch!(self, s => s.fill_ion_ghost_particles(hierarchy, level, time))
    }

    /// Complete the ion moments of `level` after a push.
    pub fn fill_ion_moment_ghosts(
        &self,
        model: &HybridModel,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        current_time: f64,
        new_time: f64,
    ) -> Result<(), MessengerError> {
        dispatch!(self, s => {
            s.fill_ion_moment_ghosts(model, hierarchy, level, current_time, new_time)
        })
    }

    /// Restrict the magnetic field of `level` onto the coarser level.
    pub fn sync_magnetic(
        &self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        dispatch!(self, s => s.sync_magnetic(hierarchy, level))
    }

    /// Restrict the electric field of `level` onto the coarser level.
    pub fn sync_electric(
        &self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        dispatch!(self, s => s.sync_electric(hierarchy, level))
    }

    /// Restrict the ion moments of `level` onto the coarser level.
    pub fn sync_ion_moments(
        &self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        dispatch!(self, s => s.sync_ion_moments(hierarchy, level))
    }

    /// Every restriction of `level`.
    pub fn synchronize(
        &self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        dispatch!(self, s => s.synchronize(hierarchy, level))
    }

    /// Ids moved by the ghost schedules cached for `level`.
    pub fn ghost_schedule_ids(
        &self,
        level: usize,
    ) -> Vec<(ResourceId, ResourceId, Option<ResourceId>)> {
        dispatch!(self, s => s.ghost_schedule_ids(level))
    }
}
