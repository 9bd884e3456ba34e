//! The hybrid messenger: a thin facade over its strategy.

use hamr_amr::{Patch, PatchHierarchy, PatchLevel, ResourcesManager};
use hamr_core::{ResourceId, VecFieldDescriptor};
use hamr_model::{HybridModel, MessengerInfo, PhysicalModel};

use crate::strategy::HybridMessengerStrategy;
use crate::MessengerError;

/// Messenger serving hybrid levels. Every operation is forwarded to the
/// strategy chosen at construction.
#[derive(Debug)]
pub struct HybridMessenger {
    strategy: HybridMessengerStrategy,
}

impl HybridMessenger {
    /// Messenger running `strategy`.
    pub fn new(strategy: HybridMessengerStrategy) -> Self {
        Self { strategy }
    }

    /// The strategy.
    pub fn strategy(&self) -> &HybridMessengerStrategy {
        &self.strategy
    }

    /// `"<Coarse>-<Fine>"`.
    pub fn name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Model of the finer level.
    pub fn fine_model_name(&self) -> &'static str {
        self.strategy.fine_model_name()
    }

    /// Model of the coarser level.
    pub fn coarse_model_name(&self) -> &'static str {
        self.strategy.coarse_model_name()
    }

    /// Lowest hybrid level.
    pub fn first_level(&self) -> usize {
        self.strategy.first_level()
    }

    /// Empty info for the fine model and solver.
    pub fn empty_info_from_coarser(&self) -> MessengerInfo {
        self.strategy.empty_info_from_coarser()
    }

    /// Empty info for the coarse model.
    pub fn empty_info_from_finer(&self) -> MessengerInfo {
        self.strategy.empty_info_from_finer()
    }

    /// See [`HybridMessengerStrategy::allocate`].
    pub fn allocate(
        &self,
        resources: &ResourcesManager,
        patch: &mut Patch,
        time: f64,
    ) -> Result<(), MessengerError> {
        self.strategy.allocate(resources, patch, time)
    }

    /// See [`HybridMessengerStrategy::register_quantities`].
    pub fn register_quantities(
        &mut self,
        from_coarser: MessengerInfo,
        from_finer: MessengerInfo,
        resources: &ResourcesManager,
    ) -> Result<(), MessengerError> {
        self.strategy.register_quantities(from_coarser, from_finer, resources)
    }

    /// See [`HybridMessengerStrategy::register_level`].
    pub fn register_level(
        &mut self,
        hierarchy: &PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        self.strategy.register_level(hierarchy, level)
    }

    /// See [`HybridMessengerStrategy::remove_finer`].
    pub fn remove_finer(&mut self, level: usize) {
        self.strategy.remove_finer(level)
    }

    /// See [`HybridMessengerStrategy::regrid`].
    pub fn regrid(
        &mut self,
        model: &PhysicalModel,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        old_level: &PatchLevel,
        time: f64,
    ) -> Result<(), MessengerError> {
        self.strategy.regrid(model, hierarchy, level, old_level, time)
    }

    /// See [`HybridMessengerStrategy::init_level`].
    pub fn init_level(
        &mut self,
        model: &PhysicalModel,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<(), MessengerError> {
        self.strategy.init_level(model, hierarchy, level, time)
    }

    /// See [`HybridMessengerStrategy::first_step`].
    pub fn first_step(
        &mut self,
        model: &PhysicalModel,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        coarse_time: f64,
    ) -> Result<(), MessengerError> {
        self.strategy.first_step(model, hierarchy, level, coarse_time)
    }

    /// See [`HybridMessengerStrategy::last_step`].
    pub fn last_step(
        &mut self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        self.strategy.last_step(hierarchy, level)
    }

    /// See [`HybridMessengerStrategy::prepare_step`].
    pub fn prepare_step(
        &mut self,
        model: &PhysicalModel,
        hierarchy: &mut PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        self.strategy.prepare_step(model, hierarchy, level)
    }

    /// See [`HybridMessengerStrategy::fill_root_ghosts`].
    pub fn fill_root_ghosts(
        &self,
        model: &PhysicalModel,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<(), MessengerError> {
        self.strategy.fill_root_ghosts(model, hierarchy, level, time)
    }

    /// See [`HybridMessengerStrategy::fill_magnetic_ghosts`].
    pub fn fill_magnetic_ghosts(
        &self,
        field: &VecFieldDescriptor,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<(), MessengerError> {
        self.strategy.fill_magnetic_ghosts(field, hierarchy, level, time)
    }

    /// See [`HybridMessengerStrategy::fill_electric_ghosts`].
    pub fn fill_electric_ghosts(
        &self,
        field: &VecFieldDescriptor,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<(), MessengerError> {
        self.strategy.fill_electric_ghosts(field, hierarchy, level, time)
    }

    /// See [`HybridMessengerStrategy::fill_current_ghosts`].
    pub fn fill_current_ghosts(
        &self,
        field: &VecFieldDescriptor,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<(), MessengerError> {
        self.strategy.fill_current_ghosts(field, hierarchy, level, time)
    }

    /// See [`HybridMessengerStrategy::fill_ion_ghost_particles`].
    pub fn fill_ion_ghost_particles(
        &self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<(), MessengerError> {
        self.strategy.fill_ion_ghost_particles(hierarchy, level, time)
    }

    /// See [`HybridMessengerStrategy::fill_ion_moment_ghosts`].
    pub fn fill_ion_moment_ghosts(
        &self,
        model: &HybridModel,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        current_time: f64,
        new_time: f64,
    ) -> Result<(), MessengerError> {
        self.strategy
            .fill_ion_moment_ghosts(model, hierarchy, level, current_time, new_time)
    }

    /// See [`HybridMessengerStrategy::sync_magnetic`].
    pub fn sync_magnetic(
        &self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        self.strategy.sync_magnetic(hierarchy, level)
    }

    /// See [`HybridMessengerStrategy::sync_electric`].
    pub fn sync_electric(
        &self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        self.strategy.sync_electric(hierarchy, level)
    }

    /// See [`HybridMessengerStrategy::sync_ion_moments`].
    pub fn sync_ion_moments(
        &self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        self.strategy.sync_ion_moments(hierarchy, level)
    }

    /// See [`HybridMessengerStrategy::synchronize`].
    pub fn synchronize(
        &self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        self.strategy.synchronize(hierarchy, level)
    }

    /// See [`HybridMessengerStrategy::ghost_schedule_ids`].
    pub fn ghost_schedule_ids(
        &self,
        level: usize,
    ) -> Vec<(ResourceId, ResourceId, Option<ResourceId>)> {
        self.strategy.ghost_schedule_ids(level)
    }
}
