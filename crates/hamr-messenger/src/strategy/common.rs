//! Fine-side hybrid machinery shared by both strategies: field ghost
//! refiners, old E/B snapshots and level-ghost particle bookkeeping.

use std::sync::Arc;

use hamr_amr::{
    FieldLinearRefine, FieldLinearTimeInterpolate, ParticleRefineAlgorithm, ParticleSplit,
    PatchHierarchy, RefineAlgorithm, RefineOperator, ResourcesManager,
};
use hamr_core::{Quantity, ResourceId, VecFieldDescriptor};
use hamr_model::{ElectromagIds, HybridMessengerInfo, HybridModel, MomentBuffers, PopulationIds};
use indexmap::IndexMap;
use tracing::warn;

use crate::communicator::{
    register_scalar_refine, register_vector_refine, Communicator, Refiner, Synchronizer,
};
use crate::MessengerError;

/// Field families with ghost refiners.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FieldFamily {
    Magnetic,
    Electric,
    Current,
}

impl FieldFamily {
    fn label(self) -> &'static str {
        match self {
            Self::Magnetic => "magnetic",
            Self::Electric => "electric",
            Self::Current => "current",
        }
    }
}

/// Ghost refiners keyed by the name of the field they fill.
#[derive(Debug, Default)]
pub(crate) struct GhostRefiners {
    pub magnetic: IndexMap<String, Communicator<Refiner>>,
    pub electric: IndexMap<String, Communicator<Refiner>>,
    pub current: IndexMap<String, Communicator<Refiner>>,
}

impl GhostRefiners {
    fn family(&self, family: FieldFamily) -> &IndexMap<String, Communicator<Refiner>> {
        match family {
            FieldFamily::Magnetic => &self.magnetic,
            FieldFamily::Electric => &self.electric,
            FieldFamily::Current => &self.current,
        }
    }

    /// Build the ghost schedules of `level`. E and B use the coarser level
    /// when `fields_from_coarser`, J when `current_from_coarser`.
    pub fn register_level(
        &mut self,
        hierarchy: &PatchHierarchy,
        level: usize,
        fields_from_coarser: bool,
        current_from_coarser: bool,
    ) -> Result<(), MessengerError> {
        for refiner in self.magnetic.values_mut().chain(self.electric.values_mut()) {
            let schedule = refiner
                .algorithm()
                .create_ghost_schedule(hierarchy, level, fields_from_coarser)?;
            refiner.add(schedule, level);
        }
        for refiner in self.current.values_mut() {
            let schedule = refiner
                .algorithm()
                .create_ghost_schedule(hierarchy, level, current_from_coarser)?;
            refiner.add(schedule, level);
        }
        Ok(())
    }

    /// Run the ghost schedule of `field` on `level`.
    pub fn fill(
        &self,
        messenger: &str,
        family: FieldFamily,
        field: &VecFieldDescriptor,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<(), MessengerError> {
        let refiner = self.family(family).get(field.name()).ok_or_else(|| {
            MessengerError::UnregisteredQuantity {
                messenger: messenger.to_string(),
                quantity: format!("{} ({})", field.name(), family.label()),
            }
        })?;
        let schedule = refiner
            .find_schedule(level)
            .ok_or_else(|| MessengerError::MissingSchedule {
                quantity: field.name().to_string(),
                level,
            })?;
        schedule.fill_data(hierarchy, time)?;
        Ok(())
    }

    /// Ids moved by the schedules of `level`, magnetic first.
    pub fn schedule_ids(&self, level: usize) -> Vec<(ResourceId, ResourceId, Option<ResourceId>)> {
        self.magnetic
            .values()
            .chain(self.electric.values())
            .chain(self.current.values())
            .filter_map(|r| r.find_schedule(level))
            .flat_map(|s| s.ids())
            .collect()
    }

    pub fn remove_finer(&mut self, level: usize) {
        for refiner in self
            .magnetic
            .values_mut()
            .chain(self.electric.values_mut())
            .chain(self.current.values_mut())
        {
            refiner.remove_finer(level);
        }
    }
}

/// Same-level refiner completing the moment ghost nodes of every
/// population.
pub(crate) fn moment_refiner(
    info: &HybridMessengerInfo,
    resources: &ResourcesManager,
) -> Communicator<Refiner> {
    let spatial: Arc<dyn RefineOperator> = Arc::new(FieldLinearRefine);
    let mut algorithm = RefineAlgorithm::new();
    for pop in &info.populations {
        register_scalar_refine(
            &mut algorithm,
            &pop.density,
            &pop.density,
            Quantity::Rho,
            resources,
            &spatial,
        );
        register_vector_refine(&mut algorithm, &pop.flux, &pop.flux, resources, &spatial);
    }
    Communicator::new(algorithm)
}

/// Resolve the particle ids of the populations of `info`.
pub(crate) fn particle_ids(
    info: &HybridMessengerInfo,
    resources: &ResourcesManager,
) -> Vec<ResourceId> {
    info.populations
        .iter()
        .filter_map(|pop| {
            let id = resources.id(&pop.particles);
            if id.is_none() {
                warn!(quantity = %pop.particles, "unresolved particles skipped");
            }
            id
        })
        .collect()
}

/// A particle refine algorithm over `ids`.
pub(crate) fn particle_algorithm(
    ids: &[ResourceId],
    split: ParticleSplit,
) -> ParticleRefineAlgorithm {
    let mut algorithm = ParticleRefineAlgorithm::new(split);
    for &id in ids {
        algorithm.register(id);
    }
    algorithm
}

/// Copy the model E and B of every patch of `level` into the snapshot
/// buffers, times included.
pub(crate) fn snapshot_electromag(
    hierarchy: &mut PatchHierarchy,
    level: usize,
    model: &ElectromagIds,
    old: &ElectromagIds,
) -> Result<(), MessengerError> {
    let pairs = model
        .electric
        .iter()
        .zip(&old.electric)
        .chain(model.magnetic.iter().zip(&old.magnetic));
    let pairs: Vec<(ResourceId, ResourceId)> = pairs.map(|(m, o)| (*m, *o)).collect();
    for patch in hierarchy.level_mut(level)?.patches_mut() {
        for &(src, dst) in &pairs {
            let current = patch.take_field(src)?;
            patch.field_mut(dst)?.copy_from(&current);
            patch.put_field(src, current);
        }
    }
    Ok(())
}

/// Start of a coarse interval: the working level-ghost particles restart
/// from the old snapshot.
pub(crate) fn reseed_level_ghosts(
    hierarchy: &mut PatchHierarchy,
    level: usize,
    particles: &[ResourceId],
) -> Result<(), MessengerError> {
    for patch in hierarchy.level_mut(level)?.patches_mut() {
        for &id in particles {
            let data = patch.particles_mut(id)?;
            data.level_ghost = data.level_ghost_old.clone();
        }
    }
    Ok(())
}

/// End of a coarse interval: new level ghosts become old ones and
/// transient ghost copies are dropped.
pub(crate) fn roll_level_ghosts(
    hierarchy: &mut PatchHierarchy,
    level: usize,
    particles: &[ResourceId],
) -> Result<(), MessengerError> {
    for patch in hierarchy.level_mut(level)?.patches_mut() {
        for &id in particles {
            let data = patch.particles_mut(id)?;
            data.level_ghost_old = std::mem::take(&mut data.level_ghost_new);
            data.old_time = data.new_time;
            data.clear_ghosts();
        }
    }
    Ok(())
}

/// Drop working level-ghost particles that left the level-ghost cells.
pub(crate) fn retain_level_ghosts(
    hierarchy: &mut PatchHierarchy,
    level: usize,
    particles: &[ResourceId],
) -> Result<(), MessengerError> {
    let lvl = hierarchy.level_mut(level)?;
    let cells: Vec<_> = (0..lvl.len()).map(|p| lvl.level_ghost_cells(p)).collect();
    for (patch, cells) in lvl.patches_mut().iter_mut().zip(cells) {
        for &id in particles {
            patch
                .particles_mut(id)?
                .level_ghost
                .retain(|p| cells.iter().any(|b| b.contains(p.i_cell)));
        }
    }
    Ok(())
}

/// Deposit the patch-ghost particles of `level` and, when the level has
/// a coarser hybrid level, the old and new level-ghost particles blended
/// at `time`.
pub(crate) fn deposit_ghost_moments(
    hierarchy: &mut PatchHierarchy,
    level: usize,
    populations: &[PopulationIds],
    time: f64,
    level_ghosts: bool,
) -> Result<(), MessengerError> {
    for patch in hierarchy.level_mut(level)?.patches_mut() {
        for &pop in populations {
            let mut buffers = MomentBuffers::take(patch, pop)?;
            let data = patch.particles(pop.particles)?;
            buffers.deposit(&data.patch_ghost, 1.0);
            if level_ghosts {
                let alpha = FieldLinearTimeInterpolate::alpha(data.old_time, data.new_time, time);
                buffers.deposit(&data.level_ghost_old, alpha);
                buffers.deposit(&data.level_ghost_new, 1.0 - alpha);
            }
            buffers.restore(patch);
        }
    }
    Ok(())
}

/// Copy population moment ghosts from same-level neighbours and
/// recompute the total ion moments of `level`.
pub(crate) fn complete_moments(
    moments: &Communicator<Refiner>,
    model: &HybridModel,
    hierarchy: &mut PatchHierarchy,
    level: usize,
    time: f64,
) -> Result<(), MessengerError> {
    let schedule = moments
        .find_schedule(level)
        .ok_or_else(|| MessengerError::MissingSchedule {
            quantity: "ion moments".to_string(),
            level,
        })?;
    schedule.fill_data(hierarchy, time)?;
    let ids = model.ids()?;
    let masses = model.masses();
    for patch in hierarchy.level_mut(level)?.patches_mut() {
        hamr_model::ions::compute_total_moments(patch, &ids.ions, &masses)?;
    }
    Ok(())
}

/// Recompute every moment of `level` from its particles, after
/// initialization or regrid.
pub(crate) fn recompute_moments(
    moments: &Communicator<Refiner>,
    model: &HybridModel,
    hierarchy: &mut PatchHierarchy,
    level: usize,
    time: f64,
) -> Result<(), MessengerError> {
    let ids = model.ids()?;
    for patch in hierarchy.level_mut(level)?.patches_mut() {
        hamr_model::ions::compute_population_moments(patch, &ids.ions)?;
    }
    complete_moments(moments, model, hierarchy, level, time)
}

/// Time of the first patch's `id` on `level`.
pub(crate) fn level_time(
    hierarchy: &PatchHierarchy,
    level: usize,
    id: ResourceId,
) -> Result<f64, MessengerError> {
    let lvl = hierarchy.level(level)?;
    match lvl.patches().first() {
        Some(patch) => Ok(patch.field(id)?.time()),
        None => Ok(0.0),
    }
}

/// Execute the cached coarsen schedule of `level`.
pub(crate) fn run_sync(
    synchronizer: &Communicator<Synchronizer>,
    quantity: &str,
    hierarchy: &mut PatchHierarchy,
    level: usize,
) -> Result<(), MessengerError> {
    let schedule = synchronizer
        .find_schedule(level)
        .ok_or_else(|| MessengerError::MissingSchedule {
            quantity: quantity.to_string(),
            level,
        })?;
    schedule.fill_data(hierarchy)?;
    Ok(())
}
