//! Hybrid fine level under a hybrid coarse level.

use std::sync::Arc;

use hamr_amr::{
    CoarsenAlgorithm, CoarsenOperator, FieldCoarsen, FieldLinearRefine,
    FieldLinearTimeInterpolate, ParticleDestination, ParticleSplit, PatchHierarchy, PatchLevel,
    RefineAlgorithm, RefineOperator, ResourcesManager, TimeInterpolateOperator,
};
use hamr_core::{Quantity, ResourceId, VecFieldDescriptor};
use hamr_model::{Electromag, ElectromagIds, HybridMessengerInfo, HybridModel, MessengerInfo};
use indexmap::IndexMap;
use tracing::{debug, info};

use super::common::{self, FieldFamily, GhostRefiners};
use crate::communicator::{
    make_refiner, register_scalar_coarsen, register_vector_coarsen, register_vector_refine,
    Communicator, ParticleRefiner, Refiner, Synchronizer,
};
use crate::MessengerError;

/// Communicates between two hybrid levels: fields are refined from the
/// coarse model (time interpolated between the snapshot taken by
/// [`prepare_step`](Self::prepare_step) and the current coarse fields),
/// level-ghost particles are split coarse particles, fine results are
/// restricted back onto the coarse model.
#[derive(Debug)]
pub struct HybridHybridStrategy {
    first_level: usize,
    split: ParticleSplit,
    old: Electromag,
    old_ids: ElectromagIds,
    model_magnetic: Option<VecFieldDescriptor>,
    model_electric: Option<VecFieldDescriptor>,
    ghosts: GhostRefiners,
    init_fields: Communicator<Refiner>,
    moments: Communicator<Refiner>,
    interior_particles: Communicator<ParticleRefiner>,
    patch_ghost_particles: Communicator<ParticleRefiner>,
    level_ghost_old: Communicator<ParticleRefiner>,
    level_ghost_new: Communicator<ParticleRefiner>,
    magnetic_sync: Communicator<Synchronizer>,
    electric_sync: Communicator<Synchronizer>,
    moment_sync: Communicator<Synchronizer>,
    particles: Vec<ResourceId>,
    snapshots: IndexMap<usize, f64>,
    registered: bool,
}

impl HybridHybridStrategy {
    /// Messenger name.
    pub const NAME: &'static str = "HybridModel-HybridModel";

    /// Strategy for hybrid levels above `first_level`, registering its
    /// old E/B buffers with `resources`.
    pub fn new(
        resources: &mut ResourcesManager,
        first_level: usize,
        split: ParticleSplit,
    ) -> Result<Self, MessengerError> {
        let old = Electromag::new(format!("{}_EM_old", Self::NAME));
        let old_ids = old.register(resources)?;
        Ok(Self {
            first_level,
            split,
            old,
            old_ids,
            model_magnetic: None,
            model_electric: None,
            ghosts: GhostRefiners::default(),
            init_fields: Communicator::default(),
            moments: Communicator::default(),
            interior_particles: Communicator::default(),
            patch_ghost_particles: Communicator::default(),
            level_ghost_old: Communicator::default(),
            level_ghost_new: Communicator::default(),
            magnetic_sync: Communicator::default(),
            electric_sync: Communicator::default(),
            moment_sync: Communicator::default(),
            particles: Vec::new(),
            snapshots: IndexMap::new(),
            registered: false,
        })
    }

    /// Lowest level this strategy serves.
    pub fn first_level(&self) -> usize {
        self.first_level
    }

    fn has_coarser(&self, level: usize) -> bool {
        level > self.first_level
    }

    fn require_coarser(&self, level: usize) -> Result<(), MessengerError> {
        if self.has_coarser(level) {
            Ok(())
        } else {
            Err(MessengerError::NoCoarserLevel {
                messenger: Self::NAME.to_string(),
                level,
            })
        }
    }

    fn require_registered(&self) -> Result<(), MessengerError> {
        if self.registered {
            Ok(())
        } else {
            Err(MessengerError::NotRegistered {
                messenger: Self::NAME.to_string(),
            })
        }
    }

    /// Allocate the old E/B buffers on `patch`.
    pub fn allocate(
        &self,
        resources: &ResourcesManager,
        patch: &mut hamr_amr::Patch,
        time: f64,
    ) -> Result<(), MessengerError> {
        self.old_ids.allocate(resources, patch, time)?;
        Ok(())
    }

    /// Wire every communicator. Both infos must be hybrid.
    pub fn register_quantities(
        &mut self,
        from_coarser: MessengerInfo,
        from_finer: MessengerInfo,
        resources: &ResourcesManager,
    ) -> Result<(), MessengerError> {
        let wrong = || MessengerError::WrongPhysics {
            messenger: Self::NAME.to_string(),
            expected: "hybrid messenger infos",
        };
        let fine = from_coarser.as_hybrid().ok_or_else(wrong)?;
        let coarse = from_finer.as_hybrid().ok_or_else(wrong)?;
        let missing = |what: &str| MessengerError::UnregisteredQuantity {
            messenger: Self::NAME.to_string(),
            quantity: what.to_string(),
        };
        let magnetic = coarse
            .model_magnetic
            .clone()
            .ok_or_else(|| missing("model magnetic field"))?;
        let electric = coarse
            .model_electric
            .clone()
            .ok_or_else(|| missing("model electric field"))?;

        let spatial: Arc<dyn RefineOperator> = Arc::new(FieldLinearRefine);
        let time: Arc<dyn TimeInterpolateOperator> = Arc::new(FieldLinearTimeInterpolate);
        let coarsen: Arc<dyn CoarsenOperator> = Arc::new(FieldCoarsen);

        self.ghosts = GhostRefiners::default();
        for ghost in &fine.ghost_magnetic {
            let refiner = make_refiner(
                ghost,
                &magnetic,
                self.old.magnetic(),
                resources,
                spatial.clone(),
                time.clone(),
            );
            self.ghosts.magnetic.insert(ghost.name().to_string(), refiner);
        }
        for ghost in &fine.ghost_electric {
            let refiner = make_refiner(
                ghost,
                &electric,
                self.old.electric(),
                resources,
                spatial.clone(),
                time.clone(),
            );
            self.ghosts.electric.insert(ghost.name().to_string(), refiner);
        }
        if let Some(current) = &coarse.model_current {
            for ghost in &fine.ghost_current {
                let mut algorithm = RefineAlgorithm::new();
                register_vector_refine(&mut algorithm, ghost, current, resources, &spatial);
                self.ghosts
                    .current
                    .insert(ghost.name().to_string(), Communicator::new(algorithm));
            }
        }

        let mut init = RefineAlgorithm::new();
        for (model, source) in [
            (fine.model_magnetic.as_ref(), &magnetic),
            (fine.model_electric.as_ref(), &electric),
        ] {
            if let Some(model) = model {
                register_vector_refine(&mut init, model, source, resources, &spatial);
            }
        }
        for extra in fine.init_magnetic.iter().chain(&fine.init_electric) {
            register_vector_refine(&mut init, extra, extra, resources, &spatial);
        }
        self.init_fields = Communicator::new(init);
        self.moments = common::moment_refiner(fine, resources);

        self.particles = common::particle_ids(fine, resources);
        let algorithm = common::particle_algorithm(&self.particles, self.split);
        self.interior_particles = Communicator::new(algorithm.clone());
        self.patch_ghost_particles = Communicator::new(algorithm.clone());
        self.level_ghost_old = Communicator::new(algorithm.clone());
        self.level_ghost_new = Communicator::new(algorithm);

        self.magnetic_sync = synchronizer(
            fine.model_magnetic.as_ref(),
            Some(&magnetic),
            resources,
            &coarsen,
        );
        self.electric_sync = synchronizer(
            fine.model_electric.as_ref(),
            Some(&electric),
            resources,
            &coarsen,
        );
        self.moment_sync = moment_synchronizer(fine, coarse, resources, &coarsen);

        self.model_magnetic = fine.model_magnetic.clone();
        self.model_electric = fine.model_electric.clone();
        self.registered = true;
        debug!(
            messenger = Self::NAME,
            magnetic = self.ghosts.magnetic.len(),
            electric = self.ghosts.electric.len(),
            populations = self.particles.len(),
            "quantities registered"
        );
        Ok(())
    }

    /// Rebuild every schedule of `level`.
    pub fn register_level(
        &mut self,
        hierarchy: &PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        self.require_registered()?;
        let from_coarser = self.has_coarser(level);
        self.ghosts.register_level(hierarchy, level, from_coarser, from_coarser)?;
        let moments = self
            .moments
            .algorithm()
            .create_ghost_schedule(hierarchy, level, false)?;
        self.moments.add(moments, level);
        let patch_ghosts = self
            .patch_ghost_particles
            .algorithm()
            .create_patch_ghost_schedule(hierarchy, level)?;
        self.patch_ghost_particles.add(patch_ghosts, level);
        if from_coarser {
            let old = self.level_ghost_old.algorithm().create_level_ghost_schedule(
                hierarchy,
                level,
                ParticleDestination::LevelGhostOld,
            )?;
            self.level_ghost_old.add(old, level);
            let new = self.level_ghost_new.algorithm().create_level_ghost_schedule(
                hierarchy,
                level,
                ParticleDestination::LevelGhostNew,
            )?;
            self.level_ghost_new.add(new, level);
            for sync in [&mut self.magnetic_sync, &mut self.electric_sync, &mut self.moment_sync] {
                let schedule = sync.algorithm().create_schedule(hierarchy, level)?;
                sync.add(schedule, level);
            }
        }
        debug!(messenger = Self::NAME, level, "level registered");
        Ok(())
    }

    /// Drop the schedules of levels finer than `level`.
    pub fn remove_finer(&mut self, level: usize) {
        self.ghosts.remove_finer(level);
        for c in [&mut self.init_fields, &mut self.moments] {
            c.remove_finer(level);
        }
        for c in [
            &mut self.interior_particles,
            &mut self.patch_ghost_particles,
            &mut self.level_ghost_old,
            &mut self.level_ghost_new,
        ] {
            c.remove_finer(level);
        }
        for c in [&mut self.magnetic_sync, &mut self.electric_sync, &mut self.moment_sync] {
            c.remove_finer(level);
        }
    }

    /// Fill the rebuilt `level` from `old_level` where they overlap and
    /// from the coarser level elsewhere, then rebuild its schedules.
    pub fn regrid(
        &mut self,
        model: &HybridModel,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        old_level: &PatchLevel,
        time: f64,
    ) -> Result<(), MessengerError> {
        self.require_registered()?;
        self.require_coarser(level)?;
        let fields = self
            .init_fields
            .algorithm()
            .create_regrid_schedule(hierarchy, level, old_level)?;
        fields.fill_data_from_old(hierarchy, old_level, time)?;
        let particles = self
            .interior_particles
            .algorithm()
            .create_regrid_schedule(hierarchy, level, old_level)?;
        particles.fill_data_from_old(hierarchy, old_level, time)?;
        self.init_fields.add(fields, level);
        self.interior_particles.add(particles, level);

        self.register_level(hierarchy, level)?;
        self.fill_new_level_ghosts(model, hierarchy, level, time)?;
        info!(messenger = Self::NAME, level, "level regridded");
        Ok(())
    }

    /// First fill of the new `level`, from the coarser level only.
    pub fn init_level(
        &mut self,
        model: &HybridModel,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<(), MessengerError> {
        self.require_registered()?;
        self.require_coarser(level)?;
        let fields = self
            .init_fields
            .algorithm()
            .create_init_schedule(hierarchy, level)?;
        fields.fill_data(hierarchy, time)?;
        let particles = self
            .interior_particles
            .algorithm()
            .create_init_schedule(hierarchy, level)?;
        particles.fill_data(hierarchy, time)?;
        self.init_fields.add(fields, level);
        self.interior_particles.add(particles, level);

        self.register_level(hierarchy, level)?;
        self.fill_new_level_ghosts(model, hierarchy, level, time)?;
        info!(messenger = Self::NAME, level, "level initialized");
        Ok(())
    }

    fn fill_new_level_ghosts(
        &self,
        model: &HybridModel,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<(), MessengerError> {
        self.particle_schedule(&self.level_ghost_old, level)?
            .fill_data(hierarchy, time)?;
        common::reseed_level_ghosts(hierarchy, level, &self.particles)?;
        self.particle_schedule(&self.patch_ghost_particles, level)?
            .fill_data(hierarchy, time)?;
        common::recompute_moments(&self.moments, model, hierarchy, level, time)
    }

    fn particle_schedule<'a>(
        &self,
        communicator: &'a Communicator<ParticleRefiner>,
        level: usize,
    ) -> Result<&'a hamr_amr::ParticleRefineSchedule, MessengerError> {
        communicator
            .find_schedule(level)
            .ok_or_else(|| MessengerError::MissingSchedule {
                quantity: "ion particles".to_string(),
                level,
            })
    }

    /// Anchor the coarse interval of `level`: refine level-ghost particles
    /// from the coarser level at `coarse_time` and restart the working
    /// level ghosts from the old ones.
    pub fn first_step(
        &mut self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        coarse_time: f64,
    ) -> Result<(), MessengerError> {
        if !self.has_coarser(level) {
            return Ok(());
        }
        self.particle_schedule(&self.level_ghost_new, level)?
            .fill_data(hierarchy, coarse_time)?;
        common::reseed_level_ghosts(hierarchy, level, &self.particles)
    }

    /// Close the coarse interval of `level`.
    pub fn last_step(
        &mut self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        if !self.has_coarser(level) {
            return Ok(());
        }
        common::roll_level_ghosts(hierarchy, level, &self.particles)
    }

    /// Snapshot the model E/B of `level` before finer levels substep.
    pub fn prepare_step(
        &mut self,
        model: &HybridModel,
        hierarchy: &mut PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        let ids = model.ids()?.electromag;
        common::snapshot_electromag(hierarchy, level, &ids, &self.old_ids)?;
        let time = common::level_time(hierarchy, level, ids.magnetic[0])?;
        self.snapshots.insert(level, time);
        Ok(())
    }

    fn assert_snapshot(&self, level: usize) {
        debug_assert!(
            !self.has_coarser(level) || self.snapshots.contains_key(&(level - 1)),
            "no old snapshot of level {} before filling level {level}",
            level.saturating_sub(1)
        );
    }

    /// Fill the ghost nodes of the magnetic field `field` on `level`.
    pub fn fill_magnetic_ghosts(
        &self,
        field: &VecFieldDescriptor,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<(), MessengerError> {
        self.assert_snapshot(level);
        self.ghosts.fill(
            Self::NAME,
            FieldFamily::Magnetic,
            field,
            hierarchy,
            level,
            time,
        )
    }

    /// Fill the ghost nodes of the electric field `field` on `level`.
    pub fn fill_electric_ghosts(
        &self,
        field: &VecFieldDescriptor,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<(), MessengerError> {
        self.assert_snapshot(level);
        self.ghosts.fill(
            Self::NAME,
            FieldFamily::Electric,
            field,
            hierarchy,
            level,
            time,
        )
    }

    /// Fill the ghost nodes of the current density `field` on `level`.
    pub fn fill_current_ghosts(
        &self,
        field: &VecFieldDescriptor,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<(), MessengerError> {
        self.ghosts.fill(
            Self::NAME,
            FieldFamily::Current,
            field,
            hierarchy,
            level,
            time,
        )
    }

    /// Refresh patch-ghost particles of `level` and drop working level
    /// ghosts that left the level-ghost cells.
    pub fn fill_ion_ghost_particles(
        &self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<(), MessengerError> {
        self.particle_schedule(&self.patch_ghost_particles, level)?
            .fill_data(hierarchy, time)?;
        if self.has_coarser(level) {
            common::retain_level_ghosts(hierarchy, level, &self.particles)?;
        }
        Ok(())
    }

    /// Complete the ion moments of `level` after a push to `new_time`.
    pub fn fill_ion_moment_ghosts(
        &self,
        model: &HybridModel,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        _current_time: f64,
        new_time: f64,
    ) -> Result<(), MessengerError> {
        let populations = &model.ids()?.ions.populations;
        let level_ghosts = self.has_coarser(level);
        common::deposit_ghost_moments(hierarchy, level, populations, new_time, level_ghosts)?;
        common::complete_moments(&self.moments, model, hierarchy, level, new_time)
    }

    /// Same-level fill of the model fields and ion ghosts of `level`, used
    /// on the coarsest hybrid level.
    pub fn fill_root_ghosts(
        &self,
        model: &HybridModel,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<(), MessengerError> {
        self.require_registered()?;
        if let Some(b) = &self.model_magnetic {
            self.fill_magnetic_ghosts(b, hierarchy, level, time)?;
        }
        if let Some(e) = &self.model_electric {
            self.fill_electric_ghosts(e, hierarchy, level, time)?;
        }
        self.particle_schedule(&self.patch_ghost_particles, level)?
            .fill_data(hierarchy, time)?;
        common::recompute_moments(&self.moments, model, hierarchy, level, time)
    }

    /// Restrict the magnetic field of `level` onto the coarser level.
    pub fn sync_magnetic(
        &self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        common::run_sync(&self.magnetic_sync, "magnetic field", hierarchy, level)
    }

    /// Restrict the electric field of `level` onto the coarser level.
    pub fn sync_electric(
        &self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        common::run_sync(&self.electric_sync, "electric field", hierarchy, level)
    }

    /// Restrict the total ion moments of `level` onto the coarser level.
    pub fn sync_ion_moments(
        &self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        common::run_sync(&self.moment_sync, "ion moments", hierarchy, level)
    }

    /// Every restriction of `level`.
    pub fn synchronize(
        &self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        if !self.has_coarser(level) {
            return Ok(());
        }
        self.sync_magnetic(hierarchy, level)?;
        self.sync_electric(hierarchy, level)?;
        self.sync_ion_moments(hierarchy, level)
    }

    /// Source and destination ids of the ghost schedules cached for
    /// `level`, in registration order.
    pub fn ghost_schedule_ids(
        &self,
        level: usize,
    ) -> Vec<(ResourceId, ResourceId, Option<ResourceId>)> {
        self.ghosts.schedule_ids(level)
    }
}

fn synchronizer(
    fine: Option<&VecFieldDescriptor>,
    coarse: Option<&VecFieldDescriptor>,
    resources: &ResourcesManager,
    coarsen: &Arc<dyn CoarsenOperator>,
) -> Communicator<Synchronizer> {
    let mut algorithm = CoarsenAlgorithm::new();
    if let (Some(fine), Some(coarse)) = (fine, coarse) {
        register_vector_coarsen(&mut algorithm, fine, coarse, resources, coarsen);
    }
    Communicator::new(algorithm)
}

fn moment_synchronizer(
    fine: &HybridMessengerInfo,
    coarse: &HybridMessengerInfo,
    resources: &ResourcesManager,
    coarsen: &Arc<dyn CoarsenOperator>,
) -> Communicator<Synchronizer> {
    let mut algorithm = CoarsenAlgorithm::new();
    if let (Some(f), Some(c)) = (&fine.model_ion_density, &coarse.model_ion_density) {
        register_scalar_coarsen(&mut algorithm, f, c, Quantity::Rho, resources, coarsen);
    }
    if let (Some(f), Some(c)) = (&fine.model_ion_bulk_velocity, &coarse.model_ion_bulk_velocity) {
        register_vector_coarsen(&mut algorithm, f, c, resources, coarsen);
    }
    Communicator::new(algorithm)
}
