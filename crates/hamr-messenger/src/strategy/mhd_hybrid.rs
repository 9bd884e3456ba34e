//! First hybrid level under an MHD level.
//!
//! Fields are refined from the MHD buffers. The MHD level has no
//! particles: domain and level-ghost particles of the hybrid level are
//! loaded from the fluid moments with a drifting Maxwellian of thermal
//! speed `sqrt(T/m)`, the fluid density shared equally between the
//! populations.

use std::sync::Arc;

use hamr_amr::{
    CoarsenAlgorithm, CoarsenOperator, FieldCoarsen, FieldLinearRefine,
    FieldLinearTimeInterpolate, ParticleDestination, ParticleSplit, PatchHierarchy, PatchLevel,
    RefineAlgorithm, RefineOperator, ResourcesManager, TimeInterpolateOperator, REFINEMENT_RATIO,
};
use hamr_core::{
    AmrBox, Centering, Particle, ParticleArray, Quantity, ResourceId, VecFieldDescriptor,
};
use hamr_model::interpolator::{gather, gather_vector};
use hamr_model::maxwellian::load_cell;
use hamr_model::{
    CellMoments, Electromag, ElectromagIds, HybridModel, MessengerInfo, MhdModel, VecIds,
};
use indexmap::IndexMap;
use tracing::{debug, info};

use super::common::{self, FieldFamily, GhostRefiners};
use crate::communicator::{
    make_refiner, register_scalar_coarsen, register_vector_coarsen, register_vector_refine,
    Communicator, ParticleRefiner, Refiner, Synchronizer,
};
use crate::MessengerError;

#[derive(Clone, Copy, Debug)]
struct FluidIds {
    density: ResourceId,
    velocity: VecIds,
    magnetic: VecIds,
}

/// Communicates between an MHD coarse level and the first hybrid level.
#[derive(Debug)]
pub struct MhdHybridStrategy {
    first_level: usize,
    old: Electromag,
    old_ids: ElectromagIds,
    fluid: Option<FluidIds>,
    temperature: f64,
    ghosts: GhostRefiners,
    init_fields: Communicator<Refiner>,
    moments: Communicator<Refiner>,
    patch_ghost_particles: Communicator<ParticleRefiner>,
    magnetic_sync: Communicator<Synchronizer>,
    electric_sync: Communicator<Synchronizer>,
    moment_sync: Communicator<Synchronizer>,
    particles: Vec<ResourceId>,
    snapshots: IndexMap<usize, f64>,
    loads: u64,
}

impl MhdHybridStrategy {
    /// Messenger name.
    pub const NAME: &'static str = "MHDModel-HybridModel";

    /// Strategy for the hybrid level `first_level`, registering its old
    /// MHD E/B buffers with `resources`.
    pub fn new(
        resources: &mut ResourcesManager,
        first_level: usize,
    ) -> Result<Self, MessengerError> {
        let old = Electromag::new(format!("{}_EM_old", Self::NAME));
        let old_ids = old.register(resources)?;
        Ok(Self {
            first_level,
            old,
            old_ids,
            fluid: None,
            temperature: 0.0,
            ghosts: GhostRefiners::default(),
            init_fields: Communicator::default(),
            moments: Communicator::default(),
            patch_ghost_particles: Communicator::default(),
            magnetic_sync: Communicator::default(),
            electric_sync: Communicator::default(),
            moment_sync: Communicator::default(),
            particles: Vec::new(),
            snapshots: IndexMap::new(),
            loads: 0,
        })
    }

    /// The hybrid level served.
    pub fn first_level(&self) -> usize {
        self.first_level
    }

    fn fluid(&self) -> Result<FluidIds, MessengerError> {
        self.fluid.ok_or_else(|| MessengerError::NotRegistered {
            messenger: Self::NAME.to_string(),
        })
    }

    fn require_first(&self, level: usize) -> Result<(), MessengerError> {
        if level == self.first_level && level > 0 {
            Ok(())
        } else {
            Err(MessengerError::NoCoarserLevel {
                messenger: Self::NAME.to_string(),
                level,
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

    /// Wire every communicator: `from_coarser` describes the hybrid side,
    /// `from_finer` the MHD side.
    pub fn register_quantities(
        &mut self,
        from_coarser: MessengerInfo,
        from_finer: MessengerInfo,
        resources: &ResourcesManager,
    ) -> Result<(), MessengerError> {
        let hybrid = from_coarser
            .as_hybrid()
            .ok_or_else(|| MessengerError::WrongPhysics {
                messenger: Self::NAME.to_string(),
                expected: "a hybrid info from the fine side",
            })?;
        let mhd = from_finer.as_mhd().ok_or_else(|| MessengerError::WrongPhysics {
            messenger: Self::NAME.to_string(),
            expected: "an MHD info from the coarse side",
        })?;
        let missing = |what: &str| MessengerError::UnregisteredQuantity {
            messenger: Self::NAME.to_string(),
            quantity: what.to_string(),
        };
        let magnetic = mhd
            .model_magnetic
            .clone()
            .ok_or_else(|| missing("MHD magnetic field"))?;
        let electric = mhd
            .model_electric
            .clone()
            .ok_or_else(|| missing("MHD electric field"))?;
        let velocity = mhd
            .model_velocity
            .clone()
            .ok_or_else(|| missing("MHD velocity"))?;
        let density = mhd.model_density.clone().ok_or_else(|| missing("MHD density"))?;
        self.temperature = mhd.temperature.ok_or_else(|| missing("MHD temperature"))?;

        let vector_ids = |d: &VecFieldDescriptor| -> Result<VecIds, MessengerError> {
            let mut ids = [ResourceId(0); 3];
            for (slot, (name, _)) in ids.iter_mut().zip(d.components()) {
                *slot = resources.id(name).ok_or_else(|| missing(name))?;
            }
            Ok(ids)
        };
        self.fluid = Some(FluidIds {
            density: resources.id(&density).ok_or_else(|| missing(&density))?,
            velocity: vector_ids(&velocity)?,
            magnetic: vector_ids(&magnetic)?,
        });

        let spatial: Arc<dyn RefineOperator> = Arc::new(FieldLinearRefine);
        let time: Arc<dyn TimeInterpolateOperator> = Arc::new(FieldLinearTimeInterpolate);
        let coarsen: Arc<dyn CoarsenOperator> = Arc::new(FieldCoarsen);

        self.ghosts = GhostRefiners::default();
        for ghost in &hybrid.ghost_magnetic {
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
        for ghost in &hybrid.ghost_electric {
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
        // the MHD level has no current: same-level fills only
        for ghost in &hybrid.ghost_current {
            let mut algorithm = RefineAlgorithm::new();
            register_vector_refine(&mut algorithm, ghost, ghost, resources, &spatial);
            self.ghosts
                .current
                .insert(ghost.name().to_string(), Communicator::new(algorithm));
        }

        let mut init = RefineAlgorithm::new();
        if let Some(b) = &hybrid.model_magnetic {
            register_vector_refine(&mut init, b, &magnetic, resources, &spatial);
        }
        if let Some(e) = &hybrid.model_electric {
            register_vector_refine(&mut init, e, &electric, resources, &spatial);
        }
        self.init_fields = Communicator::new(init);
        self.moments = common::moment_refiner(hybrid, resources);

        self.particles = common::particle_ids(hybrid, resources);
        self.patch_ghost_particles = Communicator::new(common::particle_algorithm(
            &self.particles,
            ParticleSplit::default(),
        ));

        let mut b_sync = CoarsenAlgorithm::new();
        let mut e_sync = CoarsenAlgorithm::new();
        let mut moment_sync = CoarsenAlgorithm::new();
        if let Some(b) = &hybrid.model_magnetic {
            register_vector_coarsen(&mut b_sync, b, &magnetic, resources, &coarsen);
        }
        if let Some(e) = &hybrid.model_electric {
            register_vector_coarsen(&mut e_sync, e, &electric, resources, &coarsen);
        }
        if let Some(rho) = &hybrid.model_ion_density {
            register_scalar_coarsen(
                &mut moment_sync,
                rho,
                &density,
                Quantity::Rho,
                resources,
                &coarsen,
            );
        }
        if let Some(v) = &hybrid.model_ion_bulk_velocity {
            register_vector_coarsen(&mut moment_sync, v, &velocity, resources, &coarsen);
        }
        self.magnetic_sync = Communicator::new(b_sync);
        self.electric_sync = Communicator::new(e_sync);
        self.moment_sync = Communicator::new(moment_sync);

        debug!(
            messenger = Self::NAME,
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
        self.fluid()?;
        self.require_first(level)?;
        self.ghosts.register_level(hierarchy, level, true, false)?;
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
        for sync in [&mut self.magnetic_sync, &mut self.electric_sync, &mut self.moment_sync] {
            let schedule = sync.algorithm().create_schedule(hierarchy, level)?;
            sync.add(schedule, level);
        }
        debug!(messenger = Self::NAME, level, "level registered");
        Ok(())
    }

    /// Drop the schedules of levels finer than `level`.
    pub fn remove_finer(&mut self, level: usize) {
        self.ghosts.remove_finer(level);
        self.init_fields.remove_finer(level);
        self.moments.remove_finer(level);
        self.patch_ghost_particles.remove_finer(level);
        for c in [&mut self.magnetic_sync, &mut self.electric_sync, &mut self.moment_sync] {
            c.remove_finer(level);
        }
    }

    fn next_stream(&mut self) -> u64 {
        self.loads += 1;
        self.loads
    }

    /// Load particles of every population into the fine `cells` from the
    /// fluid on `coarse`.
    fn load_from_fluid(
        &mut self,
        model: &HybridModel,
        coarse: &PatchLevel,
        cells: &[AmrBox],
    ) -> Result<Vec<ParticleArray>, MessengerError> {
        let fluid = self.fluid()?;
        let populations = model.ions().populations();
        let share = 1.0 / populations.len().max(1) as f64;
        let mut loaded = Vec::with_capacity(populations.len());
        for pop in populations {
            let init = pop.initializer();
            let mut rng = init.rng(self.next_stream());
            let vth = (self.temperature / pop.mass()).sqrt();
            let mut out = ParticleArray::new();
            for cell in cells.iter().flat_map(AmrBox::cells) {
                let Some(sample) = sample_fluid(coarse, &fluid, cell)? else {
                    continue;
                };
                let moments = CellMoments {
                    density: sample.density * share,
                    bulk_velocity: sample.velocity,
                    thermal_velocity: [vth; 3],
                    magnetic_field: sample.magnetic,
                };
                load_cell(
                    &mut rng,
                    cell,
                    &moments,
                    init.basis(),
                    init.charge(),
                    init.nbr_part_per_cell(),
                    &mut out,
                );
            }
            loaded.push(out);
        }
        Ok(loaded)
    }

    /// Load `destination` particles of every patch of `level`, in the
    /// patch interior for the domain and in the level-ghost cells
    /// otherwise.
    fn load_level(
        &mut self,
        model: &HybridModel,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        destination: ParticleDestination,
        time: f64,
    ) -> Result<(), MessengerError> {
        let (coarse, fine) = hierarchy.coarse_and_fine_mut(level)?;
        for p in 0..fine.len() {
            let cells = match destination {
                ParticleDestination::Domain => vec![fine.patch(p).amr_box()],
                _ => fine.level_ghost_cells(p),
            };
            let loaded = self.load_from_fluid(model, coarse, &cells)?;
            let patch = fine.patch_mut(p);
            for (&id, particles) in self.particles.iter().zip(loaded) {
                let data = patch.particles_mut(id)?;
                match destination {
                    ParticleDestination::Domain => {
                        data.domain = particles;
                        data.time = time;
                    }
                    ParticleDestination::PatchGhost => data.patch_ghost = particles,
                    ParticleDestination::LevelGhostOld => {
                        data.level_ghost_old = particles;
                        data.old_time = time;
                    }
                    ParticleDestination::LevelGhostNew => {
                        data.level_ghost_new = particles;
                        data.new_time = time;
                    }
                }
            }
        }
        Ok(())
    }

    fn patch_ghost_schedule(
        &self,
        level: usize,
    ) -> Result<&hamr_amr::ParticleRefineSchedule, MessengerError> {
        self.patch_ghost_particles
            .find_schedule(level)
            .ok_or_else(|| MessengerError::MissingSchedule {
                quantity: "ion particles".to_string(),
                level,
            })
    }

    fn fill_new_level_ghosts(
        &mut self,
        model: &HybridModel,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<(), MessengerError> {
        self.load_level(
            model,
            hierarchy,
            level,
            ParticleDestination::LevelGhostOld,
            time,
        )?;
        common::reseed_level_ghosts(hierarchy, level, &self.particles)?;
        self.patch_ghost_schedule(level)?.fill_data(hierarchy, time)?;
        common::recompute_moments(&self.moments, model, hierarchy, level, time)
    }

    /// First fill of the hybrid `level` from the MHD level.
    pub fn init_level(
        &mut self,
        model: &HybridModel,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<(), MessengerError> {
        self.require_first(level)?;
        let fields = self
            .init_fields
            .algorithm()
            .create_init_schedule(hierarchy, level)?;
        fields.fill_data(hierarchy, time)?;
        self.init_fields.add(fields, level);
        self.load_level(model, hierarchy, level, ParticleDestination::Domain, time)?;
        self.register_level(hierarchy, level)?;
        self.fill_new_level_ghosts(model, hierarchy, level, time)?;
        info!(
            messenger = Self::NAME,
            level,
            "hybrid level loaded from fluid"
        );
        Ok(())
    }

    /// Fill the rebuilt hybrid `level`: fields and particles from
    /// `old_level` where it overlaps, from the fluid elsewhere.
    pub fn regrid(
        &mut self,
        model: &HybridModel,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        old_level: &PatchLevel,
        time: f64,
    ) -> Result<(), MessengerError> {
        self.require_first(level)?;
        let fields = self
            .init_fields
            .algorithm()
            .create_regrid_schedule(hierarchy, level, old_level)?;
        fields.fill_data_from_old(hierarchy, old_level, time)?;
        self.init_fields.add(fields, level);

        let (coarse, fine) = hierarchy.coarse_and_fine_mut(level)?;
        for p in 0..fine.len() {
            let interior = fine.patch(p).amr_box();
            let mut uncovered = vec![interior];
            for old in old_level.patches() {
                uncovered = uncovered
                    .iter()
                    .flat_map(|b| b.subtract(&old.amr_box()))
                    .collect();
            }
            let loaded = self.load_from_fluid(model, coarse, &uncovered)?;
            let patch = fine.patch_mut(p);
            for (&id, mut particles) in self.particles.iter().zip(loaded) {
                for old in old_level.patches() {
                    particles.extend(
                        old.particles(id)?
                            .domain
                            .iter()
                            .filter(|q| interior.contains(q.i_cell)),
                    );
                }
                let data = patch.particles_mut(id)?;
                data.domain = particles;
                data.time = time;
            }
        }
        self.register_level(hierarchy, level)?;
        self.fill_new_level_ghosts(model, hierarchy, level, time)?;
        info!(messenger = Self::NAME, level, "level regridded");
        Ok(())
    }

    /// Load level-ghost particles from the fluid at `coarse_time` and
    /// restart the working level ghosts from the old ones.
    pub fn first_step(
        &mut self,
        model: &HybridModel,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        coarse_time: f64,
    ) -> Result<(), MessengerError> {
        self.require_first(level)?;
        self.load_level(
            model,
            hierarchy,
            level,
            ParticleDestination::LevelGhostNew,
            coarse_time,
        )?;
        common::reseed_level_ghosts(hierarchy, level, &self.particles)
    }

    /// Close the coarse interval of `level`.
    pub fn last_step(
        &mut self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        common::roll_level_ghosts(hierarchy, level, &self.particles)
    }

    /// Snapshot the MHD E/B of `level` before the hybrid level substeps.
    pub fn prepare_step(
        &mut self,
        model: &MhdModel,
        hierarchy: &mut PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        let ids = model.ids()?;
        let current = ElectromagIds {
            electric: ids.electric,
            magnetic: ids.magnetic,
        };
        common::snapshot_electromag(hierarchy, level, &current, &self.old_ids)?;
        let time = common::level_time(hierarchy, level, ids.magnetic[0])?;
        self.snapshots.insert(level, time);
        Ok(())
    }

    fn assert_snapshot(&self, level: usize) {
        debug_assert!(
            level == 0 || self.snapshots.contains_key(&(level - 1)),
            "no old MHD snapshot before filling level {level}"
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

    /// Fill the ghost nodes of the current density `field` on `level`
    /// from same-level neighbours.
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

    /// Refresh patch-ghost particles and trim the working level ghosts.
    pub fn fill_ion_ghost_particles(
        &self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<(), MessengerError> {
        self.patch_ghost_schedule(level)?.fill_data(hierarchy, time)?;
        common::retain_level_ghosts(hierarchy, level, &self.particles)
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
        common::deposit_ghost_moments(hierarchy, level, populations, new_time, true)?;
        common::complete_moments(&self.moments, model, hierarchy, level, new_time)
    }

    /// Restrict the hybrid magnetic field onto the MHD magnetic field.
    pub fn sync_magnetic(
        &self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        common::run_sync(&self.magnetic_sync, "magnetic field", hierarchy, level)
    }

    /// Restrict the hybrid electric field onto the MHD electric field.
    pub fn sync_electric(
        &self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        common::run_sync(&self.electric_sync, "electric field", hierarchy, level)
    }

    /// Restrict ion density and bulk velocity onto the MHD density and
    /// velocity.
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

struct FluidSample {
    density: f64,
    velocity: [f64; 3],
    magnetic: [f64; 3],
}

/// Fluid moments at the centre of fine cell `cell`, or `None` when no
/// coarse patch covers it.
fn sample_fluid(
    coarse: &PatchLevel,
    fluid: &FluidIds,
    cell: i32,
) -> Result<Option<FluidSample>, MessengerError> {
    let position = (cell as f64 + 0.5) / REFINEMENT_RATIO as f64;
    let marker = Particle::at_position(position, 0.0, 0.0, [0.0; 3]);
    let Some((q, local)) = coarse.locate(Centering::Dual, marker.i_cell, None) else {
        return Ok(None);
    };
    let patch = coarse.patch(q);
    let marker = marker.shifted(patch.layout().local_to_amr(local) - marker.i_cell);
    let vector = |ids: VecIds| -> Result<[f64; 3], MessengerError> {
        Ok(gather_vector(
            [patch.field(ids[0])?, patch.field(ids[1])?, patch.field(ids[2])?],
            &marker,
        ))
    };
    Ok(Some(FluidSample {
        density: gather(patch.field(fluid.density)?, &marker),
        velocity: vector(fluid.velocity)?,
        magnetic: vector(fluid.magnetic)?,
    }))
}
