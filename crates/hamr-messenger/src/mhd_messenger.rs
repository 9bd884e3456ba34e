//! Messenger between two MHD levels.

use std::sync::Arc;

use hamr_amr::{
    CoarsenAlgorithm, CoarsenOperator, FieldCoarsen, FieldLinearRefine,
    FieldLinearTimeInterpolate, Patch, PatchHierarchy, PatchLevel, RefineAlgorithm,
    RefineOperator, ResourcesManager, TimeInterpolateOperator,
};
use hamr_core::{Quantity, ResourceId};
use hamr_model::{Electromag, ElectromagIds, MessengerInfo, MhdMessengerInfo, MhdModel};
use indexmap::IndexMap;
use tracing::{debug, info};

use crate::communicator::{
    make_refiner, register_scalar_coarsen, register_scalar_refine, register_vector_coarsen,
    register_vector_refine, Communicator, Refiner, Synchronizer,
};
use crate::strategy::common;
use crate::MessengerError;

/// Moves the fluid quantities between MHD levels.
///
/// Ghosts of B and E are time interpolated between the snapshot taken by
/// [`prepare_step`](Self::prepare_step) and the current coarse fields;
/// density and velocity ghosts are refined from the current coarse
/// values.
#[derive(Debug)]
pub struct MhdMessenger {
    old: Electromag,
    old_ids: ElectromagIds,
    ghosts: Communicator<Refiner>,
    init: Communicator<Refiner>,
    sync: Communicator<Synchronizer>,
    snapshots: IndexMap<usize, f64>,
    registered: bool,
}

impl MhdMessenger {
    /// Messenger name.
    pub const NAME: &'static str = "MHDModel-MHDModel";

    /// Messenger registering its old E/B buffers with `resources`.
    pub fn new(resources: &mut ResourcesManager) -> Result<Self, MessengerError> {
        let old = Electromag::new(format!("{}_EM_old", Self::NAME));
        let old_ids = old.register(resources)?;
        Ok(Self {
            old,
            old_ids,
            ghosts: Communicator::default(),
            init: Communicator::default(),
            sync: Communicator::default(),
            snapshots: IndexMap::new(),
            registered: false,
        })
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
        patch: &mut Patch,
        time: f64,
    ) -> Result<(), MessengerError> {
        self.old_ids.allocate(resources, patch, time)?;
        Ok(())
    }

    /// Wire the communicators. Both infos must be MHD.
    pub fn register_quantities(
        &mut self,
        from_coarser: MessengerInfo,
        from_finer: MessengerInfo,
        resources: &ResourcesManager,
    ) -> Result<(), MessengerError> {
        let wrong = || MessengerError::WrongPhysics {
            messenger: Self::NAME.to_string(),
            expected: "MHD messenger infos",
        };
        let fine = from_coarser.as_mhd().ok_or_else(wrong)?;
        let coarse = from_finer.as_mhd().ok_or_else(wrong)?;
        let spatial: Arc<dyn RefineOperator> = Arc::new(FieldLinearRefine);
        let time: Arc<dyn TimeInterpolateOperator> = Arc::new(FieldLinearTimeInterpolate);
        let coarsen: Arc<dyn CoarsenOperator> = Arc::new(FieldCoarsen);

        let mut ghosts = RefineAlgorithm::new();
        if let Some(b) = &coarse.model_magnetic {
            for ghost in &fine.ghost_magnetic {
                let refiner = make_refiner(
                    ghost,
                    b,
                    self.old.magnetic(),
                    resources,
                    spatial.clone(),
                    time.clone(),
                );
                for item in refiner.algorithm().items() {
                    ghosts.register_refine(item.clone());
                }
            }
        }
        if let Some(e) = &coarse.model_electric {
            for ghost in &fine.ghost_electric {
                let refiner = make_refiner(
                    ghost,
                    e,
                    self.old.electric(),
                    resources,
                    spatial.clone(),
                    time.clone(),
                );
                for item in refiner.algorithm().items() {
                    ghosts.register_refine(item.clone());
                }
            }
        }
        let mut init = RefineAlgorithm::new();
        let mut sync = CoarsenAlgorithm::new();
        for algorithm in [&mut ghosts, &mut init] {
            register_fluid_refine(algorithm, fine, coarse, resources, &spatial);
        }
        for (f, c) in [
            (&fine.model_magnetic, &coarse.model_magnetic),
            (&fine.model_electric, &coarse.model_electric),
        ] {
            if let (Some(f), Some(c)) = (f, c) {
                register_vector_refine(&mut init, f, c, resources, &spatial);
                register_vector_coarsen(&mut sync, f, c, resources, &coarsen);
            }
        }
        if let (Some(f), Some(c)) = (&fine.model_velocity, &coarse.model_velocity) {
            register_vector_coarsen(&mut sync, f, c, resources, &coarsen);
        }
        if let (Some(f), Some(c)) = (&fine.model_density, &coarse.model_density) {
            register_scalar_coarsen(&mut sync, f, c, Quantity::Rho, resources, &coarsen);
        }
        self.ghosts = Communicator::new(ghosts);
        self.init = Communicator::new(init);
        self.sync = Communicator::new(sync);
        self.registered = true;
        debug!(
            messenger = Self::NAME,
            ghosts = self.ghosts.algorithm().items().len(),
            "quantities registered"
        );
        Ok(())
    }

    /// Rebuild the schedules of `level`.
    pub fn register_level(
        &mut self,
        hierarchy: &PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        self.require_registered()?;
        let ghosts = self
            .ghosts
            .algorithm()
            .create_ghost_schedule(hierarchy, level, level > 0)?;
        self.ghosts.add(ghosts, level);
        if level > 0 {
            let sync = self.sync.algorithm().create_schedule(hierarchy, level)?;
            self.sync.add(sync, level);
        }
        Ok(())
    }

    /// Drop the schedules of levels finer than `level`.
    pub fn remove_finer(&mut self, level: usize) {
        self.ghosts.remove_finer(level);
        self.init.remove_finer(level);
        self.sync.remove_finer(level);
    }

    /// Fill the rebuilt `level` from `old_level` and the coarser level.
    pub fn regrid(
        &mut self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        old_level: &PatchLevel,
        time: f64,
    ) -> Result<(), MessengerError> {
        self.require_registered()?;
        let schedule = self
            .init
            .algorithm()
            .create_regrid_schedule(hierarchy, level, old_level)?;
        schedule.fill_data_from_old(hierarchy, old_level, time)?;
        self.init.add(schedule, level);
        self.register_level(hierarchy, level)?;
        info!(messenger = Self::NAME, level, "level regridded");
        Ok(())
    }

    /// First fill of the new `level` from the coarser level.
    pub fn init_level(
        &mut self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<(), MessengerError> {
        self.require_registered()?;
        if level == 0 {
            return Err(MessengerError::NoCoarserLevel {
                messenger: Self::NAME.to_string(),
                level,
            });
        }
        let schedule = self.init.algorithm().create_init_schedule(hierarchy, level)?;
        schedule.fill_data(hierarchy, time)?;
        self.init.add(schedule, level);
        self.register_level(hierarchy, level)?;
        info!(messenger = Self::NAME, level, "level initialized");
        Ok(())
    }

    /// Snapshot the model E/B of `level`.
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

    /// Fill every ghost node of `level` at `time`.
    pub fn fill_ghosts(
        &self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<(), MessengerError> {
        debug_assert!(
            level == 0 || self.snapshots.contains_key(&(level - 1)),
            "no old snapshot of level {} before filling level {level}",
            level.saturating_sub(1)
        );
        let schedule = self
            .ghosts
            .find_schedule(level)
            .ok_or_else(|| MessengerError::MissingSchedule {
                quantity: "MHD fields".to_string(),
                level,
            })?;
        schedule.fill_data(hierarchy, time)?;
        Ok(())
    }

    /// Ghost fill of the coarsest level, from same-level neighbours.
    pub fn fill_root_ghosts(
        &self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
        time: f64,
    ) -> Result<(), MessengerError> {
        self.fill_ghosts(hierarchy, level, time)
    }

    /// Restrict `level` onto the coarser level.
    pub fn synchronize(
        &self,
        hierarchy: &mut PatchHierarchy,
        level: usize,
    ) -> Result<(), MessengerError> {
        if level == 0 {
            return Ok(());
        }
        let schedule = self
            .sync
            .find_schedule(level)
            .ok_or_else(|| MessengerError::MissingSchedule {
                quantity: "MHD fields".to_string(),
                level,
            })?;
        schedule.fill_data(hierarchy)?;
        Ok(())
    }

    /// Ids moved by the ghost schedule of `level`.
    pub fn ghost_schedule_ids(
        &self,
        level: usize,
    ) -> Vec<(ResourceId, ResourceId, Option<ResourceId>)> {
        self.ghosts
            .find_schedule(level)
            .map(|s| s.ids())
            .unwrap_or_default()
    }
}

/// Same-time refine items of density and velocity.
fn register_fluid_refine(
    algorithm: &mut RefineAlgorithm,
    fine: &MhdMessengerInfo,
    coarse: &MhdMessengerInfo,
    resources: &ResourcesManager,
    spatial: &Arc<dyn RefineOperator>,
) {
    if let (Some(f), Some(c)) = (&fine.model_velocity, &coarse.model_velocity) {
        register_vector_refine(algorithm, f, c, resources, spatial);
    }
    if let (Some(f), Some(c)) = (&fine.model_density, &coarse.model_density) {
        register_scalar_refine(algorithm, f, c, Quantity::Rho, resources, spatial);
    }
}
