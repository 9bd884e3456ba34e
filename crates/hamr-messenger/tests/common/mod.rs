//! Shared setup of the messenger integration tests.

#![allow(dead_code)]

use hamr_amr::{PatchHierarchy, PatchLevel, ResourcesManager};
use hamr_core::AmrBox;
use hamr_messenger::{
    make_descriptors, Messenger, MessengerError, MessengerFactory, MessengerInfo,
    MessengerRegistration, SolverQuantities,
};
use hamr_model::{Electromag, ElectromagIds, HybridModel, MhdModel};
use hamr_test_utils::{periodic_hierarchy, uniform_hybrid_model, uniform_mhd_model, ModelSetup};

/// A solver owning predictor fields that need ghosts.
pub struct PredictorSolver {
    pub model: &'static str,
    pub predictor: Electromag,
    pub ids: ElectromagIds,
}

impl PredictorSolver {
    pub fn new(resources: &mut ResourcesManager, model: &'static str) -> Self {
        let predictor = Electromag::new("EMPred");
        let ids = predictor.register(resources).unwrap();
        Self {
            model,
            predictor,
            ids,
        }
    }

    pub fn allocate(
        &self,
        resources: &ResourcesManager,
        hierarchy: &mut PatchHierarchy,
        level: usize,
    ) {
        for patch in hierarchy.level_mut(level).unwrap().patches_mut() {
            self.ids.allocate(resources, patch, 0.0).unwrap();
        }
    }
}

impl SolverQuantities for PredictorSolver {
    fn model_name(&self) -> &str {
        self.model
    }

    fn fill_messenger_info(&self, info: &mut MessengerInfo) -> Result<(), MessengerError> {
        let info = info.as_hybrid_mut().ok_or(MessengerError::WrongPhysics {
            messenger: "predictor solver".to_string(),
            expected: "a hybrid messenger info",
        })?;
        info.ghost_magnetic.push(self.predictor.magnetic().clone());
        info.ghost_electric.push(self.predictor.electric().clone());
        Ok(())
    }
}

/// A coarse level over 20 cells and a fine level over coarse cells 5..=14,
/// everything allocated and the messenger schedules built.
pub struct TwoLevels {
    pub setup: ModelSetup,
    pub hierarchy: PatchHierarchy,
    pub messenger: Messenger,
    pub solver: PredictorSolver,
}

/// Fine box of [`TwoLevels`].
pub const FINE_BOX: AmrBox = AmrBox {
    lower: 10,
    upper: 29,
};

fn allocate_messenger(
    messenger: &Messenger,
    resources: &ResourcesManager,
    hierarchy: &mut PatchHierarchy,
    level: usize,
) {
    for patch in hierarchy.level_mut(level).unwrap().patches_mut() {
        messenger.allocate(resources, patch, 0.0).unwrap();
    }
}

/// Replace the fine level of `levels` by one over `amr_box`, allocated
/// for `model` and the messenger, and return the level it replaced.
pub fn rebuild_fine_level(levels: &mut TwoLevels, model: usize, amr_box: AmrBox) -> PatchLevel {
    let old = levels
        .hierarchy
        .make_level(1, &[amr_box])
        .unwrap()
        .expect("a fine level to replace");
    levels.setup.allocate(&mut levels.hierarchy, 1, model, 0.0);
    levels
        .solver
        .allocate(&levels.setup.resources, &mut levels.hierarchy, 1);
    allocate_messenger(
        &levels.messenger,
        &levels.setup.resources,
        &mut levels.hierarchy,
        1,
    );
    old
}

/// Two hybrid levels bridged by the hybrid-hybrid messenger.
pub fn hybrid_two_levels() -> TwoLevels {
    let mut setup = ModelSetup::new(vec![uniform_hybrid_model(4).into()]);
    let mut hierarchy = periodic_hierarchy(20, 2);
    hierarchy.make_level(1, &[FINE_BOX]).unwrap();

    let factory = MessengerFactory::new(make_descriptors(&[HybridModel::NAME]));
    let mut messenger = factory
        .create(
            "HybridModel-HybridModel",
            &setup.models[0],
            &setup.models[0],
            &mut setup.resources,
            0,
        )
        .unwrap();
    let solver = PredictorSolver::new(&mut setup.resources, HybridModel::NAME);
    MessengerRegistration::register_quantities(
        &mut messenger,
        &setup.models[0],
        &setup.models[0],
        &solver,
        &setup.resources,
    )
    .unwrap();

    for level in 0..2 {
        setup.allocate(&mut hierarchy, level, 0, 0.0);
        solver.allocate(&setup.resources, &mut hierarchy, level);
        allocate_messenger(&messenger, &setup.resources, &mut hierarchy, level);
        messenger.register_level(&hierarchy, level).unwrap();
    }
    TwoLevels {
        setup,
        hierarchy,
        messenger,
        solver,
    }
}

/// An MHD level 0 under a hybrid level 1, bridged by the MHD-hybrid
/// messenger. Level 0 is initialized; level 1 is only allocated.
pub fn mhd_hybrid_two_levels() -> TwoLevels {
    let mut setup = ModelSetup::new(vec![
        uniform_mhd_model().into(),
        uniform_hybrid_model(4).into(),
    ]);
    let mut hierarchy = periodic_hierarchy(20, 2);
    hierarchy.make_level(1, &[FINE_BOX]).unwrap();

    let factory = MessengerFactory::new(make_descriptors(&[MhdModel::NAME, HybridModel::NAME]));
    let mut messenger = factory
        .create(
            "MHDModel-HybridModel",
            &setup.models[0],
            &setup.models[1],
            &mut setup.resources,
            1,
        )
        .unwrap();
    let solver = PredictorSolver::new(&mut setup.resources, HybridModel::NAME);
    MessengerRegistration::register_quantities(
        &mut messenger,
        &setup.models[0],
        &setup.models[1],
        &solver,
        &setup.resources,
    )
    .unwrap();

    setup.allocate(&mut hierarchy, 0, 0, 0.0);
    setup.allocate(&mut hierarchy, 1, 1, 0.0);
    solver.allocate(&setup.resources, &mut hierarchy, 1);
    for level in 0..2 {
        allocate_messenger(&messenger, &setup.resources, &mut hierarchy, level);
    }
    setup.models[0].initialize(&mut hierarchy, 0, 0.0).unwrap();
    TwoLevels {
        setup,
        hierarchy,
        messenger,
        solver,
    }
}
