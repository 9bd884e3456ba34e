//! A single periodic level advanced by a solver through its messenger.

#![allow(dead_code)]

use hamr_amr::PatchHierarchy;
use hamr_core::dict::constant;
use hamr_messenger::{make_descriptors, Messenger, MessengerFactory, MessengerRegistration};
use hamr_model::{
    ElectromagInitializer, Electrons, HybridModel, IonPopulation, Ions, MaxwellianInitializer,
    PhysicalModel,
};
use hamr_solver::Solver;
use hamr_test_utils::{periodic_hierarchy, ModelSetup};

pub struct Level0 {
    pub setup: ModelSetup,
    pub hierarchy: PatchHierarchy,
    pub messenger: Messenger,
    pub solver: Solver,
}

/// Uniform protons in `B = (bx, 0, 0)`.
pub fn magnetized_hybrid_model(bx: f64, nbr_part_per_cell: usize) -> HybridModel {
    let ions = Ions::new(vec![IonPopulation::new(
        "protons",
        1.0,
        MaxwellianInitializer::uniform(1.0, 0.1, nbr_part_per_cell),
    )]);
    let fields = ElectromagInitializer {
        electric: [constant(0.0), constant(0.0), constant(0.0)],
        magnetic: [constant(bx), constant(0.0), constant(0.0)],
    };
    HybridModel::new(ions, Electrons::isothermal(0.1), fields, 0.0)
}

/// `model` alone on a periodic level 0 of `nbr_cells`, initialized at
/// t = 0 with its root ghosts filled.
pub fn level0(model: PhysicalModel, mut solver: Solver, nbr_cells: usize) -> Level0 {
    let name = model.name();
    let mut setup = ModelSetup::new(vec![model]);
    let mut hierarchy = periodic_hierarchy(nbr_cells, 1);
    solver.register_resources(&mut setup.resources).unwrap();

    let factory = MessengerFactory::new(make_descriptors(&[name]));
    let mut messenger = factory
        .create(
            &format!("{name}-{name}"),
            &setup.models[0],
            &setup.models[0],
            &mut setup.resources,
            0,
        )
        .unwrap();
    MessengerRegistration::register_quantities(
        &mut messenger,
        &setup.models[0],
        &setup.models[0],
        &solver,
        &setup.resources,
    )
    .unwrap();

    setup.allocate(&mut hierarchy, 0, 0, 0.0);
    for patch in hierarchy.level_mut(0).unwrap().patches_mut() {
        solver.allocate(&setup.resources, patch, 0.0).unwrap();
        messenger.allocate(&setup.resources, patch, 0.0).unwrap();
    }
    messenger.register_level(&hierarchy, 0).unwrap();
    setup.models[0].initialize(&mut hierarchy, 0, 0.0).unwrap();
    messenger
        .fill_root_ghosts(&setup.models[0], &mut hierarchy, 0, 0.0)
        .unwrap();
    Level0 {
        setup,
        hierarchy,
        messenger,
        solver,
    }
}

impl Level0 {
    /// Advance level 0 by `steps` steps of `dt` from t = 0.
    pub fn run(&mut self, steps: usize, dt: f64) {
        for n in 0..steps {
            self.solver
                .advance_level(
                    &mut self.hierarchy,
                    0,
                    &self.setup.models[0],
                    &self.messenger,
                    n as f64 * dt,
                    (n + 1) as f64 * dt,
                )
                .unwrap();
        }
    }
}
