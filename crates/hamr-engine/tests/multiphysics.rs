//! Level-range registration and a two-level hybrid advance.

use hamr_amr::PatchHierarchy;
use hamr_core::AmrBox;
use hamr_engine::{IntegratorError, MultiPhysicsIntegrator, Registered, TimeRefinementIntegrator};
use hamr_messenger::{make_descriptors, MessengerFactory};
use hamr_model::{HybridModel, MhdModel};
use hamr_solver::{SolverMhd, SolverPpc};
use hamr_test_utils::{periodic_hierarchy, uniform_hybrid_model, uniform_mhd_model};

fn factory() -> MessengerFactory {
    MessengerFactory::new(make_descriptors(&[MhdModel::NAME, HybridModel::NAME]))
}

/// MHD on levels 0 and 1, hybrid on 2 and 3.
fn four_levels() -> MultiPhysicsIntegrator {
    let mut levels = MultiPhysicsIntegrator::new(3);
    levels.register_model(0, 1, uniform_mhd_model()).unwrap();
    levels.register_model(2, 3, uniform_hybrid_model(4)).unwrap();
    levels.register_and_init_solver(0, 1, SolverMhd).unwrap();
    levels
        .register_and_init_solver(2, 3, SolverPpc::default())
        .unwrap();
    levels.register_and_setup_messengers(&factory()).unwrap();
    levels
}

#[test]
fn every_level_knows_its_model_solver_and_messenger() {
    let levels = four_levels();
    let names: Vec<_> = (0..4)
        .map(|l| {
            (
                levels.model_name(l).unwrap(),
                levels.solver_name(l).unwrap(),
                levels.messenger_name(l).unwrap(),
            )
        })
        .collect();
    assert_eq!(
        names,
        vec![
            ("MHDModel", "MHDSolver", "MHDModel-MHDModel"),
            ("MHDModel", "MHDSolver", "MHDModel-MHDModel"),
            ("HybridModel", "PPC", "MHDModel-HybridModel"),
            ("HybridModel", "PPC", "HybridModel-HybridModel"),
        ]
    );
    assert_eq!(levels.model_range(3).unwrap(), (2, 3));
    assert_eq!(levels.solver_range(0).unwrap(), (0, 1));
}

#[test]
fn a_single_model_pairs_with_itself_on_every_level() {
    let mut levels = MultiPhysicsIntegrator::new(2);
    levels.register_model(0, 2, uniform_hybrid_model(2)).unwrap();
    levels
        .register_and_init_solver(0, 2, SolverPpc::default())
        .unwrap();
    levels.register_and_setup_messengers(&factory()).unwrap();
    for level in 0..3 {
        assert_eq!(
            levels.messenger_name(level).unwrap(),
            "HybridModel-HybridModel"
        );
    }
}

#[test]
fn max_level_number_zero_covers_the_root_level_only() {
    let mut levels = MultiPhysicsIntegrator::new(0);
    assert_eq!(levels.nbr_levels(), 1);
    assert_eq!(
        levels.register_model(0, 1, uniform_hybrid_model(1)),
        Err(IntegratorError::LevelOutOfRange {
            what: Registered::Model,
            level: 1,
            max_level: 0,
        })
    );
    levels.register_model(0, 0, uniform_hybrid_model(1)).unwrap();
    levels
        .register_and_init_solver(0, 0, SolverPpc::default())
        .unwrap();
    levels.register_and_setup_messengers(&factory()).unwrap();
    assert_eq!(levels.messenger_name(0).unwrap(), "HybridModel-HybridModel");
}

#[test]
fn model_ranges_must_be_ordered_in_bounds_and_disjoint() {
    let mut levels = MultiPhysicsIntegrator::new(2);
    assert_eq!(
        levels.register_model(2, 1, uniform_hybrid_model(1)),
        Err(IntegratorError::ReversedRange {
            what: Registered::Model,
            level_min: 2,
            level_max: 1,
        })
    );
    assert_eq!(
        levels.register_model(0, 3, uniform_hybrid_model(1)),
        Err(IntegratorError::LevelOutOfRange {
            what: Registered::Model,
            level: 3,
            max_level: 2,
        })
    );
    levels.register_model(0, 1, uniform_mhd_model()).unwrap();
    assert_eq!(
        levels.register_model(1, 2, uniform_hybrid_model(1)),
        Err(IntegratorError::Overlap {
            what: Registered::Model,
            level: 1,
        })
    );
}

#[test]
fn a_solver_must_advance_the_model_of_its_levels() {
    let mut levels = MultiPhysicsIntegrator::new(1);
    levels.register_model(0, 0, uniform_mhd_model()).unwrap();
    levels.register_model(1, 1, uniform_hybrid_model(1)).unwrap();
    let err = levels
        .register_and_init_solver(0, 1, SolverMhd)
        .unwrap_err();
    assert_eq!(
        err,
        IntegratorError::ModelMismatch {
            level: 1,
            model: "HybridModel".to_string(),
            solver_model: "MHDModel".to_string(),
        }
    );
}

#[test]
fn solvers_need_models_and_messengers_need_both() {
    let mut levels = MultiPhysicsIntegrator::new(1);
    assert_eq!(
        levels.register_and_init_solver(0, 0, SolverPpc::default()),
        Err(IntegratorError::Gap {
            what: Registered::Model,
            level: 0,
        })
    );
    levels.register_model(0, 1, uniform_hybrid_model(1)).unwrap();
    levels
        .register_and_init_solver(0, 0, SolverPpc::default())
        .unwrap();
    assert_eq!(
        levels.register_and_setup_messengers(&factory()),
        Err(IntegratorError::Gap {
            what: Registered::Solver,
            level: 1,
        })
    );
    assert_eq!(
        levels.messenger_name(0),
        Err(IntegratorError::MessengersNotReady { level: 0 })
    );
}

fn two_hybrid_levels() -> TimeRefinementIntegrator<MultiPhysicsIntegrator> {
    let mut hierarchy: PatchHierarchy = periodic_hierarchy(20, 2);
    hierarchy.make_level(1, &[AmrBox::new(10, 29)]).unwrap();
    let mut levels = MultiPhysicsIntegrator::new(1);
    levels.register_model(0, 1, uniform_hybrid_model(8)).unwrap();
    levels
        .register_and_init_solver(0, 1, SolverPpc::default())
        .unwrap();
    levels.register_and_setup_messengers(&factory()).unwrap();
    let mut integrator = TimeRefinementIntegrator::new(hierarchy, levels, 0.0);
    integrator.initialize_hierarchy().unwrap();
    integrator
}

#[test]
fn initialization_loads_particles_on_every_level() {
    let integrator = two_hybrid_levels();
    let model = integrator.strategy().model(1).unwrap();
    let particles = model.as_hybrid().unwrap().ids().unwrap().ions.populations[0].particles;
    for level in 0..2 {
        let level = integrator.hierarchy().level(level).unwrap();
        let count: usize = level
            .patches()
            .iter()
            .map(|p| p.particles(particles).unwrap().domain.len())
            .sum();
        assert!(count > 0);
    }
}

#[test]
fn two_levels_advance_in_lockstep() {
    let mut integrator = two_hybrid_levels();
    let dt = 0.001;
    for step in 1..=3 {
        let time = integrator.advance(dt).unwrap();
        assert!((time - step as f64 * dt).abs() < 1e-12);
    }
    let model = integrator.strategy().model(0).unwrap();
    let magnetic = model.as_hybrid().unwrap().ids().unwrap().electromag.magnetic;
    for level in 0..2 {
        for patch in integrator.hierarchy().level(level).unwrap().patches() {
            for id in magnetic {
                let field = patch.field(id).unwrap();
                assert!((field.time() - 3.0 * dt).abs() < 1e-12);
                assert!(field.values()[field.physical_range()]
                    .iter()
                    .all(|v| v.is_finite()));
            }
        }
    }
}
