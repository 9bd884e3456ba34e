//! Hybrid PPC steps on a periodic level.

mod common;

use common::{level0, magnetized_hybrid_model, Level0};
use hamr_amr::PatchHierarchy;
use hamr_core::Centering;
use hamr_model::HybridIds;
use hamr_solver::{Solver, SolverError, SolverMhd, SolverPpc};

const NBR_CELLS: usize = 20;

/// Below the whistler limit `dx² / π` of the fixture mesh.
const STABLE_DT: f64 = 0.001;

fn hybrid_level() -> Level0 {
    level0(
        magnetized_hybrid_model(1.0, 10).into(),
        SolverPpc::default().into(),
        NBR_CELLS,
    )
}

fn ids(level: &Level0) -> HybridIds {
    level.setup.hybrid(0).ids().unwrap().clone()
}

/// Sum of the ion density over the primal nodes of one period.
fn density_over_one_period(hierarchy: &PatchHierarchy, ids: &HybridIds) -> f64 {
    let patch = hierarchy.level(0).unwrap().patch(0);
    let rho = patch.field(ids.ions.density).unwrap();
    (0..NBR_CELLS as i32).map(|a| rho.at_amr(a).unwrap()).sum()
}

fn domain_count(hierarchy: &PatchHierarchy, ids: &HybridIds) -> usize {
    let patch = hierarchy.level(0).unwrap().patch(0);
    patch
        .particles(ids.ions.populations[0].particles)
        .unwrap()
        .domain
        .len()
}

#[test]
fn periodic_steps_keep_every_particle() {
    let mut level = hybrid_level();
    let ids = ids(&level);
    let before = domain_count(&level.hierarchy, &ids);
    assert_eq!(before, 10 * NBR_CELLS);
    level.run(5, STABLE_DT);
    assert_eq!(domain_count(&level.hierarchy, &ids), before);
}

#[test]
fn density_over_a_period_is_conserved() {
    let mut level = hybrid_level();
    let ids = ids(&level);
    let before = density_over_one_period(&level.hierarchy, &ids);
    level.run(3, STABLE_DT);
    let after = density_over_one_period(&level.hierarchy, &ids);
    assert!((after - before).abs() < 1e-9 * before, "{after} != {before}");
}

#[test]
fn bx_is_left_untouched() {
    let mut level = hybrid_level();
    let ids = ids(&level);
    level.run(3, STABLE_DT);
    let patch = level.hierarchy.level(0).unwrap().patch(0);
    let bx = patch.field(ids.electromag.magnetic[0]).unwrap();
    assert_eq!(bx.centering(), Centering::Primal);
    assert!(bx.values().iter().all(|&v| v == 1.0));
}

#[test]
fn model_fields_and_particles_are_stamped_with_the_new_time() {
    let mut level = hybrid_level();
    let ids = ids(&level);
    level.run(1, 0.02);
    let patch = level.hierarchy.level(0).unwrap().patch(0);
    for &id in ids
        .electromag
        .magnetic
        .iter()
        .chain(&ids.electromag.electric)
        .chain(&ids.current)
    {
        assert_eq!(patch.field(id).unwrap().time(), 0.02);
    }
    let particles = patch.particles(ids.ions.populations[0].particles).unwrap();
    assert_eq!(particles.time, 0.02);
}

#[test]
fn transverse_fields_stay_small_for_a_uniform_plasma() {
    let mut level = hybrid_level();
    let ids = ids(&level);
    level.run(30, STABLE_DT);
    let patch = level.hierarchy.level(0).unwrap().patch(0);
    for &id in &ids.electromag.magnetic[1..] {
        let b = patch.field(id).unwrap();
        assert!(b.values().iter().all(|v| v.abs() < 0.1), "{:?}", b.quantity());
    }
}

#[test]
fn an_mhd_solver_refuses_a_hybrid_level() {
    let mut level = hybrid_level();
    let solver = Solver::from(SolverMhd);
    let err = solver
        .advance_level(
            &mut level.hierarchy,
            0,
            &level.setup.models[0],
            &level.messenger,
            0.0,
            0.01,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        SolverError::WrongPhysics {
            solver: "MHDSolver",
            ..
        }
    ));
}
