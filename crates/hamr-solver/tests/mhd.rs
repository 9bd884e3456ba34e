//! MHD induction steps on a periodic level.

mod common;

use common::{level0, Level0};
use hamr_model::MhdIds;
use hamr_solver::SolverMhd;
use hamr_test_utils::{fill_vecfield, uniform_mhd_model};

fn mhd_level() -> Level0 {
    level0(uniform_mhd_model().into(), SolverMhd.into(), 16)
}

fn ids(level: &Level0) -> MhdIds {
    *level.setup.mhd(0).ids().unwrap()
}

#[test]
fn fluid_at_rest_keeps_its_field() {
    let mut level = mhd_level();
    let ids = ids(&level);
    level.run(4, 0.01);
    let patch = level.hierarchy.level(0).unwrap().patch(0);
    for (c, expected) in [1.0, 0.0, 0.0].into_iter().enumerate() {
        let b = patch.field(ids.magnetic[c]).unwrap();
        assert!(b.values().iter().all(|&v| v == expected));
        assert_eq!(b.time(), 0.04);
    }
}

#[test]
fn uniform_flow_gives_the_ideal_electric_field() {
    let mut level = mhd_level();
    let ids = ids(&level);
    fill_vecfield(&mut level.hierarchy, 0, &ids.velocity, 0.0);
    let patch = level.hierarchy.level_mut(0).unwrap().patch_mut(0);
    patch.field_mut(ids.velocity[1]).unwrap().fill(1.0);
    level.run(1, 0.01);

    // E = -V x B with V = (0, 1, 0) and B = (1, 0, 0)
    let patch = level.hierarchy.level(0).unwrap().patch(0);
    for (c, expected) in [0.0, 0.0, 1.0].into_iter().enumerate() {
        let e = patch.field(ids.electric[c]).unwrap();
        for i in e.physical_range() {
            assert!((e[i] - expected).abs() < 1e-12, "E{c}[{i}] = {}", e[i]);
        }
    }
    let bx = patch.field(ids.magnetic[0]).unwrap();
    assert!(bx.values().iter().all(|&v| v == 1.0));
}
