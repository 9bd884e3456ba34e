//! Hybrid-hybrid messenger on a two-level periodic hierarchy.

mod common;

use std::ops::RangeInclusive;

use common::{hybrid_two_levels, rebuild_fine_level, TwoLevels, FINE_BOX};
use hamr_core::{AmrBox, Centering, VecFieldDescriptor, VectorQuantity};
use hamr_messenger::MessengerError;
use hamr_model::HybridModel;
use hamr_test_utils::{affine, coordinate, fill_vecfield, ghost_nodes, set_vecfield};

const TOL: f64 = 1e-12;

#[test]
fn messenger_names_its_models() {
    let TwoLevels { messenger, .. } = hybrid_two_levels();
    assert_eq!(messenger.name(), "HybridModel-HybridModel");
    assert_eq!(messenger.fine_model_name(), HybridModel::NAME);
    assert_eq!(messenger.coarse_model_name(), HybridModel::NAME);
    assert_eq!(messenger.as_hybrid().unwrap().first_level(), 0);
}

#[test]
fn fine_ghosts_follow_the_time_interpolated_coarse_profile() {
    let TwoLevels {
        setup,
        mut hierarchy,
        mut messenger,
        ..
    } = hybrid_two_levels();
    let em = setup.hybrid(0).ids().unwrap().electromag;
    for ids in [em.magnetic, em.electric] {
        set_vecfield(&mut hierarchy, 0, &ids, affine(2.0, 3.0), 0.0);
    }
    messenger
        .prepare_step(&setup.models[0], &mut hierarchy, 0)
        .unwrap();
    for ids in [em.magnetic, em.electric] {
        set_vecfield(&mut hierarchy, 0, &ids, affine(4.0, -1.0), 1.0);
    }

    let model = setup.hybrid(0);
    let hybrid = messenger.as_hybrid().unwrap();
    hybrid
        .fill_magnetic_ghosts(model.electromag().magnetic(), &mut hierarchy, 1, 0.5)
        .unwrap();
    hybrid
        .fill_electric_ghosts(model.electromag().electric(), &mut hierarchy, 1, 0.5)
        .unwrap();

    // halfway between 2x + 3 and 4x - 1
    let expected = affine(3.0, 1.0);
    let patch = hierarchy.level(1).unwrap().patch(0);
    for &id in em.magnetic.iter().chain(&em.electric) {
        let field = patch.field(id).unwrap();
        for a in ghost_nodes(FINE_BOX, 2, field.centering()) {
            let x = coordinate(&hierarchy, 1, field.centering(), a);
            let value = field.at_amr(a).unwrap();
            assert!(
                (value - expected(x)).abs() < TOL,
                "{:?} ghost {a}: {value} != {}",
                field.quantity(),
                expected(x)
            );
        }
    }
}

#[test]
fn coarse_fields_constant_in_time_give_the_same_ghosts_at_any_time() {
    let TwoLevels {
        setup,
        mut hierarchy,
        mut messenger,
        ..
    } = hybrid_two_levels();
    let b = setup.hybrid(0).ids().unwrap().electromag.magnetic;
    let f = affine(-1.5, 0.25);
    set_vecfield(&mut hierarchy, 0, &b, f, 0.0);
    messenger
        .prepare_step(&setup.models[0], &mut hierarchy, 0)
        .unwrap();
    set_vecfield(&mut hierarchy, 0, &b, f, 1.0);

    let descriptor = setup.hybrid(0).electromag().magnetic().clone();
    for t in [0.0, 0.25, 0.75, 1.0] {
        messenger
            .as_hybrid()
            .unwrap()
            .fill_magnetic_ghosts(&descriptor, &mut hierarchy, 1, t)
            .unwrap();
        let patch = hierarchy.level(1).unwrap().patch(0);
        for &id in &b {
            let field = patch.field(id).unwrap();
            for a in ghost_nodes(FINE_BOX, 2, field.centering()) {
                let x = coordinate(&hierarchy, 1, field.centering(), a);
                assert!((field.at_amr(a).unwrap() - f(x)).abs() < TOL);
            }
        }
    }
}

#[test]
fn solver_predictor_fields_get_ghosts_from_the_coarse_model() {
    let TwoLevels {
        setup,
        mut hierarchy,
        mut messenger,
        solver,
    } = hybrid_two_levels();
    let b = setup.hybrid(0).ids().unwrap().electromag.magnetic;
    let f = affine(0.5, 2.0);
    set_vecfield(&mut hierarchy, 0, &b, f, 0.0);
    messenger
        .prepare_step(&setup.models[0], &mut hierarchy, 0)
        .unwrap();
    messenger
        .as_hybrid()
        .unwrap()
        .fill_magnetic_ghosts(solver.predictor.magnetic(), &mut hierarchy, 1, 0.0)
        .unwrap();
    let field = hierarchy
        .level(1)
        .unwrap()
        .patch(0)
        .field(solver.ids.magnetic[2])
        .unwrap();
    for a in ghost_nodes(FINE_BOX, 2, field.centering()) {
        let x = coordinate(&hierarchy, 1, field.centering(), a);
        assert!((field.at_amr(a).unwrap() - f(x)).abs() < TOL);
    }
}

#[test]
fn registering_a_level_twice_builds_the_same_schedules() {
    let TwoLevels {
        hierarchy,
        mut messenger,
        ..
    } = hybrid_two_levels();
    let before = messenger.as_hybrid().unwrap().ghost_schedule_ids(1);
    assert!(!before.is_empty());
    messenger.register_level(&hierarchy, 1).unwrap();
    assert_eq!(messenger.as_hybrid().unwrap().ghost_schedule_ids(1), before);
    // every time-interpolated item reads the messenger's old snapshot
    assert!(before.iter().any(|(_, _, old)| old.is_some()));
}

#[test]
fn removing_finer_levels_drops_their_schedules() {
    let TwoLevels { mut messenger, .. } = hybrid_two_levels();
    messenger.remove_finer(0);
    let hybrid = messenger.as_hybrid().unwrap();
    assert!(hybrid.ghost_schedule_ids(1).is_empty());
    assert!(!hybrid.ghost_schedule_ids(0).is_empty());
}

#[test]
fn unregistered_field_is_reported() {
    let TwoLevels {
        mut hierarchy,
        messenger,
        ..
    } = hybrid_two_levels();
    let unknown = VecFieldDescriptor::new("unknown_B", VectorQuantity::B);
    let err = messenger
        .as_hybrid()
        .unwrap()
        .fill_magnetic_ghosts(&unknown, &mut hierarchy, 0, 0.0)
        .unwrap_err();
    assert!(matches!(err, MessengerError::UnregisteredQuantity { .. }));
}

#[test]
fn fill_without_a_schedule_is_reported() {
    let TwoLevels {
        setup,
        mut hierarchy,
        mut messenger,
        ..
    } = hybrid_two_levels();
    messenger.remove_finer(0);
    let err = messenger
        .as_hybrid()
        .unwrap()
        .fill_current_ghosts(setup.hybrid(0).current(), &mut hierarchy, 1, 0.0)
        .unwrap_err();
    assert_eq!(
        err,
        MessengerError::MissingSchedule {
            quantity: "J".to_string(),
            level: 1
        }
    );
}

#[test]
fn first_hybrid_level_has_no_coarser_level_to_init_from() {
    let TwoLevels {
        setup,
        mut hierarchy,
        mut messenger,
        ..
    } = hybrid_two_levels();
    let err = messenger
        .init_level(&setup.models[0], &mut hierarchy, 0, 0.0)
        .unwrap_err();
    assert!(matches!(err, MessengerError::NoCoarserLevel { level: 0, .. }));
}

#[test]
fn init_level_splits_coarse_particles_into_the_fine_level() {
    let TwoLevels {
        setup,
        mut hierarchy,
        mut messenger,
        ..
    } = hybrid_two_levels();
    setup.models[0].initialize(&mut hierarchy, 0, 0.0).unwrap();
    messenger
        .init_level(&setup.models[0], &mut hierarchy, 1, 0.0)
        .unwrap();

    let ids = setup.hybrid(0).ids().unwrap();
    let patch = hierarchy.level(1).unwrap().patch(0);
    let data = patch.particles(ids.ions.populations[0].particles).unwrap();
    assert!(!data.domain.is_empty());
    assert!(data.domain.iter().all(|p| FINE_BOX.contains(p.i_cell)));
    assert!(!data.level_ghost_old.is_empty());
    assert_eq!(data.level_ghost, data.level_ghost_old);
    let halo = [AmrBox::new(8, 9), AmrBox::new(30, 31)];
    assert!(data
        .level_ghost_old
        .iter()
        .all(|p| halo.iter().any(|b| b.contains(p.i_cell))));
    assert!(patch.field(ids.ions.density).unwrap().at_amr(20).unwrap() > 0.0);
}

#[test]
fn synchronize_restricts_fine_fields_onto_the_coarse_level() {
    let TwoLevels {
        setup,
        mut hierarchy,
        messenger,
        ..
    } = hybrid_two_levels();
    let b = setup.hybrid(0).ids().unwrap().electromag.magnetic;
    set_vecfield(&mut hierarchy, 0, &b, |_| 0.0, 0.0);
    let f = affine(1.0, 1.0);
    set_vecfield(&mut hierarchy, 1, &b, f, 0.0);
    messenger.synchronize(&mut hierarchy, 1).unwrap();

    let coarse = hierarchy.level(0).unwrap().patch(0);
    let bx = coarse.field(b[0]).unwrap();
    // coarse node 10 lies under the fine level
    let x = coordinate(&hierarchy, 0, bx.centering(), 10);
    assert!((bx.at_amr(10).unwrap() - f(x)).abs() < TOL);
    // coarse node 1 is not covered
    assert_eq!(bx.at_amr(1), Some(0.0));
}

/// Physical nodes of `amr_box` for `centering`.
fn physical_nodes(amr_box: AmrBox, centering: Centering) -> RangeInclusive<i32> {
    match centering {
        Centering::Primal => amr_box.lower..=amr_box.upper + 1,
        Centering::Dual => amr_box.lower..=amr_box.upper,
    }
}

#[test]
fn regrid_prefers_the_old_level_over_the_coarse_level() {
    let mut levels = hybrid_two_levels();
    let ids = levels.setup.hybrid(0).ids().unwrap().clone();
    let b = ids.electromag.magnetic;
    let pop = ids.ions.populations[0].particles;
    levels.setup.models[0]
        .initialize(&mut levels.hierarchy, 0, 0.0)
        .unwrap();
    set_vecfield(&mut levels.hierarchy, 0, &b, affine(2.0, 3.0), 0.0);
    levels
        .messenger
        .init_level(&levels.setup.models[0], &mut levels.hierarchy, 1, 0.0)
        .unwrap();
    fill_vecfield(&mut levels.hierarchy, 1, &b, 100.0);
    for patch in levels.hierarchy.level_mut(1).unwrap().patches_mut() {
        for p in &mut patch.particles_mut(pop).unwrap().domain {
            p.weight = 7.0;
        }
    }

    let new_box = AmrBox::new(18, 33);
    let old = rebuild_fine_level(&mut levels, 0, new_box);
    let TwoLevels {
        setup,
        mut hierarchy,
        mut messenger,
        ..
    } = levels;
    messenger
        .regrid(&setup.models[0], &mut hierarchy, 1, &old, 0.0)
        .unwrap();

    let patch = hierarchy.level(1).unwrap().patch(0);
    let expected = affine(2.0, 3.0);
    for &id in &b {
        let field = patch.field(id).unwrap();
        let centering = field.centering();
        let kept = physical_nodes(FINE_BOX, centering);
        let physical = physical_nodes(new_box, centering);
        for a in *physical.start() - 2..=*physical.end() + 2 {
            let value = field.at_amr(a).unwrap();
            if physical.contains(&a) && kept.contains(&a) {
                assert_eq!(value, 100.0, "{:?} node {a}", field.quantity());
            } else {
                let x = coordinate(&hierarchy, 1, centering, a);
                assert!(
                    (value - expected(x)).abs() < TOL,
                    "{:?} node {a}: {value} != {}",
                    field.quantity(),
                    expected(x)
                );
            }
        }
    }

    let overlap = AmrBox::new(18, 29);
    let old_in_overlap = old
        .patch(0)
        .particles(pop)
        .unwrap()
        .domain
        .iter()
        .filter(|p| overlap.contains(p.i_cell))
        .count();
    let domain = &patch.particles(pop).unwrap().domain;
    assert!(domain.iter().all(|p| new_box.contains(p.i_cell)));
    let (kept, refined): (Vec<&hamr_core::Particle>, Vec<_>) = domain.iter().partition(|p| overlap.contains(p.i_cell));
    assert_eq!(kept.len(), old_in_overlap);
    assert!(kept.iter().all(|p| p.weight == 7.0));
    assert!(!refined.is_empty());
    assert!(refined.iter().all(|p| p.weight != 7.0));
}
