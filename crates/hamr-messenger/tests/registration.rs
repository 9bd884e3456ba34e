//! Messenger creation and quantity registration checks.

mod common;

use common::PredictorSolver;
use hamr_messenger::{make_descriptors, MessengerError, MessengerFactory, MessengerRegistration};
use hamr_model::{HybridModel, MhdModel};
use hamr_test_utils::{uniform_hybrid_model, uniform_mhd_model, ModelSetup};

fn setup() -> ModelSetup {
    ModelSetup::new(vec![
        uniform_mhd_model().into(),
        uniform_hybrid_model(2).into(),
    ])
}

fn factory() -> MessengerFactory {
    MessengerFactory::new(make_descriptors(&[MhdModel::NAME, HybridModel::NAME]))
}

#[test]
fn factory_builds_every_declared_messenger() {
    let mut setup = setup();
    let factory = factory();
    let names: Vec<String> = factory.names().collect();
    assert_eq!(
        names,
        ["MHDModel-MHDModel", "MHDModel-HybridModel", "HybridModel-HybridModel"]
    );
    let pairs = [(0, 0), (0, 1), (1, 1)];
    for (name, (coarse, fine)) in names.iter().zip(pairs) {
        let messenger = factory
            .create(
                name,
                &setup.models[coarse],
                &setup.models[fine],
                &mut setup.resources,
                1,
            )
            .unwrap();
        assert_eq!(messenger.name(), name.as_str());
    }
}

#[test]
fn unknown_messenger_name_is_rejected() {
    let mut setup = setup();
    let err = MessengerFactory::new(make_descriptors(&[HybridModel::NAME]))
        .create(
            "MHDModel-HybridModel",
            &setup.models[0],
            &setup.models[1],
            &mut setup.resources,
            1,
        )
        .unwrap_err();
    assert_eq!(
        err,
        MessengerError::UnknownMessenger {
            name: "MHDModel-HybridModel".to_string()
        }
    );
}

#[test]
fn models_must_match_the_messenger_name() {
    let mut setup = setup();
    let err = factory()
        .create(
            "MHDModel-HybridModel",
            &setup.models[1],
            &setup.models[1],
            &mut setup.resources,
            1,
        )
        .unwrap_err();
    assert!(matches!(err, MessengerError::NameMismatch { .. }));
}

#[test]
fn registration_checks_the_fine_model() {
    let mut setup = setup();
    let mut messenger = factory()
        .create(
            "MHDModel-MHDModel",
            &setup.models[0],
            &setup.models[0],
            &mut setup.resources,
            0,
        )
        .unwrap();
    let solver = PredictorSolver::new(&mut setup.resources, HybridModel::NAME);
    let err = MessengerRegistration::register_quantities(
        &mut messenger,
        &setup.models[0],
        &setup.models[1],
        &solver,
        &setup.resources,
    )
    .unwrap_err();
    assert_eq!(
        err,
        MessengerError::NameMismatch {
            what: "fine model",
            expected: MhdModel::NAME.to_string(),
            found: HybridModel::NAME.to_string(),
        }
    );
}

#[test]
fn registration_checks_the_solver_model() {
    let mut setup = setup();
    let mut messenger = factory()
        .create(
            "HybridModel-HybridModel",
            &setup.models[1],
            &setup.models[1],
            &mut setup.resources,
            0,
        )
        .unwrap();
    let solver = PredictorSolver::new(&mut setup.resources, MhdModel::NAME);
    let err = MessengerRegistration::register_quantities(
        &mut messenger,
        &setup.models[1],
        &setup.models[1],
        &solver,
        &setup.resources,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        MessengerError::NameMismatch {
            what: "solver model",
            ..
        }
    ));
}

#[test]
fn schedules_need_registered_quantities() {
    let mut setup = setup();
    let mut messenger = factory()
        .create(
            "HybridModel-HybridModel",
            &setup.models[1],
            &setup.models[1],
            &mut setup.resources,
            0,
        )
        .unwrap();
    let hierarchy = hamr_test_utils::periodic_hierarchy(10, 1);
    let err = messenger.register_level(&hierarchy, 0).unwrap_err();
    assert!(matches!(err, MessengerError::NotRegistered { .. }));
}

#[test]
fn empty_infos_match_the_messenger_sides() {
    let mut setup = setup();
    let messenger = factory()
        .create(
            "MHDModel-HybridModel",
            &setup.models[0],
            &setup.models[1],
            &mut setup.resources,
            1,
        )
        .unwrap();
    assert!(messenger.empty_info_from_coarser().as_hybrid().is_some());
    assert!(messenger.empty_info_from_finer().as_mhd().is_some());
}
