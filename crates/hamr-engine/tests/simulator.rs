//! Whole runs built from JSON jobs.

use std::path::PathBuf;

use hamr_core::{AmrBox, Dict};
use hamr_engine::{Simulator, SimulatorError};

const IONS: &str = r#"
    "ions": {
        "nbrPopulations": 1,
        "pop0": {
            "name": "protons",
            "mass": 1.0,
            "particle_initializer": {
                "density": 1.0,
                "thermal_velocity_x": 0.05,
                "thermal_velocity_y": 0.05,
                "thermal_velocity_z": 0.05,
                "nbr_part_per_cell": 20,
                "charge": 1.0,
                "seed": 7
            }
        }
    },
    "electrons": { "pressure_closure": { "name": "isothermal", "Te": 0.05 } }
"#;

fn job(simulation: &str, extra: &str) -> Dict {
    let extra = if extra.is_empty() {
        String::new()
    } else {
        format!(", {extra}")
    };
    Dict::from_json_str(&format!(
        r#"{{ "simulation": {simulation}, {IONS}{extra} }}"#
    ))
    .unwrap()
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hamr-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[test]
fn a_uniform_plasma_runs_every_step_and_dumps() {
    let dir = scratch_dir("uniform");
    let simulation = format!(
        r#"{{ "time_step_nbr": 4, "time_step": 0.002,
              "grid": {{ "nbr_cells": 16, "meshsize": 0.2 }},
              "diagnostics": {{ "dir": "{}", "every": 2 }} }}"#,
        dir.display()
    );
    let mut sim = Simulator::from_dict(&job(&simulation, "")).unwrap();
    assert_eq!(sim.hierarchy().number_of_levels(), 1);
    let time = sim.run().unwrap();
    assert!((time - 0.008).abs() < 1e-12);
    assert_eq!(sim.step_count(), 4);
    assert!(sim.is_finished());
    // initial state, then steps 2 and 4
    assert_eq!(sim.dumps(), 3);

    let fluid = std::fs::read_to_string(dir.join("fluid.jsonl")).unwrap();
    assert_eq!(fluid.lines().count(), 3 * 8);
    assert!(fluid.lines().any(|l| l.contains("\"/t/0/pl0/p0#0/ions/density\"")));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn refinement_boxes_build_a_second_hybrid_level() {
    let simulation = r#"{
        "time_step_nbr": 2, "time_step": 0.001,
        "grid": { "nbr_cells": 32, "meshsize": 0.2 },
        "AMR": { "max_nbr_levels": 2, "max_patch_size": 16,
                 "refinement_boxes": { "L0": { "B0": { "lower": 8, "upper": 23 } } } }
    }"#;
    let mut sim = Simulator::from_dict(&job(simulation, "")).unwrap();
    let level = sim.hierarchy().level(1).unwrap();
    assert_eq!(level.boxes(), vec![AmrBox::new(16, 31), AmrBox::new(32, 47)]);
    assert_eq!(sim.levels().messenger_name(1).unwrap(), "HybridModel-HybridModel");
    sim.run().unwrap();
    assert_eq!(sim.step_count(), 2);
    assert_eq!(sim.dumps(), 0);
}

#[test]
fn coarse_mhd_levels_feed_a_hybrid_level() {
    let simulation = r#"{
        "time_step_nbr": 2, "time_step": 0.001,
        "grid": { "nbr_cells": 20, "meshsize": 0.2 },
        "AMR": { "max_nbr_levels": 2, "hybrid_start_level": 1,
                 "refinement_boxes": { "L0": { "B0": { "lower": 5, "upper": 14 } } } }
    }"#;
    let mhd = r#""mhd": { "density": 1.0, "magnetic_x": 1.0, "temperature": 0.05 }"#;
    let mut sim = Simulator::from_dict(&job(simulation, mhd)).unwrap();
    let levels = sim.levels();
    assert_eq!(levels.model_name(0).unwrap(), "MHDModel");
    assert_eq!(levels.solver_name(1).unwrap(), "PPC");
    assert_eq!(levels.messenger_name(1).unwrap(), "MHDModel-HybridModel");
    let time = sim.run().unwrap();
    assert!((time - 0.002).abs() < 1e-12);
}

#[test]
fn a_missing_mhd_node_is_a_configuration_error() {
    let simulation = r#"{
        "time_step_nbr": 1, "time_step": 0.001,
        "grid": { "nbr_cells": 20, "meshsize": 0.2 },
        "AMR": { "max_nbr_levels": 2, "hybrid_start_level": 1 }
    }"#;
    let err = Simulator::from_dict(&job(simulation, "")).unwrap_err();
    assert!(matches!(err, SimulatorError::Model(_)), "{err}");
}

#[test]
fn magnetic_gradients_create_and_rebuild_a_level() {
    let simulation = r#"{
        "time_step_nbr": 2, "time_step": 0.001,
        "grid": { "nbr_cells": 20, "meshsize": 0.2 },
        "AMR": { "max_nbr_levels": 2,
                 "tagging": { "threshold": 0.25, "buffer": 1, "regrid_interval": 2 } }
    }"#;
    let electromag = r#""electromag": { "magnetic": { "initializer": {
        "x_component": 1.0,
        "y_component": { "sine": { "amplitude": 1.0, "wavelength": 4.0 } } } } }"#;
    let mut sim = Simulator::from_dict(&job(simulation, electromag)).unwrap();
    assert_eq!(sim.hierarchy().number_of_levels(), 2);
    sim.run().unwrap();
    assert_eq!(sim.hierarchy().number_of_levels(), 2);
    assert_eq!(sim.step_count(), 2);
}
