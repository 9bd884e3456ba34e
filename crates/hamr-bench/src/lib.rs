//! Benchmark profiles for the hamr simulator.
//!
//! - [`uniform_profile`]: a single periodic hybrid level
//! - [`refined_profile`]: the same plasma with a refined middle half

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use hamr_core::{Dict, DictError};

fn job(nbr_cells: usize, nbr_part_per_cell: usize, amr: &str) -> Result<Dict, DictError> {
    Dict::from_json_str(&format!(
        r#"{{
        "simulation": {{
            "time_step_nbr": 1000, "time_step": 0.001,
            "grid": {{ "nbr_cells": {nbr_cells}, "meshsize": 0.2 }}{amr}
        }},
        "electromag": {{ "magnetic": {{ "initializer": {{ "x_component": 1.0 }} }} }},
        "ions": {{ "nbrPopulations": 1, "pop0": {{
            "name": "protons",
            "particle_initializer": {{
                "density": 1.0,
                "thermal_velocity_x": 0.1, "thermal_velocity_y": 0.1, "thermal_velocity_z": 0.1,
                "nbr_part_per_cell": {nbr_part_per_cell}, "seed": 42 }} }} }},
        "electrons": {{ "pressure_closure": {{ "Te": 0.1 }} }}
    }}"#
    ))
}

/// Job of a uniform proton plasma over `nbr_cells` level-0 cells.
pub fn uniform_profile(nbr_cells: usize, nbr_part_per_cell: usize) -> Result<Dict, DictError> {
    job(nbr_cells, nbr_part_per_cell, "")
}

/// [`uniform_profile`] with a second level over the middle half of the
/// domain.
pub fn refined_profile(nbr_cells: usize, nbr_part_per_cell: usize) -> Result<Dict, DictError> {
    let lower = nbr_cells / 4;
    let upper = 3 * nbr_cells / 4 - 1;
    let amr = format!(
        r#", "AMR": {{ "max_nbr_levels": 2,
            "refinement_boxes": {{ "L0": {{
                "B0": {{ "lower": {lower}, "upper": {upper} }} }} }} }}"#
    );
    job(nbr_cells, nbr_part_per_cell, &amr)
}
