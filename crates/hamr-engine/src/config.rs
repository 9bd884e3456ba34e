//! Typed simulation parameters read from a job dictionary.
//!
//! The `simulation` node of a job holds the run parameters; the physical
//! models read their own root nodes (`electromag`, `ions`, `electrons`,
//! `mhd`). A minimal job:
//!
//! ```json
//! {
//!   "simulation": {
//!     "time_step_nbr": 100,
//!     "time_step": 0.005,
//!     "grid": { "nbr_cells": 64, "meshsize": 0.2 },
//!     "AMR": {
//!       "max_nbr_levels": 2,
//!       "refinement_boxes": { "L0": { "B0": { "lower": 16, "upper": 47 } } }
//!     }
//!   }
//! }
//! ```
//!
//! Refinement boxes of `"L<n>"` are given in the index space of level `n`
//! and describe level `n + 1`.

use std::path::PathBuf;

use hamr_amr::REFINEMENT_RATIO;
use hamr_core::{AmrBox, Dict, DictError};
use hamr_solver::Pusher;

use crate::error::SimulatorError;
use crate::time_refinement::GriddingConfig;

/// Gradient tagging parameters (`AMR.tagging`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TaggingConfig {
    /// Jump of the magnetic field above which a cell is refined.
    pub threshold: f64,
    /// When to rebuild levels and how far to grow tags.
    pub gridding: GriddingConfig,
}

/// Diagnostic output (`diagnostics`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiagnosticsConfig {
    /// Output directory.
    pub dir: PathBuf,
    /// Coarse steps between two dumps.
    pub every: usize,
}

/// Run parameters of a simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationConfig {
    /// Number of coarse steps.
    pub time_step_nbr: usize,
    /// Coarse time step.
    pub time_step: f64,
    /// Level-0 cells.
    pub nbr_cells: usize,
    /// Level-0 mesh size.
    pub mesh_size: f64,
    /// Coordinate of the domain's left edge.
    pub origin: f64,
    /// Particle shape order.
    pub interp_order: usize,
    /// Children of a split particle.
    pub refined_particle_nbr: usize,
    /// Levels the hierarchy may hold.
    pub max_nbr_levels: usize,
    /// Largest patch, in cells.
    pub max_patch_size: Option<usize>,
    /// First level advanced by the hybrid model; coarser levels are MHD.
    pub hybrid_start_level: usize,
    /// Boxes of level `n + 1` at index `n`, in the index space of level
    /// `n + 1`.
    pub refinement_boxes: Vec<Vec<AmrBox>>,
    /// Tag-driven refinement.
    pub tagging: Option<TaggingConfig>,
    /// Ion pusher.
    pub pusher: Pusher,
    /// Diagnostic output.
    pub diagnostics: Option<DiagnosticsConfig>,
}

fn invalid(key: &str, reason: impl Into<String>) -> SimulatorError {
    SimulatorError::InvalidParameter {
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn positive(key: &str, value: f64) -> Result<f64, SimulatorError> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(invalid(key, format!("must be positive, got {value}")))
    }
}

/// Optional node: absent is `None`, a leaf is an error.
fn optional_node<'a>(dict: &'a Dict, key: &str) -> Result<Option<&'a Dict>, DictError> {
    if dict.contains(key) {
        dict.node(key).map(Some)
    } else {
        Ok(None)
    }
}

impl SimulationConfig {
    /// Read the `simulation` node of `job`.
    pub fn from_dict(job: &Dict) -> Result<Self, SimulatorError> {
        let sim = job.node("simulation")?;

        let time_step_nbr: usize = sim.value("time_step_nbr")?;
        if time_step_nbr == 0 {
            return Err(invalid("simulation.time_step_nbr", "must be at least 1"));
        }
        let time_step = match (sim.contains("time_step"), sim.contains("final_time")) {
            (true, _) => sim.value("time_step")?,
            (false, true) => sim.value::<f64>("final_time")? / time_step_nbr as f64,
            (false, false) => {
                return Err(DictError::MissingKey {
                    key: "time_step".to_string(),
                }
                .into())
            }
        };
        let time_step = positive("simulation.time_step", time_step)?;

        let boundary: String = sim.value_or("boundary_type", "periodic".to_string())?;
        if boundary != "periodic" {
            return Err(invalid(
                "simulation.boundary_type",
                format!("'{boundary}' is not supported, only 'periodic' is"),
            ));
        }

        let grid = sim.node("grid")?;
        let nbr_cells: usize = grid.value("nbr_cells")?;
        if nbr_cells == 0 {
            return Err(invalid("simulation.grid.nbr_cells", "must be at least 1"));
        }
        let mesh_size = positive("simulation.grid.meshsize", grid.value("meshsize")?)?;
        let origin: f64 = grid.value_or("origin", 0.0)?;

        let interp_order: usize = sim.value_or("interp_order", 1)?;
        if interp_order != 1 {
            return Err(invalid(
                "simulation.interp_order",
                format!("order {interp_order} is not supported, only 1 is"),
            ));
        }
        let refined_particle_nbr: usize = sim.value_or("refined_particle_nbr", 2)?;

        let pusher: String = match optional_node(sim, "algo")? {
            Some(algo) => algo.value_or("pusher", "modified_boris".to_string())?,
            None => "modified_boris".to_string(),
        };
        let pusher = pusher.parse()?;

        let mut config = Self {
            time_step_nbr,
            time_step,
            nbr_cells,
            mesh_size,
            origin,
            interp_order,
            refined_particle_nbr,
            max_nbr_levels: 1,
            max_patch_size: None,
            hybrid_start_level: 0,
            refinement_boxes: Vec::new(),
            tagging: None,
            pusher,
            diagnostics: None,
        };
        if let Some(amr) = optional_node(sim, "AMR")? {
            config.read_amr(amr)?;
        }
        if let Some(diag) = optional_node(sim, "diagnostics")? {
            let every: usize = diag.value_or("every", 1)?;
            config.diagnostics = Some(DiagnosticsConfig {
                dir: PathBuf::from(diag.value::<String>("dir")?),
                every: every.max(1),
            });
        }
        Ok(config)
    }

    fn read_amr(&mut self, amr: &Dict) -> Result<(), SimulatorError> {
        self.max_nbr_levels = amr.value_or("max_nbr_levels", 1)?;
        if self.max_nbr_levels == 0 {
            return Err(invalid("simulation.AMR.max_nbr_levels", "must be at least 1"));
        }
        if amr.contains("max_patch_size") {
            self.max_patch_size = Some(amr.value("max_patch_size")?);
        }
        self.hybrid_start_level = amr.value_or("hybrid_start_level", 0)?;
        if self.hybrid_start_level >= self.max_nbr_levels {
            return Err(invalid(
                "simulation.AMR.hybrid_start_level",
                format!(
                    "level {} does not exist with {} levels",
                    self.hybrid_start_level, self.max_nbr_levels
                ),
            ));
        }

        if let Some(boxes) = optional_node(amr, "refinement_boxes")? {
            for level in 0..self.max_nbr_levels - 1 {
                let key = format!("L{level}");
                let Some(node) = optional_node(boxes, &key)? else {
                    break;
                };
                let mut level_boxes = Vec::new();
                for name in node.keys() {
                    let b = node.node(name)?;
                    let coarse = AmrBox::new(b.value("lower")?, b.value("upper")?);
                    if coarse.is_empty() {
                        return Err(invalid(
                            &format!("simulation.AMR.refinement_boxes.{key}.{name}"),
                            format!("box {coarse} is empty"),
                        ));
                    }
                    level_boxes.push(coarse.refine(REFINEMENT_RATIO));
                }
                self.refinement_boxes.push(level_boxes);
            }
            for key in boxes.keys() {
                let coarse_level = key.strip_prefix('L').and_then(|n| n.parse::<usize>().ok());
                if !coarse_level.is_some_and(|n| n < self.refinement_boxes.len()) {
                    return Err(invalid(
                        &format!("simulation.AMR.refinement_boxes.{key}"),
                        format!(
                            "not a coarse level with boxes for all coarser levels in {} levels",
                            self.max_nbr_levels
                        ),
                    ));
                }
            }
        }

        if let Some(tagging) = optional_node(amr, "tagging")? {
            let defaults = GriddingConfig::default();
            let buffer: i32 = tagging.value_or("buffer", defaults.tag_buffer)?;
            if buffer < 0 {
                return Err(invalid("simulation.AMR.tagging.buffer", "must not be negative"));
            }
            let regrid_interval: usize =
                tagging.value_or("regrid_interval", defaults.regrid_interval as usize)?;
            self.tagging = Some(TaggingConfig {
                threshold: positive(
                    "simulation.AMR.tagging.threshold",
                    tagging.value("threshold")?,
                )?,
                gridding: GriddingConfig {
                    regrid_interval: regrid_interval as u64,
                    tag_buffer: buffer,
                },
            });
        }
        Ok(())
    }

    /// Time reached after every step.
    pub fn final_time(&self) -> f64 {
        self.time_step * self.time_step_nbr as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(simulation: &str) -> Dict {
        Dict::from_json_str(&format!(r#"{{ "simulation": {simulation} }}"#)).unwrap()
    }

    const MINIMAL: &str = r#"{
        "time_step_nbr": 10,
        "time_step": 0.01,
        "grid": { "nbr_cells": 40, "meshsize": 0.1 }
    }"#;

    #[test]
    fn defaults_follow_a_periodic_single_level_run() {
        let config = SimulationConfig::from_dict(&job(MINIMAL)).unwrap();
        assert_eq!(config.time_step_nbr, 10);
        assert_eq!(config.max_nbr_levels, 1);
        assert_eq!(config.refined_particle_nbr, 2);
        assert_eq!(config.interp_order, 1);
        assert_eq!(config.pusher, Pusher::ModifiedBoris);
        assert_eq!(config.origin, 0.0);
        assert!(config.refinement_boxes.is_empty());
        assert!(config.tagging.is_none() && config.diagnostics.is_none());
    }

    #[test]
    fn final_time_gives_the_time_step() {
        let config = SimulationConfig::from_dict(&job(
            r#"{ "time_step_nbr": 4, "final_time": 1.0,
                 "grid": { "nbr_cells": 8, "meshsize": 0.5 } }"#,
        ))
        .unwrap();
        assert_eq!(config.time_step, 0.25);
        assert_eq!(config.final_time(), 1.0);
    }

    #[test]
    fn refinement_boxes_are_refined_into_the_finer_index_space() {
        let config = SimulationConfig::from_dict(&job(
            r#"{ "time_step_nbr": 1, "time_step": 0.01,
                 "grid": { "nbr_cells": 64, "meshsize": 0.1 },
                 "AMR": { "max_nbr_levels": 3,
                          "refinement_boxes": {
                              "L0": { "B0": { "lower": 10, "upper": 50 } },
                              "L1": { "B0": { "lower": 30, "upper": 60 } } } } }"#,
        ))
        .unwrap();
        assert_eq!(
            config.refinement_boxes,
            vec![vec![AmrBox::new(20, 101)], vec![AmrBox::new(60, 121)]]
        );
    }

    #[test]
    fn boxes_beyond_the_last_level_are_rejected() {
        let err = SimulationConfig::from_dict(&job(
            r#"{ "time_step_nbr": 1, "time_step": 0.01,
                 "grid": { "nbr_cells": 64, "meshsize": 0.1 },
                 "AMR": { "max_nbr_levels": 2,
                          "refinement_boxes": {
                              "L1": { "B0": { "lower": 30, "upper": 60 } } } } }"#,
        ))
        .unwrap_err();
        assert!(matches!(err, SimulatorError::InvalidParameter { .. }), "{err}");
    }

    #[test]
    fn unsupported_parameters_are_rejected() {
        for sim in [
            r#"{ "time_step_nbr": 1, "time_step": 0.01, "interp_order": 2,
                 "grid": { "nbr_cells": 8, "meshsize": 0.1 } }"#,
            r#"{ "time_step_nbr": 1, "time_step": 0.01, "boundary_type": "open",
                 "grid": { "nbr_cells": 8, "meshsize": 0.1 } }"#,
            r#"{ "time_step_nbr": 1, "time_step": -0.01,
                 "grid": { "nbr_cells": 8, "meshsize": 0.1 } }"#,
        ] {
            assert!(matches!(
                SimulationConfig::from_dict(&job(sim)),
                Err(SimulatorError::InvalidParameter { .. })
            ));
        }
        let err = SimulationConfig::from_dict(&job(
            r#"{ "time_step_nbr": 1, "time_step": 0.01, "algo": { "pusher": "leapfrog" },
                 "grid": { "nbr_cells": 8, "meshsize": 0.1 } }"#,
        ))
        .unwrap_err();
        assert!(matches!(err, SimulatorError::Solver(_)));
    }

    #[test]
    fn a_missing_grid_is_a_configuration_error() {
        let err =
            SimulationConfig::from_dict(&job(r#"{ "time_step_nbr": 1, "time_step": 0.01 }"#))
                .unwrap_err();
        assert!(matches!(
            err,
            SimulatorError::Config(DictError::MissingKey { ref key }) if key == "grid"
        ));
    }

    #[test]
    fn tagging_and_diagnostics_are_read() {
        let config = SimulationConfig::from_dict(&job(
            r#"{ "time_step_nbr": 1, "time_step": 0.01,
                 "grid": { "nbr_cells": 64, "meshsize": 0.1 },
                 "AMR": { "max_nbr_levels": 2, "tagging": { "threshold": 0.1, "buffer": 1 } },
                 "diagnostics": { "dir": "out", "every": 5 } }"#,
        ))
        .unwrap();
        let tagging = config.tagging.unwrap();
        assert_eq!(tagging.threshold, 0.1);
        assert_eq!(tagging.gridding.tag_buffer, 1);
        assert_eq!(tagging.gridding.regrid_interval, 4);
        assert_eq!(
            config.diagnostics,
            Some(DiagnosticsConfig {
                dir: PathBuf::from("out"),
                every: 5
            })
        );
    }
}
