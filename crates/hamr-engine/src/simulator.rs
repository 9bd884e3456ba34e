//! A complete run: hierarchy, models, solvers, messengers and the
//! time-refinement driver, built from a job dictionary.
//!
//! Levels below `hybrid_start_level` are advanced by an MHD model, the
//! others by the hybrid model:
//!
//! ```text
//! hybrid_start_level = 1, max_nbr_levels = 3
//!   L0  MHDModel     MHDSolver  MHDModel-MHDModel
//!   L1  HybridModel  PPC        MHDModel-HybridModel
//!   L2  HybridModel  PPC        HybridModel-HybridModel
//! ```

use std::fs::File;
use std::io::BufWriter;

use hamr_amr::{GridGeometry, ParticleSplit, PatchHierarchy};
use hamr_core::Dict;
use hamr_diagnostics::{DiagnosticsManager, JsonDiagnosticWriter};
use hamr_messenger::{make_descriptors, MessengerFactory};
use hamr_model::{HybridModel, MhdModel, PhysicalModel};
use hamr_solver::{SolverMhd, SolverPpc};
use tracing::{info, warn};

use crate::config::SimulationConfig;
use crate::error::{IntegratorError, SimulatorError};
use crate::multiphysics::MultiPhysicsIntegrator;
use crate::tagging::GradientTagger;
use crate::time_refinement::TimeRefinementIntegrator;

/// Diagnostics written every `every` coarse steps.
#[derive(Debug)]
struct Output {
    manager: DiagnosticsManager<BufWriter<File>>,
    every: usize,
}

/// A configured and initialized simulation.
#[derive(Debug)]
pub struct Simulator {
    config: SimulationConfig,
    integrator: TimeRefinementIntegrator<MultiPhysicsIntegrator>,
    output: Option<Output>,
}

impl Simulator {
    /// Read the run parameters and the models from `job`, then build the
    /// simulation. The `mhd` node is only read when coarse levels are MHD.
    pub fn from_dict(job: &Dict) -> Result<Self, SimulatorError> {
        let config = SimulationConfig::from_dict(job)?;
        let hybrid = HybridModel::from_dict(job)?;
        let mhd = if config.hybrid_start_level > 0 {
            Some(MhdModel::from_dict(job)?)
        } else {
            None
        };
        Self::new(config, hybrid, mhd)
    }

    /// Build the hierarchy and every level of `config`, register `hybrid`
    /// from `hybrid_start_level` up and `mhd` below it, and initialize the
    /// data at time 0.
    pub fn new(
        config: SimulationConfig,
        hybrid: HybridModel,
        mhd: Option<MhdModel>,
    ) -> Result<Self, SimulatorError> {
        let hierarchy = build_hierarchy(&config)?;
        let nbr_levels = config.max_nbr_levels;
        let max_level = nbr_levels - 1;
        let hybrid_start = config.hybrid_start_level;

        let mut levels = MultiPhysicsIntegrator::new(max_level);
        if let Some(tagging) = &config.tagging {
            levels = levels.with_tagger(GradientTagger::new(tagging.threshold));
        }
        let model_names: &[&str] = match (hybrid_start, mhd) {
            (0, mhd) => {
                if mhd.is_some() {
                    warn!("hybrid model starts at level 0, MHD model ignored");
                }
                &[HybridModel::NAME]
            }
            (_, None) => {
                return Err(SimulatorError::InvalidParameter {
                    key: "mhd".to_string(),
                    reason: format!("levels below {hybrid_start} need an MHD model"),
                })
            }
            (_, Some(mhd)) => {
                levels.register_model(0, hybrid_start - 1, mhd)?;
                levels.register_and_init_solver(0, hybrid_start - 1, SolverMhd)?;
                &[MhdModel::NAME, HybridModel::NAME]
            }
        };
        levels.register_model(hybrid_start, max_level, hybrid)?;
        levels.register_and_init_solver(
            hybrid_start,
            max_level,
            SolverPpc::new(config.pusher),
        )?;
        let factory = MessengerFactory::new(make_descriptors(model_names))
            .with_split(ParticleSplit::new(config.refined_particle_nbr)?);
        levels.register_and_setup_messengers(&factory)?;

        let mut integrator = TimeRefinementIntegrator::new(hierarchy, levels, 0.0);
        if let Some(tagging) = &config.tagging {
            integrator = integrator.with_gridding(tagging.gridding);
        }
        integrator.initialize_hierarchy()?;

        let output = match &config.diagnostics {
            Some(diagnostics) => Some(Output {
                manager: DiagnosticsManager::new(JsonDiagnosticWriter::create(&diagnostics.dir)?),
                every: diagnostics.every.max(1),
            }),
            None => None,
        };
        info!(
            levels = integrator.hierarchy().number_of_levels(),
            max_levels = nbr_levels,
            hybrid_start,
            steps = config.time_step_nbr,
            dt = config.time_step,
            "simulation ready"
        );
        Ok(Self {
            config,
            integrator,
            output,
        })
    }

    /// Run parameters.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Hierarchy being advanced.
    pub fn hierarchy(&self) -> &PatchHierarchy {
        self.integrator.hierarchy()
    }

    /// Models, solvers and messengers of the levels.
    pub fn levels(&self) -> &MultiPhysicsIntegrator {
        self.integrator.strategy()
    }

    /// Current time.
    pub fn time(&self) -> f64 {
        self.integrator.time()
    }

    /// Coarse steps taken.
    pub fn step_count(&self) -> usize {
        self.integrator.step_count() as usize
    }

    /// Diagnostic dumps written so far.
    pub fn dumps(&self) -> usize {
        self.output.as_ref().map_or(0, |o| o.manager.dumps())
    }

    /// Whether every configured step has been taken.
    pub fn is_finished(&self) -> bool {
        self.step_count() >= self.config.time_step_nbr
    }

    /// Take one coarse step, dumping diagnostics if due. Returns the new
    /// time.
    pub fn advance(&mut self) -> Result<f64, SimulatorError> {
        let time = self.integrator.advance(self.config.time_step)?;
        let step = self.step_count();
        if self.output.as_ref().is_some_and(|o| step % o.every == 0) {
            self.dump()?;
        }
        Ok(time)
    }

    /// Take the remaining steps, dumping the initial state first when
    /// nothing was dumped yet. Returns the final time.
    pub fn run(&mut self) -> Result<f64, SimulatorError> {
        if self.step_count() == 0 && self.dumps() == 0 {
            self.dump()?;
        }
        while !self.is_finished() {
            self.advance()?;
        }
        info!(
            time = self.time(),
            steps = self.step_count(),
            dumps = self.dumps(),
            "simulation finished"
        );
        Ok(self.time())
    }

    /// Write diagnostics of the current state, if an output is configured.
    pub fn dump(&mut self) -> Result<(), SimulatorError> {
        let Some(output) = &mut self.output else {
            return Ok(());
        };
        let hierarchy = self.integrator.hierarchy();
        let levels = self.integrator.strategy();
        let models = (0..hierarchy.number_of_levels())
            .map(|level| levels.model(level))
            .collect::<Result<Vec<&PhysicalModel>, IntegratorError>>()?;
        output
            .manager
            .dump(hierarchy, &models, self.integrator.time())?;
        Ok(())
    }
}

/// Level 0 over the whole domain, then the configured refinement boxes.
fn build_hierarchy(config: &SimulationConfig) -> Result<PatchHierarchy, SimulatorError> {
    let geometry = GridGeometry::new(config.origin, config.mesh_size, config.nbr_cells, true)?;
    let domain = geometry.domain_box(0);
    let mut hierarchy = PatchHierarchy::new(geometry, config.max_nbr_levels);
    if let Some(size) = config.max_patch_size {
        hierarchy = hierarchy.with_max_patch_size(size);
    }
    hierarchy.make_level(0, &[domain])?;
    for (coarse, boxes) in config.refinement_boxes.iter().enumerate() {
        hierarchy.make_level(coarse + 1, boxes)?;
    }
    Ok(hierarchy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hamr_core::AmrBox;

    const UNIFORM_JOB: &str = r#"{
        "simulation": {
            "time_step_nbr": 2,
            "time_step": 0.001,
            "grid": { "nbr_cells": 16, "meshsize": 0.2 }
        },
        "ions": {
            "nbrPopulations": 1,
            "pop0": {
                "name": "protons",
                "mass": 1.0,
                "particle_initializer": {
                    "density": 1.0,
                    "thermal_velocity_x": 0.1,
                    "thermal_velocity_y": 0.1,
                    "thermal_velocity_z": 0.1,
                    "nbr_part_per_cell": 10,
                    "charge": 1.0
                }
            }
        },
        "electrons": { "pressure_closure": { "name": "isothermal", "Te": 0.1 } }
    }"#;

    #[test]
    fn boxes_beyond_level_zero_are_built_from_the_config() {
        let mut config =
            SimulationConfig::from_dict(&Dict::from_json_str(UNIFORM_JOB).unwrap()).unwrap();
        config.max_nbr_levels = 2;
        config.refinement_boxes = vec![vec![AmrBox::new(8, 23)]];
        let hierarchy = build_hierarchy(&config).unwrap();
        assert_eq!(hierarchy.number_of_levels(), 2);
        assert_eq!(hierarchy.level(1).unwrap().boxes(), vec![AmrBox::new(8, 23)]);
    }

    #[test]
    fn coarse_mhd_levels_need_an_mhd_model() {
        let job = Dict::from_json_str(UNIFORM_JOB).unwrap();
        let mut config = SimulationConfig::from_dict(&job).unwrap();
        config.max_nbr_levels = 2;
        config.hybrid_start_level = 1;
        let hybrid = HybridModel::from_dict(&job).unwrap();
        let err = Simulator::new(config, hybrid, None).unwrap_err();
        assert!(
            matches!(err, SimulatorError::InvalidParameter { ref key, .. } if key == "mhd"),
            "{err}"
        );
    }
}
