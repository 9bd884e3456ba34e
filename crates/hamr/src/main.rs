//! The `hamr` command line.

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use hamr::prelude::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Uniform proton plasma in a constant field, run when no job is given.
const UNIFORM_PLASMA: &str = r#"{
    "simulation": {
        "time_step_nbr": 20,
        "time_step": 0.001,
        "grid": { "nbr_cells": 64, "meshsize": 0.2 },
        "AMR": {
            "max_nbr_levels": 2,
            "refinement_boxes": { "L0": { "B0": { "lower": 16, "upper": 47 } } }
        }
    },
    "electromag": {
        "magnetic": { "initializer": { "x_component": 1.0 } }
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
                "nbr_part_per_cell": 100,
                "charge": 1.0
            }
        }
    },
    "electrons": { "pressure_closure": { "name": "isothermal", "Te": 0.1 } }
}"#;

/// Hybrid PIC plasma simulation on AMR.
#[derive(Parser)]
#[command(name = "hamr")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Hybrid particle-in-cell plasma simulation on AMR", long_about = None)]
struct Cli {
    /// JSON job file; a built-in uniform plasma runs when omitted.
    config: Option<PathBuf>,

    /// Number of coarse steps, overriding the job.
    #[arg(long)]
    steps: Option<usize>,

    /// Diagnostic output directory, overriding the job.
    #[arg(long, value_name = "DIR")]
    diagnostics: Option<PathBuf>,
}

fn load_job(cli: &Cli) -> Result<Dict, Box<dyn Error>> {
    let text = match &cli.config {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?,
        None => UNIFORM_PLASMA.to_string(),
    };
    let mut job = Dict::from_json_str(&text)?;
    let simulation = job.node_mut("simulation");
    if let Some(steps) = cli.steps {
        simulation.insert("time_step_nbr", steps);
    }
    if let Some(dir) = &cli.diagnostics {
        simulation
            .node_mut("diagnostics")
            .insert("dir", dir.display().to_string());
    }
    Ok(job)
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let job = load_job(cli)?;
    let mut simulator = Simulator::from_dict(&job)?;
    let time = simulator.run()?;
    info!(
        time,
        steps = simulator.step_count(),
        levels = simulator.hierarchy().number_of_levels(),
        dumps = simulator.dumps(),
        "done"
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}
