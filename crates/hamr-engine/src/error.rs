//! Error types for the integrators and the simulator.

use std::error::Error;
use std::fmt;

use hamr_amr::HierarchyError;
use hamr_core::DictError;
use hamr_diagnostics::DiagnosticError;
use hamr_messenger::MessengerError;
use hamr_model::ModelError;
use hamr_solver::SolverError;

/// What a level range registers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Registered {
    /// A physical model.
    Model,
    /// A solver.
    Solver,
}

impl fmt::Display for Registered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model => f.write_str("model"),
            Self::Solver => f.write_str("solver"),
        }
    }
}

/// Errors raised while registering levels or advancing them.
#[derive(Clone, Debug, PartialEq)]
pub enum IntegratorError {
    /// Hierarchy access or schedule execution failed.
    Hierarchy(HierarchyError),
    /// A model failed.
    Model(ModelError),
    /// A messenger failed.
    Messenger(MessengerError),
    /// A solver failed.
    Solver(SolverError),
    /// `level_min > level_max`.
    ReversedRange {
        /// What was being registered.
        what: Registered,
        /// Lower bound.
        level_min: usize,
        /// Upper bound.
        level_max: usize,
    },
    /// A range reaches beyond the last level.
    LevelOutOfRange {
        /// What was being registered.
        what: Registered,
        /// Offending level.
        level: usize,
        /// Last valid level.
        max_level: usize,
    },
    /// A level is claimed by two ranges.
    Overlap {
        /// What was being registered.
        what: Registered,
        /// First level claimed twice.
        level: usize,
    },
    /// A level is claimed by no range.
    Gap {
        /// What is missing.
        what: Registered,
        /// First unclaimed level.
        level: usize,
    },
    /// A solver was registered on a level whose model it does not advance.
    ModelMismatch {
        /// Level number.
        level: usize,
        /// Model registered on the level.
        model: String,
        /// Model the solver advances.
        solver_model: String,
    },
    /// Messengers were requested before every level had its model and
    /// solver, or a level was used before messengers were set up.
    MessengersNotReady {
        /// Level number.
        level: usize,
    },
}

impl fmt::Display for IntegratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hierarchy(e) => write!(f, "hierarchy: {e}"),
            Self::Model(e) => write!(f, "model: {e}"),
            Self::Messenger(e) => write!(f, "messenger: {e}"),
            Self::Solver(e) => write!(f, "solver: {e}"),
            Self::ReversedRange {
                what,
                level_min,
                level_max,
            } => write!(f, "{what} range [{level_min}, {level_max}] is reversed"),
            Self::LevelOutOfRange {
                what,
                level,
                max_level,
            } => write!(f, "{what} range reaches level {level}, last level is {max_level}"),
            Self::Overlap { what, level } => {
                write!(f, "level {level} already has a {what}")
            }
            Self::Gap { what, level } => write!(f, "level {level} has no {what}"),
            Self::ModelMismatch {
                level,
                model,
                solver_model,
            } => write!(
                f,
                "level {level} runs '{model}' but the solver advances '{solver_model}'"
            ),
            Self::MessengersNotReady { level } => {
                write!(f, "messengers are not set up for level {level}")
            }
        }
    }
}

impl Error for IntegratorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Hierarchy(e) => Some(e),
            Self::Model(e) => Some(e),
            Self::Messenger(e) => Some(e),
            Self::Solver(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HierarchyError> for IntegratorError {
    fn from(e: HierarchyError) -> Self {
        Self::Hierarchy(e)
    }
}

impl From<ModelError> for IntegratorError {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}

impl From<MessengerError> for IntegratorError {
    fn from(e: MessengerError) -> Self {
        Self::Messenger(e)
    }
}

impl From<SolverError> for IntegratorError {
    fn from(e: SolverError) -> Self {
        Self::Solver(e)
    }
}

/// Errors raised while building or running a simulation.
#[derive(Debug)]
pub enum SimulatorError {
    /// The job dictionary is missing a key or holds a wrong type.
    Config(DictError),
    /// A job parameter is out of its valid range.
    InvalidParameter {
        /// Dotted key.
        key: String,
        /// What is wrong with it.
        reason: String,
    },
    /// Hierarchy construction failed.
    Hierarchy(HierarchyError),
    /// A model could not be built.
    Model(ModelError),
    /// Solver construction failed.
    Solver(SolverError),
    /// Level registration or advance failed.
    Integrator(IntegratorError),
    /// A diagnostic dump failed.
    Diagnostics(DiagnosticError),
}

impl fmt::Display for SimulatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "configuration: {e}"),
            Self::InvalidParameter { key, reason } => write!(f, "'{key}' {reason}"),
            Self::Hierarchy(e) => write!(f, "hierarchy: {e}"),
            Self::Model(e) => write!(f, "model: {e}"),
            Self::Solver(e) => write!(f, "solver: {e}"),
            Self::Integrator(e) => write!(f, "integrator: {e}"),
            Self::Diagnostics(e) => write!(f, "diagnostics: {e}"),
        }
    }
}

impl Error for SimulatorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Hierarchy(e) => Some(e),
            Self::Model(e) => Some(e),
            Self::Solver(e) => Some(e),
            Self::Integrator(e) => Some(e),
            Self::Diagnostics(e) => Some(e),
            Self::InvalidParameter { .. } => None,
        }
    }
}

impl From<DictError> for SimulatorError {
    fn from(e: DictError) -> Self {
        Self::Config(e)
    }
}

impl From<HierarchyError> for SimulatorError {
    fn from(e: HierarchyError) -> Self {
        Self::Hierarchy(e)
    }
}

impl From<ModelError> for SimulatorError {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}

impl From<SolverError> for SimulatorError {
    fn from(e: SolverError) -> Self {
        Self::Solver(e)
    }
}

impl From<IntegratorError> for SimulatorError {
    fn from(e: IntegratorError) -> Self {
        Self::Integrator(e)
    }
}

impl From<DiagnosticError> for SimulatorError {
    fn from(e: DiagnosticError) -> Self {
        Self::Diagnostics(e)
    }
}
