//! Error types for solvers.

use std::error::Error;
use std::fmt;

use hamr_amr::HierarchyError;
use hamr_messenger::MessengerError;
use hamr_model::ModelError;

/// Errors raised while configuring a solver or advancing a level.
#[derive(Clone, Debug, PartialEq)]
pub enum SolverError {
    /// Patch data access failed.
    Hierarchy(HierarchyError),
    /// The model could not resolve its quantities.
    Model(ModelError),
    /// A ghost fill or moment completion failed.
    Messenger(MessengerError),
    /// The pusher name is not known.
    UnknownPusher {
        /// Requested name.
        name: String,
    },
    /// A model, messenger or info of the other physics was supplied.
    WrongPhysics {
        /// Solver name.
        solver: &'static str,
        /// What was expected.
        expected: &'static str,
    },
    /// The solver was used before its resources were registered.
    NotRegistered {
        /// Solver name.
        solver: &'static str,
    },
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hierarchy(e) => write!(f, "solver data access: {e}"),
            Self::Model(e) => write!(f, "solver model access: {e}"),
            Self::Messenger(e) => write!(f, "solver communication: {e}"),
            Self::UnknownPusher { name } => write!(f, "unknown pusher '{name}'"),
            Self::WrongPhysics { solver, expected } => {
                write!(f, "{solver}: expected {expected}")
            }
            Self::NotRegistered { solver } => {
                write!(f, "{solver} used before its resources were registered")
            }
        }
    }
}

impl Error for SolverError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Hierarchy(e) => Some(e),
            Self::Model(e) => Some(e),
            Self::Messenger(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HierarchyError> for SolverError {
    fn from(e: HierarchyError) -> Self {
        Self::Hierarchy(e)
    }
}

impl From<ModelError> for SolverError {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}

impl From<MessengerError> for SolverError {
    fn from(e: MessengerError) -> Self {
        Self::Messenger(e)
    }
}
