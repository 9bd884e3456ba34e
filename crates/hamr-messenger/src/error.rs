//! Error types for messengers.

use std::error::Error;
use std::fmt;

use hamr_amr::HierarchyError;
use hamr_model::ModelError;

/// Errors raised by messenger creation, registration and fills.
#[derive(Clone, Debug, PartialEq)]
pub enum MessengerError {
    /// A schedule failed while executing or being built.
    Hierarchy(HierarchyError),
    /// A model failed while filling an info or recomputing moments.
    Model(ModelError),
    /// The factory does not know this messenger name.
    UnknownMessenger {
        /// Requested name.
        name: String,
    },
    /// A fill was requested for a quantity that was never registered
    /// with the messenger.
    UnregisteredQuantity {
        /// Messenger name.
        messenger: String,
        /// Quantity name.
        quantity: String,
    },
    /// No schedule was built for the level.
    MissingSchedule {
        /// Quantity or communicator name.
        quantity: String,
        /// Level number.
        level: usize,
    },
    /// A messenger info or model of the wrong physics was supplied.
    WrongPhysics {
        /// Messenger name.
        messenger: String,
        /// What was expected.
        expected: &'static str,
    },
    /// Names of a messenger, models and solver do not agree.
    NameMismatch {
        /// What is being compared.
        what: &'static str,
        /// Name required.
        expected: String,
        /// Name found.
        found: String,
    },
    /// An operation needs a coarser level the messenger does not serve.
    NoCoarserLevel {
        /// Messenger name.
        messenger: String,
        /// Level number.
        level: usize,
    },
    /// An operation was called before `register_quantities`.
    NotRegistered {
        /// Messenger name.
        messenger: String,
    },
}

impl fmt::Display for MessengerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hierarchy(e) => write!(f, "messenger data movement: {e}"),
            Self::Model(e) => write!(f, "messenger model access: {e}"),
            Self::UnknownMessenger { name } => write!(f, "unknown messenger '{name}'"),
            Self::UnregisteredQuantity {
                messenger,
                quantity,
            } => write!(f, "{messenger}: quantity '{quantity}' was never registered"),
            Self::MissingSchedule { quantity, level } => {
                write!(f, "no schedule for '{quantity}' on level {level}")
            }
            Self::WrongPhysics {
                messenger,
                expected,
            } => write!(f, "{messenger}: expected {expected}"),
            Self::NameMismatch {
                what,
                expected,
                found,
            } => write!(f, "{what} mismatch: expected '{expected}', found '{found}'"),
            Self::NoCoarserLevel { messenger, level } => {
                write!(f, "{messenger} has no coarser level under level {level}")
            }
            Self::NotRegistered { messenger } => {
                write!(f, "{messenger} used before its quantities were registered")
            }
        }
    }
}

impl Error for MessengerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Hierarchy(e) => Some(e),
            Self::Model(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HierarchyError> for MessengerError {
    fn from(e: HierarchyError) -> Self {
        Self::Hierarchy(e)
    }
}

impl From<ModelError> for MessengerError {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}
