//! Error types for physical models.

use std::error::Error;
use std::fmt;

use hamr_amr::HierarchyError;
use hamr_core::DictError;

/// Errors raised while building, registering or initializing a model.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelError {
    /// A configuration entry is missing or has the wrong type.
    Config(DictError),
    /// A resource or hierarchy operation failed.
    Hierarchy(HierarchyError),
    /// A particle initializer name is not known.
    UnknownInitializer {
        /// The requested name.
        name: String,
    },
    /// A velocity basis name is not known.
    UnknownBasis {
        /// The requested name.
        name: String,
    },
    /// A configuration value is out of its valid range.
    InvalidParameter {
        /// Dictionary key.
        key: String,
        /// What was wrong.
        reason: String,
    },
    /// An operation needed resource ids that were never registered.
    NotRegistered {
        /// Model name.
        model: &'static str,
    },
    /// A model was asked to fill a messenger info of the other physics.
    InfoMismatch {
        /// Model name.
        model: &'static str,
        /// Variant of the info received.
        info: &'static str,
    },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "model configuration: {e}"),
            Self::Hierarchy(e) => write!(f, "model data: {e}"),
            Self::UnknownInitializer { name } => {
                write!(f, "unknown particle initializer '{name}'")
            }
            Self::UnknownBasis { name } => write!(f, "unknown velocity basis '{name}'"),
            Self::InvalidParameter { key, reason } => write!(f, "invalid '{key}': {reason}"),
            Self::NotRegistered { model } => {
                write!(f, "{model} used before its resources were registered")
            }
            Self::InfoMismatch { model, info } => {
                write!(f, "{model} cannot fill a {info} messenger info")
            }
        }
    }
}

impl Error for ModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Hierarchy(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DictError> for ModelError {
    fn from(e: DictError) -> Self {
        Self::Config(e)
    }
}

impl From<HierarchyError> for ModelError {
    fn from(e: HierarchyError) -> Self {
        Self::Hierarchy(e)
    }
}
