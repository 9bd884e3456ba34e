//! Error type for diagnostic dumps.

use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

use hamr_amr::HierarchyError;
use hamr_model::ModelError;

/// Errors raised while collecting or writing diagnostics.
#[derive(Debug)]
pub enum DiagnosticError {
    /// An output file could not be created.
    CreateFile {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
    /// Writing to an output failed.
    Io(io::Error),
    /// An entry could not be serialized.
    Json(serde_json::Error),
    /// A patch lacks the data a writer reads.
    Hierarchy(HierarchyError),
    /// A model is not registered.
    Model(ModelError),
    /// No model was given for a level of the hierarchy.
    MissingModel {
        /// Level number.
        level: usize,
    },
}

impl fmt::Display for DiagnosticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateFile { path, source } => {
                write!(f, "cannot create '{}': {source}", path.display())
            }
            Self::Io(e) => write!(f, "write failed: {e}"),
            Self::Json(e) => write!(f, "serialization failed: {e}"),
            Self::Hierarchy(e) => write!(f, "hierarchy: {e}"),
            Self::Model(e) => write!(f, "model: {e}"),
            Self::MissingModel { level } => write!(f, "no model for level {level}"),
        }
    }
}

impl Error for DiagnosticError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateFile { source, .. } => Some(source),
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Hierarchy(e) => Some(e),
            Self::Model(e) => Some(e),
            Self::MissingModel { .. } => None,
        }
    }
}

impl From<io::Error> for DiagnosticError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for DiagnosticError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<HierarchyError> for DiagnosticError {
    fn from(e: HierarchyError) -> Self {
        Self::Hierarchy(e)
    }
}

impl From<ModelError> for DiagnosticError {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}
