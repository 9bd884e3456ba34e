//! Error types of the core crate.

use std::error::Error;
use std::fmt;

/// Errors raised while reading the configuration dictionary.
#[derive(Clone, Debug, PartialEq)]
pub enum DictError {
    /// A required key is absent.
    MissingKey {
        /// The missing key.
        key: String,
    },
    /// The key holds a value of another type.
    WrongType {
        /// The offending key.
        key: String,
        /// Type requested by the caller.
        expected: &'static str,
        /// Type actually stored.
        found: &'static str,
    },
    /// The JSON document could not be parsed.
    Json {
        /// Parser message.
        reason: String,
    },
    /// A JSON value has no dictionary counterpart.
    UnsupportedJson {
        /// Key holding the value.
        key: String,
        /// What was wrong.
        reason: String,
    },
}

impl fmt::Display for DictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingKey { key } => write!(f, "missing configuration key '{key}'"),
            Self::WrongType {
                key,
                expected,
                found,
            } => write!(f, "configuration key '{key}' holds {found}, expected {expected}"),
            Self::Json { reason } => write!(f, "invalid JSON configuration: {reason}"),
            Self::UnsupportedJson { key, reason } => {
                write!(f, "unsupported JSON value at '{key}': {reason}")
            }
        }
    }
}

impl Error for DictError {}
