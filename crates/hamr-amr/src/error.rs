//! Error types for the AMR substrate.

use std::error::Error;
use std::fmt;

use hamr_core::{AmrBox, PatchId, ResourceId};

/// Errors raised by hierarchy construction, resource lookups and schedule
/// execution.
#[derive(Clone, Debug, PartialEq)]
pub enum HierarchyError {
    /// The grid geometry parameters are unusable.
    InvalidGeometry {
        /// What was wrong.
        reason: String,
    },
    /// A level number beyond the hierarchy's capacity or current depth.
    LevelOutOfRange {
        /// Requested level.
        level: usize,
        /// Number of levels available.
        available: usize,
    },
    /// A level was requested with no boxes.
    EmptyLevel {
        /// Level number.
        level: usize,
    },
    /// A box leaves the physical domain.
    OutsideDomain {
        /// Level number.
        level: usize,
        /// Offending box.
        amr_box: AmrBox,
    },
    /// A box is not properly nested in the coarser level.
    NotNested {
        /// Level number.
        level: usize,
        /// Offending box.
        amr_box: AmrBox,
    },
    /// Two boxes of one level overlap.
    OverlappingBoxes {
        /// Level number.
        level: usize,
        /// First box.
        first: AmrBox,
        /// Second box.
        second: AmrBox,
    },
    /// A name was registered twice with different kinds.
    ResourceKindMismatch {
        /// Resource name.
        name: String,
    },
    /// A name never registered with the resources manager.
    UnregisteredResource {
        /// Resource name.
        name: String,
    },
    /// An id not known to the resources manager.
    UnknownResource {
        /// The unknown id.
        id: ResourceId,
    },
    /// A patch has no data allocated for a resource.
    MissingData {
        /// Patch.
        patch: PatchId,
        /// Resource.
        id: ResourceId,
    },
    /// Patch data exists but is of another kind.
    WrongDataKind {
        /// Patch.
        patch: PatchId,
        /// Resource.
        id: ResourceId,
        /// Kind the caller wanted.
        expected: &'static str,
    },
    /// A regrid schedule was executed without the old level it was built
    /// from.
    MissingOldLevel {
        /// Level number.
        level: usize,
    },
    /// The particle split operator does not support this many children.
    UnsupportedSplit {
        /// Requested number of refined particles.
        nbr_refined: usize,
    },
}

impl fmt::Display for HierarchyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidGeometry { reason } => write!(f, "invalid grid geometry: {reason}"),
            Self::LevelOutOfRange { level, available } => {
                write!(f, "level {level} out of range ({available} levels available)")
            }
            Self::EmptyLevel { level } => write!(f, "level {level} has no boxes"),
            Self::OutsideDomain { level, amr_box } => {
                write!(f, "box {amr_box} on level {level} leaves the domain")
            }
            Self::NotNested { level, amr_box } => {
                write!(
                    f,
                    "box {amr_box} on level {level} is not nested in level {}",
                    level.saturating_sub(1)
                )
            }
            Self::OverlappingBoxes {
                level,
                first,
                second,
            } => write!(f, "boxes {first} and {second} overlap on level {level}"),
            Self::ResourceKindMismatch { name } => {
                write!(f, "resource '{name}' registered twice with different kinds")
            }
            Self::UnregisteredResource { name } => {
                write!(f, "resource '{name}' is not registered")
            }
            Self::UnknownResource { id } => write!(f, "unknown resource id {id}"),
            Self::MissingData { patch, id } => {
                write!(f, "patch {patch} has no data for resource {id}")
            }
            Self::WrongDataKind {
                patch,
                id,
                expected,
            } => write!(f, "resource {id} on patch {patch} is not {expected} data"),
            Self::MissingOldLevel { level } => {
                write!(f, "regrid schedule of level {level} executed without its old level")
            }
            Self::UnsupportedSplit { nbr_refined } => {
                write!(f, "cannot split a particle into {nbr_refined} particles")
            }
        }
    }
}

impl Error for HierarchyError {}
