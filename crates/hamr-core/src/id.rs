//! Strongly-typed identifiers.

use std::fmt;

/// Identifies a quantity registered with the resources manager.
///
/// Ids are handed out sequentially at registration time and index the
/// per-patch data table, so `ResourceId(n)` is the n-th registered
/// quantity of the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub u32);

impl ResourceId {
    /// Position of this id in a patch data table.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ResourceId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a patch: the level it lives on and its rank within the level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatchId {
    /// Level number, 0 being the coarsest.
    pub level: usize,
    /// Position of the patch in its level's patch list.
    pub index: usize,
}

impl fmt::Display for PatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pl{}p{}", self.level, self.index)
    }
}
