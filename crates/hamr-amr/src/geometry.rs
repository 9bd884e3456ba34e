//! Physical geometry of the domain and per-level index spaces.

use hamr_core::{AmrBox, GridLayout};

use crate::HierarchyError;

/// Refinement ratio between consecutive levels, in space and in time.
pub const REFINEMENT_RATIO: i32 = 2;

/// Coarse cells a fine level keeps between its boxes and the boundary of
/// the coarser level, so that every fine ghost node has a full coarse
/// interpolation stencil.
pub const NESTING_BUFFER: i32 = 2;

/// Domain extent, level-0 mesh size and boundary type.
#[derive(Clone, Debug, PartialEq)]
pub struct GridGeometry {
    origin: f64,
    mesh_size: f64,
    domain: AmrBox,
    periodic: bool,
}

impl GridGeometry {
    /// Geometry of a domain of `nbr_cells` level-0 cells of width
    /// `mesh_size`, starting at `origin`.
    pub fn new(
        origin: f64,
        mesh_size: f64,
        nbr_cells: usize,
        periodic: bool,
    ) -> Result<Self, HierarchyError> {
        if nbr_cells == 0 {
            return Err(HierarchyError::InvalidGeometry {
                reason: "the domain needs at least one cell".to_string(),
            });
        }
        if !(mesh_size.is_finite() && mesh_size > 0.0) {
            return Err(HierarchyError::InvalidGeometry {
                reason: format!("mesh size must be positive and finite, got {mesh_size}"),
            });
        }
        Ok(Self {
            origin,
            mesh_size,
            domain: AmrBox::new(0, nbr_cells as i32 - 1),
            periodic,
        })
    }

    /// Coordinate of the domain's lower boundary.
    pub fn origin(&self) -> f64 {
        self.origin
    }

    /// Whether the domain wraps around.
    pub fn periodic(&self) -> bool {
        self.periodic
    }

    /// Ratio between level `level` and level 0.
    pub fn ratio_to_level_zero(&self, level: usize) -> i32 {
        REFINEMENT_RATIO.pow(level as u32)
    }

    /// Mesh size on `level`.
    pub fn mesh_size(&self, level: usize) -> f64 {
        self.mesh_size / self.ratio_to_level_zero(level) as f64
    }

    /// Domain cells in the index space of `level`.
    pub fn domain_box(&self, level: usize) -> AmrBox {
        self.domain.refine(self.ratio_to_level_zero(level))
    }

    /// Period in cells of `level`, `None` for a bounded domain.
    pub fn period(&self, level: usize) -> Option<i32> {
        self.periodic.then(|| self.domain_box(level).len() as i32)
    }

    /// Layout of a patch covering `amr_box` on `level`.
    pub fn layout(&self, level: usize, amr_box: AmrBox) -> GridLayout {
        GridLayout::new(amr_box, self.mesh_size(level), self.origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finer_levels_halve_the_mesh() {
        let g = GridGeometry::new(0.0, 0.2, 10, true).unwrap();
        assert_eq!(g.mesh_size(2), 0.05);
        assert_eq!(g.domain_box(1), AmrBox::new(0, 19));
        assert_eq!(g.period(1), Some(20));
    }

    #[test]
    fn rejects_degenerate_domains() {
        assert!(GridGeometry::new(0.0, 0.1, 0, false).is_err());
        assert!(GridGeometry::new(0.0, -0.1, 4, false).is_err());
    }
}
