//! 1D Yee grid layout: index arithmetic between local array indices,
//! AMR indices and physical coordinates.
//!
//! A patch covering AMR cells `[lo, hi]` stores each quantity in a local
//! array that starts `ghost_width` cells left of `lo`:
//!
//! - primal quantities live on nodes; local `i` is AMR node `lo - g + i`,
//!   the physical nodes are `g ..= g + n_cells`.
//! - dual quantities live at cell centers; local `i` is AMR cell
//!   `lo - g + i`, the physical cells are `g ..= g + n_cells - 1`.
//!
//! With this convention primal node `i` sits between dual cells `i - 1`
//! and `i` for every local index.

use crate::AmrBox;

/// Interpolation order of the particle shape function.
pub const INTERP_ORDER: usize = 1;

/// Number of ghost cells on each side of a patch for a given
/// interpolation order.
pub const fn nbr_ghosts(interp_order: usize) -> usize {
    interp_order + 1
}

/// Where on the cell a quantity is defined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Centering {
    /// On cell faces (nodes in 1D).
    Primal,
    /// At cell centers.
    Dual,
}

/// Index layout of one patch.
#[derive(Clone, Debug, PartialEq)]
pub struct GridLayout {
    amr_box: AmrBox,
    mesh_size: f64,
    origin: f64,
    ghost_width: usize,
}

impl GridLayout {
    /// Layout for a patch covering `amr_box`, with cells of width
    /// `mesh_size` on a level whose AMR cell 0 starts at `origin`.
    pub fn new(amr_box: AmrBox, mesh_size: f64, origin: f64) -> Self {
        Self {
            amr_box,
            mesh_size,
            origin,
            ghost_width: nbr_ghosts(INTERP_ORDER),
        }
    }

    /// Cells of the patch interior.
    pub fn amr_box(&self) -> AmrBox {
        self.amr_box
    }

    /// Width of a cell.
    pub fn mesh_size(&self) -> f64 {
        self.mesh_size
    }

    /// Inverse of the mesh size.
    pub fn inverse_mesh_size(&self) -> f64 {
        1.0 / self.mesh_size
    }

    /// Coordinate of AMR node 0.
    pub fn origin(&self) -> f64 {
        self.origin
    }

    /// Number of interior cells.
    pub fn n_cells(&self) -> usize {
        self.amr_box.len()
    }

    /// Ghost cells on each side.
    pub fn ghost_width(&self) -> usize {
        self.ghost_width
    }

    /// Interior cells grown by the ghost width.
    pub fn ghost_box(&self) -> AmrBox {
        self.amr_box.grow(self.ghost_width as i32)
    }

    /// Length of the local array holding a quantity.
    pub fn alloc_size(&self, centering: Centering) -> usize {
        let cells = self.n_cells() + 2 * self.ghost_width;
        match centering {
            Centering::Primal => cells + 1,
            Centering::Dual => cells,
        }
    }

    /// First physical local index.
    pub fn physical_start_index(&self, _centering: Centering) -> usize {
        self.ghost_width
    }

    /// Last physical local index (inclusive).
    pub fn physical_end_index(&self, centering: Centering) -> usize {
        match centering {
            Centering::Primal => self.ghost_width + self.n_cells(),
            Centering::Dual => self.ghost_width + self.n_cells() - 1,
        }
    }

    /// First local index, ghosts included.
    pub fn ghost_start_index(&self, _centering: Centering) -> usize {
        0
    }

    /// Last local index, ghosts included.
    pub fn ghost_end_index(&self, centering: Centering) -> usize {
        self.alloc_size(centering) - 1
    }

    /// Physical local indices as a range.
    pub fn physical_range(&self, centering: Centering) -> std::ops::RangeInclusive<usize> {
        self.physical_start_index(centering)..=self.physical_end_index(centering)
    }

    /// Physical nodes (or cells) in AMR index space.
    pub fn physical_amr_range(&self, centering: Centering) -> AmrBox {
        match centering {
            Centering::Primal => AmrBox::new(self.amr_box.lower, self.amr_box.upper + 1),
            Centering::Dual => self.amr_box,
        }
    }

    /// AMR index of the local index `i`.
    pub fn local_to_amr(&self, i: usize) -> i32 {
        self.amr_box.lower - self.ghost_width as i32 + i as i32
    }

    /// Local index of AMR index `a`, `None` outside the allocated array.
    pub fn amr_to_local(&self, a: i32, centering: Centering) -> Option<usize> {
        let i = a - self.amr_box.lower + self.ghost_width as i32;
        (i >= 0 && (i as usize) < self.alloc_size(centering)).then_some(i as usize)
    }

    /// Coordinate of local index `i` of a quantity with the given centering.
    pub fn coordinate(&self, centering: Centering, i: usize) -> f64 {
        let shift = match centering {
            Centering::Primal => 0.0,
            Centering::Dual => 0.5,
        };
        self.origin + (self.local_to_amr(i) as f64 + shift) * self.mesh_size
    }

    /// Coordinate of the center of local cell `i`.
    pub fn cell_centered_coordinate(&self, i: usize) -> f64 {
        self.coordinate(Centering::Dual, i)
    }

    /// Volume (length in 1D) of a cell.
    pub fn cell_volume(&self) -> f64 {
        self.mesh_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> GridLayout {
        GridLayout::new(AmrBox::new(10, 19), 0.1, 0.0)
    }

    #[test]
    fn primal_holds_one_more_node_than_dual() {
        let l = layout();
        assert_eq!(l.alloc_size(Centering::Dual), 10 + 4);
        assert_eq!(l.alloc_size(Centering::Primal), 10 + 4 + 1);
        assert_eq!(l.physical_end_index(Centering::Primal), 12);
        assert_eq!(l.physical_end_index(Centering::Dual), 11);
    }

    #[test]
    fn first_physical_node_sits_on_box_lower_edge() {
        let l = layout();
        let i = l.physical_start_index(Centering::Primal);
        assert_eq!(l.local_to_amr(i), 10);
        assert!((l.coordinate(Centering::Primal, i) - 1.0).abs() < 1e-12);
        assert!((l.coordinate(Centering::Dual, i) - 1.05).abs() < 1e-12);
    }

    #[test]
    fn ghost_range_spans_the_allocation() {
        let l = layout();
        assert_eq!(l.ghost_start_index(Centering::Dual), 0);
        assert_eq!(l.ghost_end_index(Centering::Dual), 13);
        assert_eq!(l.ghost_end_index(Centering::Primal), 14);
        assert!((l.cell_centered_coordinate(2) - 1.05).abs() < 1e-12);
        assert_eq!(l.cell_volume(), 0.1);
    }

    #[test]
    fn amr_to_local_rejects_outside_indices() {
        let l = layout();
        assert_eq!(l.amr_to_local(8, Centering::Primal), Some(0));
        assert_eq!(l.amr_to_local(7, Centering::Primal), None);
        assert_eq!(l.amr_to_local(22, Centering::Primal), Some(14));
        assert_eq!(l.amr_to_local(22, Centering::Dual), None);
    }
}
