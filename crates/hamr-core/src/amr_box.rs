//! One-dimensional AMR boxes in cell index space.

use std::fmt;

use smallvec::SmallVec;

/// An inclusive range of cell indices `[lower, upper]` on one level.
///
/// A box with `upper < lower` is empty. Index spaces of consecutive levels
/// are related by the refinement ratio: cell `i` on level `L` covers cells
/// `r*i .. r*i + r - 1` on level `L + 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AmrBox {
    /// First cell of the box.
    pub lower: i32,
    /// Last cell of the box (inclusive).
    pub upper: i32,
}

impl AmrBox {
    /// Create a box covering cells `lower..=upper`.
    pub fn new(lower: i32, upper: i32) -> Self {
        Self { lower, upper }
    }

    /// Whether the box holds no cell.
    pub fn is_empty(&self) -> bool {
        self.upper < self.lower
    }

    /// Number of cells in the box.
    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.upper - self.lower + 1) as usize
        }
    }

    /// Whether cell `i` lies in the box.
    pub fn contains(&self, i: i32) -> bool {
        i >= self.lower && i <= self.upper
    }

    /// Whether `other` lies entirely in the box. Empty boxes are contained
    /// in every box.
    pub fn contains_box(&self, other: &AmrBox) -> bool {
        other.is_empty() || (other.lower >= self.lower && other.upper <= self.upper)
    }

    /// Overlap of the two boxes, `None` when disjoint.
    pub fn intersect(&self, other: &AmrBox) -> Option<AmrBox> {
        let b = AmrBox::new(self.lower.max(other.lower), self.upper.min(other.upper));
        (!b.is_empty()).then_some(b)
    }

    /// Box extended by `n` cells on both sides.
    pub fn grow(&self, n: i32) -> AmrBox {
        AmrBox::new(self.lower - n, self.upper + n)
    }

    /// Box translated by `offset` cells.
    pub fn shift(&self, offset: i32) -> AmrBox {
        AmrBox::new(self.lower + offset, self.upper + offset)
    }

    /// The same region expressed in the index space of a level `ratio`
    /// times finer.
    pub fn refine(&self, ratio: i32) -> AmrBox {
        AmrBox::new(self.lower * ratio, (self.upper + 1) * ratio - 1)
    }

    /// The smallest box of a level `ratio` times coarser covering this box.
    pub fn coarsen(&self, ratio: i32) -> AmrBox {
        AmrBox::new(self.lower.div_euclid(ratio), self.upper.div_euclid(ratio))
    }

    /// Parts of this box not covered by `other` (at most two).
    pub fn subtract(&self, other: &AmrBox) -> SmallVec<[AmrBox; 2]> {
        let mut out = SmallVec::new();
        match self.intersect(other) {
            None => {
                if !self.is_empty() {
                    out.push(*self);
                }
            }
            Some(overlap) => {
                let left = AmrBox::new(self.lower, overlap.lower - 1);
                let right = AmrBox::new(overlap.upper + 1, self.upper);
                if !left.is_empty() {
                    out.push(left);
                }
                if !right.is_empty() {
                    out.push(right);
                }
            }
        }
        out
    }

    /// Iterate the cell indices of the box.
    pub fn cells(&self) -> std::ops::RangeInclusive<i32> {
        self.lower..=self.upper
    }
}

impl fmt::Display for AmrBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}
