//! Cell tagging and clustering of tagged cells into refinement boxes.
//!
//! Tags live on the cells of a whole level domain. A level is refined
//! where the magnetic field jumps by more than a threshold across a cell;
//! tagged cells are grown by a buffer, restricted to the cells where a
//! finer level can be properly nested, and merged into runs:
//!
//! ```text
//! tags     ....xx.....x......
//! buffer 1 ...xxxx...xxx.....
//! boxes       [  ]   [ ]
//! ```

use hamr_amr::{FieldData, HierarchyError, Patch, PatchLevel, NESTING_BUFFER};
use hamr_core::{AmrBox, Centering};
use hamr_model::{ModelError, PhysicalModel, VecIds};

/// Tagged cells of one level domain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tags {
    domain: AmrBox,
    periodic: bool,
    cells: Vec<bool>,
}

impl Tags {
    /// No cell of `domain` tagged.
    pub fn new(domain: AmrBox, periodic: bool) -> Self {
        Self {
            domain,
            periodic,
            cells: vec![false; domain.len()],
        }
    }

    /// Empty tags over the domain of `level`.
    pub fn for_level(level: &PatchLevel) -> Self {
        Self::new(level.domain(), level.period().is_some())
    }

    /// Domain covered.
    pub fn domain(&self) -> AmrBox {
        self.domain
    }

    fn index(&self, cell: i32) -> Option<usize> {
        let offset = cell - self.domain.lower;
        let len = self.cells.len() as i32;
        if self.periodic && len > 0 {
            Some(offset.rem_euclid(len) as usize)
        } else if (0..len).contains(&offset) {
            Some(offset as usize)
        } else {
            None
        }
    }

    /// Tag `cell`; cells outside a bounded domain are ignored.
    pub fn set(&mut self, cell: i32) {
        if let Some(i) = self.index(cell) {
            self.cells[i] = true;
        }
    }

    /// Whether `cell` is tagged.
    pub fn is_tagged(&self, cell: i32) -> bool {
        self.index(cell).is_some_and(|i| self.cells[i])
    }

    /// Number of tagged cells.
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&t| t).count()
    }

    /// Tags grown by `buffer` cells on each side.
    pub fn dilate(&self, buffer: i32) -> Self {
        let mut grown = Self::new(self.domain, self.periodic);
        for cell in self.domain.cells().filter(|&c| self.is_tagged(c)) {
            for neighbour in cell - buffer..=cell + buffer {
                grown.set(neighbour);
            }
        }
        grown
    }

    /// Cells tagged in both.
    pub fn intersect(&self, other: &Tags) -> Self {
        let mut both = Self::new(self.domain, self.periodic);
        for cell in self.domain.cells() {
            if self.is_tagged(cell) && other.is_tagged(cell) {
                both.set(cell);
            }
        }
        both
    }

    /// Maximal runs of tagged cells.
    pub fn runs(&self) -> Vec<AmrBox> {
        let mut boxes = Vec::new();
        let mut start = None;
        for cell in self.domain.cells() {
            match (self.is_tagged(cell), start) {
                (true, None) => start = Some(cell),
                (false, Some(lower)) => {
                    boxes.push(AmrBox::new(lower, cell - 1));
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(lower) = start {
            boxes.push(AmrBox::new(lower, self.domain.upper));
        }
        boxes
    }
}

/// Cells of `level` around which a finer level is properly nested: every
/// cell within [`NESTING_BUFFER`] is covered by the level's boxes (or
/// lies outside a bounded domain).
pub fn nesting_cells(level: &PatchLevel) -> Tags {
    let mut covered = Tags::for_level(level);
    for b in level.boxes() {
        for cell in b.cells() {
            covered.set(cell);
        }
    }
    let domain = level.domain();
    let periodic = level.period().is_some();
    let mut allowed = Tags::for_level(level);
    for cell in domain.cells() {
        let nested = (cell - NESTING_BUFFER..=cell + NESTING_BUFFER)
            .all(|c| covered.is_tagged(c) || (!periodic && !domain.contains(c)));
        if nested {
            allowed.set(cell);
        }
    }
    allowed
}

/// Boxes of the next finer level (in its index space) covering `tags`
/// grown by `buffer`, within the nesting cells of `level`.
pub fn cluster(tags: &Tags, level: &PatchLevel, buffer: i32, ratio: i32) -> Vec<AmrBox> {
    tags.dilate(buffer)
        .intersect(&nesting_cells(level))
        .runs()
        .into_iter()
        .map(|b| b.refine(ratio))
        .collect()
}

/// Tags cells where the magnetic field jumps by more than a threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradientTagger {
    threshold: f64,
}

fn jump(field: &FieldData, cell: i32) -> f64 {
    let (right, left, scale) = match field.centering() {
        Centering::Primal => (cell + 1, cell, 1.0),
        Centering::Dual => (cell + 1, cell - 1, 0.5),
    };
    match (field.at_amr(right), field.at_amr(left)) {
        (Some(r), Some(l)) => scale * (r - l).abs(),
        _ => 0.0,
    }
}

impl GradientTagger {
    /// Tagger refining where `max_c |ΔB_c| > threshold`.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Threshold on the jump.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Tag the cells of `patch` whose magnetic jump exceeds the threshold.
    pub fn tag(
        &self,
        patch: &Patch,
        magnetic: &VecIds,
        tags: &mut Tags,
    ) -> Result<(), HierarchyError> {
        let components = [
            patch.field(magnetic[0])?,
            patch.field(magnetic[1])?,
            patch.field(magnetic[2])?,
        ];
        for cell in patch.amr_box().cells() {
            let steepest = components
                .iter()
                .map(|f| jump(f, cell))
                .fold(0.0, f64::max);
            if steepest > self.threshold {
                tags.set(cell);
            }
        }
        Ok(())
    }
}

/// Magnetic field ids of `model`.
pub fn magnetic_ids(model: &PhysicalModel) -> Result<VecIds, ModelError> {
    match model {
        PhysicalModel::Hybrid(m) => Ok(m.ids()?.electromag.magnetic),
        PhysicalModel::Mhd(m) => Ok(m.ids()?.magnetic),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hamr_amr::{GridGeometry, PatchHierarchy};
    use proptest::prelude::*;

    fn level0(periodic: bool) -> PatchHierarchy {
        let geometry = GridGeometry::new(0.0, 0.1, 20, periodic).unwrap();
        let mut h = PatchHierarchy::new(geometry, 3);
        h.make_level(0, &[AmrBox::new(0, 19)]).unwrap();
        h
    }

    #[test]
    fn runs_split_at_untagged_cells() {
        let mut tags = Tags::new(AmrBox::new(0, 9), false);
        for c in [1, 2, 5, 9] {
            tags.set(c);
        }
        assert_eq!(
            tags.runs(),
            vec![AmrBox::new(1, 2), AmrBox::new(5, 5), AmrBox::new(9, 9)]
        );
        assert_eq!(tags.count(), 4);
    }

    #[test]
    fn periodic_dilation_wraps_around() {
        let mut tags = Tags::new(AmrBox::new(0, 9), true);
        tags.set(0);
        let grown = tags.dilate(1);
        assert!(grown.is_tagged(9) && grown.is_tagged(1));
        assert_eq!(grown.count(), 3);
    }

    #[test]
    fn a_full_periodic_level_nests_everywhere() {
        let h = level0(true);
        assert_eq!(nesting_cells(h.level(0).unwrap()).count(), 20);
    }

    #[test]
    fn a_partial_level_keeps_finer_boxes_away_from_its_edges() {
        let mut h = level0(true);
        h.make_level(1, &[AmrBox::new(10, 29)]).unwrap();
        let allowed = nesting_cells(h.level(1).unwrap());
        assert_eq!(allowed.runs(), vec![AmrBox::new(12, 27)]);
    }

    #[test]
    fn clusters_are_refined_and_buffered() {
        let h = level0(false);
        let mut tags = Tags::for_level(h.level(0).unwrap());
        tags.set(8);
        tags.set(9);
        let boxes = cluster(&tags, h.level(0).unwrap(), 2, 2);
        assert_eq!(boxes, vec![AmrBox::new(12, 23)]);
    }

    proptest! {
        #[test]
        fn dilation_never_loses_tags(
            cells in prop::collection::vec(0i32..30, 0..8),
            buffer in 0i32..4,
        ) {
            let mut tags = Tags::new(AmrBox::new(0, 29), false);
            for &c in &cells {
                tags.set(c);
            }
            let grown = tags.dilate(buffer);
            for &c in &cells {
                prop_assert!(grown.is_tagged(c));
            }
            prop_assert!(grown.count() >= tags.count());
        }
    }
}
