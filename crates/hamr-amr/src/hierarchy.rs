//! Patches, levels and the patch hierarchy.

use hamr_core::{AmrBox, Centering, GridLayout, PatchId, ResourceId};
use smallvec::{smallvec, SmallVec};
use tracing::debug;

use crate::{
    FieldData, GridGeometry, HierarchyError, ParticlesData, PatchData, NESTING_BUFFER,
    REFINEMENT_RATIO,
};

// ── Patch ──────────────────────────────────────────────────────────

/// A rectangular block of cells on one level and the data living on it.
#[derive(Clone, Debug)]
pub struct Patch {
    id: PatchId,
    layout: GridLayout,
    data: Vec<Option<PatchData>>,
}

impl Patch {
    fn new(id: PatchId, layout: GridLayout) -> Self {
        Self {
            id,
            layout,
            data: Vec::new(),
        }
    }

    /// Identifier of the patch.
    pub fn id(&self) -> PatchId {
        self.id
    }

    /// Index layout of the patch.
    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Interior cells.
    pub fn amr_box(&self) -> AmrBox {
        self.layout.amr_box()
    }

    /// Whether data is allocated for `id`.
    pub fn has(&self, id: ResourceId) -> bool {
        matches!(self.data.get(id.index()), Some(Some(_)))
    }

    /// Data for `id`, if allocated.
    pub fn data(&self, id: ResourceId) -> Option<&PatchData> {
        self.data.get(id.index()).and_then(Option::as_ref)
    }

    /// Mutable data for `id`, if allocated.
    pub fn data_mut(&mut self, id: ResourceId) -> Option<&mut PatchData> {
        self.data.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Store `data` under `id`, replacing what was there.
    pub fn set_data(&mut self, id: ResourceId, data: PatchData) {
        if self.data.len() <= id.index() {
            self.data.resize_with(id.index() + 1, || None);
        }
        self.data[id.index()] = Some(data);
    }

    /// Field data for `id`.
    pub fn field(&self, id: ResourceId) -> Result<&FieldData, HierarchyError> {
        match self.data(id) {
            Some(PatchData::Field(f)) => Ok(f),
            Some(_) => Err(self.wrong_kind(id, "field")),
            None => Err(self.missing(id)),
        }
    }

    /// Mutable field data for `id`.
    pub fn field_mut(&mut self, id: ResourceId) -> Result<&mut FieldData, HierarchyError> {
        let patch = self.id;
        match self.data_mut(id) {
            Some(PatchData::Field(f)) => Ok(f),
            Some(_) => Err(HierarchyError::WrongDataKind {
                patch,
                id,
                expected: "field",
            }),
            None => Err(HierarchyError::MissingData { patch, id }),
        }
    }

    /// Remove the field for `id` from the patch, to be put back with
    /// [`put_field`](Self::put_field) once computed from other fields of
    /// the same patch.
    pub fn take_field(&mut self, id: ResourceId) -> Result<FieldData, HierarchyError> {
        self.field(id)?;
        match self.data[id.index()].take() {
            Some(PatchData::Field(f)) => Ok(f),
            _ => Err(self.missing(id)),
        }
    }

    /// Store a field taken with [`take_field`](Self::take_field).
    pub fn put_field(&mut self, id: ResourceId, field: FieldData) {
        self.set_data(id, PatchData::Field(field));
    }

    /// Particle data for `id`.
    pub fn particles(&self, id: ResourceId) -> Result<&ParticlesData, HierarchyError> {
        match self.data(id) {
            Some(PatchData::Particles(p)) => Ok(p),
            Some(_) => Err(self.wrong_kind(id, "particle")),
            None => Err(self.missing(id)),
        }
    }

    /// Mutable particle data for `id`.
    pub fn particles_mut(&mut self, id: ResourceId) -> Result<&mut ParticlesData, HierarchyError> {
        let patch = self.id;
        match self.data_mut(id) {
            Some(PatchData::Particles(p)) => Ok(p),
            Some(_) => Err(HierarchyError::WrongDataKind {
                patch,
                id,
                expected: "particle",
            }),
            None => Err(HierarchyError::MissingData { patch, id }),
        }
    }

    fn missing(&self, id: ResourceId) -> HierarchyError {
        HierarchyError::MissingData { patch: self.id, id }
    }

    fn wrong_kind(&self, id: ResourceId, expected: &'static str) -> HierarchyError {
        HierarchyError::WrongDataKind {
            patch: self.id,
            id,
            expected,
        }
    }
}

// ── PatchLevel ─────────────────────────────────────────────────────

/// All patches of one refinement level.
#[derive(Clone, Debug)]
pub struct PatchLevel {
    number: usize,
    domain: AmrBox,
    period: Option<i32>,
    patches: Vec<Patch>,
}

impl PatchLevel {
    /// Level number, 0 being the coarsest.
    pub fn number(&self) -> usize {
        self.number
    }

    /// Domain cells in this level's index space.
    pub fn domain(&self) -> AmrBox {
        self.domain
    }

    /// Period in cells for periodic domains.
    pub fn period(&self) -> Option<i32> {
        self.period
    }

    /// Translations mapping a periodic image back into the domain, the
    /// identity first.
    pub fn shifts(&self) -> SmallVec<[i32; 3]> {
        match self.period {
            Some(p) => smallvec![0, p, -p],
            None => smallvec![0],
        }
    }

    /// Patches of the level, in creation order.
    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    /// Mutable patches of the level.
    pub fn patches_mut(&mut self) -> &mut [Patch] {
        &mut self.patches
    }

    /// Patch `index`.
    pub fn patch(&self, index: usize) -> &Patch {
        &self.patches[index]
    }

    /// Mutable patch `index`.
    pub fn patch_mut(&mut self, index: usize) -> &mut Patch {
        &mut self.patches[index]
    }

    /// Number of patches.
    pub fn len(&self) -> usize {
        self.patches.len()
    }

    /// Whether the level has no patch.
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Interior boxes of the patches.
    pub fn boxes(&self) -> Vec<AmrBox> {
        self.patches.iter().map(Patch::amr_box).collect()
    }

    /// Find a patch whose physical nodes (or cells) contain AMR index `a`,
    /// trying periodic images. `exclude` skips the unshifted match on one
    /// patch, used when looking for a neighbour of that patch.
    ///
    /// Returns the patch index and the local index of `a` (shifted) on it.
    pub fn locate(
        &self,
        centering: Centering,
        a: i32,
        exclude: Option<usize>,
    ) -> Option<(usize, usize)> {
        for shift in self.shifts() {
            let image = a + shift;
            for (q, patch) in self.patches.iter().enumerate() {
                if shift == 0 && exclude == Some(q) {
                    continue;
                }
                if patch.layout.physical_amr_range(centering).contains(image) {
                    let local = patch.layout.amr_to_local(image, centering)?;
                    return Some((q, local));
                }
            }
        }
        None
    }

    /// Parts of `cells` not covered by the interior of any patch other
    /// than `exclude` (periodic images included).
    pub fn uncovered(&self, cells: AmrBox, exclude: Option<usize>) -> Vec<AmrBox> {
        let mut remaining = vec![cells];
        for shift in self.shifts() {
            for (q, patch) in self.patches.iter().enumerate() {
                if shift == 0 && exclude == Some(q) {
                    continue;
                }
                let covered = patch.amr_box().shift(-shift);
                remaining = remaining
                    .iter()
                    .flat_map(|b| b.subtract(&covered))
                    .collect();
            }
        }
        remaining
    }

    /// Ghost cells of patch `index`, left side first.
    pub fn ghost_cells(&self, index: usize) -> [AmrBox; 2] {
        let interior = self.patches[index].amr_box();
        let ghost = self.patches[index].layout.ghost_box();
        [
            AmrBox::new(ghost.lower, interior.lower - 1),
            AmrBox::new(interior.upper + 1, ghost.upper),
        ]
    }

    /// Ghost cells of patch `index` not covered by any patch of the level:
    /// the part of the halo that must come from a coarser level.
    pub fn level_ghost_cells(&self, index: usize) -> Vec<AmrBox> {
        self.ghost_cells(index)
            .iter()
            .flat_map(|b| self.uncovered(*b, Some(index)))
            .filter_map(|b| match self.period {
                Some(_) => Some(b),
                None => self.domain.intersect(&b),
            })
            .collect()
    }
}

// ── PatchHierarchy ─────────────────────────────────────────────────

/// Nested levels of patches over one domain.
#[derive(Clone, Debug)]
pub struct PatchHierarchy {
    geometry: GridGeometry,
    max_levels: usize,
    max_patch_size: usize,
    levels: Vec<PatchLevel>,
}

impl PatchHierarchy {
    /// Empty hierarchy able to hold up to `max_levels` levels.
    pub fn new(geometry: GridGeometry, max_levels: usize) -> Self {
        Self {
            geometry,
            max_levels: max_levels.max(1),
            max_patch_size: usize::MAX,
            levels: Vec::new(),
        }
    }

    /// Limit the number of cells per patch; larger boxes are chopped.
    pub fn with_max_patch_size(mut self, max_patch_size: usize) -> Self {
        self.max_patch_size = max_patch_size.max(1);
        self
    }

    /// Domain geometry.
    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// Capacity in levels.
    pub fn max_levels(&self) -> usize {
        self.max_levels
    }

    /// Number of levels currently built.
    pub fn number_of_levels(&self) -> usize {
        self.levels.len()
    }

    /// Finest level currently built.
    pub fn finest_level_number(&self) -> Option<usize> {
        self.levels.len().checked_sub(1)
    }

    /// Level `level`.
    pub fn level(&self, level: usize) -> Result<&PatchLevel, HierarchyError> {
        self.levels
            .get(level)
            .ok_or(HierarchyError::LevelOutOfRange {
                level,
                available: self.levels.len(),
            })
    }

    /// Mutable level `level`.
    pub fn level_mut(&mut self, level: usize) -> Result<&mut PatchLevel, HierarchyError> {
        let available = self.levels.len();
        self.levels
            .get_mut(level)
            .ok_or(HierarchyError::LevelOutOfRange { level, available })
    }

    /// Level `fine - 1` and mutable level `fine`.
    pub fn coarse_and_fine_mut(
        &mut self,
        fine: usize,
    ) -> Result<(&PatchLevel, &mut PatchLevel), HierarchyError> {
        if fine == 0 || fine >= self.levels.len() {
            return Err(HierarchyError::LevelOutOfRange {
                level: fine,
                available: self.levels.len(),
            });
        }
        let (coarse, rest) = self.levels.split_at_mut(fine);
        Ok((&coarse[fine - 1], &mut rest[0]))
    }

    /// Mutable level `coarse` and level `coarse + 1`.
    pub fn coarse_mut_and_fine(
        &mut self,
        coarse: usize,
    ) -> Result<(&mut PatchLevel, &PatchLevel), HierarchyError> {
        if coarse + 1 >= self.levels.len() {
            return Err(HierarchyError::LevelOutOfRange {
                level: coarse + 1,
                available: self.levels.len(),
            });
        }
        let (head, rest) = self.levels.split_at_mut(coarse + 1);
        Ok((&mut head[coarse], &rest[0]))
    }

    /// Build level `level` from `boxes`, replacing any level already there.
    ///
    /// Boxes are validated (inside the domain, disjoint, nested in the
    /// coarser level) and chopped to the maximum patch size. The replaced
    /// level, if any, is returned so that its data can seed the new one.
    pub fn make_level(
        &mut self,
        level: usize,
        boxes: &[AmrBox],
    ) -> Result<Option<PatchLevel>, HierarchyError> {
        if level >= self.max_levels || level > self.levels.len() {
            return Err(HierarchyError::LevelOutOfRange {
                level,
                available: self.levels.len().min(self.max_levels),
            });
        }
        let boxes: Vec<AmrBox> = boxes.iter().copied().filter(|b| !b.is_empty()).collect();
        if boxes.is_empty() {
            return Err(HierarchyError::EmptyLevel { level });
        }
        self.validate_boxes(level, &boxes)?;

        let mut chopped: Vec<AmrBox> = boxes
            .iter()
            .flat_map(|b| chop(*b, self.max_patch_size))
            .collect();
        chopped.sort_by_key(|b| b.lower);

        let patches = chopped
            .into_iter()
            .enumerate()
            .map(|(index, b)| {
                Patch::new(
                    PatchId { level, index },
                    self.geometry.layout(level, b),
                )
            })
            .collect::<Vec<_>>();
        debug!(level, patches = patches.len(), "level built");

        let new_level = PatchLevel {
            number: level,
            domain: self.geometry.domain_box(level),
            period: self.geometry.period(level),
            patches,
        };
        if level == self.levels.len() {
            self.levels.push(new_level);
            Ok(None)
        } else {
            Ok(Some(std::mem::replace(&mut self.levels[level], new_level)))
        }
    }

    /// Drop every level finer than `level`.
    pub fn remove_finer_levels(&mut self, level: usize) {
        self.levels.truncate(level + 1);
    }

    fn validate_boxes(&self, level: usize, boxes: &[AmrBox]) -> Result<(), HierarchyError> {
        let domain = self.geometry.domain_box(level);
        for b in boxes {
            if !domain.contains_box(b) {
                return Err(HierarchyError::OutsideDomain { level, amr_box: *b });
            }
        }
        for (i, a) in boxes.iter().enumerate() {
            for b in &boxes[i + 1..] {
                if a.intersect(b).is_some() {
                    return Err(HierarchyError::OverlappingBoxes {
                        level,
                        first: *a,
                        second: *b,
                    });
                }
            }
        }
        if level == 0 {
            return Ok(());
        }

        let coarse = &self.levels[level - 1];
        let coarse_domain = coarse.domain();
        for b in boxes {
            let needed = b.coarsen(REFINEMENT_RATIO).grow(NESTING_BUFFER);
            let needed = match coarse.period() {
                Some(_) => needed,
                None => needed.intersect(&coarse_domain).unwrap_or(needed),
            };
            for cell in needed.cells() {
                let wrapped = match coarse.period() {
                    Some(p) => coarse_domain.lower + (cell - coarse_domain.lower).rem_euclid(p),
                    None => cell,
                };
                if !coarse.boxes().iter().any(|cb| cb.contains(wrapped)) {
                    return Err(HierarchyError::NotNested { level, amr_box: *b });
                }
            }
        }
        Ok(())
    }
}

fn chop(b: AmrBox, max_size: usize) -> Vec<AmrBox> {
    let len = b.len();
    if len <= max_size {
        return vec![b];
    }
    let pieces = len.div_ceil(max_size);
    let base = len / pieces;
    let extra = len % pieces;
    let mut lower = b.lower;
    (0..pieces)
        .map(|k| {
            let size = (base + usize::from(k < extra)) as i32;
            let piece = AmrBox::new(lower, lower + size - 1);
            lower += size;
            piece
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hierarchy(periodic: bool) -> PatchHierarchy {
        let geometry = GridGeometry::new(0.0, 0.1, 40, periodic).unwrap();
        let mut h = PatchHierarchy::new(geometry, 3).with_max_patch_size(20);
        h.make_level(0, &[AmrBox::new(0, 39)]).unwrap();
        h
    }

    #[test]
    fn large_boxes_are_chopped() {
        let h = hierarchy(false);
        assert_eq!(
            h.level(0).unwrap().boxes(),
            vec![AmrBox::new(0, 19), AmrBox::new(20, 39)]
        );
    }

    #[test]
    fn fine_level_must_be_nested() {
        let mut h = hierarchy(false);
        assert!(h.make_level(1, &[AmrBox::new(20, 59)]).is_ok());
        let mut h = hierarchy(false);
        h.make_level(0, &[AmrBox::new(0, 9)]).unwrap();
        assert!(matches!(
            h.make_level(1, &[AmrBox::new(10, 19)]),
            Err(HierarchyError::NotNested { .. })
        ));
    }

    #[test]
    fn levels_cannot_be_skipped() {
        let mut h = hierarchy(false);
        assert!(matches!(
            h.make_level(2, &[AmrBox::new(0, 3)]),
            Err(HierarchyError::LevelOutOfRange { .. })
        ));
    }

    #[test]
    fn remaking_a_level_returns_the_old_one() {
        let mut h = hierarchy(false);
        h.make_level(1, &[AmrBox::new(20, 39)]).unwrap();
        let old = h.make_level(1, &[AmrBox::new(30, 49)]).unwrap().unwrap();
        assert_eq!(old.boxes(), vec![AmrBox::new(20, 39)]);
        assert_eq!(h.level(1).unwrap().boxes(), vec![AmrBox::new(30, 49)]);
    }

    #[test]
    fn periodic_neighbour_found_across_boundary() {
        let h = hierarchy(true);
        let level = h.level(0).unwrap();
        // node -1 of the left patch is node 39 of the right patch
        let (q, local) = level.locate(Centering::Primal, -1, Some(0)).unwrap();
        assert_eq!(q, 1);
        assert_eq!(level.patch(1).layout().local_to_amr(local), 39);
    }

    #[test]
    fn level_ghost_cells_exclude_neighbours() {
        let mut h = hierarchy(true);
        h.make_level(1, &[AmrBox::new(20, 39), AmrBox::new(40, 59)]).unwrap();
        let fine = h.level(1).unwrap();
        assert_eq!(fine.level_ghost_cells(0), vec![AmrBox::new(18, 19)]);
        assert_eq!(fine.level_ghost_cells(1), vec![AmrBox::new(60, 61)]);
    }
}
