//! Field refine algorithms and schedules.
//!
//! A [`RefineAlgorithm`] is a list of [`RefineItem`]s. From it, schedules
//! are created for one destination level:
//!
//! - ghost schedules fill the ghost nodes of every patch, from same-level
//!   neighbours (periodic images included) where they exist and otherwise
//!   by interpolation from the coarser level, optionally in time;
//! - init schedules fill a new level entirely from the coarser level;
//! - regrid schedules fill a rebuilt level from the level it replaces where
//!   the two overlap, from the coarser level elsewhere, then fill ghosts.
//!
//! Same-level and old-level copies read the destination quantity; coarse
//! interpolation reads the item's source (and old source when time
//! interpolated).

use std::sync::Arc;

use hamr_core::{Centering, ResourceId};
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::{
    HierarchyError, Patch, PatchHierarchy, PatchLevel, RefineOperator, TimeInterpolateOperator,
};

/// One quantity to refine.
#[derive(Clone, Debug)]
pub struct RefineItem {
    /// Quantity written on the destination level.
    pub dst: ResourceId,
    /// Coarse-level source at the current coarse time.
    pub src: ResourceId,
    /// Coarse-level source at the previous coarse time, for time
    /// interpolation.
    pub old: Option<ResourceId>,
    /// Centering shared by all the ids.
    pub centering: Centering,
    /// Spatial interpolation operator.
    pub operator: Arc<dyn RefineOperator>,
    /// Time interpolation operator, used together with `old`.
    pub time_op: Option<Arc<dyn TimeInterpolateOperator>>,
}

impl RefineItem {
    /// Spatial-only refinement of `src` into `dst`.
    pub fn new(
        dst: ResourceId,
        src: ResourceId,
        centering: Centering,
        operator: Arc<dyn RefineOperator>,
    ) -> Self {
        Self {
            dst,
            src,
            old: None,
            centering,
            operator,
            time_op: None,
        }
    }

    /// Interpolate in time between `old` and `src` on the coarse level.
    pub fn with_time_interpolation(
        mut self,
        old: ResourceId,
        time_op: Arc<dyn TimeInterpolateOperator>,
    ) -> Self {
        self.old = Some(old);
        self.time_op = Some(time_op);
        self
    }

    /// Whether coarse values are interpolated in time.
    pub fn is_time_interpolated(&self) -> bool {
        self.old.is_some() && self.time_op.is_some()
    }
}

/// A set of refine items scheduled together.
#[derive(Clone, Debug, Default)]
pub struct RefineAlgorithm {
    items: Vec<RefineItem>,
}

/// What a refine schedule fills.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefineScheduleKind {
    /// Ghost nodes only.
    Ghost,
    /// The whole new level from the coarser level.
    Init,
    /// The whole rebuilt level from the old level and the coarser level.
    Regrid,
}

#[derive(Clone, Debug, PartialEq)]
struct CopyTransaction {
    dst_patch: usize,
    dst_local: usize,
    src_patch: usize,
    src_local: usize,
}

#[derive(Clone, Debug, PartialEq)]
struct InterpolationTransaction {
    dst_patch: usize,
    dst_local: usize,
    stencil: SmallVec<[(usize, usize, f64); 3]>,
}

#[derive(Clone, Debug)]
struct ScheduledItem {
    item: RefineItem,
    old_level_copies: Vec<CopyTransaction>,
    interpolations: Vec<InterpolationTransaction>,
    same_level_copies: Vec<CopyTransaction>,
}

impl PartialEq for ScheduledItem {
    fn eq(&self, other: &Self) -> bool {
        self.item.dst == other.item.dst
            && self.item.src == other.item.src
            && self.item.old == other.item.old
            && self.item.centering == other.item.centering
            && self.item.is_time_interpolated() == other.item.is_time_interpolated()
            && self.old_level_copies == other.old_level_copies
            && self.interpolations == other.interpolations
            && self.same_level_copies == other.same_level_copies
    }
}

/// A precomputed plan filling one level for every item of an algorithm.
#[derive(Clone, Debug, PartialEq)]
pub struct RefineSchedule {
    level: usize,
    kind: RefineScheduleKind,
    items: Vec<ScheduledItem>,
    unfilled: usize,
}

fn coarse_stencil(
    coarse: &PatchLevel,
    item: &RefineItem,
    fine_index: i32,
) -> Option<SmallVec<[(usize, usize, f64); 3]>> {
    item.operator
        .stencil(item.centering, fine_index)
        .into_iter()
        .filter(|(_, w)| *w != 0.0)
        .map(|(a, w)| {
            coarse
                .locate(item.centering, a, None)
                .map(|(q, local)| (q, local, w))
        })
        .collect()
}

impl RefineAlgorithm {
    /// Empty algorithm.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item.
    pub fn register_refine(&mut self, item: RefineItem) {
        self.items.push(item);
    }

    /// Registered items.
    pub fn items(&self) -> &[RefineItem] {
        &self.items
    }

    /// Whether no item is registered.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Schedule filling the ghost nodes of `level`. With `use_coarser`
    /// false (or on level 0) only same-level neighbours are used.
    pub fn create_ghost_schedule(
        &self,
        hierarchy: &PatchHierarchy,
        level: usize,
        use_coarser: bool,
    ) -> Result<RefineSchedule, HierarchyError> {
        let fine = hierarchy.level(level)?;
        let coarse = match (use_coarser, level) {
            (true, l) if l > 0 => Some(hierarchy.level(l - 1)?),
            _ => None,
        };
        let mut items = Vec::with_capacity(self.items.len());
        let mut unfilled = 0usize;
        for item in &self.items {
            let mut scheduled = ScheduledItem::empty(item);
            for (p, patch) in fine.patches().iter().enumerate() {
                for i in ghost_indices(patch, item.centering) {
                    if !scheduled.same_level_ghost(fine, patch, p, i)
                        && !scheduled.interpolate_from(coarse, patch, p, i)
                    {
                        unfilled += 1;
                    }
                }
            }
            items.push(scheduled);
        }
        // Same-level-only schedules leave the level border to another fill.
        let complete = coarse.is_some() || level == 0;
        Ok(RefineSchedule::built(RefineScheduleKind::Ghost, level, items, unfilled, complete))
    }

    /// Schedule filling all of the new level `level` (ghosts included)
    /// from the coarser level.
    pub fn create_init_schedule(
        &self,
        hierarchy: &PatchHierarchy,
        level: usize,
    ) -> Result<RefineSchedule, HierarchyError> {
        let fine = hierarchy.level(level)?;
        let coarse = coarser(hierarchy, level)?;
        let mut items = Vec::with_capacity(self.items.len());
        let mut unfilled = 0usize;
        for item in &self.items {
            let mut scheduled = ScheduledItem::empty(item);
            for (p, patch) in fine.patches().iter().enumerate() {
                for i in 0..patch.layout().alloc_size(item.centering) {
                    if !scheduled.interpolate_from(Some(coarse), patch, p, i) {
                        unfilled += 1;
                    }
                }
            }
            items.push(scheduled);
        }
        Ok(RefineSchedule::built(RefineScheduleKind::Init, level, items, unfilled, true))
    }

    /// Schedule filling the rebuilt level `level` from `old_level` where
    /// they overlap and from the coarser level elsewhere.
    pub fn create_regrid_schedule(
        &self,
        hierarchy: &PatchHierarchy,
        level: usize,
        old_level: &PatchLevel,
    ) -> Result<RefineSchedule, HierarchyError> {
        let fine = hierarchy.level(level)?;
        let coarse = if level > 0 {
            Some(hierarchy.level(level - 1)?)
        } else {
            None
        };
        let mut items = Vec::with_capacity(self.items.len());
        let mut unfilled = 0usize;
        for item in &self.items {
            let mut scheduled = ScheduledItem::empty(item);
            for (p, patch) in fine.patches().iter().enumerate() {
                let layout = patch.layout();
                let physical = layout.physical_range(item.centering);
                for i in 0..layout.alloc_size(item.centering) {
                    let filled = if physical.contains(&i) {
                        scheduled.copy_from_old(old_level, patch, p, i)
                            || scheduled.interpolate_from(coarse, patch, p, i)
                    } else {
                        scheduled.same_level_ghost(fine, patch, p, i)
                            || scheduled.interpolate_from(coarse, patch, p, i)
                    };
                    if !filled {
                        unfilled += 1;
                    }
                }
            }
            items.push(scheduled);
        }
        Ok(RefineSchedule::built(RefineScheduleKind::Regrid, level, items, unfilled, true))
    }
}

fn coarser(hierarchy: &PatchHierarchy, level: usize) -> Result<&PatchLevel, HierarchyError> {
    match level.checked_sub(1) {
        Some(c) => hierarchy.level(c),
        None => Err(HierarchyError::LevelOutOfRange {
            level,
            available: hierarchy.number_of_levels(),
        }),
    }
}

fn ghost_indices(patch: &Patch, centering: Centering) -> impl Iterator<Item = usize> {
    let layout = patch.layout();
    let physical = layout.physical_range(centering);
    (0..layout.alloc_size(centering)).filter(move |i| !physical.contains(i))
}

impl ScheduledItem {
    fn empty(item: &RefineItem) -> Self {
        Self {
            item: item.clone(),
            old_level_copies: Vec::new(),
            interpolations: Vec::new(),
            same_level_copies: Vec::new(),
        }
    }

    fn same_level_ghost(&mut self, level: &PatchLevel, patch: &Patch, p: usize, i: usize) -> bool {
        let a = patch.layout().local_to_amr(i);
        match level.locate(self.item.centering, a, Some(p)) {
            Some((src_patch, src_local)) => {
                self.same_level_copies.push(CopyTransaction {
                    dst_patch: p,
                    dst_local: i,
                    src_patch,
                    src_local,
                });
                true
            }
            None => false,
        }
    }

    fn copy_from_old(&mut self, old: &PatchLevel, patch: &Patch, p: usize, i: usize) -> bool {
        let a = patch.layout().local_to_amr(i);
        match old.locate(self.item.centering, a, None) {
            Some((src_patch, src_local)) => {
                self.old_level_copies.push(CopyTransaction {
                    dst_patch: p,
                    dst_local: i,
                    src_patch,
                    src_local,
                });
                true
            }
            None => false,
        }
    }

    fn interpolate_from(
        &mut self,
        coarse: Option<&PatchLevel>,
        patch: &Patch,
        p: usize,
        i: usize,
    ) -> bool {
        let Some(coarse) = coarse else {
            return false;
        };
        let a = patch.layout().local_to_amr(i);
        match coarse_stencil(coarse, &self.item, a) {
            Some(stencil) => {
                self.interpolations.push(InterpolationTransaction {
                    dst_patch: p,
                    dst_local: i,
                    stencil,
                });
                true
            }
            None => false,
        }
    }
}

fn coarse_value(
    patch: &Patch,
    item: &RefineItem,
    local: usize,
    time: f64,
) -> Result<f64, HierarchyError> {
    let current = patch.field(item.src)?;
    match (&item.time_op, item.old) {
        (Some(op), Some(old_id)) => {
            let old = patch.field(old_id)?;
            Ok(op.interpolate(old[local], current[local], old.time(), current.time(), time))
        }
        _ => Ok(current[local]),
    }
}

fn apply(
    level: &mut PatchLevel,
    id: ResourceId,
    writes: &[(usize, usize, f64)],
) -> Result<(), HierarchyError> {
    for &(p, i, v) in writes {
        level.patch_mut(p).field_mut(id)?[i] = v;
    }
    Ok(())
}

impl RefineSchedule {
    fn built(
        kind: RefineScheduleKind,
        level: usize,
        items: Vec<ScheduledItem>,
        unfilled: usize,
        complete: bool,
    ) -> Self {
        if complete && unfilled > 0 {
            warn!(level, unfilled, ?kind, "refine schedule leaves nodes unfilled");
        } else {
            debug!(level, unfilled, ?kind, "refine schedule built");
        }
        Self {
            level,
            kind,
            items,
            unfilled,
        }
    }

    /// Destination level.
    pub fn level(&self) -> usize {
        self.level
    }

    /// What the schedule fills.
    pub fn kind(&self) -> RefineScheduleKind {
        self.kind
    }

    /// `(destination, source, old source)` ids per item.
    pub fn ids(&self) -> Vec<(ResourceId, ResourceId, Option<ResourceId>)> {
        self.items
            .iter()
            .map(|s| (s.item.dst, s.item.src, s.item.old))
            .collect()
    }

    /// Number of nodes written per execution.
    pub fn transaction_count(&self) -> usize {
        self.items
            .iter()
            .map(|s| s.old_level_copies.len() + s.interpolations.len() + s.same_level_copies.len())
            .sum()
    }

    /// Nodes no transaction writes.
    pub fn unfilled_count(&self) -> usize {
        self.unfilled
    }

    /// Execute the schedule at `time`. Init schedules stamp the filled
    /// data with `time`; ghost schedules leave data times untouched.
    pub fn fill_data(
        &self,
        hierarchy: &mut PatchHierarchy,
        time: f64,
    ) -> Result<(), HierarchyError> {
        self.execute(hierarchy, None, time)
    }

    /// Execute a regrid schedule, reading from the level it was built
    /// against.
    pub fn fill_data_from_old(
        &self,
        hierarchy: &mut PatchHierarchy,
        old_level: &PatchLevel,
        time: f64,
    ) -> Result<(), HierarchyError> {
        self.execute(hierarchy, Some(old_level), time)
    }

    fn execute(
        &self,
        hierarchy: &mut PatchHierarchy,
        old_level: Option<&PatchLevel>,
        time: f64,
    ) -> Result<(), HierarchyError> {
        for s in &self.items {
            let item = &s.item;
            let mut writes = Vec::with_capacity(s.old_level_copies.len() + s.interpolations.len());

            if !s.old_level_copies.is_empty() {
                let old = old_level.ok_or(HierarchyError::MissingOldLevel { level: self.level })?;
                for tx in &s.old_level_copies {
                    let v = old.patch(tx.src_patch).field(item.dst)?[tx.src_local];
                    writes.push((tx.dst_patch, tx.dst_local, v));
                }
            }

            if !s.interpolations.is_empty() {
                let coarse = coarser(hierarchy, self.level)?;
                for tx in &s.interpolations {
                    let mut v = 0.0;
                    for &(q, local, w) in &tx.stencil {
                        v += w * coarse_value(coarse.patch(q), item, local, time)?;
                    }
                    writes.push((tx.dst_patch, tx.dst_local, v));
                }
            }
            apply(hierarchy.level_mut(self.level)?, item.dst, &writes)?;

            if !s.same_level_copies.is_empty() {
                let level = hierarchy.level(self.level)?;
                let writes = s
                    .same_level_copies
                    .iter()
                    .map(|tx| {
                        let v = level.patch(tx.src_patch).field(item.dst)?[tx.src_local];
                        Ok((tx.dst_patch, tx.dst_local, v))
                    })
                    .collect::<Result<Vec<_>, HierarchyError>>()?;
                apply(hierarchy.level_mut(self.level)?, item.dst, &writes)?;
            }

            if self.kind != RefineScheduleKind::Ghost {
                for patch in hierarchy.level_mut(self.level)?.patches_mut() {
                    patch.field_mut(item.dst)?.set_time(time);
                }
            }
        }
        Ok(())
    }
}
