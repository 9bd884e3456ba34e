//! Field coarsen algorithms and schedules: fine-to-coarse restriction.

use std::sync::Arc;

use hamr_core::{Centering, ResourceId};
use smallvec::SmallVec;
use tracing::debug;

use crate::{CoarsenOperator, HierarchyError, PatchHierarchy, REFINEMENT_RATIO};

/// One quantity to restrict.
#[derive(Clone, Debug)]
pub struct CoarsenItem {
    /// Quantity written on the coarse level.
    pub dst: ResourceId,
    /// Quantity read on the fine level.
    pub src: ResourceId,
    /// Centering shared by both ids.
    pub centering: Centering,
    /// Restriction operator.
    pub operator: Arc<dyn CoarsenOperator>,
}

#[derive(Clone, Debug, PartialEq)]
struct CoarsenTransaction {
    dst_patch: usize,
    dst_local: usize,
    src_patch: usize,
    stencil: SmallVec<[(usize, f64); 3]>,
}

/// A set of coarsen items scheduled together.
#[derive(Clone, Debug, Default)]
pub struct CoarsenAlgorithm {
    items: Vec<CoarsenItem>,
}

/// A precomputed plan restricting a fine level onto its coarser level.
#[derive(Clone, Debug)]
pub struct CoarsenSchedule {
    fine_level: usize,
    items: Vec<(CoarsenItem, Vec<CoarsenTransaction>)>,
}

impl CoarsenAlgorithm {
    /// Empty algorithm.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item.
    pub fn register_coarsen(&mut self, item: CoarsenItem) {
        self.items.push(item);
    }

    /// Registered items.
    pub fn items(&self) -> &[CoarsenItem] {
        &self.items
    }

    /// Schedule restricting `fine_level` onto `fine_level - 1`.
    ///
    /// Every coarse node (or cell) of the coarse interior whose
    /// coincident fine point lies in a fine patch interior is written.
    pub fn create_schedule(
        &self,
        hierarchy: &PatchHierarchy,
        fine_level: usize,
    ) -> Result<CoarsenSchedule, HierarchyError> {
        let coarse_number = fine_level
            .checked_sub(1)
            .ok_or(HierarchyError::LevelOutOfRange {
                level: fine_level,
                available: hierarchy.number_of_levels(),
            })?;
        let coarse = hierarchy.level(coarse_number)?;
        let fine = hierarchy.level(fine_level)?;

        let mut items = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let c = item.centering;
            let mut transactions = Vec::new();
            for (cp, cpatch) in coarse.patches().iter().enumerate() {
                let layout = cpatch.layout();
                for i in layout.physical_range(c) {
                    let a = layout.local_to_amr(i);
                    let center = a * REFINEMENT_RATIO;
                    let Some((fp, center_local)) = fine.locate(c, center, None) else {
                        continue;
                    };
                    let fine_layout = fine.patch(fp).layout();
                    if c == Centering::Dual
                        && !fine_layout.physical_range(c).contains(&(center_local + 1))
                    {
                        continue;
                    }
                    let alloc = fine_layout.alloc_size(c) as i32;
                    let stencil: Option<SmallVec<[(usize, f64); 3]>> = item
                        .operator
                        .stencil(c, a)
                        .into_iter()
                        .map(|(f, w)| {
                            let local = center_local as i32 + (f - center);
                            (0..alloc).contains(&local).then_some((local as usize, w))
                        })
                        .collect();
                    if let Some(stencil) = stencil {
                        transactions.push(CoarsenTransaction {
                            dst_patch: cp,
                            dst_local: i,
                            src_patch: fp,
                            stencil,
                        });
                    }
                }
            }
            debug!(
                fine_level,
                operator = item.operator.name(),
                nodes = transactions.len(),
                "coarsen schedule built"
            );
            items.push((item.clone(), transactions));
        }
        Ok(CoarsenSchedule { fine_level, items })
    }
}

impl CoarsenSchedule {
    /// The level restricted from.
    pub fn fine_level(&self) -> usize {
        self.fine_level
    }

    /// `(coarse destination, fine source)` ids per item.
    pub fn ids(&self) -> Vec<(ResourceId, ResourceId)> {
        self.items.iter().map(|(i, _)| (i.dst, i.src)).collect()
    }

    /// Restrict the fine level onto the coarse level.
    pub fn fill_data(&self, hierarchy: &mut PatchHierarchy) -> Result<(), HierarchyError> {
        let (coarse, fine) = hierarchy.coarse_mut_and_fine(self.fine_level - 1)?;
        for (item, transactions) in &self.items {
            let mut writes = Vec::with_capacity(transactions.len());
            for tx in transactions {
                let src = fine.patch(tx.src_patch).field(item.src)?;
                let v: f64 = tx.stencil.iter().map(|&(l, w)| w * src[l]).sum();
                writes.push((tx.dst_patch, tx.dst_local, v));
            }
            for (p, i, v) in writes {
                coarse.patch_mut(p).field_mut(item.dst)?[i] = v;
            }
        }
        Ok(())
    }
}
