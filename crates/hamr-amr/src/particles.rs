//! Particle refine algorithms and schedules.
//!
//! Particles move between patches of one level by copy (patch ghosts),
//! from the level a rebuilt level replaces by copy, and from the coarser
//! level through the [`ParticleSplit`] operator (level ghosts and new
//! level interiors).

use hamr_core::{AmrBox, Particle, ParticleArray, ResourceId};
use tracing::debug;

use crate::{
    HierarchyError, ParticleSplit, ParticlesData, PatchHierarchy, PatchLevel, REFINEMENT_RATIO,
};

/// Particle array written by a schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParticleDestination {
    /// Domain particles.
    Domain,
    /// Copies of same-level neighbour particles in the ghost cells.
    PatchGhost,
    /// Level-ghost particles at the start of the coarse step.
    LevelGhostOld,
    /// Level-ghost particles at the end of the coarse step.
    LevelGhostNew,
}

impl ParticleDestination {
    fn array(self, data: &mut ParticlesData) -> &mut ParticleArray {
        match self {
            Self::Domain => &mut data.domain,
            Self::PatchGhost => &mut data.patch_ghost,
            Self::LevelGhostOld => &mut data.level_ghost_old,
            Self::LevelGhostNew => &mut data.level_ghost_new,
        }
    }

    fn stamp(self, data: &mut ParticlesData, time: f64) {
        match self {
            Self::Domain => data.time = time,
            Self::PatchGhost => {}
            Self::LevelGhostOld => data.old_time = time,
            Self::LevelGhostNew => data.new_time = time,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Source {
    SameLevel,
    Coarser,
    OldLevel,
}

#[derive(Clone, Debug, PartialEq)]
struct ParticleTransaction {
    dst_patch: usize,
    /// Destination cells to fill.
    cells: AmrBox,
    source: Source,
    src_patch: usize,
    /// Cells of the source level to read, in destination coordinates
    /// of that level.
    src_cells: AmrBox,
    /// Translation from source coordinates to destination coordinates
    /// (periodic images), in source-level cells.
    shift: i32,
}

/// Particle populations refined together.
#[derive(Clone, Debug, Default)]
pub struct ParticleRefineAlgorithm {
    ids: Vec<ResourceId>,
    split: ParticleSplit,
}

/// A precomputed plan filling one particle array on every patch of a
/// level.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleRefineSchedule {
    level: usize,
    destination: ParticleDestination,
    ids: Vec<ResourceId>,
    split: ParticleSplit,
    transactions: Vec<ParticleTransaction>,
}

fn coarse_transactions(
    coarse: &PatchLevel,
    dst_patch: usize,
    cells: AmrBox,
    out: &mut Vec<ParticleTransaction>,
) {
    // one coarse cell of margin: split children spread across cell edges
    let needed = cells.coarsen(REFINEMENT_RATIO).grow(1);
    for shift in coarse.shifts() {
        for (q, cpatch) in coarse.patches().iter().enumerate() {
            if let Some(src_cells) = cpatch.amr_box().shift(-shift).intersect(&needed) {
                out.push(ParticleTransaction {
                    dst_patch,
                    cells,
                    source: Source::Coarser,
                    src_patch: q,
                    src_cells,
                    shift,
                });
            }
        }
    }
}

impl ParticleRefineAlgorithm {
    /// Empty algorithm splitting with `split`.
    pub fn new(split: ParticleSplit) -> Self {
        Self {
            ids: Vec::new(),
            split,
        }
    }

    /// Add a population.
    pub fn register(&mut self, id: ResourceId) {
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
    }

    /// Registered populations.
    pub fn ids(&self) -> &[ResourceId] {
        &self.ids
    }

    fn schedule(
        &self,
        level: usize,
        destination: ParticleDestination,
        transactions: Vec<ParticleTransaction>,
    ) -> ParticleRefineSchedule {
        debug!(level, ?destination, transactions = transactions.len(), "particle schedule built");
        ParticleRefineSchedule {
            level,
            destination,
            ids: self.ids.clone(),
            split: self.split,
            transactions,
        }
    }

    /// Patch-ghost fill of `level` from same-level neighbours.
    pub fn create_patch_ghost_schedule(
        &self,
        hierarchy: &PatchHierarchy,
        level: usize,
    ) -> Result<ParticleRefineSchedule, HierarchyError> {
        let lvl = hierarchy.level(level)?;
        let mut transactions = Vec::new();
        for p in 0..lvl.len() {
            for cells in lvl.ghost_cells(p) {
                for shift in lvl.shifts() {
                    for (q, patch) in lvl.patches().iter().enumerate() {
                        if shift == 0 && q == p {
                            continue;
                        }
                        if let Some(overlap) = patch.amr_box().shift(-shift).intersect(&cells) {
                            transactions.push(ParticleTransaction {
                                dst_patch: p,
                                cells: overlap,
                                source: Source::SameLevel,
                                src_patch: q,
                                src_cells: overlap,
                                shift,
                            });
                        }
                    }
                }
            }
        }
        Ok(self.schedule(level, ParticleDestination::PatchGhost, transactions))
    }

    /// Level-ghost fill of `level` from the coarser level, written to the
    /// old or new level-ghost array.
    pub fn create_level_ghost_schedule(
        &self,
        hierarchy: &PatchHierarchy,
        level: usize,
        destination: ParticleDestination,
    ) -> Result<ParticleRefineSchedule, HierarchyError> {
        let fine = hierarchy.level(level)?;
        let coarse = hierarchy.level(level.checked_sub(1).ok_or(
            HierarchyError::LevelOutOfRange {
                level,
                available: hierarchy.number_of_levels(),
            },
        )?)?;
        let mut transactions = Vec::new();
        for p in 0..fine.len() {
            for cells in fine.level_ghost_cells(p) {
                coarse_transactions(coarse, p, cells, &mut transactions);
            }
        }
        Ok(self.schedule(level, destination, transactions))
    }

    /// Domain fill of the new level `level` from the coarser level.
    pub fn create_init_schedule(
        &self,
        hierarchy: &PatchHierarchy,
        level: usize,
    ) -> Result<ParticleRefineSchedule, HierarchyError> {
        let fine = hierarchy.level(level)?;
        let coarse = hierarchy.level(level.checked_sub(1).ok_or(
            HierarchyError::LevelOutOfRange {
                level,
                available: hierarchy.number_of_levels(),
            },
        )?)?;
        let mut transactions = Vec::new();
        for (p, patch) in fine.patches().iter().enumerate() {
            coarse_transactions(coarse, p, patch.amr_box(), &mut transactions);
        }
        Ok(self.schedule(level, ParticleDestination::Domain, transactions))
    }

    /// Domain fill of the rebuilt level `level`: particles of `old_level`
    /// where the levels overlap, split coarse particles elsewhere.
    pub fn create_regrid_schedule(
        &self,
        hierarchy: &PatchHierarchy,
        level: usize,
        old_level: &PatchLevel,
    ) -> Result<ParticleRefineSchedule, HierarchyError> {
        let fine = hierarchy.level(level)?;
        let coarse = match level {
            0 => None,
            l => Some(hierarchy.level(l - 1)?),
        };
        let mut transactions = Vec::new();
        for (p, patch) in fine.patches().iter().enumerate() {
            let interior = patch.amr_box();
            let mut uncovered = vec![interior];
            for (q, old) in old_level.patches().iter().enumerate() {
                if let Some(overlap) = old.amr_box().intersect(&interior) {
                    transactions.push(ParticleTransaction {
                        dst_patch: p,
                        cells: overlap,
                        source: Source::OldLevel,
                        src_patch: q,
                        src_cells: overlap,
                        shift: 0,
                    });
                }
                uncovered = uncovered
                    .iter()
                    .flat_map(|b| b.subtract(&old.amr_box()))
                    .collect();
            }
            if let Some(coarse) = coarse {
                for cells in uncovered {
                    coarse_transactions(coarse, p, cells, &mut transactions);
                }
            }
        }
        Ok(self.schedule(level, ParticleDestination::Domain, transactions))
    }
}

impl ParticleRefineSchedule {
    /// Destination level.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Array written.
    pub fn destination(&self) -> ParticleDestination {
        self.destination
    }

    /// Replace the destination array of every population on the level.
    /// `time` stamps the written array.
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

    fn gather(
        &self,
        hierarchy: &PatchHierarchy,
        old_level: Option<&PatchLevel>,
        id: ResourceId,
    ) -> Result<Vec<ParticleArray>, HierarchyError> {
        let level = hierarchy.level(self.level)?;
        let mut arrays = vec![ParticleArray::new(); level.len()];
        for tx in &self.transactions {
            let out = &mut arrays[tx.dst_patch];
            match tx.source {
                Source::SameLevel => {
                    let src = level.patch(tx.src_patch).particles(id)?;
                    out.extend(
                        src.domain
                            .iter()
                            .map(|p| p.shifted(-tx.shift))
                            .filter(|p| tx.cells.contains(p.i_cell)),
                    );
                }
                Source::OldLevel => {
                    let old =
                        old_level.ok_or(HierarchyError::MissingOldLevel { level: self.level })?;
                    let src = old.patch(tx.src_patch).particles(id)?;
                    out.extend(src.domain.iter().filter(|p| tx.cells.contains(p.i_cell)));
                }
                Source::Coarser => {
                    let coarse = hierarchy.level(self.level - 1)?;
                    let src = coarse.patch(tx.src_patch).particles(id)?;
                    for parent in src.domain.iter().map(|p| p.shifted(-tx.shift)) {
                        if tx.src_cells.contains(parent.i_cell) {
                            out.extend(
                                self.split
                                    .split(&parent)
                                    .into_iter()
                                    .filter(|c: &Particle| tx.cells.contains(c.i_cell)),
                            );
                        }
                    }
                }
            }
        }
        Ok(arrays)
    }

    fn execute(
        &self,
        hierarchy: &mut PatchHierarchy,
        old_level: Option<&PatchLevel>,
        time: f64,
    ) -> Result<(), HierarchyError> {
        for &id in &self.ids {
            let arrays = self.gather(hierarchy, old_level, id)?;
            let level = hierarchy.level_mut(self.level)?;
            for (patch, particles) in level.patches_mut().iter_mut().zip(arrays) {
                let data = patch.particles_mut(id)?;
                *self.destination.array(data) = particles;
                self.destination.stamp(data, time);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GridGeometry, ResourcesManager};

    fn setup(periodic: bool) -> (PatchHierarchy, ResourceId) {
        let geometry = GridGeometry::new(0.0, 0.1, 20, periodic).unwrap();
        let mut h = PatchHierarchy::new(geometry, 2).with_max_patch_size(10);
        let mut rm = ResourcesManager::new();
        let id = rm.register_particles("protons_particles").unwrap();
        h.make_level(0, &[AmrBox::new(0, 19)]).unwrap();
        h.make_level(1, &[AmrBox::new(10, 29)]).unwrap();
        for level in 0..2 {
            for patch in h.level_mut(level).unwrap().patches_mut() {
                rm.allocate(patch, id, 0.0).unwrap();
            }
        }
        // one particle per coarse cell, centered
        for patch in h.level_mut(0).unwrap().patches_mut() {
            let cells = patch.amr_box();
            let data = patch.particles_mut(id).unwrap();
            data.domain = cells
                .cells()
                .map(|c| Particle::at_position(c as f64 + 0.5, 1.0, 1.0, [c as f64, 0.0, 0.0]))
                .collect();
        }
        (h, id)
    }

    fn algorithm(id: ResourceId) -> ParticleRefineAlgorithm {
        let mut algo = ParticleRefineAlgorithm::new(ParticleSplit::default());
        algo.register(id);
        algo.register(id);
        algo
    }

    #[test]
    fn init_fills_fine_interior_with_split_particles() {
        let (mut h, id) = setup(false);
        let algo = algorithm(id);
        assert_eq!(algo.ids().len(), 1);
        let schedule = algo.create_init_schedule(&h, 1).unwrap();
        schedule.fill_data(&mut h, 0.5).unwrap();

        let patch = h.level(1).unwrap().patch(0);
        let data = patch.particles(id).unwrap();
        assert!(data.domain.iter().all(|p| patch.amr_box().contains(p.i_cell)));
        // content of the covered coarse cells is conserved
        let content: f64 = h
            .level(1)
            .unwrap()
            .patches()
            .iter()
            .flat_map(|p| p.particles(id).unwrap().domain.iter())
            .map(|p| p.weight * 0.05)
            .sum();
        assert!((content - 10.0 * 0.1).abs() < 1e-12);
        assert_eq!(data.time, 0.5);
    }

    #[test]
    fn level_ghosts_stay_in_level_ghost_cells() {
        let (mut h, id) = setup(false);
        let algo = algorithm(id);
        algo.create_level_ghost_schedule(&h, 1, ParticleDestination::LevelGhostNew)
            .unwrap()
            .fill_data(&mut h, 1.0)
            .unwrap();
        let level = h.level(1).unwrap();
        let first = level.patch(0).particles(id).unwrap();
        assert!(!first.level_ghost_new.is_empty());
        assert!(first
            .level_ghost_new
            .iter()
            .all(|p| p.i_cell == 8 || p.i_cell == 9));
        assert_eq!(first.new_time, 1.0);
        assert_eq!(first.time, 0.0);
    }

    #[test]
    fn patch_ghosts_come_from_the_neighbour() {
        let (mut h, id) = setup(true);
        let algo = algorithm(id);
        algo.create_patch_ghost_schedule(&h, 0)
            .unwrap()
            .fill_data(&mut h, 0.0)
            .unwrap();
        let level = h.level(0).unwrap();
        let left = level.patch(0).particles(id).unwrap();
        let mut cells: Vec<i32> = left.patch_ghost.iter().map(|p| p.i_cell).collect();
        cells.sort_unstable();
        // cells -2, -1 are periodic images of 18, 19
        assert_eq!(cells, vec![-2, -1, 10, 11]);
        let image = left.patch_ghost.iter().find(|p| p.i_cell == -1).unwrap();
        assert_eq!(image.v[0], 19.0);
    }

    #[test]
    fn regrid_keeps_old_particles_where_levels_overlap() {
        let (mut h, id) = setup(false);
        let algo = algorithm(id);
        algo.create_init_schedule(&h, 1)
            .unwrap()
            .fill_data(&mut h, 0.0)
            .unwrap();
        let marker = Particle::at_position(15.25, 7.0, 1.0, [0.0; 3]);
        h.level_mut(1)
            .unwrap()
            .patch_mut(0)
            .particles_mut(id)
            .unwrap()
            .domain = vec![marker];

        let old = h.make_level(1, &[AmrBox::new(14, 33)]).unwrap().unwrap();
        // the rebuilt level lost its data; allocate again
        let mut rm = ResourcesManager::new();
        rm.register_particles("protons_particles").unwrap();
        for patch in h.level_mut(1).unwrap().patches_mut() {
            rm.allocate(patch, id, 0.0).unwrap();
        }
        algo.create_regrid_schedule(&h, 1, &old)
            .unwrap()
            .fill_data_from_old(&mut h, &old, 0.0)
            .unwrap();
        let level = h.level(1).unwrap();
        let all: Vec<Particle> = level
            .patches()
            .iter()
            .flat_map(|p| p.particles(id).unwrap().domain.clone())
            .collect();
        assert!(all.contains(&marker));
        // cells 30..=33 were not on the old level and come from the coarse level
        assert!(all.iter().any(|p| p.i_cell >= 30));
        assert!(!all.iter().any(|p| (14..20).contains(&p.i_cell) && *p != marker));
    }
}
