//! Data stored on patches: fields and particle arrays.

use std::ops::{Index, IndexMut};

use hamr_core::{Centering, GridLayout, ParticleArray, Quantity};

/// A scalar field on one patch, ghosts included.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldData {
    quantity: Quantity,
    layout: GridLayout,
    values: Vec<f64>,
    time: f64,
}

impl FieldData {
    /// Zero-filled field of `quantity` laid out by `layout`.
    pub fn new(quantity: Quantity, layout: GridLayout, time: f64) -> Self {
        let size = layout.alloc_size(quantity.centering());
        Self {
            quantity,
            layout,
            values: vec![0.0; size],
            time,
        }
    }

    /// The quantity stored.
    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Centering of the quantity.
    pub fn centering(&self) -> Centering {
        self.quantity.centering()
    }

    /// Layout of the owning patch.
    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no value is stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Stored values, ghosts included.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Mutable stored values, ghosts included.
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Simulation time the values correspond to.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Stamp the values with a new time.
    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    /// Local index of AMR index `a`.
    pub fn local(&self, a: i32) -> Option<usize> {
        self.layout.amr_to_local(a, self.centering())
    }

    /// Value at AMR index `a`.
    pub fn at_amr(&self, a: i32) -> Option<f64> {
        self.local(a).map(|i| self.values[i])
    }

    /// Physical local indices.
    pub fn physical_range(&self) -> std::ops::RangeInclusive<usize> {
        self.layout.physical_range(self.centering())
    }

    /// Set every value to `value`.
    pub fn fill(&mut self, value: f64) {
        self.values.fill(value);
    }

    /// Copy values and time from a field of identical shape.
    pub fn copy_from(&mut self, other: &FieldData) {
        self.values.copy_from_slice(&other.values);
        self.time = other.time;
    }

    /// Set every value from a function of the node coordinate.
    pub fn fill_with(&mut self, f: impl Fn(f64) -> f64) {
        let centering = self.centering();
        for (i, v) in self.values.iter_mut().enumerate() {
            *v = f(self.layout.coordinate(centering, i));
        }
    }
}

impl Index<usize> for FieldData {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.values[i]
    }
}

impl IndexMut<usize> for FieldData {
    fn index_mut(&mut self, i: usize) -> &mut f64 {
        &mut self.values[i]
    }
}

/// Particles of one ion population on one patch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParticlesData {
    /// Particles whose cell is inside the patch box.
    pub domain: ParticleArray,
    /// Copies of same-level neighbours' domain particles lying in the
    /// patch ghost cells.
    pub patch_ghost: ParticleArray,
    /// Working set of level-ghost particles for the current coarse step.
    pub level_ghost: ParticleArray,
    /// Level-ghost particles refined from the coarser level at the start
    /// of the current coarse step.
    pub level_ghost_old: ParticleArray,
    /// Level-ghost particles refined from the coarser level at the end of
    /// the current coarse step.
    pub level_ghost_new: ParticleArray,
    /// Coarse time of `level_ghost_old`.
    pub old_time: f64,
    /// Coarse time of `level_ghost_new`.
    pub new_time: f64,
    /// Time of the domain particles.
    pub time: f64,
}

impl ParticlesData {
    /// Empty particle data at `time`.
    pub fn new(time: f64) -> Self {
        Self {
            old_time: time,
            new_time: time,
            time,
            ..Self::default()
        }
    }

    /// Drop the transient ghost copies.
    pub fn clear_ghosts(&mut self) {
        self.patch_ghost.clear();
        self.level_ghost.clear();
    }
}

/// What a patch stores for one resource.
#[derive(Clone, Debug, PartialEq)]
pub enum PatchData {
    /// A scalar field.
    Field(FieldData),
    /// Particle arrays of one population.
    Particles(ParticlesData),
}

impl PatchData {
    /// Simulation time of the data.
    pub fn time(&self) -> f64 {
        match self {
            Self::Field(f) => f.time(),
            Self::Particles(p) => p.time,
        }
    }

    /// Stamp the data with a new time.
    pub fn set_time(&mut self, time: f64) {
        match self {
            Self::Field(f) => f.set_time(time),
            Self::Particles(p) => p.time = time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hamr_core::AmrBox;

    #[test]
    fn fill_with_evaluates_at_node_coordinates() {
        let layout = GridLayout::new(AmrBox::new(0, 3), 0.5, 1.0);
        let mut by = FieldData::new(Quantity::By, layout, 0.0);
        by.fill_with(|x| 2.0 * x);
        let first = by.physical_range().next().unwrap();
        assert_eq!(by[first], 2.0 * (1.0 + 0.25));
        assert_eq!(by.at_amr(0), Some(by[first]));
    }
}
