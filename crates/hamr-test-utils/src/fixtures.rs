//! Reusable hierarchy and model fixtures.
//!
//! - [`periodic_hierarchy`]: a periodic domain with a full level 0.
//! - [`uniform_hybrid_model`] / [`uniform_mhd_model`]: registered-ready
//!   models of a uniform plasma.
//! - [`ModelSetup`]: resources, models and hierarchy wired together.
//! - [`set_vecfield`] / [`ghost_nodes`]: analytic profiles and the nodes to
//!   check them on.

use hamr_amr::{GridGeometry, PatchHierarchy, ResourcesManager};
use hamr_core::{AmrBox, Centering, ResourceId};
use hamr_model::{
    Electrons, ElectromagInitializer, HybridModel, IonPopulation, Ions, MaxwellianInitializer,
    MhdModel, PhysicalModel,
};

/// Level-0 mesh size of the fixtures.
pub const MESH_SIZE: f64 = 0.1;

/// Periodic hierarchy over `nbr_cells` level-0 cells of width
/// [`MESH_SIZE`], holding level 0 as a single patch.
pub fn periodic_hierarchy(nbr_cells: usize, max_levels: usize) -> PatchHierarchy {
    let geometry = GridGeometry::new(0.0, MESH_SIZE, nbr_cells, true)
        .expect("fixture geometry is valid");
    let mut hierarchy = PatchHierarchy::new(geometry, max_levels);
    hierarchy
        .make_level(0, &[AmrBox::new(0, nbr_cells as i32 - 1)])
        .expect("level 0 covers the domain");
    hierarchy
}

/// One proton population at unit density with thermal velocity 0.1,
/// isothermal electrons and zero initial fields.
pub fn uniform_hybrid_model(nbr_part_per_cell: usize) -> HybridModel {
    let ions = Ions::new(vec![IonPopulation::new(
        "protons",
        1.0,
        MaxwellianInitializer::uniform(1.0, 0.1, nbr_part_per_cell),
    )]);
    HybridModel::new(
        ions,
        Electrons::isothermal(0.1),
        ElectromagInitializer::zero(),
        0.0,
    )
}

/// Two populations of different masses, for moment tests.
pub fn two_population_hybrid_model(nbr_part_per_cell: usize) -> HybridModel {
    let ions = Ions::new(vec![
        IonPopulation::new(
            "protons",
            1.0,
            MaxwellianInitializer::uniform(1.0, 0.1, nbr_part_per_cell),
        ),
        IonPopulation::new(
            "alpha",
            4.0,
            MaxwellianInitializer::uniform(0.5, 0.05, nbr_part_per_cell),
        ),
    ]);
    HybridModel::new(
        ions,
        Electrons::isothermal(0.1),
        ElectromagInitializer::zero(),
        0.0,
    )
}

/// Uniform fluid at rest, density 2, `B = (1, 0, 0)`, temperature 0.04.
pub fn uniform_mhd_model() -> MhdModel {
    MhdModel::uniform(2.0, [1.0, 0.0, 0.0], 0.04)
}

/// `x -> slope * x + offset`.
pub fn affine(slope: f64, offset: f64) -> impl Fn(f64) -> f64 + Copy {
    move |x| slope * x + offset
}

/// Models and resources sharing one registry, ready to be allocated on
/// a hierarchy.
#[derive(Debug)]
pub struct ModelSetup {
    pub resources: ResourcesManager,
    pub models: Vec<PhysicalModel>,
}

impl ModelSetup {
    /// Register every model of `models`.
    pub fn new(models: Vec<PhysicalModel>) -> Self {
        let mut resources = ResourcesManager::new();
        let mut models = models;
        for model in &mut models {
            model
                .register_resources(&mut resources)
                .expect("fixture models register");
        }
        Self { resources, models }
    }

    /// Allocate `model` on every patch of `level`.
    pub fn allocate(&self, hierarchy: &mut PatchHierarchy, level: usize, model: usize, time: f64) {
        let model = &self.models[model];
        for patch in hierarchy
            .level_mut(level)
            .expect("level exists")
            .patches_mut()
        {
            model
                .allocate(&self.resources, patch, time)
                .expect("fixture allocation");
        }
    }

    /// The hybrid model at `index`.
    pub fn hybrid(&self, index: usize) -> &HybridModel {
        self.models[index].as_hybrid().expect("a hybrid model")
    }

    /// The MHD model at `index`.
    pub fn mhd(&self, index: usize) -> &MhdModel {
        self.models[index].as_mhd().expect("an MHD model")
    }
}

/// Set every node (ghosts included) of every component of `ids` on
/// `level` to `f(x)` and stamp them with `time`.
pub fn set_vecfield(
    hierarchy: &mut PatchHierarchy,
    level: usize,
    ids: &[ResourceId; 3],
    f: impl Fn(f64) -> f64,
    time: f64,
) {
    for patch in hierarchy
        .level_mut(level)
        .expect("level exists")
        .patches_mut()
    {
        for &id in ids {
            let field = patch.field_mut(id).expect("field allocated");
            field.fill_with(&f);
            field.set_time(time);
        }
    }
}

/// Set every node of every component of `ids` on `level` to `value`.
pub fn fill_vecfield(
    hierarchy: &mut PatchHierarchy,
    level: usize,
    ids: &[ResourceId; 3],
    value: f64,
) {
    for patch in hierarchy
        .level_mut(level)
        .expect("level exists")
        .patches_mut()
    {
        for &id in ids {
            patch.field_mut(id).expect("field allocated").fill(value);
        }
    }
}

/// AMR indices of the ghost nodes (or cells) of a patch covering
/// `amr_box`, left side first.
pub fn ghost_nodes(amr_box: AmrBox, ghost_width: i32, centering: Centering) -> Vec<i32> {
    let last_physical = match centering {
        Centering::Primal => amr_box.upper + 1,
        Centering::Dual => amr_box.upper,
    };
    (amr_box.lower - ghost_width..amr_box.lower)
        .chain(last_physical + 1..=last_physical + ghost_width)
        .collect()
}

/// Coordinate of AMR index `a` on `level` for `centering`.
pub fn coordinate(hierarchy: &PatchHierarchy, level: usize, centering: Centering, a: i32) -> f64 {
    let geometry = hierarchy.geometry();
    let shift = match centering {
        Centering::Primal => 0.0,
        Centering::Dual => 0.5,
    };
    geometry.origin() + (a as f64 + shift) * geometry.mesh_size(level)
}
