//! Quantity communicators: one algorithm plus its schedules per level.
//!
//! A [`Communicator`] is parameterized by what it moves: [`Refiner`]s
//! refine fields (ghost, init and regrid fills), [`Synchronizer`]s coarsen
//! fields onto the coarser level and [`ParticleRefiner`]s move particles.
//! Schedules are cached per destination level; at most one schedule
//! exists per level and [`Communicator::add`] replaces it.

use std::fmt;
use std::sync::Arc;

use hamr_amr::{
    CoarsenAlgorithm, CoarsenItem, CoarsenOperator, CoarsenSchedule, ParticleRefineAlgorithm,
    ParticleRefineSchedule, RefineAlgorithm, RefineItem, RefineOperator, RefineSchedule,
    ResourcesManager, TimeInterpolateOperator,
};
use hamr_core::{Quantity, ResourceId, VecFieldDescriptor};
use indexmap::IndexMap;
use tracing::warn;

/// What a communicator moves.
pub trait CommunicatorKind {
    /// Algorithm type.
    type Algorithm: fmt::Debug + Default;
    /// Schedule type.
    type Schedule: fmt::Debug;
}

/// Field refinement.
#[derive(Debug)]
pub struct Refiner;

/// Field coarsening.
#[derive(Debug)]
pub struct Synchronizer;

/// Particle refinement.
#[derive(Debug)]
pub struct ParticleRefiner;

impl CommunicatorKind for Refiner {
    type Algorithm = RefineAlgorithm;
    type Schedule = RefineSchedule;
}

impl CommunicatorKind for Synchronizer {
    type Algorithm = CoarsenAlgorithm;
    type Schedule = CoarsenSchedule;
}

impl CommunicatorKind for ParticleRefiner {
    type Algorithm = ParticleRefineAlgorithm;
    type Schedule = ParticleRefineSchedule;
}

/// An algorithm and its cached schedules.
pub struct Communicator<K: CommunicatorKind> {
    algorithm: K::Algorithm,
    schedules: IndexMap<usize, K::Schedule>,
}

impl<K: CommunicatorKind> fmt::Debug for Communicator<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Communicator")
            .field("algorithm", &self.algorithm)
            .field("levels", &self.schedules.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<K: CommunicatorKind> Default for Communicator<K> {
    fn default() -> Self {
        Self::new(K::Algorithm::default())
    }
}

impl<K: CommunicatorKind> Communicator<K> {
    /// Communicator running `algorithm`, with no schedule yet.
    pub fn new(algorithm: K::Algorithm) -> Self {
        Self {
            algorithm,
            schedules: IndexMap::new(),
        }
    }

    /// The algorithm schedules are built from.
    pub fn algorithm(&self) -> &K::Algorithm {
        &self.algorithm
    }

    /// Cache `schedule` for `level`, replacing any previous one.
    pub fn add(&mut self, schedule: K::Schedule, level: usize) {
        self.schedules.insert(level, schedule);
    }

    /// Schedule cached for `level`. Never builds one.
    pub fn find_schedule(&self, level: usize) -> Option<&K::Schedule> {
        self.schedules.get(&level)
    }

    /// Drop the schedules of levels finer than `level`.
    pub fn remove_finer(&mut self, level: usize) {
        self.schedules.retain(|l, _| *l <= level);
    }

    /// Levels with a cached schedule.
    pub fn levels(&self) -> impl Iterator<Item = usize> + '_ {
        self.schedules.keys().copied()
    }
}

/// Resolve a component name, warning when it is unknown.
fn resolve(resources: &ResourcesManager, name: &str) -> Option<ResourceId> {
    let id = resources.id(name);
    if id.is_none() {
        warn!(quantity = name, "unresolved component skipped");
    }
    id
}

/// Ghost refiner of `ghost` from the coarse `model` field, linearly
/// interpolated in time between `old_model` and `model`.
pub fn make_refiner(
    ghost: &VecFieldDescriptor,
    model: &VecFieldDescriptor,
    old_model: &VecFieldDescriptor,
    resources: &ResourcesManager,
    spatial: Arc<dyn RefineOperator>,
    time: Arc<dyn TimeInterpolateOperator>,
) -> Communicator<Refiner> {
    let mut algorithm = RefineAlgorithm::new();
    for ((dst, quantity), ((src, _), (old, _))) in ghost
        .components()
        .zip(model.components().zip(old_model.components()))
    {
        let (Some(dst), Some(src), Some(old)) = (
            resolve(resources, dst),
            resolve(resources, src),
            resolve(resources, old),
        ) else {
            continue;
        };
        algorithm.register_refine(
            RefineItem::new(dst, src, quantity.centering(), spatial.clone())
                .with_time_interpolation(old, time.clone()),
        );
    }
    Communicator::new(algorithm)
}

/// Add same-time refine items of `source` (coarse) into `destination`
/// (fine) to `algorithm`.
pub fn register_vector_refine(
    algorithm: &mut RefineAlgorithm,
    destination: &VecFieldDescriptor,
    source: &VecFieldDescriptor,
    resources: &ResourcesManager,
    spatial: &Arc<dyn RefineOperator>,
) {
    for ((dst, quantity), (src, _)) in destination.components().zip(source.components()) {
        register_scalar_refine(algorithm, dst, src, quantity, resources, spatial);
    }
}

/// Add one same-time scalar refine item to `algorithm`.
pub fn register_scalar_refine(
    algorithm: &mut RefineAlgorithm,
    destination: &str,
    source: &str,
    quantity: Quantity,
    resources: &ResourcesManager,
    spatial: &Arc<dyn RefineOperator>,
) {
    if let (Some(dst), Some(src)) = (resolve(resources, destination), resolve(resources, source)) {
        algorithm.register_refine(RefineItem::new(dst, src, quantity.centering(), spatial.clone()));
    }
}

/// Add coarsen items restricting `fine` onto `coarse` to `algorithm`.
pub fn register_vector_coarsen(
    algorithm: &mut CoarsenAlgorithm,
    fine: &VecFieldDescriptor,
    coarse: &VecFieldDescriptor,
    resources: &ResourcesManager,
    operator: &Arc<dyn CoarsenOperator>,
) {
    for ((src, quantity), (dst, _)) in fine.components().zip(coarse.components()) {
        register_scalar_coarsen(algorithm, src, dst, quantity, resources, operator);
    }
}

/// Add one scalar coarsen item to `algorithm`.
pub fn register_scalar_coarsen(
    algorithm: &mut CoarsenAlgorithm,
    fine: &str,
    coarse: &str,
    quantity: Quantity,
    resources: &ResourcesManager,
    operator: &Arc<dyn CoarsenOperator>,
) {
    if let (Some(src), Some(dst)) = (resolve(resources, fine), resolve(resources, coarse)) {
        algorithm.register_coarsen(CoarsenItem {
            dst,
            src,
            centering: quantity.centering(),
            operator: operator.clone(),
        });
    }
}

/// Synchronizer restricting the fine `source` onto the coarse
/// `destination`.
pub fn make_synchronizer(
    source: &VecFieldDescriptor,
    destination: &VecFieldDescriptor,
    resources: &ResourcesManager,
    operator: Arc<dyn CoarsenOperator>,
) -> Communicator<Synchronizer> {
    let mut algorithm = CoarsenAlgorithm::new();
    register_vector_coarsen(&mut algorithm, source, destination, resources, &operator);
    Communicator::new(algorithm)
}
