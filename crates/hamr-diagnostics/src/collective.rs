//! Reductions across the processes of a run.

/// Collective operations over the ranks of a run. Every rank must call
/// the same operations in the same order.
pub trait Collective {
    /// Rank of this process.
    fn rank(&self) -> usize;

    /// Number of ranks.
    fn size(&self) -> usize;

    /// Largest `value` over all ranks.
    fn max(&self, value: usize) -> usize;

    /// `value` of every rank, indexed by rank.
    fn all_gather(&self, value: usize) -> Vec<usize>;
}

/// A run of one process.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LocalCollective;

impl Collective for LocalCollective {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn max(&self, value: usize) -> usize {
        value
    }

    fn all_gather(&self, value: usize) -> Vec<usize> {
        vec![value]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_single_rank_reduces_to_itself() {
        let c = LocalCollective;
        assert_eq!((c.rank(), c.size()), (0, 1));
        assert_eq!(c.max(7), 7);
        assert_eq!(c.all_gather(3), vec![3]);
    }
}
