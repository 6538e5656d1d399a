use thiserror::Error;

/// Conditions the partitioner and the reciprocity check can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchingError {
    /// Two adjacent agents ended up on the same side while 2-coloring.
    #[error("relation structure is not bipartite: agents {first} and {second} share a side")]
    NotBipartite { first: usize, second: usize },

    /// A proposer-side relation has no reverse relation.
    #[error("relation {proposer} -> {reviewer} has no reverse relation")]
    MissingReverseRelation { proposer: usize, reviewer: usize },
}
