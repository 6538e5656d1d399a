use petgraph::graph::DiGraph;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::bipartite::Side;
use crate::error::MatchingError;
use crate::stores::LabelStore;

/// How a run treats a proposer relation whose reviewer has no relation back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReciprocityPolicy {
    /// Treat the relation as a non-viable candidate.
    #[default]
    SkipAsymmetric,
    /// Refuse to match until every proposer relation is reciprocated.
    RequireReciprocal,
}

/// Fail on the first proposer relation (in creation order) lacking a reverse relation.
pub fn check_reciprocity<N, E, L>(graph: &DiGraph<N, E>, labels: &L) -> Result<(), MatchingError>
where
    L: LabelStore + ?Sized,
{
    for edge in graph.edge_references() {
        let (source, target) = (edge.source(), edge.target());
        if labels.side(source) != Some(Side::Proposer) {
            continue;
        }
        if graph.find_edge(target, source).is_none() {
            return Err(MatchingError::MissingReverseRelation {
                proposer: source.index(),
                reviewer: target.index(),
            });
        }
    }
    Ok(())
}
