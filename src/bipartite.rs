use std::collections::VecDeque;
use std::fmt;

use log::debug;
use petgraph::graph::DiGraph;
use petgraph::prelude::NodeIndex;
use serde::{Deserialize, Serialize};

use crate::error::MatchingError;
use crate::stores::LabelStore;

/// The two groups of a bipartite relation graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Proposer,
    Reviewer,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Proposer => Side::Reviewer,
            Side::Reviewer => Side::Proposer,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Proposer => "proposer",
            Side::Reviewer => "reviewer",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Splits a relation graph into proposers and reviewers by 2-coloring it.
pub struct BipartitePartitioner;

impl BipartitePartitioner {
    /// Label every agent of `graph` with a side.
    ///
    /// Relations are treated as undirected. Each connected component is
    /// seeded from its lowest-index agent, which becomes a proposer. Labels
    /// reach `labels` only when the whole graph is 2-colorable.
    pub fn partition<N, E, L>(graph: &DiGraph<N, E>, labels: &mut L) -> Result<(), MatchingError>
    where
        L: LabelStore + ?Sized,
    {
        let mut colors: Vec<Option<Side>> = vec![None; graph.node_count()];
        let mut queue = VecDeque::new();
        let mut components = 0usize;

        for seed in graph.node_indices() {
            if colors[seed.index()].is_some() {
                continue;
            }
            components += 1;
            colors[seed.index()] = Some(Side::Proposer);
            queue.push_back(seed);

            while let Some(agent) = queue.pop_front() {
                let side = colors[agent.index()].unwrap_or(Side::Proposer);
                for neighbor in graph.neighbors_undirected(agent) {
                    match colors[neighbor.index()] {
                        None => {
                            colors[neighbor.index()] = Some(side.opposite());
                            queue.push_back(neighbor);
                        }
                        Some(other) if other == side => {
                            return Err(MatchingError::NotBipartite {
                                first: agent.index(),
                                second: neighbor.index(),
                            });
                        }
                        Some(_) => {}
                    }
                }
            }
        }

        for (idx, side) in colors.into_iter().enumerate() {
            if let Some(side) = side {
                labels.set_side(NodeIndex::new(idx), side);
            }
        }
        debug!(
            "Partitioned {} agents into {} component(s)",
            graph.node_count(),
            components
        );
        Ok(())
    }
}

/// Exchange proposers and reviewers, e.g. to run the reviewer-proposing
/// variant of deferred acceptance.
pub fn swap_sides(labels: &mut [Option<Side>]) {
    for side in labels.iter_mut().flatten() {
        *side = side.opposite();
    }
}
