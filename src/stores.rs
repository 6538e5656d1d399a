//! Read/write capabilities the algorithms use instead of concrete fields.
//!
//! Every store is keyed by the graph's own `NodeIndex` / `EdgeIndex`, so the
//! partitioner and the matcher can run against the concrete
//! [`RelationGraph`](crate::graph::RelationGraph) or against plain vectors and
//! maps in tests.

use std::collections::HashMap;
use std::hash::BuildHasher;

use indexmap::IndexMap;
use petgraph::graph::{EdgeIndex, Graph};
use petgraph::prelude::NodeIndex;
use petgraph::EdgeType;

use crate::bipartite::Side;
use crate::graph::model::RelationAttributes;

/// Side label per agent, written by the partitioner.
pub trait LabelStore {
    fn side(&self, agent: NodeIndex) -> Option<Side>;
    fn set_side(&mut self, agent: NodeIndex, side: Side);
}

/// Preference score per relation, as seen from the relation's source.
pub trait PreferenceStore {
    type Score;

    fn preference(&self, relation: EdgeIndex) -> Self::Score;
}

/// Engaged flag per relation, written by the matcher.
pub trait EngagementStore {
    fn is_engaged(&self, relation: EdgeIndex) -> bool;
    fn set_engaged(&mut self, relation: EdgeIndex, engaged: bool);
}

impl LabelStore for Vec<Option<Side>> {
    fn side(&self, agent: NodeIndex) -> Option<Side> {
        self.get(agent.index()).copied().flatten()
    }

    fn set_side(&mut self, agent: NodeIndex, side: Side) {
        let idx = agent.index();
        if idx >= self.len() {
            self.resize(idx + 1, None);
        }
        self[idx] = Some(side);
    }
}

impl<S: BuildHasher> LabelStore for HashMap<NodeIndex, Side, S> {
    fn side(&self, agent: NodeIndex) -> Option<Side> {
        self.get(&agent).copied()
    }

    fn set_side(&mut self, agent: NodeIndex, side: Side) {
        self.insert(agent, side);
    }
}

impl LabelStore for IndexMap<NodeIndex, Side> {
    fn side(&self, agent: NodeIndex) -> Option<Side> {
        self.get(&agent).copied()
    }

    fn set_side(&mut self, agent: NodeIndex, side: Side) {
        self.insert(agent, side);
    }
}

impl<T: Clone> PreferenceStore for Vec<T> {
    type Score = T;

    fn preference(&self, relation: EdgeIndex) -> T {
        self[relation.index()].clone()
    }
}

impl<T: Clone, S: BuildHasher> PreferenceStore for HashMap<EdgeIndex, T, S> {
    type Score = T;

    fn preference(&self, relation: EdgeIndex) -> T {
        self[&relation].clone()
    }
}

impl<N, Ty: EdgeType> PreferenceStore for Graph<N, RelationAttributes, Ty> {
    type Score = f64;

    fn preference(&self, relation: EdgeIndex) -> f64 {
        self[relation].preference
    }
}

impl EngagementStore for Vec<bool> {
    fn is_engaged(&self, relation: EdgeIndex) -> bool {
        self.get(relation.index()).copied().unwrap_or(false)
    }

    fn set_engaged(&mut self, relation: EdgeIndex, engaged: bool) {
        let idx = relation.index();
        if idx >= self.len() {
            self.resize(idx + 1, false);
        }
        self[idx] = engaged;
    }
}

impl<S: BuildHasher> EngagementStore for HashMap<EdgeIndex, bool, S> {
    fn is_engaged(&self, relation: EdgeIndex) -> bool {
        self.get(&relation).copied().unwrap_or(false)
    }

    fn set_engaged(&mut self, relation: EdgeIndex, engaged: bool) {
        self.insert(relation, engaged);
    }
}
