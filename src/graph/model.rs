use indexmap::IndexMap;
use petgraph::graph::{DiGraph, EdgeIndex};
use petgraph::prelude::NodeIndex;
use serde::{Deserialize, Serialize};

pub type AgentId = String;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AgentAttributes {
    pub label: Option<String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

/// A directed relation from one agent to a candidate on the opposite side.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RelationAttributes {
    pub preference: f64,
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawGraph {
    pub nodes: Vec<RawNode>,
    pub edges: Vec<RawEdge>,
    #[serde(default)]
    pub graph_attributes: IndexMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawNode {
    pub id: AgentId,
    #[serde(default)]
    pub attributes: IndexMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEdge {
    pub source: AgentId,
    pub target: AgentId,
    #[serde(default)]
    pub attributes: IndexMap<String, serde_json::Value>,
}

pub type RelationGraph = DiGraph<AgentAttributes, RelationAttributes>;

#[derive(Debug, Clone)]
pub struct PreferenceGraph {
    pub graph: RelationGraph,
    pub node_lookup: IndexMap<AgentId, NodeIndex>,
    pub reverse_lookup: IndexMap<NodeIndex, AgentId>,
    pub graph_attributes: IndexMap<String, serde_json::Value>,
}

impl PreferenceGraph {
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn relation_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn agent_id(&self, idx: NodeIndex) -> Option<&AgentId> {
        self.reverse_lookup.get(&idx)
    }

    /// Relation `source -> target`, looked up by external ids.
    pub fn relation(&self, source: &str, target: &str) -> Option<EdgeIndex> {
        let source = *self.node_lookup.get(source)?;
        let target = *self.node_lookup.get(target)?;
        self.graph.find_edge(source, target)
    }

    pub fn preference(&self, source: &str, target: &str) -> Option<f64> {
        self.relation(source, target)
            .and_then(|edge| self.graph.edge_weight(edge))
            .map(|attrs| attrs.preference)
    }
}
