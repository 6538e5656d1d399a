use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use indexmap::IndexMap;
use petgraph::prelude::NodeIndex;

use crate::graph::model::{
    AgentAttributes, AgentId, PreferenceGraph, RawGraph, RelationAttributes, RelationGraph,
};

/// Attributes recomputed by every matching run; never read back from input.
const DERIVED_ATTRIBUTES: [&str; 2] = ["engaged", "side"];

/// High-level loader responsible for turning JSON documents and preference
/// matrices into in-memory relation graphs.
#[derive(Debug, Default)]
pub struct GraphLoader;

impl GraphLoader {
    /// Parse a JSON string into a preference graph.
    pub fn from_json_str(json: &str) -> Result<PreferenceGraph> {
        let raw: RawGraph = serde_json::from_str(json)?;
        Self::from_raw_graph(raw)
    }

    /// Read JSON graph data from a reader.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<PreferenceGraph> {
        let mut buf = String::new();
        reader.read_to_string(&mut buf)?;
        Self::from_json_str(&buf)
    }

    pub fn from_path(path: &Path) -> Result<PreferenceGraph> {
        let file = File::open(path).with_context(|| format!("open graph file {:?}", path))?;
        Self::from_reader(BufReader::new(file))
            .with_context(|| format!("parse graph file {:?}", path))
    }

    /// Build a complete instance from two score matrices.
    ///
    /// `proposer_rows[i][j]` is the score proposer `p{i}` gives reviewer
    /// `r{j}`; `reviewer_rows[j][i]` is the score reviewer `r{j}` gives
    /// proposer `p{i}`. For every pair the proposer's relation is inserted
    /// before the reviewer's, so relation creation order follows the
    /// reviewer order of each row.
    pub fn from_preference_matrices(
        proposer_rows: &[Vec<f64>],
        reviewer_rows: &[Vec<f64>],
    ) -> Result<PreferenceGraph> {
        let proposers = proposer_rows.len();
        let reviewers = reviewer_rows.len();
        for (i, row) in proposer_rows.iter().enumerate() {
            if row.len() != reviewers {
                bail!(
                    "Proposer row {} has {} scores, expected {}",
                    i,
                    row.len(),
                    reviewers
                );
            }
        }
        for (j, row) in reviewer_rows.iter().enumerate() {
            if row.len() != proposers {
                bail!(
                    "Reviewer row {} has {} scores, expected {}",
                    j,
                    row.len(),
                    proposers
                );
            }
        }
        for (side, rows) in [("Proposer", proposer_rows), ("Reviewer", reviewer_rows)] {
            for (i, row) in rows.iter().enumerate() {
                if let Some(k) = row.iter().position(|score| !score.is_finite()) {
                    bail!("{} row {} has non-finite score {} at column {}", side, i, row[k], k);
                }
            }
        }

        let mut graph =
            RelationGraph::with_capacity(proposers + reviewers, 2 * proposers * reviewers);
        let mut node_lookup = IndexMap::new();
        let mut reverse_lookup = IndexMap::new();

        let mut add_agent = |graph: &mut RelationGraph, id: AgentId| -> NodeIndex {
            let idx = graph.add_node(AgentAttributes {
                label: Some(id.clone()),
                extra: IndexMap::new(),
            });
            node_lookup.insert(id.clone(), idx);
            reverse_lookup.insert(idx, id);
            idx
        };

        let proposer_nodes: Vec<NodeIndex> = (0..proposers)
            .map(|i| add_agent(&mut graph, format!("p{i}")))
            .collect();
        let reviewer_nodes: Vec<NodeIndex> = (0..reviewers)
            .map(|j| add_agent(&mut graph, format!("r{j}")))
            .collect();

        for (i, &proposer) in proposer_nodes.iter().enumerate() {
            for (j, &reviewer) in reviewer_nodes.iter().enumerate() {
                graph.add_edge(proposer, reviewer, relation(proposer_rows[i][j]));
                graph.add_edge(reviewer, proposer, relation(reviewer_rows[j][i]));
            }
        }

        Ok(PreferenceGraph {
            graph,
            node_lookup,
            reverse_lookup,
            graph_attributes: IndexMap::new(),
        })
    }

    pub fn resolve_agent_id(graph: &PreferenceGraph, agent_id: &str) -> Option<NodeIndex> {
        graph.node_lookup.get(agent_id).copied()
    }

    fn from_raw_graph(raw: RawGraph) -> Result<PreferenceGraph> {
        let mut graph = RelationGraph::with_capacity(raw.nodes.len(), raw.edges.len());
        let mut node_lookup = IndexMap::new();
        let mut reverse_lookup = IndexMap::new();

        for raw_node in raw.nodes {
            if node_lookup.contains_key(&raw_node.id) {
                bail!("Duplicate node id: {}", raw_node.id);
            }
            let mut attributes = raw_node.attributes;
            strip_derived(&mut attributes);
            let label = attributes.shift_remove("label").and_then(value_to_string);
            let idx = graph.add_node(AgentAttributes {
                label,
                extra: attributes,
            });
            node_lookup.insert(raw_node.id.clone(), idx);
            reverse_lookup.insert(idx, raw_node.id);
        }

        for raw_edge in raw.edges {
            let source_idx = *node_lookup
                .get(&raw_edge.source)
                .ok_or_else(|| anyhow!("Unknown source node id: {}", raw_edge.source))?;
            let target_idx = *node_lookup
                .get(&raw_edge.target)
                .ok_or_else(|| anyhow!("Unknown target node id: {}", raw_edge.target))?;

            let mut attributes = raw_edge.attributes;
            strip_derived(&mut attributes);
            let preference = extract_preference(&mut attributes).ok_or_else(|| {
                anyhow!(
                    "Relation {} -> {} has no finite numeric preference",
                    raw_edge.source,
                    raw_edge.target
                )
            })?;
            graph.add_edge(
                source_idx,
                target_idx,
                RelationAttributes {
                    preference,
                    extra: attributes,
                },
            );
        }

        Ok(PreferenceGraph {
            graph,
            node_lookup,
            reverse_lookup,
            graph_attributes: raw.graph_attributes,
        })
    }
}

fn relation(preference: f64) -> RelationAttributes {
    RelationAttributes {
        preference,
        extra: IndexMap::new(),
    }
}

fn strip_derived(attrs: &mut IndexMap<String, serde_json::Value>) {
    for key in DERIVED_ATTRIBUTES {
        attrs.shift_remove(key);
    }
}

fn extract_preference(attrs: &mut IndexMap<String, serde_json::Value>) -> Option<f64> {
    attrs.shift_remove("preference").and_then(|value| match value {
        serde_json::Value::Number(num) => num.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
    .filter(|score| score.is_finite())
}

fn value_to_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(num) => Some(num.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph_json() -> String {
        r#"{
            "nodes": [
                {"id": "alice", "attributes": {"label": "Alice", "side": "reviewer"}},
                {"id": "bob", "attributes": {"label": "Bob"}}
            ],
            "edges": [
                {"source": "alice", "target": "bob", "attributes": {"preference": 2.5}},
                {"source": "bob", "target": "alice", "attributes": {"preference": "4", "engaged": true, "note": "x"}}
            ]
        }"#
        .to_string()
    }

    #[test]
    fn load_json_graph_keeps_relations_directed() {
        let graph = GraphLoader::from_json_str(&sample_graph_json()).expect("load graph");
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.relation_count(), 2);
        assert_eq!(graph.preference("alice", "bob"), Some(2.5));
        assert_eq!(graph.preference("bob", "alice"), Some(4.0));
    }

    #[test]
    fn derived_attributes_are_dropped() {
        let graph = GraphLoader::from_json_str(&sample_graph_json()).expect("load graph");
        let alice = GraphLoader::resolve_agent_id(&graph, "alice").expect("alice");
        assert!(graph.graph[alice].extra.is_empty());
        assert_eq!(graph.graph[alice].label.as_deref(), Some("Alice"));

        let edge = graph.relation("bob", "alice").expect("relation");
        let attrs = &graph.graph[edge];
        assert!(!attrs.extra.contains_key("engaged"));
        assert!(attrs.extra.contains_key("note"));
    }

    #[test]
    fn missing_preference_is_rejected() {
        let json = r#"{
            "nodes": [{"id": "a"}, {"id": "b"}],
            "edges": [{"source": "a", "target": "b"}]
        }"#;
        let err = GraphLoader::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("no numeric preference"));
    }

    #[test]
    fn unknown_endpoint_is_rejected() {
        let json = r#"{
            "nodes": [{"id": "a"}],
            "edges": [{"source": "a", "target": "z", "attributes": {"preference": 1}}]
        }"#;
        assert!(GraphLoader::from_json_str(json).is_err());
    }

    #[test]
    fn matrices_build_complete_instance() {
        let proposers = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
        let reviewers = vec![vec![7.0, 8.0, 9.0], vec![10.0, 11.0, 12.0]];
        let graph =
            GraphLoader::from_preference_matrices(&proposers, &reviewers).expect("matrices");
        assert_eq!(graph.node_count(), 5);
        assert_eq!(graph.relation_count(), 12);
        assert_eq!(graph.preference("p2", "r1"), Some(6.0));
        assert_eq!(graph.preference("r1", "p2"), Some(12.0));
        assert_eq!(graph.preference("r0", "p1"), Some(8.0));
    }

    #[test]
    fn ragged_matrices_are_rejected() {
        let proposers = vec![vec![1.0, 2.0], vec![3.0]];
        let reviewers = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        assert!(GraphLoader::from_preference_matrices(&proposers, &reviewers).is_err());
    }

    #[test]
    fn non_finite_preferences_are_rejected() {
        for score in ["\"NaN\"", "\"inf\"", "\"-inf\""] {
            let json = format!(
                r#"{{
                    "nodes": [{{"id": "p"}}, {{"id": "r"}}],
                    "edges": [{{"source": "p", "target": "r", "attributes": {{"preference": {score}}}}}]
                }}"#
            );
            let err = GraphLoader::from_json_str(&json).unwrap_err();
            assert!(err.to_string().contains("p -> r"), "{score}: {err}");
        }

        let proposers = vec![vec![1.0, f64::NAN]];
        let reviewers = vec![vec![1.0], vec![2.0]];
        assert!(GraphLoader::from_preference_matrices(&proposers, &reviewers).is_err());
        let proposers = vec![vec![1.0, 2.0]];
        let reviewers = vec![vec![f64::INFINITY], vec![2.0]];
        assert!(GraphLoader::from_preference_matrices(&proposers, &reviewers).is_err());
    }
}
