use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use petgraph::dot::{Config, Dot};
use petgraph::visit::EdgeRef;
use serde_json::Value;

use crate::bipartite::Side;
use crate::graph::model::{
    AgentAttributes, PreferenceGraph, RawEdge, RawGraph, RawNode, RelationAttributes,
};

/// Matching state to annotate an exported graph with.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchingView<'a> {
    /// Engaged flag per relation index.
    pub engagement: &'a [bool],
    /// Side per agent index.
    pub sides: &'a [Option<Side>],
}

impl MatchingView<'_> {
    fn engaged(&self, relation: usize) -> Option<bool> {
        self.engagement.get(relation).copied()
    }

    fn side(&self, agent: usize) -> Option<Side> {
        self.sides.get(agent).copied().flatten()
    }
}

/// Helper for exporting preference graphs back to JSON files compatible
/// with the loader format, or to Graphviz for inspection.
pub struct GraphWriter;

impl GraphWriter {
    pub fn to_raw_graph(graph: &PreferenceGraph, view: Option<&MatchingView<'_>>) -> RawGraph {
        let mut nodes = Vec::with_capacity(graph.node_count());
        for (id, idx) in &graph.node_lookup {
            let mut attributes = build_node_attributes(&graph.graph[*idx]);
            if let Some(side) = view.and_then(|view| view.side(idx.index())) {
                attributes.insert("side".to_string(), Value::String(side.to_string()));
            }
            nodes.push(RawNode {
                id: id.clone(),
                attributes,
            });
        }

        let mut edges = Vec::with_capacity(graph.relation_count());
        for edge_ref in graph.graph.edge_references() {
            let (Some(source), Some(target)) = (
                graph.agent_id(edge_ref.source()),
                graph.agent_id(edge_ref.target()),
            ) else {
                continue;
            };
            let mut attributes = build_edge_attributes(edge_ref.weight());
            if let Some(engaged) = view.and_then(|view| view.engaged(edge_ref.id().index())) {
                attributes.insert("engaged".to_string(), Value::Bool(engaged));
            }
            edges.push(RawEdge {
                source: source.clone(),
                target: target.clone(),
                attributes,
            });
        }

        RawGraph {
            nodes,
            edges,
            graph_attributes: graph.graph_attributes.clone(),
        }
    }

    pub fn to_json_string(
        graph: &PreferenceGraph,
        view: Option<&MatchingView<'_>>,
    ) -> Result<String> {
        let raw = Self::to_raw_graph(graph, view);
        Ok(serde_json::to_string_pretty(&raw)?)
    }

    pub fn write_to_path(
        graph: &PreferenceGraph,
        view: Option<&MatchingView<'_>>,
        path: &Path,
    ) -> Result<()> {
        let json = Self::to_json_string(graph, view)?;
        write_file(path, &json)
    }

    /// Render as a Graphviz digraph: engaged relations red, other relations
    /// black and labelled with their preference; proposers blue, reviewers
    /// pink.
    pub fn to_dot(graph: &PreferenceGraph, view: Option<&MatchingView<'_>>) -> String {
        let edge_attrs = |engaged: bool, preference: f64| {
            format!(
                "label = \"{}\" color = \"{}\"",
                preference,
                if engaged { "red" } else { "black" }
            )
        };
        format!(
            "{:?}",
            Dot::with_attr_getters(
                &graph.graph,
                &[Config::NodeNoLabel, Config::EdgeNoLabel],
                &|_, edge| {
                    let engaged = view
                        .and_then(|view| view.engaged(edge.id().index()))
                        .unwrap_or(false);
                    edge_attrs(engaged, edge.weight().preference)
                },
                &|_, (idx, _)| {
                    let id = graph
                        .agent_id(idx)
                        .cloned()
                        .unwrap_or_else(|| idx.index().to_string());
                    let color = match view.and_then(|view| view.side(idx.index())) {
                        Some(Side::Proposer) => "blue",
                        Some(Side::Reviewer) => "pink",
                        None => "gray",
                    };
                    format!("label = {:?} color = \"{}\"", id, color)
                },
            )
        )
    }

    pub fn write_dot_to_path(
        graph: &PreferenceGraph,
        view: Option<&MatchingView<'_>>,
        path: &Path,
    ) -> Result<()> {
        write_file(path, &Self::to_dot(graph, view))
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    let mut file = File::create(path).with_context(|| format!("create output file {:?}", path))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("write output file {:?}", path))?;
    Ok(())
}

fn build_node_attributes(node: &AgentAttributes) -> IndexMap<String, Value> {
    let mut map = IndexMap::new();
    if let Some(label) = &node.label {
        map.insert("label".to_string(), Value::String(label.clone()));
    }
    for (key, value) in &node.extra {
        map.insert(key.clone(), value.clone());
    }
    map
}

fn build_edge_attributes(edge: &RelationAttributes) -> IndexMap<String, Value> {
    let mut map = IndexMap::new();
    if let Some(number) = serde_json::Number::from_f64(edge.preference) {
        map.insert("preference".to_string(), Value::Number(number));
    }
    for (key, value) in &edge.extra {
        map.insert(key.clone(), value.clone());
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::construction::GraphLoader;

    fn pair_graph() -> PreferenceGraph {
        GraphLoader::from_preference_matrices(&[vec![3.0]], &[vec![1.5]]).expect("matrices")
    }

    #[test]
    fn json_round_trip_preserves_preferences() {
        let graph = pair_graph();
        let json = GraphWriter::to_json_string(&graph, None).expect("json");
        let reloaded = GraphLoader::from_json_str(&json).expect("reload");
        assert_eq!(reloaded.preference("p0", "r0"), Some(3.0));
        assert_eq!(reloaded.preference("r0", "p0"), Some(1.5));
    }

    #[test]
    fn matching_view_annotates_json() {
        let graph = pair_graph();
        let engagement = vec![true, false];
        let sides = vec![Some(Side::Proposer), Some(Side::Reviewer)];
        let view = MatchingView {
            engagement: &engagement,
            sides: &sides,
        };
        let raw = GraphWriter::to_raw_graph(&graph, Some(&view));
        assert_eq!(raw.nodes[0].attributes["side"], Value::from("proposer"));
        assert_eq!(raw.nodes[1].attributes["side"], Value::from("reviewer"));
        assert_eq!(raw.edges[0].attributes["engaged"], Value::Bool(true));
        assert_eq!(raw.edges[1].attributes["engaged"], Value::Bool(false));
    }

    #[test]
    fn dot_marks_engaged_relations_and_sides() {
        let graph = pair_graph();
        let engagement = vec![true, true];
        let sides = vec![Some(Side::Proposer), Some(Side::Reviewer)];
        let view = MatchingView {
            engagement: &engagement,
            sides: &sides,
        };
        let dot = GraphWriter::to_dot(&graph, Some(&view));
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("label = \"p0\" color = \"blue\""));
        assert!(dot.contains("label = \"r0\" color = \"pink\""));
        assert!(dot.contains("label = \"3\" color = \"red\""));
        assert!(!dot.contains("black"));
    }
}
