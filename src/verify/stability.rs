use std::fmt::Write;

use petgraph::graph::{DiGraph, EdgeIndex};
use petgraph::prelude::NodeIndex;
use petgraph::visit::EdgeRef;

use crate::bipartite::Side;
use crate::matching::policy::{PreferencePolicy, strictly_prefers};
use crate::stores::{EngagementStore, LabelStore, PreferenceStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngagedPair {
    pub proposer: NodeIndex,
    pub reviewer: NodeIndex,
    pub proposal: EdgeIndex,
    pub response: EdgeIndex,
}

/// A proposer and a reviewer who would both rather be with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockingPair {
    pub proposer: NodeIndex,
    pub reviewer: NodeIndex,
}

#[derive(Debug, Clone)]
pub struct StabilityReport {
    pub is_stable: bool,
    pub pairs: Vec<EngagedPair>,
    pub blocking_pairs: Vec<BlockingPair>,
    pub inconsistencies: Vec<String>,
    pub explanation: String,
}

pub struct StabilityChecker;

impl StabilityChecker {
    /// Read the matching out of `engagement` and look for blocking pairs.
    ///
    /// Only reciprocal (proposer, reviewer) relations can block. An
    /// unmatched agent prefers any partner; a matched one needs a strict
    /// improvement under `policy`.
    pub fn assess<N, E, M, P, C, L>(
        graph: &DiGraph<N, E>,
        engagement: &M,
        preferences: &P,
        policy: &C,
        labels: &L,
    ) -> StabilityReport
    where
        M: EngagementStore + ?Sized,
        P: PreferenceStore + ?Sized,
        C: PreferencePolicy<P::Score> + ?Sized,
        L: LabelStore + ?Sized,
    {
        let mut explanation = String::new();
        let mut inconsistencies = Vec::new();
        let mut partner: Vec<Option<EngagedPair>> = vec![None; graph.node_count()];
        let mut pairs = Vec::new();

        for edge in graph.edge_references() {
            if !engagement.is_engaged(edge.id()) {
                continue;
            }
            let (source, target) = (edge.source(), edge.target());
            let reverse = graph
                .find_edge(target, source)
                .filter(|&reverse| engagement.is_engaged(reverse));
            let Some(reverse) = reverse else {
                inconsistencies.push(format!(
                    "relation {} -> {} engaged without its reverse",
                    source.index(),
                    target.index()
                ));
                continue;
            };
            match (labels.side(source), labels.side(target)) {
                (Some(Side::Proposer), Some(Side::Reviewer)) => {}
                (Some(Side::Reviewer), Some(Side::Proposer)) => continue,
                _ => {
                    inconsistencies.push(format!(
                        "relation {} -> {} engaged across agents of the same or no side",
                        source.index(),
                        target.index()
                    ));
                    continue;
                }
            }

            let pair = EngagedPair {
                proposer: source,
                reviewer: target,
                proposal: edge.id(),
                response: reverse,
            };
            for agent in [source, target] {
                if partner[agent.index()].is_some() {
                    inconsistencies.push(format!("agent {} engaged more than once", agent.index()));
                } else {
                    partner[agent.index()] = Some(pair);
                }
            }
            pairs.push(pair);
        }

        let mut blocking_pairs = Vec::new();
        for edge in graph.edge_references() {
            let (proposer, reviewer) = (edge.source(), edge.target());
            if labels.side(proposer) != Some(Side::Proposer)
                || labels.side(reviewer) != Some(Side::Reviewer)
            {
                continue;
            }
            let Some(response) = graph.find_edge(reviewer, proposer) else {
                continue;
            };
            let current = partner[proposer.index()];
            if current.is_some_and(|pair| pair.reviewer == reviewer) {
                continue;
            }

            let proposer_gains = match current {
                None => true,
                Some(pair) => strictly_prefers(
                    policy,
                    &preferences.preference(edge.id()),
                    &preferences.preference(pair.proposal),
                ),
            };
            if !proposer_gains {
                continue;
            }
            let reviewer_gains = match partner[reviewer.index()] {
                None => true,
                Some(pair) => strictly_prefers(
                    policy,
                    &preferences.preference(response),
                    &preferences.preference(pair.response),
                ),
            };
            if reviewer_gains {
                let _ = writeln!(
                    explanation,
                    "Blocking pair: proposer {} and reviewer {}",
                    proposer.index(),
                    reviewer.index()
                );
                blocking_pairs.push(BlockingPair { proposer, reviewer });
            }
        }

        for issue in &inconsistencies {
            let _ = writeln!(explanation, "Inconsistent engagement: {}", issue);
        }
        let is_stable = blocking_pairs.is_empty() && inconsistencies.is_empty();
        let _ = writeln!(
            explanation,
            "Engaged pairs {}, blocking pairs {}: stable {}",
            pairs.len(),
            blocking_pairs.len(),
            is_stable
        );

        StabilityReport {
            is_stable,
            pairs,
            blocking_pairs,
            inconsistencies,
            explanation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::policy::ComparisonPolicy;

    /// p0 = 0, p1 = 1, r0 = 2, r1 = 3, everyone reciprocal. Both proposers
    /// and both reviewers favour the same partner.
    fn square() -> (DiGraph<(), ()>, Vec<i32>, Vec<Option<Side>>) {
        let mut graph = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..4).map(|_| graph.add_node(())).collect();
        let relations = [
            (0, 2, 2),
            (0, 3, 1),
            (1, 2, 2),
            (1, 3, 1),
            (2, 0, 2),
            (2, 1, 1),
            (3, 0, 2),
            (3, 1, 1),
        ];
        let mut scores = Vec::new();
        for (source, target, score) in relations {
            graph.add_edge(nodes[source], nodes[target], ());
            scores.push(score);
        }
        let labels = vec![
            Some(Side::Proposer),
            Some(Side::Proposer),
            Some(Side::Reviewer),
            Some(Side::Reviewer),
        ];
        (graph, scores, labels)
    }

    fn engage(graph: &DiGraph<(), ()>, engaged: &mut Vec<bool>, a: usize, b: usize) {
        let (a, b) = (NodeIndex::new(a), NodeIndex::new(b));
        engaged.set_engaged(graph.find_edge(a, b).expect("relation"), true);
        engaged.set_engaged(graph.find_edge(b, a).expect("relation"), true);
    }

    #[test]
    fn preferred_pairing_is_stable() {
        let (graph, scores, labels) = square();
        let mut engaged = vec![false; graph.edge_count()];
        engage(&graph, &mut engaged, 0, 2);
        engage(&graph, &mut engaged, 1, 3);
        let report = StabilityChecker::assess(
            &graph,
            &engaged,
            &scores,
            &ComparisonPolicy::Greater,
            &labels,
        );
        assert!(report.is_stable, "{}", report.explanation);
        assert_eq!(report.pairs.len(), 2);
    }

    #[test]
    fn crossed_pairing_has_blocking_pair() {
        let (graph, scores, labels) = square();
        let mut engaged = vec![false; graph.edge_count()];
        engage(&graph, &mut engaged, 0, 3);
        engage(&graph, &mut engaged, 1, 2);
        let report = StabilityChecker::assess(
            &graph,
            &engaged,
            &scores,
            &ComparisonPolicy::Greater,
            &labels,
        );
        assert!(!report.is_stable);
        assert_eq!(
            report.blocking_pairs,
            vec![BlockingPair {
                proposer: NodeIndex::new(0),
                reviewer: NodeIndex::new(2)
            }]
        );
    }

    #[test]
    fn one_sided_engagement_is_inconsistent() {
        let (graph, scores, labels) = square();
        let mut engaged = vec![false; graph.edge_count()];
        engaged[0] = true;
        let report = StabilityChecker::assess(
            &graph,
            &engaged,
            &scores,
            &ComparisonPolicy::Greater,
            &labels,
        );
        assert!(!report.is_stable);
        assert_eq!(report.inconsistencies.len(), 1);
    }

    #[test]
    fn empty_matching_blocks_on_every_reciprocal_pair() {
        let (graph, scores, labels) = square();
        let engaged = vec![false; graph.edge_count()];
        let report = StabilityChecker::assess(
            &graph,
            &engaged,
            &scores,
            &ComparisonPolicy::Greater,
            &labels,
        );
        assert_eq!(report.blocking_pairs.len(), 4);
    }
}
