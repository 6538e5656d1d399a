use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{debug, info};
use petgraph::prelude::NodeIndex;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::bipartite::{BipartitePartitioner, Side, swap_sides};
use crate::error::MatchingError;
use crate::graph::{AgentId, MatchingView, PreferenceGraph};
use crate::matching::{
    ComparisonPolicy, MatchStats, ReciprocityPolicy, StableMatcher, check_reciprocity,
};
use crate::verify::{StabilityChecker, StabilityReport};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub policy: ComparisonPolicy,
    pub reciprocity: ReciprocityPolicy,
    /// Let the side the partitioner labels as reviewers do the proposing.
    pub swap_sides: bool,
    /// Check the converged matching for blocking pairs.
    pub verify: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            policy: ComparisonPolicy::Greater,
            reciprocity: ReciprocityPolicy::SkipAsymmetric,
            swap_sides: false,
            verify: true,
        }
    }
}

impl MatchingConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("open config file {:?}", path))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parse config file {:?}", path))
    }
}

/// One engaged (proposer, reviewer) couple, with each side's score of the
/// other.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedPair {
    pub proposer: AgentId,
    pub reviewer: AgentId,
    pub proposer_preference: f64,
    pub reviewer_preference: f64,
}

#[derive(Debug, Clone)]
pub struct MatchingSummary {
    pub pairs: Vec<MatchedPair>,
    /// Engaged flag per relation index.
    pub engagement: Vec<bool>,
    /// Side per agent index, after any swap.
    pub sides: Vec<Option<Side>>,
    pub stats: MatchStats,
    pub stability: Option<StabilityReport>,
    pub duration: Duration,
    pub audit_log: Vec<String>,
}

impl MatchingSummary {
    pub fn view(&self) -> MatchingView<'_> {
        MatchingView {
            engagement: &self.engagement,
            sides: &self.sides,
        }
    }

    pub fn unmatched(&self, side: Side) -> usize {
        let matched = self.pairs.len();
        let total = self.sides.iter().filter(|s| **s == Some(side)).count();
        total.saturating_sub(matched)
    }
}

/// Partition, match and verify a single preference graph.
pub struct MatchingWorkflow {
    config: MatchingConfig,
    graph: Arc<PreferenceGraph>,
}

impl MatchingWorkflow {
    pub fn new(config: MatchingConfig, graph: impl Into<Arc<PreferenceGraph>>) -> Self {
        Self {
            config,
            graph: graph.into(),
        }
    }

    pub fn graph(&self) -> &PreferenceGraph {
        &self.graph
    }

    pub fn execute(&self) -> Result<MatchingSummary> {
        let start = Instant::now();
        let graph = &self.graph.graph;
        let mut audit_log = Vec::new();

        let mut sides: Vec<Option<Side>> = vec![None; graph.node_count()];
        BipartitePartitioner::partition(graph, &mut sides).map_err(|err| self.named(err))?;
        if self.config.swap_sides {
            swap_sides(&mut sides);
            audit_log.push("Sides swapped: reviewers propose".to_string());
        }
        let proposers = sides.iter().filter(|s| **s == Some(Side::Proposer)).count();
        audit_log.push(format!(
            "Partition: {} proposers, {} reviewers",
            proposers,
            graph.node_count() - proposers
        ));

        if self.config.reciprocity == ReciprocityPolicy::RequireReciprocal {
            check_reciprocity(graph, &sides).map_err(|err| self.named(err))?;
            audit_log.push("Reciprocity: every proposer relation is answered".to_string());
        }

        let mut engagement = vec![false; graph.edge_count()];
        let stats = StableMatcher::run(graph, &mut engagement, graph, &self.config.policy, &sides);
        audit_log.push(format!(
            "Deferred acceptance: {} proposals, {} acceptances, {} displacements, {} rejections, {} exhausted, {} asymmetric skipped",
            stats.proposals,
            stats.acceptances,
            stats.displacements,
            stats.rejections,
            stats.exhausted,
            stats.skipped_asymmetric
        ));

        let stability = if self.config.verify {
            let report =
                StabilityChecker::assess(graph, &engagement, graph, &self.config.policy, &sides);
            audit_log.extend(report.explanation.lines().map(str::to_string));
            Some(report)
        } else {
            None
        };

        let pairs = self.collect_pairs(&engagement, &sides);
        let duration = start.elapsed();
        debug!(
            "Matched {} pairs over {} relations in {:?}",
            pairs.len(),
            graph.edge_count(),
            duration
        );

        Ok(MatchingSummary {
            pairs,
            engagement,
            sides,
            stats,
            stability,
            duration,
            audit_log,
        })
    }

    /// Attach agent ids to a core error; the typed error stays downcastable.
    fn named(&self, err: MatchingError) -> anyhow::Error {
        let name = |idx: usize| {
            self.graph
                .agent_id(NodeIndex::new(idx))
                .cloned()
                .unwrap_or_else(|| format!("#{idx}"))
        };
        let message = match err {
            MatchingError::NotBipartite { first, second } => format!(
                "partition agents: {} and {} are related but fall on the same side",
                name(first),
                name(second)
            ),
            MatchingError::MissingReverseRelation { proposer, reviewer } => format!(
                "check relation reciprocity: {} lists {} but gets no relation back",
                name(proposer),
                name(reviewer)
            ),
        };
        anyhow::Error::new(err).context(message)
    }

    fn collect_pairs(&self, engagement: &[bool], sides: &[Option<Side>]) -> Vec<MatchedPair> {
        let graph = &self.graph;
        let mut pairs = Vec::new();
        for edge in graph.graph.edge_references() {
            let (proposer, reviewer) = (edge.source(), edge.target());
            if !engagement[edge.id().index()] || sides[proposer.index()] != Some(Side::Proposer) {
                continue;
            }
            let Some(response) = graph.graph.find_edge(reviewer, proposer) else {
                continue;
            };
            let (Some(proposer_id), Some(reviewer_id)) =
                (graph.agent_id(proposer), graph.agent_id(reviewer))
            else {
                continue;
            };
            pairs.push(MatchedPair {
                proposer: proposer_id.clone(),
                reviewer: reviewer_id.clone(),
                proposer_preference: edge.weight().preference,
                reviewer_preference: graph.graph[response].preference,
            });
        }
        pairs
    }
}

/// Log a summary the way the command-line driver reports each instance.
pub fn log_summary(name: &str, summary: &MatchingSummary) {
    info!(
        "Instance {}: {} pairs, {} unmatched proposers, {} unmatched reviewers ({:?})",
        name,
        summary.pairs.len(),
        summary.unmatched(Side::Proposer),
        summary.unmatched(Side::Reviewer),
        summary.duration
    );
    for pair in &summary.pairs {
        info!(
            "Instance {}: {} <-> {} (scores {} / {})",
            name, pair.proposer, pair.reviewer, pair.proposer_preference, pair.reviewer_preference
        );
    }
    if let Some(report) = &summary.stability {
        info!(
            "Instance {}: stable {}, blocking pairs {}",
            name,
            report.is_stable,
            report.blocking_pairs.len()
        );
    }
}
