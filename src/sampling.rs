use anyhow::{Result, anyhow};
use indexmap::IndexMap;
use petgraph::prelude::NodeIndex;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;

use crate::graph::model::{AgentAttributes, PreferenceGraph, RelationAttributes, RelationGraph};

#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub proposers: usize,
    pub reviewers: usize,
    /// Probability that a proposer lists a given reviewer.
    pub density: f64,
    /// When false, each reviewer relation is drawn independently of the
    /// proposer relation it would answer.
    pub reciprocal: bool,
    pub seed: Option<u64>,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            proposers: 4,
            reviewers: 4,
            density: 1.0,
            reciprocal: true,
            seed: None,
        }
    }
}

/// Random preference instances for tests and benchmarks.
///
/// Every agent scores the opposite side with a shuffled rank `1..=n`, so
/// higher is better and there are no ties within one agent's list.
pub struct InstanceSampler;

impl InstanceSampler {
    pub fn sample(config: &SampleConfig) -> Result<PreferenceGraph> {
        if !(0.0..=1.0).contains(&config.density) {
            return Err(anyhow!(
                "Relation density must lie in [0, 1], got {}",
                config.density
            ));
        }
        if config.proposers + config.reviewers == 0 {
            return Err(anyhow!("Requested an instance without agents"));
        }

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(config.seed.unwrap_or_else(random_seed));
        let proposer_ranks: Vec<Vec<f64>> = (0..config.proposers)
            .map(|_| shuffled_ranks(&mut rng, config.reviewers))
            .collect();
        let reviewer_ranks: Vec<Vec<f64>> = (0..config.reviewers)
            .map(|_| shuffled_ranks(&mut rng, config.proposers))
            .collect();

        let mut graph = RelationGraph::with_capacity(
            config.proposers + config.reviewers,
            2 * config.proposers * config.reviewers,
        );
        let mut node_lookup = IndexMap::new();
        let mut reverse_lookup = IndexMap::new();
        let mut add_agent = |graph: &mut RelationGraph, id: String| -> NodeIndex {
            let idx = graph.add_node(AgentAttributes::default());
            node_lookup.insert(id.clone(), idx);
            reverse_lookup.insert(idx, id);
            idx
        };
        let proposers: Vec<NodeIndex> = (0..config.proposers)
            .map(|i| add_agent(&mut graph, format!("p{i}")))
            .collect();
        let reviewers: Vec<NodeIndex> = (0..config.reviewers)
            .map(|j| add_agent(&mut graph, format!("r{j}")))
            .collect();

        for (i, &proposer) in proposers.iter().enumerate() {
            for (j, &reviewer) in reviewers.iter().enumerate() {
                let proposes = rng.gen_bool(config.density);
                let answers = if config.reciprocal {
                    proposes
                } else {
                    rng.gen_bool(config.density)
                };
                if proposes {
                    graph.add_edge(proposer, reviewer, relation(proposer_ranks[i][j]));
                }
                if answers {
                    graph.add_edge(reviewer, proposer, relation(reviewer_ranks[j][i]));
                }
            }
        }

        Ok(PreferenceGraph {
            graph,
            node_lookup,
            reverse_lookup,
            graph_attributes: IndexMap::new(),
        })
    }

    /// Sample `count` instances in parallel, seeding instance `k` with
    /// `seed + k`.
    pub fn sample_batch(config: &SampleConfig, count: usize) -> Result<Vec<PreferenceGraph>> {
        let base_seed = config.seed.unwrap_or_else(random_seed);
        (0..count)
            .into_par_iter()
            .map(|k| {
                let config = SampleConfig {
                    seed: Some(base_seed.wrapping_add(k as u64)),
                    ..config.clone()
                };
                Self::sample(&config)
            })
            .collect()
    }
}

fn shuffled_ranks(rng: &mut Xoshiro256PlusPlus, len: usize) -> Vec<f64> {
    let mut ranks: Vec<f64> = (1..=len).map(|rank| rank as f64).collect();
    ranks.shuffle(rng);
    ranks
}

fn relation(preference: f64) -> RelationAttributes {
    RelationAttributes {
        preference,
        extra: IndexMap::new(),
    }
}

fn random_seed() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use petgraph::visit::EdgeRef;

    #[test]
    fn dense_reciprocal_instance_is_complete() {
        let config = SampleConfig {
            proposers: 3,
            reviewers: 5,
            seed: Some(7),
            ..SampleConfig::default()
        };
        let graph = InstanceSampler::sample(&config).expect("sample");
        assert_eq!(graph.node_count(), 8);
        assert_eq!(graph.relation_count(), 30);
    }

    #[test]
    fn same_seed_gives_same_instance() {
        let config = SampleConfig {
            density: 0.5,
            reciprocal: false,
            seed: Some(11),
            ..SampleConfig::default()
        };
        let first = InstanceSampler::sample(&config).expect("sample");
        let second = InstanceSampler::sample(&config).expect("sample");
        assert_eq!(first.relation_count(), second.relation_count());
        for (a, b) in first
            .graph
            .edge_references()
            .zip(second.graph.edge_references())
        {
            assert_eq!((a.source(), a.target()), (b.source(), b.target()));
            assert_eq!(a.weight().preference, b.weight().preference);
        }
    }

    #[test]
    fn ranks_are_permutations() {
        let config = SampleConfig {
            proposers: 2,
            reviewers: 4,
            seed: Some(3),
            ..SampleConfig::default()
        };
        let graph = InstanceSampler::sample(&config).expect("sample");
        let mut ranks: Vec<f64> = ["r0", "r1", "r2", "r3"]
            .iter()
            .filter_map(|r| graph.preference("p0", r))
            .collect();
        ranks.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        assert_eq!(ranks, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn invalid_density_is_rejected() {
        let config = SampleConfig {
            density: 1.5,
            ..SampleConfig::default()
        };
        assert!(InstanceSampler::sample(&config).is_err());
    }

    #[test]
    fn batch_uses_consecutive_seeds() {
        let config = SampleConfig {
            density: 0.6,
            seed: Some(100),
            ..SampleConfig::default()
        };
        let batch = InstanceSampler::sample_batch(&config, 3).expect("batch");
        assert_eq!(batch.len(), 3);
        let second = InstanceSampler::sample(&SampleConfig {
            seed: Some(101),
            ..config.clone()
        })
        .expect("sample");
        assert_eq!(batch[1].relation_count(), second.relation_count());
    }
}
