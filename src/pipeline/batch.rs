use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::debug;
use rayon::prelude::*;

use crate::graph::PreferenceGraph;
use crate::pipeline::workflow::{MatchingConfig, MatchingSummary, MatchingWorkflow};

/// An instance together with the name it is reported under.
#[derive(Debug, Clone)]
pub struct NamedInstance {
    pub name: String,
    pub graph: Arc<PreferenceGraph>,
}

impl NamedInstance {
    pub fn new(name: impl Into<String>, graph: impl Into<Arc<PreferenceGraph>>) -> Self {
        Self {
            name: name.into(),
            graph: graph.into(),
        }
    }
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub name: String,
    pub result: Result<MatchingSummary>,
}

#[derive(Debug, Default, Clone)]
pub struct BatchStats {
    pub solved: usize,
    pub failed: usize,
    pub pairs: usize,
    pub proposals: usize,
    pub unstable: usize,
    pub wall_time: Duration,
}

/// Solves independent instances concurrently. Each instance runs its own
/// workflow over its own graph; nothing is shared between runs but the
/// read-only configuration.
pub struct BatchRunner {
    config: MatchingConfig,
}

impl BatchRunner {
    pub fn new(config: MatchingConfig) -> Self {
        Self { config }
    }

    /// Outcomes come back in input order; one failing instance does not
    /// stop the others.
    pub fn run(&self, instances: Vec<NamedInstance>) -> (Vec<BatchOutcome>, BatchStats) {
        let start = Instant::now();
        let outcomes: Vec<BatchOutcome> = instances
            .into_par_iter()
            .map(|instance| {
                let workflow = MatchingWorkflow::new(self.config.clone(), instance.graph);
                let result = workflow
                    .execute()
                    .with_context(|| format!("match instance {}", instance.name));
                BatchOutcome {
                    name: instance.name,
                    result,
                }
            })
            .collect();

        let mut stats = BatchStats::default();
        for outcome in &outcomes {
            match &outcome.result {
                Ok(summary) => {
                    stats.solved += 1;
                    stats.pairs += summary.pairs.len();
                    stats.proposals += summary.stats.proposals;
                    if summary
                        .stability
                        .as_ref()
                        .is_some_and(|report| !report.is_stable)
                    {
                        stats.unstable += 1;
                    }
                }
                Err(_) => stats.failed += 1,
            }
        }
        stats.wall_time = start.elapsed();
        debug!(
            "Batch finished: {} solved, {} failed in {:?}",
            stats.solved, stats.failed, stats.wall_time
        );
        (outcomes, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::{InstanceSampler, SampleConfig};

    #[test]
    fn batch_reports_each_instance_in_order() {
        let config = SampleConfig {
            proposers: 5,
            reviewers: 5,
            seed: Some(21),
            ..SampleConfig::default()
        };
        let graphs = InstanceSampler::sample_batch(&config, 4).expect("sample");
        let instances: Vec<NamedInstance> = graphs
            .into_iter()
            .enumerate()
            .map(|(k, graph)| NamedInstance::new(format!("instance_{k}"), graph))
            .collect();

        let (outcomes, stats) = BatchRunner::new(MatchingConfig::default()).run(instances);
        let names: Vec<&str> = outcomes.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["instance_0", "instance_1", "instance_2", "instance_3"]
        );
        assert_eq!(stats.solved, 4);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.unstable, 0);
        assert_eq!(stats.pairs, 20);
    }
}
