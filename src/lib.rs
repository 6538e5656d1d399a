pub mod bipartite;
pub mod error;
pub mod graph;
pub mod matching;
pub mod pipeline;
pub mod sampling;
pub mod stores;
pub mod verify;

pub use bipartite::{BipartitePartitioner, Side};
pub use error::MatchingError;
pub use graph::{AgentId, GraphLoader, GraphWriter, MatchingView, PreferenceGraph};
pub use matching::{
    ComparisonPolicy, MatchStats, PreferencePolicy, ReciprocityPolicy, StableMatcher,
};
pub use pipeline::{
    BatchRunner, MatchedPair, MatchingConfig, MatchingSummary, MatchingWorkflow, NamedInstance,
};
pub use sampling::{InstanceSampler, SampleConfig};
pub use stores::{EngagementStore, LabelStore, PreferenceStore};
pub use verify::{StabilityChecker, StabilityReport};
