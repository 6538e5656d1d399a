pub mod batch;
pub mod workflow;

pub use batch::{BatchOutcome, BatchRunner, BatchStats, NamedInstance};
pub use workflow::{MatchedPair, MatchingConfig, MatchingSummary, MatchingWorkflow};
