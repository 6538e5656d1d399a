pub mod construction;
pub mod model;
pub mod serialization;

pub use construction::GraphLoader;
pub use model::{
    AgentAttributes, AgentId, PreferenceGraph, RawGraph, RelationAttributes, RelationGraph,
};
pub use serialization::{GraphWriter, MatchingView};
