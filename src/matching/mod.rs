pub mod deferred_acceptance;
pub mod policy;
pub mod reciprocity;

pub use deferred_acceptance::{MatchStats, StableMatcher, Status};
pub use policy::{ComparisonPolicy, PreferencePolicy, strictly_prefers};
pub use reciprocity::{ReciprocityPolicy, check_reciprocity};
