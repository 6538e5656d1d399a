pub mod stability;

pub use stability::{BlockingPair, EngagedPair, StabilityChecker, StabilityReport};
