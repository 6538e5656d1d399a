use serde::{Deserialize, Serialize};

/// Comparison strategy shared by both sides of the matching.
///
/// `is_preferred(candidate, incumbent)` answers whether `candidate` should
/// replace `incumbent`. Proposers pick their next reviewer with it directly;
/// reviewers only trade up on [`strictly_prefers`], so an inclusive policy
/// never lets a tie displace an engagement.
pub trait PreferencePolicy<S: ?Sized> {
    fn is_preferred(&self, candidate: &S, incumbent: &S) -> bool;
}

impl<S: ?Sized, F> PreferencePolicy<S> for F
where
    F: Fn(&S, &S) -> bool,
{
    fn is_preferred(&self, candidate: &S, incumbent: &S) -> bool {
        self(candidate, incumbent)
    }
}

/// `candidate` beats `incumbent` and the reverse does not hold.
pub fn strictly_prefers<S, C>(policy: &C, candidate: &S, incumbent: &S) -> bool
where
    S: ?Sized,
    C: PreferencePolicy<S> + ?Sized,
{
    policy.is_preferred(candidate, incumbent) && !policy.is_preferred(incumbent, candidate)
}

/// Named comparison policies over ordered scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonPolicy {
    /// Higher scores win; the first of tied candidates is kept.
    #[default]
    Greater,
    /// Higher scores win; the last of tied candidates is kept.
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl<S: PartialOrd + ?Sized> PreferencePolicy<S> for ComparisonPolicy {
    fn is_preferred(&self, candidate: &S, incumbent: &S) -> bool {
        match self {
            ComparisonPolicy::Greater => candidate > incumbent,
            ComparisonPolicy::GreaterOrEqual => candidate >= incumbent,
            ComparisonPolicy::Less => candidate < incumbent,
            ComparisonPolicy::LessOrEqual => candidate <= incumbent,
        }
    }
}
