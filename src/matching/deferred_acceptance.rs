use std::collections::BTreeSet;

use log::{debug, trace};
use petgraph::graph::{DiGraph, EdgeIndex};
use petgraph::prelude::NodeIndex;
use petgraph::visit::EdgeRef;
use serde::Serialize;

use crate::bipartite::Side;
use crate::matching::policy::{PreferencePolicy, strictly_prefers};
use crate::stores::{EngagementStore, LabelStore, PreferenceStore};

/// Matcher-local state of one agent. Kept apart from [`Side`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Free,
    Engaged,
    /// A proposer with no viable reviewer left to propose to.
    Exhausted,
}

/// Counters describing one deferred-acceptance run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchStats {
    pub proposals: usize,
    pub acceptances: usize,
    pub displacements: usize,
    pub rejections: usize,
    pub exhausted: usize,
    /// Proposer relations ignored because the reviewer has no relation back.
    pub skipped_asymmetric: usize,
}

/// A proposer relation that can carry an engagement.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    proposal: EdgeIndex,
    response: EdgeIndex,
    reviewer: NodeIndex,
}

/// Engagement held by a reviewer.
#[derive(Debug, Clone, Copy)]
struct Held {
    proposer: NodeIndex,
    proposal: EdgeIndex,
    response: EdgeIndex,
}

/// Working state owned by a single run.
struct ProposalState {
    status: Vec<Status>,
    has_proposed: Vec<bool>,
    held: Vec<Option<Held>>,
    candidates: Vec<Vec<Candidate>>,
    free: BTreeSet<NodeIndex>,
}

/// Gale–Shapley deferred acceptance over a labeled relation graph.
pub struct StableMatcher;

impl StableMatcher {
    /// Run deferred acceptance until no free proposer can propose.
    ///
    /// Every engaged flag in `engagement` is cleared first; on return the
    /// flags mark the stable matching, set on both directions of each pair.
    /// The lowest-index free proposer is always served next, and its
    /// relations are scanned in creation order, replacing the current best
    /// whenever `policy` prefers the newcomer. Relations without a reverse
    /// relation are never proposed over. `labels` must come from a
    /// successful partition of `graph`.
    pub fn run<N, E, M, P, C, L>(
        graph: &DiGraph<N, E>,
        engagement: &mut M,
        preferences: &P,
        policy: &C,
        labels: &L,
    ) -> MatchStats
    where
        M: EngagementStore + ?Sized,
        P: PreferenceStore + ?Sized,
        C: PreferencePolicy<P::Score> + ?Sized,
        L: LabelStore + ?Sized,
    {
        let (stats, state) = Self::converge(graph, engagement, preferences, policy, labels);
        debug!(
            "Deferred acceptance converged: {} proposals, {} displacements, {} rejections, {} exhausted, {} agents engaged",
            stats.proposals,
            stats.displacements,
            stats.rejections,
            stats.exhausted,
            state.count(Status::Engaged)
        );
        stats
    }

    fn converge<N, E, M, P, C, L>(
        graph: &DiGraph<N, E>,
        engagement: &mut M,
        preferences: &P,
        policy: &C,
        labels: &L,
    ) -> (MatchStats, ProposalState)
    where
        M: EngagementStore + ?Sized,
        P: PreferenceStore + ?Sized,
        C: PreferencePolicy<P::Score> + ?Sized,
        L: LabelStore + ?Sized,
    {
        for edge in graph.edge_indices() {
            engagement.set_engaged(edge, false);
        }

        let mut stats = MatchStats::default();
        let mut state = ProposalState::new(graph, labels, &mut stats);

        while let Some(proposer) = state.free.pop_first() {
            if state.status[proposer.index()] != Status::Free {
                continue;
            }
            let Some(candidate) = state.best_candidate(proposer, preferences, policy) else {
                trace!("Proposer {} exhausted its candidates", proposer.index());
                state.status[proposer.index()] = Status::Exhausted;
                stats.exhausted += 1;
                continue;
            };

            state.has_proposed[candidate.proposal.index()] = true;
            stats.proposals += 1;
            let reviewer = candidate.reviewer;

            match (state.status[reviewer.index()], state.held[reviewer.index()]) {
                (Status::Engaged, Some(held)) => {
                    let challenger = preferences.preference(candidate.response);
                    let incumbent = preferences.preference(held.response);
                    if strictly_prefers(policy, &challenger, &incumbent) {
                        trace!(
                            "Reviewer {} trades proposer {} for proposer {}",
                            reviewer.index(),
                            held.proposer.index(),
                            proposer.index()
                        );
                        state.release(engagement, held);
                        state.engage(engagement, proposer, candidate);
                        stats.displacements += 1;
                    } else {
                        trace!(
                            "Reviewer {} rejects proposer {}",
                            reviewer.index(),
                            proposer.index()
                        );
                        state.free.insert(proposer);
                        stats.rejections += 1;
                    }
                }
                _ => {
                    trace!(
                        "Reviewer {} accepts proposer {}",
                        reviewer.index(),
                        proposer.index()
                    );
                    state.engage(engagement, proposer, candidate);
                    stats.acceptances += 1;
                }
            }
        }

        (stats, state)
    }
}

impl ProposalState {
    fn new<N, E, L>(graph: &DiGraph<N, E>, labels: &L, stats: &mut MatchStats) -> Self
    where
        L: LabelStore + ?Sized,
    {
        let node_count = graph.node_count();
        let mut candidates = vec![Vec::new(); node_count];
        let mut free = BTreeSet::new();

        for proposer in graph.node_indices() {
            if labels.side(proposer) != Some(Side::Proposer) {
                continue;
            }
            free.insert(proposer);

            let mut outgoing: Vec<Candidate> = Vec::new();
            for edge in graph.edges(proposer) {
                let reviewer = edge.target();
                if labels.side(reviewer) != Some(Side::Reviewer) {
                    continue;
                }
                match graph.find_edge(reviewer, proposer) {
                    Some(response) => outgoing.push(Candidate {
                        proposal: edge.id(),
                        response,
                        reviewer,
                    }),
                    None => stats.skipped_asymmetric += 1,
                }
            }
            // Adjacency lists yield the newest relation first.
            outgoing.sort_unstable_by_key(|candidate| candidate.proposal);
            candidates[proposer.index()] = outgoing;
        }

        Self {
            status: vec![Status::Free; node_count],
            has_proposed: vec![false; graph.edge_count()],
            held: vec![None; node_count],
            candidates,
            free,
        }
    }

    fn count(&self, status: Status) -> usize {
        self.status.iter().filter(|s| **s == status).count()
    }

    fn best_candidate<P, C>(
        &self,
        proposer: NodeIndex,
        preferences: &P,
        policy: &C,
    ) -> Option<Candidate>
    where
        P: PreferenceStore + ?Sized,
        C: PreferencePolicy<P::Score> + ?Sized,
    {
        let mut best: Option<(Candidate, P::Score)> = None;
        for candidate in &self.candidates[proposer.index()] {
            if self.has_proposed[candidate.proposal.index()] {
                continue;
            }
            let score = preferences.preference(candidate.proposal);
            let replace = match &best {
                Some((_, champion)) => policy.is_preferred(&score, champion),
                None => true,
            };
            if replace {
                best = Some((*candidate, score));
            }
        }
        best.map(|(candidate, _)| candidate)
    }

    fn engage<M>(&mut self, engagement: &mut M, proposer: NodeIndex, candidate: Candidate)
    where
        M: EngagementStore + ?Sized,
    {
        engagement.set_engaged(candidate.proposal, true);
        engagement.set_engaged(candidate.response, true);
        self.status[proposer.index()] = Status::Engaged;
        self.status[candidate.reviewer.index()] = Status::Engaged;
        self.held[candidate.reviewer.index()] = Some(Held {
            proposer,
            proposal: candidate.proposal,
            response: candidate.response,
        });
    }

    fn release<M>(&mut self, engagement: &mut M, held: Held)
    where
        M: EngagementStore + ?Sized,
    {
        debug_assert_eq!(self.status[held.proposer.index()], Status::Engaged);
        engagement.set_engaged(held.proposal, false);
        engagement.set_engaged(held.response, false);
        self.status[held.proposer.index()] = Status::Free;
        self.free.insert(held.proposer);
    }
}
