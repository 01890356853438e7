//! Resolution
//!
//! A LOCATION node resolves when exactly one candidate holds a strictly
//! highest final score above the threshold. Ties and sub-threshold tops
//! leave the node unresolved; its candidates stay persisted for review.

use crate::resolve::scoring::LocaleCandidate;

/// Outcome of selecting from a ranked candidate list.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionOutcome {
    pub resolved: bool,
    /// Packed coordinate identity of the selection, when resolved
    pub selection: Option<u64>,
    /// The highest-contribution signal of the selection
    pub resolution_source: Option<String>,
}

impl ResolutionOutcome {
    fn unresolved() -> Self {
        Self {
            resolved: false,
            selection: None,
            resolution_source: None,
        }
    }
}

/// Select from a rank-ordered candidate list.
pub fn resolve_candidates(candidates: &[LocaleCandidate], threshold: f64) -> ResolutionOutcome {
    let Some(top) = candidates.first() else {
        return ResolutionOutcome::unresolved();
    };

    let top_score = top.total_score();
    if top_score < threshold {
        return ResolutionOutcome::unresolved();
    }

    // Strictly highest: a second candidate at the same score is a tie
    if candidates
        .get(1)
        .is_some_and(|second| second.total_score() >= top_score)
    {
        return ResolutionOutcome::unresolved();
    }

    ResolutionOutcome {
        resolved: true,
        selection: Some(top.locale.cid),
        resolution_source: top.top_signal().map(str::to_string),
    }
}
