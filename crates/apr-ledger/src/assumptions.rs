// SPDX-License-Identifier: MIT OR Apache-2.0
//! Load-bearing assumptions and unresolved contradictions tracked across
//! an episode's decisions and belief updates.

/// A load-bearing assumption recorded from a `Decision` packet.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedAssumption {
    /// Free-text description of what is assumed.
    pub assumption: String,
    /// Packet id of the decision that introduced it.
    pub source_packet_id: String,
    /// Whether it has since been verified.
    pub verified: bool,
    /// Packet id of the `BeliefUpdate`/`TaskResult` that verified it, if any.
    pub verification_packet_id: Option<String>,
}

/// An unresolved contradiction surfaced by a `BeliefUpdate`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedContradiction {
    /// Human-readable description.
    pub description: String,
    /// Packet id that introduced the conflicting belief, if known.
    pub conflicting_packet_id: Option<String>,
    /// Packet id of the `BeliefUpdate` that raised this contradiction.
    pub raised_by_packet_id: String,
    /// Whether a later `BeliefUpdate` has resolved it.
    pub resolved: bool,
}

/// Assumption and contradiction bookkeeping for one episode.
#[derive(Debug, Clone, Default)]
pub struct AssumptionLog {
    assumptions: Vec<TrackedAssumption>,
    contradictions: Vec<TrackedContradiction>,
}

impl AssumptionLog {
    /// Empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a load-bearing assumption.
    pub fn record_assumption(&mut self, assumption: TrackedAssumption) {
        self.assumptions.push(assumption);
    }

    /// Mark every unverified assumption from `source_packet_id` as
    /// verified by `verification_packet_id`.
    pub fn verify_assumptions_from(&mut self, source_packet_id: &str, verification_packet_id: &str) {
        for a in &mut self.assumptions {
            if a.source_packet_id == source_packet_id && !a.verified {
                a.verified = true;
                a.verification_packet_id = Some(verification_packet_id.to_string());
            }
        }
    }

    /// All recorded assumptions.
    #[must_use]
    pub fn assumptions(&self) -> &[TrackedAssumption] {
        &self.assumptions
    }

    /// Record a contradiction.
    pub fn record_contradiction(&mut self, contradiction: TrackedContradiction) {
        self.contradictions.push(contradiction);
    }

    /// Resolve the most recent unresolved contradiction matching
    /// `description`, if any.
    pub fn resolve_contradiction(&mut self, description: &str) -> bool {
        if let Some(c) = self
            .contradictions
            .iter_mut()
            .rev()
            .find(|c| !c.resolved && c.description == description)
        {
            c.resolved = true;
            true
        } else {
            false
        }
    }

    /// All contradictions still unresolved.
    #[must_use]
    pub fn unresolved_contradictions(&self) -> impl Iterator<Item = &TrackedContradiction> {
        self.contradictions.iter().filter(|c| !c.resolved)
    }
}
