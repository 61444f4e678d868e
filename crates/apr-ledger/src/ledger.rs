// SPDX-License-Identifier: MIT OR Apache-2.0
//! The episode ledger: one per `correlation_id`, threaded through every
//! validator and mutated in place by every admitted packet.

use std::collections::VecDeque;

use apr_core::{FsmState, Packet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::assumptions::AssumptionLog;
use crate::budget::{BudgetCaps, BudgetTracker, BudgetUsage};
use crate::directives::DirectiveTable;
use crate::evidence_index::EvidenceIndex;
use crate::safe_mode::SafeMode;
use crate::tokens::TokenTable;

/// How many recently-admitted packets a ledger retains in full. Enough
/// for the FSM and invariant validators to look back across a verify
/// loop or an arbitration sequence without unbounded memory growth.
pub const RECENT_PACKETS_CAPACITY: usize = 256;

/// The mutable per-episode state threaded through every validator.
///
/// Owned exclusively by its episode's worker; external readers (the
/// integrity overlay, persistence) use [`EpisodeLedger::snapshot`].
#[derive(Debug, Clone)]
pub struct EpisodeLedger {
    correlation_id: String,
    campaign_id: Option<String>,
    budget: BudgetTracker,
    tokens: TokenTable,
    directives: DirectiveTable,
    evidence: EvidenceIndex,
    assumptions: AssumptionLog,
    recent_packets: VecDeque<Packet>,
    current_fsm_state: FsmState,
    /// Number of packets admitted since `S4_VERIFY` was entered; reset on
    /// every (re-)entry, used by the verification-loop-closure rule.
    packets_since_verify_start: u32,
    safe_mode: SafeMode,
    created_at: DateTime<Utc>,
}

impl EpisodeLedger {
    /// Create a fresh ledger in `S0_IDLE` for `correlation_id`.
    #[must_use]
    pub fn create(correlation_id: impl Into<String>, caps: BudgetCaps) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            campaign_id: None,
            budget: BudgetTracker::new(caps),
            tokens: TokenTable::new(),
            directives: DirectiveTable::new(),
            evidence: EvidenceIndex::new(),
            assumptions: AssumptionLog::new(),
            recent_packets: VecDeque::new(),
            current_fsm_state: FsmState::S0Idle,
            packets_since_verify_start: 0,
            safe_mode: SafeMode::Normal,
            created_at: Utc::now(),
        }
    }

    /// Attach a campaign id (builder-style).
    #[must_use]
    pub fn with_campaign_id(mut self, campaign_id: impl Into<String>) -> Self {
        self.campaign_id = Some(campaign_id.into());
        self
    }

    /// This episode's `correlation_id`.
    #[must_use]
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// This episode's `campaign_id`, if any.
    #[must_use]
    pub fn campaign_id(&self) -> Option<&str> {
        self.campaign_id.as_deref()
    }

    /// Current FSM state.
    #[must_use]
    pub fn current_fsm_state(&self) -> FsmState {
        self.current_fsm_state
    }

    /// Set the current FSM state, honoring a halted safe-mode override.
    pub fn set_fsm_state(&mut self, state: FsmState) {
        if self.current_fsm_state != FsmState::S4Verify && state == FsmState::S4Verify {
            self.packets_since_verify_start = 0;
        }
        self.current_fsm_state = state;
        if let Some(forced) = self.safe_mode.forced_fsm_state() {
            self.current_fsm_state = forced;
        }
    }

    /// Mutable access to the budget tracker.
    pub fn budget_mut(&mut self) -> &mut BudgetTracker {
        &mut self.budget
    }

    /// Read-only access to the budget tracker.
    #[must_use]
    pub fn budget(&self) -> &BudgetTracker {
        &self.budget
    }

    /// Mutable access to the token table.
    pub fn tokens_mut(&mut self) -> &mut TokenTable {
        &mut self.tokens
    }

    /// Read-only access to the token table.
    #[must_use]
    pub fn tokens(&self) -> &TokenTable {
        &self.tokens
    }

    /// Mutable access to the open-directives table.
    pub fn directives_mut(&mut self) -> &mut DirectiveTable {
        &mut self.directives
    }

    /// Read-only access to the open-directives table.
    #[must_use]
    pub fn directives(&self) -> &DirectiveTable {
        &self.directives
    }

    /// Mutable access to the evidence index.
    pub fn evidence_mut(&mut self) -> &mut EvidenceIndex {
        &mut self.evidence
    }

    /// Read-only access to the evidence index.
    #[must_use]
    pub fn evidence(&self) -> &EvidenceIndex {
        &self.evidence
    }

    /// Mutable access to the assumption/contradiction log.
    pub fn assumptions_mut(&mut self) -> &mut AssumptionLog {
        &mut self.assumptions
    }

    /// Read-only access to the assumption/contradiction log.
    #[must_use]
    pub fn assumptions(&self) -> &AssumptionLog {
        &self.assumptions
    }

    /// Current safe-mode level.
    #[must_use]
    pub fn safe_mode(&self) -> SafeMode {
        self.safe_mode
    }

    /// Demote (escalate) the ledger's safe-mode level. `HALTED` forces
    /// `current_fsm_state` to `S9_SAFEMODE`.
    pub fn escalate_safe_mode(&mut self, level: SafeMode) {
        self.safe_mode = self.safe_mode.escalate_to(level);
        if let Some(forced) = self.safe_mode.forced_fsm_state() {
            self.current_fsm_state = forced;
        }
    }

    /// Number of packets admitted since the current `S4_VERIFY` entry.
    #[must_use]
    pub fn packets_since_verify_start(&self) -> u32 {
        self.packets_since_verify_start
    }

    /// Append an admitted packet to the recent-packet log, evicting the
    /// oldest entry past [`RECENT_PACKETS_CAPACITY`].
    pub fn record_packet(&mut self, packet: Packet) {
        if self.current_fsm_state == FsmState::S4Verify {
            self.packets_since_verify_start += 1;
        }
        if self.recent_packets.len() >= RECENT_PACKETS_CAPACITY {
            self.recent_packets.pop_front();
        }
        self.recent_packets.push_back(packet);
    }

    /// All retained packets, oldest first.
    #[must_use]
    pub fn recent_packets(&self) -> impl DoubleEndedIterator<Item = &Packet> {
        self.recent_packets.iter()
    }

    /// Most recently admitted packet, if any.
    #[must_use]
    pub fn last_packet(&self) -> Option<&Packet> {
        self.recent_packets.back()
    }

    /// Whether a packet with `packet_id` has already been admitted
    /// (global uniqueness invariant support).
    #[must_use]
    pub fn contains_packet_id(&self, packet_id: &str) -> bool {
        self.recent_packets.iter().any(|p| p.header.packet_id == packet_id)
    }

    /// Whether `previous_packet_id` resolves to a packet already admitted
    /// to this episode.
    #[must_use]
    pub fn resolves_previous(&self, previous_packet_id: &str) -> bool {
        self.contains_packet_id(previous_packet_id)
    }

    /// Immutable snapshot suitable for persistence or cross-thread reads.
    #[must_use]
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            correlation_id: self.correlation_id.clone(),
            campaign_id: self.campaign_id.clone(),
            budget_caps: self.budget.caps(),
            budget_usage: self.budget.usage(),
            current_fsm_state: self.current_fsm_state,
            safe_mode: self.safe_mode,
            open_directive_count: self.directives.len(),
            evidence_entry_count: self.evidence.entries().len(),
            unresolved_contradiction_count: self.assumptions.unresolved_contradictions().count(),
            recent_packet_count: self.recent_packets.len(),
            created_at: self.created_at,
        }
    }
}

/// Serializable point-in-time view of an [`EpisodeLedger`], for
/// persistence and cross-component reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Episode identity.
    pub correlation_id: String,
    /// Campaign grouping, if any.
    pub campaign_id: Option<String>,
    /// Initial budget caps.
    pub budget_caps: BudgetCaps,
    /// Cumulative budget usage.
    pub budget_usage: BudgetUsage,
    /// Current FSM state.
    pub current_fsm_state: FsmState,
    /// Current safe-mode level.
    pub safe_mode: SafeMode,
    /// Number of directives still open.
    pub open_directive_count: usize,
    /// Number of evidence entries recorded.
    pub evidence_entry_count: usize,
    /// Number of contradictions still unresolved.
    pub unresolved_contradiction_count: usize,
    /// Number of packets retained in the recent-packet log.
    pub recent_packet_count: usize,
    /// When this ledger was created.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use apr_core::{PacketHeader, PacketKind, PacketPayload, SourceLayer};
    use apr_core::payload::ObservationPayload;
    use serde_json::json;

    fn caps() -> BudgetCaps {
        BudgetCaps { token_budget: 1000, tool_call_budget: 10, time_budget_seconds: 600, risk_budget: 100.0 }
    }

    fn observation_packet(id: &str) -> Packet {
        Packet::new(
            PacketHeader::new(id, PacketKind::Observation, Utc::now(), SourceLayer::TaskProsecution, "corr_1"),
            None,
            PacketPayload::Observation(ObservationPayload {
                observation_type: "market_tick".into(),
                data: json!({"price": 1}),
                source_tool: None,
                reliability: None,
            }),
        )
    }

    #[test]
    fn create_starts_in_idle_with_normal_safe_mode() {
        let ledger = EpisodeLedger::create("corr_1", caps());
        assert_eq!(ledger.current_fsm_state(), FsmState::S0Idle);
        assert_eq!(ledger.safe_mode(), SafeMode::Normal);
    }

    #[test]
    fn record_packet_tracks_uniqueness_and_resolution() {
        let mut ledger = EpisodeLedger::create("corr_1", caps());
        ledger.record_packet(observation_packet("pkt_1"));
        assert!(ledger.contains_packet_id("pkt_1"));
        assert!(ledger.resolves_previous("pkt_1"));
        assert!(!ledger.resolves_previous("pkt_missing"));
    }

    #[test]
    fn halted_safe_mode_forces_fsm_state() {
        let mut ledger = EpisodeLedger::create("corr_1", caps());
        ledger.set_fsm_state(FsmState::S3Decide);
        ledger.escalate_safe_mode(SafeMode::Halted);
        assert_eq!(ledger.current_fsm_state(), FsmState::S9Safemode);
        // Further explicit transitions stay pinned to safemode.
        ledger.set_fsm_state(FsmState::S1Sense);
        assert_eq!(ledger.current_fsm_state(), FsmState::S9Safemode);
    }

    #[test]
    fn recent_packets_evict_oldest_past_capacity() {
        let mut ledger = EpisodeLedger::create("corr_1", caps());
        for i in 0..(RECENT_PACKETS_CAPACITY + 5) {
            ledger.record_packet(observation_packet(&format!("pkt_{i}")));
        }
        assert_eq!(ledger.recent_packets().count(), RECENT_PACKETS_CAPACITY);
        assert!(!ledger.contains_packet_id("pkt_0"));
    }

    #[test]
    fn snapshot_reflects_current_state() {
        let mut ledger = EpisodeLedger::create("corr_1", caps());
        ledger.budget_mut().record(10, 1, 1, 0.0);
        let snap = ledger.snapshot();
        assert_eq!(snap.correlation_id, "corr_1");
        assert_eq!(snap.budget_usage.tokens, 10);
    }
}
