// SPDX-License-Identifier: MIT OR Apache-2.0
//! The twelve cross-policy invariant rules, evaluated over `(packet,
//! ledger)`. Every rule returns zero or more diagnostics; only
//! error-severity diagnostics reject the packet.

use apr_core::payload::{DecisionPayload, PacketPayload, TaskDirectivePayload};
use apr_core::{
    DecisionOutcome, EpistemicStatus, EvidenceRefType, FreshnessClass, McpEnvelope, Packet, QualityTier,
    StakesLevel, ToolsState, UncertaintyLevel,
};
use apr_ledger::EpisodeLedger;
use chrono::{DateTime, Utc};

use crate::diagnostics::{Diagnostic, Diagnostics};

/// Deployment-configurable freshness windows for INV-004; defaults match
/// the values named in the design notes.
#[derive(Debug, Clone, Copy)]
pub struct FreshnessWindows {
    /// Max age, in seconds, for `REALTIME` evidence.
    pub realtime_seconds: i64,
    /// Max age, in seconds, for `OPERATIONAL` evidence.
    pub operational_seconds: i64,
}

impl Default for FreshnessWindows {
    fn default() -> Self {
        Self { realtime_seconds: 60, operational_seconds: 3600 }
    }
}

const TRADEOFF_POLICIES: &[&str] = &["safety-first", "risk-adjusted", "min-regret", "expected-value"];

/// Evaluate all twelve invariant rules against `(packet, ledger)` at
/// time `now`, using `windows` for INV-004's freshness checks.
#[must_use]
pub fn check_invariants(packet: &Packet, ledger: &EpisodeLedger, now: DateTime<Utc>, windows: FreshnessWindows) -> Diagnostics {
    let mut diags = Diagnostics::new();

    inv_001_mcp_completeness(packet, &mut diags);
    if let PacketPayload::Decision(d) = &packet.payload {
        let mcp = packet.mcp.as_ref();
        inv_002_subpar_never_acts(d, mcp, &mut diags);
        inv_003_high_critical_safety(d, mcp, &mut diags);
        inv_006_arbitration_sequence(d, ledger, &mut diags);
        inv_010_degraded_tools_policy(d, mcp, &mut diags);
    }
    if let Some(mcp) = &packet.mcp {
        inv_004_no_live_truth_without_evidence(mcp, ledger, now, windows, &mut diags);
        inv_005_budget_overrun_approval(packet, ledger, &mut diags);
        inv_012_stakes_consistency(mcp, &mut diags);
    }
    if let PacketPayload::TaskDirective(t) = &packet.payload {
        inv_007_write_token_scope(t, ledger, now, &mut diags);
    }
    if let PacketPayload::Escalation(e) = &packet.payload {
        inv_009_escalation_structure(e, &mut diags);
    }

    diags
}

fn inv_001_mcp_completeness(packet: &Packet, diags: &mut Diagnostics) {
    if packet.requires_mcp() && packet.mcp.is_none() {
        diags.push(Diagnostic::error("INV-001", "mcp", "consequential packet has no MCP envelope"));
        return;
    }
    if let Some(mcp) = &packet.mcp
        && !mcp.evidence.is_well_formed()
    {
        diags.push(Diagnostic::error(
            "INV-001",
            "mcp.evidence",
            "evidence_absent_reason is required when evidence_refs is empty",
        ));
    }
}

fn inv_002_subpar_never_acts(decision: &DecisionPayload, mcp: Option<&McpEnvelope>, diags: &mut Diagnostics) {
    let Some(mcp) = mcp else { return };
    if mcp.quality.tier == QualityTier::Subpar && decision.decision_outcome == DecisionOutcome::Act {
        diags.push(Diagnostic::error("INV-002", "payload.decision_outcome", "SUBPAR quality tier cannot ACT"));
    }
}

fn inv_003_high_critical_safety(decision: &DecisionPayload, mcp: Option<&McpEnvelope>, diags: &mut Diagnostics) {
    let Some(mcp) = mcp else { return };
    if !matches!(mcp.stakes.stakes_level, StakesLevel::High | StakesLevel::Critical) {
        return;
    }
    let safe_non_acting = matches!(decision.decision_outcome, DecisionOutcome::VerifyFirst | DecisionOutcome::Escalate);
    let superb_act_fully_verified = decision.decision_outcome == DecisionOutcome::Act
        && mcp.quality.tier == QualityTier::Superb
        && decision.all_assumptions_verified();
    if !safe_non_acting && !superb_act_fully_verified {
        diags.push(Diagnostic::error(
            "INV-003",
            "payload.decision_outcome",
            "HIGH/CRITICAL stakes requires VERIFY_FIRST/ESCALATE, or ACT with SUPERB tier and all assumptions verified",
        ));
    }
}

fn inv_004_no_live_truth_without_evidence(
    mcp: &McpEnvelope,
    ledger: &EpisodeLedger,
    now: DateTime<Utc>,
    windows: FreshnessWindows,
    diags: &mut Diagnostics,
) {
    let needs_grounding = matches!(
        mcp.epistemics.status,
        EpistemicStatus::Inferred | EpistemicStatus::Hypothesized | EpistemicStatus::Unknown
    ) && matches!(mcp.epistemics.freshness_class, FreshnessClass::Realtime | FreshnessClass::Operational);
    if !needs_grounding {
        return;
    }

    let max_age = mcp.epistemics.stale_if_older_than_seconds.map(|s| s as i64).unwrap_or(match mcp.epistemics.freshness_class {
        FreshnessClass::Realtime => windows.realtime_seconds,
        _ => windows.operational_seconds,
    });

    let grounded = mcp.evidence.evidence_refs.iter().any(|r| {
        matches!(r.ref_type, EvidenceRefType::ToolOutput | EvidenceRefType::UserObservation) && r.is_fresh(now, max_age)
    }) || ledger.evidence().has_fresh_ref_of_type(EvidenceRefType::ToolOutput, now, max_age)
        || ledger.evidence().has_fresh_ref_of_type(EvidenceRefType::UserObservation, now, max_age);

    if !grounded {
        diags.push(Diagnostic::error(
            "INV-004",
            "mcp.evidence.evidence_refs",
            "inferred/hypothesized/unknown claims at REALTIME/OPERATIONAL freshness require a fresh tool_output or user_observation ref",
        ));
    }
}

fn inv_005_budget_overrun_approval(packet: &Packet, ledger: &EpisodeLedger, diags: &mut Diagnostics) {
    if !packet.requires_mcp() {
        return;
    }
    if matches!(packet.payload, PacketPayload::Escalation(_) | PacketPayload::IntegrityAlert(_)) {
        return;
    }
    if !ledger.budget().overrun_is_covered() {
        diags.push(Diagnostic::error(
            "INV-005",
            "mcp.budgets",
            "a budget axis is exceeded without a preceding Escalation(budget_insufficient) or Integrity override",
        ));
    }
}

fn inv_006_arbitration_sequence(decision: &DecisionPayload, ledger: &EpisodeLedger, diags: &mut Diagnostics) {
    if ledger.assumptions().unresolved_contradictions().next().is_none() {
        return;
    }
    if !decision.constraints_satisfied.constitutional_check || !decision.constraints_satisfied.budget_check {
        diags.push(Diagnostic::error(
            "INV-006",
            "payload.constraints_satisfied",
            "a decision following a recorded conflict must pass the constitutional and budget checks",
        ));
    }
    let cites_policy = TRADEOFF_POLICIES.iter().any(|p| decision.decision_summary.contains(p));
    if !cites_policy {
        diags.push(Diagnostic::warning(
            "INV-006",
            "payload.decision_summary",
            "should cite a named tradeoff policy (safety-first, risk-adjusted, min-regret, expected-value)",
        ));
    }
}

fn inv_007_write_token_scope(directive: &TaskDirectivePayload, ledger: &EpisodeLedger, now: DateTime<Utc>, diags: &mut Diagnostics) {
    if !directive.requires_authorization() {
        return;
    }
    let (Some(token_id), Some(tool_id), Some(operation_type)) =
        (&directive.authorization_token_id, &directive.tool_id, &directive.operation_type)
    else {
        diags.push(Diagnostic::error(
            "INV-007",
            "payload.authorization_token_id",
            "WRITE/MIXED directive requires authorization_token_id, tool_id, and operation_type",
        ));
        return;
    };
    if !ledger.tokens().can_authorize(token_id, now, tool_id, operation_type) {
        diags.push(Diagnostic::error(
            "INV-007",
            "payload.authorization_token_id",
            "referenced token is missing, expired, revoked, exhausted, or out of scope",
        ));
    }
}

fn inv_009_escalation_structure(escalation: &apr_core::payload::EscalationPayload, diags: &mut Diagnostics) {
    if !(2..=3).contains(&escalation.top_options.len()) {
        diags.push(Diagnostic::error("INV-009", "payload.top_options", "must have 2 or 3 options"));
    }
    if escalation.top_options.iter().any(|o| o.option_id.is_empty() || o.description.is_empty()) {
        diags.push(Diagnostic::error("INV-009", "payload.top_options", "every option needs an id and description"));
    }
    if escalation.evidence_gaps.is_empty() {
        diags.push(Diagnostic::error("INV-009", "payload.evidence_gaps", "must be non-empty"));
    }
    if escalation.recommended_next_step.trim().is_empty() {
        diags.push(Diagnostic::error("INV-009", "payload.recommended_next_step", "must be present"));
    }
}

fn inv_010_degraded_tools_policy(decision: &DecisionPayload, mcp: Option<&McpEnvelope>, diags: &mut Diagnostics) {
    let Some(mcp) = mcp else { return };
    let acting = decision.decision_outcome == DecisionOutcome::Act;
    match mcp.routing.tools_state {
        ToolsState::ToolsDown if matches!(mcp.stakes.stakes_level, StakesLevel::High | StakesLevel::Critical) && acting => {
            diags.push(Diagnostic::error(
                "INV-010",
                "payload.decision_outcome",
                "tools_down at HIGH/CRITICAL stakes forbids ACT",
            ));
        }
        ToolsState::ToolsPartial if mcp.stakes.stakes_level == StakesLevel::Medium => {
            if mcp.stakes.uncertainty != UncertaintyLevel::High {
                diags.push(Diagnostic::warning(
                    "INV-010",
                    "mcp.stakes.uncertainty",
                    "tools_partial at MEDIUM stakes should carry HIGH uncertainty",
                ));
            }
        }
        _ => {}
    }
}

fn inv_012_stakes_consistency(mcp: &McpEnvelope, diags: &mut Diagnostics) {
    use apr_core::{AdversarialityLevel, ImpactLevel, IrreversibilityLevel};
    let s = &mcp.stakes;
    let high_count = [
        s.impact == ImpactLevel::High,
        s.irreversibility == IrreversibilityLevel::Difficult,
        s.uncertainty == UncertaintyLevel::High,
        s.adversariality == AdversarialityLevel::High,
    ]
    .into_iter()
    .filter(|b| *b)
    .count();
    let any_medium_or_above = s.impact >= ImpactLevel::Medium
        || s.uncertainty >= UncertaintyLevel::Medium
        || s.adversariality >= AdversarialityLevel::Medium
        || s.irreversibility != IrreversibilityLevel::Reversible;

    let supportable = match s.stakes_level {
        StakesLevel::Critical => {
            s.impact == ImpactLevel::Critical || (s.impact == ImpactLevel::High && s.irreversibility == IrreversibilityLevel::Irreversible)
        }
        StakesLevel::High => high_count >= 2 || s.impact == ImpactLevel::Critical,
        StakesLevel::Medium => any_medium_or_above,
        StakesLevel::Low => !any_medium_or_above,
    };

    if !supportable {
        diags.push(Diagnostic::warning(
            "INV-012",
            "mcp.stakes.stakes_level",
            "stakes_level is not supportable by the four component axes",
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apr_core::payload::ConstraintsSatisfied;
    use apr_core::{
        AdversarialityLevel, Budgets, DefinitionOfDone, Epistemics, Evidence, EvidenceRef, ImpactLevel,
        Intent, IrreversibilityLevel, PacketHeader, PacketKind, Quality, Routing, RiskBudget, SourceLayer,
        StakesAxes, TaskClass, VerificationRequirement,
    };
    use apr_ledger::BudgetCaps;

    fn ledger() -> EpisodeLedger {
        EpisodeLedger::create(
            "corr_1",
            BudgetCaps { token_budget: 1000, tool_call_budget: 10, time_budget_seconds: 600, risk_budget: 10.0 },
        )
    }

    fn base_mcp(tier: QualityTier, stakes_level: StakesLevel, tools_state: ToolsState) -> McpEnvelope {
        McpEnvelope {
            intent: Intent { summary: "act".into(), scope: "x".into() },
            stakes: StakesAxes {
                impact: ImpactLevel::High,
                irreversibility: IrreversibilityLevel::Irreversible,
                uncertainty: UncertaintyLevel::High,
                adversariality: AdversarialityLevel::None,
                stakes_level,
            },
            quality: Quality {
                tier,
                satisficing_mode: false,
                definition_of_done: DefinitionOfDone { text: "d".into(), checks: vec!["c".into()] },
                verification_requirement: VerificationRequirement::Optional,
            },
            budgets: Budgets {
                token_budget: 1000,
                tool_call_budget: 10,
                time_budget_seconds: 600,
                risk_budget: RiskBudget { envelope: "bounded".into(), max_loss: 10.0 },
            },
            epistemics: Epistemics {
                status: EpistemicStatus::Derived,
                confidence: 0.9,
                calibration_note: None,
                freshness_class: FreshnessClass::Strategic,
                stale_if_older_than_seconds: None,
                assumptions: vec![],
            },
            evidence: Evidence { evidence_refs: vec![], evidence_absent_reason: Some("n/a".into()) },
            routing: Routing { task_class: TaskClass::Verify, tools_state },
        }
    }

    fn decision_packet(outcome: DecisionOutcome, mcp: McpEnvelope) -> Packet {
        Packet::new(
            PacketHeader::new("pkt_1", PacketKind::Decision, Utc::now(), SourceLayer::Executive, "corr_1"),
            Some(mcp),
            PacketPayload::Decision(DecisionPayload {
                decision_outcome: outcome,
                decision_summary: "go".into(),
                constraints_satisfied: ConstraintsSatisfied { constitutional_check: true, budget_check: true, tier_check: true },
                chosen_option: None,
                rejected_options: vec![],
                load_bearing_assumptions: vec![],
            }),
        )
    }

    #[test]
    fn inv002_subpar_cannot_act() {
        let l = ledger();
        let mcp = base_mcp(QualityTier::Subpar, StakesLevel::Low, ToolsState::ToolsOk);
        let packet = decision_packet(DecisionOutcome::Act, mcp);
        let diags = check_invariants(&packet, &l, Utc::now(), FreshnessWindows::default());
        assert!(diags.errors().any(|d| d.code == "INV-002"));
    }

    #[test]
    fn inv003_high_stakes_act_requires_superb_and_verified_assumptions() {
        let l = ledger();
        let mcp = base_mcp(QualityTier::Par, StakesLevel::High, ToolsState::ToolsOk);
        let packet = decision_packet(DecisionOutcome::Act, mcp);
        let diags = check_invariants(&packet, &l, Utc::now(), FreshnessWindows::default());
        assert!(diags.errors().any(|d| d.code == "INV-003"));
    }

    #[test]
    fn inv003_verify_first_at_high_stakes_passes() {
        let l = ledger();
        let mcp = base_mcp(QualityTier::Par, StakesLevel::High, ToolsState::ToolsOk);
        let packet = decision_packet(DecisionOutcome::VerifyFirst, mcp);
        let diags = check_invariants(&packet, &l, Utc::now(), FreshnessWindows::default());
        assert!(!diags.errors().any(|d| d.code == "INV-003"));
    }

    #[test]
    fn inv004_requires_fresh_grounding_for_inferred_realtime_claims() {
        let l = ledger();
        let mut mcp = base_mcp(QualityTier::Par, StakesLevel::Low, ToolsState::ToolsOk);
        mcp.epistemics.status = EpistemicStatus::Inferred;
        mcp.epistemics.freshness_class = FreshnessClass::Realtime;
        mcp.evidence.evidence_refs = vec![];
        mcp.evidence.evidence_absent_reason = Some("none yet".into());
        let packet = decision_packet(DecisionOutcome::VerifyFirst, mcp.clone());
        let diags = check_invariants(&packet, &l, Utc::now(), FreshnessWindows::default());
        assert!(diags.errors().any(|d| d.code == "INV-004"));

        let mut mcp_ok = mcp;
        mcp_ok.evidence.evidence_refs = vec![EvidenceRef::new(EvidenceRefType::ToolOutput, "call_1", Utc::now())];
        mcp_ok.evidence.evidence_absent_reason = None;
        let packet_ok = decision_packet(DecisionOutcome::VerifyFirst, mcp_ok);
        let diags_ok = check_invariants(&packet_ok, &l, Utc::now(), FreshnessWindows::default());
        assert!(!diags_ok.errors().any(|d| d.code == "INV-004"));
    }

    #[test]
    fn inv010_tools_down_high_stakes_forbids_act() {
        let l = ledger();
        let mcp = base_mcp(QualityTier::Superb, StakesLevel::Critical, ToolsState::ToolsDown);
        let packet = decision_packet(DecisionOutcome::Act, mcp);
        let diags = check_invariants(&packet, &l, Utc::now(), FreshnessWindows::default());
        assert!(diags.errors().any(|d| d.code == "INV-010"));
    }

    #[test]
    fn inv009_escalation_needs_two_or_three_options() {
        let escalation = apr_core::payload::EscalationPayload {
            escalation_trigger: "budget_insufficient".into(),
            top_options: vec![],
            evidence_gaps: vec!["missing quote".into()],
            recommended_next_step: "ask".into(),
        };
        let mut diags = Diagnostics::new();
        inv_009_escalation_structure(&escalation, &mut diags);
        assert!(diags.errors().any(|d| d.code == "INV-009"));
    }
}
