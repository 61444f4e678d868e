// SPDX-License-Identifier: MIT OR Apache-2.0
//! Hand-built concrete scenarios from the invariant validator's testable
//! properties: SUBPAR blocking ACT and an unapproved budget overrun.

use apr_core::payload::{BeliefChange, BeliefUpdatePayload, ConstraintsSatisfied, ObservationPayload};
use apr_core::{
    AdversarialityLevel, Budgets, DecisionOutcome, DecisionPayload, DefinitionOfDone, Epistemics, Evidence,
    FreshnessClass, ImpactLevel, Intent, IrreversibilityLevel, McpEnvelope, Packet, PacketHeader, PacketKind,
    PacketPayload, Quality, QualityTier, RiskBudget, Routing, SourceLayer, StakesAxes, StakesLevel, TaskClass,
    UncertaintyLevel, VerificationRequirement,
};
use apr_ledger::{BudgetCaps, EpisodeLedger};
use apr_validate::{apply, Admission, FreshnessWindows};
use chrono::Utc;

fn mcp(tier: QualityTier, stakes_level: StakesLevel) -> McpEnvelope {
    McpEnvelope {
        intent: Intent { summary: "decide whether to proceed".into(), scope: "release rollout".into() },
        stakes: StakesAxes {
            impact: ImpactLevel::Medium,
            irreversibility: IrreversibilityLevel::Difficult,
            uncertainty: UncertaintyLevel::Medium,
            adversariality: AdversarialityLevel::None,
            stakes_level,
        },
        quality: Quality {
            tier,
            satisficing_mode: false,
            definition_of_done: DefinitionOfDone { text: "rollout proceeds safely".into(), checks: vec!["smoke test green".into()] },
            verification_requirement: VerificationRequirement::Optional,
        },
        budgets: Budgets { token_budget: 100, tool_call_budget: 5, time_budget_seconds: 300, risk_budget: RiskBudget { envelope: "bounded".into(), max_loss: 1.0 } },
        epistemics: Epistemics {
            status: apr_core::EpistemicStatus::Derived,
            confidence: 0.8,
            calibration_note: None,
            freshness_class: FreshnessClass::Strategic,
            stale_if_older_than_seconds: None,
            assumptions: vec![],
        },
        evidence: Evidence { evidence_refs: vec![], evidence_absent_reason: Some("strategic decision, no live grounding needed".into()) },
        routing: Routing { task_class: TaskClass::Verify, tools_state: apr_core::ToolsState::ToolsOk },
    }
}

fn decision(id: &str, outcome: DecisionOutcome, tier: QualityTier, stakes_level: StakesLevel) -> Packet {
    Packet::new(
        PacketHeader::new(id, PacketKind::Decision, Utc::now(), SourceLayer::Executive, "corr_s"),
        Some(mcp(tier, stakes_level)),
        PacketPayload::Decision(DecisionPayload {
            decision_outcome: outcome,
            decision_summary: "proceed with rollout".into(),
            constraints_satisfied: ConstraintsSatisfied { constitutional_check: true, budget_check: true, tier_check: true },
            chosen_option: None,
            rejected_options: vec![],
            load_bearing_assumptions: vec![],
        }),
    )
}

/// Drives the ledger's FSM from `S0_IDLE` up to `S2_MODEL` via an
/// Observation followed by a BeliefUpdate, so a Decision is legal next.
fn prime_to_model_state(ledger: &mut EpisodeLedger, windows: FreshnessWindows) {
    let observation = Packet::new(
        PacketHeader::new("pkt_obs", PacketKind::Observation, Utc::now(), SourceLayer::TaskProsecution, "corr_s"),
        None,
        PacketPayload::Observation(ObservationPayload {
            observation_type: "telemetry".into(),
            data: serde_json::json!({"latency_ms": 120}),
            source_tool: None,
            reliability: Some(0.9),
        }),
    );
    assert!(matches!(apply(ledger, observation, Utc::now(), windows), Admission::Admitted(_)));

    let belief_update = Packet::new(
        PacketHeader::new("pkt_bu", PacketKind::BeliefUpdate, Utc::now(), SourceLayer::SelfModel, "corr_s"),
        None,
        PacketPayload::BeliefUpdate(BeliefUpdatePayload {
            update_type: "telemetry_ingested".into(),
            belief_changes: vec![BeliefChange { domain: "system".into(), key: "latency_ms".into(), new_value: serde_json::json!(120), prior_value: None }],
            contradiction_details: None,
        }),
    );
    assert!(matches!(apply(ledger, belief_update, Utc::now(), windows), Admission::Admitted(_)));
}

/// S2 — SUBPAR blocks ACT (INV-002 negative, §8).
#[test]
fn s2_subpar_decision_cannot_act() {
    let windows = FreshnessWindows::default();
    let mut ledger = EpisodeLedger::create("corr_s", BudgetCaps { token_budget: 1000, tool_call_budget: 10, time_budget_seconds: 600, risk_budget: 10.0 });
    prime_to_model_state(&mut ledger, windows);

    let before = ledger.snapshot();
    let bad_decision = decision("pkt_dec", DecisionOutcome::Act, QualityTier::Subpar, StakesLevel::High);
    let admission = apply(&mut ledger, bad_decision, Utc::now(), windows);

    match admission {
        Admission::Rejected(diags) => assert!(diags.errors().any(|d| d.code == "INV-002")),
        Admission::Admitted(_) => panic!("a SUBPAR ACT decision must never be admitted"),
    }
    let after = ledger.snapshot();
    assert_eq!(before.recent_packet_count, after.recent_packet_count, "ledger must be unchanged on rejection");
}

/// S5 — budget overrun without an approving Escalation or Integrity
/// override (INV-005 negative, §8).
#[test]
fn s5_budget_overrun_without_approval_is_rejected() {
    let windows = FreshnessWindows::default();
    let mut ledger = EpisodeLedger::create("corr_s", BudgetCaps { token_budget: 100, tool_call_budget: 10, time_budget_seconds: 600, risk_budget: 10.0 });
    prime_to_model_state(&mut ledger, windows);

    // Blow past the token budget directly, simulating prior steps having
    // already consumed it, with no Escalation or Integrity alert in between.
    ledger.budget_mut().record(101, 0, 0, 0.0);
    assert!(ledger.budget().is_exceeded());

    let decision = decision("pkt_dec_overrun", DecisionOutcome::VerifyFirst, QualityTier::Par, StakesLevel::Medium);
    let admission = apply(&mut ledger, decision, Utc::now(), windows);

    match admission {
        Admission::Rejected(diags) => assert!(diags.errors().any(|d| d.code == "INV-005")),
        Admission::Admitted(_) => panic!("a Decision after an unapproved budget overrun must be rejected"),
    }
}
