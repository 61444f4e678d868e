// SPDX-License-Identifier: MIT OR Apache-2.0
//! Snapshot coverage for the wire format: locks down the exact JSON shape
//! consumers on the other end of an episode log depend on.

use apr_core::payload::{ConstraintsSatisfied, DecisionPayload};
use apr_core::{
    AdversarialityLevel, Budgets, DecisionOutcome, DefinitionOfDone, Epistemics, EpistemicStatus, Evidence,
    FreshnessClass, ImpactLevel, Intent, IrreversibilityLevel, McpEnvelope, Packet, PacketHeader, PacketKind,
    PacketPayload, Quality, QualityTier, RiskBudget, Routing, SourceLayer, StakesAxes, StakesLevel, TaskClass,
    UncertaintyLevel, VerificationRequirement,
};
use chrono::{DateTime, Utc};

fn fixed_time() -> DateTime<Utc> {
    "2026-01-01T00:00:00Z".parse().expect("valid fixed timestamp")
}

fn decision_packet() -> Packet {
    let mcp = McpEnvelope {
        intent: Intent { summary: "roll forward".into(), scope: "release 4.2".into() },
        stakes: StakesAxes {
            impact: ImpactLevel::Medium,
            irreversibility: IrreversibilityLevel::Difficult,
            uncertainty: UncertaintyLevel::Low,
            adversariality: AdversarialityLevel::None,
            stakes_level: StakesLevel::Medium,
        },
        quality: Quality {
            tier: QualityTier::Par,
            satisficing_mode: false,
            definition_of_done: DefinitionOfDone { text: "release is live".into(), checks: vec!["canary healthy".into()] },
            verification_requirement: VerificationRequirement::Optional,
        },
        budgets: Budgets { token_budget: 5_000, tool_call_budget: 20, time_budget_seconds: 1_200, risk_budget: RiskBudget { envelope: "bounded".into(), max_loss: 1.0 } },
        epistemics: Epistemics {
            status: EpistemicStatus::Derived,
            confidence: 0.85,
            calibration_note: None,
            freshness_class: FreshnessClass::Operational,
            stale_if_older_than_seconds: None,
            assumptions: vec![],
        },
        evidence: Evidence { evidence_refs: vec![], evidence_absent_reason: Some("no live signal needed for a scheduled rollout".into()) },
        routing: Routing { task_class: TaskClass::Create, tools_state: apr_core::ToolsState::ToolsOk },
    };

    Packet::new(
        PacketHeader::new("pkt_release_1", PacketKind::Decision, fixed_time(), SourceLayer::Executive, "corr_release"),
        Some(mcp),
        PacketPayload::Decision(DecisionPayload {
            decision_outcome: DecisionOutcome::Act,
            decision_summary: "proceed with the scheduled rollout".into(),
            constraints_satisfied: ConstraintsSatisfied { constitutional_check: true, budget_check: true, tier_check: true },
            chosen_option: None,
            rejected_options: vec![],
            load_bearing_assumptions: vec![],
        }),
    )
}

#[test]
fn decision_packet_wire_shape_is_stable() {
    let packet = decision_packet();
    let encoded = apr_protocol::encode_packet(&packet).expect("encodes");
    let pretty: serde_json::Value = serde_json::from_str(&encoded).expect("valid JSON");
    insta::assert_json_snapshot!(pretty);
}
