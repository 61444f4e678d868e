// SPDX-License-Identifier: MIT OR Apache-2.0
//! A scripted cognitive layer for demos and tests. It does not reason;
//! it plays back a fixed sequence of packet kinds, one per `invoke`
//! call, so a compiled episode can be walked end to end without a real
//! backend.

use std::sync::atomic::{AtomicUsize, Ordering};

use apr_core::payload::{
    BeliefChange, BeliefUpdatePayload, ConstraintsSatisfied, DecisionPayload, EscalationOption,
    EscalationPayload, IntegrityAlertPayload, ObservationPayload, PacketPayload, TaskDirectivePayload,
    TaskResultPayload, VerificationPlanItem, VerificationPlanPayload,
};
use apr_core::token::{AuthorizedScope, ToolAuthorizationToken};
use apr_core::{AlertSeverity, DecisionOutcome, McpEnvelope, Packet, PacketHeader, PacketKind, ResultStatus, SourceLayer};
use apr_layer::{Layer, StepContext};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;

/// A layer implementation that plays back `script`, one kind per call to
/// [`Layer::invoke`]. Consequential kinds are bound to `mcp_template`,
/// cloned for each emission; non-consequential kinds carry no envelope.
pub struct MockLayer {
    layer_id: SourceLayer,
    script: Vec<PacketKind>,
    mcp_template: Option<McpEnvelope>,
    call_count: AtomicUsize,
}

impl MockLayer {
    /// Build a mock layer that plays back `script` in order.
    #[must_use]
    pub fn new(layer_id: SourceLayer, script: Vec<PacketKind>) -> Self {
        Self { layer_id, script, mcp_template: None, call_count: AtomicUsize::new(0) }
    }

    /// Attach the MCP envelope bound to every consequential packet this
    /// layer emits.
    #[must_use]
    pub fn with_mcp_template(mut self, mcp: McpEnvelope) -> Self {
        self.mcp_template = Some(mcp);
        self
    }
}

#[async_trait]
impl Layer for MockLayer {
    fn layer_id(&self) -> SourceLayer {
        self.layer_id
    }

    async fn invoke(&self, received: &[Packet], context: &StepContext) -> anyhow::Result<Vec<Packet>> {
        let index = self.call_count.fetch_add(1, Ordering::SeqCst);
        let kind = *self.script.get(index).ok_or_else(|| {
            anyhow::anyhow!("mock layer {:?} has no scripted response for call {index}", self.layer_id)
        })?;

        tracing::debug!(
            target: "apr.backend_mock",
            layer = ?self.layer_id,
            ?kind,
            correlation_id = %context.correlation_id,
            step_id = %context.step_id,
            received = received.len(),
            "mock layer emitting scripted packet",
        );

        let payload = canned_payload(kind, context, received);
        let mcp = if kind.is_consequential() { self.mcp_template.clone() } else { None };
        let packet_id = format!("pkt_mock_{}_{index}", context.step_id);
        let header = PacketHeader::new(packet_id, kind, Utc::now(), self.layer_id, context.correlation_id.clone());
        let header = match &context.campaign_id {
            Some(campaign_id) => header.with_campaign_id(campaign_id.clone()),
            None => header,
        };
        let header = match received.last() {
            Some(previous) => header.with_previous_packet_id(previous.header.packet_id.clone()),
            None => header,
        };

        Ok(vec![Packet::new(header, mcp, payload)])
    }
}

fn canned_payload(kind: PacketKind, context: &StepContext, received: &[Packet]) -> PacketPayload {
    match kind {
        PacketKind::Observation => PacketPayload::Observation(ObservationPayload {
            observation_type: "mock_observation".into(),
            data: json!({"step_id": context.step_id}),
            source_tool: Some("mock_tool".into()),
            reliability: Some(1.0),
        }),
        PacketKind::BeliefUpdate => PacketPayload::BeliefUpdate(BeliefUpdatePayload {
            update_type: "mock_update".into(),
            belief_changes: vec![BeliefChange {
                domain: "mock".into(),
                key: context.step_id.clone(),
                new_value: json!(true),
                prior_value: None,
            }],
            contradiction_details: None,
        }),
        PacketKind::Decision => PacketPayload::Decision(DecisionPayload {
            decision_outcome: DecisionOutcome::Act,
            decision_summary: format!("mock decision at step {}", context.step_id),
            constraints_satisfied: ConstraintsSatisfied { constitutional_check: true, budget_check: true, tier_check: true },
            chosen_option: None,
            rejected_options: vec![],
            load_bearing_assumptions: vec![],
        }),
        PacketKind::VerificationPlan => PacketPayload::VerificationPlan(VerificationPlanPayload {
            items: vec![VerificationPlanItem { description: format!("verify output of {}", context.step_id), target_task_id: None }],
        }),
        PacketKind::ToolAuthorizationToken => PacketPayload::ToolAuthorizationToken(ToolAuthorizationToken {
            token_id: format!("token_mock_{}", context.step_id),
            authorized_scope: AuthorizedScope { tool_ids: vec!["mock_tool".into()], operation_types: vec!["write".into()], resource_constraints: None },
            expiry: Utc::now() + Duration::seconds(3600),
            max_usage_count: 1,
            issuer_layer: SourceLayer::Executive,
            usage_count: 0,
            revoked: false,
        }),
        PacketKind::TaskDirective => PacketPayload::TaskDirective(TaskDirectivePayload {
            task_id: format!("task_mock_{}", context.step_id),
            task_type: "mock_task".into(),
            execution_method: "mock_execution".into(),
            tool_safety_class: None,
            tool_id: None,
            operation_type: None,
            authorization_token_id: preceding_token_id(received),
            timeout_seconds: Some(60),
        }),
        PacketKind::TaskResult => PacketPayload::TaskResult(TaskResultPayload {
            task_id: format!("task_mock_{}", context.step_id),
            directive_packet_id: received.last().map(|p| p.header.packet_id.clone()).unwrap_or_default(),
            result_status: ResultStatus::Success,
            error_details: None,
            execution_metadata: Some(json!({"mock": true})),
        }),
        PacketKind::Escalation => PacketPayload::Escalation(EscalationPayload {
            escalation_trigger: "mock_escalation".into(),
            top_options: vec![
                EscalationOption { option_id: "opt_wait".into(), description: "wait for input".into(), pros: vec![], cons: vec![] },
                EscalationOption { option_id: "opt_abort".into(), description: "abandon the episode".into(), pros: vec![], cons: vec![] },
            ],
            evidence_gaps: vec!["no external input yet".into()],
            recommended_next_step: "await external input".into(),
        }),
        PacketKind::IntegrityAlert => PacketPayload::IntegrityAlert(IntegrityAlertPayload {
            alert_type: "mock_alert".into(),
            severity: AlertSeverity::Warning,
            message: format!("mock integrity alert at step {}", context.step_id),
        }),
    }
}

fn preceding_token_id(received: &[Packet]) -> Option<String> {
    received.iter().find_map(|p| match &p.payload {
        PacketPayload::ToolAuthorizationToken(token) => Some(token.token_id.clone()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> StepContext {
        StepContext { correlation_id: "corr_1".into(), campaign_id: None, step_id: "decide_act".into() }
    }

    #[tokio::test]
    async fn plays_back_script_in_order() {
        let layer = MockLayer::new(SourceLayer::TaskProsecution, vec![PacketKind::Observation, PacketKind::TaskResult]);
        let first = layer.invoke(&[], &context()).await.unwrap();
        assert_eq!(first[0].header.packet_kind, PacketKind::Observation);
        let second = layer.invoke(&[], &context()).await.unwrap();
        assert_eq!(second[0].header.packet_kind, PacketKind::TaskResult);
    }

    #[tokio::test]
    async fn exhausted_script_errors() {
        let layer = MockLayer::new(SourceLayer::TaskProsecution, vec![PacketKind::Observation]);
        layer.invoke(&[], &context()).await.unwrap();
        assert!(layer.invoke(&[], &context()).await.is_err());
    }

    #[tokio::test]
    async fn consequential_kind_carries_mcp_template() {
        let mcp = crate::tests::sample_mcp();
        let layer = MockLayer::new(SourceLayer::Executive, vec![PacketKind::Decision]).with_mcp_template(mcp);
        let packets = layer.invoke(&[], &context()).await.unwrap();
        assert!(packets[0].mcp.is_some());
    }

    #[tokio::test]
    async fn non_consequential_kind_carries_no_mcp() {
        let layer = MockLayer::new(SourceLayer::TaskProsecution, vec![PacketKind::Observation]);
        let packets = layer.invoke(&[], &context()).await.unwrap();
        assert!(packets[0].mcp.is_none());
    }

    pub(crate) fn sample_mcp() -> McpEnvelope {
        use apr_core::envelope::{Budgets, DefinitionOfDone, Epistemics, Evidence, Intent, Quality, RiskBudget, Routing, StakesAxes};
        use apr_core::{
            AdversarialityLevel, EpistemicStatus, FreshnessClass, ImpactLevel, IrreversibilityLevel, QualityTier, StakesLevel,
            TaskClass, ToolsState, UncertaintyLevel, VerificationRequirement,
        };
        McpEnvelope {
            intent: Intent { summary: "mock intent".into(), scope: "mock scope".into() },
            stakes: StakesAxes {
                impact: ImpactLevel::Low,
                irreversibility: IrreversibilityLevel::Reversible,
                uncertainty: UncertaintyLevel::Low,
                adversariality: AdversarialityLevel::None,
                stakes_level: StakesLevel::Low,
            },
            quality: Quality {
                tier: QualityTier::Par,
                satisficing_mode: true,
                definition_of_done: DefinitionOfDone { text: "mock done".into(), checks: vec!["mock check".into()] },
                verification_requirement: VerificationRequirement::Optional,
            },
            budgets: Budgets {
                token_budget: 1000,
                tool_call_budget: 10,
                time_budget_seconds: 60,
                risk_budget: RiskBudget { envelope: "bounded".into(), max_loss: 0.0 },
            },
            epistemics: Epistemics {
                status: EpistemicStatus::Observed,
                confidence: 0.9,
                calibration_note: None,
                freshness_class: FreshnessClass::Operational,
                stale_if_older_than_seconds: None,
                assumptions: vec![],
            },
            evidence: Evidence { evidence_refs: vec![], evidence_absent_reason: Some("mock episode".into()) },
            routing: Routing { task_class: TaskClass::Lookup, tools_state: ToolsState::ToolsOk },
        }
    }
}
