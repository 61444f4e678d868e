// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-kind packet payloads.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::token::ToolAuthorizationToken;
use crate::vocab::{AlertSeverity, DecisionOutcome, ResultStatus, ToolSafetyClass};

/// `Observation` payload: raw sensory or telemetry input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ObservationPayload {
    /// What kind of observation this is (deployment-defined vocabulary).
    pub observation_type: String,
    /// The observed data; must not be empty/null.
    pub data: Value,
    /// Tool that produced this observation, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_tool: Option<String>,
    /// Subjective reliability of the source, in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reliability: Option<f64>,
}

/// One atomic change to the belief state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BeliefChange {
    /// Namespace the changed key lives in.
    pub domain: String,
    /// Key within that namespace.
    pub key: String,
    /// Updated value.
    pub new_value: Value,
    /// Value before this change, if one existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_value: Option<Value>,
}

/// Details recorded when a `BeliefUpdate` resolves a contradiction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ContradictionDetails {
    /// What the contradiction was.
    pub description: String,
    /// The packet that introduced the conflicting belief, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicting_packet_id: Option<String>,
}

/// `BeliefUpdate` payload: a revision to the episode's belief state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BeliefUpdatePayload {
    /// The kind of update (deployment-defined vocabulary); the literal
    /// value `"contradiction_resolved"` requires `contradiction_details`.
    pub update_type: String,
    /// At least one change; never empty.
    pub belief_changes: Vec<BeliefChange>,
    /// Present iff `update_type == "contradiction_resolved"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contradiction_details: Option<ContradictionDetails>,
}

/// The three checks a decision must record before acting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConstraintsSatisfied {
    /// Whether the decision was checked against the constitution/values
    /// layer.
    pub constitutional_check: bool,
    /// Whether the decision was checked against remaining budgets.
    pub budget_check: bool,
    /// Whether the decision meets its required quality tier.
    pub tier_check: bool,
}

/// A named option considered (and chosen or rejected) during a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DecisionOption {
    /// Opaque option identifier.
    pub option_id: String,
    /// Human-readable description.
    pub description: String,
}

/// An assumption the decision's action depends on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LoadBearingAssumption {
    /// What is being assumed.
    pub assumption: String,
    /// Whether this assumption has since been verified.
    pub verified: bool,
}

/// `Decision` payload: a committed choice among options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DecisionPayload {
    /// What the episode commits to doing next.
    pub decision_outcome: DecisionOutcome,
    /// Human-readable rationale; for decisions following a recorded
    /// conflict, must cite a tradeoff policy (INV-006).
    pub decision_summary: String,
    /// The three pre-commitment checks.
    pub constraints_satisfied: ConstraintsSatisfied,
    /// The option actually chosen, if this decision was among options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chosen_option: Option<DecisionOption>,
    /// Options considered but not chosen.
    #[serde(default)]
    pub rejected_options: Vec<DecisionOption>,
    /// Assumptions this decision's action depends on.
    #[serde(default)]
    pub load_bearing_assumptions: Vec<LoadBearingAssumption>,
}

impl DecisionPayload {
    /// Whether every load-bearing assumption has been verified.
    #[must_use]
    pub fn all_assumptions_verified(&self) -> bool {
        self.load_bearing_assumptions.iter().all(|a| a.verified)
    }
}

/// One item in a verification plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VerificationPlanItem {
    /// What needs to be verified.
    pub description: String,
    /// The task this verification item is expected to be closed by, if
    /// known ahead of time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_task_id: Option<String>,
}

/// `VerificationPlan` payload: what must be verified before acting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VerificationPlanPayload {
    /// At least one item; never empty.
    pub items: Vec<VerificationPlanItem>,
}

/// `TaskDirective` payload: an instruction to execute a bounded unit of
/// work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TaskDirectivePayload {
    /// Opaque task identifier. Conventionally `task_<slug>`.
    pub task_id: String,
    /// Deployment-defined task type.
    pub task_type: String,
    /// How the task should be executed (deployment-defined).
    pub execution_method: String,
    /// Safety classification of this directive's tool usage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_safety_class: Option<ToolSafetyClass>,
    /// Tool this directive invokes, required when `tool_safety_class` is
    /// `WRITE`/`MIXED` so token scope can be checked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_id: Option<String>,
    /// Operation type performed on `tool_id` (e.g. `"write"`), required
    /// alongside `tool_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<String>,
    /// Token authorizing this directive; present iff `tool_safety_class`
    /// is `WRITE`/`MIXED`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_token_id: Option<String>,
    /// How long the task may run before it's considered orphaned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

impl TaskDirectivePayload {
    /// Whether this directive requires an active authorization token.
    #[must_use]
    pub fn requires_authorization(&self) -> bool {
        matches!(
            self.tool_safety_class,
            Some(ToolSafetyClass::Write) | Some(ToolSafetyClass::Mixed)
        )
    }
}

/// Details recorded when a `TaskResult` reports `FAILURE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorDetails {
    /// Deployment-defined error code.
    pub error_code: String,
    /// Human-readable error message.
    pub error_message: String,
}

/// `TaskResult` payload: the outcome of a previously admitted directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TaskResultPayload {
    /// The task this result closes.
    pub task_id: String,
    /// The packet id of the directive that opened this task.
    pub directive_packet_id: String,
    /// Terminal status.
    pub result_status: ResultStatus,
    /// Present iff `result_status == FAILURE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<ErrorDetails>,
    /// Free-form execution metadata (duration, retries, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_metadata: Option<Value>,
}

/// One option offered up for external/human resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EscalationOption {
    /// Opaque option identifier.
    pub option_id: String,
    /// Human-readable description.
    pub description: String,
    /// Arguments for this option.
    #[serde(default)]
    pub pros: Vec<String>,
    /// Arguments against this option.
    #[serde(default)]
    pub cons: Vec<String>,
}

/// `Escalation` payload: a structured request for external/human input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EscalationPayload {
    /// Why this episode is escalating (deployment-defined vocabulary,
    /// e.g. `"budget_insufficient"`).
    pub escalation_trigger: String,
    /// 2 or 3 options.
    pub top_options: Vec<EscalationOption>,
    /// What evidence is missing that would resolve this without
    /// escalating; non-empty.
    pub evidence_gaps: Vec<String>,
    /// What should happen next regardless of which option is chosen.
    pub recommended_next_step: String,
}

/// `IntegrityAlert` payload: a runtime-internal signal about budgets,
/// safety, or health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IntegrityAlertPayload {
    /// Deployment-defined alert vocabulary (e.g. `"budget_threshold"`,
    /// `"constitutional_veto"`).
    pub alert_type: String,
    /// How serious this alert is.
    pub severity: AlertSeverity,
    /// Human-readable message.
    pub message: String,
}

/// The per-kind payload of a packet, internally tagged by `packet_kind` so
/// the discriminant matches [`crate::header::PacketHeader::packet_kind`]
/// by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "packet_kind")]
pub enum PacketPayload {
    /// See [`ObservationPayload`].
    Observation(ObservationPayload),
    /// See [`BeliefUpdatePayload`].
    BeliefUpdate(BeliefUpdatePayload),
    /// See [`DecisionPayload`].
    Decision(DecisionPayload),
    /// See [`VerificationPlanPayload`].
    VerificationPlan(VerificationPlanPayload),
    /// See [`ToolAuthorizationToken`].
    ToolAuthorizationToken(ToolAuthorizationToken),
    /// See [`TaskDirectivePayload`].
    TaskDirective(TaskDirectivePayload),
    /// See [`TaskResultPayload`].
    TaskResult(TaskResultPayload),
    /// See [`EscalationPayload`].
    Escalation(EscalationPayload),
    /// See [`IntegrityAlertPayload`].
    IntegrityAlert(IntegrityAlertPayload),
}

impl PacketPayload {
    /// The [`crate::vocab::PacketKind`] this payload variant corresponds to.
    #[must_use]
    pub fn kind(&self) -> crate::vocab::PacketKind {
        use crate::vocab::PacketKind as K;
        match self {
            PacketPayload::Observation(_) => K::Observation,
            PacketPayload::BeliefUpdate(_) => K::BeliefUpdate,
            PacketPayload::Decision(_) => K::Decision,
            PacketPayload::VerificationPlan(_) => K::VerificationPlan,
            PacketPayload::ToolAuthorizationToken(_) => K::ToolAuthorizationToken,
            PacketPayload::TaskDirective(_) => K::TaskDirective,
            PacketPayload::TaskResult(_) => K::TaskResult,
            PacketPayload::Escalation(_) => K::Escalation,
            PacketPayload::IntegrityAlert(_) => K::IntegrityAlert,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_kind_matches_variant() {
        let p = PacketPayload::Escalation(EscalationPayload {
            escalation_trigger: "budget_insufficient".into(),
            top_options: vec![],
            evidence_gaps: vec![],
            recommended_next_step: "ask user".into(),
        });
        assert_eq!(p.kind(), crate::vocab::PacketKind::Escalation);
    }

    #[test]
    fn task_directive_requires_authorization_only_for_write_mixed() {
        let mut d = TaskDirectivePayload {
            task_id: "task_1".into(),
            task_type: "fetch".into(),
            execution_method: "http_get".into(),
            tool_safety_class: Some(ToolSafetyClass::Read),
            tool_id: None,
            operation_type: None,
            authorization_token_id: None,
            timeout_seconds: None,
        };
        assert!(!d.requires_authorization());
        d.tool_safety_class = Some(ToolSafetyClass::Write);
        assert!(d.requires_authorization());
        d.tool_safety_class = Some(ToolSafetyClass::Mixed);
        assert!(d.requires_authorization());
    }

    #[test]
    fn decision_all_assumptions_verified() {
        let mut d = DecisionPayload {
            decision_outcome: DecisionOutcome::Act,
            decision_summary: "go".into(),
            constraints_satisfied: ConstraintsSatisfied {
                constitutional_check: true,
                budget_check: true,
                tier_check: true,
            },
            chosen_option: None,
            rejected_options: vec![],
            load_bearing_assumptions: vec![
                LoadBearingAssumption { assumption: "a".into(), verified: true },
                LoadBearingAssumption { assumption: "b".into(), verified: true },
            ],
        };
        assert!(d.all_assumptions_verified());
        d.load_bearing_assumptions[1].verified = false;
        assert!(!d.all_assumptions_verified());
    }

    #[test]
    fn serializes_with_packet_kind_tag() {
        let p = PacketPayload::IntegrityAlert(IntegrityAlertPayload {
            alert_type: "budget_threshold".into(),
            severity: AlertSeverity::Warning,
            message: "80% of token budget used".into(),
        });
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["packet_kind"], "IntegrityAlert");
    }
}
