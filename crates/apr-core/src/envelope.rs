// SPDX-License-Identifier: MIT OR Apache-2.0
//! The MCP envelope: the mandatory policy-compliance payload carried by
//! every consequential packet.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::evidence::EvidenceRef;
use crate::vocab::{
    AdversarialityLevel, EpistemicStatus, FreshnessClass, ImpactLevel, IrreversibilityLevel,
    QualityTier, StakesLevel, TaskClass, ToolsState, UncertaintyLevel, VerificationRequirement,
};

/// What the packet is trying to accomplish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Intent {
    /// Short human-readable summary of the intent.
    pub summary: String,
    /// What is and isn't in scope for this intent.
    pub scope: String,
}

impl Intent {
    /// Whether both fields are non-empty, as required by the schema
    /// validator.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.summary.trim().is_empty() && !self.scope.trim().is_empty()
    }
}

/// The four axes a stakes assessment is computed from, plus the computed
/// level itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StakesAxes {
    /// External-effect magnitude.
    pub impact: ImpactLevel,
    /// How hard the effect is to undo.
    pub irreversibility: IrreversibilityLevel,
    /// Confidence in the current model.
    pub uncertainty: UncertaintyLevel,
    /// Presence of adversarial pressure.
    pub adversariality: AdversarialityLevel,
    /// Computed overall stakes level; must be consistent with the four
    /// axes per INV-012.
    pub stakes_level: StakesLevel,
}

/// What "done" means for this packet, and how strictly it must be checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DefinitionOfDone {
    /// Free-text description of the completion criteria.
    pub text: String,
    /// Concrete, checkable statements; must be non-empty.
    pub checks: Vec<String>,
}

/// Quality bar a packet was produced to meet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Quality {
    /// The quality tier achieved.
    pub tier: QualityTier,
    /// Whether the producing layer stopped at "good enough" rather than
    /// optimizing further.
    pub satisficing_mode: bool,
    /// What "done" means here.
    pub definition_of_done: DefinitionOfDone,
    /// How thoroughly the definition of done must be checked.
    pub verification_requirement: VerificationRequirement,
}

/// Risk tolerance for this packet's line of action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RiskBudget {
    /// Named risk envelope in effect (deployment-defined, e.g. `"bounded"`).
    pub envelope: String,
    /// Maximum acceptable loss under that envelope.
    pub max_loss: f64,
}

/// Resource ceilings this packet's line of action must respect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Budgets {
    /// Token budget for the episode.
    pub token_budget: u64,
    /// Tool-call budget for the episode.
    pub tool_call_budget: u64,
    /// Wall-clock time budget, in seconds.
    pub time_budget_seconds: u64,
    /// Risk budget.
    pub risk_budget: RiskBudget,
}

/// How this packet's claims are grounded and how stale they're allowed to be.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Epistemics {
    /// How this claim was arrived at.
    pub status: EpistemicStatus,
    /// Subjective confidence in `[0, 1]`.
    pub confidence: f64,
    /// Free-text note on why that confidence level was chosen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration_note: Option<String>,
    /// How long this claim can go unrefreshed.
    pub freshness_class: FreshnessClass,
    /// Override for the default freshness window, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale_if_older_than_seconds: Option<u64>,
    /// Assumptions this claim rests on.
    #[serde(default)]
    pub assumptions: Vec<String>,
}

impl Epistemics {
    /// Whether `confidence` is within the valid `[0, 1]` range.
    #[must_use]
    pub fn has_valid_confidence(&self) -> bool {
        (0.0..=1.0).contains(&self.confidence)
    }
}

/// Grounding for this packet's claims: either concrete references, or an
/// explicit reason none exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Evidence {
    /// Citations grounding this packet's claims.
    #[serde(default)]
    pub evidence_refs: Vec<EvidenceRef>,
    /// Why no evidence is cited, if `evidence_refs` is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_absent_reason: Option<String>,
}

impl Evidence {
    /// Whether exactly one of (non-empty refs) XOR (non-null reason) holds.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.evidence_refs.is_empty() != self.evidence_absent_reason.is_none()
    }
}

/// How this packet's line of action should be classified and routed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Routing {
    /// What kind of task this is pursuing.
    pub task_class: TaskClass,
    /// Current tool availability.
    pub tools_state: ToolsState,
}

/// The mandatory policy-compliance payload every consequential packet
/// carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct McpEnvelope {
    /// What this packet is trying to accomplish.
    pub intent: Intent,
    /// Computed stakes assessment.
    pub stakes: StakesAxes,
    /// Quality bar this packet was produced to meet.
    pub quality: Quality,
    /// Resource ceilings in effect.
    pub budgets: Budgets,
    /// Grounding and freshness of this packet's claims.
    pub epistemics: Epistemics,
    /// Citations (or absence reason) for this packet's claims.
    pub evidence: Evidence,
    /// Classification and routing metadata.
    pub routing: Routing,
}
