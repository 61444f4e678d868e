// SPDX-License-Identifier: MIT OR Apache-2.0
//! Closed enumerations shared by every packet, envelope, and ledger type.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The nine packet kinds the protocol admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum PacketKind {
    /// Raw sensory or telemetry input.
    Observation,
    /// A revision to the episode's belief state.
    BeliefUpdate,
    /// A committed choice among options.
    Decision,
    /// A plan naming what must be verified before acting.
    VerificationPlan,
    /// A scoped, expiring grant to perform WRITE/MIXED tool calls.
    ToolAuthorizationToken,
    /// An instruction to execute a bounded unit of work.
    TaskDirective,
    /// The outcome of a previously admitted directive.
    TaskResult,
    /// A structured request for external/human input.
    Escalation,
    /// A runtime-internal signal about budgets, safety, or health.
    IntegrityAlert,
}

impl PacketKind {
    /// Whether this kind can change external state or commit the agent to
    /// action, and therefore must carry a complete MCP envelope.
    #[must_use]
    pub fn is_consequential(self) -> bool {
        matches!(
            self,
            PacketKind::Decision
                | PacketKind::TaskDirective
                | PacketKind::ToolAuthorizationToken
                | PacketKind::Escalation
        )
    }
}

/// One of the six cognitive layers, or the runtime's own integrity overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SourceLayer {
    /// Layer 1: aspirational (values, constitution).
    Aspirational,
    /// Layer 2: strategy.
    Strategy,
    /// Layer 3: self-model.
    SelfModel,
    /// Layer 4: executive.
    Executive,
    /// Layer 5: cognitive control.
    CognitiveControl,
    /// Layer 6: task prosecution.
    TaskProsecution,
    /// The runtime-owned integrity overlay, not a cognitive layer.
    Integrity,
}

impl SourceLayer {
    /// The six cognitive layers in their numeric order, excluding
    /// [`SourceLayer::Integrity`].
    pub const LAYERS: [SourceLayer; 6] = [
        SourceLayer::Aspirational,
        SourceLayer::Strategy,
        SourceLayer::SelfModel,
        SourceLayer::Executive,
        SourceLayer::CognitiveControl,
        SourceLayer::TaskProsecution,
    ];

    /// Numeric layer id (1-6), or `None` for the integrity overlay.
    #[must_use]
    pub fn ordinal(self) -> Option<u8> {
        match self {
            SourceLayer::Aspirational => Some(1),
            SourceLayer::Strategy => Some(2),
            SourceLayer::SelfModel => Some(3),
            SourceLayer::Executive => Some(4),
            SourceLayer::CognitiveControl => Some(5),
            SourceLayer::TaskProsecution => Some(6),
            SourceLayer::Integrity => None,
        }
    }
}

/// FSM states an episode ledger can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FsmState {
    /// No packets admitted yet.
    S0Idle,
    /// Sensing: ingesting observations.
    S1Sense,
    /// Modeling: integrating belief updates.
    S2Model,
    /// Deciding: a decision is being formed.
    S3Decide,
    /// Verifying: closing a verification loop before acting.
    S4Verify,
    /// Authorizing: waiting on a tool authorization token.
    S5Authorize,
    /// Executing: directives in flight.
    S6Execute,
    /// Reviewing: post-execution belief reconciliation.
    S7Review,
    /// Escalated: waiting on external/human input.
    S8Escalated,
    /// Safe-mode: only integrity and logging packets admitted.
    S9Safemode,
}

/// Four-valued stakes classification computed from the stakes axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StakesLevel {
    /// No axis above medium.
    Low,
    /// At least one axis medium/high.
    Medium,
    /// Two axes high, or one critical.
    High,
    /// Any axis critical, or impact high with irreversible harm.
    Critical,
}

/// Impact axis of a stakes assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImpactLevel {
    /// Negligible effect outside the episode.
    Low,
    /// Limited external effect.
    Medium,
    /// Significant external effect.
    High,
    /// Severe or wide-reaching effect.
    Critical,
}

/// Irreversibility axis of a stakes assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IrreversibilityLevel {
    /// Fully reversible.
    Reversible,
    /// Reversible only with effort or cost.
    Difficult,
    /// Cannot be undone.
    Irreversible,
}

/// Uncertainty axis of a stakes assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UncertaintyLevel {
    /// High confidence in the current model.
    Low,
    /// Some open questions remain.
    Medium,
    /// Substantial doubt about the current model.
    High,
}

/// Adversariality axis of a stakes assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdversarialityLevel {
    /// No adversarial pressure.
    None,
    /// Mild adversarial pressure (e.g. competitive but not hostile).
    Low,
    /// Active adversarial pressure.
    Medium,
    /// Sophisticated or targeted adversarial pressure.
    High,
}

/// Quality tier a decision was made to satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityTier {
    /// Below the bar for acting; may only inform, never commit.
    Subpar,
    /// Meets the bar for ordinary action.
    Par,
    /// Exceeds the bar; required for HIGH/CRITICAL stakes ACT outcomes.
    Superb,
}

/// How thoroughly a decision's definition-of-done must be checked before
/// the episode treats it as satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationRequirement {
    /// No verification required.
    Optional,
    /// At least one check must pass.
    VerifyOne,
    /// Every check must pass.
    VerifyAll,
}

/// Epistemic status of a belief or observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EpistemicStatus {
    /// Directly observed via a tool or sensor.
    Observed,
    /// Computed deterministically from other known facts.
    Derived,
    /// Recalled from memory rather than freshly sensed.
    Remembered,
    /// Inferred with some uncertainty from available evidence.
    Inferred,
    /// A working hypothesis, not yet evidenced.
    Hypothesized,
    /// Status could not be determined.
    Unknown,
}

/// How long a piece of evidence remains trustworthy without re-checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FreshnessClass {
    /// Must be seconds old at most (default window: 60s).
    Realtime,
    /// Must be within the current operational window (default: 3600s).
    Operational,
    /// Valid across a strategic planning horizon; no hard staleness check.
    Strategic,
    /// Archival; staleness is expected and accepted.
    Archival,
}

/// The kind of work a task directive is pursuing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskClass {
    /// Locate a specific known item.
    Find,
    /// Resolve a key to its value.
    Lookup,
    /// Explore to discover items matching a criterion.
    Search,
    /// Produce a new artifact.
    Create,
    /// Check a claim against evidence.
    Verify,
    /// Compile a specification into executable form.
    Compile,
}

/// Environmental signal on tool availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ToolsState {
    /// All tools are reachable and healthy.
    ToolsOk,
    /// Some tools are degraded or unreachable.
    ToolsPartial,
    /// No tools are reachable.
    ToolsDown,
}

/// The outcome a decision commits the episode to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionOutcome {
    /// Verify before acting.
    VerifyFirst,
    /// Act now.
    Act,
    /// Hand off to external/human judgment.
    Escalate,
    /// Defer the decision without acting.
    Defer,
    /// Abandon the current line of action.
    Cancel,
}

/// Safety classification of a task directive's tool usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolSafetyClass {
    /// Read-only; no authorization token required.
    Read,
    /// Mutating; requires an active authorization token.
    Write,
    /// Both reads and writes; requires an active authorization token.
    Mixed,
}

/// Terminal status of a task result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultStatus {
    /// The directive completed successfully.
    Success,
    /// The directive failed.
    Failure,
    /// The directive was cancelled before completion.
    Cancelled,
}

/// Severity of an integrity alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    /// Informational; clears a prior safe-mode demotion.
    Info,
    /// Worth noting; does not change control flow.
    Warning,
    /// Triggers budget-overrun or degraded-tools handling.
    High,
    /// Forces the episode into `S9_SAFEMODE`.
    Critical,
}

/// The kind of thing an evidence reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceRefType {
    /// Output of a tool invocation.
    ToolOutput,
    /// A directly reported user observation.
    UserObservation,
    /// An item retrieved from memory.
    MemoryItem,
    /// A value computed from other evidence.
    DerivedCalc,
}
