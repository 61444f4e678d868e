// SPDX-License-Identifier: MIT OR Apache-2.0
//! Core wire types for the agent protocol runtime: packets, the MCP
//! envelope, tokens, and the closed vocabularies they're built from.

pub mod envelope;
pub mod evidence;
pub mod fingerprint;
pub mod header;
pub mod packet;
pub mod payload;
pub mod token;
pub mod vocab;

pub use envelope::{
    Budgets, DefinitionOfDone, Epistemics, Evidence, Intent, McpEnvelope, Quality, RiskBudget,
    Routing, StakesAxes,
};
pub use evidence::EvidenceRef;
pub use fingerprint::{canonical_json, fingerprint, sha256_hex};
pub use header::{is_valid_identifier, PacketHeader};
pub use packet::Packet;
pub use payload::{
    BeliefChange, BeliefUpdatePayload, ConstraintsSatisfied, ContradictionDetails,
    DecisionOption, DecisionPayload, ErrorDetails, EscalationOption, EscalationPayload,
    IntegrityAlertPayload, LoadBearingAssumption, ObservationPayload, PacketPayload,
    TaskDirectivePayload, TaskResultPayload, VerificationPlanItem, VerificationPlanPayload,
};
pub use token::{AuthorizedScope, ToolAuthorizationToken};
pub use vocab::{
    AdversarialityLevel, AlertSeverity, DecisionOutcome, EpistemicStatus, EvidenceRefType,
    FreshnessClass, FsmState, ImpactLevel, IrreversibilityLevel, PacketKind, QualityTier,
    ResultStatus, SourceLayer, StakesLevel, TaskClass, ToolSafetyClass, ToolsState,
    UncertaintyLevel, VerificationRequirement,
};
