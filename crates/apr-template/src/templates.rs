// SPDX-License-Identifier: MIT OR Apache-2.0
//! The seven canonical templates. Each is a fixed topology mirroring one
//! of the legal FSM paths: grounding, verification, read-only action,
//! write action, escalation, degraded-tools handling, and
//! compile-to-code. Template H composes the others into a full-stack
//! episode and is optional.

use apr_core::{PacketKind, QualityTier, SourceLayer, ToolsState};

use crate::model::{EpisodeTemplate, TemplateConstraints, TemplateStep};

fn step(step_id: &str, owner_layer: SourceLayer, kind: Option<PacketKind>, successors: &[&str]) -> TemplateStep {
    TemplateStep {
        step_id: step_id.to_string(),
        owner_layer,
        packet_kind_to_emit: kind,
        successors: successors.iter().map(|s| s.to_string()).collect(),
    }
}

/// Template A: ground a belief from a fresh observation.
#[must_use]
pub fn template_a_grounding() -> EpisodeTemplate {
    EpisodeTemplate {
        name: "template_a_grounding".into(),
        description: "Observe, then fold the observation into belief state.".into(),
        steps: vec![
            step("observe", SourceLayer::TaskProsecution, Some(PacketKind::Observation), &["integrate_belief"]),
            step("integrate_belief", SourceLayer::SelfModel, Some(PacketKind::BeliefUpdate), &[]),
        ],
        entry_step: "observe".into(),
        exit_steps: vec!["integrate_belief".into()],
        constraints: TemplateConstraints::default(),
    }
}

/// Template B: verify before acting.
#[must_use]
pub fn template_b_verification() -> EpisodeTemplate {
    EpisodeTemplate {
        name: "template_b_verification".into(),
        description: "Decide to verify first, run the verification task, fold its result into belief state.".into(),
        steps: vec![
            step("decide_verify_first", SourceLayer::Executive, Some(PacketKind::Decision), &["plan_verification"]),
            step("plan_verification", SourceLayer::CognitiveControl, Some(PacketKind::VerificationPlan), &["direct_verification"]),
            step("direct_verification", SourceLayer::CognitiveControl, Some(PacketKind::TaskDirective), &["execute_verification"]),
            step("execute_verification", SourceLayer::TaskProsecution, Some(PacketKind::TaskResult), &["integrate_result"]),
            step("integrate_result", SourceLayer::SelfModel, Some(PacketKind::BeliefUpdate), &[]),
        ],
        entry_step: "decide_verify_first".into(),
        exit_steps: vec!["integrate_result".into()],
        constraints: TemplateConstraints { required_tools_state: Some(ToolsState::ToolsOk), ..TemplateConstraints::default() },
    }
}

/// Template C: act via a read-only tool, no authorization token needed.
#[must_use]
pub fn template_c_read_only_act() -> EpisodeTemplate {
    EpisodeTemplate {
        name: "template_c_read_only_act".into(),
        description: "Decide to act, execute via a read-only tool, fold the result into belief state.".into(),
        steps: vec![
            step("decide_act", SourceLayer::Executive, Some(PacketKind::Decision), &["direct_read"]),
            step("direct_read", SourceLayer::CognitiveControl, Some(PacketKind::TaskDirective), &["execute_read"]),
            step("execute_read", SourceLayer::TaskProsecution, Some(PacketKind::TaskResult), &["integrate_result"]),
            step("integrate_result", SourceLayer::SelfModel, Some(PacketKind::BeliefUpdate), &[]),
        ],
        entry_step: "decide_act".into(),
        exit_steps: vec!["integrate_result".into()],
        constraints: TemplateConstraints { required_tools_state: Some(ToolsState::ToolsOk), ..TemplateConstraints::default() },
    }
}

/// Template D: act via a write/mixed tool, gated on an authorization token.
#[must_use]
pub fn template_d_write_act() -> EpisodeTemplate {
    EpisodeTemplate {
        name: "template_d_write_act".into(),
        description: "Decide to act, mint an authorization token, execute a write directive, fold the result.".into(),
        steps: vec![
            step("decide_act", SourceLayer::Executive, Some(PacketKind::Decision), &["authorize"]),
            step("authorize", SourceLayer::Executive, Some(PacketKind::ToolAuthorizationToken), &["direct_write"]),
            step("direct_write", SourceLayer::CognitiveControl, Some(PacketKind::TaskDirective), &["execute_write"]),
            step("execute_write", SourceLayer::TaskProsecution, Some(PacketKind::TaskResult), &["integrate_result"]),
            step("integrate_result", SourceLayer::SelfModel, Some(PacketKind::BeliefUpdate), &[]),
        ],
        entry_step: "decide_act".into(),
        exit_steps: vec!["integrate_result".into()],
        constraints: TemplateConstraints {
            minimum_tier: Some(QualityTier::Superb),
            required_tools_state: Some(ToolsState::ToolsOk),
            write_allowed: true,
            ..TemplateConstraints::default()
        },
    }
}

/// Template E: hand off to external/human judgment.
#[must_use]
pub fn template_e_escalation() -> EpisodeTemplate {
    EpisodeTemplate {
        name: "template_e_escalation".into(),
        description: "Decide to escalate, raise the escalation packet, and wait.".into(),
        steps: vec![
            step("decide_escalate", SourceLayer::Executive, Some(PacketKind::Decision), &["escalate"]),
            step("escalate", SourceLayer::Executive, Some(PacketKind::Escalation), &[]),
        ],
        entry_step: "decide_escalate".into(),
        exit_steps: vec!["escalate".into()],
        constraints: TemplateConstraints::default(),
    }
}

/// Template F: tools are down or partial, so INV-010 forbids acting and
/// the episode must escalate instead.
#[must_use]
pub fn template_f_degraded_tools() -> EpisodeTemplate {
    EpisodeTemplate {
        name: "template_f_degraded_tools".into(),
        description: "Tools are degraded; decide to escalate rather than attempt a directive.".into(),
        steps: vec![
            step("decide_escalate", SourceLayer::Executive, Some(PacketKind::Decision), &["raise_integrity_alert"]),
            step("raise_integrity_alert", SourceLayer::Integrity, Some(PacketKind::IntegrityAlert), &["escalate"]),
            step("escalate", SourceLayer::Executive, Some(PacketKind::Escalation), &[]),
        ],
        entry_step: "decide_escalate".into(),
        exit_steps: vec!["escalate".into()],
        constraints: TemplateConstraints { forbidden_tools_state: Some(ToolsState::ToolsOk), ..TemplateConstraints::default() },
    }
}

/// Template G: compile a specification into executable form.
#[must_use]
pub fn template_g_compile_to_code() -> EpisodeTemplate {
    EpisodeTemplate {
        name: "template_g_compile_to_code".into(),
        description: "Decide to act, direct a compile task, fold the result into belief state.".into(),
        steps: vec![
            step("decide_compile", SourceLayer::Executive, Some(PacketKind::Decision), &["direct_compile"]),
            step("direct_compile", SourceLayer::CognitiveControl, Some(PacketKind::TaskDirective), &["execute_compile"]),
            step("execute_compile", SourceLayer::TaskProsecution, Some(PacketKind::TaskResult), &["integrate_result"]),
            step("integrate_result", SourceLayer::SelfModel, Some(PacketKind::BeliefUpdate), &[]),
        ],
        entry_step: "decide_compile".into(),
        exit_steps: vec!["integrate_result".into()],
        constraints: TemplateConstraints { required_tools_state: Some(ToolsState::ToolsOk), ..TemplateConstraints::default() },
    }
}

/// Template H (optional): ground, verify, then act, exercising the full
/// stack in one episode.
#[must_use]
pub fn template_h_full_stack() -> EpisodeTemplate {
    EpisodeTemplate {
        name: "template_h_full_stack".into(),
        description: "Ground a belief, verify it, then act on it under a write authorization.".into(),
        steps: vec![
            step("observe", SourceLayer::TaskProsecution, Some(PacketKind::Observation), &["integrate_observation"]),
            step("integrate_observation", SourceLayer::SelfModel, Some(PacketKind::BeliefUpdate), &["decide_verify_first"]),
            step("decide_verify_first", SourceLayer::Executive, Some(PacketKind::Decision), &["plan_verification"]),
            step("plan_verification", SourceLayer::CognitiveControl, Some(PacketKind::VerificationPlan), &["direct_verification"]),
            step("direct_verification", SourceLayer::CognitiveControl, Some(PacketKind::TaskDirective), &["execute_verification"]),
            step("execute_verification", SourceLayer::TaskProsecution, Some(PacketKind::TaskResult), &["integrate_verification"]),
            step("integrate_verification", SourceLayer::SelfModel, Some(PacketKind::BeliefUpdate), &["decide_act"]),
            step("decide_act", SourceLayer::Executive, Some(PacketKind::Decision), &["authorize"]),
            step("authorize", SourceLayer::Executive, Some(PacketKind::ToolAuthorizationToken), &["direct_write"]),
            step("direct_write", SourceLayer::CognitiveControl, Some(PacketKind::TaskDirective), &["execute_write"]),
            step("execute_write", SourceLayer::TaskProsecution, Some(PacketKind::TaskResult), &["integrate_result"]),
            step("integrate_result", SourceLayer::SelfModel, Some(PacketKind::BeliefUpdate), &[]),
        ],
        entry_step: "observe".into(),
        exit_steps: vec!["integrate_result".into()],
        constraints: TemplateConstraints {
            minimum_tier: Some(QualityTier::Superb),
            required_tools_state: Some(ToolsState::ToolsOk),
            write_allowed: true,
            ..TemplateConstraints::default()
        },
    }
}

/// Every canonical template, in lettered order.
#[must_use]
pub fn all_templates() -> Vec<EpisodeTemplate> {
    vec![
        template_a_grounding(),
        template_b_verification(),
        template_c_read_only_act(),
        template_d_write_act(),
        template_e_escalation(),
        template_f_degraded_tools(),
        template_g_compile_to_code(),
        template_h_full_stack(),
    ]
}

/// Look up a canonical template by name.
#[must_use]
pub fn by_name(name: &str) -> Option<EpisodeTemplate> {
    all_templates().into_iter().find(|t| t.name == name)
}
