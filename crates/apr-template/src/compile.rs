// SPDX-License-Identifier: MIT OR Apache-2.0
//! Binds a canonical template to a compilation context, producing a
//! [`CompiledEpisode`] or refusing when the context violates the
//! template's declared constraints.

use std::collections::BTreeMap;

use apr_core::envelope::{Budgets, DefinitionOfDone, Epistemics, Evidence, Intent, Quality, Routing, StakesAxes};
use apr_core::{EpistemicStatus, EvidenceRef, FreshnessClass, McpEnvelope, QualityTier, TaskClass, ToolsState, VerificationRequirement};
use apr_error::{AprError, ErrorCode, Result};
use tracing::{debug, warn};

use crate::model::EpisodeTemplate;
use crate::templates;
use crate::CompiledEpisode;

/// Everything the compiler needs to bind MCP envelopes onto a template's
/// steps. One context is shared across every step of an episode; the
/// runner's layers refine budgets and epistemics as the episode runs.
#[derive(Debug, Clone)]
pub struct CompilationContext {
    /// Short summary bound into every step's `intent.summary`.
    pub intent_summary: String,
    /// Scope bound into every step's `intent.scope`.
    pub intent_scope: String,
    /// Stakes assessment shared by every step.
    pub stakes: StakesAxes,
    /// Quality tier the episode is being compiled to run at.
    pub quality_tier: QualityTier,
    /// Definition of done shared by every step.
    pub definition_of_done: DefinitionOfDone,
    /// How thoroughly that definition of done must be checked.
    pub verification_requirement: VerificationRequirement,
    /// Resource ceilings for the episode.
    pub budgets: Budgets,
    /// Epistemic status bound into every step.
    pub epistemic_status: EpistemicStatus,
    /// Subjective confidence, `[0, 1]`.
    pub confidence: f64,
    /// Freshness class claims are held to.
    pub freshness_class: FreshnessClass,
    /// Evidence grounding the episode, if any.
    pub evidence_refs: Vec<EvidenceRef>,
    /// Reason no evidence is cited, if `evidence_refs` is empty.
    pub evidence_absent_reason: Option<String>,
    /// Kind of work this episode is pursuing.
    pub task_class: TaskClass,
    /// Current tool availability, checked against the template's
    /// constraints before compilation proceeds.
    pub tools_state: ToolsState,
}

fn tier_rank(tier: QualityTier) -> u8 {
    match tier {
        QualityTier::Subpar => 0,
        QualityTier::Par => 1,
        QualityTier::Superb => 2,
    }
}

fn envelope_for(context: &CompilationContext) -> McpEnvelope {
    McpEnvelope {
        intent: Intent { summary: context.intent_summary.clone(), scope: context.intent_scope.clone() },
        stakes: context.stakes,
        quality: Quality {
            tier: context.quality_tier,
            satisficing_mode: false,
            definition_of_done: context.definition_of_done.clone(),
            verification_requirement: context.verification_requirement,
        },
        budgets: context.budgets.clone(),
        epistemics: Epistemics {
            status: context.epistemic_status,
            confidence: context.confidence,
            calibration_note: None,
            freshness_class: context.freshness_class,
            stale_if_older_than_seconds: None,
            assumptions: Vec::new(),
        },
        evidence: Evidence {
            evidence_refs: context.evidence_refs.clone(),
            evidence_absent_reason: context.evidence_absent_reason.clone(),
        },
        routing: Routing { task_class: context.task_class, tools_state: context.tools_state },
    }
}

/// Check `context` against `template.constraints`, returning the first
/// violation found.
fn check_constraints(template: &EpisodeTemplate, context: &CompilationContext) -> Result<()> {
    let constraints = &template.constraints;

    if let Some(minimum) = constraints.minimum_tier {
        if tier_rank(context.quality_tier) < tier_rank(minimum) {
            return Err(AprError::new(
                ErrorCode::TemplateConstraintViolation,
                format!("template {} requires quality tier {:?} or higher", template.name, minimum),
            )
            .with_context("template", template.name.clone())
            .with_context("required_minimum_tier", format!("{:?}", minimum))
            .with_context("context_tier", format!("{:?}", context.quality_tier)));
        }
    }

    if let Some(required) = constraints.required_tools_state {
        if context.tools_state != required {
            return Err(AprError::new(
                ErrorCode::TemplateConstraintViolation,
                format!("template {} requires tools_state {:?}", template.name, required),
            )
            .with_context("template", template.name.clone())
            .with_context("required_tools_state", format!("{:?}", required))
            .with_context("context_tools_state", format!("{:?}", context.tools_state)));
        }
    }

    if let Some(forbidden) = constraints.forbidden_tools_state {
        if context.tools_state == forbidden {
            return Err(AprError::new(
                ErrorCode::TemplateConstraintViolation,
                format!("template {} refuses tools_state {:?}", template.name, forbidden),
            )
            .with_context("template", template.name.clone())
            .with_context("forbidden_tools_state", format!("{:?}", forbidden)));
        }
    }

    Ok(())
}

/// Compile `template_name` under `context`, allocating `correlation_id`
/// for the resulting episode.
///
/// Refuses with [`ErrorCode::TemplateUnknown`] if no canonical template
/// matches, with [`ErrorCode::TemplateConstraintViolation`] if `context`
/// violates the template's declared constraints, and with the same code
/// if the template itself is not a well-formed graph (a defect in the
/// template catalog, not in the caller's context).
pub fn compile(template_name: &str, correlation_id: impl Into<String>, context: &CompilationContext) -> Result<CompiledEpisode> {
    let correlation_id = correlation_id.into();
    let template = templates::by_name(template_name).ok_or_else(|| {
        warn!(target: "apr.template", template = template_name, "requested template does not exist");
        AprError::new(ErrorCode::TemplateUnknown, format!("no such template: {template_name}"))
            .with_context("template", template_name)
    })?;

    if !template.is_well_formed() {
        return Err(AprError::new(ErrorCode::TemplateConstraintViolation, format!("template {template_name} is not a well-formed graph"))
            .with_context("template", template_name));
    }

    check_constraints(&template, context)?;

    let envelope = envelope_for(context);
    let mut mcp_bindings = BTreeMap::new();
    for step in &template.steps {
        mcp_bindings.insert(step.step_id.clone(), envelope.clone());
    }

    debug!(
        target: "apr.template",
        template = template_name,
        correlation_id = %correlation_id,
        steps = template.steps.len(),
        "compiled episode",
    );

    Ok(CompiledEpisode {
        template_name: template.name,
        correlation_id,
        steps: template.steps,
        entry_step: template.entry_step,
        exit_steps: template.exit_steps,
        mcp_bindings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use apr_core::envelope::RiskBudget;
    use apr_core::{AdversarialityLevel, ImpactLevel, IrreversibilityLevel, StakesLevel, UncertaintyLevel};

    fn low_stakes_context(tools_state: ToolsState, tier: QualityTier) -> CompilationContext {
        CompilationContext {
            intent_summary: "look something up".into(),
            intent_scope: "read-only lookup".into(),
            stakes: StakesAxes {
                impact: ImpactLevel::Low,
                irreversibility: IrreversibilityLevel::Reversible,
                uncertainty: UncertaintyLevel::Low,
                adversariality: AdversarialityLevel::None,
                stakes_level: StakesLevel::Low,
            },
            quality_tier: tier,
            definition_of_done: DefinitionOfDone { text: "lookup returns a value".into(), checks: vec!["value present".into()] },
            verification_requirement: VerificationRequirement::Optional,
            budgets: Budgets {
                token_budget: 1000,
                tool_call_budget: 10,
                time_budget_seconds: 60,
                risk_budget: RiskBudget { envelope: "bounded".into(), max_loss: 0.0 },
            },
            epistemic_status: EpistemicStatus::Observed,
            confidence: 0.9,
            freshness_class: FreshnessClass::Operational,
            evidence_refs: vec![],
            evidence_absent_reason: Some("no prior evidence needed for a lookup".into()),
            task_class: TaskClass::Lookup,
            tools_state,
        }
    }

    #[test]
    fn compiling_unknown_template_is_rejected() {
        let context = low_stakes_context(ToolsState::ToolsOk, QualityTier::Par);
        let err = compile("template_zzz", "corr_1", &context).unwrap_err();
        assert_eq!(err.code, ErrorCode::TemplateUnknown);
    }

    #[test]
    fn template_c_compiles_under_healthy_tools() {
        let context = low_stakes_context(ToolsState::ToolsOk, QualityTier::Par);
        let compiled = compile("template_c_read_only_act", "corr_2", &context).expect("compiles");
        assert_eq!(compiled.correlation_id, "corr_2");
        assert_eq!(compiled.mcp_bindings.len(), compiled.steps.len());
    }

    #[test]
    fn template_d_refuses_below_superb_tier() {
        let context = low_stakes_context(ToolsState::ToolsOk, QualityTier::Par);
        let err = compile("template_d_write_act", "corr_3", &context).unwrap_err();
        assert_eq!(err.code, ErrorCode::TemplateConstraintViolation);
    }

    #[test]
    fn template_f_refuses_when_tools_are_healthy() {
        let context = low_stakes_context(ToolsState::ToolsOk, QualityTier::Par);
        let err = compile("template_f_degraded_tools", "corr_4", &context).unwrap_err();
        assert_eq!(err.code, ErrorCode::TemplateConstraintViolation);
    }

    #[test]
    fn template_f_compiles_when_tools_are_partial() {
        let context = low_stakes_context(ToolsState::ToolsPartial, QualityTier::Par);
        let compiled = compile("template_f_degraded_tools", "corr_5", &context).expect("compiles");
        assert_eq!(compiled.entry_step, "decide_escalate");
    }

    #[test]
    fn every_step_is_bound_to_an_envelope() {
        let context = low_stakes_context(ToolsState::ToolsOk, QualityTier::Superb);
        let compiled = compile("template_b_verification", "corr_6", &context).expect("compiles");
        for step in &compiled.steps {
            assert!(compiled.mcp_for(&step.step_id).is_some());
        }
    }
}
