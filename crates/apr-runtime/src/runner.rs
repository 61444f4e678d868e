// SPDX-License-Identifier: MIT OR Apache-2.0
//! The per-episode step loop (§4.6): invoke a layer, validate its
//! candidates against the ledger, publish admissions to the buses,
//! update integrity state, and choose the next step.

use std::time::Duration;

use apr_core::payload::{EscalationPayload, PacketPayload};
use apr_core::{DecisionOutcome, FsmState, Packet, PacketHeader, PacketKind, SourceLayer, StakesLevel};
use apr_layer::{filter_emitted, filter_received, Bus, BusMessage, StepContext};
use apr_ledger::{BudgetCaps, EpisodeLedger, SafeMode};
use apr_template::{CompiledEpisode, TemplateStep};
use apr_validate::{apply, Admission, Diagnostics, FreshnessWindows};
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::RuntimeError;
use crate::integrity;
use crate::registry::LayerRegistry;
use crate::step::{EpisodeResult, StepOutcome, StopReason};

/// Per-step deadline when the step's bound MCP envelope carries no
/// budget (non-consequential steps never bind one).
const DEFAULT_STEP_TIMEOUT_SECONDS: u64 = 30;

enum BusDirection {
    Northbound,
    Southbound,
}

fn bus_direction(kind: PacketKind) -> BusDirection {
    use PacketKind::{BeliefUpdate, Decision, Escalation, IntegrityAlert, Observation, TaskDirective, TaskResult, ToolAuthorizationToken, VerificationPlan};
    match kind {
        Observation | TaskResult | BeliefUpdate | Escalation | IntegrityAlert => BusDirection::Northbound,
        Decision | VerificationPlan | ToolAuthorizationToken | TaskDirective => BusDirection::Southbound,
    }
}

async fn publish(northbound: &Mutex<Bus>, southbound: &Mutex<Bus>, packet: Packet) {
    let message = BusMessage { packet, target_layer: None };
    match bus_direction(message.packet.header.packet_kind) {
        BusDirection::Northbound => northbound.lock().await.publish(message),
        BusDirection::Southbound => southbound.lock().await.publish(message),
    }
}

async fn publish_timeout_escalation(ledger: &EpisodeLedger, northbound: &Mutex<Bus>, step_id: &str) {
    let header = PacketHeader::new(
        format!("pkt_timeout_escalation_{step_id}"),
        PacketKind::Escalation,
        Utc::now(),
        SourceLayer::Integrity,
        ledger.correlation_id().to_string(),
    );
    let packet = Packet::new(
        header,
        None,
        PacketPayload::Escalation(EscalationPayload {
            escalation_trigger: "step_timeout".into(),
            top_options: vec![],
            evidence_gaps: vec![format!("step '{step_id}' did not complete within its deadline")],
            recommended_next_step: "await operator input".into(),
        }),
    );
    northbound.lock().await.publish(BusMessage { packet, target_layer: None });
}

async fn publish_directive_timeout_escalation(ledger: &EpisodeLedger, northbound: &Mutex<Bus>, task_id: &str) {
    let header = PacketHeader::new(
        format!("pkt_directive_timeout_escalation_{task_id}"),
        PacketKind::Escalation,
        Utc::now(),
        SourceLayer::Integrity,
        ledger.correlation_id().to_string(),
    );
    let packet = Packet::new(
        header,
        None,
        PacketPayload::Escalation(EscalationPayload {
            escalation_trigger: "directive_timeout".into(),
            top_options: vec![],
            evidence_gaps: vec![format!("task '{task_id}' orphaned: no TaskResult before its deadline")],
            recommended_next_step: "await operator input".into(),
        }),
    );
    northbound.lock().await.publish(BusMessage { packet, target_layer: None });
}

fn decision_outcome_tag(outcome: DecisionOutcome) -> &'static str {
    match outcome {
        DecisionOutcome::VerifyFirst => "verify",
        DecisionOutcome::Act => "act",
        DecisionOutcome::Escalate => "escalate",
        DecisionOutcome::Defer => "defer",
        DecisionOutcome::Cancel => "cancel",
    }
}

/// Pick the step after `step`: its sole successor if unambiguous,
/// otherwise the successor whose id names the last admitted Decision's
/// outcome (§4.6 step g). None of the seven canonical templates branch,
/// but a template with a multi-way decision step can still resolve here
/// as long as its successor step ids are named after the outcome they
/// handle (e.g. `direct_write` vs `escalate`).
fn choose_next_step(step: &TemplateStep, admitted: &[Packet]) -> Option<String> {
    match step.successors.as_slice() {
        [] => None,
        [only] => Some(only.clone()),
        many => {
            let outcome = admitted.iter().rev().find_map(|p| match &p.payload {
                PacketPayload::Decision(d) => Some(d.decision_outcome),
                _ => None,
            });
            if let Some(outcome) = outcome {
                let tag = decision_outcome_tag(outcome);
                if let Some(matched) = many.iter().find(|s| s.contains(tag)) {
                    return Some(matched.clone());
                }
            }
            warn!(target: "apr.runtime", step_id = %step.step_id, "ambiguous successor set, falling back to first");
            many.first().cloned()
        }
    }
}

/// Drive `compiled` to completion or failure, starting from a freshly
/// created ledger in `S0_IDLE`. `northbound`/`southbound` are shared
/// with every other in-flight episode; each publish only briefly locks
/// its bus, preserving §5's "no shared mutable state except the buses"
/// rule.
pub async fn run_episode(
    registry: &LayerRegistry,
    northbound: &Mutex<Bus>,
    southbound: &Mutex<Bus>,
    compiled: &CompiledEpisode,
    budget_caps: BudgetCaps,
    max_steps: u32,
    windows: FreshnessWindows,
) -> Result<EpisodeResult, RuntimeError> {
    let mut ledger = EpisodeLedger::create(compiled.correlation_id.clone(), budget_caps);
    let mut current_step = compiled.entry_step.clone();
    let mut current_packets: Vec<Packet> = Vec::new();
    let mut steps = Vec::new();
    let mut emitted_packets: Vec<Packet> = Vec::new();
    let mut stop_reason = StopReason::ReachedExitStep;
    let mut step_count: u32 = 0;

    while !compiled.is_exit_step(&current_step) {
        if step_count >= max_steps {
            stop_reason = StopReason::MaxStepsExceeded;
            break;
        }
        step_count += 1;

        let template_step = compiled
            .steps
            .iter()
            .find(|s| s.step_id == current_step)
            .ok_or_else(|| RuntimeError::StepFailed { step_id: current_step.clone(), packet_id: String::new() })?;

        let layer = registry.get(template_step.owner_layer).ok_or(RuntimeError::UnregisteredLayer(template_step.owner_layer))?;

        let started_at = Utc::now();
        let context = StepContext {
            correlation_id: ledger.correlation_id().to_string(),
            campaign_id: ledger.campaign_id().map(str::to_string),
            step_id: current_step.clone(),
        };

        let deadline_seconds = compiled
            .mcp_for(&current_step)
            .map(|mcp| mcp.budgets.time_budget_seconds)
            .filter(|&seconds| seconds > 0)
            .unwrap_or(DEFAULT_STEP_TIMEOUT_SECONDS);

        let high_stakes = compiled
            .mcp_for(&current_step)
            .is_some_and(|mcp| matches!(mcp.stakes.stakes_level, StakesLevel::High | StakesLevel::Critical));

        for (task_id, alert) in integrity::evaluate_directive_timeouts(&mut ledger, Utc::now()) {
            warn!(target: "apr.runtime", step = %current_step, task_id, "directive orphaned, emitting timeout alert");
            publish(northbound, southbound, alert).await;
            if high_stakes {
                publish_directive_timeout_escalation(&ledger, northbound, &task_id).await;
            }
        }

        let received = filter_received(template_step.owner_layer, &current_packets);
        let invocation = tokio::time::timeout(Duration::from_secs(deadline_seconds), layer.invoke(&received, &context)).await;

        let candidates = match invocation {
            Err(_) => {
                warn!(target: "apr.runtime", step = %current_step, deadline_seconds, "step timed out");
                if high_stakes {
                    publish_timeout_escalation(&ledger, northbound, &current_step).await;
                }
                steps.push(StepOutcome {
                    step_id: current_step.clone(),
                    started_at,
                    finished_at: Utc::now(),
                    admitted_packet_ids: vec![],
                    diagnostics: Diagnostics::new(),
                    succeeded: false,
                });
                stop_reason = StopReason::StepTimedOut;
                break;
            }
            Ok(Err(error)) => return Err(RuntimeError::LayerInvocationFailed(error)),
            Ok(Ok(candidates)) => candidates,
        };

        let candidates = filter_emitted(template_step.owner_layer, candidates);

        let mut admitted_ids = Vec::new();
        let mut admitted_packets = Vec::new();
        let mut diagnostics = Diagnostics::new();
        let mut failed = false;

        for candidate in candidates {
            let packet_id = candidate.header.packet_id.clone();
            match apply(&mut ledger, candidate.clone(), Utc::now(), windows) {
                Admission::Admitted(diags) => {
                    diagnostics.extend(diags);
                    admitted_ids.push(packet_id);
                    publish(northbound, southbound, candidate.clone()).await;
                    emitted_packets.push(candidate.clone());
                    admitted_packets.push(candidate);
                }
                Admission::Rejected(diags) => {
                    diagnostics.extend(diags);
                    warn!(target: "apr.runtime", step = %current_step, packet_id, "candidate rejected, step failed");
                    failed = true;
                    break;
                }
            }
        }

        let finished_at = Utc::now();
        let elapsed_seconds = (finished_at - started_at).num_seconds().max(0) as u64;
        let tool_calls = admitted_packets.iter().filter(|p| p.header.packet_kind == PacketKind::TaskDirective).count() as u64;
        ledger.budget_mut().record(0, tool_calls, elapsed_seconds, 0.0);

        if let Some(alert) = integrity::evaluate_budget(&mut ledger, &current_step) {
            publish(northbound, southbound, alert).await;
        }

        steps.push(StepOutcome {
            step_id: current_step.clone(),
            started_at,
            finished_at,
            admitted_packet_ids: admitted_ids,
            diagnostics,
            succeeded: !failed,
        });

        if failed {
            stop_reason = StopReason::StepFailed;
            break;
        }

        if ledger.safe_mode().is_halted() {
            stop_reason = StopReason::SafeModeHalt;
            break;
        }

        if !ledger.budget().overrun_is_covered() {
            ledger.escalate_safe_mode(SafeMode::Restricted);
            let next_state = if ledger.current_fsm_state() == FsmState::S8Escalated { FsmState::S9Safemode } else { FsmState::S8Escalated };
            ledger.set_fsm_state(next_state);
            stop_reason = StopReason::SafeModeHalt;
            break;
        }

        current_step = match choose_next_step(template_step, &admitted_packets) {
            Some(next) => next,
            None => break,
        };
        current_packets = admitted_packets;
    }

    info!(
        target: "apr.runtime",
        correlation_id = %ledger.correlation_id(),
        steps = steps.len(),
        stop_reason = ?stop_reason,
        "episode finished",
    );

    Ok(EpisodeResult {
        correlation_id: ledger.correlation_id().to_string(),
        steps,
        emitted_packets,
        final_fsm_state: ledger.current_fsm_state(),
        ledger_summary: ledger.snapshot(),
        stop_reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use apr_backend_mock::MockLayer;
    use apr_ledger::BudgetCaps;
    use std::sync::Arc;

    fn caps() -> BudgetCaps {
        BudgetCaps { token_budget: 100_000, tool_call_budget: 100, time_budget_seconds: 3600, risk_budget: 100.0 }
    }

    fn sample_mcp() -> apr_core::McpEnvelope {
        use apr_core::envelope::{Budgets, DefinitionOfDone, Epistemics, Evidence, Intent, Quality, RiskBudget, Routing, StakesAxes};
        use apr_core::{AdversarialityLevel, EpistemicStatus, FreshnessClass, ImpactLevel, IrreversibilityLevel, QualityTier, TaskClass, ToolsState, UncertaintyLevel, VerificationRequirement};
        apr_core::McpEnvelope {
            intent: Intent { summary: "test intent".into(), scope: "test scope".into() },
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
                definition_of_done: DefinitionOfDone { text: "done".into(), checks: vec!["check".into()] },
                verification_requirement: VerificationRequirement::Optional,
            },
            budgets: Budgets { token_budget: 1000, tool_call_budget: 10, time_budget_seconds: 60, risk_budget: RiskBudget { envelope: "bounded".into(), max_loss: 0.0 } },
            epistemics: Epistemics {
                status: EpistemicStatus::Observed,
                confidence: 0.9,
                calibration_note: None,
                freshness_class: FreshnessClass::Operational,
                stale_if_older_than_seconds: None,
                assumptions: vec![],
            },
            evidence: Evidence { evidence_refs: vec![], evidence_absent_reason: Some("test episode".into()) },
            routing: Routing { task_class: TaskClass::Lookup, tools_state: ToolsState::ToolsOk },
        }
    }

    #[tokio::test]
    async fn template_a_runs_to_completion() {
        let mcp = sample_mcp();
        let mut registry = LayerRegistry::new();
        registry.register(Arc::new(
            MockLayer::new(SourceLayer::TaskProsecution, vec![PacketKind::Observation]).with_mcp_template(mcp.clone()),
        ));
        registry.register(Arc::new(
            MockLayer::new(SourceLayer::SelfModel, vec![PacketKind::BeliefUpdate]).with_mcp_template(mcp.clone()),
        ));

        let template = apr_template::by_name("template_a_grounding").expect("template a registered");
        let context = apr_template::CompilationContext {
            intent_summary: "observe".into(),
            intent_scope: "demo".into(),
            stakes: mcp.stakes,
            quality_tier: mcp.quality.tier,
            definition_of_done: mcp.quality.definition_of_done.clone(),
            verification_requirement: mcp.quality.verification_requirement,
            budgets: mcp.budgets.clone(),
            epistemic_status: mcp.epistemics.status,
            confidence: mcp.epistemics.confidence,
            freshness_class: mcp.epistemics.freshness_class,
            evidence_refs: vec![],
            evidence_absent_reason: Some("demo".into()),
            task_class: mcp.routing.task_class,
            tools_state: mcp.routing.tools_state,
        };
        let compiled = apr_template::compile(&template.name, "corr_demo", &context).expect("compiles");

        let northbound = Mutex::new(Bus::new("northbound"));
        let southbound = Mutex::new(Bus::new("southbound"));

        let result = run_episode(&registry, &northbound, &southbound, &compiled, caps(), 10, FreshnessWindows::default())
            .await
            .expect("episode runs");

        assert!(result.is_success());
        assert_eq!(result.steps.len(), 2);
        assert_eq!(result.final_fsm_state, FsmState::S2Model);
    }

    #[tokio::test]
    async fn missing_layer_registration_is_reported() {
        let mcp = sample_mcp();
        let registry = LayerRegistry::new();
        let template = apr_template::by_name("template_a_grounding").expect("template a registered");
        let context = apr_template::CompilationContext {
            intent_summary: "observe".into(),
            intent_scope: "demo".into(),
            stakes: mcp.stakes,
            quality_tier: mcp.quality.tier,
            definition_of_done: mcp.quality.definition_of_done.clone(),
            verification_requirement: mcp.quality.verification_requirement,
            budgets: mcp.budgets.clone(),
            epistemic_status: mcp.epistemics.status,
            confidence: mcp.epistemics.confidence,
            freshness_class: mcp.epistemics.freshness_class,
            evidence_refs: vec![],
            evidence_absent_reason: Some("demo".into()),
            task_class: mcp.routing.task_class,
            tools_state: mcp.routing.tools_state,
        };
        let compiled = apr_template::compile(&template.name, "corr_demo", &context).expect("compiles");
        let northbound = Mutex::new(Bus::new("northbound"));
        let southbound = Mutex::new(Bus::new("southbound"));

        let result = run_episode(&registry, &northbound, &southbound, &compiled, caps(), 10, FreshnessWindows::default()).await;
        assert!(matches!(result, Err(RuntimeError::UnregisteredLayer(SourceLayer::TaskProsecution))));
    }
}
