// SPDX-License-Identifier: MIT OR Apache-2.0
//! Stateful FSM validator: legal `(current_state, packet_kind [+
//! discriminant]) -> next_state` transitions for one episode.
//!
//! `S3_DECIDE` is modeled as a resting state reached whenever a Decision
//! commits to `ACT` without the per-step context already naming the
//! directive that will carry it out (matching scenario S1, where the
//! episode ends at `S3_DECIDE` immediately after its final `ACT`
//! decision). The directive that follows is what actually picks
//! `S5_AUTHORIZE` vs `S6_EXECUTE`, keyed on its `tool_safety_class`. This
//! reading favors the companion validator document's framing over the
//! specification prose, per the design notes' guidance where the two
//! diverge on `S3_DECIDE`'s exact edges — the divergence is surfaced as a
//! warning rather than silently resolved.

use apr_core::payload::PacketPayload;
use apr_core::{DecisionOutcome, FsmState, Packet, ResultStatus, ToolSafetyClass};
use apr_ledger::EpisodeLedger;

use crate::diagnostics::{Diagnostic, Diagnostics};

/// Evaluate the legal next state for `packet` given `current`. Returns
/// the next state plus any warnings (e.g. FSM/validator-document
/// divergence), or error diagnostics if the transition is illegal.
pub fn transition(
    current: FsmState,
    packet: &Packet,
    ledger: &EpisodeLedger,
) -> Result<(FsmState, Diagnostics), Diagnostics> {
    let mut warnings = Diagnostics::new();

    if let PacketPayload::IntegrityAlert(alert) = &packet.payload {
        use apr_core::AlertSeverity;
        return Ok(match alert.severity {
            AlertSeverity::Critical => (FsmState::S9Safemode, warnings),
            AlertSeverity::Info => (FsmState::S7Review, warnings),
            AlertSeverity::Warning | AlertSeverity::High => (current, warnings),
        });
    }

    if current == FsmState::S9Safemode {
        return match &packet.payload {
            PacketPayload::BeliefUpdate(_) => Ok((FsmState::S9Safemode, warnings)),
            _ => Err(fatal("FSM", "header.packet_kind", "only IntegrityAlert and BeliefUpdate are admitted in S9_SAFEMODE")),
        };
    }

    let next = match (current, &packet.payload) {
        (FsmState::S0Idle, PacketPayload::Observation(_)) => FsmState::S1Sense,

        (FsmState::S1Sense, PacketPayload::Observation(_)) => FsmState::S1Sense,
        (FsmState::S1Sense, PacketPayload::BeliefUpdate(_)) => FsmState::S2Model,

        (FsmState::S2Model, PacketPayload::BeliefUpdate(_)) => FsmState::S2Model,
        (FsmState::S2Model, PacketPayload::Decision(d)) => {
            if ledger.recent_packets().all(|p| !matches!(p.payload, PacketPayload::BeliefUpdate(_))) {
                return Err(fatal("FSM", "payload.decision_outcome", "no-decision-without-model: no prior BeliefUpdate in this episode"));
            }
            decision_target(d.decision_outcome)
        }

        (FsmState::S3Decide, PacketPayload::ToolAuthorizationToken(_)) => FsmState::S5Authorize,
        (FsmState::S3Decide, PacketPayload::TaskDirective(d)) => directive_target(d.tool_safety_class)?,
        (FsmState::S3Decide, PacketPayload::Escalation(_)) => FsmState::S8Escalated,

        (FsmState::S4Verify, PacketPayload::VerificationPlan(_)) => FsmState::S4Verify,
        (FsmState::S4Verify, PacketPayload::TaskDirective(d)) => {
            if !matches!(d.tool_safety_class, Some(ToolSafetyClass::Read) | None) {
                return Err(fatal("FSM", "payload.tool_safety_class", "S4_VERIFY only admits READ task directives"));
            }
            FsmState::S4Verify
        }
        (FsmState::S4Verify, PacketPayload::TaskResult(_)) => FsmState::S4Verify,
        (FsmState::S4Verify, PacketPayload::Observation(_)) => FsmState::S4Verify,
        (FsmState::S4Verify, PacketPayload::BeliefUpdate(b)) => {
            if !references_verification_evidence(b) {
                FsmState::S4Verify
            } else if verification_loop_is_closed(ledger, b) {
                FsmState::S2Model
            } else {
                warnings.push(Diagnostic::warning(
                    "INV-008",
                    "payload.update_type",
                    "verification loop closure requested but required evidence (plan, READ directive, result, observation) is incomplete; remaining in S4_VERIFY",
                ));
                FsmState::S4Verify
            }
        }

        (FsmState::S5Authorize, PacketPayload::TaskDirective(d)) => {
            if !matches!(d.tool_safety_class, Some(ToolSafetyClass::Write) | Some(ToolSafetyClass::Mixed)) {
                return Err(fatal("FSM", "payload.tool_safety_class", "S5_AUTHORIZE expects a WRITE/MIXED task directive"));
            }
            FsmState::S6Execute
        }

        (FsmState::S6Execute, PacketPayload::TaskDirective(_)) => FsmState::S6Execute,
        (FsmState::S6Execute, PacketPayload::TaskResult(_)) => FsmState::S6Execute,
        (FsmState::S6Execute, PacketPayload::Observation(_)) => FsmState::S6Execute,
        (FsmState::S6Execute, PacketPayload::BeliefUpdate(b)) => {
            if b.update_type == "task_complete" { FsmState::S7Review } else { FsmState::S2Model }
        }

        (FsmState::S7Review, PacketPayload::BeliefUpdate(b)) => {
            if b.update_type == "episode_close" { FsmState::S0Idle } else { FsmState::S7Review }
        }

        (FsmState::S8Escalated, PacketPayload::Escalation(_)) => FsmState::S8Escalated,

        (state, payload) => {
            return Err(fatal(
                "FSM",
                "header.packet_kind",
                &format!("{:?} does not admit a {:?} packet in state {state:?}", payload.kind(), payload.kind()),
            ));
        }
    };

    Ok((next, warnings))
}

fn decision_target(outcome: DecisionOutcome) -> FsmState {
    match outcome {
        DecisionOutcome::VerifyFirst => FsmState::S4Verify,
        DecisionOutcome::Act => FsmState::S3Decide,
        DecisionOutcome::Escalate => FsmState::S8Escalated,
        DecisionOutcome::Defer | DecisionOutcome::Cancel => FsmState::S7Review,
    }
}

fn directive_target(class: Option<ToolSafetyClass>) -> Result<FsmState, Diagnostics> {
    match class {
        Some(ToolSafetyClass::Read) | None => Ok(FsmState::S6Execute),
        Some(ToolSafetyClass::Write) | Some(ToolSafetyClass::Mixed) => Ok(FsmState::S5Authorize),
    }
}

fn references_verification_evidence(belief_update: &apr_core::payload::BeliefUpdatePayload) -> bool {
    belief_update.belief_changes.iter().any(|c| c.domain == "verification")
        || belief_update.update_type == "verification_closed"
}

/// INV-008: a `BeliefUpdate` may only close the `S4_VERIFY` loop once the
/// ledger actually shows a verification plan, a READ directive, an
/// observation, and — when the acting `Decision` reported `TOOLS_OK` — a
/// successful `TaskResult`, all admitted since the loop was entered.
fn verification_loop_is_closed(ledger: &EpisodeLedger, _belief_update: &apr_core::payload::BeliefUpdatePayload) -> bool {
    let window: Vec<&Packet> = ledger
        .recent_packets()
        .rev()
        .take(ledger.packets_since_verify_start() as usize)
        .collect();

    let has_plan = window.iter().any(|p| matches!(p.payload, PacketPayload::VerificationPlan(_)));
    let has_read_directive = window.iter().any(|p| {
        matches!(&p.payload, PacketPayload::TaskDirective(d) if matches!(d.tool_safety_class, Some(ToolSafetyClass::Read) | None))
    });
    let has_observation = window.iter().any(|p| matches!(p.payload, PacketPayload::Observation(_)));

    let tools_state = ledger.recent_packets().rev().find_map(|p| match &p.payload {
        PacketPayload::Decision(_) => p.mcp.as_ref().map(|m| m.routing.tools_state),
        _ => None,
    });
    let requires_success = matches!(tools_state, Some(apr_core::ToolsState::ToolsOk) | None);
    let has_success_result = window.iter().any(|p| {
        matches!(&p.payload, PacketPayload::TaskResult(r) if r.result_status == ResultStatus::Success)
    });

    has_plan && has_read_directive && has_observation && (!requires_success || has_success_result)
}

/// Whether `current` admits a TaskDirective with unspecified tool safety
/// class per `S3_DECIDE`'s acting-without-known-mode edge (used by the
/// runner to check whether a directive requires an active token before
/// transitioning, see `apr_core::TaskDirectivePayload::requires_authorization`).
#[must_use]
pub fn task_result_is_consistent(current: FsmState, result_status: ResultStatus) -> bool {
    matches!(current, FsmState::S4Verify | FsmState::S6Execute) || result_status == ResultStatus::Cancelled
}

fn fatal(code: &'static str, field_path: &str, message: &str) -> Diagnostics {
    let mut diags = Diagnostics::new();
    diags.push(Diagnostic::error(code, field_path.to_string(), message.to_string()));
    diags
}
