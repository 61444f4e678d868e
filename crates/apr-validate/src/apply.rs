// SPDX-License-Identifier: MIT OR Apache-2.0
//! The admission pipeline: schema, then FSM, then invariants. The ledger
//! only mutates once every validator has passed.

use apr_core::payload::PacketPayload;
use apr_core::{Packet, ResultStatus};
use apr_ledger::{EpisodeLedger, OpenDirective, TrackedAssumption};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::diagnostics::Diagnostics;
use crate::fsm;
use crate::invariants::{self, FreshnessWindows};
use crate::schema;

/// Outcome of running a packet through the full admission pipeline.
#[derive(Debug)]
pub enum Admission {
    /// Every validator passed; the packet was applied to the ledger.
    Admitted(Diagnostics),
    /// At least one validator raised an error; the ledger is unchanged.
    Rejected(Diagnostics),
}

impl Admission {
    /// Whether the packet was admitted.
    #[must_use]
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted(_))
    }

    /// The diagnostics produced either way.
    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        match self {
            Admission::Admitted(d) | Admission::Rejected(d) => d,
        }
    }
}

/// Validate `packet` against `ledger` at time `now` (schema, then FSM,
/// then invariants) and, only if every pass is error-free, mutate
/// `ledger` to reflect the packet's admission (§4.4, §7 propagation
/// policy).
pub fn apply(ledger: &mut EpisodeLedger, packet: Packet, now: DateTime<Utc>, windows: FreshnessWindows) -> Admission {
    let mut diags = schema::validate_structure(&packet);
    if diags.has_errors() {
        warn!(target: "apr.validate", packet_id = %packet.header.packet_id, "rejected at schema validation");
        return Admission::Rejected(diags);
    }

    let fsm_result = fsm::transition(ledger.current_fsm_state(), &packet, ledger);
    let next_state = match fsm_result {
        Ok((state, warnings)) => {
            diags.extend(warnings);
            state
        }
        Err(errors) => {
            diags.extend(errors);
            warn!(target: "apr.validate", packet_id = %packet.header.packet_id, "rejected at FSM validation");
            return Admission::Rejected(diags);
        }
    };

    diags.extend(invariants::check_invariants(&packet, ledger, now, windows));
    if diags.has_errors() {
        warn!(target: "apr.validate", packet_id = %packet.header.packet_id, "rejected at invariant validation");
        return Admission::Rejected(diags);
    }

    mutate_ledger(ledger, &packet, next_state, now);
    debug!(target: "apr.validate", packet_id = %packet.header.packet_id, next_state = ?next_state, "admitted");
    Admission::Admitted(diags)
}

fn mutate_ledger(ledger: &mut EpisodeLedger, packet: &Packet, next_state: apr_core::FsmState, now: DateTime<Utc>) {
    if let Some(mcp) = &packet.mcp {
        for evidence_ref in &mcp.evidence.evidence_refs {
            ledger.evidence_mut().append(evidence_ref.clone(), packet.header.packet_id.clone());
        }
    }

    match &packet.payload {
        PacketPayload::Decision(d) => {
            for assumption in &d.load_bearing_assumptions {
                ledger.assumptions_mut().record_assumption(TrackedAssumption {
                    assumption: assumption.assumption.clone(),
                    source_packet_id: packet.header.packet_id.clone(),
                    verified: assumption.verified,
                    verification_packet_id: None,
                });
            }
        }
        PacketPayload::BeliefUpdate(b) => {
            if let Some(details) = &b.contradiction_details {
                ledger.assumptions_mut().resolve_contradiction(&details.description);
            }
            if let Some(previous) = &packet.header.previous_packet_id {
                ledger.assumptions_mut().verify_assumptions_from(previous, &packet.header.packet_id);
            }
        }
        PacketPayload::ToolAuthorizationToken(token) => {
            ledger.tokens_mut().insert(token.clone());
        }
        PacketPayload::TaskDirective(d) => {
            if let Some(token_id) = &d.authorization_token_id {
                ledger.tokens_mut().increment_usage(token_id);
            }
            let timeout_seconds = d.timeout_seconds.unwrap_or(3600);
            ledger.directives_mut().open(
                d.task_id.clone(),
                OpenDirective { directive_packet_id: packet.header.packet_id.clone(), created_at: now, timeout_seconds },
            );
        }
        PacketPayload::TaskResult(r) => {
            if r.result_status != ResultStatus::Cancelled {
                ledger.directives_mut().close(&r.task_id);
            }
        }
        PacketPayload::IntegrityAlert(alert) => {
            apply_integrity_alert(ledger, alert);
        }
        PacketPayload::Observation(_) | PacketPayload::VerificationPlan(_) | PacketPayload::Escalation(_) => {}
    }

    if matches!(&packet.payload, PacketPayload::Escalation(e) if e.escalation_trigger == "budget_insufficient") {
        ledger.budget_mut().approve_overrun();
    }

    ledger.record_packet(packet.clone());
    ledger.set_fsm_state(next_state);
}

fn apply_integrity_alert(ledger: &mut EpisodeLedger, alert: &apr_core::payload::IntegrityAlertPayload) {
    use apr_core::AlertSeverity;
    use apr_ledger::SafeMode;

    match alert.severity {
        AlertSeverity::Critical => {
            ledger.tokens_mut().revoke_all();
            ledger.escalate_safe_mode(SafeMode::Halted);
        }
        AlertSeverity::High if alert.alert_type == "budget_threshold" => {
            ledger.budget_mut().approve_overrun();
            ledger.escalate_safe_mode(SafeMode::Restricted);
        }
        AlertSeverity::High => {
            ledger.escalate_safe_mode(SafeMode::Cautious);
        }
        AlertSeverity::Warning | AlertSeverity::Info => {}
    }
}
