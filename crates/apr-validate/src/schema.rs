// SPDX-License-Identifier: MIT OR Apache-2.0
//! Stateless structural validation: the packet alone, no ledger.

use apr_core::header::is_valid_identifier;
use apr_core::payload::PacketPayload;
use apr_core::Packet;

use crate::diagnostics::{Diagnostic, Diagnostics};

/// Validate a packet's structure in isolation: header shape, identifier
/// patterns, MCP-presence-vs-kind consistency, and per-kind payload
/// requirements. Accumulates every problem found rather than stopping at
/// the first (§4.1).
#[must_use]
pub fn validate_structure(packet: &Packet) -> Diagnostics {
    let mut diags = Diagnostics::new();

    check_identifiers(packet, &mut diags);
    check_header_kind_matches_payload(packet, &mut diags);
    check_mcp_presence(packet, &mut diags);
    if let Some(mcp) = &packet.mcp {
        check_mcp_envelope(mcp, &mut diags);
    }
    check_payload(&packet.payload, &mut diags);

    diags
}

fn check_identifiers(packet: &Packet, diags: &mut Diagnostics) {
    let h = &packet.header;
    if !is_valid_identifier("pkt", &h.packet_id) {
        diags.push(Diagnostic::error("SCHEMA", "header.packet_id", "must match pkt_<slug>"));
    }
    if !is_valid_identifier("corr", &h.correlation_id) {
        diags.push(Diagnostic::error("SCHEMA", "header.correlation_id", "must match corr_<slug>"));
    }
    if let Some(campaign_id) = &h.campaign_id
        && !is_valid_identifier("camp", campaign_id)
    {
        diags.push(Diagnostic::error("SCHEMA", "header.campaign_id", "must match camp_<slug>"));
    }
    if let Some(previous) = &h.previous_packet_id
        && !is_valid_identifier("pkt", previous)
    {
        diags.push(Diagnostic::error("SCHEMA", "header.previous_packet_id", "must match pkt_<slug>"));
    }
}

fn check_header_kind_matches_payload(packet: &Packet, diags: &mut Diagnostics) {
    if !packet.header_kind_matches_payload() {
        diags.push(Diagnostic::error(
            "SCHEMA",
            "header.packet_kind",
            "must match the payload's own packet kind",
        ));
    }
}

fn check_mcp_presence(packet: &Packet, diags: &mut Diagnostics) {
    if !packet.mcp_presence_is_consistent() {
        if packet.requires_mcp() {
            diags.push(Diagnostic::error("INV-001", "mcp", "consequential packet requires a complete MCP envelope"));
        } else {
            diags.push(Diagnostic::error("SCHEMA", "mcp", "non-consequential packet must not carry an MCP envelope"));
        }
    }
}

fn check_mcp_envelope(mcp: &apr_core::McpEnvelope, diags: &mut Diagnostics) {
    if !mcp.intent.is_well_formed() {
        diags.push(Diagnostic::error("SCHEMA", "mcp.intent", "summary and scope must be non-empty"));
    }
    if mcp.quality.definition_of_done.checks.is_empty() {
        diags.push(Diagnostic::error(
            "SCHEMA",
            "mcp.quality.definition_of_done.checks",
            "must list at least one concrete check",
        ));
    }
    if !mcp.epistemics.has_valid_confidence() {
        diags.push(Diagnostic::error("SCHEMA", "mcp.epistemics.confidence", "must be within [0, 1]"));
    }
    if !mcp.evidence.is_well_formed() {
        diags.push(Diagnostic::error(
            "SCHEMA",
            "mcp.evidence",
            "exactly one of evidence_refs (non-empty) or evidence_absent_reason must hold",
        ));
    }
}

fn check_payload(payload: &PacketPayload, diags: &mut Diagnostics) {
    match payload {
        PacketPayload::Observation(o) => {
            if o.data.is_null() {
                diags.push(Diagnostic::error("SCHEMA", "payload.data", "observation data must not be null"));
            }
        }
        PacketPayload::BeliefUpdate(b) => {
            if b.belief_changes.is_empty() {
                diags.push(Diagnostic::error(
                    "SCHEMA",
                    "payload.belief_changes",
                    "must contain at least one change",
                ));
            }
            let requires_details = b.update_type == "contradiction_resolved";
            if requires_details != b.contradiction_details.is_some() {
                diags.push(Diagnostic::error(
                    "SCHEMA",
                    "payload.contradiction_details",
                    "required iff update_type = contradiction_resolved",
                ));
            }
        }
        PacketPayload::Decision(_) => {}
        PacketPayload::VerificationPlan(v) => {
            if v.items.is_empty() {
                diags.push(Diagnostic::error("SCHEMA", "payload.items", "must contain at least one item"));
            }
        }
        PacketPayload::ToolAuthorizationToken(t) => {
            if t.authorized_scope.tool_ids.is_empty() {
                diags.push(Diagnostic::error("SCHEMA", "payload.authorized_scope.tool_ids", "must be non-empty"));
            }
            if t.authorized_scope.operation_types.is_empty() {
                diags.push(Diagnostic::error(
                    "SCHEMA",
                    "payload.authorized_scope.operation_types",
                    "must be non-empty",
                ));
            }
            if t.max_usage_count == 0 {
                diags.push(Diagnostic::error("SCHEMA", "payload.max_usage_count", "must be at least 1"));
            }
        }
        PacketPayload::TaskDirective(d) => {
            let requires_token = d.requires_authorization();
            if requires_token != d.authorization_token_id.is_some() {
                diags.push(Diagnostic::error(
                    "SCHEMA",
                    "payload.authorization_token_id",
                    "required iff tool_safety_class is WRITE or MIXED",
                ));
            }
            if requires_token && (d.tool_id.is_none() || d.operation_type.is_none()) {
                diags.push(Diagnostic::error(
                    "SCHEMA",
                    "payload.tool_id",
                    "tool_id and operation_type are required alongside authorization_token_id",
                ));
            }
        }
        PacketPayload::TaskResult(r) => {
            use apr_core::ResultStatus;
            let requires_error = r.result_status == ResultStatus::Failure;
            if requires_error != r.error_details.is_some() {
                diags.push(Diagnostic::error(
                    "SCHEMA",
                    "payload.error_details",
                    "required iff result_status = FAILURE",
                ));
            }
        }
        PacketPayload::Escalation(e) => {
            if !(2..=3).contains(&e.top_options.len()) {
                diags.push(Diagnostic::error("INV-009", "payload.top_options", "must contain 2 or 3 options"));
            }
            if e.evidence_gaps.is_empty() {
                diags.push(Diagnostic::error("INV-009", "payload.evidence_gaps", "must be non-empty"));
            }
            if e.recommended_next_step.trim().is_empty() {
                diags.push(Diagnostic::error("INV-009", "payload.recommended_next_step", "must be present"));
            }
        }
        PacketPayload::IntegrityAlert(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apr_core::payload::{EscalationPayload, ObservationPayload};
    use apr_core::{PacketHeader, PacketKind, SourceLayer};
    use chrono::Utc;
    use serde_json::json;

    fn observation(id: &str) -> Packet {
        Packet::new(
            PacketHeader::new(id, PacketKind::Observation, Utc::now(), SourceLayer::TaskProsecution, "corr_1"),
            None,
            PacketPayload::Observation(ObservationPayload {
                observation_type: "tick".into(),
                data: json!({"x": 1}),
                source_tool: None,
                reliability: None,
            }),
        )
    }

    #[test]
    fn well_formed_observation_has_no_diagnostics() {
        let diags = validate_structure(&observation("pkt_1"));
        assert!(diags.is_empty());
    }

    #[test]
    fn bad_packet_id_is_flagged() {
        let diags = validate_structure(&observation("not-a-pkt"));
        assert!(diags.has_errors());
    }

    #[test]
    fn escalation_without_mcp_fails_inv001() {
        let packet = Packet::new(
            PacketHeader::new("pkt_2", PacketKind::Escalation, Utc::now(), SourceLayer::Executive, "corr_1"),
            None,
            PacketPayload::Escalation(EscalationPayload {
                escalation_trigger: "budget_insufficient".into(),
                top_options: vec![],
                evidence_gaps: vec![],
                recommended_next_step: String::new(),
            }),
        );
        let diags = validate_structure(&packet);
        assert!(diags.errors().any(|d| d.code == "INV-001"));
        assert!(diags.errors().any(|d| d.code == "INV-009"));
    }
}
