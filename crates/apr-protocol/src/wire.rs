// SPDX-License-Identifier: MIT OR Apache-2.0
//! Single-packet JSON encoding and decoding.

use apr_core::Packet;
use serde_json::Value;

use crate::error::ProtocolError;

const KNOWN_KINDS: &[&str] = &[
    "Observation",
    "BeliefUpdate",
    "Decision",
    "VerificationPlan",
    "ToolAuthorizationToken",
    "TaskDirective",
    "TaskResult",
    "Escalation",
    "IntegrityAlert",
];

/// Serialize a packet to its canonical single-line JSON form.
pub fn encode_packet(packet: &Packet) -> Result<String, ProtocolError> {
    serde_json::to_string(packet).map_err(|source| ProtocolError::MalformedPacket { line: 1, source })
}

/// Decode one packet from a JSON string, reporting unknown `packet_kind`
/// values explicitly rather than as a generic parse failure.
pub fn decode_packet(line: usize, text: &str) -> Result<Packet, ProtocolError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|source| ProtocolError::MalformedPacket { line, source })?;

    if let Some(kind) = value.pointer("/payload/packet_kind").and_then(Value::as_str)
        && !KNOWN_KINDS.contains(&kind)
    {
        return Err(ProtocolError::UnknownPacketKind { line, kind: kind.to_string() });
    }

    serde_json::from_value(value).map_err(|source| ProtocolError::MalformedPacket { line, source })
}
