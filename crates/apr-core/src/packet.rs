// SPDX-License-Identifier: MIT OR Apache-2.0
//! The unified packet envelope: header, optional MCP compliance data, and
//! kind-specific payload.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::envelope::McpEnvelope;
use crate::header::PacketHeader;
use crate::payload::PacketPayload;

/// A complete wire-format packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Packet {
    /// Identity and routing.
    pub header: PacketHeader,
    /// Mandatory on consequential packet kinds; absent otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp: Option<McpEnvelope>,
    /// Kind-specific body.
    pub payload: PacketPayload,
}

impl Packet {
    /// Construct a packet, deriving `header.packet_kind` from `payload`.
    pub fn new(mut header: PacketHeader, mcp: Option<McpEnvelope>, payload: PacketPayload) -> Self {
        header.packet_kind = payload.kind();
        Self { header, mcp, payload }
    }

    /// Whether this packet's kind requires (and therefore should carry) an
    /// MCP envelope.
    #[must_use]
    pub fn requires_mcp(&self) -> bool {
        self.header.packet_kind.is_consequential()
    }

    /// Whether the MCP-presence requirement for this packet's kind holds:
    /// present when required, absent when not (INV-001's structural half).
    #[must_use]
    pub fn mcp_presence_is_consistent(&self) -> bool {
        self.requires_mcp() == self.mcp.is_some()
    }

    /// Whether `header.packet_kind` matches the payload's own discriminant.
    #[must_use]
    pub fn header_kind_matches_payload(&self) -> bool {
        self.header.packet_kind == self.payload.kind()
    }
}
