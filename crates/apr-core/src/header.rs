// SPDX-License-Identifier: MIT OR Apache-2.0
//! Packet identity and routing header.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::vocab::{PacketKind, SourceLayer};

/// Identity and routing fields shared by every packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PacketHeader {
    /// Opaque, globally unique identifier. Conventionally `pkt_<slug>`.
    pub packet_id: String,
    /// Which of the nine packet kinds this is.
    pub packet_kind: PacketKind,
    /// Absolute creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Layer (or the integrity overlay) that emitted this packet.
    pub source_layer: SourceLayer,
    /// Episode identity; constant across every packet in an episode.
    /// Conventionally `corr_<slug>`.
    pub correlation_id: String,
    /// Optional campaign grouping several episodes. Conventionally
    /// `camp_<slug>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    /// Optional chaining reference to the packet this one responds to or
    /// follows. Must resolve within the episode if present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_packet_id: Option<String>,
}

impl PacketHeader {
    /// Construct a header with no campaign or chaining reference.
    pub fn new(
        packet_id: impl Into<String>,
        packet_kind: PacketKind,
        created_at: DateTime<Utc>,
        source_layer: SourceLayer,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            packet_id: packet_id.into(),
            packet_kind,
            created_at,
            source_layer,
            correlation_id: correlation_id.into(),
            campaign_id: None,
            previous_packet_id: None,
        }
    }

    /// Attach a campaign id (builder-style).
    #[must_use]
    pub fn with_campaign_id(mut self, campaign_id: impl Into<String>) -> Self {
        self.campaign_id = Some(campaign_id.into());
        self
    }

    /// Attach a chaining reference (builder-style).
    #[must_use]
    pub fn with_previous_packet_id(mut self, previous_packet_id: impl Into<String>) -> Self {
        self.previous_packet_id = Some(previous_packet_id.into());
        self
    }
}

/// Validate that an identifier follows the `<prefix>_<slug>` convention,
/// where `<slug>` is one or more ASCII letters, digits, `_`, or `-`.
#[must_use]
pub fn is_valid_identifier(prefix: &str, value: &str) -> bool {
    let Some(rest) = value.strip_prefix(prefix).and_then(|r| r.strip_prefix('_')) else {
        return false;
    };
    !rest.is_empty()
        && rest
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_identifiers_accept_expected_shapes() {
        assert!(is_valid_identifier("pkt", "pkt_abc123"));
        assert!(is_valid_identifier("corr", "corr_test-X"));
        assert!(is_valid_identifier("token", "token_w1"));
    }

    #[test]
    fn invalid_identifiers_are_rejected() {
        assert!(!is_valid_identifier("pkt", "pkt_"));
        assert!(!is_valid_identifier("pkt", "corr_abc"));
        assert!(!is_valid_identifier("pkt", "pkt_has space"));
        assert!(!is_valid_identifier("pkt", ""));
    }

    #[test]
    fn header_builder_attaches_optional_fields() {
        let header = PacketHeader::new(
            "pkt_1",
            PacketKind::Observation,
            Utc::now(),
            SourceLayer::TaskProsecution,
            "corr_1",
        )
        .with_campaign_id("camp_1")
        .with_previous_packet_id("pkt_0");
        assert_eq!(header.campaign_id.as_deref(), Some("camp_1"));
        assert_eq!(header.previous_packet_id.as_deref(), Some("pkt_0"));
    }
}
