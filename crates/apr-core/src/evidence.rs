// SPDX-License-Identifier: MIT OR Apache-2.0
//! Evidence references cited by beliefs, decisions, and results.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::vocab::EvidenceRefType;

/// A pointer to the thing that grounds a claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EvidenceRef {
    /// What kind of thing this evidence points at.
    pub ref_type: EvidenceRefType,
    /// Opaque identifier of the referenced item (tool call id, observation
    /// id, memory key, ...).
    pub ref_id: String,
    /// When the underlying fact was established.
    pub timestamp: DateTime<Utc>,
    /// Subjective reliability of the source, in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reliability_score: Option<f64>,
}

impl EvidenceRef {
    /// Construct an evidence reference with no reliability score.
    pub fn new(ref_type: EvidenceRefType, ref_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            ref_type,
            ref_id: ref_id.into(),
            timestamp,
            reliability_score: None,
        }
    }

    /// Whether this reference is no older than `max_age_seconds` as of `now`.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age_seconds: i64) -> bool {
        (now - self.timestamp).num_seconds() <= max_age_seconds
    }
}
