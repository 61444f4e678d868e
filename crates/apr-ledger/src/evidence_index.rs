// SPDX-License-Identifier: MIT OR Apache-2.0
//! Ordered evidence log, appended to from `Observation`, `TaskResult`, and
//! `BeliefUpdate` packets.

use apr_core::EvidenceRef;
use chrono::{DateTime, Utc};

/// One entry in the evidence index: a reference plus the packet it was
/// cited from.
#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceEntry {
    /// The cited reference.
    pub evidence_ref: EvidenceRef,
    /// Packet id the reference was attached to.
    pub source_packet_id: String,
}

/// Ordered, append-only evidence log for one episode.
#[derive(Debug, Clone, Default)]
pub struct EvidenceIndex {
    entries: Vec<EvidenceEntry>,
}

impl EvidenceIndex {
    /// Empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one evidence reference.
    pub fn append(&mut self, evidence_ref: EvidenceRef, source_packet_id: impl Into<String>) {
        self.entries.push(EvidenceEntry { evidence_ref, source_packet_id: source_packet_id.into() });
    }

    /// All entries in admission order.
    #[must_use]
    pub fn entries(&self) -> &[EvidenceEntry] {
        &self.entries
    }

    /// Whether any entry is of the given ref type and fresh as of `now`
    /// within `max_age_seconds` (INV-004).
    #[must_use]
    pub fn has_fresh_ref_of_type(
        &self,
        ref_type: apr_core::EvidenceRefType,
        now: DateTime<Utc>,
        max_age_seconds: i64,
    ) -> bool {
        self.entries
            .iter()
            .any(|e| e.evidence_ref.ref_type == ref_type && e.evidence_ref.is_fresh(now, max_age_seconds))
    }
}
