// SPDX-License-Identifier: MIT OR Apache-2.0
//! The external layer contract: each of the six cognitive layers is a
//! plug-in implementing [`Layer`]; the runner only enforces `can_emit`
//! and `can_receive`, never the reasoning inside.

use apr_core::{Packet, PacketKind, SourceLayer};
use async_trait::async_trait;

/// The fixed `can_emit`/`can_receive` sets for one layer. `SourceLayer`
/// doubles as the layer id; `Integrity` is not a cognitive layer and has
/// no contract entry (it runs inside the runner, §4.9).
#[must_use]
pub fn can_emit(layer: SourceLayer) -> &'static [PacketKind] {
    use PacketKind as K;
    match layer {
        SourceLayer::Aspirational => &[K::IntegrityAlert, K::Escalation],
        SourceLayer::Strategy => &[K::Decision, K::Escalation, K::VerificationPlan],
        SourceLayer::SelfModel => &[K::BeliefUpdate],
        SourceLayer::Executive => &[K::Decision, K::ToolAuthorizationToken, K::Escalation],
        SourceLayer::CognitiveControl => &[K::TaskDirective, K::VerificationPlan],
        SourceLayer::TaskProsecution => &[K::Observation, K::TaskResult],
        SourceLayer::Integrity => &[K::IntegrityAlert],
    }
}

/// What a layer is routed packets of, pre-filter.
#[must_use]
pub fn can_receive(layer: SourceLayer) -> &'static [PacketKind] {
    use PacketKind as K;
    match layer {
        SourceLayer::Aspirational => &[K::Decision, K::Escalation],
        SourceLayer::Strategy => &[K::BeliefUpdate, K::Observation, K::TaskResult, K::Escalation],
        SourceLayer::SelfModel => &[K::Observation, K::TaskResult, K::IntegrityAlert],
        SourceLayer::Executive => &[K::BeliefUpdate, K::VerificationPlan, K::TaskResult, K::Escalation],
        SourceLayer::CognitiveControl => &[K::Decision, K::ToolAuthorizationToken, K::TaskResult],
        SourceLayer::TaskProsecution => &[K::TaskDirective],
        SourceLayer::Integrity => &[
            K::Observation,
            K::BeliefUpdate,
            K::Decision,
            K::VerificationPlan,
            K::ToolAuthorizationToken,
            K::TaskDirective,
            K::TaskResult,
            K::Escalation,
        ],
    }
}

/// Whether `kind` is one `layer` is contractually allowed to emit.
#[must_use]
pub fn may_emit(layer: SourceLayer, kind: PacketKind) -> bool {
    can_emit(layer).contains(&kind)
}

/// Whether `kind` is one `layer` is contractually allowed to receive.
#[must_use]
pub fn may_receive(layer: SourceLayer, kind: PacketKind) -> bool {
    can_receive(layer).contains(&kind)
}

/// Per-step context made available to a layer invocation: identity and
/// budget framing the layer reasons within, but never packet content it
/// wasn't routed.
#[derive(Debug, Clone)]
pub struct StepContext {
    /// Episode identity.
    pub correlation_id: String,
    /// Campaign grouping, if any.
    pub campaign_id: Option<String>,
    /// Name of the step being executed, for tracing/audit.
    pub step_id: String,
}

/// A pluggable cognitive layer: given the packets it was routed, produce
/// candidate packets. Implementations are external to the core; the
/// runner only enforces the emit/receive contract around the call.
#[async_trait]
pub trait Layer: Send + Sync {
    /// Which layer this implementation plays.
    fn layer_id(&self) -> SourceLayer;

    /// Produce candidate packets from the packets routed to this layer.
    async fn invoke(&self, received: &[Packet], context: &StepContext) -> anyhow::Result<Vec<Packet>>;
}

/// Remove any candidate packet whose kind is outside `layer`'s `can_emit`
/// set, logging each drop (§4.7's post-filter, §7's
/// `LayerContractViolation`).
pub fn filter_emitted(layer: SourceLayer, candidates: Vec<Packet>) -> Vec<Packet> {
    candidates
        .into_iter()
        .filter(|p| {
            let allowed = may_emit(layer, p.header.packet_kind);
            if !allowed {
                tracing::warn!(
                    target: "apr.layer",
                    ?layer,
                    kind = ?p.header.packet_kind,
                    packet_id = %p.header.packet_id,
                    "dropped packet outside layer's can_emit contract",
                );
            }
            allowed
        })
        .collect()
}

/// Keep only the packets in `candidates` that `layer` is contractually
/// allowed to receive (§4.7's pre-filter).
pub fn filter_received(layer: SourceLayer, candidates: &[Packet]) -> Vec<Packet> {
    candidates.iter().filter(|p| may_receive(layer, p.header.packet_kind)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executive_may_emit_decision_not_observation() {
        assert!(may_emit(SourceLayer::Executive, PacketKind::Decision));
        assert!(!may_emit(SourceLayer::Executive, PacketKind::Observation));
    }

    #[test]
    fn task_prosecution_may_only_receive_directives() {
        assert!(may_receive(SourceLayer::TaskProsecution, PacketKind::TaskDirective));
        assert!(!may_receive(SourceLayer::TaskProsecution, PacketKind::Decision));
    }

    #[test]
    fn integrity_can_receive_every_kind() {
        for kind in [
            PacketKind::Observation,
            PacketKind::BeliefUpdate,
            PacketKind::Decision,
            PacketKind::VerificationPlan,
            PacketKind::ToolAuthorizationToken,
            PacketKind::TaskDirective,
            PacketKind::TaskResult,
            PacketKind::Escalation,
        ] {
            assert!(may_receive(SourceLayer::Integrity, kind));
        }
    }
}
