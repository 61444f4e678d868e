// SPDX-License-Identifier: MIT OR Apache-2.0
//! The [`EpisodeTemplate`] data model: a named step graph the compiler
//! binds to a context to produce a [`crate::compiled::CompiledEpisode`].

use apr_core::{PacketKind, QualityTier, SourceLayer, ToolsState};
use serde::{Deserialize, Serialize};

/// One node in a template's step graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateStep {
    /// Unique id within the template.
    pub step_id: String,
    /// Layer expected to produce this step's packet.
    pub owner_layer: SourceLayer,
    /// The kind of packet this step expects to be emitted, if fixed.
    /// `None` means the step accepts whatever the owner layer produces,
    /// subject to the layer's own `can_emit` contract.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet_kind_to_emit: Option<PacketKind>,
    /// Step ids this step may transition to.
    #[serde(default)]
    pub successors: Vec<String>,
}

/// Minimum context a template requires before it may be compiled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateConstraints {
    /// Minimum quality tier the context must supply, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_tier: Option<QualityTier>,
    /// Required tools-state, if the template only makes sense under one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_tools_state: Option<ToolsState>,
    /// A tools-state the context must NOT be in (e.g. template F only
    /// makes sense when tools are not fully healthy).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forbidden_tools_state: Option<ToolsState>,
    /// Whether this template's steps are permitted to emit WRITE/MIXED
    /// task directives.
    #[serde(default)]
    pub write_allowed: bool,
}

/// A named recipe: a directed step graph plus the constraints a
/// compilation context must satisfy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeTemplate {
    /// Template name, e.g. `"template_b_verification"`.
    pub name: String,
    /// Human-readable purpose.
    pub description: String,
    /// Every step in the graph.
    pub steps: Vec<TemplateStep>,
    /// The step an episode starts from.
    pub entry_step: String,
    /// Steps with no outgoing edges; reaching one ends the episode.
    pub exit_steps: Vec<String>,
    /// Constraints the compilation context must satisfy.
    pub constraints: TemplateConstraints,
}

impl EpisodeTemplate {
    /// Look up a step by id.
    #[must_use]
    pub fn step(&self, step_id: &str) -> Option<&TemplateStep> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }

    /// Whether `step_id` has no successors recorded in the graph, i.e. is
    /// one of [`EpisodeTemplate::exit_steps`].
    #[must_use]
    pub fn is_exit_step(&self, step_id: &str) -> bool {
        self.exit_steps.iter().any(|s| s == step_id)
    }

    /// Structural well-formedness: `entry_step` and every successor and
    /// exit step name an existing node.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let known: std::collections::HashSet<&str> = self.steps.iter().map(|s| s.step_id.as_str()).collect();
        if !known.contains(self.entry_step.as_str()) {
            return false;
        }
        if !self.exit_steps.iter().all(|s| known.contains(s.as_str())) {
            return false;
        }
        self.steps.iter().all(|s| s.successors.iter().all(|next| known.contains(next.as_str())))
    }
}
