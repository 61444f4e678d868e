// SPDX-License-Identifier: MIT OR Apache-2.0
//! The output of compilation: a step graph bound to a concrete episode.

use std::collections::BTreeMap;

use apr_core::McpEnvelope;
use serde::{Deserialize, Serialize};

use crate::model::TemplateStep;

/// A template bound to a `correlation_id`, ready for the runner to walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledEpisode {
    /// Name of the template this episode was compiled from.
    pub template_name: String,
    /// Freshly allocated identity for this episode.
    pub correlation_id: String,
    /// The step graph, copied from the template.
    pub steps: Vec<TemplateStep>,
    /// The step an episode starts from.
    pub entry_step: String,
    /// Steps with no outgoing edges.
    pub exit_steps: Vec<String>,
    /// Each step's bound MCP envelope, keyed by `step_id`.
    pub mcp_bindings: BTreeMap<String, McpEnvelope>,
}

impl CompiledEpisode {
    /// The envelope bound to `step_id`, if any.
    #[must_use]
    pub fn mcp_for(&self, step_id: &str) -> Option<&McpEnvelope> {
        self.mcp_bindings.get(step_id)
    }

    /// Whether `step_id` ends the episode.
    #[must_use]
    pub fn is_exit_step(&self, step_id: &str) -> bool {
        self.exit_steps.iter().any(|s| s == step_id)
    }
}
