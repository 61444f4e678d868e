// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tool authorization tokens: scoped, expiring grants for WRITE/MIXED tool
//! use.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::vocab::SourceLayer;

/// The scope of tools and operations a token authorizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AuthorizedScope {
    /// Tool identifiers this token covers; non-empty.
    pub tool_ids: Vec<String>,
    /// Operation types this token covers (e.g. `"write"`, `"delete"`);
    /// non-empty.
    pub operation_types: Vec<String>,
    /// Additional, deployment-defined constraints (monetary caps, path
    /// prefixes, ...). Left semi-opaque; core containment checks only
    /// inspect `tool_ids`/`operation_types`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_constraints: Option<Value>,
}

impl AuthorizedScope {
    /// Whether this scope covers the given tool id and operation type.
    #[must_use]
    pub fn covers(&self, tool_id: &str, operation_type: &str) -> bool {
        self.tool_ids.iter().any(|t| t == tool_id)
            && self.operation_types.iter().any(|o| o == operation_type)
    }
}

/// A scoped, expiring grant to perform WRITE/MIXED tool calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ToolAuthorizationToken {
    /// Opaque identifier. Conventionally `token_<slug>`.
    pub token_id: String,
    /// What this token authorizes.
    pub authorized_scope: AuthorizedScope,
    /// When this token stops being valid.
    pub expiry: DateTime<Utc>,
    /// Maximum number of directive admissions this token may authorize.
    pub max_usage_count: u32,
    /// Layer that issued this token.
    pub issuer_layer: SourceLayer,
    /// Number of directive admissions this token has already authorized.
    #[serde(default)]
    pub usage_count: u32,
    /// Whether the integrity overlay has revoked this token early.
    #[serde(default)]
    pub revoked: bool,
}

impl ToolAuthorizationToken {
    /// Whether this token can currently authorize one more directive
    /// admission against `tool_id`/`operation_type`, as of `now`.
    #[must_use]
    pub fn is_usable(&self, now: DateTime<Utc>, tool_id: &str, operation_type: &str) -> bool {
        !self.revoked
            && now < self.expiry
            && self.usage_count < self.max_usage_count
            && self.authorized_scope.covers(tool_id, operation_type)
    }
}
