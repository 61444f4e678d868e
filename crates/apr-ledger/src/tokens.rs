// SPDX-License-Identifier: MIT OR Apache-2.0
//! The active-tokens table: authorization tokens currently live inside a
//! ledger, mutated only by directive admission and integrity revocation.

use std::collections::HashMap;

use apr_core::ToolAuthorizationToken;
use chrono::{DateTime, Utc};

/// Active tokens for one episode, keyed by `token_id`.
#[derive(Debug, Clone, Default)]
pub struct TokenTable {
    tokens: HashMap<String, ToolAuthorizationToken>,
}

impl TokenTable {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly admitted `ToolAuthorizationToken` packet.
    pub fn insert(&mut self, token: ToolAuthorizationToken) {
        self.tokens.insert(token.token_id.clone(), token);
    }

    /// Look up a token by id.
    #[must_use]
    pub fn get(&self, token_id: &str) -> Option<&ToolAuthorizationToken> {
        self.tokens.get(token_id)
    }

    /// Whether `token_id` can currently authorize one more admission
    /// against `tool_id`/`operation_type` (INV-007).
    #[must_use]
    pub fn can_authorize(
        &self,
        token_id: &str,
        now: DateTime<Utc>,
        tool_id: &str,
        operation_type: &str,
    ) -> bool {
        self.tokens
            .get(token_id)
            .is_some_and(|t| t.is_usable(now, tool_id, operation_type))
    }

    /// Atomically increment `usage_count` for `token_id`. Caller must have
    /// already confirmed [`TokenTable::can_authorize`] within the same
    /// validation pass (§5's "token-usage increment is a single
    /// atomic check-and-update" rule, realized here as one exclusive
    /// `&mut` borrow rather than a lock since the ledger is single-owner).
    ///
    /// Returns `false` (no-op) if the token doesn't exist.
    pub fn increment_usage(&mut self, token_id: &str) -> bool {
        match self.tokens.get_mut(token_id) {
            Some(t) => {
                t.usage_count += 1;
                true
            }
            None => false,
        }
    }

    /// Revoke a token by id, setting `revoked = true`. Returns `false` if
    /// the token doesn't exist.
    pub fn revoke(&mut self, token_id: &str) -> bool {
        match self.tokens.get_mut(token_id) {
            Some(t) => {
                t.revoked = true;
                true
            }
            None => false,
        }
    }

    /// Revoke every active token, for a Layer-1 constitutional veto.
    pub fn revoke_all(&mut self) {
        for t in self.tokens.values_mut() {
            t.revoked = true;
        }
    }

    /// Iterate all tokens currently in the table.
    pub fn iter(&self) -> impl Iterator<Item = &ToolAuthorizationToken> {
        self.tokens.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apr_core::{AuthorizedScope, SourceLayer};
    use chrono::Duration;

    fn sample_token() -> ToolAuthorizationToken {
        ToolAuthorizationToken {
            token_id: "token_w1".into(),
            authorized_scope: AuthorizedScope {
                tool_ids: vec!["market_api".into()],
                operation_types: vec!["write".into()],
                resource_constraints: None,
            },
            expiry: Utc::now() + Duration::hours(1),
            max_usage_count: 1,
            issuer_layer: SourceLayer::Executive,
            usage_count: 0,
            revoked: false,
        }
    }

    #[test]
    fn insert_and_authorize_and_increment() {
        let mut table = TokenTable::new();
        table.insert(sample_token());
        assert!(table.can_authorize("token_w1", Utc::now(), "market_api", "write"));
        assert!(table.increment_usage("token_w1"));
        assert_eq!(table.get("token_w1").unwrap().usage_count, 1);
        // Exhausted now.
        assert!(!table.can_authorize("token_w1", Utc::now(), "market_api", "write"));
    }

    #[test]
    fn revoke_blocks_further_authorization() {
        let mut table = TokenTable::new();
        table.insert(sample_token());
        assert!(table.revoke("token_w1"));
        assert!(!table.can_authorize("token_w1", Utc::now(), "market_api", "write"));
    }

    #[test]
    fn revoke_all_clears_every_token() {
        let mut table = TokenTable::new();
        table.insert(sample_token());
        table.revoke_all();
        assert!(table.get("token_w1").unwrap().revoked);
    }

    #[test]
    fn unknown_token_is_never_authorized() {
        let table = TokenTable::new();
        assert!(!table.can_authorize("token_missing", Utc::now(), "market_api", "write"));
    }
}
