// SPDX-License-Identifier: MIT OR Apache-2.0
//! Open-directives tracking: a `TaskDirective` stays open from admission
//! until a matching `TaskResult` lands or it times out (INV-011).

use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// A directive admitted but not yet closed by a matching `TaskResult`.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenDirective {
    /// Packet id of the admitted `TaskDirective`.
    pub directive_packet_id: String,
    /// When the directive was admitted.
    pub created_at: DateTime<Utc>,
    /// Seconds after `created_at` at which the directive is orphaned.
    pub timeout_seconds: u64,
}

impl OpenDirective {
    /// Whether `now` is past this directive's deadline.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        let deadline = self.created_at + chrono::Duration::seconds(self.timeout_seconds as i64);
        now > deadline
    }
}

/// Open directives for one episode, keyed by `task_id`.
#[derive(Debug, Clone, Default)]
pub struct DirectiveTable {
    open: HashMap<String, OpenDirective>,
}

impl DirectiveTable {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new directive entry. Overwrites any prior entry under the
    /// same `task_id` — the FSM validator is responsible for rejecting
    /// duplicate `task_id`s before this is called.
    pub fn open(&mut self, task_id: impl Into<String>, entry: OpenDirective) {
        self.open.insert(task_id.into(), entry);
    }

    /// Close a directive by `task_id` on a matching `TaskResult`. Returns
    /// the closed entry, or `None` if no such directive was open.
    pub fn close(&mut self, task_id: &str) -> Option<OpenDirective> {
        self.open.remove(task_id)
    }

    /// Whether `task_id` is currently open.
    #[must_use]
    pub fn is_open(&self, task_id: &str) -> bool {
        self.open.contains_key(task_id)
    }

    /// Whether no directives are currently open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    /// Number of directives currently open.
    #[must_use]
    pub fn len(&self) -> usize {
        self.open.len()
    }

    /// Directives whose deadline has passed as of `now` (testable
    /// property 4, task-closure liveness, and S6's orphan scenario).
    pub fn overdue(&self, now: DateTime<Utc>) -> impl Iterator<Item = (&String, &OpenDirective)> {
        self.open.iter().filter(move |(_, d)| d.is_overdue(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn open_then_close_round_trips() {
        let mut table = DirectiveTable::new();
        table.open(
            "task_v1",
            OpenDirective { directive_packet_id: "pkt_1".into(), created_at: Utc::now(), timeout_seconds: 60 },
        );
        assert!(table.is_open("task_v1"));
        assert!(table.close("task_v1").is_some());
        assert!(!table.is_open("task_v1"));
    }

    #[test]
    fn overdue_detects_elapsed_deadline() {
        let mut table = DirectiveTable::new();
        let created = Utc::now() - Duration::seconds(120);
        table.open(
            "task_v1",
            OpenDirective { directive_packet_id: "pkt_1".into(), created_at: created, timeout_seconds: 60 },
        );
        let overdue: Vec<_> = table.overdue(Utc::now()).collect();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].0, "task_v1");
    }

    #[test]
    fn not_yet_overdue_is_excluded() {
        let mut table = DirectiveTable::new();
        table.open(
            "task_v1",
            OpenDirective { directive_packet_id: "pkt_1".into(), created_at: Utc::now(), timeout_seconds: 60 },
        );
        assert_eq!(table.overdue(Utc::now()).count(), 0);
    }

    #[test]
    fn close_unknown_task_is_noop() {
        let mut table = DirectiveTable::new();
        assert!(table.close("task_missing").is_none());
    }
}
