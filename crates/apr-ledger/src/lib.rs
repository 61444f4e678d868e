// SPDX-License-Identifier: MIT OR Apache-2.0
//! The per-episode mutable ledger: budgets, tokens, open directives,
//! evidence, assumptions/contradictions, and FSM position.
//!
//! An [`EpisodeLedger`] is created the moment the first packet for a
//! `correlation_id` arrives and lives until the episode reaches a
//! terminal state. It exposes mutation primitives only — running the
//! schema/FSM/invariant validators against a candidate packet and then
//! deciding which of these mutations to apply is `apr-validate`'s job,
//! so this crate has no dependency on it.

pub mod assumptions;
pub mod budget;
pub mod directives;
pub mod evidence_index;
pub mod ledger;
pub mod safe_mode;
pub mod tokens;

pub use assumptions::{AssumptionLog, TrackedAssumption, TrackedContradiction};
pub use budget::{BudgetAxis, BudgetCaps, BudgetStatus, BudgetTracker, BudgetUsage};
pub use directives::{DirectiveTable, OpenDirective};
pub use evidence_index::{EvidenceEntry, EvidenceIndex};
pub use ledger::{EpisodeLedger, LedgerSnapshot, RECENT_PACKETS_CAPACITY};
pub use safe_mode::SafeMode;
pub use tokens::TokenTable;
