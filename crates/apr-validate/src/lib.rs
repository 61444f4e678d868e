// SPDX-License-Identifier: MIT OR Apache-2.0
//! Schema, FSM, and invariant validators for packets and episode ledgers,
//! composed into a single admission pipeline.

pub mod apply;
pub mod diagnostics;
pub mod fsm;
pub mod invariants;
pub mod schema;

pub use apply::{apply, Admission};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use invariants::{check_invariants, FreshnessWindows};
pub use schema::validate_structure;
