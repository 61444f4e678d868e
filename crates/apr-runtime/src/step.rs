// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-step outcomes and the final episode result the runner returns.

use apr_core::{FsmState, Packet};
use apr_ledger::LedgerSnapshot;
use apr_validate::Diagnostics;
use chrono::{DateTime, Utc};

/// What happened when the runner drove one step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// The step that ran.
    pub step_id: String,
    /// When the step began.
    pub started_at: DateTime<Utc>,
    /// When the step finished (success or failure).
    pub finished_at: DateTime<Utc>,
    /// Ids of packets admitted to the ledger during this step.
    pub admitted_packet_ids: Vec<String>,
    /// Diagnostics accumulated across every candidate this step produced.
    pub diagnostics: Diagnostics,
    /// Whether every candidate this step produced was admitted.
    pub succeeded: bool,
}

/// Why an episode stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `current_step` reached one of the template's `exit_steps`.
    ReachedExitStep,
    /// A step's candidate packet failed admission and the failure was
    /// not recoverable.
    StepFailed,
    /// A step exceeded its time budget.
    StepTimedOut,
    /// The step ceiling was reached without exiting.
    MaxStepsExceeded,
    /// The ledger entered `S9_SAFEMODE` (budget exhaustion or veto).
    SafeModeHalt,
}

/// The full result of driving one compiled episode to completion or
/// failure (§4.6).
#[derive(Debug, Clone)]
pub struct EpisodeResult {
    /// The episode's identity.
    pub correlation_id: String,
    /// Per-step outcomes, in execution order.
    pub steps: Vec<StepOutcome>,
    /// Every packet admitted during the episode, in admission order.
    pub emitted_packets: Vec<Packet>,
    /// Final ledger state.
    pub ledger_summary: LedgerSnapshot,
    /// Final FSM state.
    pub final_fsm_state: FsmState,
    /// Why the episode stopped.
    pub stop_reason: StopReason,
}

impl EpisodeResult {
    /// Whether the episode reached an exit step without any step failing.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.stop_reason == StopReason::ReachedExitStep
    }
}
