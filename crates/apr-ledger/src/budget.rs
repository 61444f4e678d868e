// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-episode budget tracking across the four axes an MCP envelope
//! names: tokens, tool calls, wall-clock seconds, and risk spend.

use serde::{Deserialize, Serialize};

/// Warning fires once any axis crosses this fraction of its cap.
pub const WARNING_THRESHOLD: f64 = 0.8;

/// Initial caps for a single episode, taken from the first consequential
/// packet's `mcp.budgets`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetCaps {
    /// Token cap.
    pub token_budget: u64,
    /// Tool-call cap.
    pub tool_call_budget: u64,
    /// Wall-clock cap, in seconds.
    pub time_budget_seconds: u64,
    /// Risk spend cap (`max_loss` from the active risk envelope).
    pub risk_budget: f64,
}

/// Cumulative usage against [`BudgetCaps`]. Every field only ever grows
/// (INV-005's monotonicity requirement / testable property 6).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetUsage {
    /// Tokens consumed so far.
    pub tokens: u64,
    /// Tool calls made so far.
    pub tool_calls: u64,
    /// Wall-clock seconds elapsed so far.
    pub time_seconds: u64,
    /// Risk spent so far.
    pub risk_spent: f64,
}

/// One axis name, used in diagnostics and integrity alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetAxis {
    /// Token usage.
    Tokens,
    /// Tool-call count.
    ToolCalls,
    /// Wall-clock time.
    TimeSeconds,
    /// Risk spend.
    RiskSpent,
}

/// Result of checking cumulative usage against caps on every axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BudgetStatus {
    /// No axis is at or above the warning threshold.
    WithinLimits,
    /// At least one axis is at or above 80% of its cap, but none over 100%.
    Warning {
        /// Axis with the highest usage fraction.
        axis: BudgetAxis,
        /// That axis's usage fraction.
        usage_pct: f64,
    },
    /// At least one axis has exceeded its cap.
    Exceeded {
        /// Axis that exceeded first (checked in declaration order).
        axis: BudgetAxis,
        /// Amount used.
        used: f64,
        /// Configured cap.
        limit: f64,
    },
}

/// Tracks cumulative usage for one episode against its caps. Owned
/// exclusively by the episode's ledger; not shared across threads, since
/// the runner is single-threaded per episode.
#[derive(Debug, Clone)]
pub struct BudgetTracker {
    caps: BudgetCaps,
    usage: BudgetUsage,
    /// Whether a budget-overrun approval (Escalation or Integrity
    /// override) has been recorded since the last overrun. Reset to
    /// `false` whenever a fresh overrun occurs.
    overrun_approved: bool,
}

impl BudgetTracker {
    /// Create a tracker with zeroed usage.
    #[must_use]
    pub fn new(caps: BudgetCaps) -> Self {
        Self { caps, usage: BudgetUsage::default(), overrun_approved: false }
    }

    /// Current caps.
    #[must_use]
    pub fn caps(&self) -> BudgetCaps {
        self.caps
    }

    /// Current cumulative usage.
    #[must_use]
    pub fn usage(&self) -> BudgetUsage {
        self.usage
    }

    /// Add deltas to cumulative usage. Usage only ever grows.
    pub fn record(&mut self, tokens: u64, tool_calls: u64, time_seconds: u64, risk_spent: f64) {
        self.usage.tokens += tokens;
        self.usage.tool_calls += tool_calls;
        self.usage.time_seconds += time_seconds;
        self.usage.risk_spent += risk_spent;
    }

    /// Whether any axis is currently over its cap.
    #[must_use]
    pub fn is_exceeded(&self) -> bool {
        matches!(self.check(), BudgetStatus::Exceeded { .. })
    }

    /// Mark the current overrun (if any) as approved via an Escalation
    /// with trigger `budget_insufficient` or an Integrity override
    /// (INV-005).
    pub fn approve_overrun(&mut self) {
        self.overrun_approved = true;
    }

    /// Whether a consequential packet may currently be admitted: either
    /// no axis is exceeded, or the exceeded axis has been approved.
    #[must_use]
    pub fn overrun_is_covered(&self) -> bool {
        !self.is_exceeded() || self.overrun_approved
    }

    /// Check usage against caps, returning the worst status.
    #[must_use]
    pub fn check(&self) -> BudgetStatus {
        let axes = [
            (BudgetAxis::Tokens, self.usage.tokens as f64, self.caps.token_budget as f64),
            (BudgetAxis::ToolCalls, self.usage.tool_calls as f64, self.caps.tool_call_budget as f64),
            (BudgetAxis::TimeSeconds, self.usage.time_seconds as f64, self.caps.time_budget_seconds as f64),
            (BudgetAxis::RiskSpent, self.usage.risk_spent, self.caps.risk_budget),
        ];

        for (axis, used, limit) in axes {
            if limit > 0.0 && used > limit {
                return BudgetStatus::Exceeded { axis, used, limit };
            }
        }

        let mut worst: Option<(BudgetAxis, f64)> = None;
        for (axis, used, limit) in axes {
            if limit <= 0.0 {
                continue;
            }
            let pct = used / limit;
            if worst.is_none_or(|(_, best)| pct > best) {
                worst = Some((axis, pct));
            }
        }

        match worst {
            Some((axis, pct)) if pct >= WARNING_THRESHOLD => {
                BudgetStatus::Warning { axis, usage_pct: pct * 100.0 }
            }
            _ => BudgetStatus::WithinLimits,
        }
    }
}
