// SPDX-License-Identifier: MIT OR Apache-2.0
//! Safe-mode levels the integrity overlay demotes a ledger through.

use apr_core::FsmState;
use serde::{Deserialize, Serialize};

/// Safe-mode level of one episode. Strictly escalates; the integrity
/// overlay is the only writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafeMode {
    /// No integrity concerns recorded.
    Normal,
    /// At least one budget warning or INV warning recorded.
    Cautious,
    /// A budget hard limit or a repeated invariant error recorded.
    Restricted,
    /// Constitutional veto or critical integrity alert; maps to
    /// `FsmState::S9Safemode`.
    Halted,
}

impl SafeMode {
    /// Whether this level maps to `S9_SAFEMODE`.
    #[must_use]
    pub fn is_halted(self) -> bool {
        self == SafeMode::Halted
    }

    /// The FSM state this safe-mode level forces, if any.
    #[must_use]
    pub fn forced_fsm_state(self) -> Option<FsmState> {
        if self.is_halted() { Some(FsmState::S9Safemode) } else { None }
    }

    /// Demote to `other` if it is strictly more severe than `self`.
    /// Safe-mode transitions only ever escalate (`NORMAL -> CAUTIOUS ->
    /// RESTRICTED -> HALTED`); a demotion request to an equal or lower
    /// level is a no-op.
    #[must_use]
    pub fn escalate_to(self, other: SafeMode) -> SafeMode {
        if other > self { other } else { self }
    }
}

impl Default for SafeMode {
    fn default() -> Self {
        SafeMode::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escalation_only_moves_forward() {
        let mut mode = SafeMode::Normal;
        mode = mode.escalate_to(SafeMode::Restricted);
        assert_eq!(mode, SafeMode::Restricted);
        mode = mode.escalate_to(SafeMode::Cautious);
        assert_eq!(mode, SafeMode::Restricted);
    }

    #[test]
    fn halted_maps_to_safemode_fsm_state() {
        assert_eq!(SafeMode::Halted.forced_fsm_state(), Some(FsmState::S9Safemode));
        assert_eq!(SafeMode::Normal.forced_fsm_state(), None);
    }

    #[test]
    fn ordering_matches_severity() {
        assert!(SafeMode::Normal < SafeMode::Cautious);
        assert!(SafeMode::Cautious < SafeMode::Restricted);
        assert!(SafeMode::Restricted < SafeMode::Halted);
    }
}
