// SPDX-License-Identifier: MIT OR Apache-2.0
//! Budget-threshold alerts, token revocation, and safe-mode escalation
//! (§4.9). A ledger is owned exclusively by its episode's runner (§5),
//! so the authorities below are applied synchronously at step
//! boundaries rather than through a separate concurrent actor; the
//! observer at the bottom of this module is the only piece that
//! genuinely spans episodes, and it only tallies, it never mutates.

use std::sync::atomic::{AtomicU64, Ordering};

use apr_core::payload::{IntegrityAlertPayload, PacketPayload};
use apr_core::{AlertSeverity, Packet, PacketHeader, PacketKind, SourceLayer};
use apr_layer::{BusMessage, BusSubscriber};
use apr_ledger::{BudgetAxis, BudgetStatus, EpisodeLedger, SafeMode};
use chrono::{DateTime, Utc};

/// Check `ledger`'s cumulative budget usage and, on a warning or
/// overrun, escalate its safe-mode level. Returns the `IntegrityAlert`
/// packet the runner should publish to the northbound bus, if any
/// (§4.6 step f, §4.9's first authority).
pub fn evaluate_budget(ledger: &mut EpisodeLedger, step_id: &str) -> Option<Packet> {
    let (severity, message) = match ledger.budget().check() {
        BudgetStatus::WithinLimits => return None,
        BudgetStatus::Warning { axis, usage_pct } => {
            ledger.escalate_safe_mode(SafeMode::Cautious);
            (AlertSeverity::Warning, format!("{} at {usage_pct:.1}% of cap", axis_name(axis)))
        }
        BudgetStatus::Exceeded { axis, used, limit } => {
            ledger.escalate_safe_mode(SafeMode::Restricted);
            (AlertSeverity::High, format!("{} exceeded: {used} over cap {limit}", axis_name(axis)))
        }
    };

    let header = PacketHeader::new(
        format!("pkt_integrity_{step_id}_{}", ledger.recent_packets().count()),
        PacketKind::IntegrityAlert,
        Utc::now(),
        SourceLayer::Integrity,
        ledger.correlation_id().to_string(),
    );
    Some(Packet::new(
        header,
        None,
        PacketPayload::IntegrityAlert(IntegrityAlertPayload {
            alert_type: "budget_threshold".into(),
            severity,
            message,
        }),
    ))
}

/// Orphan any `TaskDirective` whose deadline has passed as of `now` and
/// emit a timeout `IntegrityAlert` for each, paired with its `task_id`
/// (§4.2 "Task closure", §8 testable property 4, scenario S6). Closes
/// the directive in the same pass so a given orphan is only ever
/// reported once.
pub fn evaluate_directive_timeouts(ledger: &mut EpisodeLedger, now: DateTime<Utc>) -> Vec<(String, Packet)> {
    let orphaned: Vec<String> = ledger.directives().overdue(now).map(|(task_id, _)| task_id.clone()).collect();

    orphaned
        .into_iter()
        .map(|task_id| {
            ledger.directives_mut().close(&task_id);
            let header = PacketHeader::new(
                format!("pkt_directive_timeout_{task_id}"),
                PacketKind::IntegrityAlert,
                now,
                SourceLayer::Integrity,
                ledger.correlation_id().to_string(),
            );
            let packet = Packet::new(
                header,
                None,
                PacketPayload::IntegrityAlert(IntegrityAlertPayload {
                    alert_type: "directive_timeout".into(),
                    severity: AlertSeverity::High,
                    message: format!("task '{task_id}' orphaned: no TaskResult before its deadline"),
                }),
            );
            (task_id, packet)
        })
        .collect()
}

fn axis_name(axis: BudgetAxis) -> &'static str {
    match axis {
        BudgetAxis::Tokens => "token budget",
        BudgetAxis::ToolCalls => "tool-call budget",
        BudgetAxis::TimeSeconds => "time budget",
        BudgetAxis::RiskSpent => "risk budget",
    }
}

/// A Layer-1 constitutional veto: revoke every active token and halt the
/// ledger in `S9_SAFEMODE` (§4.9's fourth authority).
pub fn constitutional_veto(ledger: &mut EpisodeLedger) {
    ledger.tokens_mut().revoke_all();
    ledger.escalate_safe_mode(SafeMode::Halted);
    tracing::warn!(target: "apr.integrity", correlation_id = %ledger.correlation_id(), "constitutional veto: all tokens revoked, ledger halted");
}

/// Revoke a single token by id (§4.9's second authority). `reason` is
/// recorded only in the tracing span; the ledger itself tracks no
/// revocation reasons.
pub fn revoke_token(ledger: &mut EpisodeLedger, token_id: &str, reason: &str) -> bool {
    let revoked = ledger.tokens_mut().revoke(token_id);
    if revoked {
        tracing::info!(target: "apr.integrity", token_id, reason, "token revoked");
    } else {
        tracing::warn!(target: "apr.integrity", token_id, "revoke requested for unknown token");
    }
    revoked
}

/// A northbound bus subscriber that tallies `IntegrityAlert` packets
/// across every in-flight episode, for cross-episode observability.
/// It never mutates a ledger — each ledger's safe-mode transitions are
/// decided by its own runner via [`evaluate_budget`].
#[derive(Default)]
pub struct IntegrityObserver {
    warning_count: AtomicU64,
    high_count: AtomicU64,
    critical_count: AtomicU64,
}

impl IntegrityObserver {
    /// A fresh observer with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total `WARNING`-severity alerts observed.
    #[must_use]
    pub fn warning_count(&self) -> u64 {
        self.warning_count.load(Ordering::Relaxed)
    }

    /// Total `HIGH`-severity alerts observed.
    #[must_use]
    pub fn high_count(&self) -> u64 {
        self.high_count.load(Ordering::Relaxed)
    }

    /// Total `CRITICAL`-severity alerts observed.
    #[must_use]
    pub fn critical_count(&self) -> u64 {
        self.critical_count.load(Ordering::Relaxed)
    }
}

impl BusSubscriber for IntegrityObserver {
    fn layer_id(&self) -> SourceLayer {
        SourceLayer::Integrity
    }

    fn deliver(&self, message: &BusMessage) -> anyhow::Result<()> {
        if let PacketPayload::IntegrityAlert(alert) = &message.packet.payload {
            match alert.severity {
                AlertSeverity::Info => {}
                AlertSeverity::Warning => {
                    self.warning_count.fetch_add(1, Ordering::Relaxed);
                }
                AlertSeverity::High => {
                    self.high_count.fetch_add(1, Ordering::Relaxed);
                }
                AlertSeverity::Critical => {
                    self.critical_count.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apr_ledger::BudgetCaps;

    fn caps() -> BudgetCaps {
        BudgetCaps { token_budget: 1000, tool_call_budget: 10, time_budget_seconds: 600, risk_budget: 100.0 }
    }

    #[test]
    fn within_limits_raises_no_alert_and_no_escalation() {
        let mut ledger = EpisodeLedger::create("corr_1", caps());
        let alert = evaluate_budget(&mut ledger, "step_a");
        assert!(alert.is_none());
        assert_eq!(ledger.safe_mode(), SafeMode::Normal);
    }

    #[test]
    fn warning_threshold_escalates_to_cautious() {
        let mut ledger = EpisodeLedger::create("corr_1", caps());
        ledger.budget_mut().record(850, 0, 0, 0.0);
        let alert = evaluate_budget(&mut ledger, "step_a").expect("warning alert");
        assert_eq!(ledger.safe_mode(), SafeMode::Cautious);
        match &alert.payload {
            PacketPayload::IntegrityAlert(a) => assert_eq!(a.severity, AlertSeverity::Warning),
            _ => panic!("expected IntegrityAlert payload"),
        }
    }

    #[test]
    fn exceeded_budget_escalates_to_restricted() {
        let mut ledger = EpisodeLedger::create("corr_1", caps());
        ledger.budget_mut().record(1001, 0, 0, 0.0);
        let alert = evaluate_budget(&mut ledger, "step_a").expect("high alert");
        assert_eq!(ledger.safe_mode(), SafeMode::Restricted);
        match &alert.payload {
            PacketPayload::IntegrityAlert(a) => assert_eq!(a.severity, AlertSeverity::High),
            _ => panic!("expected IntegrityAlert payload"),
        }
    }

    #[test]
    fn overdue_directive_emits_timeout_alert_and_closes_once() {
        use apr_ledger::OpenDirective;
        use chrono::Duration;

        let mut ledger = EpisodeLedger::create("corr_1", caps());
        ledger.directives_mut().open(
            "task_v1",
            OpenDirective { directive_packet_id: "pkt_directive".into(), created_at: Utc::now() - Duration::seconds(120), timeout_seconds: 60 },
        );

        let alerts = evaluate_directive_timeouts(&mut ledger, Utc::now());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].0, "task_v1");
        match &alerts[0].1.payload {
            PacketPayload::IntegrityAlert(a) => {
                assert_eq!(a.alert_type, "directive_timeout");
                assert_eq!(a.severity, AlertSeverity::High);
            }
            _ => panic!("expected IntegrityAlert payload"),
        }
        assert!(!ledger.directives().is_open("task_v1"));

        let second_pass = evaluate_directive_timeouts(&mut ledger, Utc::now());
        assert!(second_pass.is_empty());
    }

    #[test]
    fn veto_revokes_tokens_and_halts() {
        use apr_core::{AuthorizedScope, ToolAuthorizationToken};
        use chrono::Duration;

        let mut ledger = EpisodeLedger::create("corr_1", caps());
        ledger.tokens_mut().insert(ToolAuthorizationToken {
            token_id: "token_w1".into(),
            authorized_scope: AuthorizedScope { tool_ids: vec!["market_api".into()], operation_types: vec!["write".into()], resource_constraints: None },
            expiry: Utc::now() + Duration::hours(1),
            max_usage_count: 1,
            issuer_layer: SourceLayer::Executive,
            usage_count: 0,
            revoked: false,
        });
        constitutional_veto(&mut ledger);
        assert!(ledger.tokens().get("token_w1").unwrap().revoked);
        assert_eq!(ledger.current_fsm_state(), apr_core::FsmState::S9Safemode);
    }

    #[test]
    fn observer_tallies_by_severity() {
        let observer = IntegrityObserver::new();
        let alert = |severity: AlertSeverity| BusMessage {
            packet: Packet::new(
                PacketHeader::new("pkt_1", PacketKind::IntegrityAlert, Utc::now(), SourceLayer::Integrity, "corr_1"),
                None,
                PacketPayload::IntegrityAlert(IntegrityAlertPayload {
                    alert_type: "t".into(),
                    severity,
                    message: "m".into(),
                }),
            ),
            target_layer: None,
        };
        observer.deliver(&alert(AlertSeverity::Warning)).unwrap();
        observer.deliver(&alert(AlertSeverity::High)).unwrap();
        observer.deliver(&alert(AlertSeverity::Critical)).unwrap();
        assert_eq!(observer.warning_count(), 1);
        assert_eq!(observer.high_count(), 1);
        assert_eq!(observer.critical_count(), 1);
    }
}
