// SPDX-License-Identifier: MIT OR Apache-2.0
//! Northbound (telemetry) and southbound (directive) packet buses.
//!
//! Broadcast when a message's `target_layer` is absent, point-to-point
//! otherwise. Each bus keeps a bounded recent-message log for debugging
//! and publish/drop counters for observability (§4.8).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use apr_core::{Packet, SourceLayer};

const DEFAULT_LOG_CAPACITY: usize = 256;

/// A bus message: the packet plus an optional point-to-point destination.
#[derive(Debug, Clone)]
pub struct BusMessage {
    /// The admitted packet being distributed.
    pub packet: Packet,
    /// `None` means broadcast to every subscriber.
    pub target_layer: Option<SourceLayer>,
}

/// One subscriber's view of a bus: which layer it is, and whether a
/// broadcast or a point-to-point message addressed to it should be
/// delivered.
pub trait BusSubscriber: Send + Sync {
    /// This subscriber's layer identity.
    fn layer_id(&self) -> SourceLayer;

    /// Deliver one message. Errors are logged by the bus, never
    /// propagated to the publisher (§5's shared-resource policy).
    fn deliver(&self, message: &BusMessage) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
struct BusStatsInner {
    total_published: AtomicU64,
    dropped: AtomicU64,
}

/// Snapshot of a bus's publish/drop counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusStats {
    /// Total messages handed to [`Bus::publish`].
    pub total_published: u64,
    /// Deliveries that failed or had no matching subscriber.
    pub dropped: u64,
}

/// A directional packet bus. `apr-runtime` instantiates one for
/// northbound telemetry and one for southbound directives.
pub struct Bus {
    name: &'static str,
    subscribers: Vec<Arc<dyn BusSubscriber>>,
    recent: VecDeque<BusMessage>,
    log_capacity: usize,
    stats: BusStatsInner,
}

impl Bus {
    /// Create an empty bus with the default recent-message log capacity.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self::with_log_capacity(name, DEFAULT_LOG_CAPACITY)
    }

    /// Create an empty bus with an explicit recent-message log capacity.
    #[must_use]
    pub fn with_log_capacity(name: &'static str, log_capacity: usize) -> Self {
        Self { name, subscribers: Vec::new(), recent: VecDeque::new(), log_capacity, stats: BusStatsInner::default() }
    }

    /// Register a subscriber.
    pub fn subscribe(&mut self, subscriber: Arc<dyn BusSubscriber>) {
        self.subscribers.push(subscriber);
    }

    /// Publish a message: broadcast to every subscriber when
    /// `target_layer` is absent, or deliver to the matching subscriber(s)
    /// otherwise. Delivery errors are logged, not propagated.
    pub fn publish(&mut self, message: BusMessage) {
        self.stats.total_published.fetch_add(1, Ordering::Relaxed);

        let mut delivered = false;
        for subscriber in &self.subscribers {
            let addressed = match message.target_layer {
                Some(target) => subscriber.layer_id() == target,
                None => true,
            };
            if !addressed {
                continue;
            }
            delivered = true;
            if let Err(error) = subscriber.deliver(&message) {
                tracing::warn!(target: "apr.bus", bus = self.name, %error, "subscriber delivery failed");
            }
        }
        if !delivered {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(target: "apr.bus", bus = self.name, "message published with no matching subscriber");
        }

        if self.recent.len() >= self.log_capacity {
            self.recent.pop_front();
        }
        self.recent.push_back(message);
    }

    /// The most recently published messages, oldest first.
    #[must_use]
    pub fn recent(&self) -> impl DoubleEndedIterator<Item = &BusMessage> {
        self.recent.iter()
    }

    /// Current publish/drop counters.
    #[must_use]
    pub fn stats(&self) -> BusStats {
        BusStats {
            total_published: self.stats.total_published.load(Ordering::Relaxed),
            dropped: self.stats.dropped.load(Ordering::Relaxed),
        }
    }
}
