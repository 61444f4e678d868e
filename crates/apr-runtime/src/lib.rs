// SPDX-License-Identifier: MIT OR Apache-2.0
//! Episode runner, layer registry, and integrity overlay: the
//! orchestration layer that drives a compiled episode template against
//! registered cognitive layers (§4.6-§4.9).

pub mod error;
pub mod integrity;
pub mod registry;
pub mod runner;
pub mod step;

pub use error::RuntimeError;
pub use integrity::IntegrityObserver;
pub use registry::LayerRegistry;
pub use runner::run_episode;
pub use step::{EpisodeResult, StepOutcome, StopReason};

use std::sync::Arc;

use apr_layer::Bus;
use apr_ledger::BudgetCaps;
use apr_template::CompiledEpisode;
use apr_validate::FreshnessWindows;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Ceiling on steps per episode applied when a caller doesn't override
/// it; guards against a misconfigured template graph looping forever.
pub const DEFAULT_MAX_STEPS: u32 = 500;

/// Owns the layer registry and the two shared buses every in-flight
/// episode publishes to; spawns one asynchronous task per episode,
/// matching §4.6's "many episodes run independently in parallel, each
/// owning its ledger" scheduling model.
pub struct Runtime {
    registry: Arc<LayerRegistry>,
    northbound: Arc<Mutex<Bus>>,
    southbound: Arc<Mutex<Bus>>,
    max_steps: u32,
    freshness_windows: FreshnessWindows,
}

/// A handle to a spawned episode: its run id and a join handle resolving
/// to the final [`EpisodeResult`] or a [`RuntimeError`].
pub struct EpisodeHandle {
    /// Unique identifier for this run, independent of the episode's own
    /// `correlation_id`.
    pub run_id: Uuid,
    /// Resolves once the episode reaches an exit step or stops early.
    pub result: tokio::task::JoinHandle<Result<EpisodeResult, RuntimeError>>,
}

impl Runtime {
    /// Build a runtime around an already-populated layer registry.
    #[must_use]
    pub fn new(registry: LayerRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            northbound: Arc::new(Mutex::new(Bus::new("northbound"))),
            southbound: Arc::new(Mutex::new(Bus::new("southbound"))),
            max_steps: DEFAULT_MAX_STEPS,
            freshness_windows: FreshnessWindows::default(),
        }
    }

    /// Override the step ceiling (builder-style).
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Override the freshness windows used by INV-004 (builder-style).
    #[must_use]
    pub fn with_freshness_windows(mut self, windows: FreshnessWindows) -> Self {
        self.freshness_windows = windows;
        self
    }

    /// Register an observer on the northbound bus (e.g. an
    /// [`IntegrityObserver`]).
    pub async fn subscribe_northbound(&self, subscriber: Arc<dyn apr_layer::BusSubscriber>) {
        self.northbound.lock().await.subscribe(subscriber);
    }

    /// Register an observer on the southbound bus.
    pub async fn subscribe_southbound(&self, subscriber: Arc<dyn apr_layer::BusSubscriber>) {
        self.southbound.lock().await.subscribe(subscriber);
    }

    /// Spawn `compiled` as an independent task against this runtime's
    /// registry and buses, returning immediately with a handle.
    pub fn spawn_episode(&self, compiled: CompiledEpisode, budget_caps: BudgetCaps) -> EpisodeHandle {
        let registry = Arc::clone(&self.registry);
        let northbound = Arc::clone(&self.northbound);
        let southbound = Arc::clone(&self.southbound);
        let max_steps = self.max_steps;
        let windows = self.freshness_windows;

        let run_id = Uuid::new_v4();
        let result = tokio::spawn(async move {
            run_episode(&registry, &northbound, &southbound, &compiled, budget_caps, max_steps, windows).await
        });

        EpisodeHandle { run_id, result }
    }

    /// Run `compiled` to completion on the current task, without
    /// spawning. Convenient for tests and the CLI's single-episode
    /// `compile` subcommand.
    pub async fn run_to_completion(&self, compiled: &CompiledEpisode, budget_caps: BudgetCaps) -> Result<EpisodeResult, RuntimeError> {
        run_episode(&self.registry, &self.northbound, &self.southbound, compiled, budget_caps, self.max_steps, self.freshness_windows).await
    }
}
