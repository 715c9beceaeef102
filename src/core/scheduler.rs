//! The refresh scheduler: the daemon's tick loop.
//!
//! Wraps [`crate::core::probe::probe_or_unavailable`] with bounded
//! concurrency (so a slow provider can't starve the others) and a
//! single-flight guard (so an on-demand trigger never overlaps a tick
//! already in flight), and appends every reading to the
//! [`crate::storage::usage_store::UsageStore`] alongside any detected
//! resets and threshold crossings. Modeled on the teacher's
//! `core::pipeline::fetch_providers_with_timeout` fan-out, but driven by a
//! persistent interval rather than a one-shot CLI invocation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};
use tokio::time::MissedTickBehavior;

use crate::core::analytics::detect_resets;
use crate::core::notification::{check_threshold_crossing, DEFAULT_NOTIFY_THRESHOLD, LoggingNotificationSink, NotificationSink};
use crate::core::probe::{probe_or_unavailable, DEFAULT_PROBE_DEADLINE};
use crate::core::provider::Provider;
use crate::core::usage_types::{ConfigType, ProviderConfig, ProviderUsage, RawSnapshot};
use crate::error::Result;
use crate::storage::usage_store::UsageStore;

/// Upper bound on providers probed at once during a refresh cycle.
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// The scheduler's current phase, exposed for `/api/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Refreshing,
    Stopping,
}

/// Aggregate counters from completed refresh cycles, reset only by process
/// restart.
#[derive(Debug, Default, Clone, Copy)]
pub struct SchedulerTelemetry {
    pub cycles_completed: u64,
    pub providers_probed: u64,
    pub providers_failed: u64,
    pub resets_detected: u64,
}

/// Drives periodic and on-demand refresh cycles over a fixed provider
/// roster.
pub struct RefreshScheduler {
    store: Arc<UsageStore>,
    providers: Vec<ProviderConfig>,
    interval: Duration,
    max_concurrency: usize,
    state: Mutex<SchedulerState>,
    single_flight: Semaphore,
    telemetry: Mutex<SchedulerTelemetry>,
    sink: Arc<dyn NotificationSink>,
    notify_threshold: f64,
    stopping: AtomicBool,
}

impl RefreshScheduler {
    /// Build a scheduler over `providers` (from discovery or persisted
    /// config), ticking every `interval`.
    #[must_use]
    pub fn new(store: Arc<UsageStore>, providers: Vec<ProviderConfig>, interval: Duration) -> Self {
        Self {
            store,
            providers,
            interval,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            state: Mutex::new(SchedulerState::Idle),
            single_flight: Semaphore::new(1),
            telemetry: Mutex::new(SchedulerTelemetry::default()),
            sink: Arc::new(LoggingNotificationSink),
            notify_threshold: DEFAULT_NOTIFY_THRESHOLD,
            stopping: AtomicBool::new(false),
        }
    }

    /// Override the default notification sink (for tests, or a richer
    /// delivery mechanism).
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Whether this provider roster warrants a full discovery-backed
    /// startup pass (there's history already) or should start conservatively
    /// with just the system providers until the first successful cycle.
    #[must_use]
    pub fn startup_providers(&self) -> Vec<Provider> {
        let history_empty = self.store.is_history_empty().unwrap_or(true);
        if history_empty {
            Provider::system_providers()
        } else {
            self.active_providers()
        }
    }

    fn active_providers(&self) -> Vec<Provider> {
        self.providers
            .iter()
            .filter(|c| c.is_active())
            .filter_map(|c| Provider::from_cli_name(&c.provider_id).ok())
            .collect()
    }

    /// Current phase.
    pub async fn state(&self) -> SchedulerState {
        *self.state.lock().await
    }

    /// A snapshot of accumulated telemetry.
    pub async fn telemetry(&self) -> SchedulerTelemetry {
        *self.telemetry.lock().await
    }

    /// Run one refresh cycle immediately, independent of the tick interval.
    /// Single-flight: if a cycle is already running, this waits for it to
    /// finish rather than running a second one concurrently.
    ///
    /// # Errors
    /// Returns an error only if the store write fails; individual provider
    /// probe failures are captured as `unavailable` readings, not errors.
    pub async fn trigger_refresh(&self) -> Result<()> {
        let _permit = self.single_flight.acquire().await.expect("semaphore not closed");
        self.run_cycle(&self.active_providers()).await
    }

    /// Run the tick loop until [`Self::stop`] is called. Intended to be
    /// spawned as a background task.
    pub async fn run(&self) {
        {
            let mut state = self.state.lock().await;
            *state = SchedulerState::Idle;
        }

        let startup = self.startup_providers();
        if let Err(e) = self.cycle_with_permit(&startup).await {
            tracing::warn!(error = %e, "startup refresh cycle failed to persist");
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await; // consume the immediate first tick; startup already ran one cycle

        loop {
            ticker.tick().await;
            if self.stopping.load(Ordering::Acquire) {
                break;
            }
            if let Err(e) = self.cycle_with_permit(&self.active_providers()).await {
                tracing::warn!(error = %e, "refresh cycle failed to persist");
            }
        }

        let mut state = self.state.lock().await;
        *state = SchedulerState::Stopping;
    }

    async fn cycle_with_permit(&self, providers: &[Provider]) -> Result<()> {
        let _permit = self.single_flight.acquire().await.expect("semaphore not closed");
        self.run_cycle(providers).await
    }

    /// Request cooperative shutdown. The in-flight cycle (if any) still
    /// completes; no new cycle starts afterward.
    pub fn stop(&self) {
        self.stopping.store(true, Ordering::Release);
    }

    /// Auto-register any child reading (`provider_id` of the form
    /// `parent.slug`, per §4.2) the config store doesn't already know
    /// about, inheriting `auth_source` from the child reading itself (the
    /// probe sets it to the same source as its parent) and a config type
    /// derived from `is_quota_based`. Per §4.6 step 5.
    fn register_unknown_children(&self, readings: &[ProviderUsage]) -> Result<()> {
        let known: std::collections::HashSet<String> = self
            .store
            .all_providers()?
            .into_iter()
            .map(|c| c.provider_id)
            .collect();
        let mut registered_this_cycle = std::collections::HashSet::new();
        for usage in readings {
            if usage.provider_id.split_once('.').is_none() {
                continue;
            }
            if known.contains(&usage.provider_id) || !registered_this_cycle.insert(usage.provider_id.clone()) {
                continue;
            }
            let mut child_config = ProviderConfig::empty(usage.provider_id.clone());
            child_config.config_type = if usage.is_quota_based {
                ConfigType::QuotaBased
            } else {
                ConfigType::PayAsYouGo
            };
            child_config.auth_source = usage.auth_source.clone();
            self.store.upsert_provider(&child_config, &usage.provider_name)?;
        }
        Ok(())
    }

    async fn run_cycle(&self, providers: &[Provider]) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            *state = SchedulerState::Refreshing;
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency.max(1)));
        let mut handles = Vec::with_capacity(providers.len());
        for &provider in providers {
            let semaphore = Arc::clone(&semaphore);
            let auth_source = self
                .providers
                .iter()
                .find(|c| c.provider_id == provider.cli_name())
                .and_then(|c| c.auth_source.clone());
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                probe_or_unavailable(provider, DEFAULT_PROBE_DEADLINE, auth_source).await
            }));
        }

        let mut readings: Vec<ProviderUsage> = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(usages) => readings.extend(usages),
                Err(e) => tracing::error!(error = %e, "probe task panicked"),
            }
        }

        self.register_unknown_children(&readings)?;

        let mut failed = 0u64;
        let mut persistable = Vec::with_capacity(readings.len());
        for usage in &readings {
            if let Err(violation) = usage.validate() {
                let converted = usage.clone().into_contract_violation(violation);
                tracing::warn!(
                    provider = %converted.provider_id,
                    description = ?converted.description,
                    "dropping reading that violates the detail contract",
                );
                failed += 1;
                continue;
            }
            if !usage.is_available {
                failed += 1;
            }
            if usage.is_degenerate() {
                continue;
            }
            if let Some(raw_json) = &usage.raw_json {
                self.store.store_raw_snapshot(&RawSnapshot {
                    provider_id: usage.provider_id.clone(),
                    raw_json: raw_json.clone(),
                    http_status: usage.http_status,
                    fetched_at: usage.fetched_at,
                })?;
            }
            persistable.push(usage.clone());
        }

        let previous: std::collections::HashMap<String, crate::core::usage_types::ProviderUsage> = self
            .store
            .latest_per_provider(true)
            .unwrap_or_default()
            .into_iter()
            .map(|row| (row.provider_id, row.usage))
            .collect();

        for usage in &persistable {
            if let Some(crossing) = check_threshold_crossing(
                previous.get(&usage.provider_id),
                usage,
                self.notify_threshold,
            ) {
                self.sink.notify(&crossing);
            }
        }

        if !persistable.is_empty() {
            self.store.append_history(&persistable)?;
        }

        // Only the two most recent rows per provider satisfy I6's "emitted
        // iff the two most recent history rows satisfy the predicate" —
        // anything further back was already evaluated on a prior tick.
        let mut resets_this_cycle = 0u64;
        for provider in providers {
            let window = self.store.history_by_provider(provider.cli_name(), 2)?;
            let mut ordered = window;
            ordered.reverse();
            for event in detect_resets(&ordered) {
                if self.store.has_reset_event(&event.provider_id, event.timestamp)? {
                    continue;
                }
                self.store.store_reset_event(&event)?;
                resets_this_cycle += 1;
            }
        }

        self.store.cleanup()?;
        self.store.optimize()?;

        {
            let mut telemetry = self.telemetry.lock().await;
            telemetry.cycles_completed += 1;
            telemetry.providers_probed += readings.len() as u64;
            telemetry.providers_failed += failed;
            telemetry.resets_detected += resets_this_cycle;
        }
        {
            let mut state = self.state.lock().await;
            *state = SchedulerState::Idle;
        }

        Ok(())
    }
}
