//! The provider probe contract.
//!
//! A probe is one attempt, via a [`crate::core::fetch_plan::FetchPlan`], to
//! retrieve usage data for a provider. This module adapts the teacher's
//! existing fetch pipeline (`core::pipeline::fetch_provider`) to the
//! snake_case wire shape served over HTTP, and enforces the per-call
//! deadline independently of any timeout the pipeline applies internally.

use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::core::fetch_plan::SourceMode;
use crate::core::pipeline::fetch_provider;
use crate::core::provider::Provider;
use crate::core::usage_types::ProviderUsage;
use crate::error::{CautError, Result};

/// Default per-probe deadline.
pub const DEFAULT_PROBE_DEADLINE: Duration = Duration::from_secs(4);

/// Run a single provider's fetch plan under a hard deadline and normalize
/// the result into the wire-facing [`ProviderUsage`] shape.
///
/// Per §4.2, a probe returns a *sequence* of readings: the first is always
/// the summary for the configured provider; any further elements are
/// *children* (an id of the form `parent.slug`) the scheduler auto-registers
/// if they aren't already known. None of the fetch strategies in this tree
/// currently emit children — `fetch_provider` always yields exactly one
/// snapshot — but the signature reflects the full contract so a future
/// strategy can start returning more than one element without a call-site
/// change here.
///
/// On success the returned `http_status` is always `200`; the pipeline
/// itself doesn't surface a transport status code, since strategies A/B/D
/// don't all speak HTTP.
///
/// # Errors
/// Returns an error if every fetch strategy fails or if the deadline is
/// exceeded.
pub async fn probe(
    provider: Provider,
    deadline: Duration,
    auth_source: Option<String>,
) -> Result<Vec<ProviderUsage>> {
    let start = Instant::now();
    let outcome = timeout(deadline, fetch_provider(provider, SourceMode::Auto))
        .await
        .map_err(|_| CautError::TimeoutWithProvider {
            provider: provider.cli_name().to_string(),
            seconds: deadline.as_secs(),
        })?;
    let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    match outcome.result {
        Ok(snapshot) => Ok(vec![ProviderUsage::from_snapshot(
            provider,
            &snapshot,
            200,
            latency_ms,
            auth_source,
        )]),
        Err(e) => Err(e),
    }
}

/// Run `probe` with the default deadline and no known auth source.
///
/// # Errors
/// See [`probe`].
pub async fn probe_default(provider: Provider) -> Result<Vec<ProviderUsage>> {
    probe(provider, DEFAULT_PROBE_DEADLINE, None).await
}

/// Run `probe`, but on failure return a single-element sequence holding an
/// `unavailable` [`ProviderUsage`] rather than propagating the error — the
/// shape the refresh scheduler wants, since one provider's failure must
/// never abort a refresh cycle. Never returns an empty sequence, matching
/// the §4.2 contract.
pub async fn probe_or_unavailable(
    provider: Provider,
    deadline: Duration,
    auth_source: Option<String>,
) -> Vec<ProviderUsage> {
    let start = Instant::now();
    match probe(provider, deadline, auth_source).await {
        Ok(usages) => usages,
        Err(e) => {
            let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
            tracing::warn!(provider = %provider.cli_name(), error = %e, "probe failed");
            vec![ProviderUsage::unavailable(provider, e.to_string(), 0, latency_ms)]
        }
    }
}
