//! Derived analytics over persisted history: reset detection, burn-rate
//! forecasting, reliability, and anomaly snapshots.
//!
//! These are pure functions over [`crate::core::usage_types::HistoryRow`]
//! slices rather than methods on the store, so the refresh scheduler can
//! call them on data it already holds in memory without an extra query.
//! The regression and reset-stripping approach here mirrors a standard
//! least-squares trend fit over time-ordered samples, adapted to the
//! richer `ProviderUsage` reading and its quota-polarity distinction.

use chrono::{DateTime, Utc};

use crate::core::usage_types::{HistoryRow, ResetEvent, ResetType};

/// A reading is a likely reset when usage was at or above this percentage
/// and the next reading falls at or below the low threshold.
pub const RESET_HIGH_THRESHOLD: f64 = 80.0;
/// See [`RESET_HIGH_THRESHOLD`].
pub const RESET_LOW_THRESHOLD: f64 = 20.0;

/// Standard deviations away from the rolling mean before a reading counts
/// as an anomaly.
pub const ANOMALY_K: f64 = 3.0;

/// A forecast of when a provider's quota will be exhausted, derived from a
/// least-squares fit over recent history.
#[derive(Debug, Clone, PartialEq)]
pub struct BurnRateForecast {
    pub provider_id: String,
    /// Percentage points consumed per hour (quota-based) or accrued per
    /// hour (usage-based). Always non-negative in the direction of
    /// exhaustion; `None` when there isn't enough data to fit a trend.
    pub points_per_hour: Option<f64>,
    /// Estimated time the 100% mark is reached at the current rate.
    /// `None` when the trend is flat, decreasing, or undetermined.
    pub estimated_exhaustion: Option<DateTime<Utc>>,
}

/// A provider's fetch reliability over the sampled window.
#[derive(Debug, Clone, PartialEq)]
pub struct ReliabilitySnapshot {
    pub provider_id: String,
    pub total_samples: usize,
    pub available_samples: usize,
    pub availability_ratio: f64,
    pub mean_latency_ms: f64,
}

/// A single reading flagged as statistically unusual against its own
/// provider's recent history.
#[derive(Debug, Clone, PartialEq)]
pub struct Anomaly {
    pub provider_id: String,
    pub fetched_at: DateTime<Utc>,
    pub value: f64,
    pub mean: f64,
    pub std_dev: f64,
}

/// Scan consecutive same-provider rows (already in chronological order, as
/// [`crate::storage::usage_store::UsageStore::window_samples`] returns them)
/// for quota resets: a sharp drop in `requests_percentage`'s *used* value
/// from a high watermark to a low one, quota-polarity-aware.
///
/// `detail_type` is always [`ResetType::Automatic`] here — this scans
/// passively detected drops; a provider-initiated manual reset has no
/// distinguishing wire signal and isn't modeled separately.
#[must_use]
pub fn detect_resets(history: &[HistoryRow]) -> Vec<ResetEvent> {
    let mut events = Vec::new();
    for window in history.windows(2) {
        let (prev, curr) = (&window[0], &window[1]);
        if prev.provider_id != curr.provider_id {
            continue;
        }
        let Some(prev_used) = used_percent(prev) else { continue };
        let Some(curr_used) = used_percent(curr) else { continue };

        if prev_used >= RESET_HIGH_THRESHOLD && curr_used <= RESET_LOW_THRESHOLD {
            events.push(ResetEvent {
                provider_id: curr.provider_id.clone(),
                provider_name: curr.usage.provider_name.clone(),
                previous_percentage: prev_used,
                new_percentage: curr_used,
                reset_type: ResetType::Automatic,
                timestamp: curr.fetched_at,
            });
        }
    }
    events
}

/// The "used" percentage for a row regardless of quota polarity: for
/// quota-based providers this is `100 - requests_percentage` (since
/// `requests_percentage` there means *remaining*), for usage-based
/// providers it's `requests_percentage` directly.
fn used_percent(row: &HistoryRow) -> Option<f64> {
    let pct = row.usage.requests_percentage?;
    Some(if row.usage.is_quota_based { 100.0 - pct } else { pct })
}

/// Strip segments that span a detected reset, keeping only the most recent
/// unbroken run, so a trend fit never spans a quota reset boundary.
fn strip_resets(history: &[HistoryRow]) -> Vec<&HistoryRow> {
    let mut segment: Vec<&HistoryRow> = Vec::new();
    for row in history {
        if let Some(prev) = segment.last().copied() {
            if prev.provider_id != row.provider_id {
                segment.clear();
            } else if let (Some(prev_used), Some(curr_used)) = (used_percent(prev), used_percent(row)) {
                if prev_used >= RESET_HIGH_THRESHOLD && curr_used <= RESET_LOW_THRESHOLD {
                    segment.clear();
                }
            }
        }
        segment.push(row);
    }
    segment
}

/// Fit a least-squares trend line over one provider's recent history
/// (already filtered to a single `provider_id` and sorted oldest-first)
/// and project when it reaches 100% used.
#[must_use]
pub fn forecast_burn_rate(provider_id: &str, history: &[HistoryRow]) -> BurnRateForecast {
    let segment = strip_resets(history);
    let points_per_hour = linear_regression_slope(&segment).map(|slope_per_second| slope_per_second * 3600.0);

    let estimated_exhaustion = points_per_hour.and_then(|rate| {
        if rate <= 0.0 {
            return None;
        }
        let last = segment.last()?;
        let current_used = used_percent(last)?;
        let remaining = 100.0 - current_used;
        if remaining <= 0.0 {
            return Some(last.fetched_at);
        }
        let hours_left = remaining / rate;
        chrono::Duration::try_milliseconds((hours_left * 3_600_000.0) as i64)
            .map(|delta| last.fetched_at + delta)
    });

    BurnRateForecast {
        provider_id: provider_id.to_string(),
        points_per_hour,
        estimated_exhaustion,
    }
}

#[allow(clippy::cast_precision_loss)]
fn linear_regression_slope(points: &[&HistoryRow]) -> Option<f64> {
    let n = points.len() as f64;
    if n < 2.0 {
        return None;
    }

    let base_time = points[0].fetched_at.timestamp() as f64;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_xx = 0.0;

    for point in points {
        let x = point.fetched_at.timestamp() as f64 - base_time;
        let y = used_percent(point)?;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }

    let denominator = n.mul_add(sum_xx, -(sum_x * sum_x));
    if denominator.abs() < f64::EPSILON {
        return None;
    }
    Some(n.mul_add(sum_xy, -(sum_x * sum_y)) / denominator)
}

/// Summarize fetch reliability for one provider over a sampled window.
#[must_use]
pub fn reliability(provider_id: &str, history: &[HistoryRow]) -> ReliabilitySnapshot {
    let total_samples = history.len();
    let available_samples = history.iter().filter(|r| r.usage.is_available).count();
    let availability_ratio = if total_samples == 0 {
        0.0
    } else {
        #[allow(clippy::cast_precision_loss)]
        let ratio = available_samples as f64 / total_samples as f64;
        ratio
    };
    let latencies: Vec<f64> = history.iter().map(|r| r.usage.response_latency_ms as f64).collect();
    #[allow(clippy::cast_precision_loss)]
    let mean_latency_ms = if latencies.is_empty() {
        0.0
    } else {
        latencies.iter().sum::<f64>() / latencies.len() as f64
    };

    ReliabilitySnapshot {
        provider_id: provider_id.to_string(),
        total_samples,
        available_samples,
        availability_ratio,
        mean_latency_ms,
    }
}

/// Flag a sudden jump in `requests_used` against the provider's own recent
/// history: compute the mean and standard deviation of the per-sample
/// deltas *excluding the most recent one*, then test only that most recent
/// delta against `mean + ANOMALY_K * std_dev`. One-sided, since a delta
/// dropping below the mean is a reset (handled by [`detect_resets`]), not
/// an anomaly; the newest delta is excluded from its own baseline so a
/// genuine spike doesn't inflate the standard deviation it's being judged
/// against. Requires at least 4 baseline deltas (5 samples) to produce a
/// meaningful standard deviation; returns an empty list otherwise.
#[must_use]
pub fn detect_anomalies(provider_id: &str, history: &[HistoryRow]) -> Vec<Anomaly> {
    let values: Vec<(DateTime<Utc>, f64)> = history
        .iter()
        .filter_map(|r| r.usage.requests_used.map(|v| (r.fetched_at, v)))
        .collect();
    if values.len() < 5 {
        return Vec::new();
    }

    let deltas: Vec<(DateTime<Utc>, f64)> =
        values.windows(2).map(|w| (w[1].0, w[1].1 - w[0].1)).collect();
    let (baseline, latest) = deltas.split_at(deltas.len() - 1);
    let (fetched_at, last_delta) = latest[0];

    #[allow(clippy::cast_precision_loss)]
    let n = baseline.len() as f64;
    let mean = baseline.iter().map(|(_, d)| d).sum::<f64>() / n;
    let variance = baseline.iter().map(|(_, d)| (d - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    if last_delta > mean + ANOMALY_K * std_dev {
        vec![Anomaly {
            provider_id: provider_id.to_string(),
            fetched_at,
            value: last_delta,
            mean,
            std_dev,
        }]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::usage_types::{PlanClass, ProviderUsage};

    fn row(id: i64, provider_id: &str, fetched_at: DateTime<Utc>, requests_percentage: f64, is_quota_based: bool) -> HistoryRow {
        HistoryRow {
            id,
            provider_id: provider_id.to_string(),
            fetched_at,
            usage: ProviderUsage {
                provider_id: provider_id.to_string(),
                provider_name: provider_id.to_string(),
                is_available: true,
                is_quota_based,
                plan_class: if is_quota_based { PlanClass::Coding } else { PlanClass::Usage },
                requests_used: None,
                requests_available: None,
                requests_percentage: Some(requests_percentage),
                usage_unit: None,
                cost_used: None,
                cost_limit: None,
                description: None,
                account_name: None,
                auth_source: None,
                next_reset_time: None,
                fetched_at,
                http_status: 200,
                raw_json: None,
                response_latency_ms: 50,
                details: Vec::new(),
            },
        }
    }

    #[test]
    fn detects_a_sharp_drop_as_a_reset_for_quota_based_providers() {
        let now = Utc::now();
        // quota-based: requests_percentage is *remaining*, so a reset is a
        // jump from low-remaining to high-remaining.
        let history = vec![
            row(1, "codex", now - chrono::Duration::hours(1), 15.0, true),
            row(2, "codex", now, 95.0, true),
        ];
        let events = detect_resets(&history);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].provider_id, "codex");
        assert_eq!(events[0].reset_type, ResetType::Automatic);
    }

    #[test]
    fn does_not_detect_a_reset_across_different_providers() {
        let now = Utc::now();
        let history = vec![
            row(1, "codex", now - chrono::Duration::hours(1), 15.0, true),
            row(2, "claude", now, 95.0, true),
        ];
        assert!(detect_resets(&history).is_empty());
    }

    #[test]
    fn forecast_projects_exhaustion_for_a_rising_usage_trend() {
        let now = Utc::now();
        let history = vec![
            row(1, "vertex-ai", now - chrono::Duration::hours(3), 10.0, false),
            row(2, "vertex-ai", now - chrono::Duration::hours(2), 20.0, false),
            row(3, "vertex-ai", now - chrono::Duration::hours(1), 30.0, false),
            row(4, "vertex-ai", now, 40.0, false),
        ];
        let forecast = forecast_burn_rate("vertex-ai", &history);
        assert!(forecast.points_per_hour.unwrap() > 0.0);
        assert!(forecast.estimated_exhaustion.is_some());
    }

    #[test]
    fn forecast_has_no_exhaustion_estimate_for_a_flat_trend() {
        let now = Utc::now();
        let history = vec![
            row(1, "vertex-ai", now - chrono::Duration::hours(2), 40.0, false),
            row(2, "vertex-ai", now - chrono::Duration::hours(1), 40.0, false),
            row(3, "vertex-ai", now, 40.0, false),
        ];
        let forecast = forecast_burn_rate("vertex-ai", &history);
        assert!(forecast.estimated_exhaustion.is_none());
    }

    #[test]
    fn reliability_counts_available_samples_and_mean_latency() {
        let now = Utc::now();
        let mut a = row(1, "codex", now, 50.0, true);
        a.usage.response_latency_ms = 100;
        let mut b = row(2, "codex", now, 60.0, true);
        b.usage.is_available = false;
        b.usage.response_latency_ms = 200;

        let snapshot = reliability("codex", &[a, b]);
        assert_eq!(snapshot.total_samples, 2);
        assert_eq!(snapshot.available_samples, 1);
        assert!((snapshot.availability_ratio - 0.5).abs() < f64::EPSILON);
        assert!((snapshot.mean_latency_ms - 150.0).abs() < f64::EPSILON);
    }

    fn row_with_used(id: i64, provider_id: &str, fetched_at: DateTime<Utc>, requests_used: f64) -> HistoryRow {
        let mut r = row(id, provider_id, fetched_at, 0.0, true);
        r.usage.requests_used = Some(requests_used);
        r
    }

    #[test]
    fn anomaly_detection_flags_a_delta_spike_against_the_recent_trend() {
        let now = Utc::now();
        // Steady +10/hour usage, then a jump of +400 on the last sample.
        let history = vec![
            row_with_used(1, "codex", now - chrono::Duration::hours(5), 0.0),
            row_with_used(2, "codex", now - chrono::Duration::hours(4), 10.0),
            row_with_used(3, "codex", now - chrono::Duration::hours(3), 20.0),
            row_with_used(4, "codex", now - chrono::Duration::hours(2), 30.0),
            row_with_used(5, "codex", now - chrono::Duration::hours(1), 40.0),
            row_with_used(6, "codex", now, 440.0),
        ];
        let anomalies = detect_anomalies("codex", &history);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].value, 400.0);
    }

    #[test]
    fn anomaly_detection_does_not_flag_a_drop_one_sided() {
        let now = Utc::now();
        // A large negative delta (a reset, not an anomaly) must never flag.
        let history = vec![
            row_with_used(1, "codex", now - chrono::Duration::hours(5), 0.0),
            row_with_used(2, "codex", now - chrono::Duration::hours(4), 10.0),
            row_with_used(3, "codex", now - chrono::Duration::hours(3), 20.0),
            row_with_used(4, "codex", now - chrono::Duration::hours(2), 30.0),
            row_with_used(5, "codex", now - chrono::Duration::hours(1), 40.0),
            row_with_used(6, "codex", now, 0.0),
        ];
        assert!(detect_anomalies("codex", &history).is_empty());
    }

    #[test]
    fn anomaly_detection_needs_at_least_five_samples() {
        let now = Utc::now();
        let history = vec![
            row_with_used(1, "codex", now - chrono::Duration::hours(3), 10.0),
            row_with_used(2, "codex", now - chrono::Duration::hours(2), 20.0),
            row_with_used(3, "codex", now - chrono::Duration::hours(1), 30.0),
            row_with_used(4, "codex", now, 500.0),
        ];
        assert!(detect_anomalies("codex", &history).is_empty());
    }
}
