//! Threshold-crossing notifications.
//!
//! The refresh scheduler calls [`check_threshold_crossing`] after every
//! reading and hands any crossing it finds to a [`NotificationSink`]. The
//! only sink shipped here logs through `tracing`; a desktop-notification
//! sink (or anything else) plugs in at the same seam without the scheduler
//! knowing the difference, the same capability-trait pattern the teacher
//! uses for its provider fetch strategies.

use crate::core::usage_types::ProviderUsage;

/// Usage crossing this percentage (used, quota-polarity-aware) triggers a
/// notification unless the provider has notifications disabled.
pub const DEFAULT_NOTIFY_THRESHOLD: f64 = 90.0;

/// A quota-threshold crossing worth surfacing to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdCrossing {
    pub provider_id: String,
    pub provider_name: String,
    pub previous_used_percent: f64,
    pub current_used_percent: f64,
    pub threshold: f64,
}

/// Something that can be told about a [`ThresholdCrossing`]. Implemented by
/// [`LoggingNotificationSink`]; other delivery mechanisms implement it the
/// same way.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, crossing: &ThresholdCrossing);
}

/// The default sink: logs the crossing as a structured `tracing` event.
/// Always available, since it has no OS dependency.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotificationSink;

impl NotificationSink for LoggingNotificationSink {
    fn notify(&self, crossing: &ThresholdCrossing) {
        tracing::warn!(
            provider = %crossing.provider_id,
            previous_percent = crossing.previous_used_percent,
            current_percent = crossing.current_used_percent,
            threshold = crossing.threshold,
            "provider usage crossed notification threshold"
        );
    }
}

/// The "used" percentage for a reading regardless of quota polarity, for
/// threshold comparison purposes — a quota-based provider's remaining-based
/// `requests_percentage` is inverted so "90% crossed" always means "90%
/// consumed" to the caller.
fn used_percent(usage: &ProviderUsage) -> Option<f64> {
    let pct = usage.requests_percentage?;
    Some(if usage.is_quota_based { 100.0 - pct } else { pct })
}

/// Compare a provider's previous and current readings against `threshold`
/// and report a crossing if usage moved from below it to at-or-above it.
/// A reset (usage dropping) never counts as a crossing.
#[must_use]
pub fn check_threshold_crossing(
    previous: Option<&ProviderUsage>,
    current: &ProviderUsage,
    threshold: f64,
) -> Option<ThresholdCrossing> {
    let current_used = used_percent(current)?;
    let previous_used = previous.and_then(used_percent).unwrap_or(0.0);

    if previous_used < threshold && current_used >= threshold {
        Some(ThresholdCrossing {
            provider_id: current.provider_id.clone(),
            provider_name: current.provider_name.clone(),
            previous_used_percent: previous_used,
            current_used_percent: current_used,
            threshold,
        })
    } else {
        None
    }
}
