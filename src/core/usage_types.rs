//! HTTP-facing wire types.
//!
//! Everything in this module is serialized `snake_case`, including enum
//! variants, since these are the shapes served over the loopback HTTP API
//! and persisted by [`crate::storage::usage_store`]. This is a deliberate
//! divergence from [`crate::core::models`], whose camelCase types remain
//! the provider-probe-internal representation; [`ProviderUsage::from_snapshot`]
//! is the seam between the two.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::models::{ProviderIdentity, UsageSnapshot};
use crate::core::provider::Provider;
use crate::error::{CautError, Result};

/// Whether a provider's quota windows count down to zero (`Coding`, e.g.
/// Claude/Codex rate-limit windows) or accumulate spend (`Usage`, e.g.
/// pay-as-you-go billing APIs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanClass {
    Coding,
    Usage,
}

/// What a [`ProviderUsageDetail`] entry measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailType {
    /// A rate-limit window reading (session, weekly, ...). Requires a
    /// non-`None` [`WindowKind`].
    QuotaWindow,
    /// A credit-balance reading.
    Credit,
    /// A per-model breakdown row.
    Model,
    /// Anything else the probe wants to surface.
    Other,
}

/// Which window a [`ProviderUsageDetail`] entry describes. `None` is only
/// valid alongside a non-`QuotaWindow` detail type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    Primary,
    Secondary,
    Spark,
    None,
}

/// One usage reading nested inside a [`ProviderUsage`].
///
/// The detail contract (§3 of the spec this models): `detail_type ==
/// QuotaWindow` requires `window_kind != None`; every other detail type
/// requires `window_kind == None`; `name` must be non-empty. Violations are
/// caught by [`validate_detail_contract`], never by storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProviderUsageDetail {
    pub name: String,
    pub used: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_reset_time: Option<DateTime<Utc>>,
    pub detail_type: DetailType,
    pub window_kind: WindowKind,
}

/// Check one detail against the detail contract.
///
/// # Errors
/// Returns [`CautError::DetailContractViolation`] if `name` is empty, or if
/// `detail_type`/`window_kind` disagree on whether a window is present.
pub fn validate_detail_contract(provider: &str, detail: &ProviderUsageDetail) -> Result<()> {
    if detail.name.trim().is_empty() {
        return Err(CautError::DetailContractViolation {
            provider: provider.to_string(),
            message: "detail name must not be empty".to_string(),
        });
    }
    match (detail.detail_type, detail.window_kind) {
        (DetailType::QuotaWindow, WindowKind::None) => Err(CautError::DetailContractViolation {
            provider: provider.to_string(),
            message: format!("quota_window detail '{}' has window_kind=none", detail.name),
        }),
        (DetailType::Credit | DetailType::Model | DetailType::Other, kind)
            if kind != WindowKind::None =>
        {
            Err(CautError::DetailContractViolation {
                provider: provider.to_string(),
                message: format!(
                    "non-quota_window detail '{}' has window_kind={:?}",
                    detail.name, detail.window_kind
                ),
            })
        }
        _ => Ok(()),
    }
}

/// Identity information for a provider account, wire shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WireIdentity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_method: Option<String>,
}

impl From<ProviderIdentity> for WireIdentity {
    fn from(identity: ProviderIdentity) -> Self {
        Self {
            account_email: identity.account_email,
            account_organization: identity.account_organization,
            login_method: identity.login_method,
        }
    }
}

/// One refresh-cycle reading for a provider, and the shape of one
/// `provider_history` row once persisted. Field semantics follow the data
/// model this crate implements: `requests_percentage` is the *remaining*
/// percent for quota-based providers and the *used* percent for
/// usage-based providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProviderUsage {
    pub provider_id: String,
    pub provider_name: String,
    pub is_available: bool,
    pub is_quota_based: bool,
    pub plan_class: PlanClass,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests_used: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests_available: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_unit: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_used: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_limit: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_source: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_reset_time: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,

    pub http_status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_json: Option<String>,
    pub response_latency_ms: u64,

    #[serde(default)]
    pub details: Vec<ProviderUsageDetail>,
}

impl ProviderUsage {
    /// Build an *unavailable* result carrying only a description, per the
    /// probe contract: a probe that cannot reach or parse its source still
    /// returns exactly one `ProviderUsage`, never an error.
    #[must_use]
    pub fn unavailable(
        provider: Provider,
        description: impl Into<String>,
        http_status: u16,
        response_latency_ms: u64,
    ) -> Self {
        Self {
            provider_id: provider.cli_name().to_string(),
            provider_name: provider.display_name().to_string(),
            is_available: false,
            is_quota_based: provider.is_quota_based(),
            plan_class: provider.plan_class(),
            requests_used: None,
            requests_available: None,
            requests_percentage: None,
            usage_unit: None,
            cost_used: None,
            cost_limit: None,
            description: Some(description.into()),
            account_name: None,
            auth_source: None,
            next_reset_time: None,
            fetched_at: Utc::now(),
            http_status,
            raw_json: None,
            response_latency_ms,
            details: Vec::new(),
        }
    }

    /// Build a [`ProviderUsage`] from the internal [`UsageSnapshot`] shape
    /// produced by a fetch-plan probe (patterns A/B/D in the spec).
    #[must_use]
    pub fn from_snapshot(
        provider: Provider,
        snapshot: &UsageSnapshot,
        http_status: u16,
        response_latency_ms: u64,
        auth_source: Option<String>,
    ) -> Self {
        let mut details = Vec::new();
        let is_quota_based = provider.is_quota_based();

        if let Some(window) = &snapshot.primary {
            details.push(window_detail(window, "Primary window", WindowKind::Primary));
        }
        if let Some(window) = &snapshot.secondary {
            details.push(window_detail(window, "Secondary window", WindowKind::Secondary));
        }
        if let Some(window) = &snapshot.tertiary {
            details.push(window_detail(window, "Additional tier", WindowKind::Spark));
        }

        let requests_percentage = snapshot.primary.as_ref().map(|w| {
            if is_quota_based {
                w.remaining_percent()
            } else {
                w.used_percent
            }
        });

        Self {
            provider_id: provider.cli_name().to_string(),
            provider_name: provider.display_name().to_string(),
            is_available: true,
            is_quota_based,
            plan_class: provider.plan_class(),
            requests_used: snapshot.primary.as_ref().map(|w| w.used_percent),
            requests_available: snapshot.primary.as_ref().map(|_| 100.0),
            requests_percentage,
            usage_unit: Some(if is_quota_based {
                "Quota %".to_string()
            } else {
                "Tokens".to_string()
            }),
            cost_used: None,
            cost_limit: None,
            description: None,
            account_name: snapshot
                .identity
                .as_ref()
                .and_then(|i| i.account_email.clone()),
            auth_source,
            next_reset_time: snapshot.primary.as_ref().and_then(|w| w.resets_at),
            fetched_at: snapshot.updated_at,
            http_status,
            raw_json: None,
            response_latency_ms,
            details,
        }
    }

    /// Validate every nested detail against the detail contract.
    ///
    /// # Errors
    /// Returns the first [`CautError::DetailContractViolation`] found.
    pub fn validate(&self) -> Result<()> {
        for detail in &self.details {
            validate_detail_contract(&self.provider_id, detail)?;
        }
        Ok(())
    }

    /// Whether this reading carries no information at all (unavailable and
    /// every numeric field empty) — the degenerate case the refresh
    /// scheduler drops rather than appending to history.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        !self.is_available
            && self.requests_used.is_none()
            && self.requests_percentage.is_none()
            && self.cost_used.is_none()
            && self.details.is_empty()
    }

    /// Convert a reading that failed [`Self::validate`] into an unavailable
    /// reading whose description names the detail contract, per
    /// `CautError::DetailContractViolation` (§3). Clears every numeric/detail
    /// field so the result is unambiguous and degenerate — callers must not
    /// append it to history, only surface it over the API.
    #[must_use]
    pub fn into_contract_violation(mut self, violation: impl std::fmt::Display) -> Self {
        self.is_available = false;
        self.requests_used = None;
        self.requests_available = None;
        self.requests_percentage = None;
        self.cost_used = None;
        self.cost_limit = None;
        self.details.clear();
        self.description = Some(format!("detail contract violation: {violation}"));
        self
    }
}

fn window_detail(
    window: &crate::core::models::RateWindow,
    name: &str,
    kind: WindowKind,
) -> ProviderUsageDetail {
    ProviderUsageDetail {
        name: name.to_string(),
        used: format!("{:.0}% used", window.used_percent),
        description: window.reset_description.clone(),
        model_name: None,
        group_name: None,
        next_reset_time: window.resets_at,
        detail_type: DetailType::QuotaWindow,
        window_kind: kind,
    }
}

/// A user-declared model alias: which raw model identifiers roll up into a
/// single user-facing model id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ModelAlias {
    pub name: String,
    #[serde(default)]
    pub matches: Vec<String>,
}

/// Whether a provider's usage accrues against a quota or against spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigType {
    QuotaBased,
    PayAsYouGo,
}

/// A provider's persisted configuration, as returned/accepted by
/// `/api/config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProviderConfig {
    pub provider_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub config_type: ConfigType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    #[serde(default)]
    pub enable_notifications: bool,
    #[serde(default)]
    pub models: HashMap<String, ModelAlias>,
    pub added_at: DateTime<Utc>,
}

impl ProviderConfig {
    /// A disabled, credential-less placeholder config for a provider the
    /// registry knows about but nothing has configured yet.
    #[must_use]
    pub fn empty(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            api_key: None,
            config_type: ConfigType::QuotaBased,
            base_url: None,
            auth_source: None,
            account_name: None,
            enable_notifications: false,
            models: HashMap::new(),
            added_at: Utc::now(),
        }
    }

    /// Whether this config has enough provenance (an api key or a
    /// discovered/oauth auth source) for the scheduler to treat the
    /// provider as "active" in a refresh cycle.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty()) || self.auth_source.is_some()
    }

    /// Mask the secret fields for external display, per the spec's privacy
    /// mode: deterministic, reversible only by re-reading the store.
    #[must_use]
    pub fn masked(mut self) -> Self {
        if let Some(key) = &self.api_key {
            self.api_key = Some(mask_secret(key));
        }
        self
    }
}

fn mask_secret(secret: &str) -> String {
    let visible = 4.min(secret.len());
    format!(
        "{}{}",
        "*".repeat(secret.len().saturating_sub(visible)),
        &secret[secret.len() - visible..]
    )
}

/// User preferences stored alongside provider configs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub struct AppPreferences {
    #[serde(default)]
    pub refresh_interval_minutes: Option<u32>,
    #[serde(default)]
    pub privacy_mode: bool,
}

/// The kind of reset a [`ResetEvent`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetType {
    Automatic,
    Manual,
}

/// A detected quota reset, wire shape for `GET /api/resets/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResetEvent {
    pub provider_id: String,
    pub provider_name: String,
    pub previous_percentage: f64,
    pub new_percentage: f64,
    pub reset_type: ResetType,
    pub timestamp: DateTime<Utc>,
}

/// One row of persisted history, wire shape for `GET /api/history[/{id}]`.
/// Embeds the full `ProviderUsage` reading rather than flattening its
/// fields onto the row, which is lossless and avoids a duplicate ~20-field
/// struct; `detailsJson` in the source schema becomes `usage.details`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HistoryRow {
    pub id: i64,
    pub provider_id: String,
    pub fetched_at: DateTime<Utc>,
    pub usage: ProviderUsage,
}

/// One row of `raw_snapshots`: the unmodified payload body behind a
/// `ProviderUsage.raw_json`, kept separately so it can be trimmed on its
/// own retention window without touching history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RawSnapshot {
    pub provider_id: String,
    pub raw_json: String,
    pub http_status: u16,
    pub fetched_at: DateTime<Utc>,
}
