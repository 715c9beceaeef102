//! Core data models and daemon infrastructure.

pub mod analytics;
pub mod cli_runner;
pub mod companion_probe;
pub mod config_store;
pub mod credential_discovery;
pub mod credential_hash;
pub mod credential_health;
pub mod credential_watcher;
pub mod fetch_plan;
pub mod http;
pub mod http_service;
pub mod logging;
pub mod models;
pub mod notification;
pub mod pipeline;
pub mod probe;
pub mod provider;
pub mod scheduler;
pub mod usage_types;

pub use credential_health::{
    AuthHealthAggregator, CredentialHealth, CredentialHealthReport, CredentialType, HealthSeverity,
    JwtHealth, JwtHealthChecker, OAuthHealth, OverallHealth, ProviderAuthHealth, SourceHealth,
    check_oauth_file, check_oauth_json, get_reauth_instructions,
};
pub use fetch_plan::{FetchAttempt, FetchOutcome, FetchStrategy};
pub use http_service::HttpService;
pub use models::{
    CreditEvent, CreditsSnapshot, OpenAIDashboardSnapshot, ProviderIdentity, RateWindow,
    StatusIndicator, StatusPayload, UsageSnapshot,
};
pub use notification::{NotificationSink, ThresholdCrossing, check_threshold_crossing};
pub use provider::Provider;
pub use scheduler::RefreshScheduler;
pub use usage_types::{ProviderConfig, ProviderUsage};
