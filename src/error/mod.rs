//! Error types for caut.
//!
//! Uses `thiserror` for structured error types that map to exit codes.
//!
//! ## Error Taxonomy
//!
//! Errors are categorized into six main categories:
//! - **Authentication**: Issues with credentials, tokens, or login state
//! - **Network**: Connection, timeout, DNS, or SSL/TLS issues
//! - **Configuration**: Config file parsing, validation, or missing values
//! - **Provider**: Rate limits, service unavailability, or API issues
//! - **Environment**: Missing tools, permissions, or system requirements
//! - **Internal**: Unexpected errors, bugs, or unclassified issues
//!
//! Each error has a stable error code (e.g., `CAUT-A001`) for programmatic handling.
//!
//! ## Fix Suggestions
//!
//! Each error type can provide actionable fix suggestions via the
//! [`CautError::fix_suggestions()`] method. Suggestions include:
//! - Commands to run (copy-paste ready)
//! - Context explaining why the error occurred
//! - Prevention tips for the future
//! - Documentation links when available

pub mod suggestions;

use std::time::Duration;
use thiserror::Error;

pub use suggestions::FixSuggestion;

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification and routing.
///
/// Used to determine fix suggestions and error handling strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Authentication issues (expired, missing, invalid tokens/credentials).
    Authentication,
    /// Network issues (timeout, DNS, SSL, connection refused).
    Network,
    /// Configuration issues (parse errors, invalid values, missing files).
    Configuration,
    /// Provider-specific issues (rate limits, unavailable, API errors).
    Provider,
    /// Environment issues (missing CLIs, permissions, system requirements).
    Environment,
    /// Storage issues (database, persisted config, migrations).
    Storage,
    /// Internal errors (bugs, unexpected state, unclassified).
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Authentication => "Authentication error",
            Self::Network => "Network error",
            Self::Configuration => "Configuration error",
            Self::Provider => "Provider error",
            Self::Environment => "Environment error",
            Self::Storage => "Storage error",
            Self::Internal => "Internal error",
        }
    }

    /// Returns a short code prefix for this category.
    #[must_use]
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            Self::Authentication => "A",
            Self::Network => "N",
            Self::Configuration => "C",
            Self::Provider => "P",
            Self::Environment => "E",
            Self::Storage => "S",
            Self::Internal => "X",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes matching CodexBar CLI semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// Unexpected failure
    GeneralError = 1,
    /// Binary not found, provider CLI not installed
    BinaryNotFound = 2,
    /// Parse/format errors, unsupported provider, missing rate limits
    ParseError = 3,
    /// Timeout
    Timeout = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

/// Main error type for caut operations.
///
/// Each variant has:
/// - A stable error code (e.g., `CAUT-A001`)
/// - A category for classification
/// - A retryable flag for retry logic
#[derive(Error, Debug)]
pub enum CautError {
    // ==========================================================================
    // Authentication errors (Category: Authentication)
    // ==========================================================================
    /// Authentication token has expired and needs refresh.
    #[error("authentication expired for {provider}")]
    AuthExpired {
        provider: String,
    },

    /// Authentication is not configured for the provider.
    #[error("authentication not configured for {provider}")]
    AuthNotConfigured {
        provider: String,
    },

    /// Authentication credentials are invalid.
    #[error("invalid credentials for {provider}: {reason}")]
    AuthInvalid {
        provider: String,
        reason: String,
    },

    // ==========================================================================
    // Network errors (Category: Network)
    // ==========================================================================
    /// Request timed out after specified duration.
    #[error("request timeout after {seconds}s for {provider}")]
    TimeoutWithProvider {
        provider: String,
        seconds: u64,
    },

    /// DNS resolution failed.
    #[error("DNS resolution failed for {host}")]
    DnsFailure {
        host: String,
    },

    /// SSL/TLS handshake or certificate error.
    #[error("SSL/TLS error: {message}")]
    SslError {
        message: String,
    },

    /// Connection refused by remote server.
    #[error("connection refused: {host}")]
    ConnectionRefused {
        host: String,
    },

    // ==========================================================================
    // Configuration errors (Category: Configuration)
    // ==========================================================================
    /// Configuration file not found at expected path.
    #[error("config file not found: {path}")]
    ConfigNotFound {
        path: String,
    },

    /// Error parsing configuration file.
    #[error("config parse error at {path}: {message}")]
    ConfigParse {
        path: String,
        line: Option<usize>,
        message: String,
    },

    /// Invalid value in configuration.
    #[error("invalid config value for '{key}': {message}")]
    ConfigInvalid {
        key: String,
        value: String,
        message: String,
    },

    // ==========================================================================
    // Provider errors (Category: Provider)
    // ==========================================================================
    /// Rate limited by provider.
    #[error("rate limited by {provider}: {message}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
        message: String,
    },

    /// Provider service is temporarily unavailable.
    #[error("provider {provider} unavailable: {message}")]
    ProviderUnavailable {
        provider: String,
        message: String,
    },

    /// Provider API returned an error.
    #[error("provider {provider} API error: {message}")]
    ProviderApiError {
        provider: String,
        status_code: Option<u16>,
        message: String,
    },

    // ==========================================================================
    // Environment errors (Category: Environment)
    // ==========================================================================
    /// Required CLI tool not found in PATH.
    #[error("CLI tool not found: {name}")]
    CliNotFound {
        name: String,
    },

    /// Permission denied accessing file or resource.
    #[error("permission denied: {path}")]
    PermissionDenied {
        path: String,
    },

    /// Required environment variable not set.
    #[error("environment variable not set: {name}")]
    EnvVarMissing {
        name: String,
    },

    // ==========================================================================
    // Legacy errors (maintained for backward compatibility)
    // ==========================================================================
    /// Generic configuration error (legacy - prefer specific variants).
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid provider name (legacy).
    #[error("invalid provider: {0}")]
    InvalidProvider(String),

    /// Unsupported source type for provider (legacy).
    #[error("unsupported source for provider {provider}: {source_type}")]
    UnsupportedSource {
        provider: String,
        source_type: String,
    },

    /// Provider CLI not found (legacy - prefer CliNotFound).
    #[error("provider CLI not found: {0}")]
    ProviderNotFound(String),

    /// No fetch strategy available (legacy).
    #[error("no available fetch strategy for provider: {0}")]
    NoAvailableStrategy(String),

    /// Generic fetch failure (legacy - prefer specific variants).
    #[error("fetch failed for {provider}: {reason}")]
    FetchFailed { provider: String, reason: String },

    // ==========================================================================
    // Account errors (Category: Configuration)
    // ==========================================================================
    /// Account selection requires single provider.
    #[error("account selection requires a single provider")]
    AccountRequiresSingleProvider,

    /// Conflicting account flags.
    #[error("--all-accounts cannot be combined with --account or --account-index")]
    AllAccountsConflict,

    /// Provider doesn't support token accounts.
    #[error("provider {0} does not support token accounts")]
    ProviderNoTokenAccounts(String),

    /// Specified account not found.
    #[error("account not found: {0}")]
    AccountNotFound(String),

    /// No accounts configured for provider.
    #[error("no accounts configured for provider: {0}")]
    NoAccountsConfigured(String),

    // ==========================================================================
    // Parse errors (Category: Provider/Internal)
    // ==========================================================================
    /// Failed to parse provider response.
    #[error("failed to parse response: {0}")]
    ParseResponse(String),

    /// Rate limit data missing from response.
    #[error("missing rate limit data in response")]
    MissingRateLimit,

    // ==========================================================================
    // Partial failure (Category: Provider)
    // ==========================================================================
    /// Some providers succeeded, some failed.
    #[error("partial failure: {failed} provider(s) failed")]
    PartialFailure { failed: usize },

    // ==========================================================================
    // Network errors (Category: Network, legacy)
    // ==========================================================================
    /// Request timeout (legacy - prefer TimeoutWithProvider).
    #[error("request timeout after {0} seconds")]
    Timeout(u64),

    /// Generic network error (legacy).
    #[error("network error: {0}")]
    Network(String),

    // ==========================================================================
    // I/O errors (Category: Internal)
    // ==========================================================================
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ==========================================================================
    // Generic wrapper (Category: Internal)
    // ==========================================================================
    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    // ==========================================================================
    // Daemon errors (background-agent categories added on top of the CLI taxonomy)
    // ==========================================================================
    /// Upstream returned a response that doesn't match the expected wire protocol.
    #[error("protocol error from {provider}: {message}")]
    ProtocolError { provider: String, message: String },

    /// A `ProviderUsageDetail` violated the detail-type/window-kind contract.
    #[error("detail contract violation for {provider}: {message}")]
    DetailContractViolation { provider: String, message: String },

    /// A local companion process the provider relies on isn't running.
    #[error("companion process not running for {provider}")]
    CompanionNotRunning { provider: String },

    /// A storage-layer operation (database, persisted config, migrations) failed.
    #[error("storage error: {message}")]
    StorageError { message: String },

    /// Two provider definitions were registered under the same id.
    #[error("duplicate provider definition: {0}")]
    DuplicateProvider(String),
}

impl CautError {
    /// Map error to exit code following CodexBar semantics.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            // Environment errors -> Binary not found
            Self::ProviderNotFound(_)
            | Self::CliNotFound { .. } => ExitCode::BinaryNotFound,

            // Configuration and parse errors -> Parse error
            Self::Config(_)
            | Self::ConfigNotFound { .. }
            | Self::ConfigParse { .. }
            | Self::ConfigInvalid { .. }
            | Self::InvalidProvider(_)
            | Self::UnsupportedSource { .. }
            | Self::AccountRequiresSingleProvider
            | Self::AllAccountsConflict
            | Self::ProviderNoTokenAccounts(_)
            | Self::AccountNotFound(_)
            | Self::NoAccountsConfigured(_)
            | Self::ParseResponse(_)
            | Self::MissingRateLimit
            | Self::NoAvailableStrategy(_)
            | Self::AuthNotConfigured { .. }
            | Self::AuthInvalid { .. } => ExitCode::ParseError,

            // Timeout errors
            Self::Timeout(_)
            | Self::TimeoutWithProvider { .. } => ExitCode::Timeout,

            // Everything else -> General error
            Self::AuthExpired { .. }
            | Self::DnsFailure { .. }
            | Self::SslError { .. }
            | Self::ConnectionRefused { .. }
            | Self::RateLimited { .. }
            | Self::ProviderUnavailable { .. }
            | Self::ProviderApiError { .. }
            | Self::PermissionDenied { .. }
            | Self::EnvVarMissing { .. }
            | Self::Network(_)
            | Self::FetchFailed { .. }
            | Self::PartialFailure { .. }
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_)
            | Self::ProtocolError { .. }
            | Self::DetailContractViolation { .. }
            | Self::CompanionNotRunning { .. }
            | Self::StorageError { .. } => ExitCode::GeneralError,

            Self::DuplicateProvider(_) => ExitCode::ParseError,
        }
    }

    /// Returns the error category for classification and routing.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            // Authentication errors
            Self::AuthExpired { .. }
            | Self::AuthNotConfigured { .. }
            | Self::AuthInvalid { .. } => ErrorCategory::Authentication,

            // Network errors
            Self::Timeout(_)
            | Self::TimeoutWithProvider { .. }
            | Self::DnsFailure { .. }
            | Self::SslError { .. }
            | Self::ConnectionRefused { .. }
            | Self::Network(_) => ErrorCategory::Network,

            // Configuration errors
            Self::Config(_)
            | Self::ConfigNotFound { .. }
            | Self::ConfigParse { .. }
            | Self::ConfigInvalid { .. }
            | Self::InvalidProvider(_)
            | Self::UnsupportedSource { .. }
            | Self::AccountRequiresSingleProvider
            | Self::AllAccountsConflict
            | Self::ProviderNoTokenAccounts(_)
            | Self::AccountNotFound(_)
            | Self::NoAccountsConfigured(_) => ErrorCategory::Configuration,

            // Provider errors
            Self::RateLimited { .. }
            | Self::ProviderUnavailable { .. }
            | Self::ProviderApiError { .. }
            | Self::FetchFailed { .. }
            | Self::PartialFailure { .. }
            | Self::NoAvailableStrategy(_)
            | Self::ParseResponse(_)
            | Self::MissingRateLimit => ErrorCategory::Provider,

            // Environment errors
            Self::ProviderNotFound(_)
            | Self::CliNotFound { .. }
            | Self::PermissionDenied { .. }
            | Self::EnvVarMissing { .. } => ErrorCategory::Environment,

            // Environment errors (continued)
            Self::CompanionNotRunning { .. } => ErrorCategory::Environment,

            // Provider protocol errors
            Self::ProtocolError { .. } | Self::DetailContractViolation { .. } => {
                ErrorCategory::Provider
            }

            // Storage errors
            Self::StorageError { .. } => ErrorCategory::Storage,

            // Configuration errors (continued)
            Self::DuplicateProvider(_) => ErrorCategory::Configuration,

            // Internal errors
            Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Returns a stable error code for programmatic handling.
    ///
    /// Format: `CAUT-{category}{number}` where category is:
    /// - A: Authentication
    /// - N: Network
    /// - C: Configuration
    /// - P: Provider
    /// - E: Environment
    /// - X: Internal
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            // Authentication errors (A001-A099)
            Self::AuthExpired { .. } => "CAUT-A001",
            Self::AuthNotConfigured { .. } => "CAUT-A002",
            Self::AuthInvalid { .. } => "CAUT-A003",

            // Network errors (N001-N099)
            Self::Timeout(_) => "CAUT-N001",
            Self::TimeoutWithProvider { .. } => "CAUT-N002",
            Self::DnsFailure { .. } => "CAUT-N003",
            Self::SslError { .. } => "CAUT-N004",
            Self::ConnectionRefused { .. } => "CAUT-N005",
            Self::Network(_) => "CAUT-N099",

            // Configuration errors (C001-C099)
            Self::ConfigNotFound { .. } => "CAUT-C001",
            Self::ConfigParse { .. } => "CAUT-C002",
            Self::ConfigInvalid { .. } => "CAUT-C003",
            Self::Config(_) => "CAUT-C004",
            Self::InvalidProvider(_) => "CAUT-C010",
            Self::UnsupportedSource { .. } => "CAUT-C011",
            Self::AccountRequiresSingleProvider => "CAUT-C020",
            Self::AllAccountsConflict => "CAUT-C021",
            Self::ProviderNoTokenAccounts(_) => "CAUT-C022",
            Self::AccountNotFound(_) => "CAUT-C023",
            Self::NoAccountsConfigured(_) => "CAUT-C024",

            // Provider errors (P001-P099)
            Self::RateLimited { .. } => "CAUT-P001",
            Self::ProviderUnavailable { .. } => "CAUT-P002",
            Self::ProviderApiError { .. } => "CAUT-P003",
            Self::FetchFailed { .. } => "CAUT-P010",
            Self::NoAvailableStrategy(_) => "CAUT-P011",
            Self::ParseResponse(_) => "CAUT-P020",
            Self::MissingRateLimit => "CAUT-P021",
            Self::PartialFailure { .. } => "CAUT-P030",

            // Environment errors (E001-E099)
            Self::CliNotFound { .. } => "CAUT-E001",
            Self::ProviderNotFound(_) => "CAUT-E002",
            Self::PermissionDenied { .. } => "CAUT-E003",
            Self::EnvVarMissing { .. } => "CAUT-E004",

            // Internal errors (X001-X099)
            Self::Io(_) => "CAUT-X001",
            Self::Json(_) => "CAUT-X002",
            Self::Other(_) => "CAUT-X099",

            // Daemon-added errors
            Self::ProtocolError { .. } => "CAUT-P040",
            Self::DetailContractViolation { .. } => "CAUT-P041",
            Self::CompanionNotRunning { .. } => "CAUT-E010",
            Self::StorageError { .. } => "CAUT-S001",
            Self::DuplicateProvider(_) => "CAUT-C030",
        }
    }

    /// Returns whether the error is potentially recoverable by retrying.
    ///
    /// Retryable errors include:
    /// - Timeouts
    /// - Transient network errors
    /// - Rate limits (with backoff)
    /// - Temporary provider unavailability
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_)
            | Self::TimeoutWithProvider { .. }
            | Self::Network(_)
            | Self::ConnectionRefused { .. }
            | Self::DnsFailure { .. }
            | Self::RateLimited { .. }
            | Self::ProviderUnavailable { .. }
            | Self::CompanionNotRunning { .. }
        )
    }

    /// Returns the retry-after duration if this error specifies one.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Returns the provider name if this error is provider-specific.
    #[must_use]
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::AuthExpired { provider }
            | Self::AuthNotConfigured { provider }
            | Self::AuthInvalid { provider, .. }
            | Self::TimeoutWithProvider { provider, .. }
            | Self::RateLimited { provider, .. }
            | Self::ProviderUnavailable { provider, .. }
            | Self::ProviderApiError { provider, .. }
            | Self::FetchFailed { provider, .. }
            | Self::UnsupportedSource { provider, .. }
            | Self::ProtocolError { provider, .. }
            | Self::DetailContractViolation { provider, .. }
            | Self::CompanionNotRunning { provider } => Some(provider),
            Self::ProviderNotFound(p)
            | Self::InvalidProvider(p)
            | Self::ProviderNoTokenAccounts(p)
            | Self::AccountNotFound(p)
            | Self::NoAccountsConfigured(p)
            | Self::NoAvailableStrategy(p) => Some(p),
            _ => None,
        }
    }

    /// Returns actionable fix suggestions for this error.
    ///
    /// Suggestions include commands to run, context about why the error
    /// occurred, prevention tips, and documentation links when available.
    ///
    /// # Example
    ///
    /// ```
    /// use caut::error::CautError;
    ///
    /// let err = CautError::CliNotFound { name: "claude".to_string() };
    /// let suggestions = err.fix_suggestions();
    ///
    /// if !suggestions.is_empty() {
    ///     println!("Try these commands:");
    ///     for cmd in &suggestions[0].commands {
    ///         println!("  {}", cmd);
    ///     }
    /// }
    /// ```
    #[must_use]
    pub fn fix_suggestions(&self) -> Vec<FixSuggestion> {
        match self {
            // Authentication errors
            Self::AuthExpired { provider } => {
                suggestions::auth_expired_suggestions(provider)
            }
            Self::AuthNotConfigured { provider } => {
                suggestions::auth_not_configured_suggestions(provider)
            }
            Self::AuthInvalid { provider, reason } => {
                suggestions::auth_invalid_suggestions(provider, reason)
            }

            // Network errors
            Self::Timeout(seconds) => {
                suggestions::timeout_suggestions("unknown", *seconds)
            }
            Self::TimeoutWithProvider { provider, seconds } => {
                suggestions::timeout_suggestions(provider, *seconds)
            }
            Self::DnsFailure { host } => {
                suggestions::dns_failure_suggestions(host)
            }
            Self::SslError { message } => {
                suggestions::ssl_error_suggestions(message)
            }
            Self::ConnectionRefused { host } => {
                suggestions::connection_refused_suggestions(host)
            }
            Self::Network(msg) => {
                vec![FixSuggestion::new(
                    vec!["caut doctor".to_string()],
                    format!("Network error: {}. Check your internet connection.", msg),
                )]
            }

            // Configuration errors
            Self::ConfigNotFound { path } => {
                suggestions::config_not_found_suggestions(path)
            }
            Self::ConfigParse { path, line, message } => {
                suggestions::config_parse_suggestions(path, *line, message)
            }
            Self::ConfigInvalid { key, value, message } => {
                suggestions::config_invalid_suggestions(key, value, message)
            }
            Self::Config(msg) => {
                vec![FixSuggestion::new(
                    vec!["caut config show".to_string()],
                    format!("Configuration error: {}", msg),
                )]
            }
            Self::InvalidProvider(name) => {
                suggestions::invalid_provider_suggestions(name)
            }
            Self::UnsupportedSource { provider, source_type } => {
                suggestions::unsupported_source_suggestions(provider, source_type)
            }
            Self::AccountRequiresSingleProvider => {
                vec![FixSuggestion::new(
                    vec!["caut usage --provider <provider> --account <account>".to_string()],
                    "Account selection requires specifying a single provider.",
                )]
            }
            Self::AllAccountsConflict => {
                vec![FixSuggestion::new(
                    vec![
                        "caut usage --all-accounts".to_string(),
                        "caut usage --account <name>".to_string(),
                    ],
                    "Cannot combine --all-accounts with --account or --account-index.",
                )]
            }
            Self::ProviderNoTokenAccounts(provider) => {
                vec![FixSuggestion::new(
                    vec![format!("caut providers show {}", provider)],
                    format!("Provider {} does not support multiple token accounts.", provider),
                )]
            }
            Self::AccountNotFound(account) => {
                suggestions::account_not_found_suggestions(account)
            }
            Self::NoAccountsConfigured(provider) => {
                suggestions::no_accounts_suggestions(provider)
            }

            // Provider errors
            Self::RateLimited { provider, retry_after, message } => {
                suggestions::rate_limited_suggestions(provider, *retry_after, message)
            }
            Self::ProviderUnavailable { provider, message } => {
                suggestions::provider_unavailable_suggestions(provider, message)
            }
            Self::ProviderApiError { provider, status_code, message } => {
                suggestions::provider_api_error_suggestions(provider, *status_code, message)
            }
            Self::FetchFailed { provider, reason } => {
                suggestions::fetch_failed_suggestions(provider, reason)
            }
            Self::NoAvailableStrategy(provider) => {
                suggestions::no_strategy_suggestions(provider)
            }
            Self::ParseResponse(msg) => {
                vec![FixSuggestion::new(
                    vec!["caut doctor".to_string()],
                    format!("Failed to parse provider response: {}. This may indicate an API change.", msg),
                )]
            }
            Self::MissingRateLimit => {
                vec![FixSuggestion::new(
                    vec!["caut doctor".to_string()],
                    "Rate limit data was missing from the response. The provider API may have changed.",
                )]
            }
            Self::PartialFailure { failed } => {
                vec![FixSuggestion::new(
                    vec!["caut doctor".to_string()],
                    format!("{} provider(s) failed. Run diagnostics to identify issues.", failed),
                )]
            }

            // Environment errors
            Self::CliNotFound { name } => {
                suggestions::cli_not_found_suggestions(name)
            }
            Self::ProviderNotFound(name) => {
                suggestions::cli_not_found_suggestions(name)
            }
            Self::PermissionDenied { path } => {
                suggestions::permission_denied_suggestions(path)
            }
            Self::EnvVarMissing { name } => {
                suggestions::env_var_missing_suggestions(name)
            }

            // Internal errors - generic suggestions
            Self::Io(err) => {
                vec![FixSuggestion::new(
                    vec!["# Check file permissions and disk space".to_string()],
                    format!("I/O error: {}. Check file permissions and available disk space.", err),
                )]
            }
            Self::Json(err) => {
                vec![FixSuggestion::new(
                    vec!["caut doctor".to_string()],
                    format!("JSON parsing error: {}. The data may be corrupted or in an unexpected format.", err),
                )]
            }
            Self::Other(err) => {
                vec![FixSuggestion::new(
                    vec!["caut doctor".to_string()],
                    format!("Unexpected error: {}. Please report this issue.", err),
                )]
            }
            Self::ProtocolError { provider, message } => {
                vec![FixSuggestion::new(
                    vec![format!("GET /api/diagnostics")],
                    format!("{provider} returned a response that doesn't match the expected protocol: {message}"),
                )]
            }
            Self::DetailContractViolation { provider, message } => {
                vec![FixSuggestion::new(
                    vec![format!("GET /api/usage/{provider}")],
                    format!("{provider} produced a usage detail that violates the detail contract: {message}"),
                )]
            }
            Self::CompanionNotRunning { provider } => {
                vec![FixSuggestion::new(
                    vec![format!("Start the {provider} companion app and retry")],
                    format!("No local companion process was found for {provider}; serving the last cached reading."),
                )]
            }
            Self::StorageError { message } => {
                vec![FixSuggestion::new(
                    vec!["caut doctor".to_string()],
                    format!("Storage error: {message}"),
                )]
            }
            Self::DuplicateProvider(id) => {
                vec![FixSuggestion::new(
                    vec!["# Check the provider registry for duplicate ids".to_string()],
                    format!("Provider '{id}' was registered more than once."),
                )]
            }
        }
    }
}

/// Result type alias for caut operations.
pub type Result<T> = std::result::Result<T, CautError>;

// =============================================================================
// Tests
// =============================================================================
