//! Claude (Anthropic) provider implementation.
//!
//! Supports:
//! - OAuth API (with stored token)
//! - Web scraping (macOS only)
//! - CLI local config reading
//! - CLI PTY
//!
//! Source labels: `oauth`, `web`, `claude`, `cli-local`

use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use serde::Deserialize;

use crate::core::cli_runner::{CLI_TIMEOUT, run_command, run_json_command};
use crate::core::fetch_plan::{FetchKind, FetchPlan, FetchStrategy};
use crate::core::http::{DEFAULT_TIMEOUT, build_client};
use crate::core::models::{ProviderIdentity, RateWindow, UsageSnapshot};
use crate::core::provider::Provider;
use crate::error::{CautError, Result};

/// Source label for OAuth.
pub const SOURCE_OAUTH: &str = "oauth";

/// Source label for web.
pub const SOURCE_WEB: &str = "web";

/// Source label for CLI.
pub const SOURCE_CLI: &str = "claude";

/// CLI binary name.
const CLI_NAME: &str = "claude";

/// Anthropic API base URL.
const API_BASE: &str = "https://api.anthropic.com";

// =============================================================================
// Fetch Plan
// =============================================================================

/// Create fetch plan for Claude.
#[must_use]
pub fn fetch_plan() -> FetchPlan {
    FetchPlan::new(
        Provider::Claude,
        vec![
            FetchStrategy {
                id: "claude-oauth",
                kind: FetchKind::OAuth,
                is_available: || {
                    // OAuth requires stored token
                    // Check keyring for token
                    has_oauth_token()
                },
                should_fallback: |_| true,
            },
            FetchStrategy {
                id: "claude-web",
                kind: FetchKind::Web,
                is_available: || {
                    // Web requires macOS with cookies
                    cfg!(target_os = "macos")
                },
                should_fallback: |_| true,
            },
            FetchStrategy {
                id: "claude-cli-pty",
                kind: FetchKind::Cli,
                is_available: is_cli_available,
                should_fallback: |_| false,
            },
        ],
    )
}

/// Check if the Claude CLI is available.
fn is_cli_available() -> bool {
    which::which(CLI_NAME).is_ok()
}

/// Check if OAuth token is available.
fn has_oauth_token() -> bool {
    // Try to get token from keyring
    get_oauth_token().is_some()
}

/// Get OAuth token from keyring.
fn get_oauth_token() -> Option<String> {
    let entry = keyring::Entry::new("caut", "claude-oauth-token").ok()?;
    entry.get_password().ok()
}

// =============================================================================
// Local Config Types
// =============================================================================

/// Get the Claude config directory path.
fn get_claude_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().join(".claude"))
}

/// Check if Claude is configured locally.
fn has_local_config() -> bool {
    get_claude_dir()
        .is_some_and(|d| d.join(".credentials.json").exists() || d.join("settings.json").exists())
}

/// Credentials.json structure from ~/.claude/.credentials.json
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClaudeCredentials {
    #[serde(default)]
    credentials: Option<ClaudeCredentialData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClaudeCredentialData {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    account_uuid: Option<String>,
}

/// Read credentials from local ~/.claude/.credentials.json
fn read_local_credentials() -> Option<ClaudeCredentials> {
    let claude_dir = get_claude_dir()?;
    let creds_path = claude_dir.join(".credentials.json");

    if !creds_path.exists() {
        tracing::debug!("Claude credentials not found at {:?}", creds_path);
        return None;
    }

    let content = fs::read_to_string(&creds_path).ok()?;
    serde_json::from_str(&content).ok()
}

/// Get identity information from local credentials.
fn get_local_identity() -> Option<ProviderIdentity> {
    let creds = read_local_credentials()?;
    let data = creds.credentials?;

    Some(ProviderIdentity {
        account_email: data.email,
        account_organization: data.account_uuid,
        login_method: Some("cli-local".to_string()),
    })
}

// =============================================================================
// API Response Types
// =============================================================================

/// Response from Anthropic rate limit API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
struct ClaudeRateLimitResponse {
    #[serde(default)]
    rate_limit: Option<ClaudeRateLimit>,
    #[allow(dead_code)]
    #[serde(default)]
    usage: Option<ClaudeUsage>,
    #[serde(default)]
    account: Option<ClaudeAccount>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
struct ClaudeRateLimit {
    #[serde(default)]
    requests_remaining: Option<i64>,
    #[serde(default)]
    requests_limit: Option<i64>,
    #[serde(default)]
    tokens_remaining: Option<i64>,
    #[serde(default)]
    tokens_limit: Option<i64>,
    #[serde(default)]
    resets_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(dead_code)]
struct ClaudeUsage {
    #[serde(default)]
    input_tokens: Option<i64>,
    #[serde(default)]
    output_tokens: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(dead_code)]
struct ClaudeAccount {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    organization: Option<String>,
    #[serde(default)]
    plan: Option<String>,
}

// =============================================================================
// Fetch Implementations
// =============================================================================

/// Fetch usage via OAuth API.
///
/// Requires a valid OAuth token stored in the system keyring.
pub async fn fetch_oauth(token: &str) -> Result<UsageSnapshot> {
    let client = build_client(DEFAULT_TIMEOUT)?;

    // Make authenticated request to rate limit endpoint
    let url = format!("{}/v1/rate_limits", API_BASE);

    let response = client
        .get(&url)
        .header("Authorization", format!("Bearer {}", token))
        .header("anthropic-version", "2023-06-01")
        .header("x-api-key", token)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                CautError::Timeout(DEFAULT_TIMEOUT.as_secs())
            } else {
                CautError::Network(e.to_string())
            }
        })?;

    if !response.status().is_success() {
        return Err(CautError::FetchFailed {
            provider: "claude".to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let data: ClaudeRateLimitResponse = response
        .json()
        .await
        .map_err(|e| CautError::ParseResponse(e.to_string()))?;

    parse_api_response(data)
}

/// Fetch usage via web scraping.
///
/// This requires macOS with browser cookies available.
pub async fn fetch_web() -> Result<UsageSnapshot> {
    #[cfg(not(target_os = "macos"))]
    {
        Err(CautError::UnsupportedSource {
            provider: "claude".to_string(),
            source_type: "web".to_string(),
        })
    }

    #[cfg(target_os = "macos")]
    {
        // TODO: Implement actual web scraping
        // This would involve:
        // 1. Reading browser cookies for claude.ai
        // 2. Making authenticated request to the web dashboard
        // 3. Parsing the response
        Err(CautError::FetchFailed {
            provider: "claude".to_string(),
            reason: "Web scraping not yet implemented".to_string(),
        })
    }
}

/// Fetch usage via CLI PTY.
///
/// Calls the `claude` CLI to get rate limit information.
/// Falls back to reading local config files for identity info.
pub async fn fetch_cli() -> Result<UsageSnapshot> {
    // First check version to confirm CLI is working
    let version = get_cli_version().await.ok();
    let now = Utc::now();

    tracing::debug!(
        ?version,
        cli_available = is_cli_available(),
        has_local_config = has_local_config(),
        "Claude CLI fetch starting"
    );

    // Try to get rate limit info via JSON output (unlikely to work - Claude CLI doesn't expose this)
    if let Ok(response) = try_json_rate_limit().await {
        return parse_api_response(response);
    }

    // Try the /limits subcommand if available
    if let Ok(output) = run_command(CLI_NAME, &["limits"], CLI_TIMEOUT).await {
        if output.success() {
            return parse_cli_limits_output(&output.stdout);
        }
    }

    // Fallback: Read identity from local config files
    let identity = get_local_identity().or_else(|| {
        Some(ProviderIdentity {
            account_email: None,
            account_organization: None,
            login_method: if has_local_config() {
                Some("cli-local".to_string())
            } else {
                Some("cli-unauthenticated".to_string())
            },
        })
    });

    // Return snapshot with what we know
    // Note: Claude CLI doesn't expose rate limit info directly via CLI
    // Rate limit data needs to come from OAuth API or web dashboard
    Ok(UsageSnapshot {
        primary: None,
        secondary: None,
        tertiary: None,
        updated_at: now,
        identity,
    })
}

/// Try to get rate limit via JSON output.
async fn try_json_rate_limit() -> Result<ClaudeRateLimitResponse> {
    // Try various command patterns that CLI tools commonly use
    let commands = [
        &["rate-limit", "--json"][..],
        &["limits", "--json"][..],
        &["status", "--json"][..],
    ];

    for args in commands {
        if let Ok(response) =
            run_json_command::<ClaudeRateLimitResponse>(CLI_NAME, args, CLI_TIMEOUT).await
        {
            return Ok(response);
        }
    }

    Err(CautError::FetchFailed {
        provider: "claude".to_string(),
        reason: "No rate limit command found".to_string(),
    })
}

/// Parse API response into UsageSnapshot.
fn parse_api_response(response: ClaudeRateLimitResponse) -> Result<UsageSnapshot> {
    let now = Utc::now();

    let primary = response.rate_limit.as_ref().and_then(|rl| {
        match (rl.requests_remaining, rl.requests_limit) {
            (Some(remaining), Some(limit)) if limit > 0 => {
                let used_percent = ((limit - remaining) as f64 / limit as f64) * 100.0;
                Some(RateWindow {
                    used_percent,
                    window_minutes: None,
                    resets_at: rl.resets_at.as_ref().and_then(|s| s.parse().ok()),
                    reset_description: None,
                })
            }
            _ => None,
        }
    });

    let secondary =
        response
            .rate_limit
            .as_ref()
            .and_then(|rl| match (rl.tokens_remaining, rl.tokens_limit) {
                (Some(remaining), Some(limit)) if limit > 0 => {
                    let used_percent = ((limit - remaining) as f64 / limit as f64) * 100.0;
                    Some(RateWindow {
                        used_percent,
                        window_minutes: None,
                        resets_at: rl.resets_at.as_ref().and_then(|s| s.parse().ok()),
                        reset_description: None,
                    })
                }
                _ => None,
            });

    let identity = Some(ProviderIdentity {
        account_email: response.account.as_ref().and_then(|a| a.email.clone()),
        account_organization: response
            .account
            .as_ref()
            .and_then(|a| a.organization.clone()),
        login_method: Some("oauth".to_string()),
    });

    Ok(UsageSnapshot {
        primary,
        secondary,
        tertiary: None,
        updated_at: now,
        identity,
    })
}

/// Parse CLI limits output (text format).
fn parse_cli_limits_output(output: &str) -> Result<UsageSnapshot> {
    let now = Utc::now();

    // Parse text output like:
    // "Requests: 45/100 remaining (55% used)"
    // "Tokens: 90000/100000 remaining (10% used)"
    let mut primary = None;
    let mut secondary = None;

    for line in output.lines() {
        let line = line.trim().to_lowercase();
        if line.contains("request") {
            if let Some(pct) = extract_percent(&line) {
                primary = Some(RateWindow {
                    used_percent: pct,
                    window_minutes: None,
                    resets_at: None,
                    reset_description: None,
                });
            }
        } else if line.contains("token") {
            if let Some(pct) = extract_percent(&line) {
                secondary = Some(RateWindow {
                    used_percent: pct,
                    window_minutes: None,
                    resets_at: None,
                    reset_description: None,
                });
            }
        }
    }

    Ok(UsageSnapshot {
        primary,
        secondary,
        tertiary: None,
        updated_at: now,
        identity: Some(ProviderIdentity {
            account_email: None,
            account_organization: None,
            login_method: Some("cli".to_string()),
        }),
    })
}

/// Extract percentage from a line like "55% used" or "(55%)".
fn extract_percent(line: &str) -> Option<f64> {
    // Find a number followed by %
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_digit() {
            let mut num_str = String::from(c);
            while let Some(&next) = chars.peek() {
                if next.is_ascii_digit() || next == '.' {
                    num_str.push(chars.next().unwrap());
                } else {
                    break;
                }
            }
            if chars.peek() == Some(&'%') {
                return num_str.parse().ok();
            }
        }
    }
    None
}

/// Get the CLI version.
async fn get_cli_version() -> Result<String> {
    let output = run_command(CLI_NAME, &["--version"], CLI_TIMEOUT).await?;

    if output.success() {
        // Parse version from output
        let version = output
            .stdout
            .trim()
            .split_whitespace()
            .last()
            .unwrap_or("unknown")
            .to_string();
        Ok(version)
    } else {
        Err(CautError::FetchFailed {
            provider: "claude".to_string(),
            reason: "Failed to get version".to_string(),
        })
    }
}

/// Store OAuth token in keyring.
///
/// # Errors
///
/// Returns error if keyring access fails.
pub fn store_oauth_token(token: &str) -> Result<()> {
    let entry = keyring::Entry::new("caut", "claude-oauth-token")
        .map_err(|e| CautError::Config(format!("Keyring error: {}", e)))?;

    entry
        .set_password(token)
        .map_err(|e| CautError::Config(format!("Failed to store token: {}", e)))
}

/// Delete OAuth token from keyring.
///
/// # Errors
///
/// Returns error if keyring access fails.
pub fn delete_oauth_token() -> Result<()> {
    let entry = keyring::Entry::new("caut", "claude-oauth-token")
        .map_err(|e| CautError::Config(format!("Keyring error: {}", e)))?;

    entry
        .delete_credential()
        .map_err(|e| CautError::Config(format!("Failed to delete token: {}", e)))
}
