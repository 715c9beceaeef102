//! Codex (OpenAI) provider implementation.
//!
//! Supports:
//! - Web dashboard scraping (macOS only)
//! - CLI local config (auth.json with JWT tokens)
//! - CLI RPC
//!
//! Source labels: `openai-web`, `codex-cli`
//!
//! The CLI local config reads identity and subscription info from
//! `~/.codex/auth.json`, which contains JWT tokens with embedded claims
//! about the user's plan type and subscription status.

use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use serde::Deserialize;

use crate::core::cli_runner::{CLI_TIMEOUT, run_command, run_json_command};
use crate::core::fetch_plan::{FetchKind, FetchPlan, FetchStrategy};
use crate::core::models::{CreditsSnapshot, ProviderIdentity, RateWindow, UsageSnapshot};
use crate::core::provider::Provider;
use crate::error::{CautError, Result};

/// Source label for web dashboard.
pub const SOURCE_WEB: &str = "openai-web";

/// Source label for CLI.
pub const SOURCE_CLI: &str = "codex-cli";

/// CLI binary name.
const CLI_NAME: &str = "codex";

// =============================================================================
// Fetch Plan
// =============================================================================

/// Create fetch plan for Codex.
#[must_use]
pub fn fetch_plan() -> FetchPlan {
    FetchPlan::new(
        Provider::Codex,
        vec![
            FetchStrategy {
                id: "codex-web-dashboard",
                kind: FetchKind::WebDashboard,
                is_available: || {
                    // Web dashboard requires macOS with cookies
                    cfg!(target_os = "macos")
                },
                should_fallback: |_| true,
            },
            FetchStrategy {
                id: "codex-cli-rpc",
                kind: FetchKind::Cli,
                is_available: is_cli_available,
                should_fallback: |_| false,
            },
        ],
    )
}

/// Check if the Codex CLI is available.
fn is_cli_available() -> bool {
    which::which(CLI_NAME).is_ok()
}

// =============================================================================
// Local Config Types
// =============================================================================

/// Get the Codex config directory path.
fn get_codex_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().join(".codex"))
}

/// Auth.json structure from ~/.codex/auth.json
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct CodexAuthJson {
    #[serde(rename = "OPENAI_API_KEY")]
    #[serde(default)]
    openai_api_key: Option<String>,
    #[serde(default)]
    last_refresh: Option<String>,
    #[serde(default)]
    tokens: Option<CodexAuthTokens>,
}

/// OAuth tokens structure in auth.json
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct CodexAuthTokens {
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    account_id: Option<String>,
}

/// JWT claims from the id_token (decoded from base64).
/// Contains OpenAI-specific auth information.
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct JwtClaims {
    /// User email
    #[serde(default)]
    email: Option<String>,
    /// Email verified flag
    #[serde(default)]
    email_verified: Option<bool>,
    /// OpenAI-specific auth claims
    #[serde(default, rename = "https://api.openai.com/auth")]
    openai_auth: Option<OpenAiAuthClaims>,
}

/// OpenAI-specific claims embedded in JWT.
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct OpenAiAuthClaims {
    /// ChatGPT account ID
    #[serde(default)]
    chatgpt_account_id: Option<String>,
    /// Plan type (e.g., "pro", "plus", "free")
    #[serde(default)]
    chatgpt_plan_type: Option<String>,
    /// User ID
    #[serde(default)]
    chatgpt_user_id: Option<String>,
    /// Subscription active start date
    #[serde(default)]
    chatgpt_subscription_active_start: Option<String>,
    /// Subscription active until date
    #[serde(default)]
    chatgpt_subscription_active_until: Option<String>,
    /// Last subscription check timestamp
    #[serde(default)]
    chatgpt_subscription_last_checked: Option<String>,
    /// Organizations the user belongs to
    #[serde(default)]
    organizations: Option<Vec<OpenAiOrganization>>,
}

/// Organization info from JWT claims.
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct OpenAiOrganization {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    is_default: Option<bool>,
}

/// Read auth info from local ~/.codex/auth.json
fn read_local_auth() -> Option<CodexAuthJson> {
    let codex_dir = get_codex_dir()?;
    let auth_path = codex_dir.join("auth.json");

    if !auth_path.exists() {
        tracing::debug!("Codex auth.json not found at {:?}", auth_path);
        return None;
    }

    let content = fs::read_to_string(&auth_path).ok()?;
    serde_json::from_str(&content).ok()
}

/// Check if user is authenticated with Codex
fn is_authenticated() -> bool {
    read_local_auth()
        .map(|auth| auth.openai_api_key.is_some() || auth.tokens.is_some())
        .unwrap_or(false)
}

/// Decode JWT payload (the middle part between the two dots).
/// JWTs are base64url encoded, so we need to handle URL-safe base64.
fn decode_jwt_payload(token: &str) -> Option<JwtClaims> {
    // JWT format: header.payload.signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        tracing::debug!("Invalid JWT format: expected 3 parts");
        return None;
    }

    let payload = parts[1];

    // Base64url decode: replace - with + and _ with /
    let mut payload_std = payload.replace('-', "+").replace('_', "/");

    // Add padding if needed
    let padding = (4 - payload_std.len() % 4) % 4;
    for _ in 0..padding {
        payload_std.push('=');
    }

    // Decode base64
    let decoded = match base64_decode(&payload_std) {
        Some(d) => d,
        None => {
            tracing::debug!("Failed to decode JWT payload as base64");
            return None;
        }
    };

    // Parse JSON
    match serde_json::from_slice::<JwtClaims>(&decoded) {
        Ok(claims) => Some(claims),
        Err(e) => {
            tracing::debug!(error = %e, "Failed to parse JWT claims as JSON");
            None
        }
    }
}

/// Simple base64 decoder (standard alphabet with padding).
fn base64_decode(input: &str) -> Option<Vec<u8>> {
    const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

    let mut result = Vec::new();
    let mut buffer: u32 = 0;
    let mut bits_collected = 0;

    for c in input.bytes() {
        if c == b'=' {
            break;
        }

        let value = ALPHABET.iter().position(|&x| x == c)?;
        buffer = (buffer << 6) | (value as u32);
        bits_collected += 6;

        if bits_collected >= 8 {
            bits_collected -= 8;
            result.push((buffer >> bits_collected) as u8);
            buffer &= (1 << bits_collected) - 1;
        }
    }

    Some(result)
}

/// Extract identity info from local auth.json (including JWT claims).
fn get_local_identity() -> Option<(ProviderIdentity, Option<SubscriptionInfo>)> {
    let auth = read_local_auth()?;

    // Try to extract from JWT token first
    if let Some(tokens) = &auth.tokens {
        if let Some(id_token) = &tokens.id_token {
            if let Some(claims) = decode_jwt_payload(id_token) {
                let openai_auth = claims.openai_auth.as_ref();

                // Extract organization name from default org
                let org_name = openai_auth.and_then(|a| {
                    a.organizations.as_ref().and_then(|orgs| {
                        orgs.iter()
                            .find(|o| o.is_default == Some(true))
                            .and_then(|o| o.title.clone())
                    })
                });

                let identity = ProviderIdentity {
                    account_email: claims.email.clone(),
                    account_organization: org_name,
                    login_method: Some("oauth".to_string()),
                };

                // Extract subscription info
                let subscription = openai_auth.map(|a| SubscriptionInfo {
                    plan_type: a.chatgpt_plan_type.clone(),
                    active_start: a.chatgpt_subscription_active_start.clone(),
                    active_until: a.chatgpt_subscription_active_until.clone(),
                    last_checked: a.chatgpt_subscription_last_checked.clone(),
                });

                tracing::debug!(
                    email = ?claims.email,
                    plan = ?openai_auth.and_then(|a| a.chatgpt_plan_type.as_ref()),
                    "Extracted identity from JWT"
                );

                return Some((identity, subscription));
            }
        }

        // Fallback: just return account_id if available
        if let Some(account_id) = &tokens.account_id {
            return Some((
                ProviderIdentity {
                    account_email: None,
                    account_organization: Some(account_id.clone()),
                    login_method: Some("oauth-partial".to_string()),
                },
                None,
            ));
        }
    }

    // API key auth (no identity info available)
    if auth.openai_api_key.is_some() {
        return Some((
            ProviderIdentity {
                account_email: None,
                account_organization: None,
                login_method: Some("api-key".to_string()),
            },
            None,
        ));
    }

    None
}

/// Subscription information extracted from JWT.
#[derive(Debug)]
#[allow(dead_code)]
struct SubscriptionInfo {
    plan_type: Option<String>,
    active_start: Option<String>,
    active_until: Option<String>,
    last_checked: Option<String>,
}

// =============================================================================
// CLI Response Types
// =============================================================================

/// Response from `codex --rate-limit` or similar.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CodexRateLimitResponse {
    #[serde(default)]
    rate_limit: Option<CodexRateLimit>,
    #[serde(default)]
    credits: Option<CodexCredits>,
    #[serde(default)]
    user: Option<CodexUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CodexRateLimit {
    #[serde(default)]
    remaining_percent: Option<f64>,
    #[serde(default)]
    resets_at: Option<String>,
    #[serde(default)]
    weekly_remaining_percent: Option<f64>,
    #[serde(default)]
    weekly_resets_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CodexCredits {
    #[serde(default)]
    remaining: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
struct CodexUser {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    plan: Option<String>,
}

// =============================================================================
// Fetch Implementations
// =============================================================================

/// Fetch usage via web dashboard.
///
/// This requires macOS with browser cookies available.
pub async fn fetch_web_dashboard() -> Result<UsageSnapshot> {
    #[cfg(not(target_os = "macos"))]
    {
        Err(CautError::UnsupportedSource {
            provider: "codex".to_string(),
            source_type: "web".to_string(),
        })
    }

    #[cfg(target_os = "macos")]
    {
        // TODO: Implement actual web dashboard scraping
        // This would involve:
        // 1. Reading browser cookies
        // 2. Making authenticated request to OpenAI dashboard
        // 3. Parsing the response
        Err(CautError::FetchFailed {
            provider: "codex".to_string(),
            reason: "Web dashboard scraping not yet implemented".to_string(),
        })
    }
}

/// Fetch usage via CLI.
///
/// Reads identity and subscription info from local auth.json file.
/// The auth.json contains JWT tokens with embedded claims about
/// the user's plan type and subscription status.
///
/// Note: The Codex CLI doesn't expose rate limit commands directly.
/// Rate limit data would need to come from OpenAI API or web dashboard.
pub async fn fetch_cli() -> Result<UsageSnapshot> {
    // First check version to confirm CLI is working
    let version = get_cli_version().await.ok();
    let now = Utc::now();

    tracing::debug!(
        ?version,
        cli_available = is_cli_available(),
        authenticated = is_authenticated(),
        "Codex CLI fetch starting"
    );

    // Try JSON output if available (Codex CLI may add rate-limit commands in the future)
    if let Ok(response) = try_json_rate_limit().await {
        return parse_rate_limit_response(response, version);
    }

    // Extract identity from local auth.json (includes JWT decoding)
    let (identity, subscription) = match get_local_identity() {
        Some((id, sub)) => {
            tracing::debug!(
                email = ?id.account_email,
                org = ?id.account_organization,
                login_method = ?id.login_method,
                plan = ?sub.as_ref().and_then(|s| s.plan_type.as_ref()),
                "Extracted identity from local auth.json"
            );
            (Some(id), sub)
        }
        None => {
            tracing::debug!("No identity found in local auth.json");
            (
                Some(ProviderIdentity {
                    account_email: None,
                    account_organization: None,
                    login_method: Some("cli-unauthenticated".to_string()),
                }),
                None,
            )
        }
    };

    // Log subscription info if available
    if let Some(ref sub) = subscription {
        tracing::info!(
            plan = ?sub.plan_type,
            until = ?sub.active_until,
            "Codex subscription info"
        );
    }

    // Return snapshot with identity info
    // Note: Rate limit data is not available via CLI - would need API access
    Ok(UsageSnapshot {
        primary: None,
        secondary: None,
        tertiary: None,
        updated_at: now,
        identity,
    })
}

/// Try to get rate limit via JSON output.
async fn try_json_rate_limit() -> Result<CodexRateLimitResponse> {
    // Try various command patterns that CLI tools commonly use
    // The actual command depends on the Codex CLI implementation
    let commands = [
        &["rate-limit", "--json"][..],
        &["status", "--json"][..],
        &["usage", "--json"][..],
    ];

    for args in commands {
        if let Ok(response) =
            run_json_command::<CodexRateLimitResponse>(CLI_NAME, args, CLI_TIMEOUT).await
        {
            return Ok(response);
        }
    }

    Err(CautError::FetchFailed {
        provider: "codex".to_string(),
        reason: "No rate limit command found".to_string(),
    })
}

/// Parse rate limit response into UsageSnapshot.
fn parse_rate_limit_response(
    response: CodexRateLimitResponse,
    _version: Option<String>,
) -> Result<UsageSnapshot> {
    let now = Utc::now();

    let primary = response.rate_limit.as_ref().and_then(|rl| {
        rl.remaining_percent.map(|pct| {
            let used = 100.0 - pct;
            RateWindow {
                used_percent: used,
                window_minutes: None,
                resets_at: rl.resets_at.as_ref().and_then(|s| s.parse().ok()),
                reset_description: None,
            }
        })
    });

    let secondary = response.rate_limit.as_ref().and_then(|rl| {
        rl.weekly_remaining_percent.map(|pct| {
            let used = 100.0 - pct;
            RateWindow {
                used_percent: used,
                window_minutes: Some(10080), // 7 days in minutes
                resets_at: rl.weekly_resets_at.as_ref().and_then(|s| s.parse().ok()),
                reset_description: None,
            }
        })
    });

    let identity = Some(ProviderIdentity {
        account_email: response.user.as_ref().and_then(|u| u.email.clone()),
        account_organization: None,
        login_method: Some("cli".to_string()),
    });

    Ok(UsageSnapshot {
        primary,
        secondary,
        tertiary: None,
        updated_at: now,
        identity,
    })
}

/// Get the CLI version.
async fn get_cli_version() -> Result<String> {
    let output = run_command(CLI_NAME, &["--version"], CLI_TIMEOUT).await?;

    if output.success() {
        // Parse version from output like "codex 0.6.0" or "0.6.0"
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
            provider: "codex".to_string(),
            reason: "Failed to get version".to_string(),
        })
    }
}

/// Get credits information.
pub async fn fetch_credits() -> Result<CreditsSnapshot> {
    // Try to get credits from the CLI
    if let Ok(response) = try_json_rate_limit().await {
        if let Some(credits) = response.credits {
            if let Some(remaining) = credits.remaining {
                return Ok(CreditsSnapshot {
                    remaining,
                    events: vec![],
                    updated_at: Utc::now(),
                });
            }
        }
    }

    Err(CautError::FetchFailed {
        provider: "codex".to_string(),
        reason: "No credits data available".to_string(),
    })
}
