//! Credential discovery.
//!
//! Walks the same ordered sources each provider module already probes for
//! credentials (env vars, keyring entries, provider CLI config directories,
//! CLI binaries on `PATH`, a user-editable manifest) and turns "a credential
//! exists" into "this provider should be enabled by default", without
//! reading the credential contents themselves beyond the api-key value
//! itself. Discovery never fails outright and never performs network I/O:
//! a source that errors is logged and skipped, since a missing credential
//! for one provider must not block startup for the rest. Later sources
//! never overwrite a non-empty `auth_source`/`api_key` an earlier source
//! already found.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::core::provider::Provider;
use crate::core::usage_types::{ConfigType, ProviderConfig};

/// Keyring service name used across provider modules.
const KEYRING_SERVICE: &str = "caut";

/// Env var names mapped to the provider id they configure. Multiple names
/// may map to the same provider (e.g. `ANTHROPIC_API_KEY` and
/// `CLAUDE_API_KEY` both configure `claude`) — this list is the crate's
/// env-var contract (adding an alias is backward compatible; removing one
/// is not).
const ENV_VAR_TABLE: &[(&str, &str)] = &[
    ("ANTHROPIC_API_KEY", "claude"),
    ("CLAUDE_API_KEY", "claude"),
    ("OPENAI_API_KEY", "codex"),
    ("CODEX_API_KEY", "codex"),
    ("GEMINI_API_KEY", "gemini"),
    ("GOOGLE_API_KEY", "gemini"),
    ("CURSOR_API_KEY", "cursor"),
    ("ZAI_API_KEY", "zai"),
    ("MINIMAX_API_KEY", "minimax"),
    ("KIMI_API_KEY", "kimi"),
    ("GITHUB_COPILOT_TOKEN", "copilot"),
];

/// Discover which providers have usable credentials on this machine and
/// build a default [`ProviderConfig`] for each, seeded so every known
/// provider is always represented (disabled if nothing was found).
///
/// # Errors
/// Never fails; a per-source I/O problem degrades that source to "not
/// found" rather than aborting discovery for other providers.
#[must_use]
pub fn discover() -> Vec<ProviderConfig> {
    discover_with_manifest(default_manifest_path().as_deref())
}

/// Same as [`discover`] but lets callers (and tests) point at a specific
/// user-editable providers manifest rather than the default location.
#[must_use]
pub fn discover_with_manifest(manifest_path: Option<&Path>) -> Vec<ProviderConfig> {
    let mut by_id: HashMap<String, ProviderConfig> = Provider::ALL
        .iter()
        .map(|&provider| (provider.cli_name().to_string(), seed(provider)))
        .collect();

    apply_env_vars(&mut by_id);
    apply_keyring(&mut by_id);
    apply_config_dirs(&mut by_id);
    apply_system_cli(&mut by_id);

    let mut configs: Vec<ProviderConfig> = Provider::ALL
        .iter()
        .filter_map(|p| by_id.remove(p.cli_name()))
        .collect();

    if let Some(path) = manifest_path {
        configs.extend(apply_manifest(path, &configs));
    }

    configs
}

fn seed(provider: Provider) -> ProviderConfig {
    let mut config = ProviderConfig::empty(provider.cli_name());
    config.config_type = if provider.is_quota_based() {
        ConfigType::QuotaBased
    } else {
        ConfigType::PayAsYouGo
    };
    config
}

fn set_if_empty(config: &mut ProviderConfig, auth_source: String, api_key: Option<String>) {
    if config.auth_source.is_some() {
        return;
    }
    config.auth_source = Some(auth_source);
    if api_key.is_some() {
        config.api_key = api_key;
    }
}

fn apply_env_vars(by_id: &mut HashMap<String, ProviderConfig>) {
    for (var, provider_id) in ENV_VAR_TABLE {
        if let Ok(value) = std::env::var(var) {
            if value.is_empty() {
                continue;
            }
            if let Some(config) = by_id.get_mut(*provider_id) {
                set_if_empty(config, format!("env:{var}"), Some(value));
            }
        }
    }
}

fn apply_keyring(by_id: &mut HashMap<String, ProviderConfig>) {
    for provider in Provider::ALL {
        let Some(keyring_key) = keyring_key_for(*provider) else {
            continue;
        };
        if let Some(password) = keyring_password(keyring_key) {
            if let Some(config) = by_id.get_mut(provider.cli_name()) {
                set_if_empty(config, format!("keyring:{keyring_key}"), Some(password));
            }
        }
    }
}

fn apply_config_dirs(by_id: &mut HashMap<String, ProviderConfig>) {
    for provider in Provider::ALL {
        let Some(config_dir) = provider_config_dir(*provider) else {
            continue;
        };
        if config_dir.exists() {
            if let Some(config) = by_id.get_mut(provider.cli_name()) {
                set_if_empty(config, format!("discovered:{}", config_dir.display()), None);
            }
        }
    }
}

fn apply_system_cli(by_id: &mut HashMap<String, ProviderConfig>) {
    for provider in Provider::system_providers() {
        if which::which(provider.cli_name()).is_ok() {
            if let Some(config) = by_id.get_mut(provider.cli_name()) {
                set_if_empty(config, "cli".to_string(), None);
            }
        }
    }
}

/// Entries in the user-editable providers manifest: `{"providers": ["my-custom-id", ...]}`.
#[derive(serde::Deserialize)]
struct ProvidersManifest {
    #[serde(default)]
    providers: Vec<String>,
}

fn apply_manifest(path: &Path, existing: &[ProviderConfig]) -> Vec<ProviderConfig> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    let Ok(manifest) = serde_json::from_str::<ProvidersManifest>(&content) else {
        tracing::warn!(path = %path.display(), "providers manifest present but not valid JSON");
        return Vec::new();
    };

    manifest
        .providers
        .into_iter()
        .filter(|id| !existing.iter().any(|c| &c.provider_id == id))
        .map(ProviderConfig::empty)
        .collect()
}

fn default_manifest_path() -> Option<PathBuf> {
    Some(crate::storage::paths::AppPaths::new().config.join("providers-manifest.json"))
}

fn keyring_key_for(provider: Provider) -> Option<&'static str> {
    match provider {
        Provider::Claude => Some("claude-oauth-token"),
        _ => None,
    }
}

fn keyring_password(key: &str) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, key)
        .ok()
        .and_then(|entry| entry.get_password().ok())
}

fn provider_config_dir(provider: Provider) -> Option<PathBuf> {
    let home = directories::BaseDirs::new()?.home_dir().to_path_buf();
    let dirname = match provider {
        Provider::Claude => ".claude",
        Provider::Codex => ".codex",
        Provider::Gemini => ".gemini",
        _ => return None,
    };
    Some(home.join(dirname))
}

/// Recursively scan a JSON value for the first string value under `key`,
/// including keys whose value is itself a JSON document encoded as a
/// string (the "roo config blob embedded inside another JSON document"
/// shape some third-party tool config files use).
#[must_use]
pub fn find_nested_json_string(value: &serde_json::Value, key: &str) -> Option<String> {
    match value {
        serde_json::Value::Object(map) => {
            if let Some(serde_json::Value::String(s)) = map.get(key) {
                return Some(s.clone());
            }
            for (k, v) in map {
                if k == key {
                    continue;
                }
                if let serde_json::Value::String(s) = v {
                    // Try parsing the string as embedded JSON and recurse.
                    if let Ok(inner) = serde_json::from_str::<serde_json::Value>(s) {
                        if let Some(found) = find_nested_json_string(&inner, key) {
                            return Some(found);
                        }
                    }
                } else if let Some(found) = find_nested_json_string(v, key) {
                    return Some(found);
                }
            }
            None
        }
        serde_json::Value::Array(items) => items.iter().find_map(|v| find_nested_json_string(v, key)),
        _ => None,
    }
}
