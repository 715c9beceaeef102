//! Persisted provider configuration and app preferences.
//!
//! Stored as a single JSON document under [`crate::storage::paths::AppPaths`]'s
//! config directory, written atomically (temp file + rename) so a crash or
//! concurrent reader never observes a half-written file, since the daemon
//! can be asked to persist config while a refresh is in flight.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::core::usage_types::{AppPreferences, ProviderConfig};
use crate::error::{CautError, Result};
use crate::storage::paths::AppPaths;

/// The on-disk document: provider configs plus app-wide preferences.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
struct ConfigDocument {
    #[serde(default)]
    providers: Vec<ProviderConfig>,
    #[serde(default)]
    preferences: AppPreferences,
}

/// Reads and writes the daemon's persisted configuration.
pub struct ConfigStore {
    path: PathBuf,
    document: ConfigDocument,
}

impl ConfigStore {
    /// Load from the default config path, or from an empty document if the
    /// file doesn't exist yet.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let path = AppPaths::new().config.join("daemon-config.json");
        Self::load_from(&path)
    }

    /// Load from a specific path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        let document = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            ConfigDocument::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            document,
        })
    }

    /// All known provider configs, in insertion order.
    #[must_use]
    pub fn providers(&self) -> &[ProviderConfig] {
        &self.document.providers
    }

    /// Current app preferences.
    #[must_use]
    pub const fn preferences(&self) -> &AppPreferences {
        &self.document.preferences
    }

    /// Insert or replace a provider's config, keyed by `provider_id`.
    pub fn upsert_provider(&mut self, config: ProviderConfig) {
        if let Some(existing) = self
            .document
            .providers
            .iter_mut()
            .find(|p| p.provider_id == config.provider_id)
        {
            *existing = config;
        } else {
            self.document.providers.push(config);
        }
    }

    /// Remove a provider's config, if present. Returns whether one existed.
    pub fn remove_provider(&mut self, provider_id: &str) -> bool {
        let before = self.document.providers.len();
        self.document.providers.retain(|p| p.provider_id != provider_id);
        self.document.providers.len() != before
    }

    /// Look up one provider's config by id.
    #[must_use]
    pub fn get_provider(&self, provider_id: &str) -> Option<&ProviderConfig> {
        self.document.providers.iter().find(|p| p.provider_id == provider_id)
    }

    /// Replace the full provider list, e.g. after a discovery pass.
    pub fn replace_providers(&mut self, providers: Vec<ProviderConfig>) {
        self.document.providers = providers;
    }

    /// Update app preferences.
    pub fn set_preferences(&mut self, preferences: AppPreferences) {
        self.document.preferences = preferences;
    }

    /// Persist the current document atomically: write to a temp file in
    /// the same directory, then rename over the target path so a reader
    /// never observes a partial write.
    ///
    /// # Errors
    /// Returns an error if the parent directory cannot be created,
    /// serialization fails, or the temp file cannot be written or renamed.
    pub fn save(&self) -> Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| CautError::StorageError {
                message: "config path has no parent directory".to_string(),
            })?;
        std::fs::create_dir_all(parent)?;

        let content = serde_json::to_string_pretty(&self.document)?;

        let mut temp = NamedTempFile::new_in(parent)
            .map_err(|e| CautError::StorageError {
                message: format!("failed to create temp config file: {e}"),
            })?;
        temp.write_all(content.as_bytes())
            .map_err(|e| CautError::StorageError {
                message: format!("failed to write temp config file: {e}"),
            })?;
        temp.persist(&self.path).map_err(|e| CautError::StorageError {
            message: format!("failed to persist config file: {e}"),
        })?;

        tracing::debug!(path = ?self.path, "daemon config saved");
        Ok(())
    }
}
