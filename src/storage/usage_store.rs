//! The embedded relational store for provider configs, history, raw
//! snapshots, and reset events — the spec's `UsageStore` component.
//!
//! Built directly on `rusqlite` against the `providers`/`provider_history`/
//! `raw_snapshots`/`reset_events` tables added by migration 4
//! (`migrations/004_provider_history.sql`), reusing
//! [`crate::storage::history_schema::run_migrations`] for schema setup. A
//! single `Mutex<Connection>` enforces the single-writer discipline the
//! data model calls for; readers go through the same mutex since
//! `rusqlite::Connection` is not `Sync`, but writes are brief so
//! contention is not a concern.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rusqlite::{Connection, params};

use crate::core::usage_types::{HistoryRow, ProviderConfig, ProviderUsage, RawSnapshot, ResetEvent};
use crate::error::{CautError, Result};
use crate::storage::history_schema::run_migrations;

/// Default retention window for raw snapshots (24 hours, per spec §3).
pub const DEFAULT_RAW_SNAPSHOT_RETENTION: ChronoDuration = ChronoDuration::hours(24);

/// How many times to retry a write on "database is locked" before giving up.
const WRITE_RETRY_ATTEMPTS: u32 = 5;

/// The spec's `UsageStore`: providers, history, raw snapshots, reset events.
pub struct UsageStore {
    conn: Mutex<Connection>,
}

impl UsageStore {
    /// Open (creating if absent) the usage store database at `path`,
    /// running schema migrations.
    ///
    /// # Errors
    /// Returns an error if the parent directory cannot be created, the
    /// database cannot be opened, or migrations fail.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut conn = Connection::open(path)
            .map_err(|e| CautError::StorageError { message: format!("open usage store: {e}") })?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| CautError::StorageError { message: format!("enable WAL: {e}") })?;
        run_migrations(&mut conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory store (for testing).
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrations fail.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()
            .map_err(|e| CautError::StorageError { message: format!("open in-memory store: {e}") })?;
        run_migrations(&mut conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Insert or update a provider's persisted config, keyed by
    /// `provider_id`. Retries briefly on "database is locked".
    ///
    /// # Errors
    /// Returns [`CautError::StorageError`] if the write fails after retrying.
    pub fn upsert_provider(&self, config: &ProviderConfig, display_name: &str) -> Result<()> {
        let conn = self.lock();
        let config_json = serde_json::to_string(config)?;
        with_retry(|| {
            conn.execute(
                "INSERT INTO providers (id, display_name, enabled, config_json, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5) \
                 ON CONFLICT(id) DO UPDATE SET \
                    display_name = excluded.display_name, \
                    enabled = excluded.enabled, \
                    config_json = excluded.config_json, \
                    updated_at = excluded.updated_at",
                params![
                    config.provider_id,
                    display_name,
                    i64::from(config.is_active()),
                    config_json,
                    Utc::now().to_rfc3339(),
                ],
            )
        })?;
        Ok(())
    }

    /// Remove a provider's persisted config. Idempotent.
    ///
    /// # Errors
    /// Returns [`CautError::StorageError`] if the write fails after retrying.
    pub fn remove_provider(&self, provider_id: &str) -> Result<()> {
        let conn = self.lock();
        with_retry(|| conn.execute("DELETE FROM providers WHERE id = ?1", params![provider_id]))?;
        Ok(())
    }

    /// All persisted provider configs.
    ///
    /// # Errors
    /// Returns [`CautError::StorageError`] if the query fails.
    pub fn all_providers(&self) -> Result<Vec<ProviderConfig>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare("SELECT config_json FROM providers ORDER BY id")
            .map_err(|e| CautError::StorageError { message: e.to_string() })?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| CautError::StorageError { message: e.to_string() })?;
        let mut out = Vec::new();
        for row in rows {
            let json = row.map_err(|e| CautError::StorageError { message: e.to_string() })?;
            out.push(serde_json::from_str(&json)?);
        }
        Ok(out)
    }

    /// Append a batch of usage readings from one refresh cycle as history
    /// rows. Each reading must already satisfy the detail contract; the
    /// caller (the refresh scheduler) is responsible for validating before
    /// calling this.
    ///
    /// # Errors
    /// Returns [`CautError::StorageError`] if the transaction fails.
    pub fn append_history(&self, usages: &[ProviderUsage]) -> Result<Vec<i64>> {
        let mut conn = self.lock();
        let tx = conn
            .transaction()
            .map_err(|e| CautError::StorageError { message: e.to_string() })?;
        let mut ids = Vec::with_capacity(usages.len());
        for usage in usages {
            let usage_json = serde_json::to_string(usage)?;
            tx.execute(
                "INSERT INTO provider_history (provider_id, captured_at, usage_json) VALUES (?1, ?2, ?3)",
                params![usage.provider_id, usage.fetched_at.to_rfc3339(), usage_json],
            )
            .map_err(|e| CautError::StorageError { message: e.to_string() })?;
            ids.push(tx.last_insert_rowid());
        }
        tx.commit().map_err(|e| CautError::StorageError { message: e.to_string() })?;
        Ok(ids)
    }

    /// Append a raw response snapshot for debugging.
    ///
    /// # Errors
    /// Returns [`CautError::StorageError`] if the insert fails.
    pub fn store_raw_snapshot(&self, snapshot: &RawSnapshot) -> Result<()> {
        let conn = self.lock();
        with_retry(|| {
            conn.execute(
                "INSERT INTO raw_snapshots (provider_id, captured_at, source, raw_body) VALUES (?1, ?2, ?3, ?4)",
                params![
                    snapshot.provider_id,
                    snapshot.fetched_at.to_rfc3339(),
                    snapshot.http_status,
                    snapshot.raw_json,
                ],
            )
        })?;
        Ok(())
    }

    /// Append a detected reset event.
    ///
    /// # Errors
    /// Returns [`CautError::StorageError`] if the insert fails.
    pub fn store_reset_event(&self, event: &ResetEvent) -> Result<()> {
        let conn = self.lock();
        let detail_type = serde_json::to_string(&event.reset_type)?;
        with_retry(|| {
            conn.execute(
                "INSERT INTO reset_events (provider_id, detail_type, detected_at, previous_pct, current_pct) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    event.provider_id,
                    detail_type.trim_matches('"'),
                    event.timestamp.to_rfc3339(),
                    event.previous_percentage,
                    event.new_percentage,
                ],
            )
        })?;
        Ok(())
    }

    /// The latest history row per provider.
    ///
    /// `include_inactive`: when false (the default client behavior), only
    /// the most recent row whose embedded `ProviderUsage.is_available` is
    /// true is returned per provider, so a transient outage doesn't blank
    /// out the UI. When true, the single most recent row regardless of
    /// availability is returned.
    ///
    /// # Errors
    /// Returns [`CautError::StorageError`] if the query fails.
    pub fn latest_per_provider(&self, include_inactive: bool) -> Result<Vec<HistoryRow>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, provider_id, captured_at, usage_json FROM provider_history \
                 ORDER BY provider_id, captured_at DESC, id DESC",
            )
            .map_err(|e| CautError::StorageError { message: e.to_string() })?;
        let rows = stmt
            .query_map([], map_history_row)
            .map_err(|e| CautError::StorageError { message: e.to_string() })?;

        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for row in rows {
            let row = row.map_err(|e| CautError::StorageError { message: e.to_string() })?;
            let row = row?;
            if !include_inactive && !row.usage.is_available {
                continue;
            }
            if seen.insert(row.provider_id.clone()) {
                out.push(row);
            }
        }
        Ok(out)
    }

    /// The most recent reading for one provider, honoring the same
    /// `include_inactive` semantics as [`Self::latest_per_provider`].
    ///
    /// # Errors
    /// Returns [`CautError::StorageError`] if the query fails.
    pub fn latest_for_provider(
        &self,
        provider_id: &str,
        include_inactive: bool,
    ) -> Result<Option<HistoryRow>> {
        Ok(self
            .latest_per_provider(include_inactive)?
            .into_iter()
            .find(|row| row.provider_id == provider_id))
    }

    /// Most-recent-first history for one provider, capped at `limit`.
    ///
    /// # Errors
    /// Returns [`CautError::StorageError`] if the query fails.
    pub fn history_by_provider(&self, provider_id: &str, limit: u32) -> Result<Vec<HistoryRow>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, provider_id, captured_at, usage_json FROM provider_history \
                 WHERE provider_id = ?1 ORDER BY captured_at DESC, id DESC LIMIT ?2",
            )
            .map_err(|e| CautError::StorageError { message: e.to_string() })?;
        let rows = stmt
            .query_map(params![provider_id, i64::from(limit)], map_history_row)
            .map_err(|e| CautError::StorageError { message: e.to_string() })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| CautError::StorageError { message: e.to_string() })??);
        }
        Ok(out)
    }

    /// Most-recent-first history across all providers, capped at `limit`.
    ///
    /// # Errors
    /// Returns [`CautError::StorageError`] if the query fails.
    pub fn recent_history(&self, limit: u32) -> Result<Vec<HistoryRow>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, provider_id, captured_at, usage_json FROM provider_history \
                 ORDER BY captured_at DESC, id DESC LIMIT ?1",
            )
            .map_err(|e| CautError::StorageError { message: e.to_string() })?;
        let rows = stmt
            .query_map(params![i64::from(limit)], map_history_row)
            .map_err(|e| CautError::StorageError { message: e.to_string() })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| CautError::StorageError { message: e.to_string() })??);
        }
        Ok(out)
    }

    /// Reset events for a provider within the last `hours`, ascending by
    /// timestamp.
    ///
    /// # Errors
    /// Returns [`CautError::StorageError`] if the query fails.
    pub fn recent_reset_events(&self, provider_id: &str, hours: i64) -> Result<Vec<ResetEvent>> {
        let conn = self.lock();
        let cutoff = (Utc::now() - ChronoDuration::hours(hours)).to_rfc3339();
        let mut stmt = conn
            .prepare(
                "SELECT provider_id, detail_type, detected_at, previous_pct, current_pct \
                 FROM reset_events WHERE provider_id = ?1 AND detected_at >= ?2 \
                 ORDER BY detected_at ASC",
            )
            .map_err(|e| CautError::StorageError { message: e.to_string() })?;
        let rows = stmt
            .query_map(params![provider_id, cutoff], map_reset_event)
            .map_err(|e| CautError::StorageError { message: e.to_string() })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| CautError::StorageError { message: e.to_string() })??);
        }
        Ok(out)
    }

    /// Whether a reset event for `provider_id` at exactly `timestamp` has
    /// already been recorded, so the scheduler never inserts the same
    /// detected reset twice across consecutive ticks (the pair that
    /// produced it stays inside the lookback window for several cycles).
    ///
    /// # Errors
    /// Returns [`CautError::StorageError`] if the query fails.
    pub fn has_reset_event(&self, provider_id: &str, timestamp: DateTime<Utc>) -> Result<bool> {
        let conn = self.lock();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM reset_events WHERE provider_id = ?1 AND detected_at = ?2",
                params![provider_id, timestamp.to_rfc3339()],
                |row| row.get(0),
            )
            .map_err(|e| CautError::StorageError { message: e.to_string() })?;
        Ok(count > 0)
    }

    /// A bounded, per-provider sampling window for analytics: up to
    /// `max_per_provider` rows per provider from the last `lookback_hours`,
    /// newest-first during the query but returned oldest-first, as
    /// analytics (linear regression, anomaly detection) expects
    /// chronological order.
    ///
    /// # Errors
    /// Returns [`CautError::StorageError`] if the query fails.
    pub fn window_samples(
        &self,
        provider_ids: &[String],
        lookback_hours: i64,
        max_per_provider: u32,
    ) -> Result<Vec<HistoryRow>> {
        let conn = self.lock();
        let cutoff = (Utc::now() - ChronoDuration::hours(lookback_hours)).to_rfc3339();
        let mut out = Vec::new();
        for provider_id in provider_ids {
            let mut stmt = conn
                .prepare(
                    "SELECT id, provider_id, captured_at, usage_json FROM provider_history \
                     WHERE provider_id = ?1 AND captured_at >= ?2 \
                     ORDER BY captured_at DESC, id DESC LIMIT ?3",
                )
                .map_err(|e| CautError::StorageError { message: e.to_string() })?;
            let rows = stmt
                .query_map(
                    params![provider_id, cutoff, i64::from(max_per_provider)],
                    map_history_row,
                )
                .map_err(|e| CautError::StorageError { message: e.to_string() })?;
            let mut provider_rows = Vec::new();
            for row in rows {
                provider_rows.push(row.map_err(|e| CautError::StorageError { message: e.to_string() })??);
            }
            provider_rows.reverse();
            out.extend(provider_rows);
        }
        Ok(out)
    }

    /// Trim raw snapshots older than [`DEFAULT_RAW_SNAPSHOT_RETENTION`].
    /// Safe to call after every refresh cycle.
    ///
    /// # Errors
    /// Returns [`CautError::StorageError`] if the delete fails.
    pub fn cleanup(&self) -> Result<usize> {
        let conn = self.lock();
        let cutoff = (Utc::now() - DEFAULT_RAW_SNAPSHOT_RETENTION).to_rfc3339();
        let deleted = with_retry(|| {
            conn.execute("DELETE FROM raw_snapshots WHERE captured_at < ?1", params![cutoff])
        })?;
        Ok(deleted)
    }

    /// `SQLite`-specific compaction. Safe to call after every refresh
    /// cycle; cheap when there's little to reclaim.
    ///
    /// # Errors
    /// Returns [`CautError::StorageError`] if the pragma/vacuum fails.
    pub fn optimize(&self) -> Result<()> {
        let conn = self.lock();
        conn.execute_batch("PRAGMA optimize;")
            .map_err(|e| CautError::StorageError { message: format!("optimize: {e}") })?;
        Ok(())
    }

    /// Whether the history table has any rows at all — used by the
    /// scheduler to decide between a first-run discovery pass and a
    /// system-providers-only warm-up.
    ///
    /// # Errors
    /// Returns [`CautError::StorageError`] if the query fails.
    pub fn is_history_empty(&self) -> Result<bool> {
        let conn = self.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM provider_history", [], |row| row.get(0))
            .map_err(|e| CautError::StorageError { message: e.to_string() })?;
        Ok(count == 0)
    }
}

fn with_retry<F>(mut op: F) -> Result<usize>
where
    F: FnMut() -> rusqlite::Result<usize>,
{
    let mut attempt = 0;
    loop {
        match op() {
            Ok(n) => return Ok(n),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::DatabaseBusy && attempt < WRITE_RETRY_ATTEMPTS =>
            {
                attempt += 1;
                std::thread::sleep(std::time::Duration::from_millis(20 * u64::from(attempt)));
            }
            Err(e) => return Err(CautError::StorageError { message: e.to_string() }),
        }
    }
}

fn map_history_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<HistoryRow>> {
    let id: i64 = row.get(0)?;
    let provider_id: String = row.get(1)?;
    let captured_at: String = row.get(2)?;
    let usage_json: String = row.get(3)?;
    Ok(parse_history_row(id, provider_id, &captured_at, &usage_json))
}

fn parse_history_row(id: i64, provider_id: String, captured_at: &str, usage_json: &str) -> Result<HistoryRow> {
    let fetched_at = parse_rfc3339(captured_at)?;
    let usage: ProviderUsage = serde_json::from_str(usage_json)?;
    Ok(HistoryRow { id, provider_id, fetched_at, usage })
}

fn map_reset_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<ResetEvent>> {
    let provider_id: String = row.get(0)?;
    let detail_type: String = row.get(1)?;
    let detected_at: String = row.get(2)?;
    let previous_pct: f64 = row.get(3)?;
    let current_pct: f64 = row.get(4)?;
    Ok(parse_reset_event(provider_id, &detail_type, &detected_at, previous_pct, current_pct))
}

fn parse_reset_event(
    provider_id: String,
    detail_type: &str,
    detected_at: &str,
    previous_pct: f64,
    current_pct: f64,
) -> Result<ResetEvent> {
    let reset_type = serde_json::from_str(&format!("\"{detail_type}\""))?;
    Ok(ResetEvent {
        provider_name: provider_id.clone(),
        provider_id,
        previous_percentage: previous_pct,
        new_percentage: current_pct,
        reset_type,
        timestamp: parse_rfc3339(detected_at)?,
    })
}

fn parse_rfc3339(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CautError::StorageError { message: format!("bad timestamp '{s}': {e}") })
}
