//! Local-companion probe (fetch pattern C).
//!
//! Some coding agents run a long-lived companion process that exposes usage
//! data over a `https://127.0.0.1:<port>` endpoint with a self-signed
//! certificate, rather than over a CLI or a cloud API. No provider in this
//! tree currently ships that way, so this module is a standalone,
//! provider-agnostic helper: it builds a client scoped to loopback TLS
//! connections, extracts the auth token/port hint a companion process
//! typically carries on its own command line, and caches the last good
//! reading so a momentarily-stopped companion doesn't read as a hard
//! failure. Wiring it to a specific provider is left for whenever one
//! ships; it is exercised directly by its own tests.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use reqwest::{Client, ClientBuilder};
use serde::de::DeserializeOwned;

use crate::error::{CautError, Result};

/// Default timeout for a companion probe call.
pub const COMPANION_TIMEOUT: Duration = Duration::from_secs(3);

/// How long a cached companion reading stays eligible to stand in for a
/// probe that found no running companion process.
pub const CACHE_TTL: Duration = Duration::from_secs(30);

/// Extract a flag's value from a process command line such as
/// `codeium_language_server --csrf_token abc123 --extension_server_port
/// 40400`. Returns `None` if the flag isn't present or has no following
/// token.
#[must_use]
pub fn extract_cmdline_flag(cmdline: &str, flag: &str) -> Option<String> {
    let mut tokens = cmdline.split_whitespace();
    while let Some(token) = tokens.next() {
        if token == flag {
            return tokens.next().map(ToString::to_string);
        }
        if let Some(value) = token.strip_prefix(&format!("{flag}=")) {
            return Some(value.to_string());
        }
    }
    None
}

/// Same as [`extract_cmdline_flag`] but parsed as a TCP port number.
#[must_use]
pub fn extract_cmdline_port(cmdline: &str, flag: &str) -> Option<u16> {
    extract_cmdline_flag(cmdline, flag)?.parse().ok()
}

/// One successful companion reading, kept around so a probe that finds no
/// running companion process can still answer with stale data rather than
/// reporting a hard failure.
#[derive(Debug)]
pub struct CachedReading<T> {
    pub value: T,
    pub captured_at: DateTime<Utc>,
    observed_at: Instant,
}

/// A small last-known-good cache for one companion provider. Guarded by a
/// plain [`Mutex`] — the companion probe only ever runs from one task at a
/// time for a given provider instance, so contention is not a concern.
pub struct CompanionCache<T> {
    slot: Mutex<Option<CachedReading<T>>>,
}

impl<T> Default for CompanionCache<T> {
    fn default() -> Self {
        Self { slot: Mutex::new(None) }
    }
}

impl<T: Clone> CompanionCache<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly fetched reading as the new last-known-good value.
    pub fn store(&self, value: T) {
        let mut slot = self.slot.lock().expect("companion cache mutex poisoned");
        *slot = Some(CachedReading {
            value,
            captured_at: Utc::now(),
            observed_at: Instant::now(),
        });
    }

    /// Return the cached reading if one exists, regardless of age — callers
    /// decide what "too stale" means for their own reset-time field, per
    /// the spec's companion-probe fallback contract.
    #[must_use]
    pub fn get(&self) -> Option<CachedReading<T>> {
        self.slot.lock().expect("companion cache mutex poisoned").clone()
    }

    /// Whether the cached reading (if any) is within [`CACHE_TTL`].
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.slot
            .lock()
            .expect("companion cache mutex poisoned")
            .as_ref()
            .is_some_and(|r| r.observed_at.elapsed() < CACHE_TTL)
    }
}

impl<T: Clone> Clone for CachedReading<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            captured_at: self.captured_at,
            observed_at: self.observed_at,
        }
    }
}

/// Build a client that accepts the self-signed certificate a local
/// companion process typically presents. This relaxation only ever applies
/// to requests this client itself issues against `127.0.0.1`/`localhost`;
/// it is never used for the shared client in [`crate::core::http`].
///
/// # Errors
/// Returns an error if client construction fails.
pub fn build_companion_client(timeout: Duration) -> Result<Client> {
    ClientBuilder::new()
        .timeout(timeout)
        .danger_accept_invalid_certs(true)
        .user_agent(format!("caut/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| CautError::Network(e.to_string()))
}

/// Probe a local companion process for usage data.
///
/// `provider` identifies the provider this probe is attempting to serve,
/// for error reporting; `port` is the companion's loopback port.
///
/// # Errors
/// Returns [`CautError::CompanionNotRunning`] if the connection is refused,
/// or [`CautError::ProtocolError`] if the response doesn't parse.
pub async fn probe_companion<T: DeserializeOwned>(
    provider: &str,
    port: u16,
    path: &str,
) -> Result<T> {
    let client = build_companion_client(COMPANION_TIMEOUT)?;
    let url = format!("https://127.0.0.1:{port}{path}");

    let response = client.get(&url).send().await.map_err(|e| {
        if e.is_connect() {
            CautError::CompanionNotRunning {
                provider: provider.to_string(),
            }
        } else {
            CautError::Network(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(CautError::ProtocolError {
            provider: provider.to_string(),
            message: format!("companion returned HTTP {}", response.status()),
        });
    }

    response.json().await.map_err(|e| CautError::ProtocolError {
        provider: provider.to_string(),
        message: e.to_string(),
    })
}

/// Build the human-readable description for a stale companion reading
/// (§4.2.C): mentions how long ago the data was captured. Callers zero the
/// "used" percentage and clear `next_reset_time` themselves once the
/// cached reading's own reset time has passed; this only renders the text.
#[must_use]
pub fn stale_description(captured_at: DateTime<Utc>) -> String {
    let age = Utc::now().signed_duration_since(captured_at);
    let minutes = age.num_minutes().max(0);
    format!("companion app not running; showing cached data from {minutes}m ago")
}
