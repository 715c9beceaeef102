//! The loopback-only HTTP API.
//!
//! A small hand-rolled router over `hyper` 1.x: every handler reads
//! already-cached state (the usage store, the in-memory config document,
//! the scheduler's telemetry) and returns immediately, per the
//! non-blocking-handler rule — nothing here waits on a provider fetch.
//! Built directly on the `hyper`/`hyper-util`/`http-body-util` stack the
//! crate already depends on, since no full web framework is pulled in for
//! a handful of loopback endpoints.

use std::convert::Infallible;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::core::config_store::ConfigStore;
use crate::core::credential_discovery;
use crate::core::notification::{LoggingNotificationSink, NotificationSink, ThresholdCrossing};
use crate::core::scheduler::RefreshScheduler;
use crate::core::usage_types::ProviderConfig;
use crate::error::Result;
use crate::storage::paths::AppPaths;
use crate::storage::usage_store::UsageStore;

/// How many ports after the preferred one to try before falling back to an
/// OS-assigned ephemeral port.
const PORT_FALLBACK_ATTEMPTS: u16 = 10;

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");
const API_CONTRACT_VERSION: &str = "1";

type BoxBody = Full<Bytes>;

/// Shared state behind every request handler.
pub struct HttpService {
    store: Arc<UsageStore>,
    config_store: Arc<Mutex<ConfigStore>>,
    scheduler: Arc<RefreshScheduler>,
    sink: Arc<dyn NotificationSink>,
    debug: bool,
    started_at: DateTime<Utc>,
    /// The port actually bound in [`Self::serve`]; `0` until then. Read by
    /// `health`/`diagnostics` rather than threaded through as a parameter,
    /// since both handlers take `&self` only.
    bound_port: AtomicU16,
}

/// Where the service ended up bound, for logging and tests.
#[derive(Debug, Clone, Copy)]
pub struct BoundAddress {
    pub addr: SocketAddr,
}

impl HttpService {
    #[must_use]
    pub fn new(
        store: Arc<UsageStore>,
        config_store: Arc<Mutex<ConfigStore>>,
        scheduler: Arc<RefreshScheduler>,
        debug: bool,
    ) -> Self {
        Self {
            store,
            config_store,
            scheduler,
            sink: Arc::new(LoggingNotificationSink),
            debug,
            started_at: Utc::now(),
            bound_port: AtomicU16::new(0),
        }
    }

    /// Bind to loopback, preferring `preferred_port`, falling back to the
    /// next [`PORT_FALLBACK_ATTEMPTS`] ports, then an OS-chosen ephemeral
    /// port. Writes the handshake file on success and serves forever on a
    /// spawned task.
    ///
    /// # Errors
    /// Returns an error only if every candidate port (including the
    /// OS-ephemeral fallback) fails to bind.
    pub async fn serve(self: Arc<Self>, preferred_port: u16) -> Result<BoundAddress> {
        let listener = bind_with_fallback(preferred_port).await?;
        let addr = listener.local_addr()?;
        self.bound_port.store(addr.port(), Ordering::SeqCst);

        self.write_handshake_file(addr.port(), &[])?;

        tokio::spawn(async move {
            loop {
                let (stream, _peer) = match listener.accept().await {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };
                let service = Arc::clone(&self);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let service_fn = service_fn(move |req| {
                        let service = Arc::clone(&service);
                        async move { Ok::<_, Infallible>(service.route(req).await) }
                    });
                    if let Err(e) = hyper::server::conn::http1::Builder::new()
                        .serve_connection(io, service_fn)
                        .await
                    {
                        tracing::debug!(error = %e, "connection closed with an error");
                    }
                });
            }
        });

        Ok(BoundAddress { addr })
    }

    fn write_handshake_file(&self, port: u16, errors: &[String]) -> Result<()> {
        let paths = AppPaths::new();
        paths.ensure_dirs()?;

        #[derive(Serialize)]
        struct Handshake {
            port: u16,
            #[serde(rename = "processId")]
            process_id: u32,
            #[serde(rename = "startedAt")]
            started_at: String,
            #[serde(rename = "debugMode")]
            debug_mode: bool,
            errors: Vec<String>,
            #[serde(rename = "machineName")]
            machine_name: String,
            #[serde(rename = "userName")]
            user_name: String,
        }

        let handshake = Handshake {
            port,
            process_id: std::process::id(),
            started_at: self.started_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            debug_mode: self.debug,
            errors: errors.to_vec(),
            machine_name: hostname(),
            user_name: username(),
        };
        let body = serde_json::to_string_pretty(&handshake)?;

        let primary = paths.handshake_file();
        std::fs::write(&primary, &body)?;

        let legacy = paths.legacy_handshake_file();
        if legacy != primary {
            std::fs::write(&legacy, &body)?;
        }

        tracing::info!(port, path = %primary.display(), "handshake file written");
        Ok(())
    }

    async fn route(&self, req: Request<Incoming>) -> Response<BoxBody> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let query = req.uri().query().unwrap_or("").to_string();
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

        let response = match (&method, segments.as_slice()) {
            (&Method::GET, ["api", "health"]) => self.health(),
            (&Method::GET, ["api", "diagnostics"]) => self.diagnostics().await,
            (&Method::GET, ["api", "usage"]) => self.list_usage(),
            (&Method::GET, ["api", "usage", provider_id]) => self.usage_for(provider_id),
            (&Method::POST, ["api", "refresh"]) => self.trigger_refresh().await,
            (&Method::GET, ["api", "config"]) => self.list_config().await,
            (&Method::POST, ["api", "config"]) => self.upsert_config(req).await,
            (&Method::DELETE, ["api", "config", provider_id]) => self.remove_config(provider_id).await,
            (&Method::POST, ["api", "scan-keys"]) => self.scan_keys().await,
            (&Method::GET, ["api", "history"]) => self.recent_history(&query),
            (&Method::GET, ["api", "history", provider_id]) => self.history_for(provider_id, &query),
            (&Method::GET, ["api", "resets", provider_id]) => self.resets_for(provider_id, &query),
            (&Method::POST, ["api", "notifications", "test"]) => self.test_notification(),
            _ => not_found(),
        };

        with_cors(response)
    }

    fn health(&self) -> Response<BoxBody> {
        json_response(
            StatusCode::OK,
            &json!({
                "status": "ok",
                "timestamp": Utc::now(),
                "port": self.bound_port.load(Ordering::SeqCst),
                "process_id": std::process::id(),
                "agent_version": AGENT_VERSION,
                "api_contract_version": API_CONTRACT_VERSION,
            }),
        )
    }

    async fn diagnostics(&self) -> Response<BoxBody> {
        let telemetry = self.scheduler.telemetry().await;
        let state = self.scheduler.state().await;
        json_response(
            StatusCode::OK,
            &json!({
                "process_id": std::process::id(),
                "port": self.bound_port.load(Ordering::SeqCst),
                "working_directory": std::env::current_dir().ok().map(|p| p.display().to_string()),
                "args": std::env::args().collect::<Vec<_>>(),
                "started_at": self.started_at,
                "scheduler_state": format!("{state:?}"),
                "cycles_completed": telemetry.cycles_completed,
                "providers_probed": telemetry.providers_probed,
                "providers_failed": telemetry.providers_failed,
                "resets_detected": telemetry.resets_detected,
                "endpoints": [
                    "GET /api/health", "GET /api/diagnostics", "GET /api/usage",
                    "GET /api/usage/{provider_id}", "POST /api/refresh", "GET /api/config",
                    "POST /api/config", "DELETE /api/config/{provider_id}", "POST /api/scan-keys",
                    "GET /api/history", "GET /api/history/{provider_id}", "GET /api/resets/{provider_id}",
                    "POST /api/notifications/test",
                ],
            }),
        )
    }

    fn list_usage(&self) -> Response<BoxBody> {
        match self.store.latest_per_provider(false) {
            Ok(rows) => {
                let usages: Vec<_> = rows.into_iter().map(|r| r.usage).collect();
                json_response(StatusCode::OK, &usages)
            }
            Err(e) => server_error(&e),
        }
    }

    fn usage_for(&self, provider_id: &str) -> Response<BoxBody> {
        match self.store.latest_for_provider(provider_id, false) {
            Ok(Some(row)) => json_response(StatusCode::OK, &row.usage),
            Ok(None) => json_response(StatusCode::NOT_FOUND, &json!({"message": "no usage recorded for this provider"})),
            Err(e) => server_error(&e),
        }
    }

    async fn trigger_refresh(&self) -> Response<BoxBody> {
        let scheduler = Arc::clone(&self.scheduler);
        tokio::spawn(async move {
            if let Err(e) = scheduler.trigger_refresh().await {
                tracing::warn!(error = %e, "triggered refresh failed");
            }
        });
        json_response(StatusCode::ACCEPTED, &json!({"message": "refresh triggered"}))
    }

    async fn list_config(&self) -> Response<BoxBody> {
        let store = self.config_store.lock().await;
        let masked: Vec<ProviderConfig> = store.providers().iter().cloned().map(ProviderConfig::masked).collect();
        json_response(StatusCode::OK, &masked)
    }

    async fn upsert_config(&self, req: Request<Incoming>) -> Response<BoxBody> {
        let Ok(body) = req.into_body().collect().await else {
            return bad_request("could not read request body");
        };
        let config: ProviderConfig = match serde_json::from_slice(&body.to_bytes()) {
            Ok(c) => c,
            Err(e) => return bad_request(&format!("invalid provider config: {e}")),
        };

        let mut store = self.config_store.lock().await;
        store.upsert_provider(config.clone());
        if let Err(e) = store.save() {
            return server_error(&e);
        }
        drop(store);

        let display_name = crate::core::provider::Provider::from_cli_name(&config.provider_id)
            .map_or_else(|_| config.provider_id.clone(), |p| p.display_name().to_string());
        if let Err(e) = self.store.upsert_provider(&config, &display_name) {
            return server_error(&e);
        }
        json_response(StatusCode::OK, &json!({"message": "provider configuration saved"}))
    }

    async fn remove_config(&self, provider_id: &str) -> Response<BoxBody> {
        let mut store = self.config_store.lock().await;
        let existed = store.remove_provider(provider_id);
        if let Err(e) = store.save() {
            return server_error(&e);
        }
        drop(store);
        if let Err(e) = self.store.remove_provider(provider_id) {
            return server_error(&e);
        }
        let message = if existed { "provider removed" } else { "provider was not configured" };
        json_response(StatusCode::OK, &json!({"message": message}))
    }

    async fn scan_keys(&self) -> Response<BoxBody> {
        let discovered = credential_discovery::discover();
        let count = discovered.iter().filter(|c| c.is_active()).count();

        {
            let mut store = self.config_store.lock().await;
            store.replace_providers(discovered.clone());
            if let Err(e) = store.save() {
                return server_error(&e);
            }
        }

        let scheduler = Arc::clone(&self.scheduler);
        tokio::spawn(async move {
            if let Err(e) = scheduler.trigger_refresh().await {
                tracing::warn!(error = %e, "post-scan refresh failed");
            }
        });

        json_response(
            StatusCode::OK,
            &json!({"discovered": count, "configs": discovered}),
        )
    }

    fn recent_history(&self, query: &str) -> Response<BoxBody> {
        let limit = parse_limit(query, 100);
        match self.store.recent_history(limit) {
            Ok(rows) => json_response(StatusCode::OK, &rows),
            Err(e) => server_error(&e),
        }
    }

    fn history_for(&self, provider_id: &str, query: &str) -> Response<BoxBody> {
        let limit = parse_limit(query, 100);
        match self.store.history_by_provider(provider_id, limit) {
            Ok(rows) => json_response(StatusCode::OK, &rows),
            Err(e) => server_error(&e),
        }
    }

    fn resets_for(&self, provider_id: &str, query: &str) -> Response<BoxBody> {
        let hours = i64::from(parse_limit(query, 24 * 30));
        match self.store.recent_reset_events(provider_id, hours) {
            Ok(events) => json_response(StatusCode::OK, &events),
            Err(e) => server_error(&e),
        }
    }

    fn test_notification(&self) -> Response<BoxBody> {
        self.sink.notify(&ThresholdCrossing {
            provider_id: "test".to_string(),
            provider_name: "Test Notification".to_string(),
            previous_used_percent: 0.0,
            current_used_percent: 100.0,
            threshold: 0.0,
        });
        json_response(StatusCode::OK, &json!({"message": "test notification sent"}))
    }
}

async fn bind_with_fallback(preferred_port: u16) -> Result<TcpListener> {
    let loopback = IpAddr::V4(Ipv4Addr::LOCALHOST);
    for port in preferred_port..=preferred_port.saturating_add(PORT_FALLBACK_ATTEMPTS) {
        if let Ok(listener) = TcpListener::bind(SocketAddr::new(loopback, port)).await {
            return Ok(listener);
        }
    }
    Ok(TcpListener::bind(SocketAddr::new(loopback, 0)).await?)
}

fn parse_limit(query: &str, default: u32) -> u32 {
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("limit="))
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn json_response(status: StatusCode, body: &impl Serialize) -> Response<BoxBody> {
    let bytes = serde_json::to_vec(body).unwrap_or_else(|_| b"{}".to_vec());
    let mut response = Response::new(Full::new(Bytes::from(bytes)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn not_found() -> Response<BoxBody> {
    json_response(StatusCode::NOT_FOUND, &json!({"message": "not found"}))
}

fn bad_request(message: &str) -> Response<BoxBody> {
    json_response(StatusCode::BAD_REQUEST, &json!({"message": message}))
}

fn server_error(err: &crate::error::CautError) -> Response<BoxBody> {
    json_response(StatusCode::INTERNAL_SERVER_ERROR, &json!({"message": err.to_string()}))
}

fn with_cors(mut response: Response<BoxBody>) -> Response<BoxBody> {
    response
        .headers_mut()
        .insert("access-control-allow-origin", HeaderValue::from_static("*"));
    response
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "localhost".to_string())
}

fn username() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
