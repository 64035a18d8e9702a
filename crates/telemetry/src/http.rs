// Path: crates/telemetry/src/http.rs
use axum::{
    body::Bytes,
    error_handling::HandleErrorLayer,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderName, StatusCode},
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::{
    future::Future,
    net::SocketAddr,
    sync::{
        atomic::{AtomicU32, AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tower::{BoxError, ServiceBuilder};
use tower_http::trace::TraceLayer;

/// Refresh health of a running reward watch, shared with the `/healthz` handler.
///
/// The watch loop calls [`WatchHealth::record_success`] or
/// [`WatchHealth::record_failure`] after every refresh. The endpoint reports
/// unhealthy once the last good snapshot is older than `stale_after`, or when
/// no refresh has succeeded yet.
#[derive(Debug)]
pub struct WatchHealth {
    stale_after: Duration,
    last_snapshot_at: AtomicU64,
    consecutive_failures: AtomicU32,
    last_error: Mutex<Option<String>>,
}

/// Body of `/healthz`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    /// Unix seconds of the last successful snapshot, if any.
    pub last_snapshot_at: Option<u64>,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
}

impl WatchHealth {
    pub fn new(stale_after: Duration) -> Arc<Self> {
        Arc::new(Self {
            stale_after,
            last_snapshot_at: AtomicU64::new(0),
            consecutive_failures: AtomicU32::new(0),
            last_error: Mutex::new(None),
        })
    }

    /// Records a snapshot taken at `taken_at` (unix seconds).
    pub fn record_success(&self, taken_at: u64) {
        self.last_snapshot_at.store(taken_at, Ordering::Relaxed);
        self.consecutive_failures.store(0, Ordering::Relaxed);
        *self.error_slot() = None;
    }

    /// Records a failed refresh. The last good snapshot time is kept.
    pub fn record_failure(&self, error: impl std::fmt::Display) {
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
        *self.error_slot() = Some(error.to_string());
    }

    /// The health as of `now` (unix seconds).
    pub fn report(&self, now: u64) -> HealthReport {
        let last = self.last_snapshot_at.load(Ordering::Relaxed);
        let last_snapshot_at = (last > 0).then_some(last);
        let healthy = last_snapshot_at
            .is_some_and(|at| now.saturating_sub(at) <= self.stale_after.as_secs());
        HealthReport {
            healthy,
            last_snapshot_at,
            consecutive_failures: self.consecutive_failures.load(Ordering::Relaxed),
            last_error: self.error_slot().clone(),
        }
    }

    fn error_slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        // A writer cannot leave the slot half-written, so a poisoned lock is still usable.
        self.last_error
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

async fn metrics_handler() -> ([(HeaderName, String); 1], Bytes) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buf = Vec::with_capacity(1 << 16);
    if let Err(e) = encoder.encode(&metric_families, &mut buf) {
        tracing::error!(target: "telemetry", error = %e, "failed to encode claim metrics");
    }
    (
        [(CONTENT_TYPE, encoder.format_type().to_string())],
        buf.into(),
    )
}

async fn healthz_handler(
    State(health): State<Arc<WatchHealth>>,
) -> (StatusCode, Json<HealthReport>) {
    let report = health.report(unix_now());
    let status = if report.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

async fn handle_service_error(err: BoxError) -> (StatusCode, String) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (StatusCode::REQUEST_TIMEOUT, "Request timed out".to_string())
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Unhandled internal error: {}", err),
        )
    }
}

/// The watch router: `/metrics` and a `/healthz` backed by `health`.
pub fn router(health: Arc<WatchHealth>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler))
        .with_state(health)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_service_error))
                .layer(TraceLayer::new_for_http())
                .load_shed()
                .concurrency_limit(8)
                .timeout(Duration::from_secs(2)),
        )
}

/// Serves the watch router on `addr` until `shutdown` resolves.
pub async fn run_server<F>(addr: SocketAddr, health: Arc<WatchHealth>, shutdown: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(target: "telemetry", error = %e, "failed to bind watch http server");
            return;
        }
    };
    if let Ok(local) = listener.local_addr() {
        tracing::info!(target: "telemetry", addr = %local, "listening");
    }

    let graceful = axum::serve(listener, router(health).into_make_service())
        .with_graceful_shutdown(shutdown);

    if let Err(e) = graceful.await {
        tracing::error!(target: "telemetry", error = %e, "server error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    #[test]
    fn stale_or_missing_snapshots_are_unhealthy() {
        let health = WatchHealth::new(Duration::from_secs(60));
        assert!(!health.report(1_000).healthy);

        health.record_success(1_000);
        assert!(health.report(1_060).healthy);
        assert!(!health.report(1_061).healthy);
    }

    #[test]
    fn failures_are_counted_until_the_next_success() {
        let health = WatchHealth::new(Duration::from_secs(60));
        health.record_success(1_000);
        health.record_failure("ledger unavailable");
        health.record_failure("ledger unavailable");

        let report = health.report(1_010);
        assert!(report.healthy);
        assert_eq!(report.consecutive_failures, 2);
        assert_eq!(report.last_snapshot_at, Some(1_000));
        assert_eq!(report.last_error.as_deref(), Some("ledger unavailable"));

        health.record_success(1_020);
        let report = health.report(1_020);
        assert_eq!(report.consecutive_failures, 0);
        assert_eq!(report.last_error, None);
    }

    async fn get_healthz(health: Arc<WatchHealth>) -> (StatusCode, serde_json::Value) {
        let response = router(health)
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 1 << 16).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn healthz_is_unavailable_before_the_first_snapshot() {
        let health = WatchHealth::new(Duration::from_secs(60));
        health.record_failure("wallet not connected");
        let (status, body) = get_healthz(health).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["healthy"], false);
        assert_eq!(body["last_error"], "wallet not connected");
    }

    #[tokio::test]
    async fn healthz_reports_a_fresh_snapshot() {
        let health = WatchHealth::new(Duration::from_secs(60));
        health.record_success(unix_now());
        let (status, body) = get_healthz(health).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["consecutive_failures"], 0);
    }
}
