//! Request logging, HTTP metrics and response hardening.

use crate::api::AppState;
use crate::services::AdminIdentity;
use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderName, HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

const MAX_REQUEST_ID_LEN: usize = 64;

const SECURITY_HEADERS: [(&str, &str); 3] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("referrer-policy", "no-referrer"),
];

/// GET /metrics
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.prometheus_handle.as_ref().map_or_else(
        || "Metrics not enabled".to_string(),
        metrics_exporter_prometheus::PrometheusHandle::render,
    )
}

/// Reuses a caller-supplied request id when it is short printable ASCII.
fn request_id(req: &Request) -> HeaderValue {
    req.headers()
        .get(&REQUEST_ID_HEADER)
        .filter(|v| {
            let bytes = v.as_bytes();
            !bytes.is_empty()
                && bytes.len() <= MAX_REQUEST_ID_LEN
                && bytes.iter().all(u8::is_ascii_graphic)
        })
        .cloned()
        .unwrap_or_else(|| {
            HeaderValue::from_str(&Uuid::new_v4().to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("unknown"))
        })
}

fn record_request(method: &str, route: &str, status: u16, elapsed: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("route", route.to_string()),
        ("status", status.to_string()),
    ];
    metrics::counter!("http_requests_total", &labels).increment(1);
    metrics::histogram!("http_request_duration_seconds", &labels).record(elapsed.as_secs_f64());
}

/// Tags each request with an id, logs its outcome and the acting admin, and
/// echoes the id back in `x-request-id`.
pub async fn request_log_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let request_id = request_id(&req);
    let method = req.method().clone();
    // Unmatched paths share one label so arbitrary URLs cannot grow the series count.
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "unmatched".to_string(), |p| p.as_str().to_string());

    let span = info_span!(
        "request",
        request_id = request_id.to_str().unwrap_or("-"),
        method = %method,
        route = %route,
    );

    async move {
        let mut response = next.run(req).await;
        let status = response.status();
        let elapsed = start.elapsed();

        record_request(method.as_str(), &route, status.as_u16(), elapsed);

        let admin = response
            .extensions()
            .get::<AdminIdentity>()
            .map_or("-", |a| a.username.as_str());
        let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        if status.is_server_error() {
            warn!(status = status.as_u16(), duration_ms, admin, "Request failed");
        } else {
            info!(status = status.as_u16(), duration_ms, admin, "Request finished");
        }

        response
            .headers_mut()
            .insert(REQUEST_ID_HEADER.clone(), request_id);
        response
    }
    .instrument(span)
    .await
}

/// Adds the fixed security headers, and `cache-control: no-store` on JSON
/// responses since those may carry tokens or keys.
pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;

    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .is_some_and(|ct| ct.as_bytes().starts_with(b"application/json"));

    let headers = response.headers_mut();
    for (name, value) in SECURITY_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
    if is_json {
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with_id(id: &str) -> Request {
        Request::builder()
            .uri("/")
            .header("x-request-id", id)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn caller_request_id_is_reused() {
        let id = request_id(&request_with_id("trace-42"));
        assert_eq!(id, "trace-42");
    }

    #[test]
    fn unusable_request_id_is_replaced() {
        let long = "x".repeat(MAX_REQUEST_ID_LEN + 1);
        for bad in ["", "has space", long.as_str()] {
            let id = request_id(&request_with_id(bad));
            assert_ne!(id, bad);
            assert!(Uuid::parse_str(id.to_str().unwrap()).is_ok());
        }

        let missing = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert!(Uuid::parse_str(request_id(&missing).to_str().unwrap()).is_ok());
    }
}
