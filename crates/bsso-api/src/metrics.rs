//! Prometheus metrics for request traffic and login outcomes.

use axum::{
    extract::{MatchedPath, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize Prometheus metrics exporter
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let builder = PrometheusBuilder::new();

    // Request duration buckets, in seconds. Callbacks include upstream calls
    // to the provider, hence the long tail.
    let builder = builder.set_buckets_for_metric(
        Matcher::Full("http_request_duration_seconds".to_string()),
        &[
            0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
        ],
    )?;

    let handle = builder.install_recorder()?;

    Ok(handle)
}

/// Middleware to record HTTP request metrics
pub async fn track_metrics(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = route_label(&req);

    let response: Response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(
        "http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status.clone()
    )
    .increment(1);

    histogram!(
        "http_request_duration_seconds",
        "method" => method,
        "path" => path,
        "status" => status
    )
    .record(duration);

    response
}

/// Label for requests that matched no route.
pub const UNMATCHED_PATH: &str = "unmatched";

/// The route template (`/api/sso/oauth2/login/{provider_id}`) of the request,
/// or [`UNMATCHED_PATH`]. Raw paths never become labels.
fn route_label(req: &Request) -> String {
    req.extensions()
        .get::<MatchedPath>()
        .map_or(UNMATCHED_PATH, MatchedPath::as_str)
        .to_string()
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (StatusCode::OK, handle.render())
}

/// Record a login redirect or callback outcome. `failure` is the failure
/// site, `None` on success.
pub fn record_auth_event(event_type: &str, provider_type: &str, failure: Option<&str>) {
    let status = if failure.is_some() { "failure" } else { "success" };

    counter!(
        "sso_auth_events_total",
        "type" => event_type.to_string(),
        "provider" => provider_type.to_string(),
        "status" => status,
        "reason" => failure.unwrap_or_default().to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::Request as HttpRequest, middleware, routing::get};
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    /// Route labels seen by a middleware layered like `track_metrics`.
    async fn labels_for(uris: &[&str]) -> Vec<String> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let app = Router::new()
            .route("/api/sso/oauth2/login/{provider_id}", get(|| async { "ok" }))
            .route("/health", get(|| async { "ok" }))
            .fallback(|| async { StatusCode::NOT_FOUND })
            .layer(middleware::from_fn(move |req: Request, next: Next| {
                let recorder = Arc::clone(&recorder);
                async move {
                    recorder
                        .lock()
                        .expect("label lock")
                        .push(route_label(&req));
                    next.run(req).await
                }
            }));

        for uri in uris {
            app.clone()
                .oneshot(HttpRequest::builder().uri(*uri).body(Body::empty()).expect("request"))
                .await
                .expect("response");
        }

        seen.lock().expect("label lock").clone()
    }

    #[tokio::test]
    async fn test_route_label_uses_route_template() {
        let labels = labels_for(&[
            "/api/sso/oauth2/login/42",
            "/api/sso/oauth2/login/7",
            "/health",
        ])
        .await;

        assert_eq!(
            labels,
            vec![
                "/api/sso/oauth2/login/{provider_id}",
                "/api/sso/oauth2/login/{provider_id}",
                "/health",
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_paths_share_one_label() {
        let labels = labels_for(&["/wp-admin/abc", "/wp-login/xyz"]).await;

        assert_eq!(labels, vec![UNMATCHED_PATH, UNMATCHED_PATH]);
    }
}
