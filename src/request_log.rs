use std::time::Instant;

use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

/// One log line per request: method, path, status and response time.
pub async fn log_requests(request: Request<Body>, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    let status = response.status().as_u16();
    tracing::info!(
        method = %method,
        path = %path,
        status,
        elapsed_ms,
        "{} {} {} {:.3} ms",
        method,
        path,
        status,
        elapsed_ms
    );
    response
}
