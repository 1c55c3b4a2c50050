//! Middleware for logging requests and responses.

use axum::{
    body::{Body, Bytes, to_bytes},
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::time::Instant;

/// Bodies longer than this many bytes are cut short in the `info` logs.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// The largest body the middleware will buffer.
const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is
/// truncated and the full body is logged at the `debug` level.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let (parts, body) = request.into_parts();

    let body_bytes = match buffer_body(body).await {
        Ok(bytes) => bytes,
        Err(response) => return response,
    };

    let method = parts.method.clone();
    let uri = parts.uri.clone();
    log_body(
        &format!("Received request: {method} {uri}"),
        "Full request body",
        &body_bytes,
    );

    let response = next.run(Request::from_parts(parts, body_bytes.into())).await;

    let (parts, body) = response.into_parts();
    let body_bytes = match buffer_body(body).await {
        Ok(bytes) => bytes,
        Err(response) => return response,
    };

    log_body(
        &format!(
            "Sending response: {method} {uri} {} in {:?}",
            parts.status,
            start.elapsed()
        ),
        "Full response body",
        &body_bytes,
    );

    Response::from_parts(parts, body_bytes.into())
}

async fn buffer_body(body: Body) -> Result<Bytes, Response> {
    to_bytes(body, MAX_BODY_SIZE).await.map_err(|error| {
        tracing::error!("Could not read body: {error}");
        (StatusCode::PAYLOAD_TOO_LARGE, "Body too large").into_response()
    })
}

fn log_body(summary: &str, full_label: &str, body: &[u8]) {
    let body = String::from_utf8_lossy(body);

    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!("{summary}\nbody: {}...", truncate(&body, LOG_BODY_LENGTH_LIMIT));
        tracing::debug!("{full_label}: {body:?}");
    } else {
        tracing::info!("{summary}\nbody: {body:?}");
    }
}

/// The longest prefix of `text` that is at most `limit` bytes and ends on a
/// character boundary.
fn truncate(text: &str, limit: usize) -> &str {
    let mut end = limit.min(text.len());

    while !text.is_char_boundary(end) {
        end -= 1;
    }

    &text[..end]
}

#[cfg(test)]
mod tests {
    use axum::{Router, middleware, routing::post};
    use axum_test::TestServer;

    use super::{logging_middleware, truncate};

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate("hello", 64), "hello");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("aé", 2), "a");
    }

    #[tokio::test]
    async fn passes_bodies_through() {
        let app = Router::new()
            .route("/echo", post(|body: String| async move { body }))
            .layer(middleware::from_fn(logging_middleware));
        let server = TestServer::try_new(app).expect("Could not create test server.");
        let long_body = "x".repeat(200);

        let response = server.post("/echo").text(long_body.clone()).await;

        response.assert_status_ok();
        response.assert_text(long_body);
    }
}
