//! Per-client rate limiting for the API routes.

use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tokio::{sync::Mutex, time::Instant};

/// How many requests a client may make in each window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// The number of requests allowed per window.
    pub max_requests: u32,
    /// The length of a window.
    pub window: Duration,
    /// Whether the server sits behind a proxy that appends the client IP to
    /// `X-Forwarded-For`. When false the header is ignored.
    pub trust_proxy: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(15 * 60),
            trust_proxy: false,
        }
    }
}

#[derive(Debug)]
struct ClientWindow {
    count: u32,
    started: Instant,
}

/// Counts requests per client IP over fixed windows.
///
/// Clones share the same counts.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    clients: Arc<Mutex<HashMap<String, ClientWindow>>>,
}

impl RateLimiter {
    /// Create a rate limiter with no requests counted yet.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Count a request from `client`, returning whether it is within the limit.
    async fn check(&self, client: &str) -> bool {
        let mut clients = self.clients.lock().await;
        let now = Instant::now();

        let window = clients
            .entry(client.to_owned())
            .or_insert_with(|| ClientWindow {
                count: 0,
                started: now,
            });

        if now.duration_since(window.started) >= self.config.window {
            window.count = 0;
            window.started = now;
        }

        window.count = window.count.saturating_add(1);
        window.count <= self.config.max_requests
    }

    /// Forget clients whose window has ended.
    pub async fn cleanup(&self) {
        let mut clients = self.clients.lock().await;
        let now = Instant::now();

        clients.retain(|_, window| now.duration_since(window.started) < self.config.window);
    }
}

/// The client IP.
///
/// Behind a trusted proxy this is the last `X-Forwarded-For` entry, the one
/// the proxy appended. Earlier entries are written by the client and are
/// never used. Otherwise, or without the header, it is the peer address.
fn extract_ip(request: &Request, trust_proxy: bool) -> String {
    if trust_proxy
        && let Some(forwarded) = request.headers().get("x-forwarded-for")
        && let Ok(value) = forwarded.to_str()
        && let Some(last) = value.rsplit(',').next()
    {
        let ip = last.trim();
        if !ip.is_empty() {
            return ip.to_owned();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(address)| address.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

fn too_many_requests() -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({
            "success": false,
            "error": "Too many requests from this IP, please try again later."
        })),
    )
        .into_response()
}

/// Reject requests from clients that are over their limit with `429 Too Many Requests`.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let ip = extract_ip(&request, limiter.config.trust_proxy);

    if !limiter.check(&ip).await {
        tracing::warn!("Rate limit exceeded for {ip}");
        return too_many_requests();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use std::net::SocketAddr;

    use axum::{
        Router,
        body::Body,
        extract::{ConnectInfo, Request},
        http::StatusCode,
        middleware,
        routing::get,
    };
    use axum_test::TestServer;

    use super::{RateLimitConfig, RateLimiter, extract_ip, rate_limit_middleware};

    fn limiter(max_requests: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_requests,
            window: Duration::from_secs(60),
            ..Default::default()
        })
    }

    fn request_from(peer: &str, forwarded_for: &str) -> Request {
        let mut request = Request::builder()
            .header("x-forwarded-for", forwarded_for)
            .body(Body::empty())
            .unwrap();
        let address: SocketAddr = peer.parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(address));

        request
    }

    #[tokio::test]
    async fn allows_requests_up_to_limit() {
        let limiter = limiter(2);

        assert!(limiter.check("1.2.3.4").await);
        assert!(limiter.check("1.2.3.4").await);
        assert!(!limiter.check("1.2.3.4").await);
    }

    #[tokio::test]
    async fn counts_clients_separately() {
        let limiter = limiter(1);

        assert!(limiter.check("1.2.3.4").await);
        assert!(limiter.check("5.6.7.8").await);
        assert!(!limiter.check("1.2.3.4").await);
    }

    #[tokio::test]
    async fn clones_share_counts() {
        let limiter = limiter(1);
        let clone = limiter.clone();

        assert!(limiter.check("1.2.3.4").await);
        assert!(!clone.check("1.2.3.4").await);
    }

    fn short_window_limiter() -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_requests: 1,
            window: Duration::from_millis(50),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn window_resets_after_it_ends() {
        let limiter = short_window_limiter();
        assert!(limiter.check("1.2.3.4").await);
        assert!(!limiter.check("1.2.3.4").await);

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(limiter.check("1.2.3.4").await);
    }

    #[tokio::test]
    async fn cleanup_forgets_finished_windows() {
        let limiter = short_window_limiter();
        limiter.check("1.2.3.4").await;

        tokio::time::sleep(Duration::from_millis(80)).await;
        limiter.cleanup().await;

        assert!(limiter.clients.lock().await.is_empty());
    }

    #[test]
    fn ip_is_peer_address_unless_proxy_is_trusted() {
        let request = request_from("192.168.1.5:4000", "6.6.6.6");

        assert_eq!(extract_ip(&request, false), "192.168.1.5");
    }

    #[test]
    fn trusted_proxy_ip_comes_from_last_forwarded_entry() {
        let request = request_from("127.0.0.1:4000", "6.6.6.6, 10.0.0.2");

        assert_eq!(extract_ip(&request, true), "10.0.0.2");
    }

    #[test]
    fn ip_is_unknown_without_connection_info() {
        let request = Request::builder().body(Body::empty()).unwrap();

        assert_eq!(extract_ip(&request, false), "unknown");
    }

    async fn allowed_requests(trust_proxy: bool, forwarded_for: impl Fn(u32) -> String) -> u32 {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: 1,
            window: Duration::from_secs(60),
            trust_proxy,
        });
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
        let server = TestServer::try_new(app).expect("Could not create test server.");

        let mut allowed = 0;
        for i in 0..10 {
            let response = server
                .get("/")
                .add_header("x-forwarded-for", forwarded_for(i))
                .await;
            if response.status_code() == StatusCode::OK {
                allowed += 1;
            }
        }

        allowed
    }

    #[tokio::test]
    async fn rotating_forwarded_for_does_not_bypass_limit() {
        let allowed = allowed_requests(false, |i| format!("6.6.6.{i}")).await;

        assert_eq!(allowed, 1);
    }

    #[tokio::test]
    async fn client_prefix_before_trusted_proxy_entry_is_ignored() {
        let allowed = allowed_requests(true, |i| format!("6.6.6.{i}, 10.0.0.2")).await;

        assert_eq!(allowed, 1);
    }
}
