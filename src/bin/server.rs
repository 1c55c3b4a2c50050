use std::{
    error::Error, fs::OpenOptions, net::SocketAddr, process::exit, sync::Arc, time::Duration,
};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    http::{HeaderValue, Method},
    middleware,
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use ytracker_rs::{
    AppState, CostSource, PaginationConfig, RateLimitConfig, RateLimiter, build_router,
    get_local_today, graceful_shutdown, logging_middleware,
};

/// How often clients with finished rate limit windows are forgotten.
const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// The REST API server for ytracker_rs.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The port to serve the API from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// The canonical name of the timezone used to decide what "today" is.
    #[arg(long, default_value = "Asia/Kuala_Lumpur")]
    timezone: String,

    /// Where the subscription cost used for money needed comes from.
    #[arg(long, value_enum, default_value_t = CostSource::Settings)]
    cost_source: CostSource,

    /// The number of API requests each client may make per window.
    #[arg(long, default_value_t = 100)]
    rate_limit_max: u32,

    /// The length of a rate limit window in seconds.
    #[arg(long, default_value_t = 15 * 60)]
    rate_limit_window_secs: u64,

    /// Key rate limits on the last `X-Forwarded-For` entry instead of the peer
    /// address. Only set this behind a proxy that appends to the header.
    #[arg(long)]
    trust_proxy: bool,

    /// The origin the frontend is served from. Any origin is allowed if not set.
    #[arg(long)]
    cors_origin: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    setup_logging()?;

    let args = Args::parse();

    if let Err(error) = get_local_today(&args.timezone) {
        tracing::error!("Invalid timezone {}: {error}", args.timezone);
        exit(1);
    }

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    let rate_limiter = RateLimiter::new(RateLimitConfig {
        max_requests: args.rate_limit_max,
        window: Duration::from_secs(args.rate_limit_window_secs),
        trust_proxy: args.trust_proxy,
    });

    let conn = Connection::open(&args.db_path)?;
    let state = AppState::new(
        conn,
        &args.timezone,
        PaginationConfig::default(),
        args.cost_source,
        rate_limiter.clone(),
    )?;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RATE_LIMIT_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            rate_limiter.cleanup().await;
        }
    });

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = build_router(state)
        .layer(middleware::from_fn(logging_middleware))
        .layer(cors_layer(args.cors_origin.as_deref())?);
    let router = add_tracing_layer(router);

    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service_with_connect_info::<SocketAddr>())
        .await?;

    Ok(())
}

fn setup_logging() -> Result<(), Box<dyn Error>> {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")?;

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
        .init();

    Ok(())
}

fn cors_layer(origin: Option<&str>) -> Result<CorsLayer, Box<dyn Error>> {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(Any);

    Ok(match origin {
        Some(origin) => cors.allow_origin(origin.parse::<HeaderValue>()?),
        None => cors.allow_origin(Any),
    })
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // Errors are logged where they are turned into responses.
        .on_failure(());

    router.layer(tracing_layer)
}
