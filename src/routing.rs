//! Application router configuration with the health check and the rate limited API routes.

use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, patch},
};
use serde_json::json;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    AppState,
    card::{
        add_card_transaction_endpoint, create_card_endpoint, delete_card_endpoint,
        get_card_endpoint, get_card_stats_endpoint, get_expiring_cards_endpoint,
        list_card_transactions_endpoint, list_cards_endpoint, update_card_endpoint,
    },
    dashboard::get_dashboard_endpoint,
    endpoints,
    member::{
        create_member_endpoint, delete_member_endpoint, get_member_endpoint,
        get_member_stats_endpoint, get_overdue_members_endpoint, get_upcoming_members_endpoint,
        list_members_endpoint, mark_member_paid_endpoint, update_member_endpoint,
    },
    money_needed::get_money_needed_endpoint,
    rate_limit::rate_limit_middleware,
    settings::{get_settings_endpoint, update_settings_endpoint},
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint,
        get_category_transactions_endpoint, get_member_transactions_endpoint,
        get_transaction_endpoint, get_transaction_stats_endpoint, list_transactions_endpoint,
        update_transaction_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route(endpoints::DASHBOARD, get(get_dashboard_endpoint))
        .route(
            endpoints::MEMBERS,
            get(list_members_endpoint).post(create_member_endpoint),
        )
        .route(endpoints::OVERDUE_MEMBERS, get(get_overdue_members_endpoint))
        .route(
            endpoints::UPCOMING_MEMBERS,
            get(get_upcoming_members_endpoint),
        )
        .route(endpoints::MEMBER_STATS, get(get_member_stats_endpoint))
        .route(
            endpoints::MEMBER,
            get(get_member_endpoint)
                .put(update_member_endpoint)
                .delete(delete_member_endpoint),
        )
        .route(
            endpoints::MARK_MEMBER_PAID,
            patch(mark_member_paid_endpoint),
        )
        .route(
            endpoints::TRANSACTIONS,
            get(list_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION_STATS,
            get(get_transaction_stats_endpoint),
        )
        .route(
            endpoints::MEMBER_TRANSACTIONS,
            get(get_member_transactions_endpoint),
        )
        .route(
            endpoints::CATEGORY_TRANSACTIONS,
            get(get_category_transactions_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            get(get_transaction_endpoint)
                .put(update_transaction_endpoint)
                .delete(delete_transaction_endpoint),
        )
        .route(
            endpoints::CARDS,
            get(list_cards_endpoint).post(create_card_endpoint),
        )
        .route(endpoints::EXPIRING_CARDS, get(get_expiring_cards_endpoint))
        .route(
            endpoints::CARD,
            get(get_card_endpoint)
                .put(update_card_endpoint)
                .delete(delete_card_endpoint),
        )
        .route(endpoints::CARD_STATS, get(get_card_stats_endpoint))
        .route(
            endpoints::CARD_TRANSACTIONS,
            get(list_card_transactions_endpoint).post(add_card_transaction_endpoint),
        )
        .route(endpoints::CARD_MONEY_NEEDED, get(get_money_needed_endpoint))
        .route(
            endpoints::SETTINGS,
            get(get_settings_endpoint).put(update_settings_endpoint),
        )
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        .route(endpoints::HEALTH, get(get_health))
        .merge(api_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

/// Report that the server is running.
async fn get_health() -> Response {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();

    Json(json!({
        "success": true,
        "message": "ytracker API is running",
        "timestamp": timestamp,
    }))
    .into_response()
}

async fn get_404_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "error": "Route not found" })),
    )
        .into_response()
}
