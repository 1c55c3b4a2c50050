//! Endpoints for reading cards.

use axum::extract::{Path, State};
use serde::Deserialize;

use crate::{
    Error,
    app_state::lock_connection,
    card::{
        CardFilter, CardId, CardState, CardView, EXPIRING_SOON_DAYS, get_card, get_cards,
        get_expiring_cards,
    },
    response::{ApiQuery, ApiResponse},
    timezone::get_local_today,
};

/// The query parameters for the expiring cards endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ExpiringQuery {
    /// How many days ahead to look, defaults to [EXPIRING_SOON_DAYS].
    pub days: Option<u32>,
}

/// List the cards matching the query string filters, newest first.
pub async fn list_cards_endpoint(
    State(state): State<CardState>,
    ApiQuery(filter): ApiQuery<CardFilter>,
) -> Result<ApiResponse<Vec<CardView>>, Error> {
    let today = get_local_today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    let cards = get_cards(&filter, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve cards: {error}"))?;

    Ok(ApiResponse::list(
        cards
            .into_iter()
            .map(|card| CardView::new(card, today))
            .collect(),
    ))
}

/// Get a single card.
pub async fn get_card_endpoint(
    Path(card_id): Path<CardId>,
    State(state): State<CardState>,
) -> Result<ApiResponse<CardView>, Error> {
    let today = get_local_today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    let card = get_card(card_id, &connection)?;

    Ok(ApiResponse::ok(CardView::new(card, today)))
}

/// List the active cards that expire within the next `days` days.
pub async fn get_expiring_cards_endpoint(
    State(state): State<CardState>,
    ApiQuery(query): ApiQuery<ExpiringQuery>,
) -> Result<ApiResponse<Vec<CardView>>, Error> {
    let today = get_local_today(&state.local_timezone)?;
    let days = query.days.map_or(EXPIRING_SOON_DAYS, i64::from);
    let connection = lock_connection(&state.db_connection)?;

    let cards = get_expiring_cards(today, days, &connection)?;

    Ok(ApiResponse::list(
        cards
            .into_iter()
            .map(|card| CardView::new(card, today))
            .collect(),
    ))
}

#[cfg(test)]
mod list_card_endpoint_tests {
    use axum::{
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
    };
    use time::{Duration, OffsetDateTime};

    use crate::{
        app_state::lock_connection,
        card::{
            CardFilter, CardForm, CardState, create_card, domain::CardStatus, get_card_endpoint,
            get_expiring_cards_endpoint, list_cards_endpoint,
        },
        response::ApiQuery,
        test_utils::{card_form, get_test_state, parse_json_body},
    };

    use super::ExpiringQuery;

    /// The `MM/YY` expiry of a card expiring at the start of the month `months_ahead` from now.
    fn expiry_in_months(months_ahead: u8) -> String {
        let today = OffsetDateTime::now_utc().date();
        let month_index = u8::from(today.month()) - 1 + months_ahead;
        let year = today.year() + i32::from(month_index / 12);

        format!("{:02}/{:02}", month_index % 12 + 1, year % 100)
    }

    fn insert(digits: &str, expiry: &str, state: &CardState) {
        create_card(
            CardForm {
                expiry_date: expiry.parse().unwrap(),
                ..card_form(digits)
            },
            OffsetDateTime::now_utc().date() - Duration::days(1),
            &lock_connection(&state.db_connection).unwrap(),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn lists_cards_newest_first() {
        let state: CardState = get_test_state();
        insert("1111", "12/99", &state);
        insert("2222", "12/99", &state);

        let response = list_cards_endpoint(State(state), ApiQuery(CardFilter::default()))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let body = parse_json_body(response).await;
        assert_eq!(body["count"], 2);
        assert_eq!(body["data"][0]["lastFourDigits"], "2222");
    }

    #[tokio::test]
    async fn get_missing_card_is_not_found() {
        let state: CardState = get_test_state();

        let response = get_card_endpoint(Path(1), State(state))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = parse_json_body(response).await;
        assert_eq!(body["error"], "Card not found");
    }

    #[tokio::test]
    async fn expiring_uses_requested_window() {
        let state: CardState = get_test_state();
        insert("1111", &expiry_in_months(1), &state);
        insert("2222", &expiry_in_months(6), &state);
        insert("3333", "12/99", &state);

        let short_window = get_expiring_cards_endpoint(
            State(state.clone()),
            ApiQuery(ExpiringQuery { days: Some(45) }),
        )
        .await
        .unwrap()
        .data
        .unwrap();
        let year_window =
            get_expiring_cards_endpoint(State(state), ApiQuery(ExpiringQuery { days: Some(365) }))
                .await
                .unwrap()
                .data
                .unwrap();

        assert_eq!(short_window.len(), 1);
        assert_eq!(short_window[0].card.last_four_digits.as_str(), "1111");
        assert_ne!(short_window[0].status, CardStatus::Expired);
        assert_eq!(year_window.len(), 2);
    }
}
