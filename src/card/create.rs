//! Card creation endpoint.

use axum::{extract::State, http::StatusCode};

use crate::{
    Error,
    app_state::lock_connection,
    card::{CardForm, CardState, CardView, create_card},
    response::{ApiJson, ApiResponse},
    timezone::get_local_today,
};

/// Create a card from the JSON body.
///
/// Responds with `201 Created` and the new card.
pub async fn create_card_endpoint(
    State(state): State<CardState>,
    ApiJson(form): ApiJson<CardForm>,
) -> Result<(StatusCode, ApiResponse<CardView>), Error> {
    let today = get_local_today(&state.local_timezone)?;
    let form = form.validate(today)?;
    let connection = lock_connection(&state.db_connection)?;

    let card = create_card(form, today, &connection)?;
    tracing::info!(
        "Created card {} ending in {} with a balance of {}",
        card.id,
        card.last_four_digits,
        card.current_balance
    );

    Ok((StatusCode::CREATED, ApiResponse::ok(CardView::new(card, today))))
}

#[cfg(test)]
mod create_card_endpoint_tests {
    use axum::{extract::State, http::StatusCode, response::IntoResponse};

    use crate::{
        card::{CardForm, CardState, create_card_endpoint},
        response::ApiJson,
        test_utils::{card_form, get_test_state, parse_json_body},
    };

    #[tokio::test]
    async fn responds_with_created_card() {
        let state: CardState = get_test_state();
        let form = CardForm {
            current_balance: 50.0,
            ..card_form("1234")
        };

        let response = create_card_endpoint(State(state), ApiJson(form))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = parse_json_body(response).await;
        assert_eq!(body["data"]["maskedCardNumber"], "**** **** **** 1234");
        assert_eq!(body["data"]["currentBalance"], 50.0);
        assert_eq!(body["data"]["status"], "Active");
    }

    #[tokio::test]
    async fn expired_card_is_saved_inactive() {
        let state: CardState = get_test_state();
        let form = CardForm {
            expiry_date: "01/20".parse().unwrap(),
            ..card_form("1234")
        };

        let view = create_card_endpoint(State(state), ApiJson(form))
            .await
            .unwrap()
            .1
            .data
            .unwrap();

        assert!(!view.card.is_active);
    }

    #[tokio::test]
    async fn duplicate_digits_are_rejected() {
        let state: CardState = get_test_state();
        create_card_endpoint(State(state.clone()), ApiJson(card_form("1234")))
            .await
            .unwrap();

        let response = create_card_endpoint(State(state), ApiJson(card_form("1234")))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = parse_json_body(response).await;
        assert_eq!(
            body["error"],
            "Card with the last four digits 1234 already exists"
        );
    }
}
