//! Card update endpoint.

use axum::extract::{Path, State};

use crate::{
    Error,
    app_state::lock_connection,
    card::{CardForm, CardId, CardState, CardView, update_card},
    response::{ApiJson, ApiResponse},
    timezone::get_local_today,
};

/// Replace the details of card `card_id` with the JSON body.
///
/// Any `currentBalance` in the body is ignored.
pub async fn update_card_endpoint(
    Path(card_id): Path<CardId>,
    State(state): State<CardState>,
    ApiJson(form): ApiJson<CardForm>,
) -> Result<ApiResponse<CardView>, Error> {
    let today = get_local_today(&state.local_timezone)?;
    let form = form.validate(today)?;
    let connection = lock_connection(&state.db_connection)?;

    let card = update_card(card_id, form, &connection)?;
    tracing::info!("Updated card {card_id}");

    Ok(ApiResponse::ok(CardView::new(card, today)))
}
