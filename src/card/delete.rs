//! Card deletion endpoint.

use axum::extract::{Path, State};

use crate::{
    Error,
    app_state::lock_connection,
    card::{CardId, CardState, delete_card},
    response::ApiResponse,
};

/// Delete the card `card_id`, refused while it has transactions.
pub async fn delete_card_endpoint(
    Path(card_id): Path<CardId>,
    State(state): State<CardState>,
) -> Result<ApiResponse<()>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_card(card_id, &connection)?;
    tracing::info!("Deleted card {card_id}");

    Ok(ApiResponse::message("Card deleted successfully"))
}
