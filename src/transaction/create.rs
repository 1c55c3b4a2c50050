//! Transaction creation endpoint.

use axum::{extract::State, http::StatusCode};

use crate::{
    Error,
    app_state::lock_connection,
    response::{ApiJson, ApiResponse},
    transaction::{TransactionForm, TransactionState, TransactionView, create_transaction},
};

/// Record a transaction from the JSON body.
///
/// Responds with `201 Created` and the new transaction.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    ApiJson(form): ApiJson<TransactionForm>,
) -> Result<(StatusCode, ApiResponse<TransactionView>), Error> {
    let form = form.validate()?;
    let connection = lock_connection(&state.db_connection)?;

    let transaction = create_transaction(form, &connection)?;
    tracing::info!(
        "Created {} transaction {} of {}",
        transaction.transaction_type,
        transaction.id,
        transaction.amount
    );

    Ok((StatusCode::CREATED, ApiResponse::ok(transaction.into())))
}
