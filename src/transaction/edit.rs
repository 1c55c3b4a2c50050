//! Transaction update endpoint.

use axum::extract::{Path, State};

use crate::{
    Error,
    app_state::lock_connection,
    response::{ApiJson, ApiResponse},
    transaction::{
        TransactionForm, TransactionId, TransactionState, TransactionView, update_transaction,
    },
};

/// Replace the transaction `transaction_id` with the JSON body.
pub async fn update_transaction_endpoint(
    Path(transaction_id): Path<TransactionId>,
    State(state): State<TransactionState>,
    ApiJson(form): ApiJson<TransactionForm>,
) -> Result<ApiResponse<TransactionView>, Error> {
    let form = form.validate()?;
    let connection = lock_connection(&state.db_connection)?;

    let transaction = update_transaction(transaction_id, form, &connection)?;
    tracing::info!("Updated transaction {transaction_id}");

    Ok(ApiResponse::ok(transaction.into()))
}
