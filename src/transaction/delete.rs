//! Transaction deletion endpoint.

use axum::extract::{Path, State};

use crate::{
    Error,
    app_state::lock_connection,
    response::ApiResponse,
    transaction::{TransactionId, TransactionState, delete_transaction},
};

/// Delete the transaction `transaction_id`.
pub async fn delete_transaction_endpoint(
    Path(transaction_id): Path<TransactionId>,
    State(state): State<TransactionState>,
) -> Result<ApiResponse<()>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_transaction(transaction_id, &connection)?;
    tracing::info!("Deleted transaction {transaction_id}");

    Ok(ApiResponse::message("Transaction deleted successfully"))
}
