//! Endpoints for a card's ledger.

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use time::Date;

use crate::{
    Error,
    app_state::lock_connection,
    card::{
        CardId, CardState, CardTransactionCategory, CardTransactionFilter, CardTransactionForm,
        CardTransactionType, CardTransactionView, add_card_transaction, count_card_transactions,
        get_card, get_card_transactions,
    },
    date_range::DateRange,
    pagination::{Page, PageQuery},
    response::{ApiJson, ApiQuery, ApiResponse},
};

/// The query parameters for listing a card's transactions.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardTransactionListQuery {
    #[serde(rename = "type")]
    pub transaction_type: Option<CardTransactionType>,
    pub category: Option<CardTransactionCategory>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// List one page of the transactions of card `card_id`, newest first.
pub async fn list_card_transactions_endpoint(
    Path(card_id): Path<CardId>,
    State(state): State<CardState>,
    ApiQuery(query): ApiQuery<CardTransactionListQuery>,
) -> Result<ApiResponse<Vec<CardTransactionView>>, Error> {
    let date_range = DateRange {
        start_date: query.start_date,
        end_date: query.end_date,
    }
    .validate()?;
    let filter = CardTransactionFilter {
        transaction_type: query.transaction_type,
        category: query.category,
        date_range,
    };
    let page = Page::resolve(
        PageQuery {
            page: query.page,
            limit: query.limit,
        },
        &state.pagination_config,
    )?;
    let connection = lock_connection(&state.db_connection)?;

    get_card(card_id, &connection)?;

    let transactions = get_card_transactions(card_id, &filter, Some(page), &connection)?;
    let total = count_card_transactions(card_id, &filter, &connection)?;

    Ok(ApiResponse::page(
        transactions
            .into_iter()
            .map(CardTransactionView::from)
            .collect(),
        total,
        page.info(total),
    ))
}

/// Record a deposit or withdrawal on card `card_id` from the JSON body.
///
/// Responds with `201 Created` and the new card transaction.
pub async fn add_card_transaction_endpoint(
    Path(card_id): Path<CardId>,
    State(state): State<CardState>,
    ApiJson(form): ApiJson<CardTransactionForm>,
) -> Result<(StatusCode, ApiResponse<CardTransactionView>), Error> {
    let form = form.validate()?;
    let connection = lock_connection(&state.db_connection)?;

    let transaction = add_card_transaction(card_id, form, &connection).inspect_err(|error| {
        tracing::warn!("Could not apply transaction to card {card_id}: {error}")
    })?;
    tracing::info!(
        "{} of {} on card {card_id}, balance is now {}",
        transaction.transaction_type,
        transaction.amount,
        transaction.balance_after
    );

    Ok((StatusCode::CREATED, ApiResponse::ok(transaction.into())))
}
