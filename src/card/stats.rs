//! Card balance and ledger totals endpoint.

use axum::extract::{Path, State};
use serde::Serialize;

use crate::{
    Error,
    app_state::lock_connection,
    card::{
        CardId, CardState, CardTransactionFilter, CardTransactionView, LedgerTotals, get_card,
        get_card_transactions, get_ledger_totals,
    },
    date_range::DateRange,
    pagination::Page,
    response::{ApiQuery, ApiResponse},
    transaction::RECENT_TRANSACTION_COUNT,
};

/// A card's balance, its ledger totals and its latest transactions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardStats {
    pub current_balance: f64,
    #[serde(flatten)]
    pub totals: LedgerTotals,
    /// The most recent transactions, ignoring the date range.
    pub recent_transactions: Vec<CardTransactionView>,
}

/// Summarise the ledger of card `card_id` in the optional `startDate`/`endDate` range.
pub async fn get_card_stats_endpoint(
    Path(card_id): Path<CardId>,
    State(state): State<CardState>,
    ApiQuery(date_range): ApiQuery<DateRange>,
) -> Result<ApiResponse<CardStats>, Error> {
    let date_range = date_range.validate()?;
    let connection = lock_connection(&state.db_connection)?;

    let card = get_card(card_id, &connection)?;
    let totals = get_ledger_totals(card_id, date_range, &connection)?;
    let recent_transactions = get_card_transactions(
        card_id,
        &CardTransactionFilter::default(),
        Some(Page {
            page: 1,
            limit: RECENT_TRANSACTION_COUNT,
        }),
        &connection,
    )?;

    Ok(ApiResponse::ok(CardStats {
        current_balance: card.current_balance,
        totals,
        recent_transactions: recent_transactions
            .into_iter()
            .map(CardTransactionView::from)
            .collect(),
    }))
}
