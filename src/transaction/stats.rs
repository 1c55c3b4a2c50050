//! Income and outgoing totals endpoint.

use axum::extract::State;
use serde::Serialize;

use crate::{
    Error,
    app_state::lock_connection,
    date_range::DateRange,
    response::{ApiQuery, ApiResponse},
    transaction::{
        TransactionState, TransactionSummary, TransactionView, get_recent_transactions,
        get_transactions_in_range, summarize,
    },
};

/// How many of the latest transactions to include with the stats.
pub const RECENT_TRANSACTION_COUNT: u64 = 5;

/// The totals for a date range plus the latest transactions overall.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStats {
    #[serde(flatten)]
    pub summary: TransactionSummary,
    /// The most recent transactions, ignoring the date range.
    pub recent_transactions: Vec<TransactionView>,
}

/// Sum the transactions in the optional `startDate`/`endDate` range.
pub async fn get_transaction_stats_endpoint(
    State(state): State<TransactionState>,
    ApiQuery(date_range): ApiQuery<DateRange>,
) -> Result<ApiResponse<TransactionStats>, Error> {
    let date_range = date_range.validate()?;
    let connection = lock_connection(&state.db_connection)?;

    let transactions = get_transactions_in_range(date_range, &connection)?;
    let recent_transactions = get_recent_transactions(RECENT_TRANSACTION_COUNT, &connection)?;

    Ok(ApiResponse::ok(TransactionStats {
        summary: summarize(&transactions),
        recent_transactions: recent_transactions
            .into_iter()
            .map(TransactionView::from)
            .collect(),
    }))
}

#[cfg(test)]
mod transaction_stats_endpoint_tests {
    use axum::{extract::State, response::IntoResponse};
    use time::{Date, Month, macros::date};

    use crate::{
        app_state::lock_connection,
        date_range::DateRange,
        member::create_member,
        response::ApiQuery,
        test_utils::{get_test_state, member_form, parse_json_body, transaction_form},
        transaction::{
            TransactionForm, TransactionState, TransactionType, create_transaction,
            get_transaction_stats_endpoint,
        },
    };

    fn seed(state: &TransactionState) {
        let connection = lock_connection(&state.db_connection).unwrap();
        let member = create_member(member_form("Alice"), &connection).unwrap();

        for day in 1..=4 {
            create_transaction(
                TransactionForm {
                    member_id: Some(member.id),
                    ..transaction_form(
                        Date::from_calendar_date(2025, Month::August, day).unwrap(),
                        10.0,
                        TransactionType::Incoming,
                    )
                },
                &connection,
            )
            .unwrap();
        }
        for day in [2, 6] {
            create_transaction(
                transaction_form(
                    Date::from_calendar_date(2025, Month::August, day).unwrap(),
                    5.0,
                    TransactionType::Outgoing,
                ),
                &connection,
            )
            .unwrap();
        }
    }

    #[tokio::test]
    async fn totals_all_transactions() {
        let state: TransactionState = get_test_state();
        seed(&state);

        let stats = get_transaction_stats_endpoint(State(state), ApiQuery(DateRange::default()))
            .await
            .unwrap()
            .data
            .unwrap();

        assert_eq!(stats.summary.total_income, 40.0);
        assert_eq!(stats.summary.total_outgoing, 10.0);
        assert_eq!(stats.summary.net_balance, 30.0);
        assert_eq!(stats.summary.income_count, 4);
        assert_eq!(stats.summary.outgoing_count, 2);
        assert_eq!(stats.recent_transactions.len(), 5);
        assert_eq!(
            stats.recent_transactions[0].transaction.date,
            date!(2025 - 08 - 06)
        );
    }

    #[tokio::test]
    async fn date_range_limits_totals_but_not_recent() {
        let state: TransactionState = get_test_state();
        seed(&state);
        let date_range = DateRange {
            start_date: Some(date!(2025 - 08 - 02)),
            end_date: Some(date!(2025 - 08 - 03)),
        };

        let stats = get_transaction_stats_endpoint(State(state), ApiQuery(date_range))
            .await
            .unwrap()
            .data
            .unwrap();

        assert_eq!(stats.summary.total_income, 20.0);
        assert_eq!(stats.summary.total_outgoing, 5.0);
        assert_eq!(stats.summary.net_balance, 15.0);
        assert_eq!(stats.recent_transactions.len(), 5);
    }

    #[tokio::test]
    async fn stats_are_flattened_in_json() {
        let state: TransactionState = get_test_state();
        seed(&state);

        let response = get_transaction_stats_endpoint(State(state), ApiQuery(DateRange::default()))
            .await
            .unwrap();
        let body = parse_json_body(response.into_response()).await;

        assert_eq!(body["data"]["totalIncome"], 40.0);
        assert_eq!(body["data"]["netBalance"], 30.0);
        assert_eq!(body["data"]["recentTransactions"][0]["formattedAmount"], "RM5.00");
    }
}
