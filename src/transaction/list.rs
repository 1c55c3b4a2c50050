//! Endpoints for reading transactions.

use axum::extract::{Path, State};
use serde::Deserialize;
use time::Date;

use crate::{
    Error,
    app_state::lock_connection,
    date_range::DateRange,
    member::{MemberId, get_member},
    pagination::{Page, PageQuery},
    response::{ApiQuery, ApiResponse},
    transaction::{
        Transaction, TransactionCategory, TransactionFilter, TransactionId, TransactionState,
        TransactionStatus, TransactionType, TransactionView, count_transactions, get_transaction,
        get_transactions,
    },
};

/// The query parameters for listing transactions.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionListQuery {
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    pub member_id: Option<MemberId>,
    pub category: Option<TransactionCategory>,
    pub status: Option<TransactionStatus>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl TransactionListQuery {
    fn filter(&self) -> Result<TransactionFilter, Error> {
        let date_range = DateRange {
            start_date: self.start_date,
            end_date: self.end_date,
        }
        .validate()?;

        Ok(TransactionFilter {
            transaction_type: self.transaction_type,
            member_id: self.member_id,
            category: self.category,
            status: self.status,
            date_range,
        })
    }

    fn page_query(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            limit: self.limit,
        }
    }
}

/// The query parameters for the transactions of a member.
#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    /// The maximum number of transactions to return.
    pub limit: Option<u64>,
}

fn to_views(transactions: Vec<Transaction>) -> Vec<TransactionView> {
    transactions.into_iter().map(TransactionView::from).collect()
}

/// List one page of the transactions matching the query string filters, newest first.
pub async fn list_transactions_endpoint(
    State(state): State<TransactionState>,
    ApiQuery(query): ApiQuery<TransactionListQuery>,
) -> Result<ApiResponse<Vec<TransactionView>>, Error> {
    let filter = query.filter()?;
    let page = Page::resolve(query.page_query(), &state.pagination_config)?;
    let connection = lock_connection(&state.db_connection)?;

    let transactions = get_transactions(&filter, Some(page), &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve transactions: {error}"))?;
    let total = count_transactions(&filter, &connection)?;

    Ok(ApiResponse::page(
        to_views(transactions),
        total,
        page.info(total),
    ))
}

/// Get a single transaction.
pub async fn get_transaction_endpoint(
    Path(transaction_id): Path<TransactionId>,
    State(state): State<TransactionState>,
) -> Result<ApiResponse<TransactionView>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let transaction = get_transaction(transaction_id, &connection)?;

    Ok(ApiResponse::ok(transaction.into()))
}

/// List the most recent transactions of the member `member_id`.
pub async fn get_member_transactions_endpoint(
    Path(member_id): Path<MemberId>,
    State(state): State<TransactionState>,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> Result<ApiResponse<Vec<TransactionView>>, Error> {
    let page = Page::resolve(
        PageQuery {
            page: None,
            limit: query.limit,
        },
        &state.pagination_config,
    )?;
    let connection = lock_connection(&state.db_connection)?;

    get_member(member_id, &connection)?;

    let filter = TransactionFilter {
        member_id: Some(member_id),
        ..Default::default()
    };
    let transactions = get_transactions(&filter, Some(page), &connection)?;

    Ok(ApiResponse::list(to_views(transactions)))
}

/// List one page of the transactions in `category`, newest first.
pub async fn get_category_transactions_endpoint(
    Path(category): Path<String>,
    State(state): State<TransactionState>,
    ApiQuery(page_query): ApiQuery<PageQuery>,
) -> Result<ApiResponse<Vec<TransactionView>>, Error> {
    let category: TransactionCategory = category.parse()?;
    let page = Page::resolve(page_query, &state.pagination_config)?;
    let connection = lock_connection(&state.db_connection)?;

    let filter = TransactionFilter {
        category: Some(category),
        ..Default::default()
    };
    let transactions = get_transactions(&filter, Some(page), &connection)?;
    let total = count_transactions(&filter, &connection)?;

    Ok(ApiResponse::page(
        to_views(transactions),
        total,
        page.info(total),
    ))
}

#[cfg(test)]
mod list_transaction_endpoint_tests {
    use axum::{
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
    };
    use time::{Date, Month, macros::date};

    use crate::{
        app_state::lock_connection,
        member::create_member,
        pagination::PageQuery,
        response::ApiQuery,
        test_utils::{get_test_state, member_form, parse_json_body, transaction_form},
        transaction::{
            TransactionCategory, TransactionForm, TransactionState, TransactionType,
            create_transaction, get_category_transactions_endpoint,
            get_member_transactions_endpoint, get_transaction_endpoint,
            list_transactions_endpoint,
        },
    };

    use super::{LimitQuery, TransactionListQuery};

    fn insert_outgoing_days(days: std::ops::RangeInclusive<u8>, state: &TransactionState) {
        let connection = lock_connection(&state.db_connection).unwrap();

        for day in days {
            let date = Date::from_calendar_date(2025, Month::August, day).unwrap();
            create_transaction(
                transaction_form(date, 18.99, TransactionType::Outgoing),
                &connection,
            )
            .unwrap();
        }
    }

    #[tokio::test]
    async fn list_is_paginated() {
        let state: TransactionState = get_test_state();
        insert_outgoing_days(1..=12, &state);
        let query = TransactionListQuery {
            page: Some(2),
            ..Default::default()
        };

        let response = list_transactions_endpoint(State(state), ApiQuery(query))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let body = parse_json_body(response).await;
        assert_eq!(body["count"], 2);
        assert_eq!(body["total"], 12);
        assert_eq!(body["pagination"]["page"], 2);
        assert_eq!(body["pagination"]["limit"], 10);
        assert_eq!(body["pagination"]["pages"], 2);
        assert_eq!(body["data"][0]["date"], "2025-08-02");
    }

    #[tokio::test]
    async fn list_filters_by_date_range() {
        let state: TransactionState = get_test_state();
        insert_outgoing_days(1..=10, &state);
        let query = TransactionListQuery {
            start_date: Some(date!(2025 - 08 - 03)),
            end_date: Some(date!(2025 - 08 - 05)),
            ..Default::default()
        };

        let response = list_transactions_endpoint(State(state), ApiQuery(query))
            .await
            .unwrap();

        assert_eq!(response.total, Some(3));
        assert_eq!(response.count, Some(3));
    }

    #[tokio::test]
    async fn list_rejects_reversed_date_range() {
        let state: TransactionState = get_test_state();
        let query = TransactionListQuery {
            start_date: Some(date!(2025 - 08 - 05)),
            end_date: Some(date!(2025 - 08 - 03)),
            ..Default::default()
        };

        let response = list_transactions_endpoint(State(state), ApiQuery(query))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn get_missing_transaction_is_not_found() {
        let state: TransactionState = get_test_state();

        let response = get_transaction_endpoint(Path(1), State(state))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = parse_json_body(response).await;
        assert_eq!(body["error"], "Transaction not found");
    }

    #[tokio::test]
    async fn member_transactions_are_limited() {
        let state: TransactionState = get_test_state();
        let member_id = {
            let connection = lock_connection(&state.db_connection).unwrap();
            let member = create_member(member_form("Alice"), &connection).unwrap();
            for day in 1..=3 {
                create_transaction(
                    TransactionForm {
                        member_id: Some(member.id),
                        ..transaction_form(
                            Date::from_calendar_date(2025, Month::August, day).unwrap(),
                            3.79,
                            TransactionType::Incoming,
                        )
                    },
                    &connection,
                )
                .unwrap();
            }
            member.id
        };
        insert_outgoing_days(1..=3, &state);

        let response = get_member_transactions_endpoint(
            Path(member_id),
            State(state),
            ApiQuery(LimitQuery { limit: Some(2) }),
        )
        .await
        .unwrap();

        let transactions = response.data.unwrap();
        assert_eq!(transactions.len(), 2);
        assert!(
            transactions
                .iter()
                .all(|view| view.transaction.member_id == Some(member_id))
        );
    }

    #[tokio::test]
    async fn member_transactions_for_missing_member_is_not_found() {
        let state: TransactionState = get_test_state();

        let response = get_member_transactions_endpoint(
            Path(3),
            State(state),
            ApiQuery(LimitQuery::default()),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn category_transactions() {
        let state: TransactionState = get_test_state();
        insert_outgoing_days(1..=2, &state);
        create_transaction(
            TransactionForm {
                category: TransactionCategory::Subscription,
                ..transaction_form(date!(2025 - 08 - 09), 18.99, TransactionType::Outgoing)
            },
            &lock_connection(&state.db_connection).unwrap(),
        )
        .unwrap();

        let response = get_category_transactions_endpoint(
            Path("Subscription".to_owned()),
            State(state),
            ApiQuery(PageQuery::default()),
        )
        .await
        .unwrap();

        assert_eq!(response.total, Some(1));
        assert_eq!(
            response.data.unwrap()[0].transaction.category,
            TransactionCategory::Subscription
        );
    }

    #[tokio::test]
    async fn unknown_category_is_bad_request() {
        let state: TransactionState = get_test_state();

        let response = get_category_transactions_endpoint(
            Path("Groceries".to_owned()),
            State(state),
            ApiQuery(PageQuery::default()),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
