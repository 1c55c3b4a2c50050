//! How much money must be put on the card to cover the next subscription payment.

use std::sync::{Arc, Mutex};

use axum::extract::{FromRef, Path, State};
use rusqlite::Connection;
use serde::Serialize;

use crate::{
    AppState, Error,
    app_state::lock_connection,
    card::{CardId, CardTransaction, LedgerTotals, get_card, get_ledger_totals},
    currency::format_currency,
    date_range::DateRange,
    response::ApiResponse,
    settings::get_settings,
    transaction::{Transaction, TransactionFilter, TransactionType, get_transactions},
};

/// The description that marks an outgoing transaction as a subscription payment.
pub const SUBSCRIPTION_DESCRIPTION: &str = "YouTube Premium";

/// Where the subscription cost comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CostSource {
    /// The cost stored in the app settings.
    #[default]
    Settings,
    /// The amount of the first outgoing transaction mentioning the subscription.
    TransactionDescription,
}

/// The shortfall between `cost` and the balance left by `card_transactions`.
///
/// Never negative, a card with enough money needs nothing.
pub fn money_needed(cost: f64, card_transactions: &[CardTransaction]) -> f64 {
    shortfall(cost, LedgerTotals::of(card_transactions).balance())
}

fn shortfall(cost: f64, balance: f64) -> f64 {
    (cost - balance).max(0.0)
}

/// The amount of the oldest outgoing transaction whose description mentions the
/// subscription, or zero if there is none.
pub fn subscription_cost_from_transactions<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
) -> f64 {
    transactions
        .into_iter()
        .filter(|transaction| {
            transaction.transaction_type == TransactionType::Outgoing
                && transaction.description.contains(SUBSCRIPTION_DESCRIPTION)
        })
        .min_by_key(|transaction| transaction.id)
        .map_or(0.0, |transaction| transaction.amount)
}

/// Look up the subscription cost from `source`.
pub fn get_subscription_cost(source: CostSource, connection: &Connection) -> Result<f64, Error> {
    match source {
        CostSource::Settings => Ok(get_settings(connection)?.subscription_cost),
        CostSource::TransactionDescription => {
            let filter = TransactionFilter {
                transaction_type: Some(TransactionType::Outgoing),
                ..Default::default()
            };
            let transactions = get_transactions(&filter, None, connection)?;

            Ok(subscription_cost_from_transactions(&transactions))
        }
    }
}

/// The money needed on a card and the figures it was worked out from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyNeeded {
    pub current_balance: f64,
    pub subscription_cost: f64,
    pub money_needed: f64,
    pub cost_source: CostSource,
}

/// The money-needed figures with the amounts formatted for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyNeededView {
    #[serde(flatten)]
    pub money_needed: MoneyNeeded,
    pub formatted_money_needed: String,
}

impl From<MoneyNeeded> for MoneyNeededView {
    fn from(money_needed: MoneyNeeded) -> Self {
        Self {
            formatted_money_needed: format_currency(money_needed.money_needed),
            money_needed,
        }
    }
}

/// Work out the money needed on card `card_id`.
///
/// The balance is the sum of the card's ledger.
///
/// # Errors
/// Returns [Error::CardNotFound] if `card_id` does not refer to a card.
pub fn get_money_needed(
    card_id: CardId,
    source: CostSource,
    connection: &Connection,
) -> Result<MoneyNeeded, Error> {
    get_card(card_id, connection)?;

    let current_balance = get_ledger_totals(card_id, DateRange::default(), connection)?.balance();
    let subscription_cost = get_subscription_cost(source, connection)?;

    Ok(MoneyNeeded {
        current_balance,
        subscription_cost,
        money_needed: shortfall(subscription_cost, current_balance),
        cost_source: source,
    })
}

/// The state needed by the money-needed endpoint.
#[derive(Debug, Clone)]
pub struct MoneyNeededState {
    /// Where the subscription cost comes from.
    pub cost_source: CostSource,
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for MoneyNeededState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cost_source: state.cost_source,
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Get the money needed on card `card_id` to pay for the subscription.
pub async fn get_money_needed_endpoint(
    Path(card_id): Path<CardId>,
    State(state): State<MoneyNeededState>,
) -> Result<ApiResponse<MoneyNeededView>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_money_needed(card_id, state.cost_source, &connection)
        .map(|money_needed| ApiResponse::ok(money_needed.into()))
}


#[cfg(test)]
mod money_needed_endpoint_tests {
    use axum::{
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
    };
    use time::macros::date;

    use crate::{
        app_state::lock_connection,
        card::{CardTransactionType, add_card_transaction, create_card},
        money_needed::{CostSource, MoneyNeededState, get_money_needed_endpoint},
        settings::update_subscription_cost,
        test_utils::{
            card_form, card_transaction_form, get_test_state, parse_json_body, transaction_form,
        },
        transaction::{TransactionForm, TransactionType, create_transaction},
    };

    fn insert_card_with_balance(state: &MoneyNeededState, deposit: f64) -> i64 {
        let connection = lock_connection(&state.db_connection).unwrap();
        let card = create_card(card_form("1234"), date!(2025 - 08 - 01), &connection).unwrap();
        add_card_transaction(
            card.id,
            card_transaction_form(CardTransactionType::Deposit, deposit),
            &connection,
        )
        .unwrap();

        card.id
    }

    #[tokio::test]
    async fn uses_settings_cost_by_default() {
        let state: MoneyNeededState = get_test_state();
        let card_id = insert_card_with_balance(&state, 10.0);
        update_subscription_cost(
            18.99,
            date!(2025 - 08 - 01),
            &lock_connection(&state.db_connection).unwrap(),
        )
        .unwrap();

        let response = get_money_needed_endpoint(Path(card_id), State(state))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let body = parse_json_body(response).await;
        assert_eq!(body["data"]["costSource"], "settings");
        assert_eq!(body["data"]["formattedMoneyNeeded"], "RM8.99");
    }

    #[tokio::test]
    async fn legacy_source_reads_transactions() {
        let state = MoneyNeededState {
            cost_source: CostSource::TransactionDescription,
            ..get_test_state()
        };
        let card_id = insert_card_with_balance(&state, 50.0);
        create_transaction(
            TransactionForm {
                description: "YouTube Premium - August".to_owned(),
                ..transaction_form(date!(2025 - 08 - 01), 18.99, TransactionType::Outgoing)
            },
            &lock_connection(&state.db_connection).unwrap(),
        )
        .unwrap();

        let money_needed = get_money_needed_endpoint(Path(card_id), State(state))
            .await
            .unwrap()
            .data
            .unwrap()
            .money_needed;

        assert_eq!(money_needed.subscription_cost, 18.99);
        assert_eq!(money_needed.money_needed, 0.0);
        assert_eq!(money_needed.current_balance, 50.0);
    }

    #[tokio::test]
    async fn missing_card_is_not_found() {
        let state: MoneyNeededState = get_test_state();

        let response = get_money_needed_endpoint(Path(3), State(state))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
