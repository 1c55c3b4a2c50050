//! Cards that pay for the subscription and the ledger of their balance.

mod create;
mod db;
mod delete;
mod domain;
mod edit;
mod ledger;
mod list;
mod state;
mod stats;
mod transactions;

pub use create::create_card_endpoint;
pub use db::{
    add_card_transaction, count_card_transactions, create_card, create_card_table,
    create_card_transaction_table, delete_card, get_card, get_card_transactions, get_cards,
    get_expiring_cards, get_ledger_totals, restore_card, restore_card_transaction, update_card,
};
pub use delete::delete_card_endpoint;
pub use domain::{
    Card, CardFilter, CardForm, CardId, CardType, CardView, DEFAULT_MONTHLY_LIMIT,
    EXPIRING_SOON_DAYS,
};
pub use edit::update_card_endpoint;
pub use ledger::{
    CardTransaction, CardTransactionCategory, CardTransactionFilter, CardTransactionForm,
    CardTransactionType, CardTransactionView, LedgerTotals, apply_transaction,
};
pub use list::{get_card_endpoint, get_expiring_cards_endpoint, list_cards_endpoint};
pub use state::CardState;
pub use stats::get_card_stats_endpoint;
pub use transactions::{add_card_transaction_endpoint, list_card_transactions_endpoint};
