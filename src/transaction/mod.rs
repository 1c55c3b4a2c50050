//! The ledger of money paid in by members and spent on the subscription.

mod create;
mod db;
mod delete;
mod domain;
mod edit;
mod list;
mod state;
mod stats;

pub use create::create_transaction_endpoint;
pub use db::{
    count_transactions, create_transaction, create_transaction_table, delete_transaction,
    get_recent_transactions, get_transaction, get_transactions, get_transactions_in_range,
    restore_transaction, update_transaction,
};
pub use delete::delete_transaction_endpoint;
pub use domain::{
    PaymentMethod, Transaction, TransactionCategory, TransactionFilter, TransactionForm,
    TransactionId, TransactionStatus, TransactionSummary, TransactionType, TransactionView,
    sort_newest_first, summarize, validate_amount,
};
pub(crate) use domain::{
    MAX_DESCRIPTION_LENGTH, MAX_NOTES_LENGTH, MAX_REFERENCE_LENGTH, default_status,
    validate_length,
};
pub use edit::update_transaction_endpoint;
pub use list::{
    get_category_transactions_endpoint, get_member_transactions_endpoint,
    get_transaction_endpoint, list_transactions_endpoint,
};
pub use state::TransactionState;
pub use stats::{RECENT_TRANSACTION_COUNT, get_transaction_stats_endpoint};
