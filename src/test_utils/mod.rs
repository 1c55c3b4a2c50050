#![allow(missing_docs)]

pub(crate) mod http;

pub(crate) use http::parse_json_body;

use axum::extract::FromRef;
use rusqlite::Connection;
use time::{Date, macros::date};

use crate::{
    AppState, CostSource, PaginationConfig, RateLimitConfig, RateLimiter,
    card::{
        CardForm, CardTransactionCategory, CardTransactionForm, CardTransactionType, CardType,
        DEFAULT_MONTHLY_LIMIT,
    },
    db::initialize,
    member::{
        DEFAULT_MONTHLY_AMOUNT, DEFAULT_YEARLY_AMOUNT, MemberForm, PaymentStatus, PaymentType,
    },
    transaction::{
        PaymentMethod, TransactionCategory, TransactionForm, TransactionStatus, TransactionType,
    },
};

/// The timezone used by test states, "today" is the current UTC date.
pub(crate) const TEST_TIMEZONE: &str = "Etc/UTC";

/// An in-memory database with every table created.
#[track_caller]
pub(crate) fn get_test_connection() -> Connection {
    let connection = Connection::open_in_memory().expect("Could not open database in memory.");
    initialize(&connection).expect("Could not initialize database.");

    connection
}

#[track_caller]
pub(crate) fn get_test_app_state() -> AppState {
    AppState::new(
        Connection::open_in_memory().expect("Could not open database in memory."),
        TEST_TIMEZONE,
        PaginationConfig::default(),
        CostSource::default(),
        RateLimiter::new(RateLimitConfig::default()),
    )
    .expect("Could not create app state.")
}

/// The sub-state `S` of a fresh [get_test_app_state].
#[track_caller]
pub(crate) fn get_test_state<S: FromRef<AppState>>() -> S {
    S::from_ref(&get_test_app_state())
}

/// A valid, unpaid monthly member.
pub(crate) fn member_form(name: &str) -> MemberForm {
    MemberForm {
        name: name.to_owned(),
        payment_type: PaymentType::Monthly,
        payment_status: PaymentStatus::Unpaid,
        last_payment_date: date!(2025 - 07 - 01),
        next_due_date: date!(2025 - 08 - 01),
        notes: String::new(),
        is_owner: false,
        monthly_amount: DEFAULT_MONTHLY_AMOUNT,
        yearly_amount: DEFAULT_YEARLY_AMOUNT,
    }
}

/// A valid transaction with no member.
pub(crate) fn transaction_form(
    date: Date,
    amount: f64,
    transaction_type: TransactionType,
) -> TransactionForm {
    TransactionForm {
        date,
        amount,
        member_id: None,
        description: "Shared expense".to_owned(),
        transaction_type,
        category: TransactionCategory::General,
        payment_method: PaymentMethod::BankTransfer,
        status: TransactionStatus::Completed,
        receipt_number: String::new(),
        notes: String::new(),
    }
}

/// A valid card with no opening balance that expires in 2099.
pub(crate) fn card_form(last_four_digits: &str) -> CardForm {
    CardForm {
        card_name: "Test card".to_owned(),
        last_four_digits: last_four_digits
            .parse()
            .expect("Could not parse last four digits."),
        expiry_date: "12/99".parse().expect("Could not parse expiry date."),
        card_type: CardType::Visa,
        bank_name: String::new(),
        card_holder_name: String::new(),
        is_active: true,
        notes: String::new(),
        monthly_limit: DEFAULT_MONTHLY_LIMIT,
        current_balance: 0.0,
    }
}

pub(crate) fn card_transaction_form(
    transaction_type: CardTransactionType,
    amount: f64,
) -> CardTransactionForm {
    CardTransactionForm {
        date: date!(2025 - 08 - 01),
        amount,
        description: "Card top up".to_owned(),
        transaction_type,
        category: CardTransactionCategory::Other,
        status: TransactionStatus::Completed,
        reference_number: String::new(),
        notes: String::new(),
    }
}
