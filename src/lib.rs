//! ytracker is a small web service for splitting a shared subscription cost
//! between the members of a family plan.
//!
//! It keeps track of who has paid, a ledger of incoming and outgoing money,
//! and the balance of the card that pays for the subscription.
//!
//! This library provides a JSON REST API backed by SQLite, and a file-backed
//! [DataStore] that uses the same domain rules for offline use.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod app_state;
mod card;
mod currency;
mod dashboard;
mod database_id;
mod date_range;
mod db;
mod endpoints;
mod logging;
mod member;
mod money_needed;
mod pagination;
mod rate_limit;
mod response;
mod routing;
mod settings;
mod store;
mod text_enum;
mod timezone;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use money_needed::CostSource;
pub use pagination::PaginationConfig;
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use routing::build_router;
pub use store::DataStore;
pub use timezone::get_local_today;

use crate::database_id::DatabaseId;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("Could not install Ctrl+C handler: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(error) => {
                tracing::error!("Could not install terminate signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A required field was missing or a field had an invalid value.
    ///
    /// The string describes which field was wrong and why.
    #[error("{0}")]
    Validation(String),

    /// Another member already uses this name (names are compared case-insensitively).
    #[error("Member with the name \"{0}\" already exists")]
    DuplicateMemberName(String),

    /// Another card already has these last four digits.
    #[error("Card with the last four digits {0} already exists")]
    DuplicateCardDigits(String),

    /// The member ID did not match a member.
    #[error("Member not found")]
    MemberNotFound,

    /// The transaction ID did not match a transaction.
    #[error("Transaction not found")]
    TransactionNotFound,

    /// The card ID did not match a card.
    #[error("Card not found")]
    CardNotFound,

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An incoming transaction was submitted without a member.
    #[error("Incoming transactions must be associated with a member")]
    IncomingWithoutMember,

    /// A transaction referred to a member that does not exist.
    #[error("Member {0} does not exist")]
    UnknownMember(DatabaseId),

    /// A withdrawal was larger than the balance of the card.
    #[error("Insufficient balance: cannot withdraw {amount:.2} from a balance of {balance:.2}")]
    InsufficientBalance {
        /// The balance of the card before the withdrawal.
        balance: f64,
        /// The amount that was requested.
        amount: f64,
    },

    /// A card cannot be deleted while it still has transactions.
    #[error("Cannot delete card with existing transactions")]
    CardHasTransactions,

    /// The snapshot file could not be read, written or parsed.
    #[error("could not access the data snapshot: {0}")]
    SnapshotError(String),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_)
            | Error::DuplicateMemberName(_)
            | Error::DuplicateCardDigits(_)
            | Error::IncomingWithoutMember
            | Error::UnknownMember(_)
            | Error::InsufficientBalance { .. }
            | Error::CardHasTransactions => StatusCode::BAD_REQUEST,
            Error::MemberNotFound
            | Error::TransactionNotFound
            | Error::CardNotFound
            | Error::NotFound => StatusCode::NOT_FOUND,
            Error::SnapshotError(_)
            | Error::InvalidTimezoneError(_)
            | Error::SqlError(_)
            | Error::DatabaseLockError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if status.is_server_error() {
            // Internal details stay in the server logs.
            tracing::error!("An unexpected error occurred: {}", self);
            "Something went wrong, check the server logs for more details".to_owned()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

#[cfg(test)]
mod error_response_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use crate::Error;

    #[test]
    fn validation_errors_are_bad_requests() {
        let response =
            Error::Validation("Amount must be greater than 0".to_owned()).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_resources_are_not_found() {
        for error in [
            Error::MemberNotFound,
            Error::TransactionNotFound,
            Error::CardNotFound,
            Error::NotFound,
        ] {
            assert_eq!(error.into_response().status(), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn business_rule_errors_are_bad_requests() {
        for error in [
            Error::IncomingWithoutMember,
            Error::CardHasTransactions,
            Error::InsufficientBalance {
                balance: 31.01,
                amount: 50.0,
            },
            Error::DuplicateMemberName("Alice".to_owned()),
        ] {
            assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn lock_errors_are_internal_errors() {
        let response = Error::DatabaseLockError.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn insufficient_balance_message_shows_both_amounts() {
        let error = Error::InsufficientBalance {
            balance: 31.01,
            amount: 50.0,
        };

        assert_eq!(
            error.to_string(),
            "Insufficient balance: cannot withdraw 50.00 from a balance of 31.01"
        );
    }
}
