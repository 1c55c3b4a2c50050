//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::{
    Error, db::initialize, money_needed::CostSource, pagination::PaginationConfig,
    rate_limit::RateLimiter,
};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kuala_Lumpur".
    ///
    /// Used to decide what "today" is for due dates and card expiry.
    pub local_timezone: String,

    /// The config that controls how to page lists of transactions.
    pub pagination_config: PaginationConfig,

    /// Where the subscription cost for the money-needed calculation comes from.
    pub cost_source: CostSource,

    /// Limits how many API requests each client may make.
    pub rate_limiter: RateLimiter,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    /// `local_timezone` should be a valid, canonical timezone name, e.g. "Asia/Kuala_Lumpur".
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        local_timezone: &str,
        pagination_config: PaginationConfig,
        cost_source: CostSource,
        rate_limiter: RateLimiter,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            local_timezone: local_timezone.to_owned(),
            pagination_config,
            cost_source,
            rate_limiter,
            db_connection: Arc::new(Mutex::new(db_connection)),
        })
    }
}

/// Acquire the database lock.
///
/// # Errors
/// Returns [Error::DatabaseLockError] if the lock is poisoned.
pub fn lock_connection(
    db_connection: &Arc<Mutex<Connection>>,
) -> Result<MutexGuard<'_, Connection>, Error> {
    db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })
}
