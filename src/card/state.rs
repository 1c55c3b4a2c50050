//! The state shared by the card endpoints.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::Connection;

use crate::{AppState, pagination::PaginationConfig};

/// The state needed by the card endpoints.
#[derive(Debug, Clone)]
pub struct CardState {
    /// The local timezone as a canonical timezone name, used to decide what "today" is.
    pub local_timezone: String,
    /// The config that controls how to page lists of card transactions.
    pub pagination_config: PaginationConfig,
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            pagination_config: state.pagination_config.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}
