//! App-wide settings, currently just the cost of the shared subscription.

use std::sync::{Arc, Mutex};

use axum::extract::{FromRef, State};
use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    AppState, Error,
    app_state::lock_connection,
    response::{ApiJson, ApiResponse},
    timezone::get_local_today,
};

/// The monthly price of the subscription used until it is changed.
pub const DEFAULT_SUBSCRIPTION_COST: f64 = 18.99;

/// The settings shared by the whole app.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// What the subscription costs each month.
    #[serde(alias = "youtubePremiumCost")]
    pub subscription_cost: f64,
    /// When the cost was last changed.
    pub last_updated: Date,
}

impl AppSettings {
    /// The settings of a fresh install.
    pub fn new(today: Date) -> Self {
        Self {
            subscription_cost: DEFAULT_SUBSCRIPTION_COST,
            last_updated: today,
        }
    }

    /// Change the subscription cost, stamping the change with `today`.
    ///
    /// # Errors
    /// Returns [Error::Validation] if `cost` is negative or not a number.
    pub fn set_subscription_cost(&mut self, cost: f64, today: Date) -> Result<(), Error> {
        validate_subscription_cost(cost)?;

        self.subscription_cost = cost;
        self.last_updated = today;

        Ok(())
    }
}

fn validate_subscription_cost(cost: f64) -> Result<(), Error> {
    if cost >= 0.0 && cost.is_finite() {
        Ok(())
    } else {
        Err(Error::Validation(
            "Subscription cost must be 0 or greater".to_owned(),
        ))
    }
}

/// Create the settings table and its single row.
///
/// The row is created with the default cost, dated the day the table was made.
pub fn create_settings_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS settings (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            subscription_cost REAL NOT NULL CHECK (subscription_cost >= 0),
            last_updated TEXT NOT NULL
        );",
    )?;

    connection.execute(
        "INSERT OR IGNORE INTO settings (id, subscription_cost, last_updated)
         VALUES (1, ?1, date('now'))",
        [DEFAULT_SUBSCRIPTION_COST],
    )?;

    Ok(())
}

fn map_settings_row(row: &Row) -> Result<AppSettings, rusqlite::Error> {
    Ok(AppSettings {
        subscription_cost: row.get(0)?,
        last_updated: row.get(1)?,
    })
}

/// Retrieve the app settings.
pub fn get_settings(connection: &Connection) -> Result<AppSettings, Error> {
    connection
        .query_row(
            "SELECT subscription_cost, last_updated FROM settings WHERE id = 1",
            [],
            map_settings_row,
        )
        .map_err(Error::from)
}

/// Store `settings`, replacing the current settings.
pub fn save_settings(settings: &AppSettings, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "UPDATE settings SET subscription_cost = ?1, last_updated = ?2 WHERE id = 1",
        params![settings.subscription_cost, settings.last_updated],
    )?;

    Ok(())
}

/// Change the subscription cost and return the updated settings.
///
/// # Errors
/// Returns [Error::Validation] if `cost` is negative or not a number.
pub fn update_subscription_cost(
    cost: f64,
    today: Date,
    connection: &Connection,
) -> Result<AppSettings, Error> {
    let mut settings = get_settings(connection)?;
    settings.set_subscription_cost(cost, today)?;
    save_settings(&settings, connection)?;

    Ok(settings)
}

/// The state needed by the settings endpoints.
#[derive(Debug, Clone)]
pub struct SettingsState {
    /// The local timezone as a canonical timezone name, used to date changes.
    pub local_timezone: String,
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SettingsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The body of a request to change the settings.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsForm {
    /// The new subscription cost.
    #[serde(alias = "youtubePremiumCost")]
    pub subscription_cost: f64,
}

/// Get the app settings.
pub async fn get_settings_endpoint(
    State(state): State<SettingsState>,
) -> Result<ApiResponse<AppSettings>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_settings(&connection).map(ApiResponse::ok)
}

/// Change the subscription cost.
pub async fn update_settings_endpoint(
    State(state): State<SettingsState>,
    ApiJson(form): ApiJson<SettingsForm>,
) -> Result<ApiResponse<AppSettings>, Error> {
    let today = get_local_today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    let settings = update_subscription_cost(form.subscription_cost, today, &connection)?;
    tracing::info!("Subscription cost set to {}", settings.subscription_cost);

    Ok(ApiResponse::ok(settings))
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::{Error, test_utils::get_test_connection};

    use super::{
        AppSettings, DEFAULT_SUBSCRIPTION_COST, create_settings_table, get_settings,
        update_subscription_cost,
    };

    #[test]
    fn starts_with_default_cost() {
        let connection = get_test_connection();

        let settings = get_settings(&connection).unwrap();

        assert_eq!(settings.subscription_cost, DEFAULT_SUBSCRIPTION_COST);
    }

    #[test]
    fn creating_table_again_keeps_settings() {
        let connection = get_test_connection();
        update_subscription_cost(22.99, date!(2025 - 08 - 01), &connection).unwrap();

        create_settings_table(&connection).unwrap();

        assert_eq!(get_settings(&connection).unwrap().subscription_cost, 22.99);
    }

    #[test]
    fn update_sets_cost_and_date() {
        let connection = get_test_connection();

        let settings = update_subscription_cost(0.0, date!(2025 - 08 - 01), &connection).unwrap();

        assert_eq!(
            settings,
            AppSettings {
                subscription_cost: 0.0,
                last_updated: date!(2025 - 08 - 01)
            }
        );
        assert_eq!(get_settings(&connection), Ok(settings));
    }

    #[test]
    fn update_rejects_negative_cost() {
        let connection = get_test_connection();

        let result = update_subscription_cost(-1.0, date!(2025 - 08 - 01), &connection);

        assert_eq!(
            result,
            Err(Error::Validation(
                "Subscription cost must be 0 or greater".to_owned()
            ))
        );
        assert_eq!(
            get_settings(&connection).unwrap().subscription_cost,
            DEFAULT_SUBSCRIPTION_COST
        );
    }

    #[test]
    fn reads_legacy_cost_field() {
        let settings: AppSettings = serde_json::from_str(
            r#"{"youtubePremiumCost": 17.99, "lastUpdated": "2025-07-01"}"#,
        )
        .unwrap();

        assert_eq!(settings.subscription_cost, 17.99);
    }
}

#[cfg(test)]
mod settings_endpoint_tests {
    use axum::{extract::State, http::StatusCode, response::IntoResponse};

    use crate::{
        response::ApiJson,
        settings::{SettingsForm, SettingsState, get_settings_endpoint, update_settings_endpoint},
        test_utils::{get_test_state, parse_json_body},
    };

    #[tokio::test]
    async fn update_then_get() {
        let state: SettingsState = get_test_state();

        let update = update_settings_endpoint(
            State(state.clone()),
            ApiJson(SettingsForm {
                subscription_cost: 22.99,
            }),
        )
        .await
        .into_response();
        let get = get_settings_endpoint(State(state)).await.into_response();

        assert_eq!(update.status(), StatusCode::OK);
        let body = parse_json_body(get).await;
        assert_eq!(body["data"]["subscriptionCost"], 22.99);
    }

    #[tokio::test]
    async fn negative_cost_is_bad_request() {
        let state: SettingsState = get_test_state();

        let response = update_settings_endpoint(
            State(state),
            ApiJson(SettingsForm {
                subscription_cost: -5.0,
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
