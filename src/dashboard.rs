//! The dashboard: a one-request overview of members, money and cards.

use std::sync::{Arc, Mutex};

use axum::extract::{FromRef, State};
use rusqlite::Connection;
use serde::Serialize;
use time::Date;

use crate::{
    AppState, Error,
    app_state::lock_connection,
    card::{CardFilter, EXPIRING_SOON_DAYS, get_cards, get_expiring_cards},
    date_range::DateRange,
    member::{
        DEFAULT_UPCOMING_DAYS, MemberStats, MemberView, get_member_stats, get_upcoming_members,
    },
    response::ApiResponse,
    timezone::get_local_today,
    transaction::{get_transactions_in_range, summarize},
};

/// How many upcoming payments the dashboard lists.
const UPCOMING_PAYMENT_COUNT: usize = 5;

/// The state needed for the dashboard.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kuala_Lumpur".
    pub local_timezone: String,
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Member counts shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemberCounts {
    pub total: u32,
    pub paid: u32,
    pub unpaid: u32,
    pub overdue: u32,
    pub upcoming: u32,
}

impl From<MemberStats> for MemberCounts {
    fn from(stats: MemberStats) -> Self {
        Self {
            total: stats.total,
            paid: stats.paid,
            unpaid: stats.unpaid,
            overdue: stats.overdue,
            upcoming: stats.upcoming,
        }
    }
}

/// All-time money totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyTotals {
    pub total_income: f64,
    pub total_outgoing: f64,
    pub net_balance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CardCounts {
    /// Cards that are switched on, including expired ones not yet saved.
    pub active: usize,
    /// Active cards expiring within 30 days.
    pub expiring: usize,
}

/// Everything on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub members: MemberCounts,
    pub transactions: MoneyTotals,
    pub cards: CardCounts,
    /// The next few unpaid members due within 30 days, soonest first.
    pub upcoming_payments: Vec<MemberView>,
}

/// Put together the dashboard as of `today`.
pub fn get_dashboard(today: Date, connection: &Connection) -> Result<Dashboard, Error> {
    let member_stats = get_member_stats(today, connection)?;
    let summary = summarize(&get_transactions_in_range(DateRange::default(), connection)?);
    let active_cards = get_cards(
        &CardFilter {
            is_active: Some(true),
            card_type: None,
        },
        connection,
    )?;
    let expiring_cards = get_expiring_cards(today, EXPIRING_SOON_DAYS, connection)?;
    let upcoming_payments = get_upcoming_members(today, DEFAULT_UPCOMING_DAYS, connection)?
        .into_iter()
        .take(UPCOMING_PAYMENT_COUNT)
        .map(|member| MemberView::new(member, today))
        .collect();

    Ok(Dashboard {
        members: member_stats.into(),
        transactions: MoneyTotals {
            total_income: summary.total_income,
            total_outgoing: summary.total_outgoing,
            net_balance: summary.net_balance,
        },
        cards: CardCounts {
            active: active_cards.len(),
            expiring: expiring_cards.len(),
        },
        upcoming_payments,
    })
}

/// Get the dashboard overview.
pub async fn get_dashboard_endpoint(
    State(state): State<DashboardState>,
) -> Result<ApiResponse<Dashboard>, Error> {
    let today = get_local_today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    get_dashboard(today, &connection).map(ApiResponse::ok)
}
