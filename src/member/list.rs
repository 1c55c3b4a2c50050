//! Endpoints for reading members.

use axum::extract::{Path, State};
use serde::Deserialize;

use crate::{
    Error,
    app_state::lock_connection,
    member::{
        MemberFilter, MemberId, MemberState, MemberStats, MemberView, get_member,
        get_member_stats, get_members, get_overdue_members, get_upcoming_members,
    },
    response::{ApiQuery, ApiResponse},
    timezone::get_local_today,
};

/// How many days ahead to look for upcoming payments when not specified.
pub const DEFAULT_UPCOMING_DAYS: u32 = 30;

/// The query parameters for the upcoming payments endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct UpcomingQuery {
    /// How many days ahead to look, defaults to [DEFAULT_UPCOMING_DAYS].
    pub days: Option<u32>,
}

/// List the members matching the query string filters, sorted by name.
pub async fn list_members_endpoint(
    State(state): State<MemberState>,
    ApiQuery(filter): ApiQuery<MemberFilter>,
) -> Result<ApiResponse<Vec<MemberView>>, Error> {
    let today = get_local_today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    let members = get_members(&filter, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve members: {error}"))?;

    Ok(ApiResponse::list(
        members
            .into_iter()
            .map(|member| MemberView::new(member, today))
            .collect(),
    ))
}

/// Get a single member.
pub async fn get_member_endpoint(
    Path(member_id): Path<MemberId>,
    State(state): State<MemberState>,
) -> Result<ApiResponse<MemberView>, Error> {
    let today = get_local_today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    let member = get_member(member_id, &connection)?;

    Ok(ApiResponse::ok(MemberView::new(member, today)))
}

/// List unpaid members whose due date has passed.
pub async fn get_overdue_members_endpoint(
    State(state): State<MemberState>,
) -> Result<ApiResponse<Vec<MemberView>>, Error> {
    let today = get_local_today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    let members = get_overdue_members(today, &connection)?;

    Ok(ApiResponse::list(
        members
            .into_iter()
            .map(|member| MemberView::new(member, today))
            .collect(),
    ))
}

/// List unpaid members due within the next `days` days.
pub async fn get_upcoming_members_endpoint(
    State(state): State<MemberState>,
    ApiQuery(query): ApiQuery<UpcomingQuery>,
) -> Result<ApiResponse<Vec<MemberView>>, Error> {
    let today = get_local_today(&state.local_timezone)?;
    let days = query.days.unwrap_or(DEFAULT_UPCOMING_DAYS);
    let connection = lock_connection(&state.db_connection)?;

    let members = get_upcoming_members(today, days, &connection)?;

    Ok(ApiResponse::list(
        members
            .into_iter()
            .map(|member| MemberView::new(member, today))
            .collect(),
    ))
}

/// Count members by status and payment type.
pub async fn get_member_stats_endpoint(
    State(state): State<MemberState>,
) -> Result<ApiResponse<MemberStats>, Error> {
    let today = get_local_today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    Ok(ApiResponse::ok(get_member_stats(today, &connection)?))
}
