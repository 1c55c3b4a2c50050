//! Member creation endpoint.

use axum::{extract::State, http::StatusCode};

use crate::{
    Error,
    app_state::lock_connection,
    member::{MemberForm, MemberState, MemberView, create_member},
    response::{ApiJson, ApiResponse},
    timezone::get_local_today,
};

/// Create a member from the JSON body.
///
/// Responds with `201 Created` and the new member.
pub async fn create_member_endpoint(
    State(state): State<MemberState>,
    ApiJson(form): ApiJson<MemberForm>,
) -> Result<(StatusCode, ApiResponse<MemberView>), Error> {
    let form = form.validate()?;
    let today = get_local_today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    let member = create_member(form, &connection)?;
    tracing::info!("Created member {} \"{}\"", member.id, member.name);

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(MemberView::new(member, today)),
    ))
}
