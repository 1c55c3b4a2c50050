//! Endpoints for editing a member and recording their payments.

use axum::extract::{Path, State};

use crate::{
    Error,
    app_state::lock_connection,
    member::{MemberForm, MemberId, MemberState, MemberView, mark_member_paid, update_member},
    response::{ApiJson, ApiResponse},
    timezone::get_local_today,
};

/// Replace the member `member_id` with the JSON body.
pub async fn update_member_endpoint(
    Path(member_id): Path<MemberId>,
    State(state): State<MemberState>,
    ApiJson(form): ApiJson<MemberForm>,
) -> Result<ApiResponse<MemberView>, Error> {
    let form = form.validate()?;
    let today = get_local_today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    let member = update_member(member_id, form, &connection)?;
    tracing::info!("Updated member {member_id}");

    Ok(ApiResponse::ok(MemberView::new(member, today)))
}

/// Mark the member `member_id` as paid today.
pub async fn mark_member_paid_endpoint(
    Path(member_id): Path<MemberId>,
    State(state): State<MemberState>,
) -> Result<ApiResponse<MemberView>, Error> {
    let today = get_local_today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    let member = mark_member_paid(member_id, today, &connection)?;
    tracing::info!(
        "Member {member_id} paid on {today}, next payment due {}",
        member.next_due_date
    );

    Ok(ApiResponse {
        message: Some("Member marked as paid".to_owned()),
        ..ApiResponse::ok(MemberView::new(member, today))
    })
}

#[cfg(test)]
mod edit_member_endpoint_tests {
    use axum::{
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
    };

    use crate::{
        Error,
        app_state::lock_connection,
        member::{
            MemberForm, MemberState, PaymentStatus, create_member, mark_member_paid_endpoint,
            update_member_endpoint,
        },
        response::ApiJson,
        test_utils::{get_test_state, member_form, parse_json_body},
    };

    #[tokio::test]
    async fn update_replaces_member() {
        let state: MemberState = get_test_state();
        let member = create_member(
            member_form("Alice"),
            &lock_connection(&state.db_connection).unwrap(),
        )
        .unwrap();
        let form = MemberForm {
            notes: "Pays in cash".to_owned(),
            ..member_form("Alice")
        };

        let response = update_member_endpoint(Path(member.id), State(state), ApiJson(form))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let body = parse_json_body(response).await;
        assert_eq!(body["data"]["notes"], "Pays in cash");
    }

    #[tokio::test]
    async fn update_missing_member_is_not_found() {
        let state: MemberState = get_test_state();

        let response = update_member_endpoint(Path(7), State(state), ApiJson(member_form("Bob")))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = parse_json_body(response).await;
        assert_eq!(body["error"], "Member not found");
    }

    #[tokio::test]
    async fn mark_paid_sets_status() {
        let state: MemberState = get_test_state();
        let member = create_member(
            member_form("Alice"),
            &lock_connection(&state.db_connection).unwrap(),
        )
        .unwrap();

        let response = mark_member_paid_endpoint(Path(member.id), State(state))
            .await
            .unwrap();

        let view = response.data.unwrap();
        assert_eq!(view.member.payment_status, PaymentStatus::Paid);
        assert!(view.member.next_due_date > view.member.last_payment_date);
        assert_eq!(response.message.as_deref(), Some("Member marked as paid"));
    }

    #[tokio::test]
    async fn mark_paid_missing_member_fails() {
        let state: MemberState = get_test_state();

        let result = mark_member_paid_endpoint(Path(7), State(state)).await;

        assert_eq!(result.map(|_| ()), Err(Error::MemberNotFound));
    }
}
