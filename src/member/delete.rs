//! Member deletion endpoint.

use axum::extract::{Path, State};

use crate::{
    Error,
    app_state::lock_connection,
    member::{MemberId, MemberState, delete_member},
    response::ApiResponse,
};

/// Delete the member `member_id` and their transactions.
pub async fn delete_member_endpoint(
    Path(member_id): Path<MemberId>,
    State(state): State<MemberState>,
) -> Result<ApiResponse<()>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_member(member_id, &connection)?;
    tracing::info!("Deleted member {member_id}");

    Ok(ApiResponse::message("Member deleted successfully"))
}

#[cfg(test)]
mod delete_member_endpoint_tests {
    use axum::{
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
    };
    use time::macros::date;

    use crate::{
        app_state::lock_connection,
        member::{MemberState, create_member, delete_member_endpoint},
        test_utils::{get_test_state, member_form, parse_json_body, transaction_form},
        transaction::{
            TransactionFilter, TransactionForm, TransactionType, count_transactions,
            create_transaction,
        },
    };

    #[tokio::test]
    async fn deletes_member_and_their_transactions() {
        let state: MemberState = get_test_state();
        let member_id = {
            let connection = lock_connection(&state.db_connection).unwrap();
            let member = create_member(member_form("Alice"), &connection).unwrap();
            create_transaction(
                TransactionForm {
                    member_id: Some(member.id),
                    ..transaction_form(date!(2025 - 08 - 01), 3.79, TransactionType::Incoming)
                },
                &connection,
            )
            .unwrap();
            create_transaction(
                transaction_form(date!(2025 - 08 - 01), 18.99, TransactionType::Outgoing),
                &connection,
            )
            .unwrap();
            member.id
        };

        let response = delete_member_endpoint(Path(member_id), State(state.clone()))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let body = parse_json_body(response).await;
        assert_eq!(body["message"], "Member deleted successfully");
        let remaining = count_transactions(
            &TransactionFilter::default(),
            &lock_connection(&state.db_connection).unwrap(),
        )
        .unwrap();
        assert_eq!(remaining, 1);
    }

    #[tokio::test]
    async fn missing_member_is_not_found() {
        let state: MemberState = get_test_state();

        let response = delete_member_endpoint(Path(42), State(state))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
