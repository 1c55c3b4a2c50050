//! The JSON envelope shared by every API response, and extractors that report
//! malformed requests with the same envelope.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{Error, pagination::PageInfo};

/// A successful API response.
///
/// Serializes as `{"success": true, "data": ...}` plus the optional list
/// metadata. Errors use the same shape with `success: false`, see
/// [Error]'s `IntoResponse` implementation.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Always `true`, failures are sent as an [Error].
    pub success: bool,
    /// The payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// A human readable message, used by responses without a payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// The number of items in `data` for list responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    /// The number of items matching the query across all pages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    /// Which page `data` holds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageInfo>,
}

impl<T> ApiResponse<T> {
    /// Wrap `data` in a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            count: None,
            total: None,
            pagination: None,
        }
    }
}

impl<T> ApiResponse<Vec<T>> {
    /// Wrap a list of items, setting `count`.
    pub fn list(items: Vec<T>) -> Self {
        let count = items.len();

        Self {
            count: Some(count),
            ..Self::ok(items)
        }
    }

    /// Wrap one page of a larger result set.
    pub fn page(items: Vec<T>, total: u64, pagination: PageInfo) -> Self {
        Self {
            total: Some(total),
            pagination: Some(pagination),
            ..Self::list(items)
        }
    }
}

impl ApiResponse<()> {
    /// A successful response with only a message, e.g. after a delete.
    pub fn message(message: &str) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.to_owned()),
            count: None,
            total: None,
            pagination: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Like [axum::Json], but a body that cannot be parsed is reported as an
/// [Error::Validation] in the API's error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct ApiJson<T>(pub T);

/// Like [axum::extract::Query], but malformed query strings are reported as
/// an [Error::Validation] in the API's error envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub struct ApiQuery<T>(pub T);

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::pagination::PageInfo;

    use super::ApiResponse;

    #[test]
    fn ok_response_omits_list_fields() {
        let value = serde_json::to_value(ApiResponse::ok(42)).unwrap();

        assert_eq!(value, json!({ "success": true, "data": 42 }));
    }

    #[test]
    fn list_response_has_count() {
        let value = serde_json::to_value(ApiResponse::list(vec!["a", "b"])).unwrap();

        assert_eq!(
            value,
            json!({ "success": true, "data": ["a", "b"], "count": 2 })
        );
    }

    #[test]
    fn page_response_has_total_and_pagination() {
        let info = PageInfo {
            page: 2,
            limit: 1,
            pages: 3,
        };

        let value = serde_json::to_value(ApiResponse::page(vec![1], 3, info)).unwrap();

        assert_eq!(
            value,
            json!({
                "success": true,
                "data": [1],
                "count": 1,
                "total": 3,
                "pagination": { "page": 2, "limit": 1, "pages": 3 }
            })
        );
    }

    #[test]
    fn message_response_has_no_data() {
        let value = serde_json::to_value(ApiResponse::message("Deleted")).unwrap();

        assert_eq!(value, json!({ "success": true, "message": "Deleted" }));
    }
}
