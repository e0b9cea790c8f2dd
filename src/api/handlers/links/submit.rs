//! Email submission endpoint.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::error;

use super::state::LinkState;
use super::types::{SubmitLinkRequest, SubmitLinkResponse, SubmitStatus};
use super::utils::{build_access_url, normalize_email, valid_email};

/// Submit an email address and receive an access link.
#[utoipa::path(
    post,
    path = "/v1/links",
    request_body = SubmitLinkRequest,
    responses(
        (status = 200, description = "Link already sent earlier, or sent now", body = SubmitLinkResponse),
        (status = 400, description = "Missing payload or invalid email", body = String),
        (status = 502, description = "Token created but delivery failed", body = SubmitLinkResponse)
    ),
    tag = "links"
)]
pub async fn submit_email(
    state: Extension<Arc<LinkState>>,
    payload: Option<Json<SubmitLinkRequest>>,
) -> impl IntoResponse {
    let request: SubmitLinkRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    // Reject malformed addresses before any record is created.
    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }

    match state.lifecycle().is_already_requested(&email).await {
        Ok(true) => {
            // Not an error: the link went out earlier and is still the one
            // to use.
            let response = SubmitLinkResponse {
                status: SubmitStatus::AlreadyRequested,
                message: format!("An access link was already sent to {email}"),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(false) => issue_and_send(&state, &email).await,
        Err(err) => {
            error!("Failed to check for existing token: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Submission failed".to_string(),
            )
                .into_response()
        }
    }
}

async fn issue_and_send(state: &LinkState, email: &str) -> axum::response::Response {
    let record = match state.lifecycle().issue(email).await {
        Ok(record) => record,
        Err(err) => {
            error!("Failed to issue token: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Submission failed".to_string(),
            )
                .into_response();
        }
    };

    let url = build_access_url(state.config().base_url(), record.token);
    let (sent, body) = state.lifecycle().send_access_link(&record, &url);

    if sent {
        let response = SubmitLinkResponse {
            status: SubmitStatus::Sent,
            message: body,
        };
        (StatusCode::OK, Json(response)).into_response()
    } else {
        // The token record is kept; only delivery failed.
        let response = SubmitLinkResponse {
            status: SubmitStatus::SendFailed,
            message: format!("Failed to send the access link to {email}"),
        };
        (StatusCode::BAD_GATEWAY, Json(response)).into_response()
    }
}
