//! Authorized token listing endpoint.

use axum::{extract::Extension, http::HeaderMap, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::error;

use super::session::extract_session_token;
use super::state::LinkState;
use super::store::EmailToken;

/// List all issued tokens, newest first.
///
/// Requires a live session binding; a missing, expired, or deactivated
/// binding yields the same 404 as an invalid token.
#[utoipa::path(
    get,
    path = "/v1/tokens",
    responses(
        (status = 200, description = "Listing for an authorized session", body = Vec<EmailToken>),
        (status = 404, description = "No authorized session", body = String)
    ),
    tag = "links"
)]
pub async fn list_tokens(headers: HeaderMap, state: Extension<Arc<LinkState>>) -> impl IntoResponse {
    let session_token = extract_session_token(&headers);

    match state.gate().authorize(session_token.as_deref()).await {
        Ok(Some(tokens)) => (StatusCode::OK, Json(tokens)).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Not found".to_string()).into_response(),
        Err(err) => {
            error!("Failed to authorize listing request: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Listing failed".to_string(),
            )
                .into_response()
        }
    }
}
