//! Access-link consumption endpoint.

use axum::{
    extract::{Extension, Path},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
};
use std::sync::Arc;
use tracing::error;

use super::session::session_cookie;
use super::state::LinkState;

/// Consume an access link and open a session.
///
/// Malformed, unknown, and inactive tokens are all answered with a plain
/// 404 so the response never reveals whether a token exists.
#[utoipa::path(
    get,
    path = "/v1/links/{token}",
    params(
        ("token" = String, Path, description = "Token identifier from the emailed link")
    ),
    responses(
        (status = 303, description = "Session opened; redirects to the listing"),
        (status = 404, description = "Invalid token", body = String)
    ),
    tag = "links"
)]
pub async fn consume_link(
    state: Extension<Arc<LinkState>>,
    Path(token): Path<String>,
) -> impl IntoResponse {
    match state.gate().authenticate(&token).await {
        Ok(Some(session_token)) => {
            let mut headers = HeaderMap::new();
            match session_cookie(state.config(), &session_token) {
                Ok(cookie) => {
                    headers.insert(SET_COOKIE, cookie);
                }
                Err(err) => {
                    error!("Failed to build session cookie: {err}");
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Authentication failed".to_string(),
                    )
                        .into_response();
                }
            }
            (headers, Redirect::to("/v1/tokens")).into_response()
        }
        Ok(None) => (StatusCode::NOT_FOUND, "Not found".to_string()).into_response(),
        Err(err) => {
            error!("Failed to authenticate token: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication failed".to_string(),
            )
                .into_response()
        }
    }
}
