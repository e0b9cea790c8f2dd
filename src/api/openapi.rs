use super::handlers::{health, links};
use utoipa::OpenApi;

/// OpenAPI document for the service.
///
/// Add new endpoints here via `paths(...)` so the generated document and
/// the router in `api::router` stay in step; the `openapi` binary prints it
/// as JSON.
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        links::submit::submit_email,
        links::visit::consume_link,
        links::listing::list_tokens,
    ),
    components(schemas(
        health::Health,
        links::EmailToken,
        links::SubmitLinkRequest,
        links::SubmitLinkResponse,
        links::SubmitStatus,
    )),
    tags(
        (name = "links", description = "Access-link issuance and gated listing"),
        (name = "health", description = "Service health")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
