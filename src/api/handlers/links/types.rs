//! Request/response types for the link endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SubmitLinkRequest {
    pub email: String,
}

/// Tri-state outcome of an email submission.
#[derive(ToSchema, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubmitStatus {
    /// An access link was already sent to this address earlier.
    AlreadyRequested,
    /// A new token was created and the link was delivered.
    Sent,
    /// A new token was created but delivery failed; the token remains valid.
    SendFailed,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SubmitLinkResponse {
    pub status: SubmitStatus,
    pub message: String,
}
