//! Access-link handlers and supporting modules.
//!
//! This module owns the token lifecycle (issuance, validation, visit
//! accounting), the session gate that authorizes listing access, and the
//! thin HTTP adapters over both.
//!
//! ## Dedup and the email race
//!
//! Submission checks for an existing record before creating one. The check
//! and the insert are not atomic, so two concurrent submissions for the same
//! address can both create a token; lookups resolve to the newest record.
//!
//! ## Uniform not-found
//!
//! Malformed token identifiers, unknown tokens, inactive tokens, and missing
//! or expired sessions all answer `404 Not Found`. Nothing in the response
//! distinguishes them, so token existence cannot be probed.

mod lifecycle;
pub(crate) mod listing;
mod session;
mod state;
mod store;
pub(crate) mod submit;
mod types;
mod utils;
pub(crate) mod visit;

pub use state::{LinkConfig, LinkState};
pub use store::{EmailToken, PgTokenStore, TokenStore};
pub use types::{SubmitLinkRequest, SubmitLinkResponse, SubmitStatus};

#[cfg(test)]
mod tests;
