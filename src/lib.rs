//! # Linkauth (Passwordless email-link authentication)
//!
//! `linkauth` hands out single-use access links over email. A visitor submits
//! an email address, receives a link embedding a random token, and following
//! that link opens a time-limited session that can view the shared token
//! listing.
//!
//! ## Token model
//!
//! Each submission creates at most one `EmailToken` row: the submission flow
//! checks for an existing row for that address first and reports
//! "already requested" instead of resending. Tokens never expire on their
//! own; an administrator flips `active` off to revoke access, and every
//! authorized request re-checks that flag so revocation takes effect
//! immediately.
//!
//! ## Sessions
//!
//! Consuming a link opens a short-lived session (300 seconds by default).
//! The session cookie carries a random token whose SHA-256 hash keys an
//! in-process binding back to the email token; raw session tokens are never
//! stored.
//!
//! Invalid links, inactive tokens, and missing sessions all surface as
//! `404 Not Found` rather than `401`/`403`, so callers cannot probe which
//! tokens exist.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
