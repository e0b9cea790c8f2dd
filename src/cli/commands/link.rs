use anyhow::{Context, Result};
use clap::{Arg, Command};

pub const ARG_BASE_URL: &str = "base-url";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_MAIL_FROM: &str = "mail-from";

/// Access-link options parsed from CLI matches.
#[derive(Debug)]
pub struct Options {
    pub base_url: String,
    pub session_ttl_seconds: u64,
    pub mail_from: String,
}

impl Options {
    /// Extract link options from parsed matches.
    ///
    /// # Errors
    /// Returns an error if a defaulted argument is somehow absent.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let base_url = matches
            .get_one::<String>(ARG_BASE_URL)
            .cloned()
            .context("missing required argument: --base-url")?;
        let session_ttl_seconds = matches
            .get_one::<u64>(ARG_SESSION_TTL_SECONDS)
            .copied()
            .context("missing required argument: --session-ttl-seconds")?;
        let mail_from = matches
            .get_one::<String>(ARG_MAIL_FROM)
            .cloned()
            .context("missing required argument: --mail-from")?;

        Ok(Self {
            base_url,
            session_ttl_seconds,
            mail_from,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_BASE_URL)
                .long("base-url")
                .help("Public base URL embedded in emailed access links")
                .env("LINKAUTH_BASE_URL")
                .default_value("http://localhost:8080"),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long("session-ttl-seconds")
                .help("Session lifetime after a link is consumed, in seconds")
                .env("LINKAUTH_SESSION_TTL_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_MAIL_FROM)
                .long("mail-from")
                .help("From address for access-link emails")
                .env("LINKAUTH_MAIL_FROM")
                .default_value("no-reply@linkauth.dev"),
        )
}
