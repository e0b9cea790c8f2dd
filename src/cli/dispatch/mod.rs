//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the
//! appropriate action, such as starting the API server with its full
//! configuration state.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::link;
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let link_opts = link::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        base_url: link_opts.base_url,
        session_ttl_seconds: link_opts.session_ttl_seconds,
        mail_from: link_opts.mail_from,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::actions::Action;

    #[test]
    fn dispatch_builds_server_action() {
        temp_env::with_vars(
            [
                ("LINKAUTH_DSN", None::<&str>),
                ("LINKAUTH_BASE_URL", None::<&str>),
                ("LINKAUTH_SESSION_TTL_SECONDS", None::<&str>),
                ("LINKAUTH_MAIL_FROM", None::<&str>),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec![
                    "linkauth",
                    "--dsn",
                    "postgres://user@localhost:5432/linkauth",
                    "--base-url",
                    "https://links.example.com",
                    "--session-ttl-seconds",
                    "120",
                ]);
                let action = handler(&matches).expect("dispatch should succeed");
                let Action::Server(args) = action;
                assert_eq!(args.port, 8080);
                assert_eq!(args.dsn, "postgres://user@localhost:5432/linkauth");
                assert_eq!(args.base_url, "https://links.example.com");
                assert_eq!(args.session_ttl_seconds, 120);
                assert_eq!(args.mail_from, "no-reply@linkauth.dev");
            },
        );
    }
}
