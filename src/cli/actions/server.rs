use crate::api;
use crate::api::handlers::links::LinkConfig;
use anyhow::{Context, Result};
use tracing::debug;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub base_url: String,
    pub session_ttl_seconds: u64,
    pub mail_from: String,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the base URL is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    // Validate early: a bad base URL would otherwise surface as broken links
    // in delivered emails.
    Url::parse(&args.base_url)
        .with_context(|| format!("Invalid base URL: {}", args.base_url))?;

    debug!("server args: {args:?}");

    let config = LinkConfig::new(args.base_url)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_mail_from(args.mail_from);

    api::new(args.port, args.dsn, config).await
}

#[cfg(test)]
mod tests {
    use super::{execute, Args};

    #[tokio::test]
    async fn execute_rejects_invalid_base_url() {
        let args = Args {
            port: 8080,
            dsn: "postgres://localhost:5432/linkauth".to_string(),
            base_url: "not a url".to_string(),
            session_ttl_seconds: 300,
            mail_from: "no-reply@linkauth.dev".to_string(),
        };
        let result = execute(args).await;
        assert!(result.is_err());
        if let Err(err) = result {
            assert!(err.to_string().contains("Invalid base URL"));
        }
    }
}
