//! Link configuration and shared request state.

use std::sync::Arc;
use std::time::Duration;

use crate::api::email::MailSender;

use super::lifecycle::TokenLifecycle;
use super::session::SessionGate;
use super::store::TokenStore;

const DEFAULT_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_SESSION_TTL_SECONDS: u64 = 300;
const DEFAULT_MAIL_FROM: &str = "no-reply@linkauth.dev";

#[derive(Clone, Debug)]
pub struct LinkConfig {
    base_url: String,
    session_ttl_seconds: u64,
    mail_from: String,
}

impl LinkConfig {
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            mail_from: DEFAULT_MAIL_FROM.to_string(),
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: u64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_mail_from(mut self, mail_from: String) -> Self {
        self.mail_from = mail_from;
        self
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(super) fn session_ttl_seconds(&self) -> u64 {
        self.session_ttl_seconds
    }

    pub(super) fn mail_from(&self) -> &str {
        &self.mail_from
    }

    /// Only mark the session cookie secure when links are served over HTTPS.
    pub(super) fn session_cookie_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL.to_string())
    }
}

/// Shared state handed to the handlers via `Extension`.
pub struct LinkState {
    config: LinkConfig,
    store: Arc<dyn TokenStore>,
    lifecycle: Arc<TokenLifecycle>,
    gate: SessionGate,
}

impl LinkState {
    #[must_use]
    pub fn new(config: LinkConfig, store: Arc<dyn TokenStore>, mailer: Arc<dyn MailSender>) -> Self {
        let lifecycle = Arc::new(TokenLifecycle::new(
            store.clone(),
            mailer,
            config.mail_from().to_string(),
        ));
        let gate = SessionGate::new(
            lifecycle.clone(),
            store.clone(),
            Duration::from_secs(config.session_ttl_seconds()),
        );
        Self {
            config,
            store,
            lifecycle,
            gate,
        }
    }

    #[must_use]
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub(crate) fn store(&self) -> &dyn TokenStore {
        self.store.as_ref()
    }

    pub(super) fn lifecycle(&self) -> &TokenLifecycle {
        self.lifecycle.as_ref()
    }

    pub(super) fn gate(&self) -> &SessionGate {
        &self.gate
    }
}
