//! Session bindings and the gate that authorizes listing access.
//!
//! Consuming a valid access link binds a fresh session token to the email
//! token that authenticated it. Bindings are held in-process, keyed by the
//! SHA-256 hash of the session token, and expire after a fixed TTL. The gate
//! re-validates the email token on every authorized request, so an
//! administrative deactivation takes effect immediately without any session
//! invalidation machinery.

use anyhow::Result;
use axum::http::{
    header::{InvalidHeaderValue, AUTHORIZATION, COOKIE},
    HeaderMap, HeaderValue,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::lifecycle::TokenLifecycle;
use super::state::LinkConfig;
use super::store::{EmailToken, TokenStore};
use super::utils::{generate_session_token, hash_session_token};

pub(super) const SESSION_COOKIE_NAME: &str = "linkauth_session";

struct SessionBinding {
    token: Uuid,
    created_at: Instant,
}

/// In-process session store with per-binding expiry.
struct SessionStore {
    ttl: Duration,
    bindings: Mutex<HashMap<Vec<u8>, SessionBinding>>,
}

impl SessionStore {
    fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            bindings: Mutex::new(HashMap::new()),
        }
    }

    async fn insert(&self, token_hash: Vec<u8>, token: Uuid) {
        let mut bindings = self.bindings.lock().await;
        bindings.retain(|_, binding| binding.created_at.elapsed() < self.ttl);
        bindings.insert(
            token_hash,
            SessionBinding {
                token,
                created_at: Instant::now(),
            },
        );
    }

    async fn lookup(&self, token_hash: &[u8]) -> Option<Uuid> {
        let mut bindings = self.bindings.lock().await;
        let expired = match bindings.get(token_hash) {
            Some(binding) if binding.created_at.elapsed() < self.ttl => {
                return Some(binding.token);
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            bindings.remove(token_hash);
        }
        None
    }
}

/// Maps session state to authorized/unauthorized, with the token lifecycle
/// as the source of truth.
pub struct SessionGate {
    lifecycle: Arc<TokenLifecycle>,
    store: Arc<dyn TokenStore>,
    sessions: SessionStore,
}

impl SessionGate {
    pub(super) fn new(
        lifecycle: Arc<TokenLifecycle>,
        store: Arc<dyn TokenStore>,
        ttl: Duration,
    ) -> Self {
        Self {
            lifecycle,
            store,
            sessions: SessionStore::new(ttl),
        }
    }

    /// Exchange a raw token identifier for a session token.
    ///
    /// Malformed, unknown, and inactive identifiers all return `Ok(None)` so
    /// the boundary can answer with one uniform not-found. A successful
    /// authentication records the visit before the session is opened.
    pub async fn authenticate(&self, token_id: &str) -> Result<Option<String>> {
        let Ok(token) = Uuid::parse_str(token_id.trim()) else {
            return Ok(None);
        };

        if !self.lifecycle.is_valid(token).await? {
            return Ok(None);
        }

        self.lifecycle.record_visit(token).await?;

        let session_token = generate_session_token()?;
        self.sessions
            .insert(hash_session_token(&session_token), token)
            .await;

        Ok(Some(session_token))
    }

    /// Resolve a session token into the full listing.
    ///
    /// The bound email token is re-validated on every call; a session whose
    /// token was deactivated after login is unauthorized from that moment on.
    pub async fn authorize(&self, session_token: Option<&str>) -> Result<Option<Vec<EmailToken>>> {
        let Some(raw) = session_token else {
            return Ok(None);
        };

        let Some(token) = self.sessions.lookup(&hash_session_token(raw)).await else {
            return Ok(None);
        };

        if !self.lifecycle.is_valid(token).await? {
            return Ok(None);
        }

        Ok(Some(self.store.list_all().await?))
    }
}

/// Build a `HttpOnly` cookie carrying the session token.
pub(super) fn session_cookie(
    config: &LinkConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    let secure = config.session_cookie_secure();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(super) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == SESSION_COOKIE_NAME {
            return Some(val.to_string());
        }
    }
    None
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
