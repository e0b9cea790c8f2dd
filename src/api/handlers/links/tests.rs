//! Link module tests.
//!
//! These run against an in-memory store and capturing mail sender, covering
//! the token lifecycle, the session gate, and the handler flows end to end.

use super::listing::list_tokens;
use super::session::SESSION_COOKIE_NAME;
use super::state::{LinkConfig, LinkState};
use super::store::{EmailToken, TokenStore};
use super::submit::submit_email;
use super::types::SubmitLinkRequest;
use super::visit::consume_link;
use crate::api::email::{CaptureMailSender, MailMessage, MailSender};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use axum::body::to_bytes;
use axum::extract::{Extension, Path};
use axum::http::{
    header::{COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue, StatusCode,
};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// In-memory [`TokenStore`] mirroring the PostgreSQL semantics: no
/// uniqueness on email, newest-first lookups, `last_visited` refreshed on
/// every save.
struct MemoryTokenStore {
    records: Mutex<Vec<EmailToken>>,
}

impl MemoryTokenStore {
    fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    async fn len(&self) -> usize {
        self.records.lock().await.len()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<EmailToken>> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .filter(|record| record.email == email)
            .max_by_key(|record| record.created)
            .cloned())
    }

    async fn find_by_id(&self, token: Uuid) -> Result<Option<EmailToken>> {
        let records = self.records.lock().await;
        Ok(records.iter().find(|record| record.token == token).cloned())
    }

    async fn create(&self, email: &str) -> Result<EmailToken> {
        let now = Utc::now();
        let record = EmailToken {
            token: Uuid::new_v4(),
            email: email.to_string(),
            created: now,
            visit_count: 0,
            last_visited: now,
            active: true,
        };
        self.records.lock().await.push(record.clone());
        Ok(record)
    }

    async fn save(&self, record: &EmailToken) -> Result<EmailToken> {
        let mut records = self.records.lock().await;
        let stored = records
            .iter_mut()
            .find(|stored| stored.token == record.token)
            .ok_or_else(|| anyhow!("unknown token {}", record.token))?;
        stored.email = record.email.clone();
        stored.visit_count = record.visit_count;
        stored.active = record.active;
        stored.last_visited = Utc::now();
        Ok(stored.clone())
    }

    async fn list_all(&self) -> Result<Vec<EmailToken>> {
        let mut all = self.records.lock().await.clone();
        all.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(all)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Sender whose delivery always fails.
struct FailMailSender;

impl MailSender for FailMailSender {
    fn send(&self, _message: &MailMessage) -> Result<()> {
        Err(anyhow!("connection refused"))
    }
}

fn link_config() -> LinkConfig {
    LinkConfig::new("http://localhost:8080".to_string())
}

fn state_with(
    config: LinkConfig,
    mailer: Arc<dyn MailSender>,
) -> (Arc<LinkState>, Arc<MemoryTokenStore>) {
    let store = Arc::new(MemoryTokenStore::new());
    let state = Arc::new(LinkState::new(config, store.clone(), mailer));
    (state, store)
}

fn capture_state() -> (Arc<LinkState>, Arc<MemoryTokenStore>, Arc<CaptureMailSender>) {
    let mailer = Arc::new(CaptureMailSender::new());
    let (state, store) = state_with(link_config(), mailer.clone());
    (state, store, mailer)
}

async fn deactivate(store: &MemoryTokenStore, token: Uuid) -> Result<()> {
    let mut record = store
        .find_by_id(token)
        .await?
        .context("record to deactivate")?;
    record.active = false;
    store.save(&record).await?;
    Ok(())
}

async fn body_json(response: Response) -> Result<serde_json::Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .context("read response body")?;
    serde_json::from_slice(&bytes).context("parse response body")
}

fn session_cookie_value(response: &Response) -> Option<String> {
    let header = response.headers().get(SET_COOKIE)?.to_str().ok()?;
    let first = header.split(';').next()?;
    let mut parts = first.splitn(2, '=');
    let key = parts.next()?;
    let value = parts.next()?;
    (key == SESSION_COOKIE_NAME).then(|| value.to_string())
}

fn cookie_headers(session_token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let value = format!("{SESSION_COOKIE_NAME}={session_token}");
    headers.insert(COOKIE, HeaderValue::from_str(&value).expect("cookie value"));
    headers
}

async fn submit(state: &Arc<LinkState>, email: &str) -> Response {
    submit_email(
        Extension(state.clone()),
        Some(Json(SubmitLinkRequest {
            email: email.to_string(),
        })),
    )
    .await
    .into_response()
}

// --- lifecycle ---

#[tokio::test]
async fn issue_creates_active_record_with_zero_visits() -> Result<()> {
    let (state, _store, _mailer) = capture_state();

    assert!(!state.lifecycle().is_already_requested("test@email.com").await?);

    let record = state.lifecycle().issue("test@email.com").await?;
    assert_eq!(record.email, "test@email.com");
    assert_eq!(record.visit_count, 0);
    assert!(record.active);

    assert!(state.lifecycle().is_already_requested("test@email.com").await?);
    assert!(!state.lifecycle().is_already_requested("other@email.com").await?);
    Ok(())
}

#[tokio::test]
async fn is_valid_requires_existing_active_record() -> Result<()> {
    let (state, store, _mailer) = capture_state();

    let record = state.lifecycle().issue("test@email.com").await?;
    assert!(state.lifecycle().is_valid(record.token).await?);

    // Unknown and inactive both read as invalid.
    assert!(!state.lifecycle().is_valid(Uuid::new_v4()).await?);

    deactivate(&store, record.token).await?;
    assert!(!state.lifecycle().is_valid(record.token).await?);
    Ok(())
}

#[tokio::test]
async fn record_visit_increments_by_one_and_touches_last_visited() -> Result<()> {
    let (state, _store, _mailer) = capture_state();

    let record = state.lifecycle().issue("test@email.com").await?;
    let after_first = state.lifecycle().record_visit(record.token).await?;
    assert_eq!(after_first.visit_count, 1);
    assert!(after_first.last_visited >= record.last_visited);

    let after_second = state.lifecycle().record_visit(record.token).await?;
    assert_eq!(after_second.visit_count, 2);
    assert!(after_second.last_visited >= after_first.last_visited);
    Ok(())
}

#[tokio::test]
async fn record_visit_unknown_token_is_an_error() {
    let (state, _store, _mailer) = capture_state();
    let result = state.lifecycle().record_visit(Uuid::new_v4()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn send_access_link_returns_delivered_body() -> Result<()> {
    let (state, _store, mailer) = capture_state();

    let record = state.lifecycle().issue("test@email.com").await?;
    let url = format!("http://localhost:8080/v1/links/{}", record.token);
    let (sent, body) = state.lifecycle().send_access_link(&record, &url);

    assert!(sent);
    assert_eq!(body, format!("Here is your URL access link: {url}"));

    let outbox = mailer.outbox();
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].to, "test@email.com");
    assert_eq!(outbox[0].from, "no-reply@linkauth.dev");
    assert_eq!(outbox[0].subject, "URL access link");
    Ok(())
}

#[tokio::test]
async fn send_access_link_failure_is_an_ordinary_outcome() -> Result<()> {
    let (state, _store) = state_with(link_config(), Arc::new(FailMailSender));

    let record = state.lifecycle().issue("test@email.com").await?;
    let (sent, body) = state.lifecycle().send_access_link(&record, "http://x");

    assert!(!sent);
    assert_eq!(body, "");
    // The record survives the failed delivery.
    assert!(state.lifecycle().is_valid(record.token).await?);
    Ok(())
}

// --- session gate ---

#[tokio::test]
async fn authenticate_rejects_malformed_unknown_and_inactive_alike() -> Result<()> {
    let (state, store, _mailer) = capture_state();

    let record = state.lifecycle().issue("test@email.com").await?;
    deactivate(&store, record.token).await?;

    assert_eq!(state.gate().authenticate("not-a-uuid").await?, None);
    assert_eq!(state.gate().authenticate(&Uuid::new_v4().to_string()).await?, None);
    assert_eq!(state.gate().authenticate(&record.token.to_string()).await?, None);

    // None of the rejections counted as a visit.
    let record = store.find_by_id(record.token).await?.context("record")?;
    assert_eq!(record.visit_count, 0);
    Ok(())
}

#[tokio::test]
async fn authenticate_opens_session_and_records_visit() -> Result<()> {
    let (state, store, _mailer) = capture_state();

    let record = state.lifecycle().issue("test@email.com").await?;
    let session = state
        .gate()
        .authenticate(&record.token.to_string())
        .await?
        .context("expected a session")?;
    assert!(!session.is_empty());

    let stored = store.find_by_id(record.token).await?.context("record")?;
    assert_eq!(stored.visit_count, 1);

    let listing = state
        .gate()
        .authorize(Some(&session))
        .await?
        .context("expected authorization")?;
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].token, record.token);
    Ok(())
}

#[tokio::test]
async fn authorize_without_binding_is_unauthorized() -> Result<()> {
    let (state, _store, _mailer) = capture_state();

    assert!(state.gate().authorize(None).await?.is_none());
    assert!(state.gate().authorize(Some("bogus")).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn deactivation_cuts_off_established_sessions() -> Result<()> {
    let (state, store, _mailer) = capture_state();

    let record = state.lifecycle().issue("test@email.com").await?;
    let session = state
        .gate()
        .authenticate(&record.token.to_string())
        .await?
        .context("expected a session")?;
    assert!(state.gate().authorize(Some(&session)).await?.is_some());

    // Re-validation on every access makes deactivation immediate.
    deactivate(&store, record.token).await?;
    assert!(state.gate().authorize(Some(&session)).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn sessions_expire_after_ttl() -> Result<()> {
    let config = link_config().with_session_ttl_seconds(0);
    let (state, _store) = state_with(config, Arc::new(CaptureMailSender::new()));

    let record = state.lifecycle().issue("test@email.com").await?;
    let session = state
        .gate()
        .authenticate(&record.token.to_string())
        .await?
        .context("expected a session")?;

    assert!(state.gate().authorize(Some(&session)).await?.is_none());
    Ok(())
}

// --- handlers ---

#[tokio::test]
async fn submit_rejects_invalid_email_before_creating_anything() -> Result<()> {
    let (state, store, mailer) = capture_state();

    let response = submit(&state, "not-an-email").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(store.len().await, 0);
    assert!(mailer.outbox().is_empty());
    Ok(())
}

#[tokio::test]
async fn submit_missing_payload_is_bad_request() {
    let (state, _store, _mailer) = capture_state();
    let response = submit_email(Extension(state), None).await.into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn submit_twice_reports_already_requested_without_resending() -> Result<()> {
    let (state, store, mailer) = capture_state();

    let response = submit(&state, "test@email.com").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await?;
    assert_eq!(body["status"], "sent");
    assert!(body["message"]
        .as_str()
        .context("message")?
        .starts_with("Here is your URL access link: http://localhost:8080/v1/links/"));

    // Second submission: no new record, no new mail.
    let response = submit(&state, "Test@Email.com ").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await?;
    assert_eq!(body["status"], "already_requested");

    assert_eq!(store.len().await, 1);
    assert_eq!(mailer.outbox().len(), 1);
    Ok(())
}

#[tokio::test]
async fn submit_delivery_failure_keeps_the_token() -> Result<()> {
    let (state, store) = state_with(link_config(), Arc::new(FailMailSender));

    let response = submit(&state, "test@email.com").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await?;
    assert_eq!(body["status"], "send_failed");

    // The token exists and is independently valid, but no session was opened.
    assert_eq!(store.len().await, 1);
    let record = store.list_all().await?.remove(0);
    assert_eq!(record.visit_count, 0);
    assert!(state.lifecycle().is_valid(record.token).await?);
    Ok(())
}

#[tokio::test]
async fn consume_invalid_tokens_all_answer_not_found() -> Result<()> {
    let (state, store, _mailer) = capture_state();

    let record = state.lifecycle().issue("test@email.com").await?;
    deactivate(&store, record.token).await?;

    for token in [
        "zzz".to_string(),
        Uuid::new_v4().to_string(),
        record.token.to_string(),
    ] {
        let response = consume_link(Extension(state.clone()), Path(token))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(SET_COOKIE).is_none());
    }
    Ok(())
}

#[tokio::test]
async fn listing_without_session_answers_not_found() {
    let (state, _store, _mailer) = capture_state();
    let response = list_tokens(HeaderMap::new(), Extension(state))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn submit_consume_list_full_flow() -> Result<()> {
    let (state, store, _mailer) = capture_state();

    // Submit: one record, zero visits.
    let response = submit(&state, "test@email.com").await;
    assert_eq!(response.status(), StatusCode::OK);
    let record = store.list_all().await?.remove(0);
    assert_eq!(record.visit_count, 0);

    // Consume the access link: visit recorded, session cookie set.
    let response = consume_link(Extension(state.clone()), Path(record.token.to_string()))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let session = session_cookie_value(&response).context("session cookie")?;

    let stored = store.find_by_id(record.token).await?.context("record")?;
    assert_eq!(stored.visit_count, 1);

    // View the listing with the bound session.
    let response = list_tokens(cookie_headers(&session), Extension(state.clone()))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await?;
    let listing = body.as_array().context("listing array")?;
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0]["email"], "test@email.com");
    assert_eq!(listing[0]["visit_count"], 1);
    assert_eq!(listing[0]["active"], true);

    // Deactivate the token: the old session binding stops working.
    deactivate(&store, record.token).await?;
    let response = list_tokens(cookie_headers(&session), Extension(state))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn listing_orders_newest_first() -> Result<()> {
    let (state, store, _mailer) = capture_state();

    state.lifecycle().issue("first@email.com").await?;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    state.lifecycle().issue("second@email.com").await?;

    let listing = store.list_all().await?;
    assert_eq!(listing.len(), 2);
    assert_eq!(listing[0].email, "second@email.com");
    assert_eq!(listing[1].email, "first@email.com");
    Ok(())
}
