//! Token lifecycle: issuance, validation, and visit accounting.
//!
//! A token moves through a single state machine: issued `active` with zero
//! visits, accumulates visits while `active`, and becomes permanently
//! unusable for authentication once `active` is cleared (an administrative
//! action outside this module). There is no separate "expired" state.

use anyhow::{anyhow, Result};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::api::email::{MailMessage, MailSender};

use super::store::{EmailToken, TokenStore};

const ACCESS_LINK_SUBJECT: &str = "URL access link";

pub struct TokenLifecycle {
    store: Arc<dyn TokenStore>,
    mailer: Arc<dyn MailSender>,
    mail_from: String,
}

impl TokenLifecycle {
    #[must_use]
    pub fn new(store: Arc<dyn TokenStore>, mailer: Arc<dyn MailSender>, mail_from: String) -> Self {
        Self {
            store,
            mailer,
            mail_from,
        }
    }

    /// True iff the address already has a record, regardless of `active`.
    /// Used to avoid resending a link to an address with one outstanding.
    pub async fn is_already_requested(&self, email: &str) -> Result<bool> {
        Ok(self.store.find_by_email(email).await?.is_some())
    }

    /// Create and persist a fresh token for the address.
    ///
    /// # Errors
    /// Fails only on storage failure.
    pub async fn issue(&self, email: &str) -> Result<EmailToken> {
        self.store.create(email).await
    }

    /// True iff a record with this id exists AND is active. Unknown and
    /// inactive tokens are indistinguishable to callers, so token existence
    /// never leaks.
    pub async fn is_valid(&self, token: Uuid) -> Result<bool> {
        Ok(self
            .store
            .find_by_id(token)
            .await?
            .is_some_and(|record| record.active))
    }

    /// Increment the visit count by exactly one and persist.
    ///
    /// Callers must have confirmed [`Self::is_valid`] first; an unknown id
    /// here is a programming error and propagates.
    pub async fn record_visit(&self, token: Uuid) -> Result<EmailToken> {
        let mut record = self
            .store
            .find_by_id(token)
            .await?
            .ok_or_else(|| anyhow!("visit recorded for unknown token {token}"))?;
        record.visit_count += 1;
        self.store.save(&record).await
    }

    /// Send the access link to the record's address.
    ///
    /// Delivery failure is an ordinary outcome, not an error: the result is
    /// `(false, "")` and the token record is left in place. On success the
    /// delivered body text is returned for confirmation display.
    pub fn send_access_link(&self, record: &EmailToken, url: &str) -> (bool, String) {
        let message = MailMessage {
            subject: ACCESS_LINK_SUBJECT.to_string(),
            body: format!("Here is your URL access link: {url}"),
            from: self.mail_from.clone(),
            to: record.email.clone(),
        };

        match self.mailer.send(&message) {
            Ok(()) => (true, message.body),
            Err(err) => {
                warn!(to = %message.to, "failed to send access link: {err}");
                (false, String::new())
            }
        }
    }
}
