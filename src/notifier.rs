//! Document summary email sent through the Gmail API

use std::fmt::Write as _;

use base64::engine::general_purpose;
use base64::Engine as _;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::google::{gmail_send_url, GoogleApiClient};
use crate::models::{DocumentRecord, UserProfile, DATE_FORMAT};

#[derive(Debug, Error)]
pub enum SendError {
    #[error("user profile has no email address")]
    MissingRecipient,

    #[error("error sending email: {0}")]
    Transport(String),
}

/// Plain-text summary of `records`, followed by the ones expiring within `window_days`
#[must_use]
pub fn compose_summary(records: &[DocumentRecord], today: NaiveDate, window_days: i64) -> String {
    let mut body = String::from("Document Summary\n===============\n\n");

    for record in records {
        let _ = write!(
            body,
            "Document: {}\nIssue Date: {}\nExpiry Date: {}\nStatus: {}\n\n",
            record.name,
            record.issue_date.format(DATE_FORMAT),
            record.expiry_date.format(DATE_FORMAT),
            record.status
        );
    }

    let expiring: Vec<&DocumentRecord> = records
        .iter()
        .filter(|record| record.expires_within(today, window_days))
        .collect();

    if expiring.is_empty() {
        let _ = writeln!(
            body,
            "No documents expiring within the next {window_days} days."
        );
    } else {
        let _ = writeln!(body, "Expiring within {window_days} days:");
        for record in expiring {
            let _ = writeln!(
                body,
                "- {} (expires {}, in {} days)",
                record.name,
                record.expiry_date.format(DATE_FORMAT),
                record.days_until_expiry(today)
            );
        }
    }

    body
}

/// RFC 2822 message with CRLF header lines
#[must_use]
pub fn build_message(to: &str, subject: &str, body: &str) -> String {
    format!(
        "From: me\r\nTo: {to}\r\nSubject: {subject}\r\nMIME-Version: 1.0\r\nContent-Type: text/plain; charset=UTF-8\r\n\r\n{body}"
    )
}

/// Gmail `raw` field: base64url without padding
#[must_use]
pub fn encode_message(message: &str) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(message.as_bytes())
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    #[serde(default)]
    id: String,
}

/// Sends document summaries from the user's own mailbox
pub struct Notifier<'a> {
    api: &'a GoogleApiClient,
    subject: String,
    window_days: i64,
}

impl<'a> Notifier<'a> {
    #[must_use]
    pub fn new(api: &'a GoogleApiClient, subject: &str, window_days: i64) -> Self {
        Self {
            api,
            subject: subject.to_string(),
            window_days,
        }
    }

    /// Email the summary of `records` to the profile's address
    ///
    /// # Errors
    ///
    /// Returns [`SendError::MissingRecipient`] if the profile has no email,
    /// or [`SendError::Transport`] if the Gmail call fails
    pub async fn send_summary(
        &self,
        profile: &UserProfile,
        records: &[DocumentRecord],
        today: NaiveDate,
    ) -> Result<(), SendError> {
        if profile.email.trim().is_empty() {
            return Err(SendError::MissingRecipient);
        }

        let body = compose_summary(records, today, self.window_days);
        let raw = encode_message(&build_message(&profile.email, &self.subject, &body));
        let url = gmail_send_url(&self.api.settings().gmail_base_url)
            .map_err(|e| SendError::Transport(e.to_string()))?;

        let sent: SentMessage = self
            .api
            .post_json(&url, &json!({ "raw": raw }))
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;
        log::debug!("Gmail accepted message {}", sent.id);
        Ok(())
    }
}
