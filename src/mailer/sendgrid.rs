//! SendGrid `mail/send` client.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::config::MailerSecrets;
use crate::error::SendError;
use crate::mailer::MailSender;
use crate::pipeline::types::OutgoingEmail;

/// Default base URL for the SendGrid API.
const SENDGRID_BASE_URL: &str = "https://api.sendgrid.com";

/// Request timeout for the send call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ── Wire format ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MailSendBody<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: EmailAddress<'a>,
    subject: &'a str,
    content: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<&'static str, String>,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<EmailAddress<'a>>,
}

#[derive(Debug, Serialize)]
struct EmailAddress<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: &'a str,
}

/// Build the request body for one outgoing email, including the threading
/// headers that keep the reply grouped with the original conversation.
fn build_send_body<'a>(email: &'a OutgoingEmail, from_address: &'a str) -> MailSendBody<'a> {
    let mut headers = BTreeMap::new();
    if let Some(ref in_reply_to) = email.in_reply_to {
        headers.insert("In-Reply-To", in_reply_to.clone());
    }
    if !email.references.is_empty() {
        headers.insert("References", email.references.join(" "));
    }

    MailSendBody {
        personalizations: vec![Personalization {
            to: vec![EmailAddress { email: &email.to }],
        }],
        from: EmailAddress {
            email: from_address,
        },
        subject: &email.subject,
        content: vec![Content {
            content_type: "text/html",
            value: &email.html_body,
        }],
        headers,
    }
}

// ── Client ──────────────────────────────────────────────────────────

/// Transactional email client for the SendGrid v3 API.
pub struct SendGridMailer {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    from_address: String,
}

impl SendGridMailer {
    pub fn new(api_key: SecretString, from_address: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url: SENDGRID_BASE_URL.to_string(),
            api_key,
            from_address: from_address.into(),
        }
    }

    pub fn from_secrets(secrets: &MailerSecrets) -> Self {
        Self::new(secrets.api_key.clone(), secrets.from_address.clone())
    }

    /// Override the endpoint base URL (test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(value) =
            HeaderValue::from_str(&format!("Bearer {}", self.api_key.expose_secret()))
        {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }
}

#[async_trait]
impl MailSender for SendGridMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), SendError> {
        let url = format!("{}/v3/mail/send", self.base_url);
        let body = build_send_body(email, &self.from_address);

        let response = self
            .client
            .post(&url)
            .headers(self.headers())
            .json(&body)
            .send()
            .await
            .map_err(|e| SendError::RemoteCall(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SendError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(to = %email.to, subject = %email.subject, "Reply email accepted by mail API");
        Ok(())
    }
}
