use std::time::Duration;

use async_trait::async_trait;
use realtydesk_config::NotifierSettings;
use serde::Serialize;
use tracing::{debug, info};

use super::{CaseEmail, CaseNotifier, NotifyError};

/// Sends mail through a SendGrid-compatible `v3/mail/send` endpoint.
pub struct EmailNotifier {
    client: reqwest::Client,
    settings: NotifierSettings,
}

#[derive(Debug, Serialize)]
struct MailRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    subject: &'a str,
    content: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    value: &'a str,
}

impl EmailNotifier {
    pub fn new(settings: NotifierSettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { client, settings }
    }

    fn request<'a>(&'a self, email: &'a CaseEmail) -> MailRequest<'a> {
        MailRequest {
            personalizations: vec![Personalization {
                to: self
                    .settings
                    .recipients
                    .iter()
                    .map(|r| Address { email: r })
                    .collect(),
            }],
            from: Address {
                email: &self.settings.from,
            },
            subject: &email.subject,
            content: vec![Content {
                kind: "text/html",
                value: &email.html,
            }],
        }
    }
}

#[async_trait]
impl CaseNotifier for EmailNotifier {
    async fn send(&self, email: CaseEmail) -> Result<(), NotifyError> {
        if !self.settings.enabled || self.settings.recipients.is_empty() {
            debug!(subject = %email.subject, "Email notifier disabled, skipping");
            return Ok(());
        }

        let mut req = self
            .client
            .post(&self.settings.api_url)
            .json(&self.request(&email));
        if let Some(key) = &self.settings.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected(format!("{status}: {body}")));
        }

        info!(subject = %email.subject, recipients = self.settings.recipients.len(), "Case email sent");
        Ok(())
    }
}
