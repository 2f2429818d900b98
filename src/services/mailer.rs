use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MailerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Email API error: {status} - {message}")]
    Api { status: StatusCode, message: String },

    #[error("Recipient has no email address")]
    MissingRecipient,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Deserialize)]
pub struct DispatchReceipt {
    pub id: String,
}

/// Outbound email boundary. The provider is any transactional email API that
/// can deliver an HTML message; nothing else about it leaks into the core.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<DispatchReceipt, MailerError>;
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
}

/// Dispatches through an HTTP email provider (`POST {base}/emails` with a
/// bearer key, JSON body).
pub struct HttpMailer {
    client: Client,
    api_url: String,
    api_key: Secret<String>,
    from: String,
    reply_to: Option<String>,
}

impl HttpMailer {
    pub fn new(
        api_url: String,
        api_key: Secret<String>,
        from: String,
        reply_to: Option<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_url,
            api_key,
            from,
            reply_to,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<DispatchReceipt, MailerError> {
        if message.to.trim().is_empty() {
            return Err(MailerError::MissingRecipient);
        }

        let url = format!("{}/emails", self.api_url.trim_end_matches('/'));
        let body = SendRequest {
            from: &self.from,
            to: [message.to.as_str()],
            subject: &message.subject,
            html: &message.html,
            reply_to: self.reply_to.as_deref(),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let receipt: DispatchReceipt = response.json().await?;
                Ok(receipt)
            }
            status => {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                Err(MailerError::Api {
                    status,
                    message: error_text,
                })
            }
        }
    }
}
