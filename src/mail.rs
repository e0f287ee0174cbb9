use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use std::fmt;
use tracing::info;

use crate::config::Config;
use crate::error::ApiError;

const API: &str = "mail";
const SEND_PATH: &str = "v3/mail/send";

/// A plain-text notification email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<()>;
}

#[derive(Clone)]
pub struct SendgridMailer {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl fmt::Debug for SendgridMailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendgridMailer")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct SendgridEmail<'a> {
    personalizations: [Personalization<'a>; 1],
    from: EmailAddress<'a>,
    subject: &'a str,
    content: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: [EmailAddress<'a>; 1],
}

#[derive(Serialize)]
struct EmailAddress<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: &'a str,
}

impl<'a> From<&'a MailMessage> for SendgridEmail<'a> {
    fn from(message: &'a MailMessage) -> Self {
        SendgridEmail {
            personalizations: [Personalization {
                to: [EmailAddress { email: &message.to }],
            }],
            from: EmailAddress {
                email: &message.from,
            },
            subject: &message.subject,
            content: [Content {
                content_type: "text/plain",
                value: &message.text,
            }],
        }
    }
}

impl SendgridMailer {
    pub fn new(base_url: Url, api_key: String) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("promo-watcher/", env!("CARGO_PKG_VERSION")))
            .no_proxy()
            .build()
            .context("failed to build mail HTTP client")?;
        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let base_url = Url::parse(&cfg.mail.api_base).context("invalid mail.api_base")?;
        Self::new(base_url, cfg.mail.api_key.clone())
    }

    pub fn build_request(&self, message: &MailMessage) -> Result<reqwest::Request> {
        let endpoint = self
            .base_url
            .join(SEND_PATH)
            .context("invalid mail base URL")?;
        self.http
            .post(endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&SendgridEmail::from(message))
            .build()
            .context("failed to build mail request")
    }
}

#[async_trait]
impl Mailer for SendgridMailer {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        let request = self.build_request(message)?;
        let res = self
            .http
            .execute(request)
            .await
            .map_err(|source| ApiError::Transport { api: API, source })?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ApiError::Status { api: API, status, body }.into());
        }
        info!(to = %message.to, %status, "notification email accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn message() -> MailMessage {
        MailMessage {
            from: "watcher@example.com".into(),
            to: "me@example.com".into(),
            subject: "Freedome Promo Watcher Task".into(),
            text: r#"{"id":"7","text":"50% off!","url":"https://twitter.com/i/web/status/7"}"#.into(),
        }
    }

    #[test]
    fn build_request_sets_headers_and_endpoint() {
        let mailer =
            SendgridMailer::new(Url::parse("https://api.example.test/").unwrap(), "key".into())
                .unwrap();
        let request = mailer.build_request(&message()).unwrap();
        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.url().path(), "/v3/mail/send");
        let headers = request.headers();
        assert_eq!(
            headers
                .get("Authorization")
                .and_then(|h| h.to_str().ok())
                .unwrap(),
            "Bearer key"
        );
        assert_eq!(
            headers
                .get("Content-Type")
                .and_then(|h| h.to_str().ok())
                .unwrap(),
            "application/json"
        );
    }

    #[test]
    fn body_is_plain_text_single_recipient() {
        let msg = message();
        let body = serde_json::to_value(SendgridEmail::from(&msg)).unwrap();
        assert_eq!(body["personalizations"][0]["to"][0]["email"], "me@example.com");
        assert_eq!(body["from"]["email"], "watcher@example.com");
        assert_eq!(body["subject"], "Freedome Promo Watcher Task");
        assert_eq!(body["content"][0]["type"], "text/plain");
        assert_eq!(body["content"][0]["value"], Value::String(msg.text.clone()));
        assert_eq!(body["content"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn send_accepts_any_2xx() {
        let base = crate::test_http::serve_once("202 Accepted", "").await;
        let mailer = SendgridMailer::new(base, "key".into()).unwrap();
        mailer.send(&message()).await.unwrap();
    }

    #[tokio::test]
    async fn send_maps_rejection_to_status_error() {
        let base = crate::test_http::serve_once("401 Unauthorized", "nope").await;
        let mailer = SendgridMailer::new(base, "bad".into()).unwrap();

        let err = mailer.send(&message()).await.unwrap_err();

        let api = err.downcast_ref::<ApiError>().expect("api error");
        assert_eq!(api.status(), Some(reqwest::StatusCode::UNAUTHORIZED));
        assert_eq!(err.to_string(), "mail error 401 Unauthorized: nope");
    }
}
