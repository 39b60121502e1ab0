use std::env;
use std::fmt;
use std::future::Future;

/// Error raised when a single outbound notification could not be delivered.
///
/// Dispatch failures are isolated per recipient: the scan logs them and
/// moves on, so this type never crosses the HTTP error boundary.
#[derive(Debug)]
pub struct DispatchError(pub String);

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "notification dispatch failed: {}", self.0)
    }
}

impl std::error::Error for DispatchError {}

impl From<reqwest::Error> for DispatchError {
    fn from(error: reqwest::Error) -> DispatchError {
        DispatchError(error.to_string())
    }
}

/// Outbound notification channel used by the reminder scanner.
///
/// The production implementation is [`EmailClient`]; tests substitute
/// recording or failing implementations.
pub trait Notifier {
    fn notify(
        &self,
        to: &str,
        subject: &str,
        html: &str,
    ) -> impl Future<Output = Result<(), DispatchError>> + Send;
}

/// Sends digest emails through an HTTP JSON email provider.
///
/// The provider endpoint receives `POST {from, to, subject, html}` with a
/// bearer API key.
pub struct EmailClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl EmailClient {
    pub fn new(api_url: String, api_key: String, from: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url,
            api_key,
            from,
        }
    }

    /// Builds a client from `EMAIL_API_URL`, `EMAIL_API_KEY`, and `EMAIL_FROM`.
    /// Returns `None` when any of them is unset; the caller then runs without
    /// reminders.
    pub fn from_env() -> Option<Self> {
        let api_url = env::var("EMAIL_API_URL").ok()?;
        let api_key = env::var("EMAIL_API_KEY").ok()?;
        let from = env::var("EMAIL_FROM").ok()?;
        Some(Self::new(api_url, api_key, from))
    }
}

impl Notifier for EmailClient {
    async fn notify(&self, to: &str, subject: &str, html: &str) -> Result<(), DispatchError> {
        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "from": self.from,
                "to": to,
                "subject": subject,
                "html": html,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DispatchError(format!(
                "email API returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}
