//! HTTP mail relay transport.
//!
//! Protocol:
//! 1. `GET {endpoint}/health` must answer 2xx for the transport to verify
//! 2. `POST {endpoint}/messages` with a JSON message, bearer-authenticated
//!    when an API key is configured

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;

use super::{MailError, MailTransport, OutgoingMail};

/// Relay request body.
#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    to_name: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// Sends mail through a JSON relay.
pub struct HttpMailer {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    from: String,
}

impl HttpMailer {
    /// Create a relay client. Fails on an unparseable endpoint.
    pub fn new(
        endpoint: &str,
        api_key: Option<String>,
        from: &str,
        request_timeout: Duration,
    ) -> Result<Self, MailError> {
        let mut endpoint = Url::parse(endpoint)
            .map_err(|e| MailError::Config(format!("endpoint '{}': {}", endpoint, e)))?;
        // Url::join replaces the last segment unless the path ends in '/'
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }

        if from.trim().is_empty() {
            return Err(MailError::Config("sender address is empty".into()));
        }

        let client = Client::builder().timeout(request_timeout).build()?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            from: from.to_string(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, MailError> {
        self.endpoint
            .join(path)
            .map_err(|e| MailError::Config(format!("endpoint path '{}': {}", path, e)))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[async_trait]
impl MailTransport for HttpMailer {
    fn name(&self) -> &str {
        "http"
    }

    async fn verify(&self) -> Result<(), MailError> {
        let response = self
            .authorize(self.client.get(self.url("health")?))
            .send()
            .await
            .map_err(|e| MailError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MailError::Rejected {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        tracing::debug!(endpoint = %self.endpoint, "mail relay verified");
        Ok(())
    }

    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let message = RelayMessage {
            from: &self.from,
            to: &mail.to,
            to_name: &mail.to_name,
            subject: &mail.subject,
            html: &mail.html,
        };

        let response = self
            .authorize(self.client.post(self.url("messages")?))
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }

    async fn shutdown(&self) {
        tracing::debug!(endpoint = %self.endpoint, "mail relay client closed");
    }
}
