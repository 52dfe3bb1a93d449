//! HTTP webhook adapter.
//!
//! Each reply is POSTed as JSON (`{"channel": ..., "text": ...}`) to a
//! configured URL.  A bearer token, when present, is sent in the
//! `Authorization` header.  The token comes from the adapter's resolved
//! configuration when it logs in through the constructor, or from the
//! `bearer` login method.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use lowbot_kernel::{AdapterConf, ChatClient, ClientFactory, RenderedResponse, TOKEN_KEY};

use crate::error::{AdapterError, Result};

/// Login method that installs a bearer token.
pub const BEARER_LOGIN: &str = "bearer";

/// Configuration key that overrides the target URL.
pub const URL_KEY: &str = "url";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Longest response body kept in a rejection error.
const MAX_ERROR_BODY: usize = 512;

#[derive(Serialize)]
struct OutgoingMessage<'a> {
    channel: &'a str,
    text: &'a str,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Delivers replies to an HTTP endpoint.
pub struct WebhookClient {
    /// Adapter name, used in errors and logs.
    name: String,
    url: String,
    token: RwLock<Option<String>>,
    http: reqwest::Client,
}

impl WebhookClient {
    pub fn new(name: impl Into<String>, url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("LowBot/0.1")
            .timeout(timeout)
            .build()
            .map_err(|e| AdapterError::Config(format!("failed to build http client: {e}")))?;

        Ok(Self {
            name: name.into(),
            url: url.into(),
            token: RwLock::new(None),
            http,
        })
    }

    pub fn with_token(self, token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
            ..self
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn has_token(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// POST one message.
    pub async fn post(&self, channel: &str, text: &str) -> Result<()> {
        let mut request = self
            .http
            .post(&self.url)
            .json(&OutgoingMessage { channel, text });
        if let Some(token) = self.token.read().await.as_deref() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| AdapterError::Unreachable {
            adapter: self.name.clone(),
            url: self.url.clone(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|i| body.is_char_boundary(*i))
                    .unwrap_or(0);
                body.truncate(cut);
            }
            warn!(adapter = %self.name, status = status.as_u16(), "webhook rejected reply");
            return Err(AdapterError::Rejected {
                adapter: self.name.clone(),
                status: status.as_u16(),
                body,
            });
        }

        debug!(adapter = %self.name, channel = %channel, status = status.as_u16(), "webhook reply posted");
        Ok(())
    }
}

#[async_trait]
impl ChatClient for WebhookClient {
    async fn login(&self, method: &str, token: &str) -> lowbot_kernel::Result<()> {
        if method != BEARER_LOGIN {
            return Err(AdapterError::UnsupportedLogin {
                adapter: self.name.clone(),
                method: method.to_string(),
            }
            .into());
        }
        *self.token.write().await = Some(token.to_string());
        debug!(adapter = %self.name, "webhook bearer token installed");
        Ok(())
    }

    async fn send(&self, channel: &str, response: &RenderedResponse) -> lowbot_kernel::Result<()> {
        self.post(channel, response.as_str()).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Builds [`WebhookClient`]s for one adapter binding.
#[derive(Debug, Clone)]
pub struct WebhookFactory {
    name: String,
    url: String,
    timeout: Duration,
}

impl WebhookFactory {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl ClientFactory for WebhookFactory {
    /// With credentials, the `token` value is required and `url` may
    /// override the configured endpoint.
    fn construct(
        &self,
        credentials: Option<&AdapterConf>,
    ) -> lowbot_kernel::Result<Arc<dyn ChatClient>> {
        let Some(conf) = credentials else {
            return Ok(Arc::new(WebhookClient::new(
                &self.name,
                &self.url,
                self.timeout,
            )?));
        };

        let url = conf.get(URL_KEY).unwrap_or(self.url.as_str());
        let token = conf.require(TOKEN_KEY)?;
        let client = WebhookClient::new(&self.name, url, self.timeout)?.with_token(token);
        Ok(Arc::new(client))
    }
}
