use crate::error::Error;
use crate::types::{Request, Response};
use crate::wire::{Body, Reply};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use std::time::Duration;

const ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Model used when neither the client nor the request names one.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Handle on the Messages endpoint. Cheap to clone.
#[derive(Clone)]
pub struct Claude {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl Claude {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: http_client(REQUEST_TIMEOUT),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Read the key from `ANTHROPIC_API_KEY`. A blank key counts as missing.
    pub fn from_env() -> Result<Self, Error> {
        match std::env::var("ANTHROPIC_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(key)),
            _ => Err(Error::NoApiKey),
        }
    }

    pub fn with_model(self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            http: http_client(timeout),
            ..self
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one request and wait for the whole reply.
    pub async fn complete(&self, request: Request) -> Result<Response, Error> {
        let reply = self
            .http
            .post(ENDPOINT)
            .headers(self.headers()?)
            .json(&self.body(&request))
            .send()
            .await?;

        let status = reply.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                body: reply.text().await.unwrap_or_default(),
            });
        }

        let reply: Reply = reply.json().await.map_err(Error::Decode)?;
        Ok(reply.into())
    }

    fn headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::with_capacity(3);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        Ok(headers)
    }

    fn body<'a>(&'a self, request: &'a Request) -> Body<'a> {
        Body {
            model: request.model.as_deref().unwrap_or(&self.model),
            max_tokens: request.max_tokens,
            system: request.system.as_deref(),
            messages: &request.messages,
            temperature: request.temperature,
            tools: request.tools.as_deref(),
            tool_choice: request.tool_choice.as_ref(),
        }
    }
}

fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .unwrap_or_default()
}
