//! Transport to the Oekofen JSON interface
//!
//! The session only needs one operation: fetch a path below the base URL
//! and hand back either parsed JSON or raw text. [`HttpTransport`] is the
//! reqwest implementation; tests substitute their own [`Transport`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};

pub const DEFAULT_PORT: u16 = 4321;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(2500);

/// Shape the caller wants back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Json,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(JsonValue),
    Text(String),
}

impl Payload {
    pub fn into_json(self) -> Result<JsonValue> {
        match self {
            Payload::Json(value) => Ok(value),
            Payload::Text(_) => Err(Error::UnexpectedPayload(
                "expected JSON, got text".to_string(),
            )),
        }
    }

    pub fn into_text(self) -> Result<String> {
        match self {
            Payload::Text(text) => Ok(text),
            Payload::Json(_) => Err(Error::UnexpectedPayload(
                "expected text, got JSON".to_string(),
            )),
        }
    }
}

/// Fetch collaborator used by [`crate::Session`]
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `path` relative to the device base URL
    async fn fetch(&self, path: &str, expect: Expect) -> Result<Payload>;
}

/// `http://{host}:{port}/{password}/`
pub fn base_url(host: &str, port: u16, password: &str) -> String {
    format!("http://{host}:{port}/{password}/")
}

/// reqwest-backed transport with a single retry on transient failures
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    retry_delay: Option<Duration>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("oekofen/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            client,
            base_url,
            retry_delay: Some(DEFAULT_RETRY_DELAY),
        })
    }

    /// Delay before the single retry; `None` disables retrying
    pub fn with_retry(mut self, delay: Option<Duration>) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_once(&self, url: &str, expect: Expect) -> Result<Payload> {
        log::debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = decode_body(&response.bytes().await?);
        match expect {
            Expect::Json => Ok(Payload::Json(serde_json::from_str(&body)?)),
            Expect::Text => Ok(Payload::Text(body)),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, path: &str, expect: Expect) -> Result<Payload> {
        let url = format!("{}{}", self.base_url, path);

        match self.fetch_once(&url, expect).await {
            Err(err) if err.is_transport() => match self.retry_delay {
                Some(delay) => {
                    log::warn!("request to {url} failed ({err}), retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                    self.fetch_once(&url, expect).await
                }
                None => Err(err),
            },
            other => other,
        }
    }
}

/// Controllers answer in UTF-8 or Latin-1 depending on firmware
fn decode_body(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url() {
        assert_eq!(
            base_url("192.168.178.222", DEFAULT_PORT, "eMlG"),
            "http://192.168.178.222:4321/eMlG/"
        );
    }

    #[test]
    fn test_decode_latin1_fallback() {
        assert_eq!(decode_body("°C".as_bytes()), "°C");
        assert_eq!(decode_body(&[0xB0, b'C']), "°C");
    }

    #[test]
    fn test_payload_shape() {
        assert!(Payload::Text("x".to_string()).into_json().is_err());
        assert_eq!(
            Payload::Text("x".to_string()).into_text().unwrap(),
            "x".to_string()
        );
    }

    #[test]
    fn test_trailing_slash_added() {
        let transport =
            HttpTransport::new("http://localhost:4321/PASS", Duration::from_secs(1)).unwrap();
        assert_eq!(transport.base_url(), "http://localhost:4321/PASS/");
    }
}
