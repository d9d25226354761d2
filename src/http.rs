use std::time::Duration;

use thiserror::Error;
use url::Url;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("server answered HTTP {0}")]
    Status(u16),
}

/// Single-shot GET returning the response body. One attempt, no retries.
pub trait HttpFetch {
    fn get_text(&self, url: &Url) -> Result<String, TransportError>;
}

pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("cp-cockpit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| TransportError::Request(err.to_string()))?;
        Ok(Self { client })
    }
}

impl HttpFetch for HttpTransport {
    fn get_text(&self, url: &Url) -> Result<String, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|err| TransportError::Request(err.without_url().to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        response
            .text()
            .map_err(|err| TransportError::Request(err.without_url().to_string()))
    }
}
