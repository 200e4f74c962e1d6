//! HTTP delivery of serialized SOAP requests.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::debug;

use crate::envelope::SoapVersion;

/// Errors raised while delivering a request.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

impl TransportError {
    /// Stable numeric code carried alongside the message.
    pub fn code(&self) -> u16 {
        match self {
            TransportError::Http(_) => 90,
            TransportError::Status { .. } => 91,
        }
    }
}

/// Delivers one serialized envelope and returns the raw response body.
///
/// The client rewrites the request before it reaches the transport, so
/// implementations see the final wire bytes.
#[async_trait]
pub trait SoapTransport: Send + Sync {
    async fn send(
        &self,
        endpoint: &str,
        action: &str,
        version: SoapVersion,
        body: String,
    ) -> Result<String, TransportError>;
}

/// [`SoapTransport`] over a reqwest client.
///
/// SOAP 1.1 requests carry the action in a quoted `SOAPAction` header;
/// SOAP 1.2 folds it into the `Content-Type` action parameter.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Use a preconfigured reqwest client (timeouts, proxies, TLS).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SoapTransport for HttpTransport {
    async fn send(
        &self,
        endpoint: &str,
        action: &str,
        version: SoapVersion,
        body: String,
    ) -> Result<String, TransportError> {
        debug!(endpoint, action, bytes = body.len(), "sending SOAP request");
        let request = match version {
            SoapVersion::Soap11 => self
                .client
                .post(endpoint)
                .header(CONTENT_TYPE, version.content_type())
                .header("SOAPAction", format!("\"{action}\"")),
            SoapVersion::Soap12 => self.client.post(endpoint).header(
                CONTENT_TYPE,
                format!("{}; action=\"{action}\"", version.content_type()),
            ),
        };

        let response = request.body(body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}
