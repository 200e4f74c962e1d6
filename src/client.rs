//! SOAP client that rewrites outbound requests with a WS-Security header.

use tracing::debug;

use crate::config::SecurityConfig;
use crate::credentials::SigningCredentials;
use crate::envelope::security::WsseSecurity;
use crate::envelope::{SoapEnvelope, SoapVersion};
use crate::transport::{HttpTransport, SoapTransport};
use crate::Error;

/// A SOAP endpoint client with an optional WS-Security rewrite stage.
///
/// With security disabled the request body reaches the transport unchanged.
/// With security enabled, every [`request`](SoapClient::request) parses the
/// body, attaches a timestamped security header, signs it as configured, and
/// sends the rewritten document.
pub struct SoapClient<T: SoapTransport = HttpTransport> {
    transport: T,
    endpoint: String,
    config: SecurityConfig,
    credentials: Option<SigningCredentials>,
    security_enabled: bool,
}

impl SoapClient<HttpTransport> {
    /// Client over a default HTTP transport, security disabled.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_transport(endpoint, HttpTransport::new())
    }
}

impl<T: SoapTransport> SoapClient<T> {
    /// Client over a custom transport, security disabled.
    pub fn with_transport(endpoint: impl Into<String>, transport: T) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            config: SecurityConfig::default(),
            credentials: None,
            security_enabled: false,
        }
    }

    /// Enable the security rewrite using `credentials` for signing.
    pub fn enable_security(&mut self, credentials: SigningCredentials) {
        self.credentials = Some(credentials);
        self.security_enabled = true;
    }

    /// Disable the rewrite; requests pass through untouched.
    pub fn disable_security(&mut self) {
        self.security_enabled = false;
    }

    pub fn security_enabled(&self) -> bool {
        self.security_enabled
    }

    /// Timestamp lifetime for subsequent requests; `None` omits `Expires`.
    pub fn set_expiry(&mut self, expiry_secs: Option<u64>) {
        self.config.expiry_secs = expiry_secs;
    }

    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SecurityConfig {
        &mut self.config
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send a request, rewriting it first when security is enabled.
    pub async fn request(&self, action: &str, body: &str) -> Result<String, Error> {
        if !self.security_enabled {
            // Pass-through mode still sniffs the version for content
            // negotiation but never alters the payload bytes.
            let version = match SoapEnvelope::parse(body) {
                Ok(envelope) => envelope.version(),
                Err(err) => {
                    debug!(error = %err, "version sniff failed, assuming SOAP 1.1");
                    SoapVersion::Soap11
                }
            };
            let response = self
                .transport
                .send(&self.endpoint, action, version, body.to_string())
                .await?;
            return Ok(response);
        }

        let rewritten = self.secure_request(body)?;
        let version = rewritten.version();
        let response = self
            .transport
            .send(&self.endpoint, action, version, rewritten.to_xml())
            .await?;
        Ok(response)
    }

    /// Rewrite a request body the way [`request`](SoapClient::request) would,
    /// returning the envelope instead of sending it.
    pub fn secure_request(&self, body: &str) -> Result<SoapEnvelope, Error> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            Error::ClientState("security enabled without signing credentials".into())
        })?;
        let envelope = SoapEnvelope::parse(body)?;
        let mut wsse = WsseSecurity::new(
            envelope,
            self.config.actor.as_deref(),
            self.config.must_understand,
        )?;
        wsse.apply(&self.config, credentials)?;
        debug!(
            policy = self.config.sign_policy.as_str(),
            expiry = ?self.config.expiry_secs,
            "rewrote outbound request"
        );
        Ok(wsse.into_envelope())
    }
}
