//! WS-Security header injection for outbound SOAP requests.
//!
//! The crate wraps a SOAP transport and rewrites each outbound envelope
//! before it hits the wire: a `<wsse:Security>` header is located or
//! created, a `<wsu:Timestamp>` is prepended, the header contents and body
//! are signed with a detached XML signature, and the signing certificate is
//! referenced by issuer and serial number.
//!
//! ```
//! use wsse_soap::{SoapEnvelope, WsseSecurity};
//!
//! let xml = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
//!   <soap:Body><Ping/></soap:Body>
//! </soap:Envelope>"#;
//!
//! let envelope = SoapEnvelope::parse(xml)?;
//! let mut security = WsseSecurity::new(envelope, None, true)?;
//! security.add_timestamp(Some(120))?;
//! assert!(security.to_xml().contains("wsu:Timestamp"));
//! # Ok::<(), wsse_soap::Error>(())
//! ```
//!
//! For end-to-end use, [`SoapClient`] drives the rewrite automatically on
//! every request once [`SoapClient::enable_security`] is called.

use thiserror::Error;

pub mod client;
pub mod config;
pub mod credentials;
pub mod envelope;
pub mod transport;

pub use client::SoapClient;
pub use config::{SecurityConfig, SignPolicy, SignPolicyParseError, DEFAULT_EXPIRY_SECS};
pub use credentials::{CredentialsError, SigningCredentials};
pub use envelope::dsig::{DigestAlgorithm, DigestParseError, DsigError};
pub use envelope::security::{SecurityError, WsseSecurity};
pub use envelope::{EnvelopeError, SoapEnvelope, SoapVersion};
pub use transport::{HttpTransport, SoapTransport, TransportError};

/// Top-level error type covering every stage of the request rewrite.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    #[error(transparent)]
    Security(#[from] SecurityError),
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
    #[error(transparent)]
    Dsig(#[from] DsigError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("client state error: {0}")]
    ClientState(String),
}

impl Error {
    /// Stable numeric code carried alongside the message.
    pub fn code(&self) -> u16 {
        match self {
            Error::Envelope(e) => e.code(),
            Error::Security(e) => e.code(),
            Error::Credentials(e) => e.code(),
            Error::Dsig(e) => e.code(),
            Error::Transport(e) => e.code(),
            Error::ClientState(_) => 95,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_credentials {
    use std::str::FromStr;
    use std::time::Duration;

    use rsa::pkcs1v15::SigningKey;
    use rsa::RsaPrivateKey;
    use sha2::Sha256;
    use x509_cert::builder::{Builder, CertificateBuilder, Profile};
    use x509_cert::name::Name;
    use x509_cert::serial_number::SerialNumber;
    use x509_cert::spki::SubjectPublicKeyInfoOwned;
    use x509_cert::time::Validity;

    use crate::credentials::SigningCredentials;

    /// Fresh RSA key plus a self-signed certificate for unit tests.
    pub(crate) fn generate() -> SigningCredentials {
        let mut rng = rand::thread_rng();
        let key = RsaPrivateKey::new(&mut rng, 2048).expect("generate RSA key");
        let signer = SigningKey::<Sha256>::new(key.clone());
        let spki = SubjectPublicKeyInfoOwned::from_key(key.to_public_key()).expect("spki");
        let builder = CertificateBuilder::new(
            Profile::Root,
            SerialNumber::from(314159u32),
            Validity::from_now(Duration::from_secs(3600)).expect("validity"),
            Name::from_str("CN=WSSE Test,O=Example Corp,C=US").expect("subject"),
            spki,
            &signer,
        )
        .expect("certificate builder");
        let certificate = builder
            .build::<rsa::pkcs1v15::Signature>()
            .expect("self-signed certificate");
        SigningCredentials::build(certificate, key).expect("credentials")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_survive_conversion() {
        let err: Error = EnvelopeError::MissingEnvelope.into();
        assert_eq!(err.code(), 83);

        let err: Error = SecurityError::SignatureNotFound.into();
        assert_eq!(err.code(), 80);

        let err: Error = CredentialsError::CertificateParse("bad".into()).into();
        assert_eq!(err.code(), 81);

        let err = Error::ClientState("no credentials".into());
        assert_eq!(err.code(), 95);
    }

    #[test]
    fn transparent_errors_keep_their_message() {
        let err: Error = EnvelopeError::UnsupportedNamespace("urn:x".into()).into();
        assert_eq!(
            err.to_string(),
            "unrecognized SOAP envelope namespace: urn:x"
        );
    }
}
