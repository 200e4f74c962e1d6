//! WS-Security header construction and signing.
//!
//! [`WsseSecurity`] wraps a parsed envelope together with its
//! `<wsse:Security>` header element. The header is located or created on
//! construction; timestamp, signature, and key info are added through the
//! individual operations.

use chrono::{DateTime, Duration, Utc};
use libxml::tree::{Namespace, Node};
use thiserror::Error;
use tracing::debug;

use crate::config::{SecurityConfig, SignPolicy};
use crate::credentials::SigningCredentials;
use crate::envelope::constants::{
    DS_NS, KEY_INFO_TEMPLATE, SECURITY_TEMPLATE, TIMESTAMP_TEMPLATE, TOKEN_REFERENCE_TEMPLATE,
    WSSE_NS, WSU_NS,
};
use crate::envelope::dsig::{locate_signature, DigestAlgorithm, DsigError, SignatureBuilder};
use crate::envelope::{
    element_children, find_child, first_element_child, import_fragment, node_namespace_href,
    EnvelopeError, SoapEnvelope,
};

/// Timestamp format mandated by the WS-Security utility schema.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Errors raised while building or signing the security header.
#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("no signature element to attach X.509 key info to")]
    SignatureNotFound,
    #[error("document already carries a signature")]
    SignatureAlreadyPresent,
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    #[error(transparent)]
    Dsig(#[from] DsigError),
    #[error("XML tree error: {0}")]
    Tree(String),
}

impl SecurityError {
    /// Stable numeric code carried alongside the message.
    pub fn code(&self) -> u16 {
        match self {
            SecurityError::SignatureNotFound => 80,
            SecurityError::SignatureAlreadyPresent => 87,
            SecurityError::Envelope(e) => e.code(),
            SecurityError::Dsig(e) => e.code(),
            SecurityError::Tree(_) => 89,
        }
    }
}

/// An envelope plus its bound `<wsse:Security>` header element.
pub struct WsseSecurity {
    envelope: SoapEnvelope,
    security: Node,
}

impl WsseSecurity {
    /// Bind to the security header addressed to `actor`, creating the header
    /// (and the SOAP `<Header>` element) when absent.
    ///
    /// A freshly created header gets `mustUnderstand="1"` when
    /// `must_understand` is set; an existing header is left untouched.
    pub fn new(
        mut envelope: SoapEnvelope,
        actor: Option<&str>,
        must_understand: bool,
    ) -> Result<Self, SecurityError> {
        let mut header = envelope.ensure_header()?;
        let soap_ns = envelope.version().namespace();

        let existing = element_children(&header).into_iter().find(|child| {
            child.get_name() == "Security"
                && node_namespace_href(child).as_deref() == Some(WSSE_NS)
                && child.get_attribute_ns("actor", soap_ns).as_deref() == actor
        });

        let security = match existing {
            Some(node) => node,
            None => {
                let mut node = import_fragment(envelope.doc_mut(), SECURITY_TEMPLATE)?;
                if must_understand || actor.is_some() {
                    let prefix = envelope.soap_prefix().to_string();
                    let ns = Namespace::new(&prefix, soap_ns, &mut node)
                        .map_err(|e| SecurityError::Tree(e.to_string()))?;
                    if must_understand {
                        node.set_attribute_ns("mustUnderstand", "1", &ns)
                            .map_err(|e| SecurityError::Tree(e.to_string()))?;
                    }
                    if let Some(actor) = actor {
                        node.set_attribute_ns("actor", actor, &ns)
                            .map_err(|e| SecurityError::Tree(e.to_string()))?;
                    }
                }
                header
                    .add_child(&mut node)
                    .map_err(|e| SecurityError::Tree(e.to_string()))?;
                node
            }
        };

        Ok(Self { envelope, security })
    }

    /// Prepend a `<wsu:Timestamp>` with `Created` now and `Expires` after
    /// `expiry_secs` seconds. `None` omits the `Expires` element entirely.
    pub fn add_timestamp(&mut self, expiry_secs: Option<u64>) -> Result<(), SecurityError> {
        let mut timestamp = import_fragment(self.envelope.doc_mut(), TIMESTAMP_TEMPLATE)?;

        let now = Utc::now();
        let mut created = find_child(&timestamp, Some(WSU_NS), "Created")
            .ok_or_else(|| SecurityError::Tree("timestamp template missing Created".into()))?;
        created
            .set_content(&now.format(TIMESTAMP_FORMAT).to_string())
            .map_err(|e| SecurityError::Tree(e.to_string()))?;

        let mut expires = find_child(&timestamp, Some(WSU_NS), "Expires")
            .ok_or_else(|| SecurityError::Tree("timestamp template missing Expires".into()))?;
        match expiry_secs {
            Some(secs) => {
                // Saturate absurd lifetimes instead of wrapping.
                let lifetime = i64::try_from(secs)
                    .ok()
                    .and_then(Duration::try_seconds)
                    .unwrap_or(Duration::MAX);
                let deadline = now
                    .checked_add_signed(lifetime)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC);
                expires
                    .set_content(&deadline.format(TIMESTAMP_FORMAT).to_string())
                    .map_err(|e| SecurityError::Tree(e.to_string()))?;
            }
            None => expires.unlink(),
        }

        // The timestamp always leads the security header.
        if let Some(mut first) = first_element_child(&self.security) {
            first
                .add_prev_sibling(&mut timestamp)
                .map_err(|e| SecurityError::Tree(e.to_string()))?;
        } else {
            self.security
                .add_child(&mut timestamp)
                .map_err(|e| SecurityError::Tree(e.to_string()))?;
        }
        Ok(())
    }

    /// Sign the security header contents and the body with one detached
    /// signature appended to the security header.
    ///
    /// With `sign_all_headers` set, sibling header entries outside the WSSE
    /// namespace are signed as well.
    ///
    /// # Errors
    /// Returns [`SecurityError::SignatureAlreadyPresent`] when the document
    /// already carries a `<ds:Signature>` anywhere.
    pub fn sign(
        &mut self,
        credentials: &SigningCredentials,
        digest: DigestAlgorithm,
        sign_all_headers: bool,
    ) -> Result<(), SecurityError> {
        if locate_signature(self.envelope.doc()).is_some() {
            return Err(SecurityError::SignatureAlreadyPresent);
        }

        let mut builder = SignatureBuilder::new(digest);
        for child in element_children(&self.security) {
            builder.add_reference(child);
        }
        if sign_all_headers {
            if let Some(header) = self.envelope.header() {
                for child in element_children(&header) {
                    if node_namespace_href(&child).as_deref() != Some(WSSE_NS) {
                        builder.add_reference(child);
                    }
                }
            }
        }
        if let Some(body) = self.envelope.body() {
            builder.add_reference(body);
        }

        builder.sign(
            self.envelope.doc_mut(),
            &mut self.security,
            credentials.private_key(),
        )?;
        debug!(algorithm = digest.signature_uri(), "signed envelope");
        Ok(())
    }

    /// Attach an X.509 issuer/serial token reference to the signature's
    /// `<ds:KeyInfo>`, creating the key info element when absent.
    ///
    /// # Errors
    /// Returns [`SecurityError::SignatureNotFound`] when the document has no
    /// signature yet.
    pub fn add_x509_key_info(
        &mut self,
        credentials: &SigningCredentials,
    ) -> Result<(), SecurityError> {
        let mut signature =
            locate_signature(self.envelope.doc()).ok_or(SecurityError::SignatureNotFound)?;

        let mut key_info = match find_child(&signature, Some(DS_NS), "KeyInfo") {
            Some(node) => node,
            None => {
                let mut node = import_fragment(self.envelope.doc_mut(), KEY_INFO_TEMPLATE)?;
                signature
                    .add_child(&mut node)
                    .map_err(|e| SecurityError::Tree(e.to_string()))?;
                node
            }
        };

        let mut reference = import_fragment(self.envelope.doc_mut(), TOKEN_REFERENCE_TEMPLATE)?;
        let x509_data = find_child(&reference, Some(DS_NS), "X509Data")
            .ok_or_else(|| SecurityError::Tree("token template missing X509Data".into()))?;
        let issuer_serial = find_child(&x509_data, Some(DS_NS), "X509IssuerSerial")
            .ok_or_else(|| SecurityError::Tree("token template missing X509IssuerSerial".into()))?;
        let mut issuer_name = find_child(&issuer_serial, Some(DS_NS), "X509IssuerName")
            .ok_or_else(|| SecurityError::Tree("token template missing X509IssuerName".into()))?;
        issuer_name
            .set_content(credentials.issuer())
            .map_err(|e| SecurityError::Tree(e.to_string()))?;
        let mut serial_number = find_child(&issuer_serial, Some(DS_NS), "X509SerialNumber")
            .ok_or_else(|| SecurityError::Tree("token template missing X509SerialNumber".into()))?;
        serial_number
            .set_content(credentials.serial())
            .map_err(|e| SecurityError::Tree(e.to_string()))?;

        key_info
            .add_child(&mut reference)
            .map_err(|e| SecurityError::Tree(e.to_string()))?;
        Ok(())
    }

    /// Timestamp, sign, and attach key info as configured.
    pub fn apply(
        &mut self,
        config: &SecurityConfig,
        credentials: &SigningCredentials,
    ) -> Result<(), SecurityError> {
        self.add_timestamp(config.expiry_secs)?;
        if config.sign_policy == SignPolicy::OnSend {
            self.sign(credentials, config.digest, config.sign_all_headers)?;
            self.add_x509_key_info(credentials)?;
        }
        Ok(())
    }

    /// The bound `<wsse:Security>` element.
    pub(crate) fn security_node(&self) -> &Node {
        &self.security
    }

    pub fn envelope(&self) -> &SoapEnvelope {
        &self.envelope
    }

    pub fn into_envelope(self) -> SoapEnvelope {
        self.envelope
    }

    /// Serialize the rewritten request.
    pub fn to_xml(&self) -> String {
        self.envelope.to_xml()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body><Ping/></soap:Body>
</soap:Envelope>"#;

    const SAMPLE_WITH_SECURITY: &str = r#"<?xml version="1.0"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"
               xmlns:wsse="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd">
  <soap:Header>
    <wsse:Security><Existing/></wsse:Security>
  </soap:Header>
  <soap:Body><Ping/></soap:Body>
</soap:Envelope>"#;

    fn attach(xml: &str) -> WsseSecurity {
        let envelope = SoapEnvelope::parse(xml).expect("parse");
        WsseSecurity::new(envelope, None, true).expect("attach")
    }

    #[test]
    fn creates_header_and_security_element() {
        let wsse = attach(SAMPLE);
        let xml = wsse.to_xml();
        assert!(xml.contains("wsse:Security"));
        assert!(xml.contains("mustUnderstand=\"1\""));
    }

    #[test]
    fn reuses_existing_security_header() {
        let wsse = attach(SAMPLE_WITH_SECURITY);
        assert_eq!(wsse.to_xml().matches("<wsse:Security").count(), 1);
        assert!(find_child(wsse.security_node(), None, "Existing").is_some());
    }

    #[test]
    fn actor_mismatch_creates_second_header() {
        let envelope = SoapEnvelope::parse(SAMPLE_WITH_SECURITY).expect("parse");
        let wsse =
            WsseSecurity::new(envelope, Some("urn:gateway"), true).expect("attach");
        let xml = wsse.to_xml();
        assert_eq!(xml.matches("<wsse:Security").count(), 2);
        assert!(xml.contains("soap:actor=\"urn:gateway\""));
    }

    #[test]
    fn timestamp_leads_the_security_header() {
        let mut wsse = attach(SAMPLE_WITH_SECURITY);
        wsse.add_timestamp(Some(120)).expect("timestamp");
        let first = first_element_child(wsse.security_node()).expect("first child");
        assert_eq!(first.get_name(), "Timestamp");
        let xml = wsse.to_xml();
        assert!(xml.contains("<wsu:Created>"));
        assert!(xml.contains("<wsu:Expires>"));
    }

    #[test]
    fn timestamp_expiry_is_created_plus_lifetime() {
        let mut wsse = attach(SAMPLE);
        wsse.add_timestamp(Some(120)).expect("timestamp");

        let timestamp = first_element_child(wsse.security_node()).expect("timestamp node");
        let created = find_child(&timestamp, Some(WSU_NS), "Created")
            .expect("created")
            .get_content();
        let expires = find_child(&timestamp, Some(WSU_NS), "Expires")
            .expect("expires")
            .get_content();

        let created = chrono::NaiveDateTime::parse_from_str(&created, TIMESTAMP_FORMAT)
            .expect("created is second-precision UTC");
        let expires = chrono::NaiveDateTime::parse_from_str(&expires, TIMESTAMP_FORMAT)
            .expect("expires is second-precision UTC");
        assert_eq!(expires - created, Duration::seconds(120));
    }

    #[test]
    fn oversized_expiry_saturates_instead_of_wrapping() {
        let mut wsse = attach(SAMPLE);
        wsse.add_timestamp(Some(u64::MAX)).expect("timestamp");
        let xml = wsse.to_xml();
        assert!(xml.contains("<wsu:Expires>"));
    }

    #[test]
    fn timestamp_without_expiry_omits_expires() {
        let mut wsse = attach(SAMPLE);
        wsse.add_timestamp(None).expect("timestamp");
        let xml = wsse.to_xml();
        assert!(xml.contains("<wsu:Created>"));
        assert!(!xml.contains("Expires"));
    }

    #[test]
    fn key_info_requires_a_signature() {
        let mut wsse = attach(SAMPLE);
        let credentials = crate::test_credentials::generate();
        let err = wsse.add_x509_key_info(&credentials).unwrap_err();
        assert!(matches!(err, SecurityError::SignatureNotFound));
        assert_eq!(err.code(), 80);
    }
}
