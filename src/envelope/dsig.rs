//! Detached XML signature assembly.
//!
//! Canonicalization comes from libxml, digests from the SHA crates, and the
//! signature primitive from `rsa`; this module only builds the reference list
//! and the `ds:Signature` structure around those pieces.

use std::str::FromStr;

use base64ct::{Base64, Encoding};
use libxml::tree::{c14n, Document, Namespace, Node};
use libxml::xpath;
use rsa::pkcs1v15::SigningKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::envelope::constants::{
    DIGEST_SHA1_URI, DIGEST_SHA256_URI, DS_NS, REFERENCE_TEMPLATE, SIGNATURE_RSA_SHA1_URI,
    SIGNATURE_RSA_SHA256_URI, SIGNATURE_TEMPLATE, WSU_NS,
};
use crate::envelope::{find_child, import_fragment, EnvelopeError};

/// Digest algorithm used for references and the RSA signature.
///
/// Sha1 is the interop default for WS-Security 1.0 endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestAlgorithm {
    #[default]
    Sha1,
    Sha256,
}

/// Error returned when parsing a [`DigestAlgorithm`] from a string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DigestParseError {
    #[error("invalid digest algorithm: {input}")]
    Invalid { input: String },
}

impl FromStr for DigestAlgorithm {
    type Err = DigestParseError;

    fn from_str(algo: &str) -> Result<DigestAlgorithm, DigestParseError> {
        match algo.to_ascii_lowercase().as_str() {
            "sha1" => Ok(DigestAlgorithm::Sha1),
            "sha256" => Ok(DigestAlgorithm::Sha256),
            _ => Err(DigestParseError::Invalid {
                input: algo.to_string(),
            }),
        }
    }
}

impl DigestAlgorithm {
    pub fn digest_uri(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => DIGEST_SHA1_URI,
            DigestAlgorithm::Sha256 => DIGEST_SHA256_URI,
        }
    }

    pub fn signature_uri(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => SIGNATURE_RSA_SHA1_URI,
            DigestAlgorithm::Sha256 => SIGNATURE_RSA_SHA256_URI,
        }
    }

    fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
            DigestAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
        }
    }
}

/// Errors raised while assembling or computing a signature.
#[derive(Debug, Error)]
pub enum DsigError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    #[error("canonicalization failed: {0}")]
    Canonicalize(String),
    #[error("RSA signing failed: {0}")]
    Sign(String),
    #[error("XML tree error: {0}")]
    Tree(String),
}

impl DsigError {
    /// Stable numeric code carried alongside the message.
    pub fn code(&self) -> u16 {
        match self {
            DsigError::Envelope(e) => e.code(),
            DsigError::Canonicalize(_) => 92,
            DsigError::Sign(_) => 93,
            DsigError::Tree(_) => 89,
        }
    }
}

/// First `<ds:Signature>` element anywhere in the document, if present.
pub(crate) fn locate_signature(doc: &Document) -> Option<Node> {
    let ctx = xpath::Context::new(doc).ok()?;
    ctx.register_namespace("ds", DS_NS).ok()?;
    ctx.evaluate("//ds:Signature")
        .ok()?
        .get_nodes_as_vec()
        .into_iter()
        .next()
}

/// Assembles one detached signature over a list of reference targets.
pub(crate) struct SignatureBuilder {
    digest: DigestAlgorithm,
    references: Vec<Node>,
}

impl SignatureBuilder {
    pub(crate) fn new(digest: DigestAlgorithm) -> Self {
        Self {
            digest,
            references: Vec::new(),
        }
    }

    pub(crate) fn add_reference(&mut self, node: Node) {
        self.references.push(node);
    }

    /// Build the `<ds:Signature>` under `parent` and sign the references.
    ///
    /// The signature element is attached before digesting so that SignedInfo
    /// canonicalization sees the namespace context it will live in. Reference
    /// digests are unaffected: the signature node itself is never a target.
    pub(crate) fn sign(
        mut self,
        doc: &mut Document,
        parent: &mut Node,
        key: &RsaPrivateKey,
    ) -> Result<Node, DsigError> {
        let mut signature = import_fragment(doc, SIGNATURE_TEMPLATE)?;
        parent
            .add_child(&mut signature)
            .map_err(|e| DsigError::Tree(e.to_string()))?;

        let mut signed_info = find_child(&signature, Some(DS_NS), "SignedInfo")
            .ok_or_else(|| DsigError::Tree("signature template missing SignedInfo".into()))?;
        let mut signature_method = find_child(&signed_info, Some(DS_NS), "SignatureMethod")
            .ok_or_else(|| DsigError::Tree("signature template missing SignatureMethod".into()))?;
        signature_method
            .set_attribute("Algorithm", self.digest.signature_uri())
            .map_err(|e| DsigError::Tree(e.to_string()))?;

        for index in 0..self.references.len() {
            let id = ensure_wsu_id(&mut self.references[index], index)?;
            let canonical = canonicalize_node(doc, &self.references[index])?;
            let digest_b64 = Base64::encode_string(&self.digest.digest(canonical.as_bytes()));

            let mut reference = import_fragment(doc, REFERENCE_TEMPLATE)?;
            reference
                .set_attribute("URI", &format!("#{id}"))
                .map_err(|e| DsigError::Tree(e.to_string()))?;
            let mut digest_method = find_child(&reference, Some(DS_NS), "DigestMethod")
                .ok_or_else(|| DsigError::Tree("reference template missing DigestMethod".into()))?;
            digest_method
                .set_attribute("Algorithm", self.digest.digest_uri())
                .map_err(|e| DsigError::Tree(e.to_string()))?;
            let mut digest_value = find_child(&reference, Some(DS_NS), "DigestValue")
                .ok_or_else(|| DsigError::Tree("reference template missing DigestValue".into()))?;
            digest_value
                .set_content(&digest_b64)
                .map_err(|e| DsigError::Tree(e.to_string()))?;
            signed_info
                .add_child(&mut reference)
                .map_err(|e| DsigError::Tree(e.to_string()))?;
        }

        let signed_info_canonical = canonicalize_node(doc, &signed_info)?;
        let signature_bytes = sign_bytes(key, self.digest, signed_info_canonical.as_bytes())?;
        let mut signature_value = find_child(&signature, Some(DS_NS), "SignatureValue")
            .ok_or_else(|| DsigError::Tree("signature template missing SignatureValue".into()))?;
        signature_value
            .set_content(&Base64::encode_string(&signature_bytes))
            .map_err(|e| DsigError::Tree(e.to_string()))?;

        Ok(signature)
    }
}

/// Exclusive C14N of a single subtree.
fn canonicalize_node(_doc: &Document, node: &Node) -> Result<String, DsigError> {
    let options = c14n::CanonicalizationOptions {
        mode: c14n::CanonicalizationMode::ExclusiveCanonical1_0,
        inclusive_ns_prefixes: vec![],
        with_comments: false,
    };
    node.clone()
        .canonicalize(options)
        .map_err(|e| DsigError::Canonicalize(format!("{e:?}")))
}

/// Reuse the node's `wsu:Id` or stamp a generated one, returning the id.
fn ensure_wsu_id(node: &mut Node, index: usize) -> Result<String, DsigError> {
    if let Some(existing) = node.get_attribute_ns("Id", WSU_NS) {
        return Ok(existing);
    }
    let id = format!("ws-id-{}", index + 1);
    let ns = match node
        .get_namespace_declarations()
        .into_iter()
        .find(|ns| ns.get_href() == WSU_NS)
    {
        Some(ns) => ns,
        None => Namespace::new("wsu", WSU_NS, node).map_err(|e| DsigError::Tree(e.to_string()))?,
    };
    node.set_attribute_ns("Id", &id, &ns)
        .map_err(|e| DsigError::Tree(e.to_string()))?;
    Ok(id)
}

fn sign_bytes(
    key: &RsaPrivateKey,
    algorithm: DigestAlgorithm,
    data: &[u8],
) -> Result<Vec<u8>, DsigError> {
    match algorithm {
        DigestAlgorithm::Sha1 => {
            let signing_key = SigningKey::<Sha1>::new(key.clone());
            let signature = signing_key
                .try_sign(data)
                .map_err(|e| DsigError::Sign(e.to_string()))?;
            Ok(signature.to_vec())
        }
        DigestAlgorithm::Sha256 => {
            let signing_key = SigningKey::<Sha256>::new(key.clone());
            let signature = signing_key
                .try_sign(data)
                .map_err(|e| DsigError::Sign(e.to_string()))?;
            Ok(signature.to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::constants::EXC_C14N_URI;

    #[test]
    fn templates_declare_exclusive_canonicalization() {
        assert!(SIGNATURE_TEMPLATE.contains(EXC_C14N_URI));
        assert!(REFERENCE_TEMPLATE.contains(EXC_C14N_URI));
    }

    #[test]
    fn algorithm_uris_match_xmldsig_registry() {
        assert_eq!(
            DigestAlgorithm::Sha1.signature_uri(),
            "http://www.w3.org/2000/09/xmldsig#rsa-sha1"
        );
        assert_eq!(
            DigestAlgorithm::Sha256.digest_uri(),
            "http://www.w3.org/2001/04/xmlenc#sha256"
        );
    }

    #[test]
    fn digest_algorithm_parses_from_str() {
        assert_eq!(DigestAlgorithm::from_str("sha1").unwrap(), DigestAlgorithm::Sha1);
        assert_eq!(
            DigestAlgorithm::from_str("SHA256").unwrap(),
            DigestAlgorithm::Sha256
        );
        assert!(DigestAlgorithm::from_str("md5").is_err());
    }

    #[test]
    fn sha1_digest_has_expected_width() {
        assert_eq!(DigestAlgorithm::Sha1.digest(b"abc").len(), 20);
        assert_eq!(DigestAlgorithm::Sha256.digest(b"abc").len(), 32);
    }
}
