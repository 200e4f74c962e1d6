//! Parsed SOAP envelope wrapper.
//!
//! One outbound request is parsed into a [`SoapEnvelope`], mutated by the
//! security module, serialized back to a string, and discarded.

use libxml::parser::Parser;
use libxml::tree::{Document, Namespace, Node};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod constants;
pub mod dsig;
pub mod security;

use constants::{SOAP_11_NS, SOAP_12_NS};

/// SOAP protocol version, detected from the envelope namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoapVersion {
    Soap11,
    Soap12,
}

impl SoapVersion {
    pub fn namespace(&self) -> &'static str {
        match self {
            SoapVersion::Soap11 => SOAP_11_NS,
            SoapVersion::Soap12 => SOAP_12_NS,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            SoapVersion::Soap11 => "text/xml; charset=utf-8",
            SoapVersion::Soap12 => "application/soap+xml; charset=utf-8",
        }
    }
}

/// Errors raised while parsing or rewriting an envelope document.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("XML parse error: {0}")]
    Parse(String),
    #[error("no SOAP Envelope root element found")]
    MissingEnvelope,
    #[error("unrecognized SOAP envelope namespace: {0}")]
    UnsupportedNamespace(String),
    #[error("XML tree error: {0}")]
    Tree(String),
}

impl EnvelopeError {
    /// Stable numeric code carried alongside the message.
    pub fn code(&self) -> u16 {
        match self {
            EnvelopeError::Parse(_) => 82,
            EnvelopeError::MissingEnvelope => 83,
            EnvelopeError::UnsupportedNamespace(_) => 84,
            EnvelopeError::Tree(_) => 89,
        }
    }
}

/// A parsed outbound SOAP request.
pub struct SoapEnvelope {
    doc: Document,
    version: SoapVersion,
    soap_prefix: String,
}

impl std::fmt::Debug for SoapEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoapEnvelope")
            .field("version", &self.version)
            .field("soap_prefix", &self.soap_prefix)
            .finish_non_exhaustive()
    }
}

impl SoapEnvelope {
    /// Parse a raw request string into an envelope document.
    ///
    /// # Errors
    /// Returns [`EnvelopeError::Parse`] for malformed XML,
    /// [`EnvelopeError::MissingEnvelope`] when the root is not `Envelope`, and
    /// [`EnvelopeError::UnsupportedNamespace`] for a non-SOAP namespace.
    pub fn parse(xml: &str) -> Result<Self, EnvelopeError> {
        let doc = Parser::default()
            .parse_string(xml)
            .map_err(|e| EnvelopeError::Parse(format!("{e:?}")))?;
        let root = doc.get_root_element().ok_or(EnvelopeError::MissingEnvelope)?;
        if root.get_name() != "Envelope" {
            return Err(EnvelopeError::MissingEnvelope);
        }
        let ns = root.get_namespace().ok_or(EnvelopeError::MissingEnvelope)?;
        let version = match ns.get_href().as_str() {
            SOAP_11_NS => SoapVersion::Soap11,
            SOAP_12_NS => SoapVersion::Soap12,
            other => return Err(EnvelopeError::UnsupportedNamespace(other.to_string())),
        };
        // Attributes cannot live in a default namespace, so a prefix is
        // always needed when stamping mustUnderstand/actor later on.
        let soap_prefix = match ns.get_prefix() {
            p if p.is_empty() => "soap".to_string(),
            p => p,
        };
        Ok(Self {
            doc,
            version,
            soap_prefix,
        })
    }

    pub fn version(&self) -> SoapVersion {
        self.version
    }

    pub(crate) fn soap_prefix(&self) -> &str {
        &self.soap_prefix
    }

    pub(crate) fn doc(&self) -> &Document {
        &self.doc
    }

    pub(crate) fn doc_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub(crate) fn root(&self) -> Result<Node, EnvelopeError> {
        self.doc.get_root_element().ok_or(EnvelopeError::MissingEnvelope)
    }

    /// The `<Header>` element, if present.
    pub fn header(&self) -> Option<Node> {
        let root = self.doc.get_root_element()?;
        find_child(&root, Some(self.version.namespace()), "Header")
    }

    /// The `<Body>` element, if present.
    pub fn body(&self) -> Option<Node> {
        let root = self.doc.get_root_element()?;
        find_child(&root, Some(self.version.namespace()), "Body")
    }

    /// Find the `<Header>` element, creating it as the envelope's first child
    /// when absent.
    pub(crate) fn ensure_header(&mut self) -> Result<Node, EnvelopeError> {
        if let Some(header) = self.header() {
            return Ok(header);
        }
        let mut root = self.root()?;
        let mut header = Node::new("Header", None, &self.doc)
            .map_err(|_| EnvelopeError::Tree("failed to create Header node".into()))?;
        let ns = Namespace::new(&self.soap_prefix, self.version.namespace(), &mut header)
            .map_err(|e| EnvelopeError::Tree(e.to_string()))?;
        header
            .set_namespace(&ns)
            .map_err(|e| EnvelopeError::Tree(e.to_string()))?;
        if let Some(mut first) = first_element_child(&root) {
            first
                .add_prev_sibling(&mut header)
                .map_err(|e| EnvelopeError::Tree(e.to_string()))?;
        } else {
            root.add_child(&mut header)
                .map_err(|e| EnvelopeError::Tree(e.to_string()))?;
        }
        Ok(header)
    }

    /// Serialize the (possibly rewritten) document back to a string.
    pub fn to_xml(&self) -> String {
        self.doc.to_string()
    }
}

/// Parse an XML fragment and import its root into `doc`, unattached.
pub(crate) fn import_fragment(doc: &mut Document, xml: &str) -> Result<Node, EnvelopeError> {
    let fragment = Parser::default()
        .parse_string(xml)
        .map_err(|e| EnvelopeError::Parse(format!("{e:?}")))?;
    let mut node = fragment
        .get_root_element()
        .ok_or_else(|| EnvelopeError::Tree("missing fragment root".into()))?;
    node.unlink();
    doc.import_node(&mut node)
        .map_err(|_| EnvelopeError::Tree("failed to import fragment".into()))
}

pub(crate) fn first_element_child(node: &Node) -> Option<Node> {
    let mut current = node.get_first_child();
    while let Some(child) = current {
        if child.is_element_node() {
            return Some(child);
        }
        current = child.get_next_sibling();
    }
    None
}

pub(crate) fn element_children(node: &Node) -> Vec<Node> {
    let mut children = Vec::new();
    let mut current = node.get_first_child();
    while let Some(child) = current {
        if child.is_element_node() {
            children.push(child.clone());
        }
        current = child.get_next_sibling();
    }
    children
}

pub(crate) fn node_namespace_href(node: &Node) -> Option<String> {
    node.get_namespace().map(|ns| ns.get_href())
}

/// Find a direct element child by namespace href and local name. A `None`
/// namespace matches children without any namespace.
pub(crate) fn find_child(node: &Node, ns: Option<&str>, local_name: &str) -> Option<Node> {
    element_children(node)
        .into_iter()
        .find(|child| child.get_name() == local_name && node_namespace_href(child).as_deref() == ns)
}
