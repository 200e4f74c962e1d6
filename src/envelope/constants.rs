pub(crate) const SOAP_11_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub(crate) const SOAP_12_NS: &str = "http://www.w3.org/2003/05/soap-envelope";
pub(crate) const WSSE_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
pub(crate) const WSU_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";
pub(crate) const DS_NS: &str = "http://www.w3.org/2000/09/xmldsig#";

pub(crate) const EXC_C14N_URI: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
pub(crate) const DIGEST_SHA1_URI: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
pub(crate) const DIGEST_SHA256_URI: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
pub(crate) const SIGNATURE_RSA_SHA1_URI: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";
pub(crate) const SIGNATURE_RSA_SHA256_URI: &str =
    "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";

pub(crate) const SECURITY_TEMPLATE: &str = include_str!("../../assets/templates/security.xml");
pub(crate) const TIMESTAMP_TEMPLATE: &str = include_str!("../../assets/templates/timestamp.xml");
pub(crate) const KEY_INFO_TEMPLATE: &str = include_str!("../../assets/templates/key_info.xml");
pub(crate) const TOKEN_REFERENCE_TEMPLATE: &str =
    include_str!("../../assets/templates/security_token_reference.xml");
pub(crate) const SIGNATURE_TEMPLATE: &str = include_str!("../../assets/templates/signature.xml");
pub(crate) const REFERENCE_TEMPLATE: &str = include_str!("../../assets/templates/reference.xml");
