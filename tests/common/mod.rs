use std::str::FromStr;
use std::time::Duration;

use rsa::pkcs1v15::SigningKey;
use rsa::RsaPrivateKey;
use sha2::Sha256;
use wsse_soap::SigningCredentials;
use x509_cert::builder::{Builder, CertificateBuilder, Profile};
use x509_cert::der::Encode;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::SubjectPublicKeyInfoOwned;
use x509_cert::time::Validity;

pub const SOAP_11_REQUEST: &str = r#"<?xml version="1.0"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <m:GetQuote xmlns:m="http://example.org/quotes"><m:Symbol>ACME</m:Symbol></m:GetQuote>
  </soap:Body>
</soap:Envelope>"#;

pub const SOAP_12_REQUEST: &str = r#"<?xml version="1.0"?>
<env:Envelope xmlns:env="http://www.w3.org/2003/05/soap-envelope">
  <env:Header>
    <r:Routing xmlns:r="urn:example:routing">gateway-7</r:Routing>
  </env:Header>
  <env:Body><Ping/></env:Body>
</env:Envelope>"#;

/// Fresh 2048-bit RSA key plus a self-signed certificate over it.
pub fn generate_key_and_cert() -> (RsaPrivateKey, x509_cert::Certificate) {
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
    (key, certificate)
}

pub fn generate_credentials() -> SigningCredentials {
    let (key, certificate) = generate_key_and_cert();
    let cert_der = certificate.to_der().expect("certificate DER");
    let key_der = rsa::pkcs8::EncodePrivateKey::to_pkcs8_der(&key).expect("key DER");
    SigningCredentials::from_der(&cert_der, key_der.as_bytes()).expect("credentials")
}
