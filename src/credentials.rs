//! Certificate and private key material used for WS-Security signing.
//!
//! Credentials are built through explicit factory functions so that an
//! unreadable certificate or key surfaces as an error before any request is
//! touched, not halfway through header construction.

use std::path::{Path, PathBuf};

use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;
use thiserror::Error;
use x509_cert::der::{Decode, DecodePem};
use x509_cert::Certificate;

/// Errors raised while loading signing material.
#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("certificate parse error: {0}")]
    CertificateParse(String),
    #[error("private key parse error: {0}")]
    KeyParse(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CredentialsError {
    /// Stable numeric code carried alongside the message.
    pub fn code(&self) -> u16 {
        match self {
            CredentialsError::CertificateParse(_) => 81,
            CredentialsError::KeyParse(_) => 85,
            CredentialsError::Io { .. } => 86,
        }
    }
}

/// An X.509 certificate plus the matching RSA private key.
///
/// Issuer name and serial number are extracted once at construction; header
/// building only reads them.
#[derive(Debug)]
pub struct SigningCredentials {
    certificate: Certificate,
    private_key: RsaPrivateKey,
    issuer: String,
    serial: String,
}

impl SigningCredentials {
    /// Load a PEM certificate and an unencrypted PKCS#8 PEM private key.
    pub fn from_pem(cert_pem: &str, key_pem: &str) -> Result<Self, CredentialsError> {
        let cert = Certificate::from_pem(cert_pem.as_bytes())
            .map_err(|e| CredentialsError::CertificateParse(format!("{e:?}")))?;
        let key = RsaPrivateKey::from_pkcs8_pem(key_pem)
            .map_err(|e| CredentialsError::KeyParse(format!("{e:?}")))?;
        Self::build(cert, key)
    }

    /// Load a PEM certificate and a passphrase-protected PKCS#8 PEM key.
    pub fn from_encrypted_pem(
        cert_pem: &str,
        key_pem: &str,
        passphrase: &str,
    ) -> Result<Self, CredentialsError> {
        let cert = Certificate::from_pem(cert_pem.as_bytes())
            .map_err(|e| CredentialsError::CertificateParse(format!("{e:?}")))?;
        let key = RsaPrivateKey::from_pkcs8_encrypted_pem(key_pem, passphrase)
            .map_err(|e| CredentialsError::KeyParse(format!("{e:?}")))?;
        Self::build(cert, key)
    }

    /// Load DER-encoded certificate and PKCS#8 key bytes.
    pub fn from_der(cert_der: &[u8], key_der: &[u8]) -> Result<Self, CredentialsError> {
        let cert = Certificate::from_der(cert_der)
            .map_err(|e| CredentialsError::CertificateParse(format!("{e:?}")))?;
        let key = RsaPrivateKey::from_pkcs8_der(key_der)
            .map_err(|e| CredentialsError::KeyParse(format!("{e:?}")))?;
        Self::build(cert, key)
    }

    /// Load PEM files from disk.
    pub fn from_pem_files(cert_path: &Path, key_path: &Path) -> Result<Self, CredentialsError> {
        let cert_pem = read_file(cert_path)?;
        let key_pem = read_file(key_path)?;
        Self::from_pem(&cert_pem, &key_pem)
    }

    pub(crate) fn build(
        certificate: Certificate,
        private_key: RsaPrivateKey,
    ) -> Result<Self, CredentialsError> {
        let (issuer, serial) = issuer_and_serial(&certificate);
        Ok(Self {
            certificate,
            private_key,
            issuer,
            serial,
        })
    }

    /// Issuer distinguished name of the certificate.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Certificate serial number as a decimal string.
    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub(crate) fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }
}

fn read_file(path: &Path) -> Result<String, CredentialsError> {
    std::fs::read_to_string(path).map_err(|source| CredentialsError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn issuer_and_serial(cert: &Certificate) -> (String, String) {
    let issuer = cert.tbs_certificate.issuer.to_string();
    let issuer = issuer
        .split(',')
        .map(|part| part.trim())
        .collect::<Vec<_>>()
        .join(", ");
    let serial = serial_bytes_to_decimal(cert.tbs_certificate.serial_number.as_bytes());
    (issuer, serial)
}

/// Big-endian serial bytes to a decimal string, without a bignum dependency.
fn serial_bytes_to_decimal(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "0".to_string();
    }

    // Little-endian base-10 accumulator.
    let mut digits: Vec<u8> = vec![0];
    for &byte in bytes {
        let mut carry = byte as u32;
        for digit in digits.iter_mut() {
            let value = (*digit as u32) * 256 + carry;
            *digit = (value % 10) as u8;
            carry = value / 10;
        }
        while carry > 0 {
            digits.push((carry % 10) as u8);
            carry /= 10;
        }
    }

    while digits.len() > 1 && matches!(digits.last(), Some(0)) {
        digits.pop();
    }

    digits.iter().rev().map(|d| (b'0' + *d) as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_conversion_handles_multi_byte_values() {
        assert_eq!(serial_bytes_to_decimal(&[]), "0");
        assert_eq!(serial_bytes_to_decimal(&[0x01]), "1");
        assert_eq!(serial_bytes_to_decimal(&[0x01, 0x00]), "256");
        assert_eq!(serial_bytes_to_decimal(&[0x00, 0x01]), "1");
        assert_eq!(serial_bytes_to_decimal(&[0xFF, 0xFF]), "65535");
        assert_eq!(
            serial_bytes_to_decimal(&[0x01, 0x00, 0x00, 0x00, 0x00]),
            "4294967296"
        );
    }

    #[test]
    fn garbage_pem_reports_certificate_parse_error() {
        let err = SigningCredentials::from_pem("not a certificate", "not a key").unwrap_err();
        assert!(matches!(err, CredentialsError::CertificateParse(_)));
        assert_eq!(err.code(), 81);
    }

    #[test]
    fn missing_file_reports_io_error() {
        let err = SigningCredentials::from_pem_files(
            Path::new("/nonexistent/cert.pem"),
            Path::new("/nonexistent/key.pem"),
        )
        .unwrap_err();
        assert!(matches!(err, CredentialsError::Io { .. }));
        assert_eq!(err.code(), 86);
    }
}
