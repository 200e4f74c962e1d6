//! Security configuration applied when the client rewrites a request.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::envelope::dsig::DigestAlgorithm;

/// Default lifetime of the `<wsu:Timestamp>` element, in seconds.
pub const DEFAULT_EXPIRY_SECS: u64 = 600;

/// When the request hook signs the document.
///
/// - `OnSend`: sign and append the X.509 key reference during every secured
///   send.
/// - `Manual`: the hook only attaches the header and timestamp; the caller
///   drives signing through [`crate::WsseSecurity`] itself.
/// - `Never`: timestamped header only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignPolicy {
    #[default]
    OnSend,
    Manual,
    Never,
}

/// Error returned when parsing a [`SignPolicy`] from a string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignPolicyParseError {
    #[error("invalid sign policy: {input}")]
    Invalid { input: String },
}

impl FromStr for SignPolicy {
    type Err = SignPolicyParseError;

    fn from_str(policy: &str) -> Result<SignPolicy, SignPolicyParseError> {
        match policy.to_ascii_lowercase().as_str() {
            "on_send" => Ok(SignPolicy::OnSend),
            "manual" => Ok(SignPolicy::Manual),
            "never" => Ok(SignPolicy::Never),
            _ => Err(SignPolicyParseError::Invalid {
                input: policy.to_string(),
            }),
        }
    }
}

impl SignPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignPolicy::OnSend => "on_send",
            SignPolicy::Manual => "manual",
            SignPolicy::Never => "never",
        }
    }
}

/// Per-client settings for the WS-Security header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// SOAP actor the security header is addressed to; `None` targets the
    /// ultimate receiver.
    pub actor: Option<String>,
    /// Stamp `mustUnderstand="1"` on a newly created security header.
    pub must_understand: bool,
    /// Timestamp lifetime in seconds; `None` omits `<wsu:Expires>`.
    pub expiry_secs: Option<u64>,
    /// Also sign header elements outside the WSSE namespace.
    pub sign_all_headers: bool,
    pub sign_policy: SignPolicy,
    pub digest: DigestAlgorithm,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            actor: None,
            must_understand: true,
            expiry_secs: Some(DEFAULT_EXPIRY_SECS),
            sign_all_headers: false,
            sign_policy: SignPolicy::default(),
            digest: DigestAlgorithm::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_policy_round_trips_through_str() {
        for policy in [SignPolicy::OnSend, SignPolicy::Manual, SignPolicy::Never] {
            assert_eq!(SignPolicy::from_str(policy.as_str()).unwrap(), policy);
        }
        assert!(SignPolicy::from_str("sometimes").is_err());
    }

    #[test]
    fn default_config_expires_after_ten_minutes() {
        let config = SecurityConfig::default();
        assert_eq!(config.expiry_secs, Some(600));
        assert!(config.must_understand);
        assert!(config.actor.is_none());
        assert_eq!(config.sign_policy, SignPolicy::OnSend);
    }
}
