//! Pipeline configuration.
//!
//! A [`PipelineConfig`] is constructed once by the caller and passed to every
//! [`Pipeline`][crate::pipeline::Pipeline]. There is no process-wide default instance.

use bon::Builder;
use serde::Deserialize;

use crate::error::{RequestError, Result};

/// Annotation key binding a request to the secret that will hold its private key.
pub const DEFAULT_PRIVATE_KEY_ANNOTATION: &str = "cert-manager.io/private-key-secret-name";

/// Annotation key binding a request to the certificate it was derived from.
pub const DEFAULT_CERTIFICATE_NAME_ANNOTATION: &str = "cert-manager.io/certificate-name";

/// API version stamped on rendered issuance requests.
pub const DEFAULT_REQUEST_API_VERSION: &str = "cert-manager.io/v1";

/// Longest certificate name kept as the human-readable identifier prefix.
pub const DEFAULT_MAX_NAME_PREFIX_LEN: usize = 52;

/// Number of hex digits of the spec digest kept in the identifier.
pub const DEFAULT_NAME_HASH_LEN: usize = 10;

/// DNS label limit that identifiers must respect.
const MAX_IDENTIFIER_LEN: usize = 63;

/// Settings shared by every invocation of the pipeline.
///
/// # Example
/// ```
/// use certreq::config::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .certificate_name_annotation("example.com/certificate")
///     .build();
/// assert_eq!(config.name_hash_len, 10);
/// ```
#[derive(Clone, Debug, Builder, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct PipelineConfig {
    #[builder(into, default = DEFAULT_PRIVATE_KEY_ANNOTATION.to_string())]
    pub private_key_annotation: String,
    #[builder(into, default = DEFAULT_CERTIFICATE_NAME_ANNOTATION.to_string())]
    pub certificate_name_annotation: String,
    #[builder(into, default = DEFAULT_REQUEST_API_VERSION.to_string())]
    pub request_api_version: String,
    #[builder(default = DEFAULT_MAX_NAME_PREFIX_LEN)]
    pub max_name_prefix_len: usize,
    #[builder(default = DEFAULT_NAME_HASH_LEN)]
    pub name_hash_len: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl PipelineConfig {
    /// Reads a configuration from a JSON document. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| RequestError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that identifiers produced with this configuration fit a DNS label
    /// and that the injected annotation keys are usable.
    pub fn validate(&self) -> Result<()> {
        if self.private_key_annotation.is_empty() || self.certificate_name_annotation.is_empty() {
            return Err(RequestError::InvalidConfig(
                "annotation keys must not be empty".to_string(),
            ));
        }
        if self.private_key_annotation == self.certificate_name_annotation {
            return Err(RequestError::InvalidConfig(
                "annotation keys must be distinct".to_string(),
            ));
        }
        // SHA-256 yields 64 hex digits.
        if self.name_hash_len == 0 || self.name_hash_len > 64 {
            return Err(RequestError::InvalidConfig(format!(
                "name hash length {} is outside 1..=64",
                self.name_hash_len
            )));
        }
        if self.max_name_prefix_len + 1 + self.name_hash_len > MAX_IDENTIFIER_LEN {
            return Err(RequestError::InvalidConfig(format!(
                "identifiers of up to {} characters exceed the {MAX_IDENTIFIER_LEN} character limit",
                self.max_name_prefix_len + 1 + self.name_hash_len
            )));
        }
        Ok(())
    }
}
