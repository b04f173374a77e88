//! Deterministic, content-derived request names.
//!
//! The name is the certificate name followed by a short SHA-256 digest of the
//! issuance-relevant part of the spec. Administrative metadata (namespace, labels,
//! annotations) and renewal timing do not contribute, so re-running the pipeline
//! for the same certificate content always yields the same name.

use std::fmt;
use std::net::IpAddr;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::PipelineConfig;
use crate::error::{RequestError, Result};
use crate::spec::{
    CertificateSpec, IssuerRef, KeyUsage, PrivateKeySettings, X509Subject, duration,
};

/// Identifier of an issuance request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestName(String);

impl RequestName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RequestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RequestName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The hashed view of a spec. Field order is the serialization order.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalSpec<'a> {
    secret_name: &'a str,
    common_name: Option<&'a str>,
    dns_names: &'a [String],
    ip_addresses: &'a [IpAddr],
    uris: &'a [String],
    email_addresses: &'a [String],
    subject: &'a X509Subject,
    /// Go-style rendering, so sub-second parts count.
    duration: Option<String>,
    issuer_ref: &'a IssuerRef,
    #[serde(rename = "isCA")]
    is_ca: bool,
    usages: &'a [KeyUsage],
    private_key: &'a PrivateKeySettings,
}

impl<'a> From<&'a CertificateSpec> for CanonicalSpec<'a> {
    fn from(spec: &'a CertificateSpec) -> Self {
        Self {
            secret_name: &spec.secret_name,
            common_name: spec.common_name(),
            dns_names: &spec.dns_names,
            ip_addresses: &spec.ip_addresses,
            uris: &spec.uris,
            email_addresses: &spec.email_addresses,
            subject: &spec.subject,
            duration: spec.duration.map(duration::format),
            issuer_ref: &spec.issuer_ref,
            is_ca: spec.is_ca,
            usages: &spec.usages,
            private_key: &spec.private_key,
        }
    }
}

/// Computes the request name for a spec.
///
/// The result is `<name>-<digest>`, where `<name>` is cut to
/// [`PipelineConfig::max_name_prefix_len`] characters with any trailing `-` or `.`
/// removed, and `<digest>` is the first
/// [`PipelineConfig::name_hash_len`] lowercase hex digits of the canonical spec's
/// SHA-256 digest.
///
/// # Errors
/// [`RequestError::HashingFailure`] when the spec cannot be canonicalized.
pub fn compute_request_name(spec: &CertificateSpec, config: &PipelineConfig) -> Result<RequestName> {
    let canonical = serde_json::to_vec(&CanonicalSpec::from(spec))
        .map_err(|e| RequestError::HashingFailure(e.to_string()))?;
    let digest = hex::encode(Sha256::digest(&canonical));
    let digest = digest.get(..config.name_hash_len).ok_or_else(|| {
        RequestError::HashingFailure(format!(
            "digest has {} hex digits, {} requested",
            digest.len(),
            config.name_hash_len
        ))
    })?;

    let prefix: String = spec.name.chars().take(config.max_name_prefix_len).collect();
    let prefix = prefix.trim_end_matches(['-', '.']);
    Ok(RequestName(format!("{prefix}-{digest}")))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn spec() -> CertificateSpec {
        CertificateSpec::builder()
            .name("web")
            .namespace("default")
            .secret_name("web-tls")
            .common_name("example.com")
            .duration(time::Duration::days(90))
            .issuer_ref(IssuerRef {
                name: "ca-issuer".to_string(),
                ..Default::default()
            })
            .usages(vec![KeyUsage::ServerAuth])
            .build()
    }

    #[test]
    fn name_is_stable_across_calls() {
        let config = PipelineConfig::default();
        let first = compute_request_name(&spec(), &config).unwrap();
        let second = compute_request_name(&spec().clone(), &config).unwrap();
        assert_eq!(first, second);
        assert!(first.as_str().starts_with("web-"));
        assert_eq!(first.as_str().len(), "web-".len() + 10);
        assert!(first.as_str()["web-".len()..]
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[rstest]
    #[case::labels(|s: &mut CertificateSpec| { s.labels.insert("team".into(), "edge".into()); })]
    #[case::annotations(|s: &mut CertificateSpec| { s.annotations.insert("note".into(), "x".into()); })]
    #[case::namespace(|s: &mut CertificateSpec| s.namespace = Some("other".into()))]
    #[case::renew_before(|s: &mut CertificateSpec| s.renew_before = Some(time::Duration::days(30)))]
    fn administrative_fields_do_not_change_the_name(#[case] change: fn(&mut CertificateSpec)) {
        let config = PipelineConfig::default();
        let mut changed = spec();
        change(&mut changed);
        assert_eq!(
            compute_request_name(&spec(), &config).unwrap(),
            compute_request_name(&changed, &config).unwrap()
        );
    }

    #[rstest]
    #[case::common_name(|s: &mut CertificateSpec| s.common_name = Some("other.example.com".into()))]
    #[case::dns_names(|s: &mut CertificateSpec| s.dns_names.push("www.example.com".into()))]
    #[case::usages(|s: &mut CertificateSpec| s.usages.push(KeyUsage::ClientAuth))]
    #[case::is_ca(|s: &mut CertificateSpec| s.is_ca = true)]
    #[case::key_size(|s: &mut CertificateSpec| s.private_key.size = Some(4096))]
    #[case::duration(|s: &mut CertificateSpec| s.duration = Some(time::Duration::days(30)))]
    #[case::issuer(|s: &mut CertificateSpec| s.issuer_ref.kind = Some("ClusterIssuer".into()))]
    fn issuance_fields_change_the_name(#[case] change: fn(&mut CertificateSpec)) {
        let config = PipelineConfig::default();
        let mut changed = spec();
        change(&mut changed);
        assert_ne!(
            compute_request_name(&spec(), &config).unwrap(),
            compute_request_name(&changed, &config).unwrap()
        );
    }

    #[test]
    fn long_names_are_truncated() {
        let config = PipelineConfig::default();
        let mut spec = spec();
        spec.name = "a".repeat(80);
        let name = compute_request_name(&spec, &config).unwrap();
        assert_eq!(name.as_str().len(), 52 + 1 + 10);
        assert!(name.as_str().starts_with(&"a".repeat(52)));
    }

    #[test]
    fn sub_second_durations_change_the_name() {
        let config = PipelineConfig::default();
        let mut whole = spec();
        whole.duration = Some(time::Duration::seconds(1));
        let mut fractional = spec();
        fractional.duration = Some(time::Duration::milliseconds(1500));
        assert_ne!(
            compute_request_name(&whole, &config).unwrap(),
            compute_request_name(&fractional, &config).unwrap()
        );
    }

    #[rstest]
    #[case::hyphen(format!("{}-tls", "a".repeat(51)))]
    #[case::dot(format!("{}.example.com", "a".repeat(51)))]
    #[case::repeated(format!("{}--..x", "a".repeat(49)))]
    fn truncation_does_not_leave_a_trailing_separator(#[case] name: String) {
        let config = PipelineConfig::default();
        let mut spec = spec();
        spec.name = name;
        let request_name = compute_request_name(&spec, &config).unwrap();
        let (prefix, digest) = request_name.as_str().rsplit_once('-').unwrap();
        assert!(!prefix.ends_with(['-', '.']), "{request_name}");
        assert_eq!(digest.len(), 10);
        assert!(prefix.starts_with(&"a".repeat(49)));
    }

    #[test]
    fn hash_length_follows_config() {
        let config = PipelineConfig::builder().name_hash_len(16).build();
        let name = compute_request_name(&spec(), &config).unwrap();
        assert_eq!(name.as_str().len(), "web-".len() + 16);
    }
}
