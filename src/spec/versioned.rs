//! Version-tagged certificate documents.
//!
//! Each supported API version has its own document shape and an explicit
//! conversion into [`CertificateSpec`]. The `apiVersion` field selects the variant.

use std::collections::BTreeMap;
use std::net::IpAddr;

use serde::Deserialize;

use super::{CertificateSpec, IssuerRef, KeyAlgorithm, KeyEncoding, KeyUsage, PrivateKeySettings, X509Subject};
use crate::error::{RequestError, Result};

const CERTIFICATE_KIND: &str = "Certificate";

/// A certificate document in any supported API version.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "apiVersion")]
pub enum CertificateDocument {
    #[serde(rename = "cert-manager.io/v1alpha2")]
    V1Alpha2(v1alpha2::Certificate),
    #[serde(rename = "cert-manager.io/v1")]
    V1(v1::Certificate),
}

impl CertificateDocument {
    /// Parses a single JSON certificate document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| RequestError::InvalidSpec(e.to_string()))
    }

    /// Converts the document into the version-independent spec.
    pub fn into_spec(self) -> Result<CertificateSpec> {
        let spec = match self {
            CertificateDocument::V1Alpha2(doc) => doc.into_spec()?,
            CertificateDocument::V1(doc) => doc.into_spec()?,
        };
        spec.validate()?;
        Ok(spec)
    }
}

/// Object metadata shared by all versions.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

fn check_kind(kind: &str) -> Result<()> {
    if kind != CERTIFICATE_KIND {
        return Err(RequestError::InvalidSpec(format!(
            "expected a {CERTIFICATE_KIND} document, got {kind:?}"
        )));
    }
    Ok(())
}

fn parse_ip_addresses(addresses: &[String]) -> Result<Vec<IpAddr>> {
    addresses
        .iter()
        .map(|ip| {
            ip.parse()
                .map_err(|_| RequestError::InvalidSpec(format!("invalid IP address {ip:?}")))
        })
        .collect()
}

pub mod v1alpha2 {
    //! Flat key settings (`keyAlgorithm`, `keySize`, `keyEncoding`) and the
    //! deprecated top-level `organization` list.

    use super::*;

    #[derive(Debug, Clone, Deserialize)]
    pub struct Certificate {
        pub kind: String,
        #[serde(default)]
        pub metadata: ObjectMeta,
        pub spec: Spec,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Spec {
        pub secret_name: String,
        #[serde(default)]
        pub common_name: Option<String>,
        #[serde(default)]
        pub dns_names: Vec<String>,
        #[serde(default)]
        pub ip_addresses: Vec<String>,
        #[serde(default, rename = "uriSANs")]
        pub uri_sans: Vec<String>,
        #[serde(default, rename = "emailSANs")]
        pub email_sans: Vec<String>,
        #[serde(default)]
        pub organization: Vec<String>,
        #[serde(default)]
        pub subject: Option<X509Subject>,
        #[serde(default, with = "crate::spec::duration::option")]
        pub duration: Option<time::Duration>,
        #[serde(default, with = "crate::spec::duration::option")]
        pub renew_before: Option<time::Duration>,
        pub issuer_ref: IssuerRef,
        #[serde(default, rename = "isCA")]
        pub is_ca: bool,
        #[serde(default)]
        pub usages: Vec<KeyUsage>,
        #[serde(default)]
        pub key_size: Option<u32>,
        #[serde(default)]
        pub key_algorithm: Option<KeyAlgorithm>,
        #[serde(default)]
        pub key_encoding: Option<KeyEncoding>,
    }

    impl Certificate {
        pub fn into_spec(self) -> Result<CertificateSpec> {
            check_kind(&self.kind)?;
            let spec = self.spec;

            let mut subject = spec.subject.unwrap_or_default();
            for org in spec.organization {
                if !subject.organizations.contains(&org) {
                    subject.organizations.push(org);
                }
            }

            Ok(CertificateSpec {
                name: self.metadata.name,
                namespace: self.metadata.namespace,
                labels: self.metadata.labels,
                annotations: self.metadata.annotations,
                secret_name: spec.secret_name,
                common_name: spec.common_name,
                dns_names: spec.dns_names,
                ip_addresses: parse_ip_addresses(&spec.ip_addresses)?,
                uris: spec.uri_sans,
                email_addresses: spec.email_sans,
                subject,
                duration: spec.duration,
                renew_before: spec.renew_before,
                issuer_ref: spec.issuer_ref,
                is_ca: spec.is_ca,
                usages: spec.usages,
                private_key: PrivateKeySettings {
                    algorithm: spec.key_algorithm.unwrap_or_default(),
                    size: spec.key_size,
                    encoding: spec.key_encoding.unwrap_or_default(),
                },
            })
        }
    }
}

pub mod v1 {
    //! Key settings nested under `privateKey`; SANs named `uris` and `emailAddresses`.

    use super::*;

    #[derive(Debug, Clone, Deserialize)]
    pub struct Certificate {
        pub kind: String,
        #[serde(default)]
        pub metadata: ObjectMeta,
        pub spec: Spec,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Spec {
        pub secret_name: String,
        #[serde(default)]
        pub common_name: Option<String>,
        #[serde(default)]
        pub dns_names: Vec<String>,
        #[serde(default)]
        pub ip_addresses: Vec<String>,
        #[serde(default)]
        pub uris: Vec<String>,
        #[serde(default)]
        pub email_addresses: Vec<String>,
        #[serde(default)]
        pub subject: Option<X509Subject>,
        #[serde(default, with = "crate::spec::duration::option")]
        pub duration: Option<time::Duration>,
        #[serde(default, with = "crate::spec::duration::option")]
        pub renew_before: Option<time::Duration>,
        pub issuer_ref: IssuerRef,
        #[serde(default, rename = "isCA")]
        pub is_ca: bool,
        #[serde(default)]
        pub usages: Vec<KeyUsage>,
        #[serde(default)]
        pub private_key: Option<PrivateKeySettings>,
    }

    impl Certificate {
        pub fn into_spec(self) -> Result<CertificateSpec> {
            check_kind(&self.kind)?;
            let spec = self.spec;

            Ok(CertificateSpec {
                name: self.metadata.name,
                namespace: self.metadata.namespace,
                labels: self.metadata.labels,
                annotations: self.metadata.annotations,
                secret_name: spec.secret_name,
                common_name: spec.common_name,
                dns_names: spec.dns_names,
                ip_addresses: parse_ip_addresses(&spec.ip_addresses)?,
                uris: spec.uris,
                email_addresses: spec.email_addresses,
                subject: spec.subject.unwrap_or_default(),
                duration: spec.duration,
                renew_before: spec.renew_before,
                issuer_ref: spec.issuer_ref,
                is_ca: spec.is_ca,
                usages: spec.usages,
                private_key: spec.private_key.unwrap_or_default(),
            })
        }
    }
}
