//! The declarative certificate spec consumed by the pipeline.
//!
//! A [`CertificateSpec`] is produced by the spec source (usually through
//! [`versioned::CertificateDocument`]) and is never mutated by the pipeline.

pub mod duration;
pub mod versioned;

use std::collections::BTreeMap;
use std::net::IpAddr;

use bon::Builder;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::{RequestError, Result};

/// Key algorithm requested by a certificate spec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum KeyAlgorithm {
    #[default]
    #[serde(rename = "RSA", alias = "rsa")]
    #[strum(serialize = "RSA")]
    Rsa,
    #[serde(rename = "ECDSA", alias = "ecdsa")]
    #[strum(serialize = "ECDSA")]
    Ecdsa,
    #[serde(rename = "Ed25519", alias = "ed25519")]
    #[strum(serialize = "Ed25519")]
    Ed25519,
}

/// Textual wire format of an encoded private key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum KeyEncoding {
    /// PKCS#1 for RSA keys, SEC1 for elliptic-curve keys.
    #[default]
    #[serde(rename = "PKCS1", alias = "pkcs1")]
    #[strum(serialize = "PKCS1")]
    Pkcs1,
    #[serde(rename = "PKCS8", alias = "pkcs8")]
    #[strum(serialize = "PKCS8")]
    Pkcs8,
}

/// Private key settings of a certificate spec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrivateKeySettings {
    pub algorithm: KeyAlgorithm,
    /// RSA bit length or ECDSA curve size. `None` selects the algorithm default.
    pub size: Option<u32>,
    pub encoding: KeyEncoding,
}

/// A requested key usage, named the way certificate documents spell it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum KeyUsage {
    #[serde(rename = "signing")]
    #[strum(serialize = "signing")]
    Signing,
    #[serde(rename = "digital signature")]
    #[strum(serialize = "digital signature")]
    DigitalSignature,
    #[serde(rename = "content commitment")]
    #[strum(serialize = "content commitment")]
    ContentCommitment,
    #[serde(rename = "key encipherment")]
    #[strum(serialize = "key encipherment")]
    KeyEncipherment,
    #[serde(rename = "key agreement")]
    #[strum(serialize = "key agreement")]
    KeyAgreement,
    #[serde(rename = "data encipherment")]
    #[strum(serialize = "data encipherment")]
    DataEncipherment,
    #[serde(rename = "cert sign")]
    #[strum(serialize = "cert sign")]
    CertSign,
    #[serde(rename = "crl sign")]
    #[strum(serialize = "crl sign")]
    CrlSign,
    #[serde(rename = "encipher only")]
    #[strum(serialize = "encipher only")]
    EncipherOnly,
    #[serde(rename = "decipher only")]
    #[strum(serialize = "decipher only")]
    DecipherOnly,
    #[serde(rename = "any")]
    #[strum(serialize = "any")]
    Any,
    #[serde(rename = "server auth")]
    #[strum(serialize = "server auth")]
    ServerAuth,
    #[serde(rename = "client auth")]
    #[strum(serialize = "client auth")]
    ClientAuth,
    #[serde(rename = "code signing")]
    #[strum(serialize = "code signing")]
    CodeSigning,
    #[serde(rename = "email protection")]
    #[strum(serialize = "email protection")]
    EmailProtection,
    #[serde(rename = "s/mime")]
    #[strum(serialize = "s/mime")]
    Smime,
    #[serde(rename = "ipsec end system")]
    #[strum(serialize = "ipsec end system")]
    IpsecEndSystem,
    #[serde(rename = "ipsec tunnel")]
    #[strum(serialize = "ipsec tunnel")]
    IpsecTunnel,
    #[serde(rename = "ipsec user")]
    #[strum(serialize = "ipsec user")]
    IpsecUser,
    #[serde(rename = "timestamping")]
    #[strum(serialize = "timestamping")]
    Timestamping,
    #[serde(rename = "ocsp signing")]
    #[strum(serialize = "ocsp signing")]
    OcspSigning,
    #[serde(rename = "microsoft sgc")]
    #[strum(serialize = "microsoft sgc")]
    MicrosoftSgc,
    #[serde(rename = "netscape sgc")]
    #[strum(serialize = "netscape sgc")]
    NetscapeSgc,
}

/// Usages applied to the CSR when a spec requests none.
pub const DEFAULT_USAGES: [KeyUsage; 2] = [KeyUsage::DigitalSignature, KeyUsage::KeyEncipherment];

/// Reference to the issuing authority that should handle the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// Subject attributes beyond the common name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct X509Subject {
    pub organizations: Vec<String>,
    pub countries: Vec<String>,
    pub organizational_units: Vec<String>,
    pub localities: Vec<String>,
    pub provinces: Vec<String>,
    pub street_addresses: Vec<String>,
    pub postal_codes: Vec<String>,
    pub serial_number: Option<String>,
}

/// A desired certificate, already resolved by the spec source.
///
/// # Example
/// ```
/// use certreq::spec::{CertificateSpec, IssuerRef, KeyUsage};
///
/// let spec = CertificateSpec::builder()
///     .name("web")
///     .secret_name("web-tls")
///     .common_name("example.com")
///     .issuer_ref(IssuerRef { name: "ca-issuer".to_string(), ..Default::default() })
///     .usages(vec![KeyUsage::ServerAuth])
///     .build();
/// assert!(spec.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct CertificateSpec {
    #[builder(into)]
    pub name: String,
    #[builder(into)]
    pub namespace: Option<String>,
    #[builder(default)]
    pub labels: BTreeMap<String, String>,
    #[builder(default)]
    pub annotations: BTreeMap<String, String>,
    #[builder(into)]
    pub secret_name: String,
    #[builder(into)]
    pub common_name: Option<String>,
    #[builder(default)]
    pub dns_names: Vec<String>,
    #[builder(default)]
    pub ip_addresses: Vec<IpAddr>,
    #[builder(default)]
    pub uris: Vec<String>,
    #[builder(default)]
    pub email_addresses: Vec<String>,
    #[builder(default)]
    pub subject: X509Subject,
    pub duration: Option<time::Duration>,
    pub renew_before: Option<time::Duration>,
    pub issuer_ref: IssuerRef,
    #[builder(default)]
    pub is_ca: bool,
    #[builder(default)]
    pub usages: Vec<KeyUsage>,
    #[builder(default)]
    pub private_key: PrivateKeySettings,
}

impl CertificateSpec {
    /// Checks the fields every pipeline stage relies on.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(RequestError::InvalidSpec("name must not be empty".to_string()));
        }
        if self.secret_name.trim().is_empty() {
            return Err(RequestError::InvalidSpec(
                "secretName must not be empty".to_string(),
            ));
        }
        if self.issuer_ref.name.trim().is_empty() {
            return Err(RequestError::InvalidSpec(
                "issuerRef.name must not be empty".to_string(),
            ));
        }
        if self.duration.is_some_and(|d| !d.is_positive()) {
            return Err(RequestError::InvalidSpec(
                "duration must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// The common name, treating an empty string as absent.
    pub fn common_name(&self) -> Option<&str> {
        self.common_name.as_deref().filter(|cn| !cn.is_empty())
    }

    /// Whether the spec names at least one identity for the subject.
    pub fn has_identity(&self) -> bool {
        self.common_name().is_some()
            || !self.dns_names.is_empty()
            || !self.uris.is_empty()
            || !self.email_addresses.is_empty()
    }

    /// The usages to request in the CSR, falling back to [`DEFAULT_USAGES`].
    pub fn effective_usages(&self) -> Vec<KeyUsage> {
        if self.usages.is_empty() {
            DEFAULT_USAGES.to_vec()
        } else {
            self.usages.clone()
        }
    }
}
