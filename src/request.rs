//! The issuance-request record handed to the submission side.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use crate::cert::CertificateRequest;
use crate::config::PipelineConfig;
use crate::error::{RequestError, Result};
use crate::name::RequestName;
use crate::spec::{CertificateSpec, IssuerRef, KeyUsage};

/// Kind stamped on rendered records.
pub const REQUEST_KIND: &str = "CertificateRequest";

/// A request for an issuing authority to sign a CSR.
///
/// Serializes to a `CertificateRequest` document; see [`IssuanceRequest::to_json`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuanceRequest {
    /// Content-derived name of this request. Not part of the rendered document.
    #[serde(skip)]
    pub identifier: RequestName,
    pub api_version: String,
    pub kind: String,
    pub metadata: RequestMetadata,
    pub spec: RequestSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMetadata {
    /// Prefix for a server-generated name: the certificate name plus `-`.
    pub generate_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSpec {
    /// PEM-encoded CSR. Rendered as base64 of the PEM bytes.
    #[serde(serialize_with = "serialize_base64")]
    pub request: Vec<u8>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "crate::spec::duration::option"
    )]
    pub duration: Option<time::Duration>,
    pub issuer_ref: IssuerRef,
    #[serde(rename = "isCA")]
    pub is_ca: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub usages: Vec<KeyUsage>,
}

fn serialize_base64<S: Serializer>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    use base64::Engine;
    serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
}

/// Merges the computed name, the signed CSR and the spec's metadata into a record.
///
/// Annotation keys injected from `config` replace same-named spec annotations.
/// Duration, issuer reference, CA flag and usages are copied as written in the spec.
pub fn assemble(
    spec: &CertificateSpec,
    identifier: RequestName,
    csr_pem: &str,
    config: &PipelineConfig,
) -> IssuanceRequest {
    let mut annotations = spec.annotations.clone();
    annotations.insert(
        config.private_key_annotation.clone(),
        spec.secret_name.clone(),
    );
    annotations.insert(config.certificate_name_annotation.clone(), spec.name.clone());

    IssuanceRequest {
        identifier,
        api_version: config.request_api_version.clone(),
        kind: REQUEST_KIND.to_string(),
        metadata: RequestMetadata {
            generate_name: format!("{}-", spec.name),
            namespace: spec.namespace.clone(),
            labels: spec.labels.clone(),
            annotations,
        },
        spec: RequestSpec {
            request: csr_pem.as_bytes().to_vec(),
            duration: spec.duration,
            issuer_ref: spec.issuer_ref.clone(),
            is_ca: spec.is_ca,
            usages: spec.usages.clone(),
        },
    }
}

impl IssuanceRequest {
    /// Renders the record as a JSON document.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| RequestError::EncodingError(e.to_string()))
    }

    /// The CSR PEM carried by this record.
    pub fn csr_pem(&self) -> Result<&str> {
        std::str::from_utf8(&self.spec.request)
            .map_err(|e| RequestError::EncodingError(e.to_string()))
    }

    /// Parses the carried CSR.
    pub fn certificate_request(&self) -> Result<CertificateRequest> {
        CertificateRequest::from_pem(self.csr_pem()?)
    }
}
