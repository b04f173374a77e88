pub mod extensions;
pub mod params;

use der::asn1::{Any, BitString, OctetString, SetOfVec};
use der::{Decode, Encode};
use log::debug;
use params::{CertificationRequestInfo, DistinguishedName, ExtensionParam};
use strum::Display;
use x509_cert::attr::Attribute;
use x509_cert::ext::Extension;
use x509_cert::request::{CertReq, CertReqInfo, Version};
use x509_cert::spki::AlgorithmIdentifierOwned;

use crate::error::{RequestError, Result};
use crate::key::{KeyKind, KeyPair, verify_signature};
use crate::pem_utils::{self, CSR_PEM_LABEL};
use crate::spec::PrivateKeySettings;

/// Represents the supported signature algorithms for certification requests.
///
/// This enum provides a mapping to the corresponding OIDs for each algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SignatureAlgorithm {
    /// SHA-256 with RSA encryption.
    #[strum(serialize = "sha256WithRSAEncryption")]
    Sha256WithRSA,
    /// SHA-384 with RSA encryption.
    #[strum(serialize = "sha384WithRSAEncryption")]
    Sha384WithRSA,
    /// SHA-512 with RSA encryption.
    #[strum(serialize = "sha512WithRSAEncryption")]
    Sha512WithRSA,
    /// SHA-256 with ECDSA.
    #[strum(serialize = "ecdsa-with-SHA256")]
    Sha256WithECDSA,
    /// SHA-384 with ECDSA.
    #[strum(serialize = "ecdsa-with-SHA384")]
    Sha384WithECDSA,
    /// SHA-512 with ECDSA.
    #[strum(serialize = "ecdsa-with-SHA512")]
    Sha512WithECDSA,
    /// Pure EdDSA over edwards25519.
    #[strum(serialize = "Ed25519")]
    Ed25519,
}

impl SignatureAlgorithm {
    /// The algorithm used to sign with a key of the given kind.
    ///
    /// RSA keys pick the digest by modulus size: SHA-512 from 4096 bits,
    /// SHA-384 from 3072 bits, SHA-256 below.
    pub fn for_key_kind(kind: KeyKind) -> Self {
        match kind {
            KeyKind::Rsa(bits) if bits >= 4096 => SignatureAlgorithm::Sha512WithRSA,
            KeyKind::Rsa(bits) if bits >= 3072 => SignatureAlgorithm::Sha384WithRSA,
            KeyKind::Rsa(_) => SignatureAlgorithm::Sha256WithRSA,
            KeyKind::EcdsaP256 => SignatureAlgorithm::Sha256WithECDSA,
            KeyKind::EcdsaP384 => SignatureAlgorithm::Sha384WithECDSA,
            KeyKind::EcdsaP521 => SignatureAlgorithm::Sha512WithECDSA,
            KeyKind::Ed25519 => SignatureAlgorithm::Ed25519,
        }
    }

    /// The algorithm for the key a spec asks for.
    ///
    /// # Errors
    /// [`RequestError::UnsupportedAlgorithm`] when the settings name no supported key.
    pub fn for_key_settings(settings: &PrivateKeySettings) -> Result<Self> {
        KeyKind::from_settings(settings).map(Self::for_key_kind)
    }

    /// Looks up an algorithm by its signature algorithm OID.
    pub fn from_oid(oid: &const_oid::ObjectIdentifier) -> Option<Self> {
        match *oid {
            const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION => {
                Some(SignatureAlgorithm::Sha256WithRSA)
            }
            const_oid::db::rfc5912::SHA_384_WITH_RSA_ENCRYPTION => {
                Some(SignatureAlgorithm::Sha384WithRSA)
            }
            const_oid::db::rfc5912::SHA_512_WITH_RSA_ENCRYPTION => {
                Some(SignatureAlgorithm::Sha512WithRSA)
            }
            const_oid::db::rfc5912::ECDSA_WITH_SHA_256 => Some(SignatureAlgorithm::Sha256WithECDSA),
            const_oid::db::rfc5912::ECDSA_WITH_SHA_384 => Some(SignatureAlgorithm::Sha384WithECDSA),
            const_oid::db::rfc5912::ECDSA_WITH_SHA_512 => Some(SignatureAlgorithm::Sha512WithECDSA),
            const_oid::db::rfc8410::ID_ED_25519 => Some(SignatureAlgorithm::Ed25519),
            _ => None,
        }
    }
}

impl From<SignatureAlgorithm> for AlgorithmIdentifierOwned {
    /// Converts a `SignatureAlgorithm` into an `AlgorithmIdentifierOwned`.
    ///
    /// RSA identifiers carry an explicit NULL parameter; ECDSA and EdDSA carry none.
    fn from(value: SignatureAlgorithm) -> Self {
        let (oid, parameters) = match value {
            SignatureAlgorithm::Sha256WithRSA => (
                const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
                Some(Any::null()),
            ),
            SignatureAlgorithm::Sha384WithRSA => (
                const_oid::db::rfc5912::SHA_384_WITH_RSA_ENCRYPTION,
                Some(Any::null()),
            ),
            SignatureAlgorithm::Sha512WithRSA => (
                const_oid::db::rfc5912::SHA_512_WITH_RSA_ENCRYPTION,
                Some(Any::null()),
            ),
            SignatureAlgorithm::Sha256WithECDSA => (const_oid::db::rfc5912::ECDSA_WITH_SHA_256, None),
            SignatureAlgorithm::Sha384WithECDSA => (const_oid::db::rfc5912::ECDSA_WITH_SHA_384, None),
            SignatureAlgorithm::Sha512WithECDSA => (const_oid::db::rfc5912::ECDSA_WITH_SHA_512, None),
            SignatureAlgorithm::Ed25519 => (const_oid::db::rfc8410::ID_ED_25519, None),
        };
        AlgorithmIdentifierOwned { oid, parameters }
    }
}

impl CertificationRequestInfo {
    /// Signs the request with `key`, embedding the key's public half.
    ///
    /// # Errors
    /// * [`RequestError::IncompatibleKeyAlgorithm`] when the key's type or size class
    ///   does not produce [`CertificationRequestInfo::signature_algorithm`].
    /// * [`RequestError::EncodingError`] when the request cannot be DER-encoded.
    pub fn sign(&self, key: &KeyPair) -> Result<CertificateRequest> {
        let key_algorithm = SignatureAlgorithm::for_key_kind(key.kind());
        if key_algorithm != self.signature_algorithm {
            return Err(RequestError::IncompatibleKeyAlgorithm(format!(
                "request wants {} but a {} key signs with {key_algorithm}",
                self.signature_algorithm,
                key.kind()
            )));
        }

        let info = CertReqInfo {
            version: Version::V1,
            subject: self.subject.as_x509_name()?,
            public_key: key.public_key_info()?,
            attributes: self.attributes()?,
        };
        let tbs = info.to_der()?;
        let signature = key.sign_data(self.signature_algorithm, &tbs)?;
        debug!(
            "signed certification request with {} ({} bytes)",
            self.signature_algorithm,
            signature.len()
        );

        Ok(CertificateRequest {
            inner: CertReq {
                info,
                algorithm: self.signature_algorithm.into(),
                signature: BitString::from_bytes(&signature)?,
            },
        })
    }

    /// The extensions wrapped in a single PKCS#9 `extensionRequest` attribute,
    /// or no attributes at all when there are no extensions.
    fn attributes(&self) -> Result<SetOfVec<Attribute>> {
        if self.extensions.is_empty() {
            return Ok(SetOfVec::new());
        }
        let extensions = self
            .extensions
            .iter()
            .map(|ext| -> Result<Extension> {
                Ok(Extension {
                    extn_id: ext.oid,
                    critical: ext.critical,
                    extn_value: OctetString::new(ext.value.clone())?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let attribute = Attribute {
            oid: const_oid::db::rfc5912::ID_EXTENSION_REQ,
            values: SetOfVec::try_from(vec![Any::encode_from(&extensions)?])?,
        };
        Ok(SetOfVec::try_from(vec![attribute])?)
    }
}

/// A signed PKCS#10 certification request.
///
/// This struct provides methods to encode the request into DER or PEM formats
/// and to inspect what it asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRequest {
    /// The inner representation of the request.
    pub inner: CertReq,
}

impl CertificateRequest {
    /// Encodes the request into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.inner.to_der()?)
    }

    /// Encodes the request into a `CERTIFICATE REQUEST` PEM block.
    pub fn to_pem(&self) -> Result<String> {
        Ok(pem_utils::der_to_pem(&self.to_der()?, CSR_PEM_LABEL))
    }

    /// Decodes a DER-encoded request.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        Ok(Self {
            inner: CertReq::from_der(der)?,
        })
    }

    /// Decodes a `CERTIFICATE REQUEST` PEM block.
    ///
    /// # Errors
    /// [`RequestError::EncodingError`] for any other label or invalid contents.
    pub fn from_pem(pem: &str) -> Result<Self> {
        Self::from_der(&pem_utils::pem_to_der(pem, CSR_PEM_LABEL)?)
    }

    /// The algorithm the request was signed with, if supported.
    pub fn signature_algorithm(&self) -> Option<SignatureAlgorithm> {
        SignatureAlgorithm::from_oid(&self.inner.algorithm.oid)
    }

    pub fn subject(&self) -> Result<DistinguishedName> {
        DistinguishedName::from_x509_name(&self.inner.info.subject)
    }

    /// The subject common name, if the request has one.
    pub fn common_name(&self) -> Result<Option<String>> {
        Ok(self.subject()?.common_name)
    }

    /// Extensions requested through the `extensionRequest` attribute.
    pub fn extensions(&self) -> Result<Vec<ExtensionParam>> {
        let mut params = Vec::new();
        for attribute in self.inner.info.attributes.iter() {
            if attribute.oid != const_oid::db::rfc5912::ID_EXTENSION_REQ {
                continue;
            }
            for value in attribute.values.iter() {
                let extensions = Vec::<Extension>::from_der(&value.to_der()?)?;
                params.extend(extensions.into_iter().map(|ext| ExtensionParam {
                    oid: ext.extn_id,
                    critical: ext.critical,
                    value: ext.extn_value.as_bytes().to_vec(),
                }));
            }
        }
        Ok(params)
    }

    /// DER-encoded SubjectPublicKeyInfo embedded in the request.
    pub fn public_key_der(&self) -> Result<Vec<u8>> {
        Ok(self.inner.info.public_key.to_der()?)
    }

    /// Checks the signature against the embedded public key.
    ///
    /// # Errors
    /// [`RequestError::IncompatibleKeyAlgorithm`] when the algorithm is unknown or
    /// the signature does not verify.
    pub fn verify(&self) -> Result<()> {
        let algorithm = self.signature_algorithm().ok_or_else(|| {
            RequestError::IncompatibleKeyAlgorithm(format!(
                "unsupported signature algorithm {}",
                self.inner.algorithm.oid
            ))
        })?;
        let signature = self.inner.signature.as_bytes().ok_or_else(|| {
            RequestError::EncodingError("signature has unused bits".to_string())
        })?;
        verify_signature(
            &self.inner.info.public_key,
            algorithm,
            &self.inner.info.to_der()?,
            signature,
        )
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::extensions::{KeyUsage, KeyUsages, SubjectAltName, ToAndFromX509Extension};
    use super::*;
    use crate::spec::{CertificateSpec, IssuerRef, KeyAlgorithm, KeyEncoding};

    fn spec(algorithm: KeyAlgorithm, size: Option<u32>) -> CertificateSpec {
        CertificateSpec::builder()
            .name("web")
            .secret_name("web-tls")
            .common_name("example.com")
            .dns_names(vec!["example.com".to_string()])
            .issuer_ref(IssuerRef {
                name: "ca-issuer".to_string(),
                ..Default::default()
            })
            .private_key(PrivateKeySettings {
                algorithm,
                size,
                encoding: KeyEncoding::Pkcs1,
            })
            .build()
    }

    fn signed(spec: &CertificateSpec, seed: u64) -> (KeyPair, CertificateRequest) {
        let mut rng = StdRng::seed_from_u64(seed);
        let key = KeyPair::generate(&spec.private_key, &mut rng).unwrap();
        let info = CertificationRequestInfo::from_spec(spec).unwrap();
        let csr = info.sign(&key).unwrap();
        (key, csr)
    }

    #[test]
    fn rsa_digest_follows_key_size() {
        assert_eq!(
            SignatureAlgorithm::for_key_kind(KeyKind::Rsa(2048)),
            SignatureAlgorithm::Sha256WithRSA
        );
        assert_eq!(
            SignatureAlgorithm::for_key_kind(KeyKind::Rsa(3072)),
            SignatureAlgorithm::Sha384WithRSA
        );
        assert_eq!(
            SignatureAlgorithm::for_key_kind(KeyKind::Rsa(8192)),
            SignatureAlgorithm::Sha512WithRSA
        );
    }

    #[test]
    fn algorithm_identifiers_round_trip_through_oids() {
        for algorithm in [
            SignatureAlgorithm::Sha256WithRSA,
            SignatureAlgorithm::Sha384WithRSA,
            SignatureAlgorithm::Sha512WithRSA,
            SignatureAlgorithm::Sha256WithECDSA,
            SignatureAlgorithm::Sha384WithECDSA,
            SignatureAlgorithm::Sha512WithECDSA,
            SignatureAlgorithm::Ed25519,
        ] {
            let id: AlgorithmIdentifierOwned = algorithm.into();
            assert_eq!(SignatureAlgorithm::from_oid(&id.oid), Some(algorithm));
        }
    }

    #[test]
    fn signed_requests_verify_and_embed_the_signing_key() {
        for (algorithm, size) in [
            (KeyAlgorithm::Ecdsa, None),
            (KeyAlgorithm::Ecdsa, Some(384)),
            (KeyAlgorithm::Ecdsa, Some(521)),
            (KeyAlgorithm::Ed25519, None),
        ] {
            let spec = spec(algorithm, size);
            let (key, csr) = signed(&spec, 21);
            csr.verify().unwrap();
            assert_eq!(csr.public_key_der().unwrap(), key.public_key_der().unwrap());
            assert_eq!(
                csr.signature_algorithm(),
                Some(SignatureAlgorithm::for_key_kind(key.kind()))
            );
        }
    }

    #[test]
    fn pem_round_trip_keeps_der() {
        let spec = spec(KeyAlgorithm::Ecdsa, None);
        let (_, csr) = signed(&spec, 4);
        let pem = csr.to_pem().unwrap();
        assert!(pem.starts_with("-----BEGIN CERTIFICATE REQUEST-----\n"));
        assert!(pem.ends_with("-----END CERTIFICATE REQUEST-----\n"));

        let parsed = CertificateRequest::from_pem(&pem).unwrap();
        assert_eq!(parsed.to_der().unwrap(), csr.to_der().unwrap());
        assert_eq!(parsed.common_name().unwrap().as_deref(), Some("example.com"));
    }

    #[test]
    fn requested_extensions_are_readable() {
        let spec = spec(KeyAlgorithm::Ed25519, None);
        let (_, csr) = signed(&spec, 8);
        let extensions = csr.extensions().unwrap();

        let san = extensions
            .iter()
            .find(|ext| ext.oid == SubjectAltName::OID)
            .unwrap();
        assert!(!san.critical);
        let san: SubjectAltName = san.to_extension().unwrap();
        assert_eq!(san.dns_names, vec!["example.com".to_string()]);

        let usage = extensions
            .iter()
            .find(|ext| ext.oid == KeyUsage::OID)
            .unwrap();
        assert!(usage.critical);
        let usage: KeyUsage = usage.to_extension().unwrap();
        assert!(usage.0.contains(KeyUsages::DigitalSignature));
    }

    #[test]
    fn tampered_request_fails_verification() {
        let spec = spec(KeyAlgorithm::Ecdsa, None);
        let (_, mut csr) = signed(&spec, 13);
        csr.inner.info.subject = DistinguishedName {
            common_name: Some("attacker.example".to_string()),
            ..Default::default()
        }
        .as_x509_name()
        .unwrap();
        assert!(matches!(
            csr.verify(),
            Err(RequestError::IncompatibleKeyAlgorithm(_))
        ));
    }

    #[test]
    fn key_of_another_type_cannot_sign() {
        let spec = spec(KeyAlgorithm::Ecdsa, None);
        let info = CertificationRequestInfo::from_spec(&spec).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let key = KeyPair::generate_kind(KeyKind::EcdsaP384, &mut rng).unwrap();
        assert!(matches!(
            info.sign(&key),
            Err(RequestError::IncompatibleKeyAlgorithm(_))
        ));
    }

    #[test]
    fn other_pem_labels_are_rejected() {
        let pem = pem_utils::der_to_pem(&[0x30, 0x00], "CERTIFICATE");
        assert!(CertificateRequest::from_pem(&pem).is_err());
    }
}
