use bon::Builder;
use const_oid::ObjectIdentifier;
use der::asn1::{Any, SetOfVec};
use der::{Tag, Tagged};
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{RdnSequence, RelativeDistinguishedName};

use super::SignatureAlgorithm;
use super::extensions::{
    BasicConstraints, ExtendedKeyUsage, KeyUsage, KeyUsages, SubjectAltName,
    ToAndFromX509Extension, split_usages,
};
use crate::error::RequestError;
use crate::spec::CertificateSpec;

const OID_COUNTRY: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
const OID_PROVINCE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.8");
const OID_LOCALITY: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.7");
const OID_STREET_ADDRESS: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.9");
const OID_POSTAL_CODE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.17");
const OID_ORGANIZATION: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");
const OID_ORGANIZATIONAL_UNIT: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.11");
const OID_COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");
const OID_SERIAL_NUMBER: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.5");

/// The unsigned contents of a certificate signing request.
///
/// The subject public key is not part of this structure: it is taken from the
/// key that signs the request, so the embedded key and the signature always agree.
///
/// # Fields
/// * `subject` - The distinguished name of the requested certificate.
/// * `extensions` - Extensions carried in the `extensionRequest` attribute.
/// * `signature_algorithm` - The algorithm the request must be signed with.
#[derive(Clone, Debug, Builder)]
pub struct CertificationRequestInfo {
    pub subject: DistinguishedName,
    #[builder(default)]
    pub extensions: Vec<ExtensionParam>,
    pub signature_algorithm: SignatureAlgorithm,
}

impl CertificationRequestInfo {
    /// Builds the unsigned request strictly from the certificate spec.
    ///
    /// # Errors
    /// * [`RequestError::InvalidSpec`] when the spec names no common name and no
    ///   subject alternative name, or when a name cannot be encoded.
    /// * [`RequestError::UnsupportedAlgorithm`] when the key settings have no
    ///   matching signature algorithm.
    pub fn from_spec(spec: &CertificateSpec) -> Result<Self, RequestError> {
        if !spec.has_identity() {
            return Err(RequestError::InvalidSpec(
                "no common name, DNS name, URI SAN, or email SAN specified on certificate"
                    .to_string(),
            ));
        }

        let signature_algorithm = SignatureAlgorithm::for_key_settings(&spec.private_key)?;
        let subject = DistinguishedName::from_spec(spec);

        let mut extensions = Vec::new();

        let san = SubjectAltName {
            dns_names: spec.dns_names.clone(),
            ip_addresses: spec.ip_addresses.clone(),
            uris: spec.uris.clone(),
            email_addresses: spec.email_addresses.clone(),
        };
        if !san.is_empty() {
            extensions.push(ExtensionParam::from_extension(&san, false)?);
        }

        let (mut basic, extended) = split_usages(&spec.effective_usages());
        if spec.is_ca {
            basic |= KeyUsages::KeyCertSign;
            extensions.push(ExtensionParam::from_extension(
                &BasicConstraints {
                    is_ca: true,
                    max_path_length: None,
                },
                true,
            )?);
        }
        if !basic.is_empty() {
            extensions.push(ExtensionParam::from_extension(&KeyUsage(basic), true)?);
        }
        if !extended.is_empty() {
            extensions.push(ExtensionParam::from_extension(
                &ExtendedKeyUsage { usage: extended },
                false,
            )?);
        }

        Ok(Self {
            subject,
            extensions,
            signature_algorithm,
        })
    }

    /// Finds and decodes an extension of the given type.
    pub fn extension<E: ToAndFromX509Extension>(&self) -> Option<Result<E, RequestError>> {
        self.extensions
            .iter()
            .find(|ext| ext.oid == E::OID)
            .map(ExtensionParam::to_extension)
    }
}

/// Distinguished name parameters for building an X.509 subject.
///
/// Multi-valued attributes produce one RDN per value.
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    pub common_name: Option<String>,
    #[builder(default)]
    pub countries: Vec<String>,
    #[builder(default)]
    pub provinces: Vec<String>,
    #[builder(default)]
    pub localities: Vec<String>,
    #[builder(default)]
    pub street_addresses: Vec<String>,
    #[builder(default)]
    pub postal_codes: Vec<String>,
    #[builder(default)]
    pub organizations: Vec<String>,
    #[builder(default)]
    pub organizational_units: Vec<String>,
    pub serial_number: Option<String>,
}

impl DistinguishedName {
    pub fn from_spec(spec: &CertificateSpec) -> Self {
        let subject = &spec.subject;
        Self {
            common_name: spec.common_name().map(str::to_string),
            countries: subject.countries.clone(),
            provinces: subject.provinces.clone(),
            localities: subject.localities.clone(),
            street_addresses: subject.street_addresses.clone(),
            postal_codes: subject.postal_codes.clone(),
            organizations: subject.organizations.clone(),
            organizational_units: subject.organizational_units.clone(),
            serial_number: subject.serial_number.clone().filter(|s| !s.is_empty()),
        }
    }

    /// Converts the distinguished name to an X.509-compatible format.
    ///
    /// RDNs are emitted in the order C, ST, L, STREET, postalCode, O, OU, CN, serialNumber.
    pub fn as_x509_name(&self) -> Result<x509_cert::name::DistinguishedName, RequestError> {
        let attributes = [
            (OID_COUNTRY, &self.countries[..]),
            (OID_PROVINCE, &self.provinces[..]),
            (OID_LOCALITY, &self.localities[..]),
            (OID_STREET_ADDRESS, &self.street_addresses[..]),
            (OID_POSTAL_CODE, &self.postal_codes[..]),
            (OID_ORGANIZATION, &self.organizations[..]),
            (OID_ORGANIZATIONAL_UNIT, &self.organizational_units[..]),
            (OID_COMMON_NAME, self.common_name.as_slice()),
            (OID_SERIAL_NUMBER, self.serial_number.as_slice()),
        ];

        let mut rdns = Vec::new();
        for (oid, values) in attributes {
            for value in values {
                let atv = AttributeTypeAndValue {
                    oid,
                    value: directory_string(value)?,
                };
                rdns.push(RelativeDistinguishedName(SetOfVec::try_from(vec![atv])?));
            }
        }
        Ok(RdnSequence(rdns))
    }

    /// Creates a `DistinguishedName` from an X.509-compatible format.
    pub fn from_x509_name(
        x509dn: &x509_cert::name::DistinguishedName,
    ) -> Result<Self, RequestError> {
        let mut dn = DistinguishedName::default();

        for rdn in x509dn.0.iter() {
            for attr in rdn.0.iter() {
                let value = match attr.value.tag() {
                    Tag::Utf8String | Tag::PrintableString | Tag::Ia5String => {
                        std::str::from_utf8(attr.value.value())
                            .map_err(|e| RequestError::EncodingError(e.to_string()))?
                            .to_string()
                    }
                    tag => {
                        return Err(RequestError::EncodingError(format!(
                            "unsupported directory string type {tag}"
                        )));
                    }
                };
                match attr.oid {
                    OID_COUNTRY => dn.countries.push(value),
                    OID_PROVINCE => dn.provinces.push(value),
                    OID_LOCALITY => dn.localities.push(value),
                    OID_STREET_ADDRESS => dn.street_addresses.push(value),
                    OID_POSTAL_CODE => dn.postal_codes.push(value),
                    OID_ORGANIZATION => dn.organizations.push(value),
                    OID_ORGANIZATIONAL_UNIT => dn.organizational_units.push(value),
                    OID_COMMON_NAME => dn.common_name = Some(value),
                    OID_SERIAL_NUMBER => dn.serial_number = Some(value),
                    _ => {}
                }
            }
        }

        Ok(dn)
    }
}

/// PrintableString when every character allows it, UTF8String otherwise.
fn directory_string(value: &str) -> Result<Any, RequestError> {
    let printable = value.chars().all(|c| {
        c.is_ascii_alphanumeric() || " '()+,-./:=?".contains(c)
    });
    let tag = if printable {
        Tag::PrintableString
    } else {
        Tag::Utf8String
    };
    Ok(Any::new(tag, value.as_bytes())?)
}

/// Represents an X.509 extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    pub fn from_extension<E: ToAndFromX509Extension>(
        extension: &E,
        critical: bool,
    ) -> Result<Self, RequestError> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }

    /// Decodes an `ExtensionParam` into a specific extension.
    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E, RequestError> {
        E::from_x509_extension_value(&self.value)
    }
}
