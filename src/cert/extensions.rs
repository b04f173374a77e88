use std::net::IpAddr;

use const_oid::AssociatedOid;
use der::{
    Decode, Encode,
    asn1::{Ia5String, OctetString},
    oid::ObjectIdentifier,
};
use x509_cert::ext::pkix::name::GeneralName;

pub use der::flagset::FlagSet;
use x509_cert::ext::pkix::KeyUsage as X509KeyUsage;
pub use x509_cert::ext::pkix::KeyUsages;

use crate::error::RequestError;
use crate::spec::KeyUsage as SpecKeyUsage;

/// Trait for converting to and from X.509 extensions.
///
/// This trait provides methods to encode and decode X.509 extension values.
///
/// # Example
/// ```
/// use certreq::cert::extensions::SubjectAltName;
/// use certreq::cert::extensions::ToAndFromX509Extension;
/// let san = SubjectAltName { dns_names: vec!["example.com".to_string()], ..Default::default() };
/// let encoded = san.to_x509_extension_value().unwrap();
/// let decoded = SubjectAltName::from_x509_extension_value(&encoded).unwrap();
/// assert_eq!(san, decoded);
/// ```
pub trait ToAndFromX509Extension {
    /// The Object Identifier (OID) for the extension.
    const OID: ObjectIdentifier;

    /// Encodes the extension into a DER-encoded byte vector.
    fn to_x509_extension_value(&self) -> Result<Vec<u8>, RequestError>;

    /// Decodes the extension from a DER-encoded byte slice.
    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, RequestError>
    where
        Self: Sized;
}

/// Represents the Subject Alternative Name (SAN) extension.
///
/// # Fields
/// * `dns_names` - DNS names.
/// * `ip_addresses` - IPv4 and IPv6 addresses.
/// * `uris` - Uniform resource identifiers.
/// * `email_addresses` - RFC 822 mailbox names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectAltName {
    pub dns_names: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
    pub uris: Vec<String>,
    pub email_addresses: Vec<String>,
}

impl SubjectAltName {
    pub fn is_empty(&self) -> bool {
        self.dns_names.is_empty()
            && self.ip_addresses.is_empty()
            && self.uris.is_empty()
            && self.email_addresses.is_empty()
    }
}

fn ia5(value: &str, what: &str) -> Result<Ia5String, RequestError> {
    Ia5String::new(value)
        .map_err(|e| RequestError::InvalidSpec(format!("{what} {value:?} is not IA5: {e}")))
}

impl ToAndFromX509Extension for SubjectAltName {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectAltName::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, RequestError> {
        let mut names = Vec::new();
        for name in &self.dns_names {
            names.push(GeneralName::DnsName(ia5(name, "DNS name")?));
        }
        for ip in &self.ip_addresses {
            let octets = match ip {
                IpAddr::V4(v4) => v4.octets().to_vec(),
                IpAddr::V6(v6) => v6.octets().to_vec(),
            };
            names.push(GeneralName::IpAddress(OctetString::new(octets)?));
        }
        for uri in &self.uris {
            names.push(GeneralName::UniformResourceIdentifier(ia5(uri, "URI")?));
        }
        for email in &self.email_addresses {
            names.push(GeneralName::Rfc822Name(ia5(email, "email address")?));
        }

        Ok(x509_cert::ext::pkix::SubjectAltName(names).to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, RequestError> {
        let san = x509_cert::ext::pkix::SubjectAltName::from_der(extension)?;
        let mut decoded = Self::default();
        for name in san.0 {
            match name {
                GeneralName::DnsName(dns) => decoded.dns_names.push(dns.to_string()),
                GeneralName::UniformResourceIdentifier(uri) => decoded.uris.push(uri.to_string()),
                GeneralName::Rfc822Name(email) => decoded.email_addresses.push(email.to_string()),
                GeneralName::IpAddress(octets) => {
                    let ip = match octets.as_bytes().len() {
                        4 => {
                            let bytes: [u8; 4] = octets.as_bytes().try_into().map_err(|_| {
                                RequestError::EncodingError("invalid IPv4 address".to_string())
                            })?;
                            IpAddr::from(bytes)
                        }
                        16 => {
                            let bytes: [u8; 16] = octets.as_bytes().try_into().map_err(|_| {
                                RequestError::EncodingError("invalid IPv6 address".to_string())
                            })?;
                            IpAddr::from(bytes)
                        }
                        n => {
                            return Err(RequestError::EncodingError(format!(
                                "IP address of {n} bytes"
                            )));
                        }
                    };
                    decoded.ip_addresses.push(ip);
                }
                _ => {
                    return Err(RequestError::EncodingError(
                        "Unsupported general name type".to_string(),
                    ));
                }
            }
        }
        Ok(decoded)
    }
}

/// Represents the Basic Constraints extension.
///
/// # Fields
/// * `is_ca` - Indicates if the certificate is a CA.
/// * `max_path_length` - The maximum number of intermediate CAs allowed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BasicConstraints {
    pub is_ca: bool,
    pub max_path_length: Option<u8>,
}

impl ToAndFromX509Extension for BasicConstraints {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::BasicConstraints::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, RequestError> {
        let bc = x509_cert::ext::pkix::BasicConstraints {
            ca: self.is_ca,
            path_len_constraint: self.max_path_length,
        };

        Ok(bc.to_der()?)
    }

    fn from_x509_extension_value(der_bytes: &[u8]) -> Result<Self, RequestError> {
        let bc = x509_cert::ext::pkix::BasicConstraints::from_der(der_bytes)?;
        Ok(Self {
            is_ca: bc.ca,
            max_path_length: bc.path_len_constraint,
        })
    }
}

/// Represents the Key Usage extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUsage(pub FlagSet<KeyUsages>);

impl ToAndFromX509Extension for KeyUsage {
    const OID: ObjectIdentifier = <X509KeyUsage as AssociatedOid>::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, RequestError> {
        let ku = X509KeyUsage(self.0);
        Ok(ku.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, RequestError> {
        let ku = X509KeyUsage::from_der(extension)?;
        Ok(Self(ku.0))
    }
}

/// Represents the Extended Key Usage extension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedKeyUsage {
    pub usage: Vec<ExtendedKeyUsageOption>,
}

impl ToAndFromX509Extension for ExtendedKeyUsage {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::ExtendedKeyUsage::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, RequestError> {
        let oids: Vec<ObjectIdentifier> = self.usage.iter().map(|v| (*v).into()).collect();
        let eku = x509_cert::ext::pkix::ExtendedKeyUsage(oids);
        Ok(eku.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, RequestError> {
        let eku = x509_cert::ext::pkix::ExtendedKeyUsage::from_der(extension)?;
        let usage = eku
            .0
            .iter()
            .map(|oid| {
                ExtendedKeyUsageOption::ALL
                    .into_iter()
                    .find(|option| ObjectIdentifier::from(*option) == *oid)
                    .ok_or_else(|| {
                        RequestError::EncodingError(format!(
                            "Unsupported extended key usage option {oid}"
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { usage })
    }
}

const ID_ANY_EXTENDED_KEY_USAGE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.37.0");
const ID_KP_IPSEC_END_SYSTEM: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.5");
const ID_KP_IPSEC_TUNNEL: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.6");
const ID_KP_IPSEC_USER: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.7");
const ID_MICROSOFT_SGC: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.4.1.311.10.3.3");
const ID_NETSCAPE_SGC: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.113730.4.1");

/// Represents an option for the Extended Key Usage extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExtendedKeyUsageOption {
    Any,
    ServerAuth,
    ClientAuth,
    CodeSigning,
    EmailProtection,
    IpsecEndSystem,
    IpsecTunnel,
    IpsecUser,
    TimeStamping,
    OcspSigning,
    MicrosoftSgc,
    NetscapeSgc,
}

impl ExtendedKeyUsageOption {
    const ALL: [ExtendedKeyUsageOption; 12] = [
        ExtendedKeyUsageOption::Any,
        ExtendedKeyUsageOption::ServerAuth,
        ExtendedKeyUsageOption::ClientAuth,
        ExtendedKeyUsageOption::CodeSigning,
        ExtendedKeyUsageOption::EmailProtection,
        ExtendedKeyUsageOption::IpsecEndSystem,
        ExtendedKeyUsageOption::IpsecTunnel,
        ExtendedKeyUsageOption::IpsecUser,
        ExtendedKeyUsageOption::TimeStamping,
        ExtendedKeyUsageOption::OcspSigning,
        ExtendedKeyUsageOption::MicrosoftSgc,
        ExtendedKeyUsageOption::NetscapeSgc,
    ];
}

impl From<ExtendedKeyUsageOption> for ObjectIdentifier {
    fn from(value: ExtendedKeyUsageOption) -> Self {
        match value {
            ExtendedKeyUsageOption::Any => ID_ANY_EXTENDED_KEY_USAGE,
            ExtendedKeyUsageOption::ServerAuth => const_oid::db::rfc5912::ID_KP_SERVER_AUTH,
            ExtendedKeyUsageOption::ClientAuth => const_oid::db::rfc5912::ID_KP_CLIENT_AUTH,
            ExtendedKeyUsageOption::CodeSigning => const_oid::db::rfc5912::ID_KP_CODE_SIGNING,
            ExtendedKeyUsageOption::EmailProtection => {
                const_oid::db::rfc5912::ID_KP_EMAIL_PROTECTION
            }
            ExtendedKeyUsageOption::IpsecEndSystem => ID_KP_IPSEC_END_SYSTEM,
            ExtendedKeyUsageOption::IpsecTunnel => ID_KP_IPSEC_TUNNEL,
            ExtendedKeyUsageOption::IpsecUser => ID_KP_IPSEC_USER,
            ExtendedKeyUsageOption::TimeStamping => const_oid::db::rfc5912::ID_KP_TIME_STAMPING,
            ExtendedKeyUsageOption::OcspSigning => const_oid::db::rfc5912::ID_KP_OCSP_SIGNING,
            ExtendedKeyUsageOption::MicrosoftSgc => ID_MICROSOFT_SGC,
            ExtendedKeyUsageOption::NetscapeSgc => ID_NETSCAPE_SGC,
        }
    }
}

/// A spec usage lands either in the key usage bits or in the extended key usage list.
pub enum UsageTarget {
    Basic(KeyUsages),
    Extended(ExtendedKeyUsageOption),
}

impl From<SpecKeyUsage> for UsageTarget {
    fn from(usage: SpecKeyUsage) -> Self {
        use ExtendedKeyUsageOption as Eku;
        use UsageTarget::{Basic, Extended};

        match usage {
            SpecKeyUsage::Signing | SpecKeyUsage::DigitalSignature => {
                Basic(KeyUsages::DigitalSignature)
            }
            SpecKeyUsage::ContentCommitment => Basic(KeyUsages::NonRepudiation),
            SpecKeyUsage::KeyEncipherment => Basic(KeyUsages::KeyEncipherment),
            SpecKeyUsage::KeyAgreement => Basic(KeyUsages::KeyAgreement),
            SpecKeyUsage::DataEncipherment => Basic(KeyUsages::DataEncipherment),
            SpecKeyUsage::CertSign => Basic(KeyUsages::KeyCertSign),
            SpecKeyUsage::CrlSign => Basic(KeyUsages::CRLSign),
            SpecKeyUsage::EncipherOnly => Basic(KeyUsages::EncipherOnly),
            SpecKeyUsage::DecipherOnly => Basic(KeyUsages::DecipherOnly),
            SpecKeyUsage::Any => Extended(Eku::Any),
            SpecKeyUsage::ServerAuth => Extended(Eku::ServerAuth),
            SpecKeyUsage::ClientAuth => Extended(Eku::ClientAuth),
            SpecKeyUsage::CodeSigning => Extended(Eku::CodeSigning),
            SpecKeyUsage::EmailProtection | SpecKeyUsage::Smime => Extended(Eku::EmailProtection),
            SpecKeyUsage::IpsecEndSystem => Extended(Eku::IpsecEndSystem),
            SpecKeyUsage::IpsecTunnel => Extended(Eku::IpsecTunnel),
            SpecKeyUsage::IpsecUser => Extended(Eku::IpsecUser),
            SpecKeyUsage::Timestamping => Extended(Eku::TimeStamping),
            SpecKeyUsage::OcspSigning => Extended(Eku::OcspSigning),
            SpecKeyUsage::MicrosoftSgc => Extended(Eku::MicrosoftSgc),
            SpecKeyUsage::NetscapeSgc => Extended(Eku::NetscapeSgc),
        }
    }
}

/// Splits spec usages into key usage bits and a deduplicated extended key usage list.
pub fn split_usages(usages: &[SpecKeyUsage]) -> (FlagSet<KeyUsages>, Vec<ExtendedKeyUsageOption>) {
    let mut basic: FlagSet<KeyUsages> = FlagSet::empty();
    let mut extended = Vec::new();
    for usage in usages {
        match UsageTarget::from(*usage) {
            UsageTarget::Basic(flag) => basic |= flag,
            UsageTarget::Extended(option) => {
                if !extended.contains(&option) {
                    extended.push(option);
                }
            }
        }
    }
    (basic, extended)
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use super::*;

    #[test]
    fn test_basic_constraints_encoding_decoding() {
        let original = BasicConstraints {
            is_ca: true,
            max_path_length: Some(3),
        };
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = BasicConstraints::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_subject_alt_name_keeps_every_name_kind() {
        let original = SubjectAltName {
            dns_names: vec!["example.com".to_string()],
            ip_addresses: vec![
                IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
                IpAddr::V6(Ipv6Addr::LOCALHOST),
            ],
            uris: vec!["spiffe://cluster.local/ns/default/sa/web".to_string()],
            email_addresses: vec!["ops@example.com".to_string()],
        };
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = SubjectAltName::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_subject_alt_name_rejects_non_ascii() {
        let san = SubjectAltName {
            dns_names: vec!["bücher.example".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            san.to_x509_extension_value(),
            Err(RequestError::InvalidSpec(_))
        ));
    }

    #[test]
    fn test_key_usage_encoding_decoding() {
        let original = KeyUsage(KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment);
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = KeyUsage::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_extended_key_usage_encoding_decoding() {
        let original = ExtendedKeyUsage {
            usage: vec![
                ExtendedKeyUsageOption::ServerAuth,
                ExtendedKeyUsageOption::IpsecTunnel,
                ExtendedKeyUsageOption::NetscapeSgc,
            ],
        };
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = ExtendedKeyUsage::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_split_usages() {
        let (basic, extended) = split_usages(&[
            SpecKeyUsage::Signing,
            SpecKeyUsage::KeyEncipherment,
            SpecKeyUsage::EmailProtection,
            SpecKeyUsage::Smime,
            SpecKeyUsage::ServerAuth,
        ]);
        assert_eq!(
            basic,
            KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment
        );
        assert_eq!(
            extended,
            vec![
                ExtendedKeyUsageOption::EmailProtection,
                ExtendedKeyUsageOption::ServerAuth
            ]
        );
    }
}
