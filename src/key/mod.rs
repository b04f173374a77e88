//! Key generation and raw signing.
//!
//! Key material is generated from an injected random source and zeroized when the
//! [`KeyPair`] is dropped.

pub mod codec;

use std::fmt;

use der::Encode;
use ed25519_dalek::SigningKey as Ed25519SigningKey;
use log::trace;
use pkcs8::DecodePublicKey;
use rand_core::CryptoRngCore;
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Sha256, Sha384, Sha512};
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::cert::SignatureAlgorithm;
use crate::error::{RequestError, Result};
use crate::spec::{KeyAlgorithm, PrivateKeySettings};

/// Smallest RSA modulus accepted, in bits.
pub const MIN_RSA_KEY_SIZE: u32 = 2048;
/// Largest RSA modulus accepted, in bits.
pub const MAX_RSA_KEY_SIZE: u32 = 8192;
/// Curve selected when an ECDSA spec gives no size.
pub const DEFAULT_ECDSA_KEY_SIZE: u32 = 256;

/// A concrete key type, resolved from a spec's algorithm and size choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// RSA with the modulus size in bits.
    Rsa(u32),
    EcdsaP256,
    EcdsaP384,
    EcdsaP521,
    Ed25519,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyKind::Rsa(bits) => write!(f, "RSA-{bits}"),
            KeyKind::EcdsaP256 => f.write_str("ECDSA-P256"),
            KeyKind::EcdsaP384 => f.write_str("ECDSA-P384"),
            KeyKind::EcdsaP521 => f.write_str("ECDSA-P521"),
            KeyKind::Ed25519 => f.write_str("Ed25519"),
        }
    }
}

impl KeyKind {
    /// Resolves the key settings against the supported set.
    ///
    /// # Errors
    /// [`RequestError::UnsupportedAlgorithm`] for an RSA size outside
    /// [`MIN_RSA_KEY_SIZE`]..=[`MAX_RSA_KEY_SIZE`], an ECDSA size other than
    /// 256, 384 or 521, or any explicit size for Ed25519.
    pub fn from_settings(settings: &PrivateKeySettings) -> Result<Self> {
        match (settings.algorithm, settings.size) {
            (KeyAlgorithm::Rsa, None) => Ok(KeyKind::Rsa(MIN_RSA_KEY_SIZE)),
            (KeyAlgorithm::Rsa, Some(bits)) if (MIN_RSA_KEY_SIZE..=MAX_RSA_KEY_SIZE).contains(&bits) => {
                Ok(KeyKind::Rsa(bits))
            }
            (KeyAlgorithm::Rsa, Some(bits)) => Err(RequestError::UnsupportedAlgorithm(format!(
                "RSA key size {bits} is outside {MIN_RSA_KEY_SIZE}..={MAX_RSA_KEY_SIZE}"
            ))),
            (KeyAlgorithm::Ecdsa, size) => match size.unwrap_or(DEFAULT_ECDSA_KEY_SIZE) {
                256 => Ok(KeyKind::EcdsaP256),
                384 => Ok(KeyKind::EcdsaP384),
                521 => Ok(KeyKind::EcdsaP521),
                other => Err(RequestError::UnsupportedAlgorithm(format!(
                    "ECDSA key size {other} is not one of 256, 384, 521"
                ))),
            },
            (KeyAlgorithm::Ed25519, None) => Ok(KeyKind::Ed25519),
            (KeyAlgorithm::Ed25519, Some(size)) => Err(RequestError::UnsupportedAlgorithm(
                format!("Ed25519 keys have a fixed size, got {size}"),
            )),
        }
    }
}

/// A private key of one of the supported types.
pub enum KeyPair {
    Rsa { private: Box<RsaPrivateKey> },
    EcdsaP256 { secret: p256::SecretKey },
    EcdsaP384 { secret: p384::SecretKey },
    EcdsaP521 { secret: p521::SecretKey },
    Ed25519 { signing_key: Ed25519SigningKey },
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("kind", &self.kind())
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    /// Generates a key matching the spec's key settings.
    ///
    /// # Errors
    /// * [`RequestError::UnsupportedAlgorithm`] when the settings are outside the supported set.
    /// * [`RequestError::GenerationFailure`] when the random source or prime search fails.
    pub fn generate<R: CryptoRngCore>(settings: &PrivateKeySettings, rng: &mut R) -> Result<Self> {
        let kind = KeyKind::from_settings(settings)?;
        trace!("generating {kind} private key");
        Self::generate_kind(kind, rng)
    }

    /// Generates a key of an already resolved kind.
    pub fn generate_kind<R: CryptoRngCore>(kind: KeyKind, rng: &mut R) -> Result<Self> {
        let key = match kind {
            KeyKind::Rsa(bits) => {
                let private = RsaPrivateKey::new(rng, bits as usize)
                    .map_err(|e| RequestError::GenerationFailure(e.to_string()))?;
                KeyPair::Rsa {
                    private: Box::new(private),
                }
            }
            KeyKind::EcdsaP256 => KeyPair::EcdsaP256 {
                secret: p256::SecretKey::random(rng),
            },
            KeyKind::EcdsaP384 => KeyPair::EcdsaP384 {
                secret: p384::SecretKey::random(rng),
            },
            KeyKind::EcdsaP521 => KeyPair::EcdsaP521 {
                secret: p521::SecretKey::random(rng),
            },
            KeyKind::Ed25519 => KeyPair::Ed25519 {
                signing_key: Ed25519SigningKey::generate(rng),
            },
        };
        Ok(key)
    }

    /// The concrete type of this key.
    pub fn kind(&self) -> KeyKind {
        match self {
            KeyPair::Rsa { private } => KeyKind::Rsa(private.n().bits() as u32),
            KeyPair::EcdsaP256 { .. } => KeyKind::EcdsaP256,
            KeyPair::EcdsaP384 { .. } => KeyKind::EcdsaP384,
            KeyPair::EcdsaP521 { .. } => KeyKind::EcdsaP521,
            KeyPair::Ed25519 { .. } => KeyKind::Ed25519,
        }
    }

    /// The SubjectPublicKeyInfo of the public half.
    pub fn public_key_info(&self) -> Result<SubjectPublicKeyInfoOwned> {
        let spki = match self {
            KeyPair::Rsa { private } => {
                SubjectPublicKeyInfoOwned::from_key(RsaPublicKey::from(private.as_ref()))?
            }
            KeyPair::EcdsaP256 { secret } => SubjectPublicKeyInfoOwned::from_key(secret.public_key())?,
            KeyPair::EcdsaP384 { secret } => SubjectPublicKeyInfoOwned::from_key(secret.public_key())?,
            KeyPair::EcdsaP521 { secret } => SubjectPublicKeyInfoOwned::from_key(secret.public_key())?,
            KeyPair::Ed25519 { signing_key } => {
                let pk_bytes = signing_key.verifying_key().to_bytes();
                SubjectPublicKeyInfoOwned {
                    algorithm: AlgorithmIdentifierOwned {
                        oid: const_oid::db::rfc8410::ID_ED_25519,
                        parameters: None,
                    },
                    subject_public_key: der::asn1::BitString::from_bytes(&pk_bytes)?,
                }
            }
        };
        Ok(spki)
    }

    /// DER encoding of [`KeyPair::public_key_info`].
    pub fn public_key_der(&self) -> Result<Vec<u8>> {
        Ok(self.public_key_info()?.to_der()?)
    }

    /// Signs `data` with the given signature algorithm.
    ///
    /// ECDSA signatures are DER-encoded; RSA PKCS#1 v1.5, ECDSA (RFC 6979) and
    /// Ed25519 signatures are deterministic for a given key and message.
    ///
    /// # Errors
    /// [`RequestError::IncompatibleKeyAlgorithm`] when the algorithm does not belong to this key type.
    pub fn sign_data(&self, algorithm: SignatureAlgorithm, data: &[u8]) -> Result<Vec<u8>> {
        let signature = match (self, algorithm) {
            (KeyPair::Rsa { private }, SignatureAlgorithm::Sha256WithRSA) => {
                rsa::pkcs1v15::SigningKey::<Sha256>::new(private.as_ref().clone())
                    .sign(data)
                    .to_vec()
            }
            (KeyPair::Rsa { private }, SignatureAlgorithm::Sha384WithRSA) => {
                rsa::pkcs1v15::SigningKey::<Sha384>::new(private.as_ref().clone())
                    .sign(data)
                    .to_vec()
            }
            (KeyPair::Rsa { private }, SignatureAlgorithm::Sha512WithRSA) => {
                rsa::pkcs1v15::SigningKey::<Sha512>::new(private.as_ref().clone())
                    .sign(data)
                    .to_vec()
            }
            (KeyPair::EcdsaP256 { secret }, SignatureAlgorithm::Sha256WithECDSA) => {
                let signature: p256::ecdsa::Signature =
                    p256::ecdsa::SigningKey::from(secret).sign(data);
                signature.to_der().as_bytes().to_vec()
            }
            (KeyPair::EcdsaP384 { secret }, SignatureAlgorithm::Sha384WithECDSA) => {
                let signature: p384::ecdsa::Signature =
                    p384::ecdsa::SigningKey::from(secret).sign(data);
                signature.to_der().as_bytes().to_vec()
            }
            (KeyPair::EcdsaP521 { secret }, SignatureAlgorithm::Sha512WithECDSA) => {
                let signing_key = p521::ecdsa::SigningKey::from_bytes(&secret.to_bytes())
                    .map_err(|e| RequestError::IncompatibleKeyAlgorithm(e.to_string()))?;
                let signature: p521::ecdsa::Signature = signing_key.sign(data);
                signature.to_der().as_bytes().to_vec()
            }
            (KeyPair::Ed25519 { signing_key }, SignatureAlgorithm::Ed25519) => {
                signing_key.sign(data).to_bytes().to_vec()
            }
            (key, algorithm) => {
                return Err(RequestError::IncompatibleKeyAlgorithm(format!(
                    "{} key cannot produce {algorithm} signatures",
                    key.kind()
                )));
            }
        };
        Ok(signature)
    }
}

/// Checks `signature` over `data` against a SubjectPublicKeyInfo.
///
/// # Errors
/// [`RequestError::IncompatibleKeyAlgorithm`] when the key cannot be read for the
/// algorithm or the signature does not verify.
pub fn verify_signature(
    spki: &SubjectPublicKeyInfoOwned,
    algorithm: SignatureAlgorithm,
    data: &[u8],
    signature: &[u8],
) -> Result<()> {
    let spki_der = spki.to_der()?;
    let mismatch = |e: &dyn fmt::Display| {
        RequestError::IncompatibleKeyAlgorithm(format!("{algorithm} verification failed: {e}"))
    };

    match algorithm {
        SignatureAlgorithm::Sha256WithRSA
        | SignatureAlgorithm::Sha384WithRSA
        | SignatureAlgorithm::Sha512WithRSA => {
            let public = RsaPublicKey::from_public_key_der(&spki_der).map_err(|e| mismatch(&e))?;
            let signature =
                rsa::pkcs1v15::Signature::try_from(signature).map_err(|e| mismatch(&e))?;
            let verified = match algorithm {
                SignatureAlgorithm::Sha256WithRSA => {
                    rsa::pkcs1v15::VerifyingKey::<Sha256>::new(public).verify(data, &signature)
                }
                SignatureAlgorithm::Sha384WithRSA => {
                    rsa::pkcs1v15::VerifyingKey::<Sha384>::new(public).verify(data, &signature)
                }
                _ => rsa::pkcs1v15::VerifyingKey::<Sha512>::new(public).verify(data, &signature),
            };
            verified.map_err(|e| mismatch(&e))
        }
        SignatureAlgorithm::Sha256WithECDSA => {
            let key = p256::ecdsa::VerifyingKey::from_public_key_der(&spki_der)
                .map_err(|e| mismatch(&e))?;
            let signature = p256::ecdsa::Signature::from_der(signature).map_err(|e| mismatch(&e))?;
            key.verify(data, &signature).map_err(|e| mismatch(&e))
        }
        SignatureAlgorithm::Sha384WithECDSA => {
            let key = p384::ecdsa::VerifyingKey::from_public_key_der(&spki_der)
                .map_err(|e| mismatch(&e))?;
            let signature = p384::ecdsa::Signature::from_der(signature).map_err(|e| mismatch(&e))?;
            key.verify(data, &signature).map_err(|e| mismatch(&e))
        }
        SignatureAlgorithm::Sha512WithECDSA => {
            let key = p521::ecdsa::VerifyingKey::from_sec1_bytes(spki.subject_public_key.raw_bytes())
                .map_err(|e| mismatch(&e))?;
            let signature = p521::ecdsa::Signature::from_der(signature).map_err(|e| mismatch(&e))?;
            key.verify(data, &signature).map_err(|e| mismatch(&e))
        }
        SignatureAlgorithm::Ed25519 => {
            let key = ed25519_dalek::VerifyingKey::from_public_key_der(&spki_der)
                .map_err(|e| mismatch(&e))?;
            let signature =
                ed25519_dalek::Signature::from_slice(signature).map_err(|e| mismatch(&e))?;
            key.verify(data, &signature).map_err(|e| mismatch(&e))
        }
    }
}
