//! use certreq::error::RequestError;

use thiserror::Error;

/// Represents errors that can occur while deriving a certificate request.
///
/// Every variant is terminal for the invocation that produced it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The certificate spec is missing required fields or carries malformed values.
    #[error("Invalid certificate spec: {0}")]
    InvalidSpec(String),

    /// The requested key algorithm or key size is outside the supported set.
    #[error("Unsupported key algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The requested private key encoding cannot represent the key.
    #[error("Unsupported key encoding: {0}")]
    UnsupportedEncoding(String),

    /// The key could not be generated.
    #[error("Key generation failure: {0}")]
    GenerationFailure(String),

    /// The key does not fit the signature algorithm it is asked to produce.
    #[error("Incompatible key algorithm: {0}")]
    IncompatibleKeyAlgorithm(String),

    /// Private key bytes could not be decoded.
    #[error("Malformed key data: {0}")]
    MalformedKeyData(String),

    /// The spec could not be canonicalized for hashing.
    #[error("Failed to hash certificate spec: {0}")]
    HashingFailure(String),

    /// Error during DER or PEM encoding of request structures.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// The pipeline configuration is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, RequestError>;

impl From<der::Error> for RequestError {
    /// Converts a `der::Error` into a `RequestError`.
    fn from(err: der::Error) -> Self {
        RequestError::EncodingError(err.to_string())
    }
}

impl From<x509_cert::spki::Error> for RequestError {
    fn from(err: x509_cert::spki::Error) -> Self {
        RequestError::EncodingError(err.to_string())
    }
}
