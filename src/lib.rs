//! # certreq - Certificate Requests from Declarative Certificate Specs
//!
//! certreq turns a declarative certificate spec into a ready-to-submit issuance request,
//! built entirely with rustcrypto libraries. A run computes a deterministic request name,
//! generates a private key, encodes it, builds and signs a PKCS#10 certification request
//! and assembles the record an issuing authority consumes.
//!
//! ## Supported Key Types
//!
//! - **RSA**: 2048 to 8192-bit keys (2048 by default)
//! - **ECDSA**: P-256, P-384, and P-521 curves
//! - **Ed25519**: Edwards curve digital signature algorithm
//!
//! ## Supported Key Encodings
//!
//! - **PKCS1**: `RSA PRIVATE KEY` for RSA, `EC PRIVATE KEY` (SEC1) for ECDSA
//! - **PKCS8**: `PRIVATE KEY` for every key type
//!
//! ## Quick Start
//!
//! ```rust
//! use certreq::{pipeline::Pipeline, spec::versioned::CertificateDocument};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let spec = CertificateDocument::from_json(r#"{
//!     "apiVersion": "cert-manager.io/v1",
//!     "kind": "Certificate",
//!     "metadata": {"name": "web", "namespace": "default"},
//!     "spec": {
//!         "secretName": "web-tls",
//!         "commonName": "example.com",
//!         "dnsNames": ["example.com"],
//!         "duration": "2160h",
//!         "issuerRef": {"name": "ca-issuer"},
//!         "usages": ["server auth"],
//!         "privateKey": {"algorithm": "ECDSA", "size": 256}
//!     }
//! }"#)?
//! .into_spec()?;
//!
//! let record = Pipeline::default().run_with_os_rng(&spec)?;
//! assert!(record.identifier.as_str().starts_with("web-"));
//! println!("{}", record.to_json()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Deterministic Runs
//!
//! Randomness is only used for key generation and is always injected. Every supported
//! signature scheme is deterministic, so a seeded generator reproduces a run byte for byte:
//!
//! ```rust
//! use rand::{SeedableRng, rngs::StdRng};
//! use certreq::pipeline::Pipeline;
//! use certreq::spec::{CertificateSpec, IssuerRef, KeyAlgorithm, PrivateKeySettings};
//!
//! let spec = CertificateSpec::builder()
//!     .name("web")
//!     .secret_name("web-tls")
//!     .common_name("example.com")
//!     .issuer_ref(IssuerRef { name: "ca-issuer".to_string(), ..Default::default() })
//!     .private_key(PrivateKeySettings { algorithm: KeyAlgorithm::Ed25519, encoding: certreq::spec::KeyEncoding::Pkcs8, size: None })
//!     .build();
//!
//! let pipeline = Pipeline::default();
//! let first = pipeline.run(&spec, &mut StdRng::seed_from_u64(7)).unwrap();
//! let second = pipeline.run(&spec, &mut StdRng::seed_from_u64(7)).unwrap();
//! assert_eq!(first, second);
//! ```
//!
//! ## Error Handling
//!
//! Every step returns a [`error::RequestError`]; the pipeline wraps it in a
//! [`pipeline::PipelineError`] naming the step that failed:
//!
//! ```rust
//! use certreq::{error::RequestError, pipeline::{Pipeline, Stage}};
//! use certreq::spec::{CertificateSpec, IssuerRef, PrivateKeySettings};
//!
//! let spec = CertificateSpec::builder()
//!     .name("web")
//!     .secret_name("web-tls")
//!     .common_name("example.com")
//!     .issuer_ref(IssuerRef { name: "ca-issuer".to_string(), ..Default::default() })
//!     .private_key(PrivateKeySettings { size: Some(0), ..Default::default() })
//!     .build();
//!
//! let err = Pipeline::default().run_with_os_rng(&spec).unwrap_err();
//! assert_eq!(err.stage, Stage::KeyGenerated);
//! assert!(matches!(err.source, RequestError::UnsupportedAlgorithm(_)));
//! ```
//!
//! ## Module Organization
//!
//! - [`spec`]: The certificate spec and its versioned document forms
//! - [`name`]: Deterministic request names
//! - [`key`]: Key generation, signing, and PEM encoding/decoding
//! - [`cert`]: Certification request building, signing, and inspection
//! - [`request`]: The issuance-request record
//! - [`pipeline`]: The end-to-end run
//! - [`config`]: Pipeline configuration
//! - [`error`]: Error types

pub mod cert;
pub mod config;
pub mod error;
pub mod key;
#[cfg(feature = "logging")]
pub mod logging;
pub mod name;
pub mod pem_utils;
pub mod pipeline;
pub mod request;
pub mod spec;
