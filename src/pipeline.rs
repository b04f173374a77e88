//! The single-pass derivation of an issuance request from a certificate spec.
//!
//! ```text
//! SpecLoaded → NameComputed → KeyGenerated → KeyEncoded → CsrBuilt → CsrSigned → RequestAssembled → Done
//! ```
//!
//! A failure at any step ends the run with a [`PipelineError`] naming that step.
//! Nothing is kept between runs, so a failed run is retried by calling
//! [`Pipeline::run`] again from the start.

use log::{debug, trace};
use rand_core::CryptoRngCore;
use strum::Display;
use thiserror::Error;

use crate::cert::params::CertificationRequestInfo;
use crate::config::PipelineConfig;
use crate::error::RequestError;
use crate::key::KeyPair;
use crate::key::codec::{decode_private_key, encode_private_key};
use crate::name::compute_request_name;
use crate::request::{IssuanceRequest, assemble};
use crate::spec::CertificateSpec;

/// Steps of a pipeline run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Stage {
    SpecLoaded,
    NameComputed,
    KeyGenerated,
    KeyEncoded,
    CsrBuilt,
    CsrSigned,
    RequestAssembled,
    Done,
}

/// A run that stopped before reaching [`Stage::Done`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{stage} step failed: {source}")]
pub struct PipelineError {
    /// The step that could not be completed.
    pub stage: Stage,
    #[source]
    pub source: RequestError,
}

impl PipelineError {
    fn at(stage: Stage) -> impl FnOnce(RequestError) -> Self {
        move |source| Self { stage, source }
    }
}

/// Turns certificate specs into issuance requests.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Creates a pipeline after validating `config`.
    ///
    /// # Errors
    /// [`RequestError::InvalidConfig`] when the configuration cannot produce valid names.
    pub fn new(config: PipelineConfig) -> Result<Self, RequestError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs every step for `spec`, drawing key material from `rng`.
    ///
    /// The generated key is encoded with the spec's encoding and decoded again; the
    /// CSR is signed with the decoded key, which must match the generated one. Key
    /// material is dropped as soon as the CSR is signed.
    ///
    /// # Example
    /// ```
    /// use certreq::pipeline::Pipeline;
    /// use certreq::spec::{CertificateSpec, IssuerRef, KeyAlgorithm, PrivateKeySettings};
    ///
    /// let spec = CertificateSpec::builder()
    ///     .name("web")
    ///     .secret_name("web-tls")
    ///     .common_name("example.com")
    ///     .issuer_ref(IssuerRef { name: "ca-issuer".to_string(), ..Default::default() })
    ///     .private_key(PrivateKeySettings { algorithm: KeyAlgorithm::Ecdsa, ..Default::default() })
    ///     .build();
    ///
    /// let record = Pipeline::default().run_with_os_rng(&spec).unwrap();
    /// assert_eq!(record.metadata.generate_name, "web-");
    /// ```
    pub fn run<R: CryptoRngCore>(
        &self,
        spec: &CertificateSpec,
        rng: &mut R,
    ) -> Result<IssuanceRequest, PipelineError> {
        spec.validate().map_err(PipelineError::at(Stage::SpecLoaded))?;
        trace!("{}: certificate {:?}", Stage::SpecLoaded, spec.name);

        let identifier = compute_request_name(spec, &self.config)
            .map_err(PipelineError::at(Stage::NameComputed))?;
        debug!("{}: {identifier}", Stage::NameComputed);

        let key = KeyPair::generate(&spec.private_key, rng)
            .map_err(PipelineError::at(Stage::KeyGenerated))?;
        debug!("{}: {}", Stage::KeyGenerated, key.kind());

        let signing_key = Self::encode_round_trip(spec, &key)
            .map_err(PipelineError::at(Stage::KeyEncoded))?;
        drop(key);
        debug!("{}: {}", Stage::KeyEncoded, spec.private_key.encoding);

        let info = CertificationRequestInfo::from_spec(spec)
            .map_err(PipelineError::at(Stage::CsrBuilt))?;
        debug!(
            "{}: {} extension(s), {}",
            Stage::CsrBuilt,
            info.extensions.len(),
            info.signature_algorithm
        );

        let csr = info
            .sign(&signing_key)
            .map_err(PipelineError::at(Stage::CsrSigned))?;
        drop(signing_key);
        let csr_pem = csr.to_pem().map_err(PipelineError::at(Stage::CsrSigned))?;
        debug!("{}: {} PEM bytes", Stage::CsrSigned, csr_pem.len());

        let record = assemble(spec, identifier, &csr_pem, &self.config);
        debug!("{}: {}", Stage::RequestAssembled, record.identifier);
        trace!("{}", Stage::Done);
        Ok(record)
    }

    /// [`Pipeline::run`] with the operating system's random source.
    pub fn run_with_os_rng(&self, spec: &CertificateSpec) -> Result<IssuanceRequest, PipelineError> {
        self.run(spec, &mut rand_core::OsRng)
    }

    /// Encodes `key` as the spec asks, decodes it again and checks that the
    /// decoded key has the same public half.
    fn encode_round_trip(spec: &CertificateSpec, key: &KeyPair) -> Result<KeyPair, RequestError> {
        let encoded = encode_private_key(key, spec.private_key.encoding)?;
        let decoded = decode_private_key(encoded.as_bytes())?;
        if decoded.public_key_der()? != key.public_key_der()? {
            return Err(RequestError::IncompatibleKeyAlgorithm(
                "decoded private key does not match the generated key".to_string(),
            ));
        }
        Ok(decoded)
    }
}
