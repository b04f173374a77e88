mod util;

use certreq::cert::SignatureAlgorithm;
use certreq::cert::params::CertificationRequestInfo;
use certreq::cert::extensions::{
    ExtendedKeyUsage, ExtendedKeyUsageOption, SubjectAltName, ToAndFromX509Extension,
};
use certreq::config::{
    DEFAULT_CERTIFICATE_NAME_ANNOTATION, DEFAULT_PRIVATE_KEY_ANNOTATION, PipelineConfig,
};
use certreq::error::RequestError;
use certreq::key::KeyPair;
use certreq::key::codec::{decode_private_key, encode_private_key};
use certreq::name::compute_request_name;
use certreq::pipeline::{Pipeline, Stage};
use certreq::spec::versioned::CertificateDocument;
use certreq::spec::{KeyAlgorithm, KeyEncoding};
use rstest::rstest;
use testresult::TestResult;

/// Runs the `web` certificate end to end and checks the record a submitter receives.
#[test]
fn web_certificate_end_to_end() -> TestResult {
    let spec = util::web_spec();
    let record = Pipeline::default().run(&spec, &mut util::seeded_rng(1))?;

    let annotations = &record.metadata.annotations;
    assert_eq!(annotations[DEFAULT_PRIVATE_KEY_ANNOTATION], "web-tls");
    assert_eq!(annotations[DEFAULT_CERTIFICATE_NAME_ANNOTATION], "web");
    assert_eq!(record.metadata.generate_name, "web-");
    assert_eq!(record.metadata.labels["app"], "web");
    assert_eq!(record.spec.issuer_ref.name, "ca-issuer");
    assert_eq!(record.spec.duration, Some(time::Duration::days(90)));
    assert!(!record.spec.is_ca);

    let csr = record.certificate_request()?;
    csr.verify()?;
    assert_eq!(csr.common_name()?.as_deref(), Some("example.com"));
    assert_eq!(
        csr.signature_algorithm(),
        Some(SignatureAlgorithm::Sha256WithRSA)
    );

    let extensions = csr.extensions()?;
    let san: SubjectAltName = extensions
        .iter()
        .find(|ext| ext.oid == SubjectAltName::OID)
        .ok_or("missing subject alternative name")?
        .to_extension()?;
    assert_eq!(san.dns_names, vec!["example.com", "www.example.com"]);
    let eku: ExtendedKeyUsage = extensions
        .iter()
        .find(|ext| ext.oid == ExtendedKeyUsage::OID)
        .ok_or("missing extended key usage")?
        .to_extension()?;
    assert_eq!(eku.usage, vec![ExtendedKeyUsageOption::ServerAuth]);
    Ok(())
}

/// The identifier depends only on the spec, not on the generated key.
#[test]
fn identifier_is_stable_across_runs() -> TestResult {
    let spec = util::web_spec();
    let pipeline = Pipeline::default();
    let first = pipeline.run(&spec, &mut util::seeded_rng(1))?;
    let second = pipeline.run(&spec, &mut util::seeded_rng(2))?;

    assert_eq!(first.identifier, second.identifier);
    assert_eq!(
        first.identifier,
        compute_request_name(&spec, pipeline.config())?
    );
    assert_ne!(first.spec.request, second.spec.request);
    Ok(())
}

#[test]
fn distinct_common_names_get_distinct_identifiers() -> TestResult {
    let config = PipelineConfig::default();
    let names = ["example.com", "example.org", "api.example.com", "www.example.com"]
        .iter()
        .map(|cn| {
            let mut spec = util::web_spec();
            spec.common_name = Some(cn.to_string());
            compute_request_name(&spec, &config)
        })
        .collect::<Result<Vec<_>, _>>()?;

    for (i, a) in names.iter().enumerate() {
        for b in &names[i + 1..] {
            assert_ne!(a, b);
        }
    }
    Ok(())
}

#[test]
fn labels_do_not_change_the_identifier() -> TestResult {
    let config = PipelineConfig::default();
    let mut relabeled = util::web_spec();
    relabeled
        .labels
        .insert("release".to_string(), "canary".to_string());
    assert_eq!(
        compute_request_name(&util::web_spec(), &config)?,
        compute_request_name(&relabeled, &config)?
    );
    Ok(())
}

#[rstest]
#[case(KeyAlgorithm::Rsa, Some(0))]
#[case(KeyAlgorithm::Rsa, Some(1024))]
#[case(KeyAlgorithm::Ecdsa, Some(0))]
#[case(KeyAlgorithm::Ecdsa, Some(192))]
#[case(KeyAlgorithm::Ed25519, Some(255))]
fn unsupported_keys_produce_nothing(
    #[case] algorithm: KeyAlgorithm,
    #[case] size: Option<u32>,
) -> TestResult {
    let spec = util::web_spec_with_key(algorithm, size, KeyEncoding::Pkcs8);

    let generated = KeyPair::generate(&spec.private_key, &mut util::seeded_rng(3));
    assert!(matches!(
        generated,
        Err(RequestError::UnsupportedAlgorithm(_))
    ));

    let err = Pipeline::default()
        .run(&spec, &mut util::seeded_rng(3))
        .expect_err("run must fail");
    assert_eq!(err.stage, Stage::KeyGenerated);
    assert!(matches!(err.source, RequestError::UnsupportedAlgorithm(_)));
    Ok(())
}

#[rstest]
#[case(KeyAlgorithm::Rsa, Some(2048), KeyEncoding::Pkcs1, SignatureAlgorithm::Sha256WithRSA)]
#[case(KeyAlgorithm::Rsa, Some(3071), KeyEncoding::Pkcs1, SignatureAlgorithm::Sha256WithRSA)]
#[case(KeyAlgorithm::Rsa, Some(3072), KeyEncoding::Pkcs8, SignatureAlgorithm::Sha384WithRSA)]
#[case(KeyAlgorithm::Rsa, Some(4095), KeyEncoding::Pkcs8, SignatureAlgorithm::Sha384WithRSA)]
#[case(KeyAlgorithm::Ecdsa, None, KeyEncoding::Pkcs1, SignatureAlgorithm::Sha256WithECDSA)]
#[case(KeyAlgorithm::Ecdsa, Some(384), KeyEncoding::Pkcs8, SignatureAlgorithm::Sha384WithECDSA)]
#[case(KeyAlgorithm::Ecdsa, Some(521), KeyEncoding::Pkcs1, SignatureAlgorithm::Sha512WithECDSA)]
#[case(KeyAlgorithm::Ed25519, None, KeyEncoding::Pkcs8, SignatureAlgorithm::Ed25519)]
fn every_key_choice_yields_a_verifiable_request(
    #[case] algorithm: KeyAlgorithm,
    #[case] size: Option<u32>,
    #[case] encoding: KeyEncoding,
    #[case] expected: SignatureAlgorithm,
) -> TestResult {
    let spec = util::web_spec_with_key(algorithm, size, encoding);
    let record = Pipeline::default().run(&spec, &mut util::seeded_rng(4))?;

    let pem = record.csr_pem()?;
    assert!(pem.starts_with("-----BEGIN CERTIFICATE REQUEST-----\n"));
    assert!(pem.ends_with("-----END CERTIFICATE REQUEST-----\n"));

    let csr = record.certificate_request()?;
    csr.verify()?;
    assert_eq!(csr.signature_algorithm(), Some(expected));
    assert_eq!(certreq::pem_utils::pem_to_der(pem, "CERTIFICATE REQUEST")?, csr.to_der()?);
    Ok(())
}

/// A key that went through the codec signs a request embedding its own public key.
#[rstest]
#[case(KeyAlgorithm::Rsa, None, KeyEncoding::Pkcs1)]
#[case(KeyAlgorithm::Rsa, None, KeyEncoding::Pkcs8)]
#[case(KeyAlgorithm::Ecdsa, Some(384), KeyEncoding::Pkcs1)]
#[case(KeyAlgorithm::Ed25519, None, KeyEncoding::Pkcs8)]
fn decoded_keys_sign_matching_requests(
    #[case] algorithm: KeyAlgorithm,
    #[case] size: Option<u32>,
    #[case] encoding: KeyEncoding,
) -> TestResult {
    let spec = util::web_spec_with_key(algorithm, size, encoding);
    let key = KeyPair::generate(&spec.private_key, &mut util::seeded_rng(5))?;
    let decoded = decode_private_key(encode_private_key(&key, encoding)?.as_bytes())?;

    let csr = CertificationRequestInfo::from_spec(&spec)?.sign(&decoded)?;
    csr.verify()?;
    assert_eq!(csr.public_key_der()?, key.public_key_der()?);
    Ok(())
}

#[test]
fn versioned_document_runs_end_to_end() -> TestResult {
    let spec = CertificateDocument::from_json(
        r#"{
            "apiVersion": "cert-manager.io/v1alpha2",
            "kind": "Certificate",
            "metadata": {"name": "ca", "namespace": "pki", "annotations": {"owner": "platform"}},
            "spec": {
                "secretName": "ca-key-pair",
                "commonName": "Example Root CA",
                "organization": ["Example Corp"],
                "isCA": true,
                "duration": "8760h",
                "issuerRef": {"name": "selfsigned", "kind": "ClusterIssuer"},
                "keyAlgorithm": "ecdsa",
                "keySize": 256
            }
        }"#,
    )?
    .into_spec()?;

    let record = Pipeline::default().run(&spec, &mut util::seeded_rng(6))?;
    assert!(record.spec.is_ca);
    assert_eq!(record.metadata.annotations["owner"], "platform");
    assert_eq!(record.metadata.namespace.as_deref(), Some("pki"));

    let subject = record.certificate_request()?.subject()?;
    assert_eq!(subject.common_name.as_deref(), Some("Example Root CA"));
    assert_eq!(subject.organizations, vec!["Example Corp"]);

    let json: serde_json::Value = serde_json::from_str(&record.to_json()?)?;
    assert_eq!(json["spec"]["duration"], "8760h0m0s");
    assert_eq!(json["spec"]["isCA"], true);
    Ok(())
}

#[test]
fn custom_annotation_keys_are_used() -> TestResult {
    let config = PipelineConfig::from_json(
        r#"{"privateKeyAnnotation": "example.com/key", "certificateNameAnnotation": "example.com/cert"}"#,
    )?;
    let record = Pipeline::new(config)?.run(&util::web_spec(), &mut util::seeded_rng(7))?;
    let annotations = &record.metadata.annotations;
    assert_eq!(annotations["example.com/key"], "web-tls");
    assert_eq!(annotations["example.com/cert"], "web");
    assert!(!annotations.contains_key(DEFAULT_PRIVATE_KEY_ANNOTATION));
    Ok(())
}
