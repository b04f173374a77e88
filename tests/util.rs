use certreq::spec::{
    CertificateSpec, IssuerRef, KeyAlgorithm, KeyEncoding, KeyUsage, PrivateKeySettings,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// The `web` certificate: example.com, RSA-2048, 90 days, server auth.
pub fn web_spec() -> CertificateSpec {
    CertificateSpec::builder()
        .name("web")
        .namespace("default")
        .labels([("app".to_string(), "web".to_string())].into())
        .secret_name("web-tls")
        .common_name("example.com")
        .dns_names(vec!["example.com".to_string(), "www.example.com".to_string()])
        .duration(time::Duration::days(90))
        .issuer_ref(IssuerRef {
            name: "ca-issuer".to_string(),
            ..Default::default()
        })
        .usages(vec![KeyUsage::ServerAuth])
        .private_key(PrivateKeySettings {
            algorithm: KeyAlgorithm::Rsa,
            size: Some(2048),
            encoding: KeyEncoding::Pkcs1,
        })
        .build()
}

/// [`web_spec`] with different key settings.
pub fn web_spec_with_key(
    algorithm: KeyAlgorithm,
    size: Option<u32>,
    encoding: KeyEncoding,
) -> CertificateSpec {
    let mut spec = web_spec();
    spec.private_key = PrivateKeySettings {
        algorithm,
        size,
        encoding,
    };
    spec
}

pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}
