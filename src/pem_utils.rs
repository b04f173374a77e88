use crate::error::{RequestError, Result};

/// PEM label of a PKCS#10 certification request.
pub const CSR_PEM_LABEL: &str = "CERTIFICATE REQUEST";

/// Convert DER‑encoded data into a PEM‑encoded string with the provided label.
///
/// Lines end in `\n` regardless of platform.
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let pem = pem::Pem::new(label, der);
    pem::encode_config(
        &pem,
        pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF),
    )
}

/// Convert a PEM‑encoded string to DER‑encoded bytes, requiring the given label.
pub fn pem_to_der(pem_str: &str, label: &str) -> Result<Vec<u8>> {
    let pem = pem::parse(pem_str).map_err(|e| RequestError::EncodingError(e.to_string()))?;
    if pem.tag() != label {
        return Err(RequestError::EncodingError(format!(
            "expected PEM label {label:?}, got {:?}",
            pem.tag()
        )));
    }
    Ok(pem.contents().to_vec())
}
