//! Gzip + base64 codec for artifact content and inline payloads

use std::io::{Read, Write};

use base64::{engine::general_purpose::STANDARD, Engine};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::{Error, Result};

/// Leading bytes of every gzip stream
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Whether a byte slice starts with the gzip magic
pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

/// Gzip-compress bytes
///
/// The header carries no timestamp or file name, so equal input always
/// produces equal output.
pub fn gzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(bytes)
        .map_err(|e| Error::serialization_for_kind("gzip", e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| Error::serialization_for_kind("gzip", e.to_string()))
}

/// Decompress a gzip stream, refusing output larger than `max_bytes`
pub fn gunzip(bytes: &[u8], max_bytes: usize) -> std::io::Result<Vec<u8>> {
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX).saturating_add(1);
    let mut out = Vec::new();
    GzDecoder::new(bytes).take(limit).read_to_end(&mut out)?;
    if out.len() > max_bytes {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("decompressed payload exceeds {max_bytes} bytes"),
        ));
    }
    Ok(out)
}

/// Gzip-compress and base64-encode (standard alphabet, padded)
pub fn encode_gzip_base64(bytes: &[u8]) -> Result<String> {
    Ok(STANDARD.encode(gzip(bytes)?))
}

/// Decode a caller-supplied inline payload
///
/// The payload is base64 (whitespace is ignored, so wrapped blocks are
/// fine). If the decoded bytes are a gzip stream they are decompressed,
/// bounded by `max_bytes`. Any failure is a [`Error::PayloadDecode`] for
/// `entry`.
pub fn decode_inline(entry: &str, payload: &str, max_bytes: usize) -> Result<Vec<u8>> {
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let decoded = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| Error::payload_decode(entry, format!("invalid base64: {e}")))?;

    if !is_gzip(&decoded) {
        return Ok(decoded);
    }
    gunzip(&decoded, max_bytes)
        .map_err(|e| Error::payload_decode(entry, format!("invalid gzip: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gzip_output_is_stable_and_reversible() {
        let input = b"apiVersion: v1\nkind: ConfigMap\n";
        let first = gzip(input).expect("gzip");
        let second = gzip(input).expect("gzip");
        assert_eq!(first, second);
        assert!(is_gzip(&first));
        assert_eq!(gunzip(&first, 1024).expect("gunzip"), input);
    }

    #[test]
    fn gunzip_enforces_bound() {
        let compressed = gzip(&[b'a'; 4096]).expect("gzip");
        assert!(gunzip(&compressed, 4096).is_ok());
        let err = gunzip(&compressed, 4095).expect_err("over limit");
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn plain_inline_payload_is_used_verbatim() {
        let payload = STANDARD.encode("kind: Pod\n");
        let bytes = decode_inline("kube-scheduler", &payload, 1024).expect("decodes");
        assert_eq!(bytes, b"kind: Pod\n");
    }

    #[test]
    fn gzipped_inline_payload_is_decompressed() {
        let payload = encode_gzip_base64(b"kind: Pod\n").expect("encode");
        let wrapped = format!("{}\n  {}", &payload[..10], &payload[10..]);
        let bytes = decode_inline("kube-scheduler", &wrapped, 1024).expect("decodes");
        assert_eq!(bytes, b"kind: Pod\n");
    }

    #[test]
    fn bad_base64_is_payload_decode_error() {
        let err = decode_inline("calico", "not*base64", 1024).expect_err("invalid");
        assert!(matches!(err, Error::PayloadDecode { ref entry, .. } if entry == "calico"));
    }

    #[test]
    fn truncated_gzip_is_payload_decode_error() {
        let full = gzip(b"some longer addon content").expect("gzip");
        let truncated = STANDARD.encode(&full[..full.len() / 2]);
        let err = decode_inline("dashboard", &truncated, 1024).expect_err("truncated");
        assert_eq!(err.entry(), Some("dashboard"));
        assert!(err.to_string().contains("invalid gzip"));
    }
}
