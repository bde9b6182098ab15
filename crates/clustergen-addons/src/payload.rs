//! Payload codec used by the assembler

use clustergen_common::codec;
use clustergen_common::defaults::DEFAULT_MAX_INLINE_PAYLOAD_BYTES;
use clustergen_common::{Defaults, Result};

#[cfg(test)]
use mockall::automock;

/// Encodes artifact content and decodes caller-supplied inline payloads
#[cfg_attr(test, automock)]
pub trait PayloadCodec: Send + Sync {
    /// Encode content for an artifact block
    fn encode(&self, content: &[u8]) -> Result<String>;

    /// Decode an inline payload supplied for `entry`
    fn decode(&self, entry: &str, payload: &str) -> Result<Vec<u8>>;
}

/// Gzip compression wrapped in standard base64
#[derive(Clone, Copy, Debug)]
pub struct GzipBase64 {
    max_inline_bytes: usize,
}

impl GzipBase64 {
    /// Codec bounding decompressed inline payloads at `max_inline_bytes`
    pub fn new(max_inline_bytes: usize) -> Self {
        Self { max_inline_bytes }
    }

    /// Codec configured from the constant registry
    pub fn from_defaults(defaults: &Defaults) -> Self {
        Self::new(defaults.max_inline_payload_bytes)
    }
}

impl Default for GzipBase64 {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INLINE_PAYLOAD_BYTES)
    }
}

impl PayloadCodec for GzipBase64 {
    fn encode(&self, content: &[u8]) -> Result<String> {
        codec::encode_gzip_base64(content)
    }

    fn decode(&self, entry: &str, payload: &str) -> Result<Vec<u8>> {
        codec::decode_inline(entry, payload, self.max_inline_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD, Engine};
    use clustergen_common::Error;

    #[test]
    fn decode_accepts_plain_and_gzipped_payloads() {
        let codec = GzipBase64::default();
        let plain = STANDARD.encode("kind: Pod\n");
        assert_eq!(codec.decode("scheduler", &plain).unwrap(), b"kind: Pod\n");

        let gzipped = codec.encode(b"kind: Pod\n").unwrap();
        assert_eq!(codec.decode("scheduler", &gzipped).unwrap(), b"kind: Pod\n");
    }

    #[test]
    fn decode_enforces_output_bound() {
        let codec = GzipBase64::new(8);
        let payload = codec.encode(&[b'a'; 64]).unwrap();
        let err = codec.decode("coredns", &payload).unwrap_err();
        assert!(matches!(err, Error::PayloadDecode { ref entry, .. } if entry == "coredns"));
    }

    #[test]
    fn from_defaults_uses_registry_bound() {
        let defaults = Defaults {
            max_inline_payload_bytes: 4,
            ..Defaults::default()
        };
        let codec = GzipBase64::from_defaults(&defaults);
        let payload = codec.encode(b"0123456789").unwrap();
        assert!(codec.decode("x", &payload).is_err());
    }
}
