//! Content identifiers.
//!
//! Identifiers are CIDv1 strings: `multibase(base32) ‖ version ‖ codec ‖
//! multihash(digest)`. The version and the multihash code travel inside the
//! identifier, so the hashing or encoding scheme can change later without
//! invalidating identifiers already issued.
//!
//! Two identifiers are derived per declaration:
//! - the full CID, over signature + docstring + verbatim source
//! - the interface CID, over the nameless signature + docstring headline +
//!   kind + relative file path

use crate::error::CidError;
use crate::types::{DeclarationKind, DeclarationRecord};
use data_encoding::BASE32_NOPAD;
use sha2::{Digest, Sha256};

/// CID version written into every identifier.
pub const CID_VERSION: u64 = 1;

/// Multicodec code for raw bytes.
pub const RAW_CODEC: u64 = 0x55;

/// Multibase prefix for lowercase, unpadded RFC 4648 base32.
pub const BASE32_PREFIX: char = 'b';

/// A digest function usable inside a multihash.
pub trait ContentHasher: Send + Sync {
    /// Human-readable algorithm name, used in diagnostics.
    fn name(&self) -> &'static str;

    /// Multihash function code.
    fn multihash_code(&self) -> u64;

    /// Expected digest length in bytes.
    fn digest_len(&self) -> usize;

    /// Hash `data`.
    fn digest(&self, data: &[u8]) -> Result<Vec<u8>, CidError>;
}

/// SHA2-256, multihash code `0x12`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha2_256;

impl ContentHasher for Sha2_256 {
    fn name(&self) -> &'static str {
        "sha2-256"
    }

    fn multihash_code(&self) -> u64 {
        0x12
    }

    fn digest_len(&self) -> usize {
        32
    }

    fn digest(&self, data: &[u8]) -> Result<Vec<u8>, CidError> {
        Ok(Sha256::digest(data).to_vec())
    }
}

/// Computes content identifiers with a fixed digest function.
#[derive(Debug, Clone, Default)]
pub struct CidEngine<H: ContentHasher = Sha2_256> {
    hasher: H,
}

impl CidEngine<Sha2_256> {
    pub fn new() -> Self {
        Self { hasher: Sha2_256 }
    }
}

impl<H: ContentHasher> CidEngine<H> {
    pub fn with_hasher(hasher: H) -> Self {
        Self { hasher }
    }

    /// Identifier for arbitrary text, hashed as UTF-8.
    pub fn cid_for(&self, content: &str) -> Result<String, CidError> {
        let digest = self.hasher.digest(content.as_bytes())?;
        if digest.len() != self.hasher.digest_len() {
            return Err(CidError::Hashing {
                algorithm: self.hasher.name(),
                reason: format!(
                    "digest is {} bytes, expected {}",
                    digest.len(),
                    self.hasher.digest_len()
                ),
            });
        }

        let mut bytes = Vec::with_capacity(digest.len() + 8);
        encode_varint(CID_VERSION, &mut bytes);
        encode_varint(RAW_CODEC, &mut bytes);
        encode_varint(self.hasher.multihash_code(), &mut bytes);
        encode_varint(digest.len() as u64, &mut bytes);
        bytes.extend_from_slice(&digest);

        let mut cid = String::with_capacity(1 + (bytes.len() * 8).div_ceil(5));
        cid.push(BASE32_PREFIX);
        cid.push_str(&BASE32_NOPAD.encode(&bytes).to_ascii_lowercase());
        Ok(cid)
    }

    /// Byte-identity identifier of a declaration.
    pub fn full_cid(&self, record: &DeclarationRecord) -> Result<String, CidError> {
        let mut content = String::with_capacity(
            record.signature.len() + record.docstring_or_empty().len() + record.source.len(),
        );
        content.push_str(&record.signature);
        content.push_str(record.docstring_or_empty());
        content.push_str(&record.source);
        self.cid_for(&content)
    }

    /// Contract-identity identifier of a declaration at a location.
    pub fn interface_cid(
        &self,
        signature: &str,
        docstring: &str,
        kind: DeclarationKind,
        file_path: &str,
    ) -> Result<String, CidError> {
        let content = format!(
            "{}{}{}{}",
            strip_name(signature),
            docstring_headline(docstring),
            kind.as_str(),
            file_path
        );
        self.cid_for(&content)
    }
}

/// Signature without its declaration keyword and name.
///
/// `def f(a) -> int:` gives `(a) -> int:`, `class C(B):` gives `(B):` and a
/// class without bases gives the empty string. Unrecognized text is
/// returned unchanged.
pub fn strip_name(signature: &str) -> &str {
    if signature.starts_with("def ") || signature.starts_with("async def ") {
        if let Some(paren) = signature.find('(') {
            return &signature[paren..];
        }
    } else if signature.starts_with("class ") {
        let paren = signature.find('(');
        let colon = signature.find(':');
        match (paren, colon) {
            (Some(p), Some(c)) if p < c => return &signature[p..],
            (Some(p), None) => return &signature[p..],
            (_, Some(_)) => return "",
            (None, None) => {}
        }
    }
    signature
}

/// First line of a docstring, trimmed.
pub fn docstring_headline(docstring: &str) -> &str {
    docstring.split('\n').next().unwrap_or("").trim()
}

/// Unsigned LEB128, as used by multiformats.
pub fn encode_varint(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TruncatingHasher;

    impl ContentHasher for TruncatingHasher {
        fn name(&self) -> &'static str {
            "truncated"
        }
        fn multihash_code(&self) -> u64 {
            0x12
        }
        fn digest_len(&self) -> usize {
            32
        }
        fn digest(&self, data: &[u8]) -> Result<Vec<u8>, CidError> {
            Ok(Sha256::digest(data)[..16].to_vec())
        }
    }

    #[test]
    fn test_empty_content_golden_vector() {
        let engine = CidEngine::new();
        assert_eq!(
            engine.cid_for("").unwrap(),
            "bafkreihdwdcefgh4dqkjv67uzcmw7ojee6xedzdetojuzjevtenxquvyku"
        );
    }

    #[test]
    fn test_identifier_format() {
        let cid = CidEngine::new().cid_for("payload").unwrap();
        assert!(cid.starts_with("bafkrei"));
        assert_eq!(cid.len(), 59);
        assert!(cid.chars().all(|c| c.is_ascii_lowercase() || ('2'..='7').contains(&c)));
    }

    #[test]
    fn test_interface_cid_golden_vector() {
        let engine = CidEngine::new();
        let cid = engine
            .interface_cid(
                "def greet(name: str) -> str:",
                "Hi.",
                DeclarationKind::Function,
                "greetings/hello.py",
            )
            .unwrap();
        assert_eq!(cid, "bafkreidgfeaf6muq3naqxh3fczunidtqf6pv6xlemm6fzbsznxdybzsi2y");
    }

    #[test]
    fn test_short_digest_is_hashing_failure() {
        let engine = CidEngine::with_hasher(TruncatingHasher);
        let err = engine.cid_for("anything").unwrap_err();
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn test_strip_name_variants() {
        assert_eq!(strip_name("def f(a, b) -> int:"), "(a, b) -> int:");
        assert_eq!(strip_name("async def g():"), "():");
        assert_eq!(strip_name("class Plain:"), "");
        assert_eq!(strip_name("class Child(Base, Mixin):"), "(Base, Mixin):");
        assert_eq!(strip_name("lambda"), "lambda");
    }

    #[test]
    fn test_docstring_headline() {
        assert_eq!(docstring_headline("  Summary.  \n\nDetails."), "Summary.");
        assert_eq!(docstring_headline(""), "");
    }

    #[test]
    fn test_varint_encoding() {
        let mut out = Vec::new();
        encode_varint(0x55, &mut out);
        assert_eq!(out, vec![0x55]);

        let mut out = Vec::new();
        encode_varint(300, &mut out);
        assert_eq!(out, vec![0xac, 0x02]);
    }
}
