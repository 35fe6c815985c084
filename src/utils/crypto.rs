// src/utils/crypto.rs
//! Content digests in the encoding used by credential issuers.
//!
//! Issuers record a document digest as CESR qb64 text: a one-character
//! derivation code naming the hash function, followed by the base64url
//! encoding of the 32-byte raw digest left-padded with a single zero byte.
//! The result is always 44 characters, e.g. `EKn5...` for Blake3-256.

use serde::Deserialize;
use std::fmt;

/// Raw digest size shared by every supported algorithm.
pub const DIGEST_SIZE: usize = 32;

/// Length of a qb64-encoded 256-bit digest.
pub const QB64_DIGEST_LEN: usize = 44;

/// Hash functions an issuer may have used for the `digest` attribute.
///
/// The choice is deployment configuration: verification only interoperates
/// when it matches the algorithm the signing client used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum DigestAlgorithm {
    #[serde(rename = "blake3-256")]
    Blake3_256,
    #[serde(rename = "sha2-256")]
    Sha2_256,
}

impl DigestAlgorithm {
    /// CESR derivation code prefixed to the encoded digest.
    pub fn code(&self) -> char {
        match self {
            DigestAlgorithm::Blake3_256 => 'E',
            DigestAlgorithm::Sha2_256 => 'I',
        }
    }

    /// Computes the raw 32-byte digest of `data`.
    ///
    /// # Arguments
    /// * `data` - Binary data to hash
    ///
    /// # Returns
    /// Fixed-size 32-byte array containing the hash.
    pub fn hash(&self, data: &[u8]) -> [u8; DIGEST_SIZE] {
        match self {
            DigestAlgorithm::Blake3_256 => *blake3::hash(data).as_bytes(),
            DigestAlgorithm::Sha2_256 => {
                let digest = ring::digest::digest(&ring::digest::SHA256, data);
                let mut raw = [0u8; DIGEST_SIZE];
                raw.copy_from_slice(digest.as_ref());
                raw
            }
        }
    }

    /// Hashes `data` and returns its qb64 text form.
    pub fn qb64_digest(&self, data: &[u8]) -> String {
        encode_qb64(self.code(), &self.hash(data))
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigestAlgorithm::Blake3_256 => f.write_str("blake3-256"),
            DigestAlgorithm::Sha2_256 => f.write_str("sha2-256"),
        }
    }
}

/// Encodes a 32-byte digest as qb64 under a one-character derivation code.
///
/// # Arguments
/// * `code` - Derivation code (`E` for Blake3-256, `I` for SHA2-256)
/// * `raw` - The raw digest bytes
///
/// # Returns
/// A 44-character string: the code followed by 43 base64url characters.
pub fn encode_qb64(code: char, raw: &[u8; DIGEST_SIZE]) -> String {
    // 32 bytes need one pad byte to reach a multiple of three; the pad's
    // leading base64 character is then replaced by the code.
    let mut padded = Vec::with_capacity(DIGEST_SIZE + 1);
    padded.push(0u8);
    padded.extend_from_slice(raw);
    let b64 = base64::encode_config(&padded, base64::URL_SAFE_NO_PAD);

    let mut qb64 = String::with_capacity(QB64_DIGEST_LEN);
    qb64.push(code);
    qb64.push_str(&b64[1..]);
    qb64
}
