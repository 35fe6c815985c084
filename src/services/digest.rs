// src/services/digest.rs
//! Document digest verification.
//!
//! The issuer records the document digest as a qualified base64 string in
//! the credential's `digest` attribute. The verifier hashes the extracted
//! document bytes with the same algorithm and encoding and compares the two
//! strings exactly. No normalization is applied to either side.

use crate::error::Result;
use crate::models::credential::Credential;
use crate::storage::staging::StagedFile;
use crate::utils::crypto::DigestAlgorithm;
use log::debug;

/// Result of the digest comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestCheck {
    Match,
    /// Carries the digest computed from the document.
    Mismatch { computed: String },
}

#[derive(Debug, Clone, Copy)]
pub struct DocumentDigestVerifier {
    algorithm: DigestAlgorithm,
}

impl DocumentDigestVerifier {
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Compares the digest of `document` with the credential's recorded one.
    ///
    /// A credential without a string `digest` attribute never matches.
    pub fn check(&self, document: &[u8], credential: &Credential) -> DigestCheck {
        let computed = self.algorithm.qb64_digest(document);
        match credential.digest() {
            Some(recorded) if recorded == computed => DigestCheck::Match,
            Some(recorded) => {
                debug!(
                    "digest mismatch for {}: recorded {}, computed {}",
                    credential.said, recorded, computed
                );
                DigestCheck::Mismatch { computed }
            }
            None => {
                debug!("credential {} carries no digest attribute", credential.said);
                DigestCheck::Mismatch { computed }
            }
        }
    }

    /// Reads and removes the staged document, then checks it.
    ///
    /// # Errors
    /// `IoFault` if the document cannot be read.
    pub fn verify(&self, document: StagedFile, credential: &Credential) -> Result<DigestCheck> {
        let bytes = document.consume()?;
        Ok(self.check(&bytes, credential))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VerifierError;

    const DOCUMENT: &[u8] = b"%PDF-1.7 quarterly report";

    fn attested(algorithm: DigestAlgorithm, document: &[u8]) -> Credential {
        Credential::new("EABC").with_attribute("digest", algorithm.qb64_digest(document))
    }

    #[test]
    fn test_matching_document() {
        for algorithm in [DigestAlgorithm::Blake3_256, DigestAlgorithm::Sha2_256] {
            let verifier = DocumentDigestVerifier::new(algorithm);
            assert_eq!(
                verifier.check(DOCUMENT, &attested(algorithm, DOCUMENT)),
                DigestCheck::Match
            );
        }
    }

    #[test]
    fn test_single_byte_change_mismatches() {
        let verifier = DocumentDigestVerifier::new(DigestAlgorithm::Blake3_256);
        let credential = attested(DigestAlgorithm::Blake3_256, DOCUMENT);

        let mut tampered = DOCUMENT.to_vec();
        tampered[3] ^= 0x01;

        assert!(matches!(
            verifier.check(&tampered, &credential),
            DigestCheck::Mismatch { .. }
        ));
    }

    #[test]
    fn test_comparison_is_case_sensitive() {
        let verifier = DocumentDigestVerifier::new(DigestAlgorithm::Blake3_256);
        let recorded = DigestAlgorithm::Blake3_256.qb64_digest(DOCUMENT);
        let credential = Credential::new("EABC").with_attribute("digest", recorded.to_lowercase());

        assert!(matches!(
            verifier.check(DOCUMENT, &credential),
            DigestCheck::Mismatch { .. }
        ));
    }

    #[test]
    fn test_other_algorithm_mismatches() {
        let verifier = DocumentDigestVerifier::new(DigestAlgorithm::Blake3_256);
        let credential = attested(DigestAlgorithm::Sha2_256, DOCUMENT);
        assert!(matches!(
            verifier.check(DOCUMENT, &credential),
            DigestCheck::Mismatch { .. }
        ));
    }

    #[test]
    fn test_missing_digest_attribute() {
        let verifier = DocumentDigestVerifier::new(DigestAlgorithm::Blake3_256);
        let computed = DigestAlgorithm::Blake3_256.qb64_digest(DOCUMENT);
        assert_eq!(
            verifier.check(DOCUMENT, &Credential::new("EABC")),
            DigestCheck::Mismatch { computed }
        );
    }

    #[test]
    fn test_verify_consumes_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, DOCUMENT).unwrap();
        let verifier = DocumentDigestVerifier::new(DigestAlgorithm::Blake3_256);

        let check = verifier
            .verify(StagedFile::adopt(path.clone()), &attested(DigestAlgorithm::Blake3_256, DOCUMENT))
            .unwrap();

        assert_eq!(check, DigestCheck::Match);
        assert!(!path.exists());

        assert!(matches!(
            verifier.verify(StagedFile::adopt(path), &Credential::new("EABC")),
            Err(VerifierError::IoFault(_))
        ));
    }
}
