// src/services/resolver.rs
//! Credential resolution against a proof stream.

use crate::error::Result;
use crate::identity::{IdentityVerifier, Notice};
use crate::models::credential::Credential;
use crate::services::identifier::ClaimedIdentifier;
use crate::storage::staging::StagedFile;
use log::{debug, info};
use std::sync::Arc;

/// Result of looking for the claimed credential.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found(Credential),
    NotFound,
}

/// Finds the claimed credential among what the collaborator discovers in a
/// proof stream.
#[derive(Clone)]
pub struct CredentialResolver {
    verifier: Arc<dyn IdentityVerifier>,
}

impl CredentialResolver {
    pub fn new(verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self { verifier }
    }

    /// Parses `proof_stream` and scans every resulting notice for a
    /// credential whose SAID equals `claimed` exactly.
    ///
    /// The scan always visits every notice; the first exact match wins and
    /// is then re-read from the collaborator's store. A revocation of the
    /// claimed SAID anywhere in the stream cancels the match.
    ///
    /// # Returns
    /// - `Ok(Resolution::Found(credential))` on an unrevoked exact match
    /// - `Ok(Resolution::NotFound)` when no notice matches or the match is
    ///   revoked
    ///
    /// # Errors
    /// `ParserFault` if the collaborator rejects the stream.
    pub fn resolve(&self, proof_stream: &[u8], claimed: &ClaimedIdentifier) -> Result<Resolution> {
        let notices = self.verifier.parse(proof_stream)?;

        let mut matched: Option<&Credential> = None;
        let mut revoked = false;
        for notice in &notices {
            match notice {
                Notice::Issued(credential) if credential.said == claimed.as_str() => {
                    matched.get_or_insert(credential);
                }
                Notice::Issued(credential) => {
                    debug!("credential {} does not match claim {}", credential.said, claimed)
                }
                Notice::Revoked { said } if said == claimed.as_str() => revoked = true,
                Notice::Revoked { said } => debug!("stream revokes credential {}", said),
            }
        }

        Ok(match matched {
            Some(credential) if revoked => {
                info!("credential {} is revoked in the proof stream", credential.said);
                Resolution::NotFound
            }
            Some(credential) => {
                let credential = self
                    .verifier
                    .credential(&credential.said)
                    .unwrap_or_else(|| credential.clone());
                debug!(
                    "resolved {} (issuer {}, schema {})",
                    credential.said, credential.issuer, credential.schema
                );
                Resolution::Found(credential)
            }
            None => Resolution::NotFound,
        })
    }

    /// Reads the staged proof-stream member, resolves against it and removes
    /// the file once the parse attempt is over.
    pub fn resolve_staged(&self, proof: StagedFile, claimed: &ClaimedIdentifier) -> Result<Resolution> {
        let stream = proof.read()?;
        let resolution = self.resolve(&stream, claimed);
        drop(proof);
        resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VerifierError;
    use crate::identity::cesr::CesrProofParser;
    use crate::test_utils::{acdc_credential, proof_stream, StaticVerifier};

    fn claim(said: &str) -> ClaimedIdentifier {
        ClaimedIdentifier::from_declared_name(&format!("doc-digest={}.zip", said)).unwrap()
    }

    #[test]
    fn test_exact_match_only() {
        let resolver = CredentialResolver::new(Arc::new(StaticVerifier::issuing(&["EX", "EY"])));

        assert_eq!(resolver.resolve(b"{}", &claim("EZ")).unwrap(), Resolution::NotFound);
        // Prefixes and case variants are not matches.
        assert_eq!(resolver.resolve(b"{}", &claim("E")).unwrap(), Resolution::NotFound);
        assert_eq!(resolver.resolve(b"{}", &claim("ey")).unwrap(), Resolution::NotFound);

        match resolver.resolve(b"{}", &claim("EY")).unwrap() {
            Resolution::Found(credential) => assert_eq!(credential.said, "EY"),
            Resolution::NotFound => panic!("EY should resolve"),
        }
    }

    #[test]
    fn test_revocations_do_not_match() {
        let verifier = StaticVerifier::new(vec![Notice::Revoked { said: "EX".into() }]);
        let resolver = CredentialResolver::new(Arc::new(verifier));
        assert_eq!(resolver.resolve(b"{}", &claim("EX")).unwrap(), Resolution::NotFound);
    }

    #[test]
    fn test_revoked_claim_does_not_resolve() {
        let verifier = StaticVerifier::new(vec![
            Notice::Issued(Credential::new("EX")),
            Notice::Issued(Credential::new("EY")),
            Notice::Revoked { said: "EX".into() },
        ]);
        let resolver = CredentialResolver::new(Arc::new(verifier));

        assert_eq!(resolver.resolve(b"{}", &claim("EX")).unwrap(), Resolution::NotFound);
        // Revoking another credential leaves the claim intact.
        assert!(matches!(
            resolver.resolve(b"{}", &claim("EY")).unwrap(),
            Resolution::Found(_)
        ));

        // Order within the stream does not matter.
        let verifier = StaticVerifier::new(vec![
            Notice::Revoked { said: "EX".into() },
            Notice::Issued(Credential::new("EX")),
        ]);
        let resolver = CredentialResolver::new(Arc::new(verifier));
        assert_eq!(resolver.resolve(b"{}", &claim("EX")).unwrap(), Resolution::NotFound);
    }

    #[test]
    fn test_parser_fault_propagates() {
        let resolver = CredentialResolver::new(Arc::new(CesrProofParser::new()));
        assert!(matches!(
            resolver.resolve(b"not a stream", &claim("EX")),
            Err(VerifierError::ParserFault(_))
        ));
    }

    #[test]
    fn test_resolves_second_credential_in_stream() {
        let (said_x, body_x) = acdc_credential("Edigest-x");
        let (said_y, body_y) = acdc_credential("Edigest-y");
        let stream = proof_stream(&[body_x.as_str(), body_y.as_str()]);
        let resolver = CredentialResolver::new(Arc::new(CesrProofParser::new()));

        match resolver.resolve(stream.as_bytes(), &claim(&said_y)).unwrap() {
            Resolution::Found(credential) => {
                assert_eq!(credential.said, said_y);
                assert_eq!(credential.digest(), Some("Edigest-y"));
            }
            Resolution::NotFound => panic!("second credential should resolve"),
        }
        assert_ne!(said_x, said_y);
    }

    #[test]
    fn test_resolve_staged_removes_proof() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proof.cesr");
        std::fs::write(&path, b"{}").unwrap();
        let resolver = CredentialResolver::new(Arc::new(StaticVerifier::issuing(&["EX"])));

        let resolution = resolver
            .resolve_staged(StagedFile::adopt(path.clone()), &claim("EX"))
            .unwrap();

        assert!(matches!(resolution, Resolution::Found(_)));
        assert!(!path.exists());

        // Removed on the failure path too.
        std::fs::write(&path, b"garbage").unwrap();
        let resolver = CredentialResolver::new(Arc::new(CesrProofParser::new()));
        assert!(resolver
            .resolve_staged(StagedFile::adopt(path.clone()), &claim("EX"))
            .is_err());
        assert!(!path.exists());
    }
}
