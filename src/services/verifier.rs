// src/services/verifier.rs
//! Verification pipeline for uploaded attestation archives.
//!
//! A request moves through these stages, stopping at the first failure:
//!
//! 1. **Received**: a file was supplied
//! 2. **Identified**: the claimed SAID was read from the declared name
//! 3. **Ingested**: the archive was saved, validated and extracted
//! 4. **Resolved**: the proof stream contains the claimed credential
//! 5. **Recorded**: the issuance store marks the credential as seen
//! 6. **DigestChecked**: the document hashes to the credential's digest
//!
//! Every failure becomes a [`VerificationOutcome`]; nothing escapes to the
//! caller as an error. Files created along the way are owned by staging
//! guards and are gone by the time [`VerificationService::verify`] returns.

use crate::error::{Result, VerifierError};
use crate::identity::IdentityVerifier;
use crate::models::bundle::ArchiveBundle;
use crate::models::credential::Credential;
use crate::models::outcome::VerificationOutcome;
use crate::models::submission::Submission;
use crate::services::digest::{DigestCheck, DocumentDigestVerifier};
use crate::services::identifier::ClaimedIdentifier;
use crate::services::issuance::IssuanceRecorder;
use crate::services::resolver::{CredentialResolver, Resolution};
use crate::settings::Settings;
use crate::storage::ingester::Ingester;
use crate::storage::issuance_store::IssuanceStore;
use crate::utils::crypto::DigestAlgorithm;
use chrono::Utc;
use log::{debug, error, info, warn};
use std::fmt;
use std::sync::Arc;

/// Pipeline stage a request has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Identified,
    Ingested,
    Resolved,
    Recorded,
    DigestChecked,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Identified => "identified",
            Stage::Ingested => "ingested",
            Stage::Resolved => "resolved",
            Stage::Recorded => "recorded",
            Stage::DigestChecked => "digest-checked",
        };
        f.write_str(name)
    }
}

/// Runs uploads through the verification pipeline.
///
/// Holds no per-request state; clones share the same collaborator and
/// issuance store and can serve requests concurrently.
#[derive(Clone)]
pub struct VerificationService {
    ingester: Ingester,
    resolver: CredentialResolver,
    recorder: IssuanceRecorder,
    digests: DocumentDigestVerifier,
}

impl VerificationService {
    /// Constructs a new VerificationService.
    ///
    /// # Arguments
    /// * `ingester` - Writes and extracts uploads in the ingestion directory
    /// * `verifier` - Identity collaborator that parses proof streams
    /// * `store` - Durable issuance records
    /// * `algorithm` - Digest algorithm the signing client used
    pub fn new(
        ingester: Ingester,
        verifier: Arc<dyn IdentityVerifier>,
        store: Arc<dyn IssuanceStore>,
        algorithm: DigestAlgorithm,
    ) -> Self {
        Self {
            ingester,
            resolver: CredentialResolver::new(verifier),
            recorder: IssuanceRecorder::new(store),
            digests: DocumentDigestVerifier::new(algorithm),
        }
    }

    pub fn from_settings(
        settings: &Settings,
        verifier: Arc<dyn IdentityVerifier>,
        store: Arc<dyn IssuanceStore>,
    ) -> Self {
        Self::new(
            Ingester::from_settings(settings),
            verifier,
            store,
            settings.digest_algorithm,
        )
    }

    /// Verifies one upload.
    ///
    /// Blocks on disk and parser work; async callers should run it on a
    /// blocking thread.
    ///
    /// # Returns
    /// The terminal outcome of the request.
    pub fn verify(&self, submission: Option<Submission>) -> VerificationOutcome {
        match self.run(submission) {
            Ok(credential) => {
                info!(
                    "verification of {} issued by {} accepted",
                    credential.said, credential.issuer
                );
                VerificationOutcome::Accepted
            }
            Err(err) => {
                let outcome = VerificationOutcome::from(&err);
                match outcome {
                    VerificationOutcome::RejectedInternalError => {
                        error!("verification failed: {}", err)
                    }
                    _ => warn!("verification rejected: {}", err),
                }
                outcome
            }
        }
    }

    /// Runs every stage in order and returns the verified credential.
    fn run(&self, submission: Option<Submission>) -> Result<Credential> {
        let submission = submission.ok_or(VerifierError::NoFileSupplied)?;
        advance(Stage::Received, &submission.file_name);

        // The name is checked before anything touches disk.
        let claimed = ClaimedIdentifier::from_declared_name(&submission.file_name)?;
        advance(Stage::Identified, claimed.as_str());

        let archive = self.ingester.save(&submission)?;
        drop(submission);
        let ArchiveBundle {
            proof,
            document,
            note,
            document_name,
            workspace: _workspace,
        } = self.ingester.extract(archive)?;
        // Notes are never read.
        drop(note);
        advance(Stage::Ingested, &document_name);

        let credential = match self.resolver.resolve_staged(proof, &claimed)? {
            Resolution::Found(credential) => credential,
            Resolution::NotFound => {
                return Err(VerifierError::CredentialNotFound(claimed.to_string()))
            }
        };
        advance(Stage::Resolved, &credential.said);

        self.recorder.record(&credential.said, Utc::now())?;
        advance(Stage::Recorded, &credential.said);

        match self.digests.verify(document, &credential)? {
            DigestCheck::Match => {
                advance(Stage::DigestChecked, &document_name);
                Ok(credential)
            }
            DigestCheck::Mismatch { computed } => Err(VerifierError::DigestMismatch(format!(
                "`{}` hashes to {} under {}, credential {} records {}",
                document_name,
                computed,
                self.digests.algorithm(),
                credential.said,
                credential.digest().unwrap_or("no digest")
            ))),
        }
    }
}

fn advance(stage: Stage, subject: &str) {
    debug!("stage {}: {}", stage, subject);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::cesr::CesrProofParser;
    use crate::storage::issuance_store::{FileIssuanceStore, MemoryIssuanceStore};
    use crate::test_utils::{acdc_credential, build_zip, proof_stream, StaticVerifier};
    use std::fs;
    use std::path::Path;
    use std::thread;
    use tempfile::TempDir;

    const REPORT: &[u8] = b"%PDF-1.7\nQ3 revenue: 42\n%%EOF";

    struct Fixture {
        _dir: TempDir,
        ingestion: std::path::PathBuf,
        store: Arc<MemoryIssuanceStore>,
        service: VerificationService,
    }

    fn fixture(verifier: Arc<dyn IdentityVerifier>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let ingestion = dir.path().join("uploads");
        let ingester = Ingester::new(&ingestion, ".cesr", ".txt", 1024 * 1024);
        ingester.prepare().unwrap();
        let store = Arc::new(MemoryIssuanceStore::new());
        let service = VerificationService::new(
            ingester,
            verifier,
            store.clone(),
            DigestAlgorithm::Blake3_256,
        );
        Fixture {
            _dir: dir,
            ingestion,
            store,
            service,
        }
    }

    fn is_empty(dir: &Path) -> bool {
        fs::read_dir(dir).unwrap().next().is_none()
    }

    /// Credential attesting `REPORT` plus a zip holding its proof stream and
    /// the given document bytes.
    fn attested_upload(document: &[u8]) -> (String, Vec<u8>) {
        let digest = DigestAlgorithm::Blake3_256.qb64_digest(REPORT);
        let (said, body) = acdc_credential(&digest);
        let stream = proof_stream(&[body.as_str()]);
        let zip = build_zip(&[("proof.cesr", stream.as_bytes()), ("report.pdf", document)]);
        (said, zip)
    }

    #[test]
    fn test_accepts_matching_document() {
        let f = fixture(Arc::new(CesrProofParser::new()));
        let (said, zip) = attested_upload(REPORT);

        let outcome = f
            .service
            .verify(Some(Submission::new(format!("report-digest={}.zip", said), zip)));

        assert_eq!(outcome, VerificationOutcome::Accepted);
        assert!(f.store.get(&said).is_some());
        assert!(is_empty(&f.ingestion));
    }

    #[test]
    fn test_altered_document_is_rejected_but_recorded() {
        let f = fixture(Arc::new(CesrProofParser::new()));
        let mut altered = REPORT.to_vec();
        altered[12] = b'9';
        let (said, zip) = attested_upload(&altered);

        let outcome = f
            .service
            .verify(Some(Submission::new(format!("report-digest={}.zip", said), zip)));

        assert_eq!(outcome, VerificationOutcome::RejectedDigestMismatch);
        assert!(f.store.get(&said).is_some());
        assert!(is_empty(&f.ingestion));
    }

    #[test]
    fn test_four_member_archive_is_invalid() {
        let f = fixture(Arc::new(CesrProofParser::new()));
        let zip = build_zip(&[
            ("proof.cesr", b"{}"),
            ("report.pdf", REPORT),
            ("note.txt", b"hi"),
            ("extra.pdf", REPORT),
        ]);

        let outcome = f
            .service
            .verify(Some(Submission::new("report-digest=EABC.zip", zip)));

        assert_eq!(outcome, VerificationOutcome::RejectedInvalidArchive);
        assert!(f.store.is_empty());
        assert!(is_empty(&f.ingestion));
    }

    #[test]
    fn test_malformed_name_never_touches_disk() {
        // Neither the ingestion directory nor the parser may be reached.
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("never-created");
        let store = Arc::new(MemoryIssuanceStore::new());
        let service = VerificationService::new(
            Ingester::new(&missing, ".cesr", ".txt", 1024),
            Arc::new(StaticVerifier::failing()),
            store.clone(),
            DigestAlgorithm::Blake3_256,
        );
        let (_, zip) = attested_upload(REPORT);

        let outcome = service.verify(Some(Submission::new("report.zip", zip)));

        assert_eq!(outcome, VerificationOutcome::RejectedMalformedName);
        assert!(!missing.exists());
        assert!(store.is_empty());
    }

    #[test]
    fn test_missing_file() {
        let f = fixture(Arc::new(CesrProofParser::new()));
        assert_eq!(f.service.verify(None), VerificationOutcome::RejectedNoFile);
    }

    #[test]
    fn test_unknown_credential() {
        let f = fixture(Arc::new(CesrProofParser::new()));
        let (_, zip) = attested_upload(REPORT);

        let outcome = f
            .service
            .verify(Some(Submission::new("report-digest=EUnknownSaid.zip", zip)));

        assert_eq!(outcome, VerificationOutcome::RejectedCredentialNotFound);
        assert!(f.store.is_empty());
        assert!(is_empty(&f.ingestion));
    }

    #[test]
    fn test_revoked_credential_is_not_found() {
        let f = fixture(Arc::new(CesrProofParser::new()));
        let digest = DigestAlgorithm::Blake3_256.qb64_digest(REPORT);
        let (said, body) = acdc_credential(&digest);
        let revocation = serde_json::json!({
            "v": "KERI10JSON000000_",
            "t": "rev",
            "d": "ERevocationEvent",
            "i": said,
        })
        .to_string();
        let stream = proof_stream(&[body.as_str(), revocation.as_str()]);
        let zip = build_zip(&[("proof.cesr", stream.as_bytes()), ("report.pdf", REPORT)]);

        let outcome = f
            .service
            .verify(Some(Submission::new(format!("report-digest={}.zip", said), zip)));

        assert_eq!(outcome, VerificationOutcome::RejectedCredentialNotFound);
        assert!(f.store.get(&said).is_none());
        assert!(is_empty(&f.ingestion));
    }

    #[test]
    fn test_parser_fault_is_internal_error() {
        let f = fixture(Arc::new(StaticVerifier::failing()));
        let (said, zip) = attested_upload(REPORT);

        let outcome = f
            .service
            .verify(Some(Submission::new(format!("report-digest={}.zip", said), zip)));

        assert_eq!(outcome, VerificationOutcome::RejectedInternalError);
        assert!(is_empty(&f.ingestion));
    }

    #[test]
    fn test_note_member_is_accepted_and_removed() {
        let f = fixture(Arc::new(CesrProofParser::new()));
        let digest = DigestAlgorithm::Blake3_256.qb64_digest(REPORT);
        let (said, body) = acdc_credential(&digest);
        let stream = proof_stream(&[body.as_str()]);
        let zip = build_zip(&[
            ("proof.cesr", stream.as_bytes()),
            ("report.pdf", REPORT),
            ("note.txt", b"signed on behalf of finance"),
        ]);

        let outcome = f
            .service
            .verify(Some(Submission::new(format!("report-digest={}.zip", said), zip)));

        assert_eq!(outcome, VerificationOutcome::Accepted);
        assert!(is_empty(&f.ingestion));
    }

    #[test]
    fn test_io_fault_is_internal_error() {
        let dir = tempfile::tempdir().unwrap();
        let service = VerificationService::new(
            Ingester::new(dir.path().join("missing"), ".cesr", ".txt", 1024),
            Arc::new(CesrProofParser::new()),
            Arc::new(MemoryIssuanceStore::new()),
            DigestAlgorithm::Blake3_256,
        );
        let (said, zip) = attested_upload(REPORT);

        let outcome = service.verify(Some(Submission::new(format!("report-digest={}.zip", said), zip)));
        assert_eq!(outcome, VerificationOutcome::RejectedInternalError);
    }

    #[test]
    fn test_concurrent_requests_stay_independent() {
        let dir = tempfile::tempdir().unwrap();
        let ingester = Ingester::new(dir.path().join("uploads"), ".cesr", ".txt", 1024 * 1024);
        ingester.prepare().unwrap();
        let store = Arc::new(FileIssuanceStore::open(dir.path().join("issuances.json")).unwrap());
        let service = VerificationService::new(
            ingester,
            Arc::new(CesrProofParser::new()),
            store.clone(),
            DigestAlgorithm::Blake3_256,
        );

        let handles: Vec<_> = (0..6)
            .map(|n| {
                let service = service.clone();
                thread::spawn(move || {
                    let document = format!("document number {}", n).into_bytes();
                    let digest = DigestAlgorithm::Blake3_256.qb64_digest(&document);
                    let (said, body) = acdc_credential(&digest);
                    let stream = proof_stream(&[body.as_str()]);
                    let zip =
                        build_zip(&[("proof.cesr", stream.as_bytes()), ("doc.bin", &document)]);
                    let outcome = service
                        .verify(Some(Submission::new(format!("doc-digest={}.zip", said), zip)));
                    assert_eq!(outcome, VerificationOutcome::Accepted);
                    said
                })
            })
            .collect();

        let saids: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(store.len(), saids.len());
        assert!(is_empty(&dir.path().join("uploads")));
    }
}
