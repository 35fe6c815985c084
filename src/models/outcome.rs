// src/models/outcome.rs
//! Terminal result of one verification request.

use crate::error::VerifierError;
use serde::Serialize;
use std::fmt;

/// Every request ends in exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VerificationOutcome {
    Accepted,
    RejectedNoFile,
    RejectedMalformedName,
    RejectedInvalidArchive,
    RejectedCredentialNotFound,
    RejectedDigestMismatch,
    RejectedInternalError,
}

impl VerificationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, VerificationOutcome::Accepted)
    }

    /// Caller-facing message. Never contains paths or internal error text.
    ///
    /// The accepted message contains "successful": the signing web app keys
    /// its result rendering on that word.
    pub fn message(&self) -> &'static str {
        match self {
            VerificationOutcome::Accepted => {
                "Verification successful: document matches the attested digest"
            }
            VerificationOutcome::RejectedNoFile => "No file uploaded",
            VerificationOutcome::RejectedMalformedName => {
                "Invalid file name: expected <name>-digest=<credential>.zip"
            }
            VerificationOutcome::RejectedInvalidArchive => {
                "Invalid archive: expected one proof stream, one document and an optional .txt note"
            }
            VerificationOutcome::RejectedCredentialNotFound => {
                "Verification failed: credential not found in the proof stream"
            }
            VerificationOutcome::RejectedDigestMismatch => {
                "Verification failed: document digest does not match the credential"
            }
            VerificationOutcome::RejectedInternalError => {
                "Verification failed: internal error while processing the archive"
            }
        }
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl From<&VerifierError> for VerificationOutcome {
    fn from(err: &VerifierError) -> Self {
        match err {
            VerifierError::NoFileSupplied => VerificationOutcome::RejectedNoFile,
            VerifierError::MalformedSubmissionName(_) => VerificationOutcome::RejectedMalformedName,
            VerifierError::InvalidArchiveStructure(_) => VerificationOutcome::RejectedInvalidArchive,
            VerifierError::CredentialNotFound(_) => VerificationOutcome::RejectedCredentialNotFound,
            VerifierError::DigestMismatch(_) => VerificationOutcome::RejectedDigestMismatch,
            VerifierError::IoFault(_) | VerifierError::ParserFault(_) | VerifierError::Config(_) => {
                VerificationOutcome::RejectedInternalError
            }
        }
    }
}
