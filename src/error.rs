// src/error.rs
//! Error taxonomy for the verification pipeline.
//!
//! Every stage returns `Result<_, VerifierError>`. The orchestrator is the only
//! place that turns these into a [`VerificationOutcome`](crate::models::outcome::VerificationOutcome);
//! nothing in here is ever rendered verbatim to an HTTP caller.

use thiserror::Error;

/// Failures raised while processing a single submission.
#[derive(Debug, Error)]
pub enum VerifierError {
    /// The request carried no file field.
    #[error("no file supplied")]
    NoFileSupplied,

    /// The declared file name does not follow `<anything>-digest=<token>.zip`.
    #[error("malformed submission name `{0}`")]
    MalformedSubmissionName(String),

    /// Wrong member count, missing proof member, unsafe member path, oversized
    /// member or an unreadable archive.
    #[error("invalid archive structure: {0}")]
    InvalidArchiveStructure(String),

    /// The proof stream yielded no credential with the claimed identifier.
    #[error("credential `{0}` not found in proof stream")]
    CredentialNotFound(String),

    /// The document digest differs from the one recorded in the credential.
    #[error("document digest does not match credential `{0}`")]
    DigestMismatch(String),

    /// Disk read or write failure.
    #[error("i/o fault: {0}")]
    IoFault(#[from] std::io::Error),

    /// The identity collaborator refused the proof stream.
    #[error("proof stream rejected: {0}")]
    ParserFault(String),

    /// Bootstrap-time configuration failure.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

// A truncated upload surfaces as `ZipError::Io`, so every archive-library
// error is a structural rejection rather than an internal fault.
impl From<zip::result::ZipError> for VerifierError {
    fn from(err: zip::result::ZipError) -> Self {
        VerifierError::InvalidArchiveStructure(err.to_string())
    }
}

impl From<serde_json::Error> for VerifierError {
    fn from(err: serde_json::Error) -> Self {
        VerifierError::IoFault(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    }
}

pub type Result<T> = std::result::Result<T, VerifierError>;
