// src/services/identifier.rs
//! Claimed credential identifier, taken from the declared upload name.
//!
//! The signing app downloads bundles as `<document>-digest=<SAID>.zip`;
//! everything after the first `-digest=` up to the `.zip` suffix is the SAID
//! the submitter claims attests to the document.

use crate::error::{Result, VerifierError};
use std::fmt;

pub const DIGEST_MARKER: &str = "-digest=";
pub const ARCHIVE_SUFFIX: &str = ".zip";

/// Non-empty credential identifier claimed by a submission.
///
/// No further syntax is enforced: a malformed token simply fails to match
/// during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClaimedIdentifier(String);

impl ClaimedIdentifier {
    /// Extracts the identifier from a declared file name.
    ///
    /// # Examples
    /// `case-digest=ABC123.zip` yields `ABC123`.
    ///
    /// # Errors
    /// `MalformedSubmissionName` if the marker or the `.zip` suffix is
    /// missing, or nothing lies between them.
    pub fn from_declared_name(name: &str) -> Result<Self> {
        let malformed = || VerifierError::MalformedSubmissionName(name.to_string());

        let (_, remainder) = name.split_once(DIGEST_MARKER).ok_or_else(malformed)?;
        let token = remainder.strip_suffix(ARCHIVE_SUFFIX).ok_or_else(malformed)?;
        if token.is_empty() {
            return Err(malformed());
        }
        Ok(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClaimedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
