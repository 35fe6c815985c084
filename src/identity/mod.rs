// src/identity/mod.rs
//! Boundary to the identity-verification collaborator.
//!
//! The collaborator is the sole authority on credential authenticity. The
//! verifier hands it a proof stream and gets back what that one call
//! discovered; there is no shared notification queue to drain or race on.
//! Collaborators that can only report through such a queue are wrapped in
//! [`serialized::SerializedQueue`].

pub mod cesr;
pub mod credential_store;
pub mod serialized;

use crate::error::Result;
use crate::models::credential::Credential;

/// Something a proof stream told the collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// A credential issuance the collaborator accepted
    Issued(Credential),
    /// A registry event revoking the credential with this identifier
    Revoked { said: String },
}

impl Notice {
    /// The credential this notice carries, if any.
    pub fn credential(&self) -> Option<&Credential> {
        match self {
            Notice::Issued(credential) => Some(credential),
            Notice::Revoked { .. } => None,
        }
    }
}

/// Identity-verification collaborator.
///
/// Implementations validate event structure and signatures as far as they
/// are able; the verifier trusts whatever `parse` reports.
pub trait IdentityVerifier: Send + Sync {
    /// Parses a proof stream.
    ///
    /// # Returns
    /// Notices discovered by this call only, in stream order.
    ///
    /// # Errors
    /// `VerifierError::ParserFault` if the stream is rejected as a whole.
    fn parse(&self, stream: &[u8]) -> Result<Vec<Notice>>;

    /// Looks up a credential previously accepted by [`parse`](Self::parse).
    fn credential(&self, said: &str) -> Option<Credential>;
}
