// src/models/bundle.rs
//! Extracted archive members.

use crate::storage::staging::{StagedDir, StagedFile};

/// Members of a structurally valid archive, extracted to disk.
///
/// Each slot owns its file; dropping the bundle (or any slot) removes what
/// it holds. `workspace` is declared last so it is dropped after the members
/// it contains.
#[derive(Debug)]
pub struct ArchiveBundle {
    /// The proof-stream member
    pub proof: StagedFile,
    /// The attested document
    pub document: StagedFile,
    /// Optional free-text note
    pub note: Option<StagedFile>,
    /// Archive-internal name of the document, for logging
    pub document_name: String,
    /// Per-request directory the members were written into
    pub workspace: StagedDir,
}
