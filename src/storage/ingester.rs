// src/storage/ingester.rs
//! Archive ingestion: persisting uploads and extracting their members.
//!
//! An upload is written under a unique, time-ordered name with
//! write-to-temp-then-rename, then opened as a zip archive whose members are
//! classified by suffix into proof, document and optional note.
//!
//! # Archive rules
//! - at least one member must carry the proof-stream suffix
//! - between 2 and 3 members inclusive (directory entries are not members)
//! - at most one member per slot; a second note, proof or unclassified
//!   member rejects the archive instead of replacing the first
//! - member paths must stay inside the per-request extraction directory

use crate::error::{Result, VerifierError};
use crate::models::bundle::ArchiveBundle;
use crate::models::submission::Submission;
use crate::settings::Settings;
use crate::storage::staging::{StagedDir, StagedFile};
use chrono::Utc;
use log::{debug, info};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use zip::ZipArchive;

/// Smallest valid member count: proof and document.
pub const MIN_MEMBERS: usize = 2;
/// Largest valid member count: proof, document and note.
pub const MAX_MEMBERS: usize = 3;

/// Member indices per slot, as produced by [`classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub proof: usize,
    pub document: usize,
    pub note: Option<usize>,
}

/// Assigns archive members to slots by name suffix.
///
/// Pure function of its inputs, so the same member list always yields the
/// same mapping.
///
/// # Arguments
/// * `names` - Member names in archive order
/// * `proof_suffix` - Suffix marking the proof-stream member (e.g. `.cesr`)
/// * `note_suffix` - Suffix marking the note member (e.g. `.txt`)
///
/// # Errors
/// `VerifierError::InvalidArchiveStructure` when the proof member is missing,
/// the member count is outside `[2, 3]`, a slot is claimed twice, or no
/// document remains.
pub fn classify(names: &[&str], proof_suffix: &str, note_suffix: &str) -> Result<Classification> {
    if !names.iter().any(|name| name.ends_with(proof_suffix)) {
        return Err(VerifierError::InvalidArchiveStructure(
            "archive has no proof-stream member".into(),
        ));
    }
    if !(MIN_MEMBERS..=MAX_MEMBERS).contains(&names.len()) {
        return Err(VerifierError::InvalidArchiveStructure(format!(
            "archive has {} members, expected {} to {}",
            names.len(),
            MIN_MEMBERS,
            MAX_MEMBERS
        )));
    }

    let mut proof = None;
    let mut document = None;
    let mut note = None;
    for (idx, name) in names.iter().enumerate() {
        let (slot, label) = if name.ends_with(note_suffix) {
            (&mut note, "note")
        } else if name.ends_with(proof_suffix) {
            (&mut proof, "proof-stream")
        } else {
            (&mut document, "document")
        };
        if slot.replace(idx).is_some() {
            return Err(VerifierError::InvalidArchiveStructure(format!(
                "archive has more than one {} member",
                label
            )));
        }
    }

    match (proof, document) {
        (Some(proof), Some(document)) => Ok(Classification { proof, document, note }),
        _ => Err(VerifierError::InvalidArchiveStructure(
            "archive has no document member".into(),
        )),
    }
}

/// Writes uploads into the ingestion directory and extracts them.
#[derive(Debug, Clone)]
pub struct Ingester {
    dir: PathBuf,
    proof_suffix: String,
    note_suffix: String,
    max_member_bytes: u64,
}

impl Ingester {
    pub fn new(
        dir: impl Into<PathBuf>,
        proof_suffix: impl Into<String>,
        note_suffix: impl Into<String>,
        max_member_bytes: u64,
    ) -> Self {
        Self {
            dir: dir.into(),
            proof_suffix: proof_suffix.into(),
            note_suffix: note_suffix.into(),
            max_member_bytes,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.ingestion_dir.clone(),
            settings.proof_suffix.clone(),
            settings.note_suffix.clone(),
            settings.max_member_bytes,
        )
    }

    /// Creates the ingestion directory if it does not exist yet.
    pub fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Persists the submission's bytes under a fresh unique name.
    ///
    /// The bytes are written to a hidden `.part` file first and renamed into
    /// place, so the final name never refers to a partial upload.
    ///
    /// # Returns
    /// A guard owning the saved archive.
    ///
    /// # Errors
    /// `VerifierError::IoFault` if the directory is missing or not writable.
    pub fn save(&self, submission: &Submission) -> Result<StagedFile> {
        let token = next_token();
        let temp_path = self.dir.join(format!(".{}.part", token));
        let final_path = self.dir.join(format!("{}{}", token, submission.extension()));

        // Removes the partial file if anything below fails.
        let temp = StagedFile::adopt(temp_path.clone());
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)?;
        file.write_all(&submission.bytes)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &final_path)?;
        drop(temp);

        debug!(
            "saved upload `{}` ({} bytes) as {}",
            submission.file_name,
            submission.bytes.len(),
            final_path.display()
        );
        Ok(StagedFile::adopt(final_path))
    }

    /// Validates the archive and writes its members to a per-request
    /// directory.
    ///
    /// The archive file is removed when this returns, whatever the result.
    ///
    /// # Errors
    /// - `InvalidArchiveStructure` for unreadable archives, rule violations,
    ///   unsafe member paths and oversized members
    /// - `IoFault` for failures writing the extracted members
    pub fn extract(&self, archive: StagedFile) -> Result<ArchiveBundle> {
        let mut zip = ZipArchive::new(File::open(archive.path())?)?;

        let mut entries = Vec::with_capacity(zip.len());
        for idx in 0..zip.len() {
            let member = zip.by_index(idx)?;
            if !member.is_dir() {
                entries.push((idx, member.name().to_string()));
            }
        }
        let names: Vec<&str> = entries.iter().map(|(_, name)| name.as_str()).collect();
        let classification = classify(&names, &self.proof_suffix, &self.note_suffix)?;

        let workspace = StagedDir::create(self.dir.join(format!("{}.members", next_token())))?;
        let proof = self.write_member(&mut zip, entries[classification.proof].0, &workspace)?;
        let document = self.write_member(&mut zip, entries[classification.document].0, &workspace)?;
        let note = match classification.note {
            Some(slot) => Some(self.write_member(&mut zip, entries[slot].0, &workspace)?),
            None => None,
        };

        info!(
            "extracted archive {}: proof `{}`, document `{}`{}",
            archive.path().display(),
            entries[classification.proof].1,
            entries[classification.document].1,
            if note.is_some() { ", with note" } else { "" }
        );

        Ok(ArchiveBundle {
            proof,
            document,
            note,
            document_name: entries[classification.document].1.clone(),
            workspace,
        })
    }

    /// Extracts one member under its archive-internal name inside `workspace`.
    fn write_member(
        &self,
        zip: &mut ZipArchive<File>,
        idx: usize,
        workspace: &StagedDir,
    ) -> Result<StagedFile> {
        let member = zip.by_index(idx)?;
        let name = member.name().to_string();

        let relative = member
            .enclosed_name()
            .filter(|path| path.components().all(|c| matches!(c, Component::Normal(_))))
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                VerifierError::InvalidArchiveStructure(format!("unsafe member path `{}`", name))
            })?;
        if member.size() > self.max_member_bytes {
            return Err(oversized(&name));
        }

        let target = workspace.path().join(&relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
            ensure_within(workspace.path(), parent, &name)?;
        }

        // Declared sizes can lie; bound the actual read as well.
        let mut content = Vec::new();
        member
            .take(self.max_member_bytes + 1)
            .read_to_end(&mut content)
            .map_err(|e| {
                VerifierError::InvalidArchiveStructure(format!("unreadable member `{}`: {}", name, e))
            })?;
        if content.len() as u64 > self.max_member_bytes {
            return Err(oversized(&name));
        }

        let mut out = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => VerifierError::InvalidArchiveStructure(format!(
                    "duplicate member path `{}`",
                    name
                )),
                _ => VerifierError::IoFault(e),
            })?;
        let staged = StagedFile::adopt(target);
        out.write_all(&content)?;
        Ok(staged)
    }
}

fn oversized(name: &str) -> VerifierError {
    VerifierError::InvalidArchiveStructure(format!("member `{}` exceeds the size limit", name))
}

/// Rejects `candidate` unless it resolves to a path inside `root`.
fn ensure_within(root: &Path, candidate: &Path, name: &str) -> Result<()> {
    let root = fs::canonicalize(root)?;
    let candidate = fs::canonicalize(candidate)?;
    if candidate.starts_with(&root) {
        Ok(())
    } else {
        Err(VerifierError::InvalidArchiveStructure(format!(
            "member `{}` escapes the extraction directory",
            name
        )))
    }
}

/// Time-ordered token unique within and across processes sharing the
/// ingestion directory.
fn next_token() -> String {
    static SEQUENCE: AtomicU64 = AtomicU64::new(0);
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!(
        "{}-{}-{:06}",
        Utc::now().format("%Y%m%dT%H%M%S%6f"),
        std::process::id(),
        seq
    )
}
