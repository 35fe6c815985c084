// src/storage/staging.rs
//! Scoped ownership of transient files in the ingestion directory.
//!
//! Every file or directory the ingester creates is wrapped in a guard that
//! removes it on drop, so cleanup happens on success, on rejection and on
//! early `?` returns alike. Removal failures are logged and swallowed: they
//! never replace the verification result that is already on its way out.

use log::{debug, warn};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

/// A file that is deleted when the guard goes out of scope.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    /// Takes ownership of an existing file at `path`.
    pub fn adopt(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole file without releasing it.
    pub fn read(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }

    /// Reads the whole file, then deletes it whether or not the read worked.
    pub fn consume(self) -> io::Result<Vec<u8>> {
        let content = fs::read(&self.path);
        drop(self);
        content
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("removed staged file {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("failed to remove staged file {}: {}", self.path.display(), e),
        }
    }
}

/// A directory that is removed, with its contents, on drop.
#[derive(Debug)]
pub struct StagedDir {
    path: PathBuf,
}

impl StagedDir {
    /// Creates a fresh directory. Fails if it already exists so two requests
    /// can never share one.
    pub fn create(path: PathBuf) -> io::Result<Self> {
        fs::create_dir(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedDir {
    fn drop(&mut self) {
        match fs::remove_dir_all(&self.path) {
            Ok(()) => debug!("removed staged directory {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                "failed to remove staged directory {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}
