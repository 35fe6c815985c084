// src/models/submission.rs
//! An upload as received from the HTTP layer.

use bytes::Bytes;

/// One uploaded file: raw bytes plus the name the client declared for it.
///
/// Lives only for the duration of a request.
#[derive(Debug, Clone)]
pub struct Submission {
    pub file_name: String,
    pub bytes: Bytes,
}

impl Submission {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Extension of the declared name including the leading dot, or an
    /// empty string when there is none or it is not plain ASCII
    /// alphanumerics (the extension ends up in an on-disk file name).
    pub fn extension(&self) -> &str {
        let Some(idx) = self.file_name.rfind('.') else {
            return "";
        };
        let ext = &self.file_name[idx..];
        if ext.len() > 1 && ext.len() <= 16 && ext[1..].chars().all(|c| c.is_ascii_alphanumeric()) {
            ext
        } else {
            ""
        }
    }
}
