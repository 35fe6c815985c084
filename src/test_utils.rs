// src/test_utils.rs
//! Fixtures shared by unit tests.

use crate::error::{Result, VerifierError};
use crate::identity::cesr::compute_said;
use crate::identity::{IdentityVerifier, Notice};
use crate::models::credential::Credential;
use crate::utils::crypto::{DigestAlgorithm, QB64_DIGEST_LEN};
use crate::utils::serialization::serialize;
use serde_json::{json, Value};
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

/// Zips `(name, content)` pairs in order.
pub fn build_zip(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in members {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A self-consistent ACDC body attesting `digest`.
///
/// # Returns
/// `(said, body)` with `body` in compact JSON.
pub fn acdc_credential(digest: &str) -> (String, String) {
    let mut body = json!({
        "v": "ACDC10JSON000000_",
        "d": "#".repeat(QB64_DIGEST_LEN),
        "i": "EIssuerAid",
        "ri": "ERegistryAid",
        "s": "EDataAttestationSchema",
        "a": {
            "d": "EAttributeBlockSaid",
            "dt": "2024-06-01T12:00:00.000000+00:00",
            "digest": digest,
            "digestAlgo": "BLAKE3",
        },
    });
    let map = body.as_object_mut().unwrap();

    let size = serialize(&*map).unwrap().len();
    map.insert("v".into(), Value::String(format!("ACDC10JSON{:06x}_", size)));
    let said = compute_said(map, DigestAlgorithm::Blake3_256).unwrap();
    map.insert("d".into(), Value::String(said.clone()));

    (said, serialize(&body).unwrap())
}

/// Concatenates messages, each followed by a signature attachment group.
pub fn proof_stream(messages: &[&str]) -> String {
    messages
        .iter()
        .map(|message| format!("{}-FABEIssuerAid0AAAAAAAAAAAAAAAAAAAAAAA-AABAAsignature", message))
        .collect()
}

/// Collaborator with canned answers.
pub struct StaticVerifier {
    notices: Vec<Notice>,
    fail: bool,
}

impl StaticVerifier {
    pub fn new(notices: Vec<Notice>) -> Self {
        Self {
            notices,
            fail: false,
        }
    }

    /// Reports one issued credential per SAID.
    pub fn issuing(saids: &[&str]) -> Self {
        Self::new(
            saids
                .iter()
                .map(|said| Notice::Issued(Credential::new(*said)))
                .collect(),
        )
    }

    /// Rejects every stream.
    pub fn failing() -> Self {
        Self {
            notices: Vec::new(),
            fail: true,
        }
    }
}

impl IdentityVerifier for StaticVerifier {
    fn parse(&self, _stream: &[u8]) -> Result<Vec<Notice>> {
        if self.fail {
            return Err(VerifierError::ParserFault("stream rejected".into()));
        }
        Ok(self.notices.clone())
    }

    fn credential(&self, said: &str) -> Option<Credential> {
        self.notices
            .iter()
            .filter_map(Notice::credential)
            .find(|credential| credential.said == said)
            .cloned()
    }
}
