// src/identity/cesr.rs
//! Reference proof-stream parser for CESR text streams.
//!
//! A credential export is a sequence of JSON messages, each followed by
//! attachment groups (count codes starting with `-` and base64url material).
//! Attachments never contain `{`, so messages are found by scanning for the
//! next `{` and decoding one JSON value from there.
//!
//! Messages are dispatched on their version string (`v`):
//! - `ACDC10JSON..._` bodies become credentials once their self-addressing
//!   identifier and declared size check out
//! - `KERI10JSON..._` registry events with ilk `rev` or `brv` become
//!   revocation notices; other key and registry events are skipped
//!
//! This parser proves integrity of each credential body but does NOT verify
//! attached signatures or key-event logs. Deployments that need that plug a
//! full verifier in behind [`IdentityVerifier`].

use crate::error::{Result, VerifierError};
use crate::identity::credential_store::CredentialStore;
use crate::identity::{IdentityVerifier, Notice};
use crate::models::credential::Credential;
use crate::utils::crypto::{encode_qb64, DigestAlgorithm, QB64_DIGEST_LEN};
use crate::utils::serialization::serialize;
use log::{debug, warn};
use serde_json::{Map, Value};
use std::sync::{Mutex, PoisonError};

/// Character filling the `d` field while its SAID is computed.
const SAID_DUMMY: char = '#';

/// Length of a version string such as `ACDC10JSON00011c_`.
const VERSION_LEN: usize = 17;

/// Decoded version string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub protocol: String,
    pub kind: String,
    pub size: usize,
}

impl Version {
    /// Parses `PPPPvvKKKKssssss_`: protocol, version, kind, hex size.
    pub fn parse(raw: &str) -> Option<Version> {
        if raw.len() != VERSION_LEN || !raw.is_ascii() || !raw.ends_with('_') {
            return None;
        }
        let size = usize::from_str_radix(&raw[10..16], 16).ok()?;
        Some(Version {
            protocol: raw[0..4].to_string(),
            kind: raw[6..10].to_string(),
            size,
        })
    }
}

/// Digest algorithm named by the derivation code of a SAID.
fn said_algorithm(said: &str) -> Option<DigestAlgorithm> {
    match said.chars().next()? {
        'E' => Some(DigestAlgorithm::Blake3_256),
        'I' => Some(DigestAlgorithm::Sha2_256),
        _ => None,
    }
}

/// Computes the SAID of a JSON body: the `d` field is replaced by a
/// placeholder of the final length, the body is serialized compactly in its
/// original field order and the bytes are hashed.
pub fn compute_said(body: &Map<String, Value>, algorithm: DigestAlgorithm) -> Result<String> {
    let mut dummied = body.clone();
    dummied.insert(
        "d".to_string(),
        Value::String(SAID_DUMMY.to_string().repeat(QB64_DIGEST_LEN)),
    );
    let raw = serialize(&dummied)?;
    Ok(encode_qb64(algorithm.code(), &algorithm.hash(raw.as_bytes())))
}

/// Splits a CESR text stream into its JSON messages.
///
/// # Errors
/// `ParserFault` when a `{` starts something that is not valid JSON.
pub fn messages(stream: &[u8]) -> Result<Vec<Map<String, Value>>> {
    let mut found = Vec::new();
    let mut pos = 0;
    while let Some(offset) = stream[pos..].iter().position(|b| *b == b'{') {
        let start = pos + offset;
        let mut values = serde_json::Deserializer::from_slice(&stream[start..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(Value::Object(message))) => found.push(message),
            Some(Ok(_)) | None => break,
            Some(Err(e)) => {
                return Err(VerifierError::ParserFault(format!(
                    "malformed message at byte {}: {}",
                    start, e
                )))
            }
        }
        pos = start + values.byte_offset();
    }
    Ok(found)
}

/// Checks an ACDC body and turns it into a [`Credential`].
///
/// # Errors
/// A description of the first integrity check that failed.
fn credential_from_acdc(body: &Map<String, Value>, version: &Version) -> std::result::Result<Credential, String> {
    let said = body
        .get("d")
        .and_then(Value::as_str)
        .ok_or("credential has no `d` field")?;

    let size = serialize(body).map_err(|e| e.to_string())?.len();
    if size != version.size {
        return Err(format!(
            "credential {} declares {} bytes but serializes to {}",
            said, version.size, size
        ));
    }

    let algorithm = said_algorithm(said).ok_or_else(|| format!("unsupported SAID code in {}", said))?;
    let expected = compute_said(body, algorithm).map_err(|e| e.to_string())?;
    if expected != said {
        return Err(format!("credential SAID {} does not match its body", said));
    }

    let text = |key: &str| body.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
    Ok(Credential {
        said: said.to_string(),
        issuer: text("i"),
        schema: text("s"),
        // Compact credentials carry only the attribute block's SAID.
        attributes: body.get("a").and_then(Value::as_object).cloned().unwrap_or_default(),
    })
}

/// Default [`IdentityVerifier`]: parses CESR exports, remembers the most
/// recently accepted credentials in a bounded in-memory store.
#[derive(Debug, Default)]
pub struct CesrProofParser {
    store: Mutex<CredentialStore>,
}

impl CesrProofParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parser whose store keeps at most `capacity` credentials.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            store: Mutex::new(CredentialStore::with_capacity(capacity)),
        }
    }

    /// Number of credentials currently held.
    pub fn credential_count(&self) -> usize {
        self.store.lock().unwrap_or_else(PoisonError::into_inner).count_credentials()
    }
}

impl IdentityVerifier for CesrProofParser {
    fn parse(&self, stream: &[u8]) -> Result<Vec<Notice>> {
        let messages = messages(stream)?;
        if messages.is_empty() {
            return Err(VerifierError::ParserFault("proof stream contains no messages".into()));
        }

        let mut notices = Vec::new();
        let mut skipped = 0usize;
        for message in &messages {
            let Some(version) = message.get("v").and_then(Value::as_str).and_then(Version::parse) else {
                warn!("skipping message without a valid version string");
                skipped += 1;
                continue;
            };

            match (version.protocol.as_str(), version.kind.as_str()) {
                ("ACDC", "JSON") => match credential_from_acdc(message, &version) {
                    Ok(credential) => {
                        debug!("accepted credential {}", credential.said);
                        self.store
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .store_credential(credential.clone());
                        notices.push(Notice::Issued(credential));
                    }
                    Err(reason) => {
                        warn!("dropping credential: {}", reason);
                        skipped += 1;
                    }
                },
                ("KERI", "JSON") => match message.get("t").and_then(Value::as_str) {
                    Some("rev") | Some("brv") => {
                        if let Some(said) = message.get("i").and_then(Value::as_str) {
                            notices.push(Notice::Revoked { said: said.to_string() });
                        }
                    }
                    _ => skipped += 1,
                },
                (protocol, kind) => {
                    debug!("skipping unsupported {} {} message", protocol, kind);
                    skipped += 1;
                }
            }
        }

        debug!(
            "parsed {} messages: {} notices, {} skipped, {} credentials held",
            messages.len(),
            notices.len(),
            skipped,
            self.credential_count()
        );
        Ok(notices)
    }

    fn credential(&self, said: &str) -> Option<Credential> {
        self.store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_credential(said)
            .cloned()
    }
}
