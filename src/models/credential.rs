// src/models/credential.rs
//! Credential data model as seen by the verifier.
//!
//! The identity collaborator owns credentials; the verifier reads them by
//! identifier and only ever looks at the identifier and the attribute block.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Attribute carrying the issuer-recorded document digest.
pub const DIGEST_ATTRIBUTE: &str = "digest";

/// A credential discovered in a proof stream.
///
/// # Fields
/// - `said`: self-addressing identifier of the credential (its `d` field)
/// - `issuer`: identifier of the issuing entity
/// - `schema`: identifier of the schema the credential claims to follow
/// - `attributes`: the credential's attribute block
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Credential {
    /// Unique self-certifying identifier
    /// Example: "EA2bjWRaF3Hk0e1x1hV5SbD_01APHYOg2oeeRNr8HVq1"
    pub said: String,

    /// Issuer identifier, empty when the body carries none
    pub issuer: String,

    /// Schema identifier, empty when the body carries none
    pub schema: String,

    /// Attribute block; data attestations carry `digest` and `digestAlgo`
    pub attributes: Map<String, Value>,
}

impl Credential {
    pub fn new(said: impl Into<String>) -> Self {
        Self {
            said: said.into(),
            issuer: String::new(),
            schema: String::new(),
            attributes: Map::new(),
        }
    }

    /// Adds or replaces an attribute; builder style.
    pub fn with_attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    /// The issuer-recorded document digest, if present and a string.
    pub fn digest(&self) -> Option<&str> {
        self.attributes.get(DIGEST_ATTRIBUTE).and_then(Value::as_str)
    }
}
