// src/settings.rs
//! Runtime configuration.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. An optional `verifier.toml` (or `.json`/`.yaml`) next to the binary
//! 3. `VERIFIER_*` environment variables, e.g. `VERIFIER_PORT=8080`
//!
//! `main` loads a `.env` file into the environment before any of this runs.

use crate::error::Result;
use crate::utils::crypto::DigestAlgorithm;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

/// Fully resolved service settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Name reported by the health probe
    pub service_name: String,
    pub host: String,
    pub port: u16,
    /// Directory holding uploaded archives and extracted members while a
    /// request is in flight
    pub ingestion_dir: PathBuf,
    /// JSON file backing the issuance records
    pub issuance_store: PathBuf,
    /// Hash function the signing client used for the `digest` attribute
    pub digest_algorithm: DigestAlgorithm,
    /// Suffix identifying the proof-stream member
    pub proof_suffix: String,
    /// Suffix identifying the optional note member
    pub note_suffix: String,
    /// Cap on the request body
    pub max_upload_bytes: usize,
    /// Cap on each decompressed archive member
    pub max_member_bytes: u64,
    /// Credentials the proof-stream parser keeps in memory
    pub credential_cache_size: usize,
}

impl Settings {
    /// Loads settings from defaults, the optional config file and the
    /// environment.
    ///
    /// # Errors
    /// Returns `VerifierError::Config` if a source is unreadable or a value
    /// has the wrong type (e.g. an unknown `digest_algorithm`).
    pub fn load() -> Result<Self> {
        let settings = Self::defaults()?
            .add_source(File::with_name("verifier").required(false))
            .add_source(Environment::with_prefix("VERIFIER").try_parsing(true))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Builder pre-populated with every default value.
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("service_name", "vLEI verification service")?
            .set_default("host", "0.0.0.0")?
            .set_default("port", 7676_i64)?
            .set_default("ingestion_dir", "./uploads")?
            .set_default("issuance_store", "./data/issuances.json")?
            .set_default("digest_algorithm", "blake3-256")?
            .set_default("proof_suffix", ".cesr")?
            .set_default("note_suffix", ".txt")?
            .set_default("max_upload_bytes", 15_i64 * 1024 * 1024)?
            .set_default("max_member_bytes", 64_i64 * 1024 * 1024)?
            .set_default("credential_cache_size", 1024_i64)?)
    }

    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings: Settings = Settings::defaults()
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.port, 7676);
        assert_eq!(settings.bind_address(), "0.0.0.0:7676");
        assert_eq!(settings.digest_algorithm, DigestAlgorithm::Blake3_256);
        assert_eq!(settings.proof_suffix, ".cesr");
        assert_eq!(settings.note_suffix, ".txt");
        assert_eq!(settings.max_upload_bytes, 15 * 1024 * 1024);
        assert_eq!(settings.ingestion_dir, PathBuf::from("./uploads"));
        assert_eq!(settings.credential_cache_size, 1024);
    }

    #[test]
    fn test_overrides() {
        let settings: Settings = Settings::defaults()
            .unwrap()
            .set_override("digest_algorithm", "sha2-256")
            .unwrap()
            .set_override("port", 9000_i64)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.digest_algorithm, DigestAlgorithm::Sha2_256);
        assert_eq!(settings.port, 9000);
    }

    #[test]
    fn test_unknown_algorithm_is_rejected() {
        let result: std::result::Result<Settings, _> = Settings::defaults()
            .unwrap()
            .set_override("digest_algorithm", "md5")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize();

        assert!(result.is_err());
    }
}
