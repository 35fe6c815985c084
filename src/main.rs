// src/main.rs

//! # Attestation Verifier - Main Entry Point
//!
//! Accepts signed-document archives exported by the signing web app and
//! checks that the enclosed document is the one the enclosed credential
//! attests to.
//!
//! ## Architecture Overview
//! 1. **Services Layer**: identifier extraction, resolution, issuance
//!    bookkeeping, digest verification and the HTTP endpoints
//! 2. **Storage Layer**: upload ingestion and durable issuance records
//! 3. **Identity Layer**: the proof-stream collaborator
//!
//! ## Configuration
//! See [`settings`]. A `.env` file is loaded first, so `VERIFIER_*` and
//! `RUST_LOG` may be set there.

use crate::identity::cesr::CesrProofParser;
use crate::services::api_server::ApiServer;
use crate::services::verifier::VerificationService;
use crate::settings::Settings;
use crate::storage::ingester::Ingester;
use crate::storage::issuance_store::FileIssuanceStore;
use anyhow::Context;
use dotenv::dotenv;
use env_logger::Env;
use log::info;
use std::net::SocketAddr;
use std::sync::Arc;

// Module declarations (organized by functional domain)
mod error;         // Error taxonomy
mod identity;      // Proof-stream collaborator
mod models;        // Data structures
mod services;      // Pipeline stages and API
mod settings;      // Runtime configuration
mod storage;       // Ingestion directory and issuance records
mod utils;         // Helper functions

#[cfg(test)]
mod test_utils;

/// Main application entry point
///
/// # Initialization Sequence
/// 1. Load `.env` and initialize logging
/// 2. Load settings
/// 3. Prepare the ingestion directory and open the issuance store
/// 4. Start API server
///
/// # Errors
/// Returns `Err` if settings are invalid, the ingestion directory or
/// issuance store cannot be set up, or the server cannot bind.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let settings = Settings::load().context("failed to load settings")?;

    Ingester::from_settings(&settings).prepare().with_context(|| {
        format!(
            "failed to create ingestion directory {}",
            settings.ingestion_dir.display()
        )
    })?;

    let issuances = FileIssuanceStore::open(&settings.issuance_store).with_context(|| {
        format!(
            "failed to open issuance store {}",
            settings.issuance_store.display()
        )
    })?;

    let service = VerificationService::from_settings(
        &settings,
        Arc::new(CesrProofParser::with_capacity(settings.credential_cache_size)),
        Arc::new(issuances),
    );
    let api_server = ApiServer::new(service, settings.service_name.clone(), settings.max_upload_bytes);

    let addr: SocketAddr = settings
        .bind_address()
        .parse()
        .with_context(|| format!("invalid bind address {}", settings.bind_address()))?;
    info!(
        "digest algorithm {}, ingestion directory {}",
        settings.digest_algorithm,
        settings.ingestion_dir.display()
    );
    info!("Available endpoints:");
    info!("- POST /verify-attestation");
    info!("- GET  /health");

    api_server.run(addr).await.context("API server failed")?;
    Ok(())
}
