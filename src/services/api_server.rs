// src/services/api_server.rs
//! HTTP surface of the verification gateway.
//!
//! Endpoints:
//! - `POST /verify-attestation`: multipart upload of one
//!   `<name>-digest=<SAID>.zip` file; answers `202` on acceptance and `400`
//!   on every rejection, always with a `{"msg": ...}` body
//! - `GET /health`: liveness probe, never touches the pipeline

use crate::error::Result;
use crate::models::outcome::VerificationOutcome;
use crate::models::submission::Submission;
use crate::services::verifier::VerificationService;
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Body of every response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MessageResponse {
    pub msg: String,
}

impl MessageResponse {
    fn new(msg: impl Into<String>) -> Json<Self> {
        Json(Self { msg: msg.into() })
    }
}

/// API server state shared by all handlers.
#[derive(Clone)]
pub struct ApiServer {
    /// Verification pipeline
    service: VerificationService,
    /// Name reported by the health probe
    service_name: String,
    /// Request body cap for uploads
    max_upload_bytes: usize,
}

impl ApiServer {
    /// Creates a new instance of the API server
    ///
    /// # Arguments
    /// * `service` - Verification pipeline run for each upload
    /// * `service_name` - Name reported by `/health`
    /// * `max_upload_bytes` - Largest accepted request body
    pub fn new(
        service: VerificationService,
        service_name: impl Into<String>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            service,
            service_name: service_name.into(),
            max_upload_bytes,
        }
    }

    /// Builds the router with every route and layer attached.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/verify-attestation", post(verify_attestation_handler))
            .route("/health", get(Self::health_handler))
            .layer(
                ServiceBuilder::new()
                    .layer(CorsLayer::permissive())
                    .layer(DefaultBodyLimit::max(self.max_upload_bytes)),
            )
            .with_state(Arc::new(self.clone()))
    }

    /// Starts the API server and serves until the listener fails.
    ///
    /// # Errors
    /// `IoFault` if the address cannot be bound or serving fails.
    pub async fn run(&self, addr: SocketAddr) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("{} listening on http://{}", self.service_name, listener.local_addr()?);
        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    async fn health_handler(State(state): State<Arc<ApiServer>>) -> (StatusCode, Json<MessageResponse>) {
        (
            StatusCode::OK,
            MessageResponse::new(format!("{} is healthy", state.service_name)),
        )
    }
}

/// Runs one upload through the pipeline.
///
/// A request that is not multipart, or carries no file field, is rejected as
/// missing a file. A file field whose body cannot be read (including one
/// over the body limit) is rejected as an invalid archive without running
/// the pipeline.
#[axum_macros::debug_handler]
async fn verify_attestation_handler(
    State(state): State<Arc<ApiServer>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> (StatusCode, Json<MessageResponse>) {
    let outcome = match multipart {
        Ok(multipart) => match read_submission(multipart).await {
            Ok(submission) => run_pipeline(&state.service, submission).await,
            Err(e) => {
                warn!("unreadable multipart upload: {}", e);
                VerificationOutcome::RejectedInvalidArchive
            }
        },
        Err(e) => {
            warn!("request is not a multipart upload: {}", e);
            run_pipeline(&state.service, None).await
        }
    };

    let status = if outcome.is_accepted() {
        StatusCode::ACCEPTED
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, MessageResponse::new(outcome.message()))
}

async fn run_pipeline(service: &VerificationService, submission: Option<Submission>) -> VerificationOutcome {
    let service = service.clone();
    match tokio::task::spawn_blocking(move || service.verify(submission)).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("verification task did not complete: {}", e);
            VerificationOutcome::RejectedInternalError
        }
    }
}

/// Takes the first field carrying a non-empty file name.
async fn read_submission(mut multipart: Multipart) -> std::result::Result<Option<Submission>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        let Some(file_name) = field.file_name().filter(|name| !name.is_empty()).map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await?;
        return Ok(Some(Submission::new(file_name, bytes)));
    }
    Ok(None)
}
