//! RPC Method Handlers
//!
//! Thin adapters from JSON-RPC params to the application services.

use crate::error::to_rpc_error;
use crate::types::{
    BulkRequest, BulkResponse, EngineCheckRequest, EngineCheckResponse,
    MaintenanceRequest, MaintenanceResponse, ProgressRequest, ProgressResponse,
    PutDocumentRequest, PutDocumentResponse, RenderRequest, RenderResponse, RunRequest,
    RunResponse, StatusRequest, StatusResponse,
};
use jsonrpsee::types::ErrorObjectOwned;
use std::sync::Arc;
use tracing::{info, warn};
use transcache_core::application::{
    JobOrchestrator, MaintenanceScheduler, ProgressLog, RenderMode, RenderService, StatusService,
};
use transcache_core::domain::{ProgressSnapshot, SourceDocument};
use transcache_core::error::AppError;
use transcache_core::port::{DocumentWriter, TranslationClient};

const MAX_DOCUMENT_KEY_LEN: usize = 191;

/// Services the handler dispatches to
pub struct RpcServices {
    pub orchestrator: Arc<JobOrchestrator>,
    pub render: Arc<RenderService>,
    pub status: Arc<StatusService>,
    pub progress: ProgressLog,
    pub client: Arc<dyn TranslationClient>,
    pub documents: Arc<dyn DocumentWriter>,
    pub maintenance: Arc<MaintenanceScheduler>,
}

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    services: RpcServices,
}

impl RpcHandler {
    pub fn new(services: RpcServices) -> Self {
        Self { services }
    }

    /// translation.render.v1
    pub async fn render(&self, params: RenderRequest) -> Result<RenderResponse, ErrorObjectOwned> {
        let mode = if params.immediate {
            RenderMode::Immediate
        } else {
            RenderMode::Deferred
        };

        let outcome = self
            .services
            .render
            .render(params.document.to_request(), mode)
            .await
            .map_err(to_rpc_error)?;

        Ok(RenderResponse {
            status: outcome.status().to_string(),
            html: outcome.to_html(),
        })
    }

    /// translation.run.v1
    pub async fn run(&self, params: RunRequest) -> Result<RunResponse, ErrorObjectOwned> {
        let request = params.document.to_request();
        info!(key = %request.key(), force = params.force, "Manual run requested");

        let result = self
            .services
            .orchestrator
            .run_and_claim(request, params.force)
            .await
            .map_err(to_rpc_error)?;

        Ok(RunResponse {
            delivered: result.is_some(),
            result,
        })
    }

    /// translation.progress.v1
    pub async fn progress(
        &self,
        params: ProgressRequest,
    ) -> Result<ProgressResponse, ErrorObjectOwned> {
        let key = params.key();
        key.validate()
            .map_err(|e| to_rpc_error(AppError::from(e)))?;

        let snapshot = self
            .services
            .progress
            .snapshot(&key)
            .await
            .map_err(to_rpc_error)?;

        Ok(match snapshot {
            ProgressSnapshot::Running { logs } => ProgressResponse {
                done: false,
                logs: Some(logs),
                result: None,
            },
            ProgressSnapshot::Done { result } => ProgressResponse {
                done: true,
                logs: None,
                result: Some(result),
            },
        })
    }

    /// translation.bulk.v1
    pub async fn bulk(&self, params: BulkRequest) -> Result<BulkResponse, ErrorObjectOwned> {
        if params.requests.is_empty() {
            return Err(to_rpc_error(AppError::Validation(
                "requests cannot be empty".to_string(),
            )));
        }

        let outcomes = self
            .services
            .orchestrator
            .run_bulk(params.requests, params.force)
            .await;

        Ok(BulkResponse { outcomes })
    }

    /// translation.status.v1
    pub async fn status(&self, params: StatusRequest) -> Result<StatusResponse, ErrorObjectOwned> {
        let documents = self
            .services
            .status
            .overview(&params)
            .await
            .map_err(to_rpc_error)?;

        Ok(StatusResponse { documents })
    }

    /// engine.check.v1
    ///
    /// Params are optional. A failed check is a normal response, not an RPC error.
    pub async fn check_engine(
        &self,
        _params: Option<EngineCheckRequest>,
    ) -> Result<EngineCheckResponse, ErrorObjectOwned> {
        Ok(match self.services.client.check_connection().await {
            Ok(()) => EngineCheckResponse {
                ok: true,
                message: "Connection OK".to_string(),
            },
            Err(e) => {
                warn!(error = %e, "Engine connection check failed");
                EngineCheckResponse {
                    ok: false,
                    message: e.to_string(),
                }
            }
        })
    }

    /// documents.put.v1
    pub async fn put_document(
        &self,
        params: PutDocumentRequest,
    ) -> Result<PutDocumentResponse, ErrorObjectOwned> {
        if params.key.trim().is_empty() {
            return Err(to_rpc_error(AppError::Validation(
                "key cannot be empty".to_string(),
            )));
        }
        if params.key.len() > MAX_DOCUMENT_KEY_LEN {
            return Err(to_rpc_error(AppError::Validation(format!(
                "key too long (max {} bytes)",
                MAX_DOCUMENT_KEY_LEN
            ))));
        }

        let mut doc = SourceDocument::new(params.key.as_str(), params.content);
        if let Some(created_at) = params.created_at {
            doc = doc.with_created_at(created_at);
        }

        let created = self
            .services
            .documents
            .upsert(&doc)
            .await
            .map_err(to_rpc_error)?;
        info!(key = %doc.key, len = doc.content.len(), created, "Source document stored");

        Ok(PutDocumentResponse {
            key: doc.key,
            stored: true,
            created,
        })
    }

    /// admin.maintenance.v1
    pub async fn maintenance(
        &self,
        params: MaintenanceRequest,
    ) -> Result<MaintenanceResponse, ErrorObjectOwned> {
        let report = self
            .services
            .maintenance
            .run_now(params.force_vacuum)
            .await
            .map_err(to_rpc_error)?;

        Ok(MaintenanceResponse { report })
    }
}
