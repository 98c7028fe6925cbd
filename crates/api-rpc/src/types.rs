//! RPC Request/Response Types
//!
//! Defines the JSON-RPC method parameters and results.

use serde::{Deserialize, Serialize};
use transcache_core::application::{BulkOutcome, DocumentStatus, StatusQuery};
use transcache_core::domain::{DocumentKey, JobResult, TranslationRequest};
use transcache_core::port::MaintenanceReport;

/// Parameters shared by render and run
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentParams {
    pub document_type: String,
    pub source_lang: String,
    #[serde(default)]
    pub country: Option<String>,
    pub target_lang: String,
}

impl DocumentParams {
    pub fn to_request(&self) -> TranslationRequest {
        TranslationRequest::new(
            self.document_type.as_str(),
            self.source_lang.as_str(),
            self.country.as_deref(),
            self.target_lang.as_str(),
        )
    }
}

/// translation.render.v1 - Render a document for a page
#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    #[serde(flatten)]
    pub document: DocumentParams,
    /// Start a triggered job without the deferral delay
    #[serde(default)]
    pub immediate: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderResponse {
    /// translated | not_found | in_progress | started
    pub status: String,
    pub html: String,
}

/// translation.run.v1 - Run a job inline
#[derive(Debug, Deserialize)]
pub struct RunRequest {
    #[serde(flatten)]
    pub document: DocumentParams,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResponse {
    /// false when a progress poller already received the result
    pub delivered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
}

/// translation.progress.v1 - Poll a job
#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    pub document_type: String,
    pub target_lang: String,
}

impl ProgressRequest {
    pub fn key(&self) -> DocumentKey {
        DocumentKey::new(self.document_type.as_str(), self.target_lang.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressResponse {
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
}

/// translation.bulk.v1 - Run several jobs one after another
#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub requests: Vec<TranslationRequest>,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkResponse {
    pub outcomes: Vec<BulkOutcome>,
}

/// translation.status.v1 - Status overview
pub type StatusRequest = StatusQuery;

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub documents: Vec<DocumentStatus>,
}

/// engine.check.v1 - Verify the engine credential
#[derive(Debug, Deserialize)]
pub struct EngineCheckRequest {
    // No parameters needed
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineCheckResponse {
    pub ok: bool,
    pub message: String,
}

/// documents.put.v1 - Seed a source document
#[derive(Debug, Deserialize)]
pub struct PutDocumentRequest {
    pub key: String,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PutDocumentResponse {
    pub key: String,
    pub stored: bool,
    /// true if the key did not exist before
    pub created: bool,
}

/// admin.maintenance.v1 - Run manual maintenance
#[derive(Debug, Deserialize)]
pub struct MaintenanceRequest {
    #[serde(default)]
    pub force_vacuum: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MaintenanceResponse {
    #[serde(flatten)]
    pub report: MaintenanceReport,
}
