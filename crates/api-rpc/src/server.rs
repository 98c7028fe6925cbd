//! JSON-RPC Server
//!
//! Serves the JSON-RPC 2.0 API over TCP on localhost.

use crate::handler::{RpcHandler, RpcServices};
use crate::types::{
    BulkRequest, EngineCheckRequest, MaintenanceRequest, ProgressRequest, PutDocumentRequest,
    RenderRequest, RunRequest, StatusRequest,
};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9627;

/// Method names, shared with the CLI
pub mod method {
    pub const RENDER: &str = "translation.render.v1";
    pub const RUN: &str = "translation.run.v1";
    pub const PROGRESS: &str = "translation.progress.v1";
    pub const BULK: &str = "translation.bulk.v1";
    pub const STATUS: &str = "translation.status.v1";
    pub const ENGINE_CHECK: &str = "engine.check.v1";
    pub const DOCUMENTS_PUT: &str = "documents.put.v1";
    pub const MAINTENANCE: &str = "admin.maintenance.v1";
}

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

macro_rules! register {
    ($module:expr, $handler:expr, $name:expr, $req:ty, $method:ident) => {{
        let handler = $handler.clone();
        $module
            .register_async_method($name, move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: $req = params.parse()?;
                    handler.$method(req).await
                }
            })
            .map_err(|e| e.to_string())?;
    }};
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, services: RpcServices) -> Self {
        Self {
            config,
            handler: Arc::new(RpcHandler::new(services)),
        }
    }

    /// Start the JSON-RPC server
    ///
    /// Port 0 picks a free port; the bound address is returned.
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle), String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        info!(
            host = %self.config.host,
            port = %self.config.port,
            "Starting JSON-RPC server on TCP"
        );

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;
        let local_addr = server
            .local_addr()
            .map_err(|e| format!("Failed to read bound address: {}", e))?;

        let mut module = RpcModule::new(());

        register!(module, self.handler, method::RENDER, RenderRequest, render);
        register!(module, self.handler, method::RUN, RunRequest, run);
        register!(module, self.handler, method::PROGRESS, ProgressRequest, progress);
        register!(module, self.handler, method::BULK, BulkRequest, bulk);
        register!(module, self.handler, method::STATUS, StatusRequest, status);
        register!(
            module,
            self.handler,
            method::ENGINE_CHECK,
            Option<EngineCheckRequest>,
            check_engine
        );
        register!(
            module,
            self.handler,
            method::DOCUMENTS_PUT,
            PutDocumentRequest,
            put_document
        );
        register!(
            module,
            self.handler,
            method::MAINTENANCE,
            MaintenanceRequest,
            maintenance
        );

        info!(addr = %local_addr, "JSON-RPC server started successfully");

        let handle = server.start(module);
        Ok((local_addr, handle))
    }
}
