//! JSON-RPC round trips against a live server on an ephemeral port

mod common;

use common::Engine;
use jsonrpsee::core::client::{ClientT, Error as ClientError};
use jsonrpsee::core::params::ObjectParams;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::server::ServerHandle;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use transcache_api_rpc::{method, RpcServer, RpcServerConfig, RpcServices};
use transcache_core::application::{MaintenanceScheduler, StatusService};
use transcache_core::port::MaintenanceConfig;

struct Running {
    engine: Engine,
    client: HttpClient,
    _handle: ServerHandle,
}

async fn start() -> Running {
    let engine = Engine::with_default_client().await;
    let (render, _scheduler) = engine.render_service(Duration::ZERO);
    let status: StatusService = engine.status_service();

    let server = RpcServer::new(
        RpcServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        RpcServices {
            orchestrator: engine.orchestrator.clone(),
            render: Arc::new(render),
            status: Arc::new(status),
            progress: engine.progress.clone(),
            client: engine.client.clone(),
            documents: engine.documents.clone(),
            maintenance: Arc::new(MaintenanceScheduler::new(
                engine.maintenance.clone(),
                MaintenanceConfig::default(),
                Duration::from_secs(3600),
            )),
        },
    );
    let (addr, handle) = server.start().await.unwrap();
    let client = HttpClientBuilder::default()
        .build(format!("http://{}", addr))
        .unwrap();

    Running {
        engine,
        client,
        _handle: handle,
    }
}

fn object(value: Value) -> ObjectParams {
    let mut params = ObjectParams::new();
    if let Value::Object(map) = value {
        for (k, v) in map {
            params.insert(&k, v).unwrap();
        }
    }
    params
}

async fn call(client: &HttpClient, name: &str, params: Value) -> Result<Value, ClientError> {
    client.request(name, object(params)).await
}

fn agb_en() -> Value {
    json!({
        "document_type": "agb",
        "source_lang": "de",
        "country": "CH",
        "target_lang": "en",
    })
}

#[tokio::test]
async fn test_seed_render_poll_serve() {
    let rpc = start().await;

    let put = call(
        &rpc.client,
        method::DOCUMENTS_PUT,
        json!({ "key": "doc_de_CH_agb", "content": "<p>AGB</p>", "created_at": 1000 }),
    )
    .await
    .unwrap();
    assert_eq!(put["created"], true);

    let mut params = agb_en();
    params["immediate"] = json!(true);
    let render = call(&rpc.client, method::RENDER, params.clone()).await.unwrap();
    assert_eq!(render["status"], "started");

    let progress_params = json!({ "document_type": "agb", "target_lang": "en" });
    let mut result = Value::Null;
    for _ in 0..200 {
        let progress = call(&rpc.client, method::PROGRESS, progress_params.clone())
            .await
            .unwrap();
        if progress["done"] == true {
            result = progress["result"].clone();
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let logs = result["success"]["logs"].as_array().expect("success result");
    assert_eq!(logs.last().unwrap(), "Saved translation successfully.");

    let served = call(&rpc.client, method::RENDER, params).await.unwrap();
    assert_eq!(served["status"], "translated");
    assert!(served["html"].as_str().unwrap().contains("[en] <p>AGB</p>"));

    let status = call(
        &rpc.client,
        method::STATUS,
        json!({
            "document_types": ["agb"],
            "source_lang": "de",
            "country": "CH",
            "target_langs": ["en", "fr"],
        }),
    )
    .await
    .unwrap();
    let doc = &status["documents"][0];
    assert_eq!(doc["source_key"], "doc_de_CH_agb");
    assert_eq!(doc["created_at"], 1000);
    assert_eq!(doc["translations"][0]["status"], "up_to_date");
    assert_eq!(doc["translations"][1]["status"], "missing");

    let report = call(&rpc.client, method::MAINTENANCE, json!({ "force_vacuum": false }))
        .await
        .unwrap();
    assert_eq!(report["stats"]["cache_entries"], 1);
    assert_eq!(report["stats"]["source_documents"], 1);

    assert_eq!(rpc.engine.client.call_count(), 1);
}

#[tokio::test]
async fn test_run_returns_claimed_result() {
    let rpc = start().await;
    rpc.engine.put_source("doc_de_agb", "<p>AGB</p>").await;

    let mut params = agb_en();
    params["force"] = json!(false);
    let run = call(&rpc.client, method::RUN, params).await.unwrap();

    assert_eq!(run["delivered"], true);
    assert!(run["result"]["success"].is_object());

    // Nothing left for a poller
    let progress = call(
        &rpc.client,
        method::PROGRESS,
        json!({ "document_type": "agb", "target_lang": "en" }),
    )
    .await
    .unwrap();
    assert_eq!(progress, json!({ "done": false, "logs": [] }));
}

#[tokio::test]
async fn test_errors_carry_code_and_kind() {
    let rpc = start().await;

    let err = call(&rpc.client, method::RUN, agb_en()).await.unwrap_err();
    match err {
        ClientError::Call(obj) => {
            assert_eq!(obj.code(), 4001);
            let data: Value = serde_json::from_str(obj.data().unwrap().get()).unwrap();
            assert_eq!(data["kind"], "source_not_found");
        }
        other => panic!("expected call error, got {:?}", other),
    }

    let mut bad = agb_en();
    bad["document_type"] = json!("agb/../x");
    match call(&rpc.client, method::RENDER, bad).await.unwrap_err() {
        ClientError::Call(obj) => assert_eq!(obj.code(), 4000),
        other => panic!("expected call error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_engine_check_and_bulk() {
    let rpc = start().await;
    rpc.engine.put_source("doc_de_impressum", "<p>Hallo</p>").await;

    let check: Value = rpc
        .client
        .request(method::ENGINE_CHECK, ObjectParams::new())
        .await
        .unwrap();
    assert_eq!(check["ok"], true);

    let bulk = call(
        &rpc.client,
        method::BULK,
        json!({
            "requests": [
                { "document_type": "impressum", "source_lang": "de", "target_lang": "en" },
                { "document_type": "datenschutz", "source_lang": "de", "target_lang": "en" },
            ],
            "force": false,
        }),
    )
    .await
    .unwrap();

    let outcomes = bulk["outcomes"].as_array().unwrap();
    assert_eq!(outcomes[0]["ok"], true);
    assert_eq!(outcomes[1]["ok"], false);
    assert!(outcomes[1]["message"]
        .as_str()
        .unwrap()
        .starts_with("Source document not found"));
}
