//! Transcache CLI - operator interface to the Transcache daemon

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9627";
const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "transcache")]
#[command(about = "Transcache translation cache CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "TRANSCACHE_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

/// Identifies one (document, target language) pair
#[derive(Args, Clone)]
struct DocumentArgs {
    /// Document type (e.g., impressum, agb, datenschutz)
    #[arg(short, long = "type")]
    document_type: String,

    /// Source language
    #[arg(short, long, default_value = "de")]
    source: String,

    /// Source country (e.g., CH)
    #[arg(short, long)]
    country: Option<String>,

    /// Target language
    #[arg(short, long)]
    target: String,
}

impl DocumentArgs {
    fn params(&self) -> Value {
        json!({
            "document_type": self.document_type,
            "source_lang": self.source,
            "country": self.country,
            "target_lang": self.target,
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Render a document the way a page would
    Render {
        #[command(flatten)]
        doc: DocumentArgs,

        /// Start a needed translation without the deferral delay
        #[arg(long)]
        immediate: bool,
    },

    /// Translate now and follow progress
    Run {
        #[command(flatten)]
        doc: DocumentArgs,

        /// Discard the cached translation and break a held lock
        #[arg(long)]
        force: bool,
    },

    /// Poll progress of a running job
    Progress {
        /// Document type
        #[arg(short, long = "type")]
        document_type: String,

        /// Target language
        #[arg(short, long)]
        target: String,
    },

    /// Run every document type x target language combination
    Bulk {
        /// Document types (repeatable)
        #[arg(short = 'd', long = "type", required = true)]
        document_types: Vec<String>,

        /// Target languages (repeatable)
        #[arg(short, long = "target", required = true)]
        targets: Vec<String>,

        #[arg(short, long, default_value = "de")]
        source: String,

        #[arg(short, long)]
        country: Option<String>,

        #[arg(long)]
        force: bool,
    },

    /// Show translation status per document and language
    Status {
        /// Document types (repeatable)
        #[arg(short = 'd', long = "type", required = true)]
        document_types: Vec<String>,

        /// Target languages (repeatable)
        #[arg(short, long = "target", required = true)]
        targets: Vec<String>,

        #[arg(short, long, default_value = "de")]
        source: String,

        #[arg(short, long)]
        country: Option<String>,
    },

    /// Verify the translation engine credential
    Check,

    /// Store a source document from a file
    PutDocument {
        /// Store key (e.g., doc_de_CH_impressum)
        key: String,

        /// HTML file to read
        file: PathBuf,
    },

    /// Run maintenance operations
    Maintenance {
        /// Force VACUUM even if not needed
        #[arg(long)]
        force_vacuum: bool,
    },
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: u64,
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    data: Option<Value>,
}

struct RpcClient {
    http: reqwest::Client,
    url: String,
}

impl RpcClient {
    fn new(url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            url,
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id: 1,
        };

        let response: JsonRpcResponse = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .context("Failed to connect to daemon")?
            .json()
            .await
            .context("Failed to parse response")?;

        if let Some(error) = response.error {
            let kind = error
                .data
                .as_ref()
                .and_then(|d| d.get("kind"))
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            anyhow::bail!("RPC error ({}, {}): {}", error.code, kind, error.message);
        }

        response
            .result
            .ok_or_else(|| anyhow::anyhow!("No result in response"))
    }
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Document")]
    document: String,
    #[tabled(rename = "Source key")]
    source_key: String,
    #[tabled(rename = "Length")]
    length: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Updated (epoch ms)")]
    updated: String,
}

/// Flatten the status overview into one row per language
fn status_rows(documents: &[Value]) -> Vec<StatusRow> {
    let mut rows = Vec::new();
    for doc in documents {
        let document = doc["document_type"].as_str().unwrap_or_default().to_string();
        let Some(source_key) = doc["source_key"].as_str() else {
            rows.push(StatusRow {
                document,
                source_key: "-".to_string(),
                length: "-".to_string(),
                target: "-".to_string(),
                status: "source missing".to_string(),
                updated: "-".to_string(),
            });
            continue;
        };

        for tr in doc["translations"].as_array().into_iter().flatten() {
            rows.push(StatusRow {
                document: document.clone(),
                source_key: source_key.to_string(),
                length: doc["source_len"].to_string(),
                target: tr["target_lang"].as_str().unwrap_or_default().to_uppercase(),
                status: tr["status"].as_str().unwrap_or_default().to_string(),
                updated: tr
                    .get("updated_at")
                    .map(Value::to_string)
                    .unwrap_or_else(|| "-".to_string()),
            });
        }
    }
    rows
}

fn colored_status(status: &str) -> String {
    match status {
        "up_to_date" => status.green().to_string(),
        "stale" => status.yellow().to_string(),
        "processing" => status.cyan().to_string(),
        _ => status.red().to_string(),
    }
}

fn print_result(result: &Value) {
    if let Some(success) = result.get("success") {
        for line in success["logs"].as_array().into_iter().flatten() {
            println!("  {}", line.as_str().unwrap_or_default());
        }
        println!("{}", "✓ Translation finished".green().bold());
    } else if let Some(failure) = result.get("failure") {
        println!(
            "{} {} ({})",
            "✗".red().bold(),
            failure["message"].as_str().unwrap_or_default().red(),
            failure["kind"].as_str().unwrap_or_default()
        );
    }
}

/// Run a job and stream its progress lines until the run call returns
async fn run_with_progress(client: &RpcClient, doc: &DocumentArgs, force: bool) -> Result<()> {
    let mut params = doc.params();
    params["force"] = json!(force);
    let progress_params = json!({
        "document_type": doc.document_type,
        "target_lang": doc.target,
    });

    let run = client.call("translation.run.v1", params);
    tokio::pin!(run);

    let mut printed = 0usize;
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    loop {
        tokio::select! {
            outcome = &mut run => {
                let response = outcome?;
                match response.get("result") {
                    Some(result) if response["delivered"].as_bool().unwrap_or(false) => {
                        print_result(result)
                    }
                    _ => println!("{}", "✓ Translation finished".green().bold()),
                }
                return Ok(());
            }
            _ = ticker.tick() => {
                let Ok(progress) = client.call("translation.progress.v1", progress_params.clone()).await else {
                    continue;
                };
                if progress["done"].as_bool().unwrap_or(false) {
                    // The poll claimed the result; the run call only confirms completion
                    if let Some(result) = progress.get("result") {
                        print_result(result);
                    }
                    let _ = (&mut run).await;
                    return Ok(());
                }
                let logs = progress["logs"].as_array().cloned().unwrap_or_default();
                for line in logs.iter().skip(printed) {
                    println!("  {}", line.as_str().unwrap_or_default().dimmed());
                }
                printed = printed.max(logs.len());
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = RpcClient::new(cli.rpc_url.clone());

    match cli.command {
        Commands::Render { doc, immediate } => {
            let mut params = doc.params();
            params["immediate"] = json!(immediate);

            let result = client.call("translation.render.v1", params).await?;
            let status = result["status"].as_str().unwrap_or_default();
            println!("{} {}", "Status:".bold(), colored_status(status));
            println!();
            println!("{}", result["html"].as_str().unwrap_or_default());
        }

        Commands::Run { doc, force } => {
            println!(
                "{}",
                format!("Translating {} -> {}", doc.document_type, doc.target.to_uppercase())
                    .cyan()
                    .bold()
            );
            if let Err(e) = run_with_progress(&client, &doc, force).await {
                println!("{} {}", "✗".red().bold(), e);
                std::process::exit(1);
            }
        }

        Commands::Progress {
            document_type,
            target,
        } => {
            let params = json!({ "document_type": document_type, "target_lang": target });
            let progress = client.call("translation.progress.v1", params).await?;

            if progress["done"].as_bool().unwrap_or(false) {
                if let Some(result) = progress.get("result") {
                    print_result(result);
                }
            } else {
                let logs = progress["logs"].as_array().cloned().unwrap_or_default();
                if logs.is_empty() {
                    println!("{}", "No progress recorded".yellow());
                }
                for line in logs {
                    println!("  {}", line.as_str().unwrap_or_default());
                }
            }
        }

        Commands::Bulk {
            document_types,
            targets,
            source,
            country,
            force,
        } => {
            let requests: Vec<Value> = document_types
                .iter()
                .flat_map(|doc| {
                    let (source, country) = (&source, &country);
                    targets.iter().map(move |target| {
                        json!({
                            "document_type": doc,
                            "source_lang": source,
                            "country": country,
                            "target_lang": target,
                        })
                    })
                })
                .collect();
            println!(
                "{}",
                format!("Running {} translations...", requests.len()).cyan().bold()
            );

            let result = client
                .call(
                    "translation.bulk.v1",
                    json!({ "requests": requests, "force": force }),
                )
                .await?;

            for outcome in result["outcomes"].as_array().into_iter().flatten() {
                let mark = if outcome["ok"].as_bool().unwrap_or(false) {
                    "✓".green()
                } else {
                    "✗".red()
                };
                println!(
                    "  {} {} -> {}: {}",
                    mark,
                    outcome["document_type"].as_str().unwrap_or_default(),
                    outcome["target_lang"].as_str().unwrap_or_default().to_uppercase(),
                    outcome["message"].as_str().unwrap_or_default()
                );
            }
        }

        Commands::Status {
            document_types,
            targets,
            source,
            country,
        } => {
            let params = json!({
                "document_types": document_types,
                "source_lang": source,
                "country": country,
                "target_langs": targets,
            });
            let result = client.call("translation.status.v1", params).await?;
            let documents = result["documents"].as_array().cloned().unwrap_or_default();

            let mut rows = status_rows(&documents);
            for row in &mut rows {
                row.status = colored_status(&row.status);
            }
            println!("{}", Table::new(rows));
        }

        Commands::Check => {
            let result = client.call("engine.check.v1", json!({})).await?;
            let message = result["message"].as_str().unwrap_or_default();
            if result["ok"].as_bool().unwrap_or(false) {
                println!("{} {}", "✓".green().bold(), message.green());
            } else {
                println!("{} {}", "✗".red().bold(), message.red());
                std::process::exit(1);
            }
        }

        Commands::PutDocument { key, file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let result = client
                .call(
                    "documents.put.v1",
                    json!({ "key": key, "content": content }),
                )
                .await?;
            let verb = if result["created"].as_bool().unwrap_or(false) {
                "created"
            } else {
                "updated"
            };
            println!(
                "{}",
                format!("✓ Document {} {} ({} bytes)", key, verb, content.len())
                    .green()
                    .bold()
            );
        }

        Commands::Maintenance { force_vacuum } => {
            println!("{}", "Running maintenance...".cyan().bold());
            println!();

            if force_vacuum {
                println!("  {} Force VACUUM enabled", "•".bold());
            }

            let params = json!({ "force_vacuum": force_vacuum });

            match client.call("admin.maintenance.v1", params).await {
                Ok(result) => {
                    println!("  ✓ Maintenance completed");
                    println!();
                    println!(
                        "  {} {} expired entries purged",
                        "✓".green(),
                        result["purged_entries"]
                    );
                    let reclaimed = result["reclaimed_mb"].as_f64().unwrap_or(0.0);
                    if reclaimed > 0.0 {
                        println!("  {} VACUUM reclaimed {:.2} MB", "✓".green(), reclaimed);
                    } else {
                        println!("  ○ VACUUM skipped or nothing reclaimed");
                    }
                    let stats = &result["stats"];
                    println!();
                    println!("  {} {:.2} MB", "DB Size:".bold(), stats["db_size_mb"].as_f64().unwrap_or(0.0));
                    println!("  {} {}", "Cached translations:".bold(), stats["cache_entries"]);
                    println!("  {} {}", "Source documents:".bold(), stats["source_documents"]);
                }
                Err(e) => {
                    println!("  {} Maintenance failed: {}", "✗".red(), e);
                }
            }
        }
    }

    Ok(())
}
