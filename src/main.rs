//! Microsoft Graph MCP Server
//!
//! Entry point for the MCP server binary.
//! Implements MCP protocol over stdio using JSON-RPC 2.0.

use anyhow::Context;
use futures::StreamExt;
use msgraph_mcp::auth::TokenStore;
use msgraph_mcp::config::Config;
use msgraph_mcp::graph::{GraphClient, GraphQueryService};
use msgraph_mcp::mcp::{
    CallToolParams, CallToolResult, GraphMcpServer, InitializeResult, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, Stdout};
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging to stderr (MCP uses stdout for protocol)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Microsoft Graph MCP Server...");

    let config = Config::load_default().context("loading configuration")?;
    let runtime_config = config.to_runtime().context("validating configuration")?;

    tracing::info!(
        "Configured for {} with token file {}",
        runtime_config.endpoint,
        runtime_config.token_path.display()
    );

    let auth = Arc::new(TokenStore::new(runtime_config.token_path.clone()));

    let client = GraphClient::new(
        auth,
        &runtime_config.endpoint,
        runtime_config.max_retries,
        runtime_config.retry_delay_ms,
        runtime_config.timeout,
    )
    .context("building HTTP client")?;

    let server = GraphMcpServer::new(GraphQueryService::new(Arc::new(client)));

    tracing::info!("MCP Server ready, listening on stdio...");

    run_stdio_loop(server).await
}

async fn run_stdio_loop(server: GraphMcpServer) -> anyhow::Result<()> {
    let mut lines = FramedRead::new(tokio::io::stdin(), LinesCodec::new());
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next().await {
        let line = line.context("reading stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        tracing::debug!("Received: {}", line);

        let request: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(req) => req,
            Err(e) => {
                let error_response =
                    JsonRpcResponse::error(None, -32700, &format!("Parse error: {}", e));
                send_response(&mut stdout, &error_response).await?;
                continue;
            }
        };

        if request.is_notification() {
            tracing::debug!("Notification: {}", request.method);
            continue;
        }

        let response = handle_request(&server, request).await;
        send_response(&mut stdout, &response).await?;
    }

    tracing::info!("stdin closed, shutting down");
    Ok(())
}

async fn handle_request(server: &GraphMcpServer, request: JsonRpcRequest) -> JsonRpcResponse {
    let id = request.id.clone();

    match request.method.as_str() {
        "initialize" => success(
            id,
            &InitializeResult::new("msgraph-mcp", env!("CARGO_PKG_VERSION")),
        ),

        "tools/list" => {
            let tools = server.get_tools();
            success(id, &ListToolsResult { tools })
        }

        "tools/call" => {
            let params: CallToolParams = match request.params {
                Some(p) => match serde_json::from_value(p) {
                    Ok(params) => params,
                    Err(e) => {
                        return JsonRpcResponse::error(id, -32602, &format!("Invalid params: {}", e));
                    }
                },
                None => {
                    return JsonRpcResponse::error(id, -32602, "Missing params");
                }
            };

            let args = params.arguments.unwrap_or_default();
            let result: CallToolResult = server.call_tool(&params.name, &args).await;
            success(id, &result)
        }

        "ping" => JsonRpcResponse::success(id, serde_json::json!({})),

        _ => JsonRpcResponse::error(id, -32601, &format!("Method not found: {}", request.method)),
    }
}

fn success<T: Serialize>(id: Option<serde_json::Value>, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(id, -32603, &format!("Internal error: {}", e)),
    }
}

async fn send_response(stdout: &mut Stdout, response: &JsonRpcResponse) -> anyhow::Result<()> {
    let mut json = serde_json::to_string(response)?;
    tracing::debug!("Sending: {}", json);
    json.push('\n');
    stdout.write_all(json.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}
