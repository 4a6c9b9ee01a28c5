//! HTTP transport — axum router and server lifecycle.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use super::server::{ResearchServer, SharedServer};
use super::types::{JsonRpcRequest, JsonRpcResponse};
use crate::types::{RPC_INVALID_REQUEST, RPC_PARSE_ERROR};

/// Build the router for `server`.
///
/// `POST /mcp` takes one JSON-RPC request; the remaining routes are `GET`
/// metadata for clients that do not speak MCP.
pub fn router(server: SharedServer) -> Router {
    Router::new()
        .route("/mcp", post(mcp))
        .route("/handshake", get(handshake))
        .route("/mcp/handshake", get(handshake))
        .route("/list", get(list))
        .route("/mcp/list", get(list))
        .route("/health", get(health))
        .with_state(server)
}

async fn mcp(State(server): State<SharedServer>, body: Bytes) -> Response {
    let value: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(event = "rpc_parse_failed", error = %e);
            let response =
                JsonRpcResponse::error(None, RPC_PARSE_ERROR, format!("Parse error: {}", e));
            return Json(response).into_response();
        }
    };

    let id = value.get("id").cloned();
    let request: JsonRpcRequest = match serde_json::from_value(value) {
        Ok(r) => r,
        Err(e) => {
            let response = JsonRpcResponse::error(
                id,
                RPC_INVALID_REQUEST,
                format!("Invalid request: {}", e),
            );
            return Json(response).into_response();
        }
    };

    match server.handle(request).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

async fn handshake(State(server): State<SharedServer>) -> impl IntoResponse {
    tracing::info!(event = "handshake_served", name = %server.name());
    Json(server.handshake())
}

async fn list(State(server): State<SharedServer>) -> impl IntoResponse {
    let list = server.tool_list();
    tracing::info!(event = "tool_list_served", tools = list.tools.len());
    Json(list)
}

async fn health(State(server): State<SharedServer>) -> impl IntoResponse {
    let store = server.base().store();
    Json(json!({
        "status": "ok",
        "flavour": server.flavour().to_string(),
        "records": store.len(),
        "loaded_at": store.loaded_at().to_rfc3339(),
    }))
}

/// HTTP server wrapping one research server.
#[derive(Debug)]
pub struct HttpServer {
    server: SharedServer,
    addr: SocketAddr,
    cancel: CancellationToken,
}

impl HttpServer {
    pub fn new(server: ResearchServer, addr: SocketAddr) -> Self {
        Self {
            server: Arc::new(server),
            addr,
            cancel: CancellationToken::new(),
        }
    }

    pub fn server(&self) -> &SharedServer {
        &self.server
    }

    /// Bind the configured address and serve until cancelled.
    pub async fn serve(&self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        self.serve_listener(listener).await
    }

    /// Serve on an already-bound listener until cancelled.
    pub async fn serve_listener(&self, listener: TcpListener) -> std::io::Result<()> {
        let local = listener.local_addr()?;
        tracing::info!(
            event = "server_listening",
            addr = %local,
            flavour = %self.server.flavour(),
        );

        let cancel = self.cancel.clone();
        axum::serve(listener, router(self.server.clone()))
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await?;

        tracing::info!(event = "server_stopped", addr = %local);
        Ok(())
    }

    /// Request graceful shutdown.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Token that stops the server when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}
