//! Research server — JSON-RPC request handling and tool dispatch.
//!
//! One `ResearchServer` per process. It is immutable after construction and
//! shared behind an `Arc`; no request takes a lock.

use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use super::types::*;
use crate::evaluate::FunderResearch;
use crate::observability::query_preview;
use crate::research::ResearchBase;
use crate::tools::{definitions, ToolCatalog};
use crate::types::{
    resolve_cupcake_records_path, Config, Error, FunderConfig, InvocationId, ResearchConfig,
    Result, RPC_INTERNAL_ERROR, RPC_INVALID_PARAMS, RPC_INVALID_REQUEST, RPC_METHOD_NOT_FOUND,
};

/// Which research server to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavour {
    /// Generic records with named search methods.
    General,
    /// Cupcake orders, keyword search only.
    Cupcake,
    /// Funder records with packet evaluation.
    Funder,
}

impl Flavour {
    /// Prefix of the per-invocation log event names.
    fn event_prefix(self) -> &'static str {
        match self {
            Flavour::General => "tool",
            Flavour::Cupcake => "cupcake",
            Flavour::Funder => "funder",
        }
    }
}

impl fmt::Display for Flavour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Flavour::General => "general",
            Flavour::Cupcake => "cupcake",
            Flavour::Funder => "funder",
        };
        f.write_str(name)
    }
}

impl FromStr for Flavour {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "general" => Ok(Flavour::General),
            "cupcake" => Ok(Flavour::Cupcake),
            "funder" => Ok(Flavour::Funder),
            other => Err(Error::validation(format!(
                "unknown flavour '{}', expected one of: general, cupcake, funder",
                other
            ))),
        }
    }
}

/// An MCP research server: metadata, tool catalog and the data behind it.
#[derive(Debug)]
pub struct ResearchServer {
    flavour: Flavour,
    name: String,
    instructions: String,
    base: ResearchBase,
    funder: Option<FunderResearch>,
    catalog: ToolCatalog,
}

impl ResearchServer {
    /// `search(query, method?)` and `fetch` over generic records.
    pub fn general(config: ResearchConfig) -> Self {
        let base = ResearchBase::new(config);
        let mut catalog = ToolCatalog::new();
        register(
            &mut catalog,
            definitions::search_tool(
                "Search records using the given method.",
                &base.method_names(),
            ),
        );
        register(&mut catalog, definitions::fetch_tool("Fetch records by ID."));
        Self::assemble(Flavour::General, base, None, catalog)
    }

    /// Cupcake orders. `CUPCAKE_RECORDS_PATH` overrides `records_path`.
    pub fn cupcake(records_path: Option<&Path>) -> Self {
        Self::cupcake_from(ResearchConfig {
            records_path: records_path.map(Path::to_path_buf),
            ..ResearchConfig::default()
        })
    }

    /// Cupcake flavour keeping the limits and default method of `research`.
    /// Name and instructions are fixed; `CUPCAKE_RECORDS_PATH` overrides
    /// `research.records_path`.
    pub fn cupcake_from(mut research: ResearchConfig) -> Self {
        research.name = "Cupcake MCP".to_string();
        research.instructions = "Search cupcake orders".to_string();
        research.records_path = Some(resolve_cupcake_records_path(
            research.records_path.as_deref(),
            |key| std::env::var(key).ok(),
        ));
        Self::cupcake_with(research)
    }

    /// Cupcake flavour over an explicit config (no environment lookup).
    pub fn cupcake_with(config: ResearchConfig) -> Self {
        let base = ResearchBase::new(config);
        if base.store().is_empty() {
            tracing::warn!(
                event = "cupcake_records_empty",
                path = ?base.config().records_path,
            );
        }
        let mut catalog = ToolCatalog::new();
        register(
            &mut catalog,
            definitions::search_tool("Search for cupcake orders via keyword matching.", &[]),
        );
        register(
            &mut catalog,
            definitions::fetch_tool("Fetch cupcake orders by ID."),
        );
        Self::assemble(Flavour::Cupcake, base, None, catalog)
    }

    /// Funder records: search, fetch and the packet evaluation tool.
    pub fn funder(research: ResearchConfig, funder: FunderConfig) -> Self {
        Self::with_funder(FunderResearch::new(research, funder))
    }

    pub fn with_funder(funder: FunderResearch) -> Self {
        let base = funder.base().clone();
        let mut catalog = ToolCatalog::new();
        register(
            &mut catalog,
            definitions::search_tool("Search funder records.", &base.method_names()),
        );
        register(&mut catalog, definitions::fetch_tool("Fetch funder records by ID."));
        register(&mut catalog, definitions::evaluate_tool());
        Self::assemble(Flavour::Funder, base, Some(funder), catalog)
    }

    /// Build the flavour named by `flavour` from a full config.
    pub fn from_config(flavour: Flavour, config: &Config) -> Self {
        match flavour {
            Flavour::General => Self::general(config.research.clone()),
            Flavour::Cupcake => Self::cupcake_from(config.research.clone()),
            Flavour::Funder => Self::funder(config.research.clone(), config.funder.clone()),
        }
    }

    fn assemble(
        flavour: Flavour,
        base: ResearchBase,
        funder: Option<FunderResearch>,
        catalog: ToolCatalog,
    ) -> Self {
        tracing::info!(
            event = "server_created",
            flavour = %flavour,
            name = %base.config().name,
            records = base.store().len(),
            tools = catalog.len(),
        );
        Self {
            flavour,
            name: base.config().name.clone(),
            instructions: base.config().instructions.clone(),
            base,
            funder,
            catalog,
        }
    }

    pub fn flavour(&self) -> Flavour {
        self.flavour
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn base(&self) -> &ResearchBase {
        &self.base
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Registered tools as name/description pairs, sorted by name.
    pub fn tool_summaries(&self) -> Vec<ToolSummary> {
        self.catalog
            .list_entries()
            .into_iter()
            .map(|entry| ToolSummary {
                name: entry.name.clone(),
                description: entry.description.trim().to_string(),
            })
            .collect()
    }

    pub fn handshake(&self) -> Handshake {
        Handshake {
            name: self.name.clone(),
            instructions: self.instructions.clone(),
            endpoints: Endpoints {
                mcp: "/mcp".to_string(),
                list: "/list".to_string(),
            },
            tools: self.tool_summaries(),
        }
    }

    pub fn tool_list(&self) -> ToolList {
        ToolList {
            tools: self.tool_summaries(),
        }
    }

    // ─── JSON-RPC ───────────────────────────────────────────────

    /// Handle a single JSON-RPC request; `None` for notifications.
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let id = request.id.clone();

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                id,
                RPC_INVALID_REQUEST,
                "Invalid request: jsonrpc must be \"2.0\"",
            ));
        }

        if request.method.starts_with("notifications/") {
            tracing::debug!(event = "notification_received", method = %request.method);
            return None;
        }

        match request.method.as_str() {
            "initialize" => {
                tracing::info!(event = "client_initializing", params = %request.params);
                let result = InitializeResult {
                    protocol_version: PROTOCOL_VERSION.to_string(),
                    capabilities: ServerCapabilities {
                        tools: ToolCapability { list_changed: false },
                    },
                    server_info: ServerInfo {
                        name: self.name.clone(),
                        version: env!("CARGO_PKG_VERSION").to_string(),
                    },
                    instructions: self.instructions.clone(),
                };
                Some(to_response(id, &result))
            }

            "ping" => Some(JsonRpcResponse::success(id, json!({}))),

            "tools/list" => {
                let tools = self
                    .catalog
                    .list_entries()
                    .into_iter()
                    .map(|entry| ToolDefinition {
                        name: entry.name.clone(),
                        description: entry.description.clone(),
                        input_schema: entry.input_schema(),
                    })
                    .collect();
                Some(to_response(id, &ToolsListResult { tools }))
            }

            "tools/call" => {
                let params: ToolsCallParams = match serde_json::from_value(request.params) {
                    Ok(p) => p,
                    Err(e) => {
                        return Some(JsonRpcResponse::error(
                            id,
                            RPC_INVALID_PARAMS,
                            format!("Invalid params: {}", e),
                        ));
                    }
                };
                if !self.catalog.has_tool(&params.name) {
                    return Some(JsonRpcResponse::error(
                        id,
                        RPC_INVALID_PARAMS,
                        format!("Unknown tool: {}", params.name),
                    ));
                }
                let result = self.call_tool(&params.name, params.arguments).await;
                Some(to_response(id, &result))
            }

            _ => {
                tracing::warn!(event = "unknown_method", method = %request.method);
                Some(JsonRpcResponse::error(
                    id,
                    RPC_METHOD_NOT_FOUND,
                    format!("Method not found: {}", request.method),
                ))
            }
        }
    }

    // ─── Tools ──────────────────────────────────────────────────

    /// Run one tool call. Failures become `isError` results, never panics.
    ///
    /// Emits exactly one `<prefix>_<tool>_succeeded` or `_failed` event.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> ToolsCallResult {
        let invocation = InvocationId::new();
        let started = Instant::now();
        let prefix = self.flavour.event_prefix();

        match self.dispatch(name, arguments).await {
            Ok((value, meta)) => {
                tracing::info!(
                    event = %format!("{prefix}_{name}_succeeded"),
                    tool = name,
                    invocation_id = %invocation,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    metadata = %meta,
                );
                ToolsCallResult::json(value)
            }
            Err(err) => {
                tracing::warn!(
                    event = %format!("{prefix}_{name}_failed"),
                    tool = name,
                    invocation_id = %invocation,
                    kind = err.kind(),
                    error = %err,
                );
                ToolsCallResult::error(err.to_string())
            }
        }
    }

    /// Returns the tool result and the metadata logged with it.
    async fn dispatch(&self, name: &str, mut arguments: Value) -> Result<(Value, Value)> {
        let errors = self.catalog.validate_params(name, &arguments)?;
        if !errors.is_empty() {
            return Err(Error::validation(errors.join("; ")));
        }
        self.catalog.fill_defaults(name, &mut arguments)?;

        match name {
            definitions::SEARCH => self.search(&arguments),
            definitions::FETCH => self.fetch(&arguments),
            definitions::EVALUATE => self.evaluate(&arguments).await,
            _ => Err(Error::not_found(format!("Unknown tool: {}", name))),
        }
    }

    fn search(&self, args: &Value) -> Result<(Value, Value)> {
        let query = str_field(args, "query")?;
        let method = opt_str_field(args, "method");
        let hits = self.base.search(&query, method.as_deref())?;

        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        let meta = json!({
            "method": method.unwrap_or_else(|| self.base.default_method().to_string()),
            "query_preview": query_preview(&query),
            "result_count": hits.len(),
        });
        Ok((json!({ "ids": ids, "hits": hits }), meta))
    }

    fn fetch(&self, args: &Value) -> Result<(Value, Value)> {
        if let Some(ids) = string_list_field(args, "ids") {
            let records = self.base.fetch(&ids)?;
            let meta = json!({ "requested": ids.len(), "found": records.len() });
            return Ok((json!({ "records": records }), meta));
        }
        if let Some(id) = opt_str_field(args, "id") {
            let record = self.base.fetch_one(&id)?;
            let meta = json!({ "id": record.id });
            let records = BTreeMap::from([(record.id.clone(), record)]);
            return Ok((json!({ "records": records }), meta));
        }
        Err(Error::validation("either 'ids' or 'id' is required"))
    }

    async fn evaluate(&self, args: &Value) -> Result<(Value, Value)> {
        let funder = self
            .funder
            .as_ref()
            .ok_or_else(|| Error::not_found("evaluate is only available on the funder server"))?;
        let query = opt_str_field(args, "query");
        let evaluation = funder.evaluate(query.as_deref()).await?;

        let meta = json!({
            "query_preview": query.as_deref().map(query_preview),
            "assigned_vars": evaluation.vars.len(),
            "result_count": evaluation.report.results.len(),
            "timed_out": evaluation.report.timed_out,
        });
        Ok((serde_json::to_value(&evaluation)?, meta))
    }
}

fn register(catalog: &mut ToolCatalog, entry: crate::tools::ToolEntry) {
    if let Err(err) = catalog.register(entry) {
        tracing::error!(event = "tool_registration_failed", error = %err);
    }
}

fn to_response<T: serde::Serialize>(id: Option<Value>, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(
            id,
            RPC_INTERNAL_ERROR,
            format!("Serialization error: {}", e),
        ),
    }
}

// ─── Argument helpers ───────────────────────────────────────────

pub fn str_field(body: &Value, key: &str) -> Result<String> {
    body.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| Error::validation(format!("Missing required field: {}", key)))
}

fn opt_str_field(body: &Value, key: &str) -> Option<String> {
    body.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

fn string_list_field(body: &Value, key: &str) -> Option<Vec<String>> {
    body.get(key).and_then(|v| v.as_array()).map(|arr| {
        arr.iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect()
    })
}

/// Shared handle used by the HTTP layer.
pub type SharedServer = Arc<ResearchServer>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flavour_parse() {
        assert_eq!("Funder".parse::<Flavour>().unwrap(), Flavour::Funder);
        assert_eq!(" cupcake ".parse::<Flavour>().unwrap(), Flavour::Cupcake);
        assert!("bakery".parse::<Flavour>().is_err());
        assert_eq!(Flavour::General.to_string(), "general");
    }

    #[tokio::test]
    async fn test_cupcake_from_config_keeps_research_limits() {
        let mut config = Config::default();
        config.research.max_fetch_ids = 1;
        config.research.max_query_length = 4;
        config.research.default_search = "tokens".to_string();
        config.research.records_data = Some(vec![
            json!({"id": "o1", "title": "Lemon"}),
            json!({"id": "o2", "title": "Velvet"}),
        ]);

        let server = ResearchServer::from_config(Flavour::Cupcake, &config);
        assert_eq!(server.name(), "Cupcake MCP");
        assert_eq!(server.base().default_method(), "tokens");
        assert_eq!(server.base().config().max_fetch_ids, 1);

        let fetched = server.call_tool("fetch", json!({"ids": ["o1", "o2"]})).await;
        assert!(fetched.is_error());
        let searched = server.call_tool("search", json!({"query": "lemons"})).await;
        assert!(searched.is_error());
        let searched = server.call_tool("search", json!({"query": "lem"})).await;
        assert_eq!(searched.structured_content.unwrap()["ids"], json!(["o1"]));
    }

    #[test]
    fn test_argument_helpers() {
        let body = json!({"query": "x", "ids": ["a", 1, "b"]});
        assert_eq!(str_field(&body, "query").unwrap(), "x");
        assert!(str_field(&body, "missing").is_err());
        assert_eq!(
            string_list_field(&body, "ids").unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
        assert!(opt_str_field(&body, "method").is_none());
    }
}
