//! Research MCP server - main entry point.
//!
//! Serves one flavour (general, cupcake or funder) over HTTP:
//! - `POST /mcp`: JSON-RPC 2.0 (initialize, tools/list, tools/call, ping)
//! - `GET /handshake`, `GET /list`: server metadata
//! - `GET /health`: liveness

use clap::Parser;
use serde_json::Value;
use std::net::SocketAddr;
use std::path::PathBuf;

use research_mcp::mcp::{Flavour, HttpServer, ResearchServer};
use research_mcp::types::ObservabilityConfig;
use research_mcp::Config;

#[derive(Debug, Parser)]
#[command(name = "research-mcp", version, about = "Record search servers over MCP")]
struct Cli {
    /// Server flavour: general, cupcake or funder.
    #[arg(long, env = "RESEARCH_FLAVOUR", default_value = "general")]
    flavour: Flavour,

    /// Address to listen on (overrides RESEARCH_BIND_ADDR).
    #[arg(long)]
    bind: Option<String>,

    /// Records file (overrides RESEARCH_RECORDS_PATH).
    #[arg(long)]
    records: Option<PathBuf>,

    /// Funder variable to extract, as `key` or `key=default`. Repeatable.
    #[arg(long = "funder-var", value_name = "KEY[=DEFAULT]")]
    funder_vars: Vec<String>,

    /// Upper bound on packets evaluated at once.
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Log with the compact formatter instead of JSON.
    #[arg(long)]
    compact_logs: bool,
}

/// `key=default` → (key, default). The default is parsed as JSON when it
/// can be, otherwise kept as a string; a bare `key` defaults to null.
fn parse_funder_var(raw: &str) -> (String, Value) {
    match raw.split_once('=') {
        Some((key, default)) => {
            let value = serde_json::from_str(default)
                .unwrap_or_else(|_| Value::String(default.to_string()));
            (key.trim().to_string(), value)
        }
        None => (raw.trim().to_string(), Value::Null),
    }
}

fn observability_config(cli: &Cli) -> ObservabilityConfig {
    let mut observability = ObservabilityConfig::from_env();
    if cli.compact_logs {
        observability.json_logs = false;
    }
    observability
}

/// `RESEARCH_*` environment, then CLI flags on top.
fn load_config(cli: Cli, observability: ObservabilityConfig) -> Config {
    let mut config = Config::from_env();
    config.observability = observability;
    if let Some(bind) = cli.bind {
        config.server.bind_addr = bind;
    }
    if let Some(records) = cli.records {
        config.research.records_path = Some(records);
    }
    for raw in &cli.funder_vars {
        let (key, default) = parse_funder_var(raw);
        if !key.is_empty() {
            config.funder.funder_vars.insert(key, default);
        }
    }
    if let Some(max) = cli.max_concurrency {
        config.funder.max_packet_concurrency = max;
    }
    config
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize observability before loading the rest of the config so
    // rejected RESEARCH_* values are reported.
    let observability = observability_config(&cli);
    research_mcp::observability::init_tracing(&observability);

    // Load configuration
    let flavour = cli.flavour;
    let config = load_config(cli, observability);

    let addr: SocketAddr = config.server.bind_addr.parse()?;
    let server = ResearchServer::from_config(flavour, &config);
    let http = HttpServer::new(server, addr);

    let cancel = http.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!(event = "shutdown_requested");
            cancel.cancel();
        }
    });

    http.serve().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_funder_var() {
        assert_eq!(parse_funder_var("lead"), ("lead".to_string(), Value::Null));
        assert_eq!(
            parse_funder_var("region=global"),
            ("region".to_string(), Value::String("global".to_string()))
        );
        assert_eq!(parse_funder_var("budget=10"), ("budget".to_string(), serde_json::json!(10)));
    }

    #[test]
    fn test_cli_flags_override_config() {
        let cli = Cli::parse_from([
            "research-mcp",
            "--compact-logs",
            "--bind",
            "0.0.0.0:9000",
            "--funder-var",
            "region=global",
        ]);
        let observability = observability_config(&cli);
        assert!(!observability.json_logs);

        let config = load_config(cli, observability);
        assert!(!config.observability.json_logs);
        assert_eq!(config.server.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.funder.funder_vars["region"], serde_json::json!("global"));
    }

    #[test]
    fn test_cli_parses_flavour() {
        let cli = Cli::parse_from(["research-mcp", "--flavour", "funder", "--funder-var", "lead"]);
        assert_eq!(cli.flavour, Flavour::Funder);
        assert_eq!(cli.funder_vars, vec!["lead".to_string()]);
    }
}
