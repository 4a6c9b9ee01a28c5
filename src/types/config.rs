//! Configuration structures.
//!
//! Configuration is built from defaults with environment variables layered on
//! top (`RESEARCH_*`). The binary then applies CLI flags last.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Prefix shared by all research server environment variables.
pub const ENV_PREFIX: &str = "RESEARCH_";

/// Cupcake flavour override for the records file.
pub const CUPCAKE_RECORDS_ENV: &str = "CUPCAKE_RECORDS_PATH";

/// Records file used when nothing else is configured.
pub const DEFAULT_RECORDS_FILE: &str = "records.json";

/// Global server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Record source and search settings.
    #[serde(default)]
    pub research: ResearchConfig,

    /// Packet evaluation settings (funder flavour).
    #[serde(default)]
    pub funder: FunderConfig,
}

impl Config {
    /// Defaults overlaid with `RESEARCH_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = prefixed(&lookup);

        let mut config = Self {
            observability: ObservabilityConfig::from_lookup(&lookup),
            ..Self::default()
        };

        if let Some(addr) = var("BIND_ADDR") {
            config.server.bind_addr = addr;
        }

        let research = &mut config.research;
        if let Some(name) = var("NAME") {
            research.name = name;
        }
        if let Some(instructions) = var("INSTRUCTIONS") {
            research.instructions = instructions;
        }
        if let Some(path) = var("RECORDS_PATH") {
            research.records_path = Some(PathBuf::from(path));
        }
        if let Some(method) = var("DEFAULT_SEARCH") {
            research.default_search = method;
        }
        parse_into(&var, "MAX_QUERY_LENGTH", &mut research.max_query_length);
        parse_into(&var, "MAX_FETCH_IDS", &mut research.max_fetch_ids);

        let funder = &mut config.funder;
        parse_into(
            &var,
            "MAX_PACKET_CONCURRENCY",
            &mut funder.max_packet_concurrency,
        );
        parse_into(&var, "PACKET_SIZE", &mut funder.packet_size);
        if let Some(raw) = var("EVALUATION_TIMEOUT") {
            match humantime::parse_duration(&raw) {
                Ok(timeout) => funder.evaluation_timeout = Some(timeout),
                Err(err) => tracing::warn!(
                    event = "config_env_ignored",
                    key = "RESEARCH_EVALUATION_TIMEOUT",
                    value = %raw,
                    error = %err,
                ),
            }
        }

        config
    }
}

/// `RESEARCH_<name>` through `lookup`, trimmed, with blank values treated as unset.
fn prefixed<F>(lookup: &F) -> impl Fn(&str) -> Option<String> + '_
where
    F: Fn(&str) -> Option<String>,
{
    move |name: &str| {
        lookup(&format!("{ENV_PREFIX}{name}"))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

fn parse_into<T, V>(var: &V, name: &str, slot: &mut T)
where
    T: FromStr,
    T::Err: std::fmt::Display,
    V: Fn(&str) -> Option<String>,
{
    let Some(raw) = var(name) else {
        return;
    };
    match raw.parse::<T>() {
        Ok(value) => *slot = value,
        Err(err) => tracing::warn!(
            event = "config_env_ignored",
            key = %format!("{ENV_PREFIX}{name}"),
            value = %raw,
            error = %err,
        ),
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP bind address.
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl ObservabilityConfig {
    /// `RESEARCH_LOG_LEVEL` and `RESEARCH_LOG_FORMAT` over the defaults.
    ///
    /// Nothing here can be rejected, so it is safe to resolve before a
    /// subscriber exists; the rest of [`Config`] should be loaded after
    /// tracing is initialised so ignored values are reported.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = prefixed(&lookup);
        let mut config = Self::default();
        if let Some(level) = var("LOG_LEVEL") {
            config.log_level = level.to_lowercase();
        }
        if let Some(format) = var("LOG_FORMAT") {
            config.json_logs = !format.eq_ignore_ascii_case("compact");
        }
        config
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: true,
        }
    }
}

/// Record source and search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Server name reported in the handshake.
    pub name: String,

    /// Free-form instructions reported in the handshake.
    pub instructions: String,

    /// JSON records file. Missing file means an empty store.
    pub records_path: Option<PathBuf>,

    /// In-memory records; takes precedence over `records_path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records_data: Option<Vec<Value>>,

    /// Search method used when a call does not name one.
    pub default_search: String,

    /// Maximum sanitised query length in characters.
    pub max_query_length: usize,

    /// Maximum number of ids accepted by one fetch call.
    pub max_fetch_ids: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            name: "Research MCP".to_string(),
            instructions: "Search records".to_string(),
            records_path: Some(PathBuf::from(DEFAULT_RECORDS_FILE)),
            records_data: None,
            default_search: "simple".to_string(),
            max_query_length: 512,
            max_fetch_ids: 100,
        }
    }
}

/// Packet evaluation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunderConfig {
    /// Funder variables to resolve, with the default used when no record supplies one.
    #[serde(default)]
    pub funder_vars: BTreeMap<String, Value>,

    /// Maximum packets evaluated at once.
    pub max_packet_concurrency: usize,

    /// Records per packet.
    pub packet_size: usize,

    /// Cap on the whole evaluation run. Partial results are returned on expiry.
    #[serde(default, with = "humantime_serde")]
    pub evaluation_timeout: Option<Duration>,
}

impl Default for FunderConfig {
    fn default() -> Self {
        Self {
            funder_vars: BTreeMap::new(),
            max_packet_concurrency: 10,
            packet_size: 1,
            evaluation_timeout: None,
        }
    }
}

/// Records path for the cupcake flavour: `CUPCAKE_RECORDS_PATH` beats the
/// explicit path, which beats `records.json`.
pub fn resolve_cupcake_records_path<F>(explicit: Option<&Path>, lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    lookup(CUPCAKE_RECORDS_ENV)
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| explicit.map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_RECORDS_FILE))
}
