//! Observability utilities.
//!
//! One JSON line per event: `timestamp`, `level`, `target` and the event's
//! fields (`event`, plus whatever metadata the call site attaches).

use std::sync::OnceLock;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::types::ObservabilityConfig;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Maximum characters of a query echoed into log lines.
pub const QUERY_PREVIEW_CHARS: usize = 80;

/// Initialize tracing subscriber once for the process.
///
/// Filter comes from `RUST_LOG` when set, otherwise from `config.log_level`.
pub fn init_tracing(config: &ObservabilityConfig) {
    TRACING_INIT.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

        let result = if config.json_logs {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().flatten_event(true))
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().compact())
                .try_init()
        };

        if let Err(err) = result {
            eprintln!("tracing init skipped: {err}");
        }
    });
}

/// Trimmed query truncated to [`QUERY_PREVIEW_CHARS`] characters.
pub fn query_preview(query: &str) -> String {
    query.trim().chars().take(QUERY_PREVIEW_CHARS).collect()
}
