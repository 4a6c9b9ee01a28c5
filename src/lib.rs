//! # Research MCP - record search servers over the Model Context Protocol
//!
//! Three server flavours share one core:
//! - **general**: `search(query, method?)` and `fetch` over generic records
//! - **cupcake**: keyword search over cupcake orders
//! - **funder**: search, fetch and `evaluate`, a bounded-concurrency packet
//!   pipeline that extracts funder variables from record metadata
//!
//! ## Architecture
//!
//! ```text
//!   POST /mcp ─┐      ┌──────────────────────────────────────┐
//!   GET /list ─┼────→ │           ResearchServer             │
//!   GET /hand… ┘      │  ┌───────────┐  ┌─────────────────┐  │
//!                     │  │ToolCatalog│  │  ResearchBase   │  │
//!                     │  └───────────┘  │ search · fetch  │  │
//!                     │                 └───────┬─────────┘  │
//!                     │  ┌──────────────────────┴─────────┐  │
//!                     │  │ FunderResearch → PacketPipeline│  │
//!                     │  └────────────────────────────────┘  │
//!                     └──────────────────────────────────────┘
//! ```
//!
//! The record store is loaded once and never mutated, so requests share it
//! without locking.

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod evaluate;
pub mod mcp;
pub mod records;
pub mod research;
pub mod search;
pub mod tools;
pub mod types;
pub mod validation;

// Internal utilities
pub mod observability;

pub use types::{Config, Error, Result};
