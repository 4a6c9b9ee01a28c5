//! MCP surface — JSON-RPC types, the research server and its HTTP transport.

pub mod http;
pub mod server;
pub mod types;

pub use http::{router, HttpServer};
pub use server::{Flavour, ResearchServer, SharedServer};
pub use types::{JsonRpcRequest, JsonRpcResponse, ToolsCallResult};
