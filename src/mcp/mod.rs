//! MCP server for Microsoft Graph
//!
//! Exposes Teams, mail and calendar operations as MCP tools

pub mod protocol;
mod server;

pub use protocol::*;
pub use server::GraphMcpServer;
