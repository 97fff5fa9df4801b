//! Microsoft Graph MCP Library
//!
//! Model Context Protocol server for Microsoft Graph: Teams chats and
//! meetings, Outlook mail and calendar, and files shared in chats.

pub mod auth;
pub mod config;
pub mod graph;
pub mod mcp;
pub mod odata;
pub mod teams;

pub use auth::TokenStore;
pub use config::{Config, RuntimeConfig};
pub use graph::{GraphClient, GraphError, GraphQueryService};
