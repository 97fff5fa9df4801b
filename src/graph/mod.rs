//! Microsoft Graph access
//!
//! Transport, wire types and the query service that backs the MCP tools.

mod client;
pub mod date_range;
pub mod params;
pub mod payload;
pub mod search;
mod service;
pub mod shares;
pub mod transport;
pub mod types;

pub use client::{GraphClient, GraphError};
pub use date_range::DateRange;
pub use service::GraphQueryService;
pub use transport::{GraphRequest, GraphTransport, HttpMethod};
