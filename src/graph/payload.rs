//! Typed request bodies
//!
//! Each POST body has its own struct so the wire shape is checked at compile
//! time.

use crate::graph::params::Importance;
use crate::teams::{BodyContentType, Mention};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBody {
    pub content: String,
    pub content_type: BodyContentType,
}

/// Body of `POST /me/chats/{id}/messages`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessagePayload {
    pub body: MessageBody,
    pub importance: Importance,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mentions: Vec<Mention>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQueryString {
    pub query_string: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub entity_types: Vec<String>,
    pub query: SearchQueryString,
    pub from: u32,
    pub size: u32,
    pub enable_top_results: bool,
}

/// Body of `POST /search/query`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRequestPayload {
    pub requests: Vec<SearchRequest>,
}

impl SearchRequestPayload {
    /// Single `chatMessage` search starting at the first hit
    pub fn chat_messages(query_string: String, size: u32, enable_top_results: bool) -> Self {
        Self {
            requests: vec![SearchRequest {
                entity_types: vec!["chatMessage".to_string()],
                query: SearchQueryString { query_string },
                from: 0,
                size,
                enable_top_results,
            }],
        }
    }
}
