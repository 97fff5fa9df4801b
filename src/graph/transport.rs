//! Transport seam between the query service and Microsoft Graph
//!
//! [`GraphClient`](crate::graph::GraphClient) is the production implementation;
//! tests substitute an in-memory fake.

use crate::graph::client::GraphError;
use crate::odata::QueryDescriptor;
use async_trait::async_trait;
use serde_json::Value;

/// HTTP verb of a Graph request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Transport-neutral description of one Graph call
#[derive(Debug, Clone, PartialEq)]
pub struct GraphRequest {
    pub method: HttpMethod,
    /// Path relative to the Graph endpoint, e.g. `/me/chats`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl GraphRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Post, path).json(body)
    }

    pub fn odata(mut self, descriptor: &QueryDescriptor) -> Self {
        self.query.extend(descriptor.to_query_pairs());
        self
    }

    pub fn query(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query.push((name.to_string(), value.into()));
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Value of the first query parameter called `name`
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Authenticated access to Microsoft Graph
#[async_trait]
pub trait GraphTransport: Send + Sync {
    /// Issue a request and return the decoded JSON body (`Null` for empty responses).
    async fn request(&self, request: GraphRequest) -> Result<Value, GraphError>;

    /// Fetch raw bytes, e.g. file or transcript content.
    async fn download(&self, path: &str, query: &[(String, String)]) -> Result<Vec<u8>, GraphError>;
}
