//! MCP Server implementation for Microsoft Graph
//!
//! Exposes Teams chat, mail, calendar, transcript and shared-file tools

use crate::graph::params::*;
use crate::graph::{GraphError, GraphQueryService};
use crate::mcp::protocol::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

const CHAT_TYPES: &[&str] = &["oneOnOne", "group", "meeting"];
const BODY_FORMATS: &[&str] = &["html", "text"];
const IMPORTANCE: &[&str] = &["normal", "high", "urgent"];
const MESSAGE_FORMATS: &[&str] = &["text", "html"];
const SEARCH_SCOPES: &[&str] = &["all", "channels", "chats"];
const MENTION_FIELDS: &[&str] = &["mention", "userId"];

// Arguments some clients send as strings
const INTEGER_ARGS: &[&str] = &["limit"];
const BOOLEAN_ARGS: &[&str] = &["unreadOnly", "hasAttachments", "includeBody", "enableTopResults"];

/// MCP Server for Microsoft Graph
pub struct GraphMcpServer {
    service: GraphQueryService,
}

impl GraphMcpServer {
    /// Create a new MCP server instance
    pub fn new(service: GraphQueryService) -> Self {
        Self { service }
    }

    /// Get list of available tools
    pub fn get_tools(&self) -> Vec<Tool> {
        Self::get_tools_static()
    }

    pub fn get_tools_static() -> Vec<Tool> {
        vec![
            Tool {
                name: "search_chats".to_string(),
                description: "Search the signed-in user's Teams chats by topic, member name or chat type. Returns chats with members and a nextToken when more pages exist.".to_string(),
                input_schema: create_tool_schema(vec![
                    ("searchTerm", "Text contained in the chat topic", ParamType::String, false),
                    ("memberName", "Text contained in a member's display name", ParamType::String, false),
                    ("chatTypes", "Restrict to these chat types", ParamType::EnumArray(CHAT_TYPES), false),
                    ("limit", "Maximum chats to return (default: 20, max: 50)", ParamType::Integer { max: 50 }, false),
                    ("skipToken", "nextToken from a previous call", ParamType::String, false),
                ]),
            },
            Tool {
                name: "list_mails".to_string(),
                description: "List Outlook mail, newest first, with optional date, sender, unread and attachment filters.".to_string(),
                input_schema: create_tool_schema(vec![
                    ("limit", "Maximum messages to return (default: 20, max: 50)", ParamType::Integer { max: 50 }, false),
                    ("since", "Only mail received at or after this ISO 8601 datetime", ParamType::String, false),
                    ("until", "Only mail received at or before this ISO 8601 datetime", ParamType::String, false),
                    ("unreadOnly", "Only unread mail", ParamType::Boolean, false),
                    ("hasAttachments", "Filter on whether mail has attachments", ParamType::Boolean, false),
                    ("from", "Sender email address", ParamType::String, false),
                    ("includeBody", "Include the full message body", ParamType::Boolean, false),
                    ("bodyFormat", "Body format when includeBody is set (default: html)", ParamType::Enum(BODY_FORMATS), false),
                    ("skipToken", "nextToken from a previous call", ParamType::String, false),
                ]),
            },
            Tool {
                name: "get_chat_messages".to_string(),
                description: "Get recent messages of a chat. from/to are exclusive bounds on createdDateTime applied to the returned page.".to_string(),
                input_schema: create_tool_schema(vec![
                    ("chatId", "Chat id, e.g. '19:...@thread.v2'", ParamType::String, true),
                    ("limit", "Maximum messages to fetch (default: 20, max: 50)", ParamType::Integer { max: 50 }, false),
                    ("from", "Only messages created after this ISO 8601 datetime", ParamType::String, false),
                    ("to", "Only messages created before this ISO 8601 datetime", ParamType::String, false),
                    ("fromUser", "Only messages sent by this user id", ParamType::String, false),
                ]),
            },
            Tool {
                name: "send_chat_message".to_string(),
                description: "Send a message to a chat. Each entry of mentions replaces its text in the message with an @mention of the user.".to_string(),
                input_schema: create_tool_schema(vec![
                    ("chatId", "Chat id", ParamType::String, true),
                    ("message", "Message content", ParamType::String, true),
                    ("importance", "Message importance (default: normal)", ParamType::Enum(IMPORTANCE), false),
                    ("format", "Content type of message (default: text)", ParamType::Enum(MESSAGE_FORMATS), false),
                    ("mentions", "Mentions to insert; mention is the literal text to replace, e.g. '@john'", ParamType::ObjectArray(MENTION_FIELDS), false),
                ]),
            },
            Tool {
                name: "search_messages".to_string(),
                description: "Search Teams messages with Microsoft Search (KQL).".to_string(),
                input_schema: create_tool_schema(vec![
                    ("query", "KQL query text", ParamType::String, false),
                    ("scope", "Where to search (default: all)", ParamType::Enum(SEARCH_SCOPES), false),
                    ("limit", "Maximum results (default: 25, max: 100)", ParamType::Integer { max: 100 }, false),
                    ("enableTopResults", "Rank by relevance (default: true)", ParamType::Boolean, false),
                    ("mentions", "Only messages mentioning this user id", ParamType::String, false),
                    ("from", "Only messages sent on or after this date", ParamType::String, false),
                    ("fromUser", "Only messages from this sender", ParamType::String, false),
                ]),
            },
            Tool {
                name: "get_calendar_events".to_string(),
                description: "Get calendar events between two datetimes (default: the next 30 days). Online meetings include the meeting chatId.".to_string(),
                input_schema: create_tool_schema(vec![
                    ("from", "Window start, ISO 8601 (default: now)", ParamType::String, false),
                    ("to", "Window end, ISO 8601 (default: from + 30 days)", ParamType::String, false),
                    ("subject", "Text contained in the event subject", ParamType::String, false),
                    ("limit", "Maximum events (default: 50, max: 100)", ParamType::Integer { max: 100 }, false),
                ]),
            },
            Tool {
                name: "resolve_meeting".to_string(),
                description: "Derive the chat id and online meeting id from a Teams meeting join URL.".to_string(),
                input_schema: create_tool_schema(vec![
                    ("joinUrl", "Teams meetup-join URL", ParamType::String, true),
                ]),
            },
            Tool {
                name: "list_meeting_transcripts".to_string(),
                description: "List transcripts of the online meeting behind a meeting chat.".to_string(),
                input_schema: create_tool_schema(vec![
                    ("chatId", "Meeting chat id", ParamType::String, true),
                ]),
            },
            Tool {
                name: "get_meeting_transcript".to_string(),
                description: "Get a meeting transcript as plain 'Speaker: text' paragraphs.".to_string(),
                input_schema: create_tool_schema(vec![
                    ("meetingId", "Online meeting id from list_meeting_transcripts", ParamType::String, true),
                    ("transcriptId", "Transcript id", ParamType::String, true),
                ]),
            },
            Tool {
                name: "download_shared_files".to_string(),
                description: "Download SharePoint/OneDrive files shared in chats. Reports success or failure per URL.".to_string(),
                input_schema: create_tool_schema(vec![
                    ("contentUrls", "Sharing URLs of the files", ParamType::StringArray, true),
                    ("targetDir", "Directory to save into (default: current directory)", ParamType::String, false),
                ]),
            },
            Tool {
                name: "download_hosted_content".to_string(),
                description: "Download an inline image pasted into a chat message. The file type is detected from its content.".to_string(),
                input_schema: create_tool_schema(vec![
                    ("chatId", "Chat ID", ParamType::String, true),
                    ("messageId", "Message ID", ParamType::String, true),
                    ("hostedContentId", "Hosted content id from the message body", ParamType::String, true),
                    ("targetDir", "Directory to save into (default: current directory)", ParamType::String, false),
                ]),
            },
        ]
    }

    /// Handle a tool call
    pub async fn call_tool(&self, name: &str, args: &Map<String, Value>) -> CallToolResult {
        tracing::debug!("Calling tool {}", name);

        match name {
            "search_chats" => self.search_chats(args).await,
            "list_mails" => self.list_mails(args).await,
            "get_chat_messages" => self.get_chat_messages(args).await,
            "send_chat_message" => self.send_chat_message(args).await,
            "search_messages" => self.search_messages(args).await,
            "get_calendar_events" => self.get_calendar_events(args).await,
            "resolve_meeting" => self.resolve_meeting(args),
            "list_meeting_transcripts" => self.list_meeting_transcripts(args).await,
            "get_meeting_transcript" => self.get_meeting_transcript(args).await,
            "download_shared_files" => self.download_shared_files(args).await,
            "download_hosted_content" => self.download_hosted_content(args).await,
            _ => CallToolResult::error(format!("Unknown tool: {}", name)),
        }
    }

    async fn search_chats(&self, args: &Map<String, Value>) -> CallToolResult {
        let params: SearchChatsParams = match parse_params(args) {
            Ok(p) => p,
            Err(e) => return e,
        };
        render(self.service.search_chats(&params).await, "searching chats")
    }

    async fn list_mails(&self, args: &Map<String, Value>) -> CallToolResult {
        let params: ListMailsParams = match parse_params(args) {
            Ok(p) => p,
            Err(e) => return e,
        };
        render(self.service.list_mails(&params).await, "listing mail")
    }

    async fn get_chat_messages(&self, args: &Map<String, Value>) -> CallToolResult {
        let params: GetChatMessagesParams = match parse_params(args) {
            Ok(p) => p,
            Err(e) => return e,
        };
        render(
            self.service.get_chat_messages(&params).await,
            "fetching chat messages",
        )
    }

    async fn send_chat_message(&self, args: &Map<String, Value>) -> CallToolResult {
        let params: SendChatMessageParams = match parse_params(args) {
            Ok(p) => p,
            Err(e) => return e,
        };
        render(
            self.service.send_chat_message(&params).await,
            "sending message",
        )
    }

    async fn search_messages(&self, args: &Map<String, Value>) -> CallToolResult {
        let params: SearchMessagesParams = match parse_params(args) {
            Ok(p) => p,
            Err(e) => return e,
        };
        render(
            self.service.search_messages(&params).await,
            "searching messages",
        )
    }

    async fn get_calendar_events(&self, args: &Map<String, Value>) -> CallToolResult {
        let params: GetCalendarEventsParams = match parse_params(args) {
            Ok(p) => p,
            Err(e) => return e,
        };
        render(
            self.service.get_calendar_events(&params).await,
            "fetching calendar events",
        )
    }

    fn resolve_meeting(&self, args: &Map<String, Value>) -> CallToolResult {
        let params: ResolveMeetingParams = match parse_params(args) {
            Ok(p) => p,
            Err(e) => return e,
        };
        render(self.service.resolve_meeting(&params), "resolving meeting")
    }

    async fn list_meeting_transcripts(&self, args: &Map<String, Value>) -> CallToolResult {
        let params: ListTranscriptsParams = match parse_params(args) {
            Ok(p) => p,
            Err(e) => return e,
        };
        render(
            self.service.list_meeting_transcripts(&params).await,
            "listing transcripts",
        )
    }

    async fn get_meeting_transcript(&self, args: &Map<String, Value>) -> CallToolResult {
        let params: GetTranscriptParams = match parse_params(args) {
            Ok(p) => p,
            Err(e) => return e,
        };

        match self.service.get_meeting_transcript(&params).await {
            Ok(text) if text.is_empty() => {
                CallToolResult::text("Transcript contains no spoken content".to_string())
            }
            Ok(text) => CallToolResult::text(text),
            Err(e) => CallToolResult::error(format!("Error fetching transcript: {}", e)),
        }
    }

    async fn download_shared_files(&self, args: &Map<String, Value>) -> CallToolResult {
        let params: DownloadSharedFilesParams = match parse_params(args) {
            Ok(p) => p,
            Err(e) => return e,
        };
        render(
            self.service.download_shared_files(&params).await,
            "downloading files",
        )
    }

    async fn download_hosted_content(&self, args: &Map<String, Value>) -> CallToolResult {
        let params: DownloadHostedContentParams = match parse_params(args) {
            Ok(p) => p,
            Err(e) => return e,
        };
        render(
            self.service.download_hosted_content(&params).await,
            "downloading hosted content",
        )
    }
}

/// Deserialize tool arguments, accepting numbers and booleans sent as strings
fn parse_params<T: DeserializeOwned>(args: &Map<String, Value>) -> Result<T, CallToolResult> {
    let mut args = args.clone();

    for key in INTEGER_ARGS {
        if let Some(n) = parse_number_arg(&args, key) {
            args.insert(key.to_string(), Value::from(n));
        }
    }
    for key in BOOLEAN_ARGS {
        if let Some(Value::String(s)) = args.get(*key) {
            let flag = s.as_str() == "true";
            args.insert(key.to_string(), Value::Bool(flag));
        }
    }

    serde_json::from_value(Value::Object(args))
        .map_err(|e| CallToolResult::error(format!("Invalid arguments: {}", e)))
}

/// Parse a number argument from JSON (handles both string and number types)
fn parse_number_arg(args: &Map<String, Value>, key: &str) -> Option<u64> {
    args.get(key).and_then(|v| {
        v.as_u64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
    })
}

fn render<T: Serialize>(result: Result<T, GraphError>, action: &str) -> CallToolResult {
    match result {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(json) => CallToolResult::text(json),
            Err(e) => CallToolResult::error(format!("Error serializing result: {}", e)),
        },
        Err(e) => {
            tracing::warn!("Error {}: {}", action, e);
            CallToolResult::error(format!("Error {}: {}", action, e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphRequest, GraphTransport};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Returns the same body for every request and records query strings
    struct StubTransport {
        body: Value,
        seen: Mutex<Vec<GraphRequest>>,
    }

    #[async_trait]
    impl GraphTransport for StubTransport {
        async fn request(&self, request: GraphRequest) -> Result<Value, GraphError> {
            self.seen.lock().unwrap().push(request);
            Ok(self.body.clone())
        }

        async fn download(&self, path: &str, _: &[(String, String)]) -> Result<Vec<u8>, GraphError> {
            Err(GraphError::NotFound(path.to_string()))
        }
    }

    fn server(body: Value) -> (GraphMcpServer, Arc<StubTransport>) {
        let transport = Arc::new(StubTransport {
            body,
            seen: Mutex::new(Vec::new()),
        });
        let service = GraphQueryService::new(transport.clone());
        (GraphMcpServer::new(service), transport)
    }

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_tool_list() {
        let names: Vec<String> = GraphMcpServer::get_tools_static()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names.len(), 11);
        assert!(names.contains(&"resolve_meeting".to_string()));
        assert!(names.contains(&"download_shared_files".to_string()));
        assert!(names.contains(&"download_hosted_content".to_string()));
    }

    #[tokio::test]
    async fn test_download_hosted_content_requires_ids() {
        let (server, _) = server(Value::Null);
        let result = server
            .call_tool("download_hosted_content", &args(json!({"chatId": "c", "messageId": "m"})))
            .await;
        assert_eq!(result.is_error, Some(true));
        assert!(result.content[0].text.contains("hostedContentId"));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let (server, _) = server(Value::Null);
        let result = server.call_tool("query_entity", &Map::new()).await;
        assert_eq!(result.is_error, Some(true));
    }

    #[tokio::test]
    async fn test_missing_required_argument() {
        let (server, transport) = server(Value::Null);
        let result = server.call_tool("get_chat_messages", &Map::new()).await;
        assert_eq!(result.is_error, Some(true));
        assert!(result.content[0].text.contains("chatId"));
        assert!(transport.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_string_limit_accepted() {
        let (server, transport) = server(json!({"value": []}));
        let result = server
            .call_tool("search_chats", &args(json!({"limit": "5", "chatTypes": ["group"]})))
            .await;

        assert_eq!(result.is_error, None);
        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].query_param("$top"), Some("5"));
        assert_eq!(seen[0].query_param("$filter"), Some("(chatType eq 'group')"));
    }

    #[tokio::test]
    async fn test_resolve_meeting_tool() {
        let (server, _) = server(Value::Null);
        let result = server
            .call_tool(
                "resolve_meeting",
                &args(json!({
                    "joinUrl": "https://teams.microsoft.com/l/meetup-join/19%3ameeting_abc%40thread.v2/0?context=%7B%22Tid%22%3A%22t1%22%2C%22Oid%22%3A%22o1%22%7D"
                })),
            )
            .await;

        assert_eq!(result.is_error, None);
        let body: Value = serde_json::from_str(&result.content[0].text).unwrap();
        assert_eq!(body["chatId"], "19:meeting_abc@thread.v2");
        assert_eq!(body["meetingId"], "MSpvMSowKioxOTptZWV0aW5nX2FiY0B0aHJlYWQudjI=");
    }

    #[tokio::test]
    async fn test_service_error_is_error_result() {
        let (server, _) = server(Value::Null);
        let result = server
            .call_tool(
                "get_meeting_transcript",
                &args(json!({"meetingId": "m", "transcriptId": "t"})),
            )
            .await;
        assert_eq!(result.is_error, Some(true));
        assert!(result.content[0].text.starts_with("Error fetching transcript"));
    }
}
