//! Operation parameters
//!
//! Field names follow the tool argument names (camelCase). Range validation
//! happens at the tool schema; the service only clamps page sizes.

use crate::teams::BodyContentType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChatType {
    OneOnOne,
    Group,
    Meeting,
}

impl ChatType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChatType::OneOnOne => "oneOnOne",
            ChatType::Group => "group",
            ChatType::Meeting => "meeting",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchChatsParams {
    pub search_term: Option<String>,
    pub member_name: Option<String>,
    #[serde(default)]
    pub chat_types: Vec<ChatType>,
    pub limit: Option<u32>,
    pub skip_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyFormat {
    #[default]
    Html,
    Text,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMailsParams {
    pub limit: Option<u32>,
    pub since: Option<String>,
    pub until: Option<String>,
    #[serde(default)]
    pub unread_only: bool,
    pub has_attachments: Option<bool>,
    /// Sender email address
    pub from: Option<String>,
    #[serde(default)]
    pub include_body: bool,
    #[serde(default)]
    pub body_format: BodyFormat,
    pub skip_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetChatMessagesParams {
    pub chat_id: String,
    pub limit: Option<u32>,
    /// Exclusive lower bound on `createdDateTime`
    pub from: Option<String>,
    /// Exclusive upper bound on `createdDateTime`
    pub to: Option<String>,
    pub from_user: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    #[default]
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentionRequest {
    /// Text to replace in the message, e.g. `@john.doe`
    pub mention: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendChatMessageParams {
    pub chat_id: String,
    pub message: String,
    #[serde(default)]
    pub importance: Importance,
    #[serde(default)]
    pub format: BodyContentType,
    #[serde(default)]
    pub mentions: Vec<MentionRequest>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchScope {
    #[default]
    All,
    Channels,
    Chats,
}

impl SearchScope {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchScope::All => "all",
            SearchScope::Channels => "channels",
            SearchScope::Chats => "chats",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMessagesParams {
    /// KQL query
    pub query: Option<String>,
    #[serde(default)]
    pub scope: SearchScope,
    pub limit: Option<u32>,
    pub enable_top_results: Option<bool>,
    /// User id whose mentions to search for
    pub mentions: Option<String>,
    /// ISO datetime; only the date part is used
    pub from: Option<String>,
    pub from_user: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetCalendarEventsParams {
    pub from: Option<String>,
    pub to: Option<String>,
    pub subject: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveMeetingParams {
    pub join_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTranscriptsParams {
    pub chat_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTranscriptParams {
    pub meeting_id: String,
    pub transcript_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadSharedFilesParams {
    pub content_urls: Vec<String>,
    pub target_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadHostedContentParams {
    pub chat_id: String,
    pub message_id: String,
    pub hosted_content_id: String,
    pub target_dir: Option<String>,
}
