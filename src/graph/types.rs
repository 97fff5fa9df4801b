//! Graph resource shapes and the trimmed results returned to tool callers
//!
//! Incoming resources only declare the fields this server reads; everything
//! else in the Graph payload is ignored.

use serde::{Deserialize, Serialize};

// ===== Graph resources =====

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemBody {
    pub content_type: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailAddress {
    pub name: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub email_address: Option<EmailAddress>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMember {
    pub display_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineMeetingInfo {
    pub join_web_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: Option<String>,
    pub topic: Option<String>,
    pub chat_type: Option<String>,
    #[serde(default)]
    pub members: Vec<ConversationMember>,
    pub online_meeting_info: Option<OnlineMeetingInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityUser {
    pub id: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatMessageFrom {
    pub user: Option<IdentityUser>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Option<String>,
    pub created_date_time: Option<String>,
    pub body: Option<ItemBody>,
    pub from: Option<ChatMessageFrom>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailMessage {
    pub id: Option<String>,
    pub subject: Option<String>,
    pub from: Option<Recipient>,
    pub received_date_time: Option<String>,
    pub body_preview: Option<String>,
    pub body: Option<ItemBody>,
    pub is_read: Option<bool>,
    pub has_attachments: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateTimeTimeZone {
    pub date_time: Option<String>,
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub display_name: Option<String>,
    pub location_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineMeeting {
    pub join_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseStatus {
    pub response: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub email_address: Option<EmailAddress>,
    #[serde(rename = "type")]
    pub attendee_type: Option<String>,
    pub status: Option<ResponseStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Option<String>,
    pub subject: Option<String>,
    pub body: Option<ItemBody>,
    pub start: Option<DateTimeTimeZone>,
    pub end: Option<DateTimeTimeZone>,
    pub location: Option<Location>,
    pub is_online_meeting: Option<bool>,
    pub online_meeting: Option<OnlineMeeting>,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
    pub organizer: Option<Recipient>,
}

/// `callTranscript`; the SDK shape omits `endDateTime` but the API returns it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallTranscript {
    pub id: Option<String>,
    pub created_date_time: Option<String>,
    pub end_date_time: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriveItem {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelIdentity {
    pub team_id: Option<String>,
    pub channel_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResource {
    pub id: Option<String>,
    pub created_date_time: Option<String>,
    pub from: Option<Recipient>,
    pub chat_id: Option<String>,
    pub channel_identity: Option<ChannelIdentity>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchHit {
    pub rank: Option<i64>,
    pub summary: Option<String>,
    #[serde(default)]
    pub resource: SearchResource,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitsContainer {
    #[serde(default)]
    pub hits: Vec<SearchHit>,
    pub total: Option<i64>,
    #[serde(default)]
    pub more_results_available: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponseEntry {
    #[serde(default)]
    pub hits_containers: Vec<HitsContainer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub value: Vec<SearchResponseEntry>,
}

// ===== Tool results =====

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub id: Option<String>,
    pub topic: Option<String>,
    pub chat_type: Option<String>,
    pub members: Vec<MemberSummary>,
}

impl From<Chat> for ChatSummary {
    fn from(chat: Chat) -> Self {
        Self {
            id: chat.id,
            topic: chat.topic,
            chat_type: chat.chat_type,
            members: chat
                .members
                .into_iter()
                .map(|m| MemberSummary {
                    display_name: m.display_name,
                    email: m.email,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchChatsResult {
    pub chats: Vec<ChatSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MailSender {
    pub name: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailSummary {
    pub id: Option<String>,
    pub subject: Option<String>,
    pub from: MailSender,
    pub received_date_time: Option<String>,
    pub body_preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<ItemBody>,
    pub is_read: Option<bool>,
    pub has_attachments: Option<bool>,
}

impl From<MailMessage> for MailSummary {
    fn from(message: MailMessage) -> Self {
        let address = message.from.and_then(|f| f.email_address).unwrap_or_default();
        Self {
            id: message.id,
            subject: message.subject,
            from: MailSender {
                name: address.name,
                address: address.address,
            },
            received_date_time: message.received_date_time,
            body_preview: message.body_preview,
            body: message.body,
            is_read: message.is_read,
            has_attachments: message.has_attachments,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMailsResult {
    pub total_returned: usize,
    pub messages: Vec<MailSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSummary {
    pub id: Option<String>,
    pub content: Option<String>,
    pub from: Option<String>,
    pub created_date_time: Option<String>,
}

impl From<ChatMessage> for MessageSummary {
    fn from(message: ChatMessage) -> Self {
        Self {
            id: message.id,
            content: message.body.and_then(|b| b.content),
            from: message
                .from
                .and_then(|f| f.user)
                .and_then(|u| u.display_name),
            created_date_time: message.created_date_time,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageFilters {
    pub from: Option<String>,
    pub to: Option<String>,
    pub from_user: Option<String>,
}

/// Where date-range filtering happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilteringMethod {
    ClientSide,
    ServerSide,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessagesResult {
    pub filters: MessageFilters,
    pub filtering_method: FilteringMethod,
    pub total_returned: usize,
    pub has_more: bool,
    pub messages: Vec<MessageSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SentMessage {
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHitSummary {
    pub id: Option<String>,
    pub rank: Option<i64>,
    pub content: Option<String>,
    pub from: Option<String>,
    pub created_date_time: Option<String>,
    pub chat_id: Option<String>,
    pub team_id: Option<String>,
    pub channel_id: Option<String>,
}

impl From<SearchHit> for SearchHitSummary {
    fn from(hit: SearchHit) -> Self {
        let resource = hit.resource;
        let channel = resource.channel_identity.unwrap_or_default();
        Self {
            id: resource.id,
            rank: hit.rank,
            content: hit.summary,
            from: resource
                .from
                .and_then(|f| f.email_address)
                .and_then(|e| e.address),
            created_date_time: resource.created_date_time,
            chat_id: resource.chat_id,
            team_id: channel.team_id,
            channel_id: channel.channel_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMessagesResult {
    pub query: Option<String>,
    pub scope: String,
    pub total_results: i64,
    pub more_results_available: bool,
    pub results: Vec<SearchHitSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeSummary {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "type")]
    pub attendee_type: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrganizerSummary {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub id: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub location: Option<String>,
    pub is_online_meeting: Option<bool>,
    pub online_meeting_url: Option<String>,
    /// Meeting chat id derived from the join URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    pub attendees: Vec<AttendeeSummary>,
    pub organizer: OrganizerSummary,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEventsResult {
    pub total_returned: usize,
    pub has_more: bool,
    pub events: Vec<EventSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSummary {
    pub id: Option<String>,
    pub created_date_time: Option<String>,
    pub end_date_time: Option<String>,
}

impl From<CallTranscript> for TranscriptSummary {
    fn from(t: CallTranscript) -> Self {
        Self {
            id: t.id,
            created_date_time: t.created_date_time,
            end_date_time: t.end_date_time,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptListResult {
    pub meeting_id: String,
    pub transcripts: Vec<TranscriptSummary>,
}

/// Outcome of one shared-file download
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadOutcome {
    pub success: bool,
    pub content_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Saved hosted content file
#[derive(Debug, Clone, Serialize)]
pub struct HostedContentDownload {
    pub path: String,
    pub size: usize,
}
