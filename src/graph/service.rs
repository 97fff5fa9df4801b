//! Graph query service
//!
//! Composes the OData builder, join URL resolver, transcript parser and
//! mention processor with a [`GraphTransport`]. The transport is passed in at
//! construction; the service holds no other state.

use crate::graph::client::GraphError;
use crate::graph::date_range::{parse_timestamp, DateRange};
use crate::graph::params::{
    BodyFormat, DownloadHostedContentParams, DownloadSharedFilesParams, GetCalendarEventsParams, GetChatMessagesParams,
    GetTranscriptParams, ListMailsParams, ListTranscriptsParams, MentionRequest,
    ResolveMeetingParams, SearchChatsParams, SearchMessagesParams, SendChatMessageParams,
};
use crate::graph::payload::{ChatMessagePayload, MessageBody, SearchRequestPayload};
use crate::graph::search::build_search_query;
use crate::graph::shares::{
    encode_sharing_url, hosted_content_file_name, safe_file_name, sniff_image_extension,
};
use crate::graph::transport::{GraphRequest, GraphTransport};
use crate::graph::types::*;
use crate::odata::{escape_odata_string, GraphPage, PageCursor, Predicate, QueryBuilder, SortDirection};
use crate::teams::{
    chat_id_from_join_url, parse_vtt_to_text, process_mentions, resolve_join_url,
    MeetingIdentity, MentionMapping,
};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// Page size defaults and documented maxima per endpoint
const CHATS_DEFAULT_TOP: u32 = 20;
const CHATS_MAX_TOP: u32 = 50;
const MAILS_DEFAULT_TOP: u32 = 20;
const MAILS_MAX_TOP: u32 = 50;
const MESSAGES_DEFAULT_TOP: u32 = 20;
const MESSAGES_MAX_TOP: u32 = 50;
const SEARCH_DEFAULT_SIZE: u32 = 25;
const SEARCH_MAX_SIZE: u32 = 100;
const EVENTS_DEFAULT_TOP: u32 = 50;
const EVENTS_MAX_TOP: u32 = 100;

const EVENTS_DEFAULT_WINDOW_DAYS: i64 = 30;
const MAIL_EPOCH: &str = "1900-01-01T00:00:00Z";

const MAIL_FIELDS: &[&str] = &[
    "id",
    "subject",
    "from",
    "receivedDateTime",
    "bodyPreview",
    "isRead",
    "hasAttachments",
];
const MAIL_FIELDS_WITH_BODY: &[&str] = &[
    "id",
    "subject",
    "from",
    "receivedDateTime",
    "body",
    "bodyPreview",
    "isRead",
    "hasAttachments",
];

const ACCESS_DENIED_MESSAGE: &str =
    "You do not have access to this file. Please ask the owner to grant you permissions.";

/// High-level Graph operations
#[derive(Clone)]
pub struct GraphQueryService {
    transport: Arc<dyn GraphTransport>,
}

impl GraphQueryService {
    pub fn new(transport: Arc<dyn GraphTransport>) -> Self {
        Self { transport }
    }

    async fn get_json<T: DeserializeOwned>(&self, request: GraphRequest) -> Result<T, GraphError> {
        let path = request.path.clone();
        let value = self.transport.request(request).await?;
        serde_json::from_value(value).map_err(|e| {
            GraphError::ParseError(format!("Unexpected response from {}: {}", path, e))
        })
    }

    /// Chats of the signed-in user, filtered by topic, member name and type
    pub async fn search_chats(
        &self,
        params: &SearchChatsParams,
    ) -> Result<SearchChatsResult, GraphError> {
        let mut builder = QueryBuilder::new()
            .expand("members")
            .top(params.limit.unwrap_or(CHATS_DEFAULT_TOP))
            .max_top(CHATS_MAX_TOP)
            .skiptoken(cursor(&params.skip_token));

        if let Some(term) = non_empty(&params.search_term) {
            builder = builder.predicate(Predicate::contains("searchTerm", "topic", term));
        }

        if let Some(name) = non_empty(&params.member_name) {
            builder = builder.predicate(Predicate::new(
                "memberName",
                "members",
                format!(
                    "members/any(c:contains(c/displayName, '{}'))",
                    escape_odata_string(name)
                ),
            ));
        }

        if !params.chat_types.is_empty() {
            let types: Vec<&str> = params.chat_types.iter().map(|t| t.as_str()).collect();
            builder = builder.predicate(Predicate::any_of("chatTypes", "chatType", &types));
        }

        let request = GraphRequest::get("/me/chats").odata(&builder.build());
        let page: GraphPage<Chat> = self.get_json(request).await?;
        let next_token = page.next_token().map(PageCursor::into_string);

        tracing::debug!("search_chats returned {} chats", page.value.len());

        Ok(SearchChatsResult {
            chats: page.value.into_iter().map(ChatSummary::from).collect(),
            next_token,
        })
    }

    /// Mailbox messages, newest first
    pub async fn list_mails(&self, params: &ListMailsParams) -> Result<ListMailsResult, GraphError> {
        let fields = if params.include_body {
            MAIL_FIELDS_WITH_BODY
        } else {
            MAIL_FIELDS
        };

        // receivedDateTime is the sort field, so it must be filtered first.
        let mut builder = QueryBuilder::new()
            .order_by_filtered(
                "receivedDateTime",
                SortDirection::Desc,
                format!("receivedDateTime ge {}", MAIL_EPOCH),
            )
            .select(fields)
            .top(params.limit.unwrap_or(MAILS_DEFAULT_TOP))
            .max_top(MAILS_MAX_TOP)
            .skiptoken(cursor(&params.skip_token));

        if let Some(since) = non_empty(&params.since) {
            builder = builder.predicate(Predicate::new(
                "since",
                "receivedDateTime",
                format!("receivedDateTime ge {}", odata_datetime("since", since)?),
            ));
        }

        if let Some(until) = non_empty(&params.until) {
            builder = builder.predicate(Predicate::new(
                "until",
                "receivedDateTime",
                format!("receivedDateTime le {}", odata_datetime("until", until)?),
            ));
        }

        if let Some(sender) = non_empty(&params.from) {
            builder = builder.predicate(Predicate::equals(
                "sender",
                "from/emailAddress/address",
                sender,
            ));
        }

        builder = builder.predicate_if(params.unread_only, || {
            Predicate::new("unreadOnly", "isRead", "isRead eq false")
        });

        if let Some(flag) = params.has_attachments {
            builder = builder.predicate(Predicate::new(
                "hasAttachments",
                "hasAttachments",
                format!("hasAttachments eq {}", flag),
            ));
        }

        let mut request = GraphRequest::get("/me/messages").odata(&builder.build());
        if params.include_body && params.body_format == BodyFormat::Text {
            request = request.header("Prefer", "outlook.body-content-type=\"text\"");
        }

        let page: GraphPage<MailMessage> = self.get_json(request).await?;
        let next_token = page.next_token().map(PageCursor::into_string);
        let messages: Vec<MailSummary> = page.value.into_iter().map(MailSummary::from).collect();

        Ok(ListMailsResult {
            total_returned: messages.len(),
            messages,
            next_token,
        })
    }

    /// Recent messages of one chat.
    ///
    /// `from`/`to` are applied to the returned page client-side with exclusive
    /// bounds; messages without `createdDateTime` are kept.
    pub async fn get_chat_messages(
        &self,
        params: &GetChatMessagesParams,
    ) -> Result<ChatMessagesResult, GraphError> {
        let mut builder = QueryBuilder::new()
            .order_by("createdDateTime", SortDirection::Desc)
            .top(params.limit.unwrap_or(MESSAGES_DEFAULT_TOP))
            .max_top(MESSAGES_MAX_TOP);

        if let Some(user) = non_empty(&params.from_user) {
            builder = builder.predicate(Predicate::equals("fromUser", "from/user/id", user));
        }

        let path = format!("/me/chats/{}/messages", segment(&params.chat_id));
        let page: GraphPage<ChatMessage> =
            self.get_json(GraphRequest::get(path).odata(&builder.build())).await?;
        let has_more = page.has_more();

        let client_side = params.from.is_some() || params.to.is_some();
        let mut messages = page.value;
        if client_side {
            let before = messages.len();
            DateRange::new(params.from.as_deref(), params.to.as_deref())
                .retain(&mut messages, |m| m.created_date_time.as_deref());
            tracing::debug!(
                "Date range kept {} of {} messages",
                messages.len(),
                before
            );
        }

        let messages: Vec<MessageSummary> = messages.into_iter().map(MessageSummary::from).collect();

        Ok(ChatMessagesResult {
            filters: MessageFilters {
                from: params.from.clone(),
                to: params.to.clone(),
                from_user: params.from_user.clone(),
            },
            filtering_method: if client_side {
                FilteringMethod::ClientSide
            } else {
                FilteringMethod::ServerSide
            },
            total_returned: messages.len(),
            has_more,
            messages,
        })
    }

    /// Post a chat message, turning requested mentions into mention markup
    pub async fn send_chat_message(
        &self,
        params: &SendChatMessageParams,
    ) -> Result<SentMessage, GraphError> {
        let mappings = self.resolve_mentions(&params.mentions).await;
        let body = process_mentions(&params.message, params.format, &mappings);

        let payload = ChatMessagePayload {
            body: MessageBody {
                content: body.content,
                content_type: body.content_type,
            },
            importance: params.importance,
            mentions: body.mentions,
        };

        let path = format!("/me/chats/{}/messages", segment(&params.chat_id));
        let sent: ChatMessage = self
            .get_json(GraphRequest::post(path, to_json(&payload)?))
            .await?;

        tracing::info!("Sent chat message {:?}", sent.id);
        Ok(SentMessage { id: sent.id })
    }

    /// Look up display names concurrently; a failed lookup falls back to the
    /// mention text.
    async fn resolve_mentions(&self, mentions: &[MentionRequest]) -> Vec<MentionMapping> {
        let lookups = mentions.iter().map(|mention| async move {
            let request = GraphRequest::get(format!("/users/{}", segment(&mention.user_id)))
                .query("$select", "displayName");

            let display_name = match self.get_json::<User>(request).await {
                Ok(User {
                    display_name: Some(name),
                    ..
                }) if !name.is_empty() => name,
                Ok(_) => mention.mention.clone(),
                Err(e) => {
                    tracing::warn!(
                        "Could not resolve display name for {}: {}; using mention text",
                        mention.user_id,
                        e
                    );
                    mention.mention.clone()
                }
            };

            MentionMapping {
                token: mention.mention.clone(),
                user_id: mention.user_id.clone(),
                display_name,
            }
        });

        join_all(lookups).await
    }

    /// Microsoft Search over Teams messages
    pub async fn search_messages(
        &self,
        params: &SearchMessagesParams,
    ) -> Result<SearchMessagesResult, GraphError> {
        let query_string = build_search_query(params);
        let size = params
            .limit
            .unwrap_or(SEARCH_DEFAULT_SIZE)
            .clamp(1, SEARCH_MAX_SIZE);

        tracing::debug!("search_messages: {}", query_string);

        let payload = SearchRequestPayload::chat_messages(
            query_string,
            size,
            params.enable_top_results.unwrap_or(true),
        );
        let response: SearchResponse = self
            .get_json(GraphRequest::post("/search/query", to_json(&payload)?))
            .await?;

        let container = response
            .value
            .into_iter()
            .next()
            .and_then(|entry| entry.hits_containers.into_iter().next())
            .unwrap_or_default();

        Ok(SearchMessagesResult {
            query: params.query.clone(),
            scope: params.scope.as_str().to_string(),
            total_results: container.total.unwrap_or(container.hits.len() as i64),
            more_results_available: container.more_results_available,
            results: container
                .hits
                .into_iter()
                .map(SearchHitSummary::from)
                .collect(),
        })
    }

    /// Calendar view between `from` (default now) and `to` (default 30 days
    /// after `from`), recurring events expanded
    pub async fn get_calendar_events(
        &self,
        params: &GetCalendarEventsParams,
    ) -> Result<CalendarEventsResult, GraphError> {
        let start = match non_empty(&params.from) {
            Some(from) => parse_bound("from", from)?,
            None => Utc::now(),
        };
        let end = match non_empty(&params.to) {
            Some(to) => parse_bound("to", to)?,
            None => start + Duration::days(EVENTS_DEFAULT_WINDOW_DAYS),
        };

        let mut builder = QueryBuilder::new()
            .order_by("start/dateTime", SortDirection::Asc)
            .top(params.limit.unwrap_or(EVENTS_DEFAULT_TOP))
            .max_top(EVENTS_MAX_TOP);

        if let Some(subject) = non_empty(&params.subject) {
            builder = builder.predicate(Predicate::contains("subject", "subject", subject));
        }

        let request = GraphRequest::get("/me/calendar/calendarView")
            .query("startDateTime", start.to_rfc3339_opts(SecondsFormat::Secs, true))
            .query("endDateTime", end.to_rfc3339_opts(SecondsFormat::Secs, true))
            .odata(&builder.build());

        let page: GraphPage<Event> = self.get_json(request).await?;
        let has_more = page.has_more();
        let events: Vec<EventSummary> = page.value.into_iter().map(summarize_event).collect();

        Ok(CalendarEventsResult {
            total_returned: events.len(),
            has_more,
            events,
        })
    }

    /// Chat and meeting ids encoded in a join URL; no request is made.
    pub fn resolve_meeting(
        &self,
        params: &ResolveMeetingParams,
    ) -> Result<MeetingIdentity, GraphError> {
        Ok(resolve_join_url(&params.join_url)?)
    }

    /// Transcripts of the online meeting behind a meeting chat
    pub async fn list_meeting_transcripts(
        &self,
        params: &ListTranscriptsParams,
    ) -> Result<TranscriptListResult, GraphError> {
        let chat: Chat = self
            .get_json(GraphRequest::get(format!(
                "/me/chats/{}",
                segment(&params.chat_id)
            )))
            .await?;

        let join_url = chat
            .online_meeting_info
            .and_then(|info| info.join_web_url)
            .ok_or_else(|| {
                GraphError::InvalidInput(format!(
                    "Chat {} is not a meeting or has no joinWebUrl",
                    params.chat_id
                ))
            })?;

        let identity = resolve_join_url(&join_url)?;
        tracing::debug!("Meeting chat {} -> meeting {}", identity.chat_id, identity.meeting_id);

        let path = format!(
            "/me/onlineMeetings/{}/transcripts",
            segment(&identity.meeting_id)
        );
        let page: GraphPage<CallTranscript> = self.get_json(GraphRequest::get(path)).await?;

        Ok(TranscriptListResult {
            meeting_id: identity.meeting_id,
            transcripts: page.value.into_iter().map(TranscriptSummary::from).collect(),
        })
    }

    /// Transcript content as `Speaker: text` paragraphs
    pub async fn get_meeting_transcript(
        &self,
        params: &GetTranscriptParams,
    ) -> Result<String, GraphError> {
        let path = format!(
            "/me/onlineMeetings/{}/transcripts/{}/content",
            segment(&params.meeting_id),
            segment(&params.transcript_id)
        );
        let query = [("$format".to_string(), "text/vtt".to_string())];
        let bytes = self.transport.download(&path, &query).await?;

        let vtt = String::from_utf8_lossy(&bytes);
        Ok(parse_vtt_to_text(&vtt))
    }

    /// Download SharePoint/OneDrive attachments concurrently into `targetDir`.
    /// Failures are reported per URL.
    pub async fn download_shared_files(
        &self,
        params: &DownloadSharedFilesParams,
    ) -> Result<Vec<DownloadOutcome>, GraphError> {
        let dir = PathBuf::from(params.target_dir.as_deref().unwrap_or("."));
        tokio::fs::create_dir_all(&dir).await?;

        let downloads = params
            .content_urls
            .iter()
            .map(|url| self.download_shared_file(url, &dir));

        Ok(join_all(downloads).await)
    }

    async fn download_shared_file(&self, content_url: &str, dir: &Path) -> DownloadOutcome {
        match self.fetch_shared_file(content_url, dir).await {
            Ok((path, size)) => DownloadOutcome {
                success: true,
                content_url: content_url.to_string(),
                path: Some(path.display().to_string()),
                size: Some(size),
                error: None,
            },
            Err(e) => {
                tracing::warn!("Download of {} failed: {}", content_url, e);
                let error = match e {
                    GraphError::AccessDenied(_) => ACCESS_DENIED_MESSAGE.to_string(),
                    other => other.to_string(),
                };
                DownloadOutcome {
                    success: false,
                    content_url: content_url.to_string(),
                    path: None,
                    size: None,
                    error: Some(error),
                }
            }
        }
    }

    async fn fetch_shared_file(
        &self,
        content_url: &str,
        dir: &Path,
    ) -> Result<(PathBuf, usize), GraphError> {
        let share_id = encode_sharing_url(content_url);

        let item: DriveItem = self
            .get_json(
                GraphRequest::get(format!("/shares/{}/driveItem", share_id))
                    .query("$select", "name"),
            )
            .await?;
        let name = item
            .name
            .as_deref()
            .and_then(safe_file_name)
            .unwrap_or_else(|| "download.bin".to_string());

        let data = self
            .transport
            .download(&format!("/shares/{}/driveItem/content", share_id), &[])
            .await?;

        let path = dir.join(name);
        tokio::fs::write(&path, &data).await?;
        Ok((path, data.len()))
    }

    /// Save an inline image (hosted content) of a chat message to disk
    pub async fn download_hosted_content(
        &self,
        params: &DownloadHostedContentParams,
    ) -> Result<HostedContentDownload, GraphError> {
        let data = self
            .transport
            .download(
                &format!(
                    "/chats/{}/messages/{}/hostedContents/{}/$value",
                    segment(&params.chat_id),
                    segment(&params.message_id),
                    segment(&params.hosted_content_id)
                ),
                &[],
            )
            .await?;

        let dir = PathBuf::from(params.target_dir.as_deref().unwrap_or("."));
        tokio::fs::create_dir_all(&dir).await?;

        let name = hosted_content_file_name(&params.hosted_content_id, sniff_image_extension(&data));
        let path = dir.join(name);
        tokio::fs::write(&path, &data).await?;

        tracing::info!("Saved hosted content ({} bytes) to {}", data.len(), path.display());
        Ok(HostedContentDownload {
            path: path.display().to_string(),
            size: data.len(),
        })
    }
}

fn summarize_event(event: Event) -> EventSummary {
    let join_url = event.online_meeting.and_then(|m| m.join_url);
    let chat_id = match (event.is_online_meeting, join_url.as_deref()) {
        (Some(true), Some(url)) => chat_id_from_join_url(url).ok(),
        _ => None,
    };
    let organizer = event
        .organizer
        .and_then(|o| o.email_address)
        .unwrap_or_default();

    EventSummary {
        id: event.id,
        subject: event.subject,
        body: event.body.and_then(|b| b.content),
        start: event.start.and_then(|s| s.date_time),
        end: event.end.and_then(|e| e.date_time),
        location: event.location.and_then(|l| l.display_name),
        is_online_meeting: event.is_online_meeting,
        online_meeting_url: join_url,
        chat_id,
        attendees: event
            .attendees
            .into_iter()
            .map(|a| {
                let address = a.email_address.unwrap_or_default();
                AttendeeSummary {
                    name: address.name,
                    email: address.address,
                    attendee_type: a.attendee_type,
                    status: a.status.and_then(|s| s.response),
                }
            })
            .collect(),
        organizer: OrganizerSummary {
            name: organizer.name,
            email: organizer.address,
        },
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn cursor(token: &Option<String>) -> Option<PageCursor> {
    non_empty(token).map(PageCursor::new)
}

/// Percent-encode an id for use as one path segment
fn segment(id: &str) -> Cow<'_, str> {
    urlencoding::encode(id)
}

fn parse_bound(name: &str, value: &str) -> Result<DateTime<Utc>, GraphError> {
    parse_timestamp(value).ok_or_else(|| {
        GraphError::InvalidInput(format!("{} is not an ISO 8601 datetime: {}", name, value))
    })
}

/// Normalized UTC literal for an unquoted OData datetime comparison
fn odata_datetime(name: &str, value: &str) -> Result<String, GraphError> {
    parse_bound(name, value).map(|at| at.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

fn to_json<T: Serialize>(payload: &T) -> Result<serde_json::Value, GraphError> {
    serde_json::to_value(payload)
        .map_err(|e| GraphError::ParseError(format!("Failed to serialize request: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::params::{ChatType, Importance, SearchScope};
    use crate::graph::transport::HttpMethod;
    use crate::teams::BodyContentType;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Mutex;

    type Responder = Box<dyn Fn(&GraphRequest) -> Result<Value, GraphError> + Send + Sync>;

    /// In-memory transport recording every request
    struct FakeTransport {
        responder: Responder,
        downloads: HashMap<String, Result<Vec<u8>, u16>>,
        requests: Mutex<Vec<GraphRequest>>,
        download_requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
    }

    impl FakeTransport {
        fn new(responder: impl Fn(&GraphRequest) -> Result<Value, GraphError> + Send + Sync + 'static) -> Arc<Self> {
            Self::with_downloads(responder, HashMap::new())
        }

        fn with_downloads(
            responder: impl Fn(&GraphRequest) -> Result<Value, GraphError> + Send + Sync + 'static,
            downloads: HashMap<String, Result<Vec<u8>, u16>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                responder: Box::new(responder),
                downloads,
                requests: Mutex::new(Vec::new()),
                download_requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<GraphRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GraphTransport for FakeTransport {
        async fn request(&self, request: GraphRequest) -> Result<Value, GraphError> {
            let response = (self.responder)(&request);
            self.requests.lock().unwrap().push(request);
            response
        }

        async fn download(
            &self,
            path: &str,
            query: &[(String, String)],
        ) -> Result<Vec<u8>, GraphError> {
            self.download_requests
                .lock()
                .unwrap()
                .push((path.to_string(), query.to_vec()));
            match self.downloads.get(path) {
                Some(Ok(bytes)) => Ok(bytes.clone()),
                Some(Err(403)) => Err(GraphError::AccessDenied("accessDenied".to_string())),
                Some(Err(status)) => Err(GraphError::ServerError(*status, String::new())),
                None => Err(GraphError::NotFound(path.to_string())),
            }
        }
    }

    fn service(transport: Arc<FakeTransport>) -> GraphQueryService {
        GraphQueryService::new(transport)
    }

    const JOIN_URL: &str = "https://teams.microsoft.com/l/meetup-join/19%3ameeting_abc%40thread.v2/0?context=%7B%22Tid%22%3A%22t1%22%2C%22Oid%22%3A%22o1%22%7D";

    #[tokio::test]
    async fn test_search_chats_query_and_next_token() {
        let transport = FakeTransport::new(|_| {
            Ok(json!({
                "@odata.nextLink": "https://graph.microsoft.com/v1.0/me/chats?$expand=members&$skiptoken=XYZ123",
                "value": [{
                    "id": "19:c1@thread.v2",
                    "topic": "Let's Talk",
                    "chatType": "group",
                    "members": [{"displayName": "Ann", "email": "ann@contoso.com"}]
                }]
            }))
        });
        let svc = service(transport.clone());

        let result = svc
            .search_chats(&SearchChatsParams {
                search_term: Some("Let's".to_string()),
                member_name: Some("O'Neil".to_string()),
                chat_types: vec![ChatType::Group, ChatType::Meeting],
                limit: Some(500),
                skip_token: Some("PREV".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(result.next_token.as_deref(), Some("XYZ123"));
        assert_eq!(result.chats.len(), 1);
        assert_eq!(result.chats[0].members[0].display_name.as_deref(), Some("Ann"));

        let request = &transport.requests()[0];
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.path, "/me/chats");
        assert_eq!(request.query_param("$expand"), Some("members"));
        assert_eq!(request.query_param("$top"), Some("50"));
        assert_eq!(request.query_param("$skiptoken"), Some("PREV"));
        assert_eq!(
            request.query_param("$filter"),
            Some(
                "contains(topic, 'Let''s') and \
                 members/any(c:contains(c/displayName, 'O''Neil')) and \
                 (chatType eq 'group' or chatType eq 'meeting')"
            )
        );
    }

    #[tokio::test]
    async fn test_search_chats_next_token_feeds_next_request() {
        let transport = FakeTransport::new(|request| {
            if request.query_param("$skiptoken").is_some() {
                Ok(json!({"value": []}))
            } else {
                Ok(json!({
                    "@odata.nextLink": "https://graph.microsoft.com/v1.0/me/chats?$skiptoken=XYZ123",
                    "value": []
                }))
            }
        });
        let svc = service(transport.clone());

        let first = svc.search_chats(&SearchChatsParams::default()).await.unwrap();
        let second = svc
            .search_chats(&SearchChatsParams {
                skip_token: first.next_token.clone(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(first.next_token.as_deref(), Some("XYZ123"));
        assert!(second.next_token.is_none());
        let requests = transport.requests();
        assert_eq!(requests[0].query_param("$filter"), None);
        assert_eq!(requests[0].query_param("$top"), Some("20"));
        assert_eq!(requests[1].query_param("$skiptoken"), Some("XYZ123"));
    }

    #[tokio::test]
    async fn test_list_mails_default_date_predicate_first() {
        let transport = FakeTransport::new(|_| Ok(json!({"value": []})));
        let svc = service(transport.clone());

        svc.list_mails(&ListMailsParams {
            from: Some("boss@contoso.com".to_string()),
            unread_only: true,
            has_attachments: Some(true),
            ..Default::default()
        })
        .await
        .unwrap();

        let request = &transport.requests()[0];
        assert_eq!(request.path, "/me/messages");
        assert_eq!(request.query_param("$orderby"), Some("receivedDateTime desc"));
        assert_eq!(
            request.query_param("$filter"),
            Some(
                "receivedDateTime ge 1900-01-01T00:00:00Z and \
                 from/emailAddress/address eq 'boss@contoso.com' and \
                 isRead eq false and hasAttachments eq true"
            )
        );
        assert_eq!(
            request.query_param("$select"),
            Some("id,subject,from,receivedDateTime,bodyPreview,isRead,hasAttachments")
        );
        assert!(request.headers.is_empty());
    }

    #[tokio::test]
    async fn test_list_mails_range_body_and_paging() {
        let transport = FakeTransport::new(|_| {
            Ok(json!({
                "@odata.nextLink": "https://graph.microsoft.com/v1.0/me/messages?$skiptoken=M2",
                "value": [{
                    "id": "m1",
                    "subject": "Hello",
                    "from": {"emailAddress": {"name": "Bo", "address": "bo@contoso.com"}},
                    "receivedDateTime": "2025-01-02T00:00:00Z",
                    "body": {"contentType": "text", "content": "hi"},
                    "isRead": false
                }]
            }))
        });
        let svc = service(transport.clone());

        let result = svc
            .list_mails(&ListMailsParams {
                since: Some("2025-01-01T00:00:00Z".to_string()),
                until: Some("2025-01-31T23:59:59Z".to_string()),
                from: Some("o'hara@contoso.com".to_string()),
                include_body: true,
                body_format: BodyFormat::Text,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(result.total_returned, 1);
        assert_eq!(result.next_token.as_deref(), Some("M2"));
        assert_eq!(result.messages[0].from.address.as_deref(), Some("bo@contoso.com"));

        let request = &transport.requests()[0];
        assert_eq!(
            request.query_param("$filter"),
            Some(
                "receivedDateTime ge 2025-01-01T00:00:00Z and \
                 receivedDateTime le 2025-01-31T23:59:59Z and \
                 from/emailAddress/address eq 'o''hara@contoso.com'"
            )
        );
        assert!(request.query_param("$select").unwrap().contains(",body,"));
        assert_eq!(
            request.headers,
            vec![(
                "Prefer".to_string(),
                "outlook.body-content-type=\"text\"".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_list_mails_rejects_non_datetime_bound() {
        let transport = FakeTransport::new(|_| Ok(json!({"value": []})));
        let svc = service(transport.clone());

        let err = svc
            .list_mails(&ListMailsParams {
                since: Some("2025-01-01 or isRead eq true".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, GraphError::InvalidInput(_)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_list_mails_keeps_fractional_seconds() {
        let transport = FakeTransport::new(|_| Ok(json!({"value": []})));
        let svc = service(transport.clone());

        svc.list_mails(&ListMailsParams {
            since: Some("2025-01-01T00:00:00.500Z".to_string()),
            until: Some("2025-01-01T02:00:00.250+02:00".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

        assert_eq!(
            transport.requests()[0].query_param("$filter"),
            Some(
                "receivedDateTime ge 2025-01-01T00:00:00.500Z and \
                 receivedDateTime le 2025-01-01T00:00:00.250Z"
            )
        );
    }

    #[tokio::test]
    async fn test_chat_messages_client_side_date_filter() {
        let transport = FakeTransport::new(|_| {
            Ok(json!({
                "@odata.nextLink": "https://graph.microsoft.com/v1.0/me/chats/x/messages?$skiptoken=n",
                "value": [
                    {"id": "at-from", "createdDateTime": "2025-01-01T00:00:00Z"},
                    {"id": "inside", "createdDateTime": "2025-01-10T00:00:00Z",
                     "body": {"content": "hello"}, "from": {"user": {"displayName": "Ann"}}},
                    {"id": "at-to", "createdDateTime": "2025-01-20T00:00:00Z"},
                    {"id": "undated"}
                ]
            }))
        });
        let svc = service(transport.clone());

        let result = svc
            .get_chat_messages(&GetChatMessagesParams {
                chat_id: "19:abc@thread.v2".to_string(),
                from: Some("2025-01-01T00:00:00Z".to_string()),
                to: Some("2025-01-20T00:00:00Z".to_string()),
                from_user: Some("u'1".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let ids: Vec<_> = result.messages.iter().map(|m| m.id.as_deref().unwrap()).collect();
        assert_eq!(ids, vec!["inside", "undated"]);
        assert_eq!(result.filtering_method, FilteringMethod::ClientSide);
        assert_eq!(result.total_returned, 2);
        assert!(result.has_more);
        assert_eq!(result.messages[0].content.as_deref(), Some("hello"));
        assert_eq!(result.messages[0].from.as_deref(), Some("Ann"));

        let request = &transport.requests()[0];
        assert_eq!(request.path, "/me/chats/19%3Aabc%40thread.v2/messages");
        assert_eq!(request.query_param("$orderby"), Some("createdDateTime desc"));
        assert_eq!(request.query_param("$filter"), Some("from/user/id eq 'u''1'"));
    }

    #[tokio::test]
    async fn test_chat_messages_server_side_without_range() {
        let transport = FakeTransport::new(|_| Ok(json!({"value": [{"id": "a"}]})));
        let svc = service(transport);

        let result = svc
            .get_chat_messages(&GetChatMessagesParams {
                chat_id: "c".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(result.filtering_method, FilteringMethod::ServerSide);
        assert!(!result.has_more);
        assert_eq!(result.total_returned, 1);
    }

    #[tokio::test]
    async fn test_send_message_with_mentions_and_lookup_fallback() {
        let transport = FakeTransport::new(|request| match request.path.as_str() {
            "/users/u1" => Ok(json!({"displayName": "John Smith"})),
            "/users/u2" => Err(GraphError::NotFound("no such user".to_string())),
            _ => Ok(json!({"id": "msg-1"})),
        });
        let svc = service(transport.clone());

        let sent = svc
            .send_chat_message(&SendChatMessageParams {
                chat_id: "19:abc@thread.v2".to_string(),
                message: "@jane and @john, see this".to_string(),
                importance: Importance::High,
                format: BodyContentType::Text,
                mentions: vec![
                    MentionRequest {
                        mention: "@john".to_string(),
                        user_id: "u1".to_string(),
                    },
                    MentionRequest {
                        mention: "@jane".to_string(),
                        user_id: "u2".to_string(),
                    },
                ],
            })
            .await
            .unwrap();
        assert_eq!(sent.id.as_deref(), Some("msg-1"));

        let requests = transport.requests();
        let post = requests
            .iter()
            .find(|r| r.method == HttpMethod::Post)
            .unwrap();
        assert_eq!(post.path, "/me/chats/19%3Aabc%40thread.v2/messages");
        assert_eq!(
            post.body.as_ref().unwrap(),
            &json!({
                "body": {
                    "content": "<at id=\"1\">@jane</at> and <at id=\"0\">John Smith</at>, see this",
                    "contentType": "html"
                },
                "importance": "high",
                "mentions": [
                    {"id": 0, "mentionText": "@john", "mentioned": {"user": {"id": "u1"}}},
                    {"id": 1, "mentionText": "@jane", "mentioned": {"user": {"id": "u2"}}}
                ]
            })
        );
        let lookup = requests.iter().find(|r| r.path == "/users/u1").unwrap();
        assert_eq!(lookup.query_param("$select"), Some("displayName"));
    }

    #[tokio::test]
    async fn test_send_plain_message_without_mentions() {
        let transport = FakeTransport::new(|_| Ok(json!({"id": "m"})));
        let svc = service(transport.clone());

        svc.send_chat_message(&SendChatMessageParams {
            chat_id: "c".to_string(),
            message: "a < b".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].body.as_ref().unwrap(),
            &json!({
                "body": {"content": "a < b", "contentType": "text"},
                "importance": "normal"
            })
        );
    }

    #[tokio::test]
    async fn test_search_messages() {
        let transport = FakeTransport::new(|_| {
            Ok(json!({
                "value": [{
                    "hitsContainers": [{
                        "total": 7,
                        "moreResultsAvailable": true,
                        "hits": [{
                            "rank": 1,
                            "summary": "budget review",
                            "resource": {
                                "id": "m1",
                                "createdDateTime": "2025-01-02T00:00:00Z",
                                "from": {"emailAddress": {"address": "ann@contoso.com"}},
                                "channelIdentity": {"teamId": "t1", "channelId": "c1"}
                            }
                        }]
                    }]
                }]
            }))
        });
        let svc = service(transport.clone());

        let result = svc
            .search_messages(&SearchMessagesParams {
                query: Some("budget".to_string()),
                scope: SearchScope::Channels,
                limit: Some(1000),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(result.total_results, 7);
        assert!(result.more_results_available);
        assert_eq!(result.scope, "channels");
        assert_eq!(result.results[0].from.as_deref(), Some("ann@contoso.com"));
        assert_eq!(result.results[0].team_id.as_deref(), Some("t1"));

        let request = &transport.requests()[0];
        assert_eq!(request.path, "/search/query");
        let body = request.body.as_ref().unwrap();
        assert_eq!(
            body["requests"][0]["query"]["queryString"],
            "budget AND (channelIdentity/channelId:*)"
        );
        assert_eq!(body["requests"][0]["size"], 100);
        assert_eq!(body["requests"][0]["enableTopResults"], true);
    }

    #[tokio::test]
    async fn test_search_messages_no_hits() {
        let transport = FakeTransport::new(|_| Ok(json!({"value": []})));
        let result = service(transport)
            .search_messages(&SearchMessagesParams::default())
            .await
            .unwrap();
        assert!(result.results.is_empty());
        assert_eq!(result.total_results, 0);
        assert!(!result.more_results_available);
    }

    #[tokio::test]
    async fn test_calendar_events_window_and_chat_id() {
        let transport = FakeTransport::new(|_| {
            Ok(json!({
                "value": [
                    {
                        "id": "e1",
                        "subject": "Standup",
                        "start": {"dateTime": "2025-01-02T09:00:00.0000000", "timeZone": "UTC"},
                        "isOnlineMeeting": true,
                        "onlineMeeting": {"joinUrl": JOIN_URL},
                        "attendees": [{
                            "emailAddress": {"name": "Ann", "address": "ann@contoso.com"},
                            "type": "required",
                            "status": {"response": "accepted"}
                        }],
                        "organizer": {"emailAddress": {"name": "Bo", "address": "bo@contoso.com"}}
                    },
                    {
                        "id": "e2",
                        "isOnlineMeeting": true,
                        "onlineMeeting": {"joinUrl": "https://example.com/not-teams"}
                    }
                ]
            }))
        });
        let svc = service(transport.clone());

        let result = svc
            .get_calendar_events(&GetCalendarEventsParams {
                from: Some("2025-01-01T00:00:00Z".to_string()),
                subject: Some("Team's".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(result.total_returned, 2);
        assert_eq!(result.events[0].chat_id.as_deref(), Some("19:meeting_abc@thread.v2"));
        assert_eq!(result.events[0].attendees[0].status.as_deref(), Some("accepted"));
        assert_eq!(result.events[0].organizer.email.as_deref(), Some("bo@contoso.com"));
        assert!(result.events[1].chat_id.is_none());

        let request = &transport.requests()[0];
        assert_eq!(request.path, "/me/calendar/calendarView");
        assert_eq!(request.query_param("startDateTime"), Some("2025-01-01T00:00:00Z"));
        assert_eq!(request.query_param("endDateTime"), Some("2025-01-31T00:00:00Z"));
        assert_eq!(request.query_param("$orderby"), Some("start/dateTime asc"));
        assert_eq!(request.query_param("$filter"), Some("contains(subject, 'Team''s')"));
        assert_eq!(request.query_param("$top"), Some("50"));
    }

    #[test]
    fn test_resolve_meeting_is_offline() {
        let transport = FakeTransport::new(|_| Err(GraphError::NotFound("unused".to_string())));
        let svc = service(transport.clone());

        let identity = svc
            .resolve_meeting(&ResolveMeetingParams {
                join_url: JOIN_URL.to_string(),
            })
            .unwrap();
        assert_eq!(identity.chat_id, "19:meeting_abc@thread.v2");
        assert!(transport.requests().is_empty());

        let err = svc
            .resolve_meeting(&ResolveMeetingParams {
                join_url: "https://teams.microsoft.com/l/meetup-join/19%3ameeting_abc%40thread.v2/0".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, GraphError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_list_meeting_transcripts_derives_meeting_id() {
        let identity = resolve_join_url(JOIN_URL).unwrap();
        let transcripts_path = format!(
            "/me/onlineMeetings/{}/transcripts",
            urlencoding::encode(&identity.meeting_id)
        );
        let expected_path = transcripts_path.clone();

        let transport = FakeTransport::new(move |request| {
            if request.path == "/me/chats/19%3Ameeting_abc%40thread.v2" {
                Ok(json!({"id": "19:meeting_abc@thread.v2", "onlineMeetingInfo": {"joinWebUrl": JOIN_URL}}))
            } else if request.path == transcripts_path {
                Ok(json!({"value": [{"id": "tr1", "createdDateTime": "2025-01-01T10:00:00Z", "endDateTime": "2025-01-01T11:00:00Z"}]}))
            } else {
                Err(GraphError::NotFound(request.path.clone()))
            }
        });
        let svc = service(transport.clone());

        let result = svc
            .list_meeting_transcripts(&ListTranscriptsParams {
                chat_id: "19:meeting_abc@thread.v2".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(result.meeting_id, identity.meeting_id);
        assert_eq!(result.transcripts.len(), 1);
        assert_eq!(result.transcripts[0].end_date_time.as_deref(), Some("2025-01-01T11:00:00Z"));
        assert_eq!(transport.requests()[1].path, expected_path);
    }

    #[tokio::test]
    async fn test_list_transcripts_for_non_meeting_chat() {
        let transport = FakeTransport::new(|_| Ok(json!({"id": "19:x@thread.v2", "chatType": "group"})));
        let err = service(transport)
            .list_meeting_transcripts(&ListTranscriptsParams {
                chat_id: "19:x@thread.v2".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_get_meeting_transcript_parses_vtt() {
        let vtt = "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\n<v Alice>Hello</v>\n\n00:00:02.000 --> 00:00:03.000\n<v Alice>there</v>\n\n00:00:03.000 --> 00:00:04.000\n<v Bob>Hi</v>";
        let mut downloads = HashMap::new();
        downloads.insert(
            "/me/onlineMeetings/MSpv/transcripts/tr1/content".to_string(),
            Ok(vtt.as_bytes().to_vec()),
        );
        let transport = FakeTransport::with_downloads(|_| Ok(Value::Null), downloads);
        let svc = service(transport.clone());

        let text = svc
            .get_meeting_transcript(&GetTranscriptParams {
                meeting_id: "MSpv".to_string(),
                transcript_id: "tr1".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(text, "Alice: Hello there\n\nBob: Hi");
        let calls = transport.download_requests.lock().unwrap().clone();
        assert_eq!(
            calls[0].1,
            vec![("$format".to_string(), "text/vtt".to_string())]
        );
    }

    #[tokio::test]
    async fn test_download_shared_files_reports_each_url() {
        let ok_url = "https://contoso.sharepoint.com/sites/a/report.docx";
        let denied_url = "https://contoso.sharepoint.com/sites/b/secret.docx";
        let ok_id = encode_sharing_url(ok_url);
        let denied_id = encode_sharing_url(denied_url);

        let mut downloads = HashMap::new();
        downloads.insert(
            format!("/shares/{}/driveItem/content", ok_id),
            Ok(b"file-bytes".to_vec()),
        );
        downloads.insert(format!("/shares/{}/driveItem/content", denied_id), Err(403));

        let transport = FakeTransport::with_downloads(
            |request| {
                if request.path.contains("driveItem") {
                    Ok(json!({"name": "../report.docx"}))
                } else {
                    Ok(Value::Null)
                }
            },
            downloads,
        );
        let svc = service(transport);
        let dir = tempfile::tempdir().unwrap();

        let outcomes = svc
            .download_shared_files(&DownloadSharedFilesParams {
                content_urls: vec![ok_url.to_string(), denied_url.to_string()],
                target_dir: Some(dir.path().display().to_string()),
            })
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].success);
        assert_eq!(outcomes[0].size, Some(10));
        let saved = dir.path().join("report.docx");
        assert_eq!(std::fs::read(&saved).unwrap(), b"file-bytes");

        assert!(!outcomes[1].success);
        assert_eq!(outcomes[1].error.as_deref(), Some(ACCESS_DENIED_MESSAGE));
    }

    #[tokio::test]
    async fn test_download_hosted_content_names_file_by_signature() {
        let png = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        let mut downloads = HashMap::new();
        downloads.insert(
            "/chats/19%3Aabc%40thread.v2/messages/1700000000000/hostedContents/aWQ9eF8wLXd1cy1k/$value"
                .to_string(),
            Ok(png.clone()),
        );
        let transport = FakeTransport::with_downloads(|_| Ok(Value::Null), downloads);
        let svc = service(transport.clone());
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("images");

        let saved = svc
            .download_hosted_content(&DownloadHostedContentParams {
                chat_id: "19:abc@thread.v2".to_string(),
                message_id: "1700000000000".to_string(),
                hosted_content_id: "aWQ9eF8wLXd1cy1k".to_string(),
                target_dir: Some(target.display().to_string()),
            })
            .await
            .unwrap();

        let expected = target.join("image-aWQ9eF8wLXd1.png");
        assert_eq!(saved.path, expected.display().to_string());
        assert_eq!(saved.size, png.len());
        assert_eq!(std::fs::read(&expected).unwrap(), png);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_download_hosted_content_missing_writes_nothing() {
        let transport = FakeTransport::new(|_| Ok(Value::Null));
        let svc = service(transport);
        let dir = tempfile::tempdir().unwrap();

        let err = svc
            .download_hosted_content(&DownloadHostedContentParams {
                chat_id: "c".to_string(),
                message_id: "m".to_string(),
                hosted_content_id: "h".to_string(),
                target_dir: Some(dir.path().display().to_string()),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, GraphError::NotFound(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
