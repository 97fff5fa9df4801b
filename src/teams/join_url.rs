//! Teams meeting join URL resolution
//!
//! A join URL looks like
//! `https://teams.microsoft.com/l/meetup-join/19%3ameeting_...%40thread.v2/0?context=%7b%22Tid%22%3a...%2c%22Oid%22%3a...%7d`.
//! The path carries the meeting chat thread id and the `context` parameter
//! carries the organizer object id, which is enough to derive the online
//! meeting id without calling Graph.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const THREAD_MARKER: &str = "meetup-join/19:";
const CONTEXT_MARKER: &str = "context=";
const SNIPPET_LEN: usize = 100;

/// Join URL parse errors, one per extraction step
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JoinUrlError {
    #[error("join URL is not valid percent-encoded UTF-8: {snippet}")]
    InvalidEncoding { snippet: String },

    #[error("threadId not found in join URL: {snippet}")]
    ThreadIdNotFound { snippet: String },

    #[error("context not found in join URL: {snippet}")]
    ContextNotFound { snippet: String },

    #[error("context unparsable in join URL ({reason}): {snippet}")]
    ContextUnparsable { snippet: String, reason: String },

    #[error("organizer id missing from join URL context: {snippet}")]
    OrganizerIdMissing { snippet: String },
}

impl JoinUrlError {
    /// Name of the extraction step that failed
    pub fn step(&self) -> &'static str {
        match self {
            JoinUrlError::InvalidEncoding { .. } => "decode",
            JoinUrlError::ThreadIdNotFound { .. } => "threadId",
            JoinUrlError::ContextNotFound { .. } => "context",
            JoinUrlError::ContextUnparsable { .. } => "context",
            JoinUrlError::OrganizerIdMissing { .. } => "organizer",
        }
    }
}

/// Decoded `context` parameter of a join URL
#[derive(Debug, Clone, Deserialize)]
pub struct JoinUrlContext {
    #[serde(rename = "Oid")]
    pub organizer_id: Option<String>,
}

/// Chat thread id and derived online meeting id of a Teams meeting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingIdentity {
    pub chat_id: String,
    pub meeting_id: String,
}

/// Derive `{chatId, meetingId}` from a join URL.
///
/// `meetingId` is `base64("1*{Oid}*0**{chatId}")`, the format Graph uses for
/// `/onlineMeetings/{id}`.
pub fn resolve_join_url(join_url: &str) -> Result<MeetingIdentity, JoinUrlError> {
    let decoded = decode(join_url)?;
    let chat_id = extract_thread_id(&decoded, join_url)?;
    let context = extract_context(&decoded, join_url)?;

    let organizer_id = context
        .organizer_id
        .filter(|oid| !oid.is_empty())
        .ok_or_else(|| JoinUrlError::OrganizerIdMissing {
            snippet: snippet(join_url),
        })?;

    let meeting_id = STANDARD.encode(format!("1*{}*0**{}", organizer_id, chat_id));

    Ok(MeetingIdentity {
        chat_id: chat_id.to_string(),
        meeting_id,
    })
}

/// Extract only the chat thread id from a join URL.
pub fn chat_id_from_join_url(join_url: &str) -> Result<String, JoinUrlError> {
    let decoded = decode(join_url)?;
    extract_thread_id(&decoded, join_url).map(str::to_string)
}

fn decode(join_url: &str) -> Result<String, JoinUrlError> {
    urlencoding::decode(join_url)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| JoinUrlError::InvalidEncoding {
            snippet: snippet(join_url),
        })
}

/// `19:...` up to the next `/`
fn extract_thread_id<'a>(decoded: &'a str, raw: &str) -> Result<&'a str, JoinUrlError> {
    let not_found = || JoinUrlError::ThreadIdNotFound {
        snippet: snippet(raw),
    };

    let start = decoded.find(THREAD_MARKER).ok_or_else(not_found)? + "meetup-join/".len();
    let rest = &decoded[start..];
    let thread_id = match rest.find('/') {
        Some(end) => &rest[..end],
        None => rest,
    };

    if thread_id.len() <= "19:".len() {
        return Err(not_found());
    }
    Ok(thread_id)
}

/// The `{...}` literal following `context=`, up to the first `}`
fn extract_context(decoded: &str, raw: &str) -> Result<JoinUrlContext, JoinUrlError> {
    let not_found = || JoinUrlError::ContextNotFound {
        snippet: snippet(raw),
    };

    let start = decoded.find(CONTEXT_MARKER).ok_or_else(not_found)? + CONTEXT_MARKER.len();
    let rest = &decoded[start..];
    if !rest.starts_with('{') {
        return Err(not_found());
    }
    let end = rest.find('}').ok_or_else(not_found)?;
    let literal = &rest[..=end];

    serde_json::from_str(literal).map_err(|e| JoinUrlError::ContextUnparsable {
        snippet: snippet(raw),
        reason: e.to_string(),
    })
}

fn snippet(input: &str) -> String {
    match input.char_indices().nth(SNIPPET_LEN) {
        Some((idx, _)) => format!("{}...", &input[..idx]),
        None => input.to_string(),
    }
}
