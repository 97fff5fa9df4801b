//! KQL query assembly for Microsoft Search over chat messages

use crate::graph::params::{SearchMessagesParams, SearchScope};

/// Build the `queryString` for a `chatMessage` search.
///
/// Non-empty parts are joined with ` AND ` (`*` when there are none), then the
/// scope restriction is appended.
pub fn build_search_query(params: &SearchMessagesParams) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(query) = non_empty(&params.query) {
        parts.push(query.to_string());
    }

    if let Some(user) = non_empty(&params.mentions) {
        parts.push(format!("mentions:{}", user));
    }

    if let Some(from) = non_empty(&params.from) {
        let date_only = from.split('T').next().unwrap_or(from);
        parts.push(format!("sent>={}", date_only));
    }

    if let Some(sender) = non_empty(&params.from_user) {
        parts.push(format!("from:{}", sender));
    }

    let query = if parts.is_empty() {
        "*".to_string()
    } else {
        parts.join(" AND ")
    };

    match params.scope {
        SearchScope::All => query,
        SearchScope::Channels => format!("{} AND (channelIdentity/channelId:*)", query),
        SearchScope::Chats => format!(
            "{} AND (chatId:* AND NOT channelIdentity/channelId:*)",
            query
        ),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
