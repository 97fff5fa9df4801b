//! @mention markup for Teams chat messages
//!
//! Graph correlates `<at id="N">` tags in the message body with entry `N` of the
//! payload's `mentions` array, so tag ids and array ids are assigned together.

use serde::{Deserialize, Serialize};

/// Message body content type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyContentType {
    #[default]
    Text,
    Html,
}

/// A caller-supplied mention: replace `token` in the body with a mention of `user_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionMapping {
    /// Literal surface text to replace, e.g. `@john`
    pub token: String,
    pub user_id: String,
    /// Text rendered inside the mention tag
    pub display_name: String,
}

/// One entry of a chat message's `mentions` array
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Mention {
    pub id: u32,
    pub mention_text: String,
    pub mentioned: MentionedIdentity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MentionedIdentity {
    pub user: MentionedUser,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MentionedUser {
    pub id: String,
}

/// Message body after mention processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionedBody {
    pub content: String,
    pub content_type: BodyContentType,
    pub mentions: Vec<Mention>,
}

enum Segment {
    Text(String),
    Markup(String),
}

/// Replace every occurrence of each mapping's token with mention markup.
///
/// Ids start at 0 and follow the order of `mappings`; a mapping whose token
/// never occurs gets no id and no entry. Tokens are only matched in the
/// original text, never inside markup inserted for an earlier mapping. When
/// any mention is inserted the body becomes HTML, and plain-text input is
/// HTML-escaped first.
pub fn process_mentions(
    content: &str,
    content_type: BodyContentType,
    mappings: &[MentionMapping],
) -> MentionedBody {
    let mut segments = vec![Segment::Text(content.to_string())];
    let mut mentions = Vec::new();

    for mapping in mappings {
        if mapping.token.is_empty() {
            continue;
        }

        let id = mentions.len() as u32;
        let tag = format!(
            "<at id=\"{}\">{}</at>",
            id,
            escape_html(&mapping.display_name)
        );

        let mut replaced = false;
        let mut next = Vec::with_capacity(segments.len());
        for segment in segments {
            match segment {
                Segment::Text(text) if text.contains(mapping.token.as_str()) => {
                    replaced = true;
                    let mut parts = text.split(mapping.token.as_str()).peekable();
                    while let Some(part) = parts.next() {
                        if !part.is_empty() {
                            next.push(Segment::Text(part.to_string()));
                        }
                        if parts.peek().is_some() {
                            next.push(Segment::Markup(tag.clone()));
                        }
                    }
                }
                other => next.push(other),
            }
        }
        segments = next;

        if replaced {
            mentions.push(Mention {
                id,
                mention_text: mapping.token.clone(),
                mentioned: MentionedIdentity {
                    user: MentionedUser {
                        id: mapping.user_id.clone(),
                    },
                },
            });
        }
    }

    if mentions.is_empty() {
        return MentionedBody {
            content: content.to_string(),
            content_type,
            mentions,
        };
    }

    let escape_text = content_type == BodyContentType::Text;
    let content = segments
        .into_iter()
        .map(|segment| match segment {
            Segment::Text(text) if escape_text => escape_html(&text),
            Segment::Text(text) | Segment::Markup(text) => text,
        })
        .collect();

    MentionedBody {
        content,
        content_type: BodyContentType::Html,
        mentions,
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
