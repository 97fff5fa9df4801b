//! Teams-specific text processing
//!
//! Join URL resolution, transcript parsing and @mention markup. Nothing here
//! performs I/O.

pub mod join_url;
pub mod mention;
pub mod transcript;

pub use join_url::{chat_id_from_join_url, resolve_join_url, JoinUrlError, MeetingIdentity};
pub use mention::{process_mentions, BodyContentType, Mention, MentionMapping, MentionedBody};
pub use transcript::parse_vtt_to_text;
