//! Sharing URL encoding for the `/shares` endpoint, and local file names for
//! downloaded content
//!
//! See <https://learn.microsoft.com/en-us/graph/api/shares-get>.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use std::path::Path;

/// `u!` followed by the unpadded base64url encoding of the URL
pub fn encode_sharing_url(url: &str) -> String {
    format!("u!{}", URL_SAFE_NO_PAD.encode(url))
}

/// Final path component of a drive item name, or `None` if nothing usable remains.
pub fn safe_file_name(name: &str) -> Option<String> {
    Path::new(name.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .map(str::to_string)
}

const HOSTED_ID_PREFIX_LEN: usize = 12;

/// File extension for hosted content, guessed from its leading magic bytes
pub fn sniff_image_extension(data: &[u8]) -> &'static str {
    if data.starts_with(&[0x89, 0x50]) {
        ".png"
    } else if data.starts_with(&[0xFF, 0xD8]) {
        ".jpg"
    } else if data.starts_with(&[0x47, 0x49, 0x46]) {
        ".gif"
    } else {
        ".bin"
    }
}

/// `image-{first 12 chars of the id}{ext}`
///
/// Hosted content ids are base64, so `/` is replaced to keep the name a single
/// path component.
pub fn hosted_content_file_name(hosted_content_id: &str, extension: &str) -> String {
    let prefix: String = hosted_content_id
        .chars()
        .take(HOSTED_ID_PREFIX_LEN)
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("image-{}{}", prefix, extension)
}
