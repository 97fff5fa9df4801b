//! WebVTT transcript to plain text
//!
//! Teams transcripts wrap every cue payload in a voice tag:
//!
//! ```text
//! WEBVTT
//!
//! 00:00:01.000 --> 00:00:02.000
//! <v Alice>Hello</v>
//! ```
//!
//! Timing lines are dropped and consecutive cues from the same speaker are
//! merged into one utterance.

/// One voice cue payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct VttCue<'a> {
    speaker: &'a str,
    text: &'a str,
}

/// Convert a WebVTT transcript into `Speaker: text` paragraphs separated by a
/// blank line. Lines that are not voice cues are skipped; input without any
/// voice cue yields an empty string.
pub fn parse_vtt_to_text(vtt: &str) -> String {
    let mut utterances: Vec<(String, String)> = Vec::new();
    let mut current_speaker = String::new();
    let mut current_text = String::new();

    for line in vtt.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed == "WEBVTT" || is_timestamp(trimmed) {
            continue;
        }

        let Some(cue) = voice_cue(trimmed) else {
            continue;
        };

        if cue.speaker == current_speaker {
            current_text.push(' ');
            current_text.push_str(cue.text);
        } else {
            flush(&mut utterances, &current_speaker, &current_text);
            current_speaker = cue.speaker.to_string();
            current_text = cue.text.to_string();
        }
    }
    flush(&mut utterances, &current_speaker, &current_text);

    utterances
        .iter()
        .map(|(speaker, text)| format!("{}: {}", speaker, text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn flush(utterances: &mut Vec<(String, String)>, speaker: &str, text: &str) {
    if !speaker.is_empty() && !text.is_empty() {
        utterances.push((speaker.to_string(), text.trim().to_string()));
    }
}

/// `HH:MM` at line start
fn is_timestamp(line: &str) -> bool {
    let bytes = line.as_bytes();
    bytes.len() >= 5
        && bytes[0].is_ascii_digit()
        && bytes[1].is_ascii_digit()
        && bytes[2] == b':'
        && bytes[3].is_ascii_digit()
        && bytes[4].is_ascii_digit()
}

/// `<v SPEAKER>TEXT</v>` spanning the whole line, both parts non-empty
fn voice_cue(line: &str) -> Option<VttCue<'_>> {
    let rest = line.strip_prefix("<v ")?;
    let close = rest.find('>')?;
    let speaker = &rest[..close];
    let text = rest[close + 1..].strip_suffix("</v>")?;

    if speaker.is_empty() || text.is_empty() {
        return None;
    }
    Some(VttCue { speaker, text })
}
