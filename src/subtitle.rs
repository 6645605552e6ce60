use serde::{Deserialize, Serialize};

/// One timed subtitle entry. Spans are half-open: a position `p` is inside
/// the cue when `start <= p < end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleCue {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Parse a `HH:MM:SS,mmm` (or `HH:MM:SS.mmm`) timestamp into seconds.
fn parse_timestamp(t: &str) -> Option<f64> {
    let mut parts = t.trim().splitn(3, ':');
    let hours: f64 = parts.next()?.trim().parse().ok()?;
    let minutes: f64 = parts.next()?.trim().parse().ok()?;
    let rest = parts.next()?;

    let (secs, millis) = match rest.find(|c| c == ',' || c == '.') {
        Some(i) => (&rest[..i], &rest[i + 1..]),
        None => (rest, "0"),
    };
    let seconds: f64 = secs.trim().parse().ok()?;
    let millis: f64 = millis.trim().parse().ok()?;

    Some(hours * 3600.0 + minutes * 60.0 + seconds + millis / 1000.0)
}

/// Parse one blank-line-delimited block into a cue.
/// Returns None for blocks without a timing line, with unparsable
/// timestamps, or with a non-positive span.
fn parse_block(block: &str) -> Option<SubtitleCue> {
    let lines: Vec<&str> = block.lines().collect();
    let time_idx = lines.iter().position(|l| l.contains("-->"))?;

    let (start_str, end_str) = lines[time_idx].split_once("-->")?;
    let start = parse_timestamp(start_str)?;
    let end = parse_timestamp(end_str)?;
    if start >= end {
        return None;
    }

    let text = lines[time_idx + 1..].join(" ");
    Some(SubtitleCue { start, end, text })
}

/// Parse a timed-text document (SRT/VTT-style timing lines) into cues.
///
/// Permissive by design: malformed blocks are dropped, never reported, and
/// a completely unparsable document yields an empty list. Source order is
/// preserved; the input is assumed to already be sorted by start time.
pub fn parse(text: &str) -> Vec<SubtitleCue> {
    let normalized = text.replace('\r', "");

    let mut cues = Vec::new();
    for block in normalized.split("\n\n") {
        if block.trim().is_empty() {
            continue;
        }
        if let Some(cue) = parse_block(block) {
            cues.push(cue);
        }
    }
    cues
}
