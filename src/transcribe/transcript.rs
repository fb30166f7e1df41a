//! Transcript artifact format: one `[start --> end] text` line per segment

use std::fmt::Write;

use crate::error::TranscriptionError;

use super::TranscriptSegment;

/// Render one segment line (without the trailing newline)
pub fn format_segment(segment: &TranscriptSegment) -> String {
    format!("[{:.2} --> {:.2}] {}", segment.start, segment.end, single_line(&segment.text))
}

/// Collapse every whitespace run, line breaks included, to one space
pub fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Render the whole transcript artifact
pub fn format(segments: &[TranscriptSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        // Writing to a String cannot fail
        let _ = writeln!(out, "{}", format_segment(segment));
    }
    out
}

/// Parse a transcript artifact back into segments; blank lines are skipped
pub fn parse(text: &str) -> Result<Vec<TranscriptSegment>, TranscriptionError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            parse_line(line).ok_or_else(|| TranscriptionError::MalformedLine {
                line: i + 1,
                content: line.to_string(),
            })
        })
        .collect()
}

/// True when every non-blank line is a segment line
pub fn is_transcript(text: &str) -> bool {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty()).peekable();
    lines.peek().is_some() && lines.all(|l| parse_line(l).is_some())
}

fn parse_line(line: &str) -> Option<TranscriptSegment> {
    let rest = line.trim_end().strip_prefix('[')?;
    let (times, text) = rest.split_once(']')?;
    let (start, end) = times.split_once("-->")?;

    Some(TranscriptSegment {
        start: start.trim().parse().ok()?,
        end: end.trim().parse().ok()?,
        text: text.trim().to_string(),
    })
}
