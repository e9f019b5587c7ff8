//! Message chunking for Discord's content limit
//!
//! Reminder text is stored and delivered as a sequence of segments, each
//! small enough to post as a single Discord message. Splitting prefers line
//! boundaries; a single line longer than the limit is hard-split on UTF-8
//! character boundaries.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Hard-split oversized lines instead of passing them through
//! - 1.0.0: Initial line-aware chunking

/// Discord message content limit
pub const MESSAGE_LIMIT: usize = 2000;

/// Chunk text into segments for message content (2000 character limit)
pub fn chunk_message(text: &str) -> Vec<String> {
    chunk_text(text, MESSAGE_LIMIT)
}

/// Split `text` into segments of at most `limit` bytes.
///
/// The input is walked line by line (`\n` delimited); a line is appended to
/// the current segment unless doing so would exceed `limit`, in which case
/// the segment is closed and a new one started. Lines inside a segment keep
/// their separator, so joining the segments with `"\n"` reconstructs the
/// original text when no line exceeds the limit.
pub fn chunk_text(text: &str, limit: usize) -> Vec<String> {
    if text.len() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in text.split('\n') {
        if line.len() > limit {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            chunks.extend(split_long_line(line, limit));
            continue;
        }

        let needed = if current.is_empty() {
            line.len()
        } else {
            current.len() + 1 + line.len()
        };
        if needed > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    // Degenerate input consisting purely of newlines produces no line
    // content above; fall back to a raw split so output stays non-empty.
    if chunks.is_empty() {
        chunks.extend(split_long_line(text, limit));
    }
    chunks
}

/// Split a single over-limit line on UTF-8 character boundaries
fn split_long_line(line: &str, limit: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();

    for ch in line.chars() {
        if current.len() + ch.len_utf8() > limit && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        current.push(ch);
    }

    if !current.is_empty() {
        parts.push(current);
    }
    parts
}
