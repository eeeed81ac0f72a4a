//! Sentence-aligned text segmentation.
//!
//! Text is split into sentence units on `.`, `!` and `?`, then packed
//! greedily into chunks of at most `max_chunk_size` characters. Chunk
//! boundaries only ever fall between sentences, so a sentence longer than
//! the cap becomes its own oversized chunk.

/// One chunk produced by [`segments`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,

    /// A single sentence longer than the cap, emitted whole.
    pub oversized: bool,
}

/// Split `text` into sentence-like units, keeping each unit's terminal
/// punctuation. A trailing fragment without punctuation gets a `.`.
pub fn sentences(text: &str) -> Vec<String> {
    let mut units = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            push_unit(&mut units, &current);
            current.clear();
        }
    }
    if !current.trim().is_empty() {
        let mut tail = current.trim().to_string();
        tail.push('.');
        units.push(tail);
    }
    units
}

fn push_unit(units: &mut Vec<String>, raw: &str) {
    let body = raw.trim();
    // A bare punctuation mark ("..." runs, "?!") carries no content.
    if body.chars().any(|c| !matches!(c, '.' | '!' | '?')) {
        units.push(body.to_string());
    }
}

/// Segment `text` into chunks, flagging oversized single sentences.
pub fn segments(text: &str, max_chunk_size: usize) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut buffer = String::new();
    let mut buffer_len = 0usize;

    for unit in sentences(text) {
        let unit_len = unit.chars().count();
        let joined_len = if buffer.is_empty() {
            unit_len
        } else {
            buffer_len + 1 + unit_len
        };

        if joined_len > max_chunk_size && !buffer.is_empty() {
            flush(&mut out, &mut buffer, buffer_len, max_chunk_size);
            buffer = unit;
            buffer_len = unit_len;
        } else {
            if !buffer.is_empty() {
                buffer.push(' ');
            }
            buffer.push_str(&unit);
            buffer_len = joined_len;
        }
    }
    flush(&mut out, &mut buffer, buffer_len, max_chunk_size);
    out
}

fn flush(out: &mut Vec<Segment>, buffer: &mut String, len: usize, max: usize) {
    if buffer.is_empty() {
        return;
    }
    out.push(Segment {
        text: std::mem::take(buffer),
        oversized: len > max,
    });
}

/// Segment `text` into chunk strings.
pub fn segment(text: &str, max_chunk_size: usize) -> Vec<String> {
    segments(text, max_chunk_size)
        .into_iter()
        .map(|s| s.text)
        .collect()
}
