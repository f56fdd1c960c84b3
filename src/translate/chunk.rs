use regex::Regex;
use std::sync::LazyLock;

/// Per-request budget of the remote endpoint, in characters.
pub const MAX_CHUNK_CHARS: usize = 500;

/// One terminated sentence, terminator included.
static SENTENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^.!?]+[.!?]+").expect("sentence pattern compiles"));

/// Splits text into ordered chunks of at most [`MAX_CHUNK_CHARS`] characters.
///
/// Short text is a single chunk. Longer text is split on sentence
/// terminators and the sentences packed greedily, so no sentence is ever
/// severed mid-way. A trailing fragment without a terminator is kept as a
/// final sentence; rejoining the chunks reconstructs the input up to
/// per-chunk whitespace trimming.
pub fn split_chunks(text: &str) -> Vec<String> {
    if text.chars().count() <= MAX_CHUNK_CHARS {
        return vec![text.to_string()];
    }

    let mut sentences: Vec<&str> = Vec::new();
    let mut consumed = 0;
    for found in SENTENCE.find_iter(text) {
        sentences.push(found.as_str());
        consumed = found.end();
    }
    if consumed < text.len() {
        let tail = &text[consumed..];
        if !tail.trim().is_empty() {
            sentences.push(tail);
        }
    }
    if sentences.is_empty() {
        sentences.push(text);
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    for sentence in sentences {
        let sentence_len = sentence.chars().count();
        if current_len + sentence_len <= MAX_CHUNK_CHARS {
            current.push_str(sentence);
            current_len += sentence_len;
            continue;
        }
        if !current.trim().is_empty() {
            chunks.push(current.trim().to_string());
        }
        if sentence_len <= MAX_CHUNK_CHARS {
            current = sentence.to_string();
            current_len = sentence_len;
        } else {
            // A single sentence over budget has no boundary to split on;
            // hard-wrap it so the per-request limit always holds.
            chunks.extend(hard_wrap(sentence));
            current = String::new();
            current_len = 0;
        }
    }
    if !current.trim().is_empty() {
        chunks.push(current.trim().to_string());
    }
    chunks
}

fn hard_wrap(sentence: &str) -> Vec<String> {
    let chars: Vec<char> = sentence.chars().collect();
    chars
        .chunks(MAX_CHUNK_CHARS)
        .map(|piece| piece.iter().collect::<String>().trim().to_string())
        .filter(|piece| !piece.is_empty())
        .collect()
}
