use std::collections::VecDeque;

/// How many distinct sentences back the stutter filter looks.
const LOOKBACK: usize = 3;

/// Collapses the immediate stutter artifacts streaming inference produces,
/// independent of the decoder's own repeat guard.
///
/// Sentences are walked in order with a sliding window of the last
/// [`LOOKBACK`] distinct normalized sentences; a sentence already in the
/// window is dropped. Genuine refrains further apart than the window are
/// preserved.
pub fn suppress_repetition(transcript: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut window: VecDeque<String> = VecDeque::new();

    for sentence in transcript.split(['.', '!', '?']) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }
        let normalized = sentence.to_lowercase();
        if window.contains(&normalized) {
            continue;
        }
        kept.push(sentence);
        window.push_back(normalized);
        if window.len() > LOOKBACK {
            window.pop_front();
        }
    }

    if kept.is_empty() {
        return String::new();
    }
    format!("{}.", kept.join(". "))
}
