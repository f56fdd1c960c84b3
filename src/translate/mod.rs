//! Chunked translation engine with glossary override and per-chunk
//! partial-failure fallback.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::glossary::GlossaryTable;

mod chunk;
mod remote;

pub use chunk::{split_chunks, MAX_CHUNK_CHARS};
pub use remote::{MyMemory, RemoteError, RemoteFuture, RemoteTranslator, DEFAULT_ENDPOINT};

/// Pause between chunk requests so the free endpoint does not rate-limit us.
pub const CHUNK_DELAY: Duration = Duration::from_millis(300);

/// Result of translating one chunk. A remote failure never raises; the
/// original chunk text is carried through instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    Translated(String),
    PassthroughOriginal(String),
}

impl ChunkOutcome {
    pub fn text(&self) -> &str {
        match self {
            ChunkOutcome::Translated(text) | ChunkOutcome::PassthroughOriginal(text) => text,
        }
    }

    pub fn is_translated(&self) -> bool {
        matches!(self, ChunkOutcome::Translated(_))
    }
}

#[derive(Debug, Clone)]
pub struct Translation {
    /// Chunk outcomes joined with single spaces.
    pub text: String,
    pub chunks: Vec<ChunkOutcome>,
}

pub struct TranslationEngine<R> {
    remote: R,
    glossary: Arc<GlossaryTable>,
}

impl<R: RemoteTranslator> TranslationEngine<R> {
    pub fn new(remote: R, glossary: Arc<GlossaryTable>) -> Self {
        Self { remote, glossary }
    }

    /// Translates `text` chunk by chunk, strictly in order.
    ///
    /// Glossary substitution runs before chunking (so multi-word terms are
    /// never severed) and again on every remote response (the endpoint may
    /// translate a substituted term back out, or miss one it never saw).
    ///
    /// The only fatal outcome is [`PipelineError::InvalidLanguagePair`]:
    /// the remote reporting an unsupported pair is systemic, so remaining
    /// chunks are not attempted. Every other chunk failure degrades to
    /// [`ChunkOutcome::PassthroughOriginal`].
    ///
    /// Callers guard against empty input; an empty `text` yields an empty
    /// translation without any remote call.
    pub async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<Translation> {
        let prepared = self.glossary.substitute(text, target_lang);
        let chunks = split_chunks(&prepared);
        let total = chunks.len();
        debug!(total, source_lang, target_lang, "translating chunks");

        let mut outcomes = Vec::with_capacity(total);
        for (idx, chunk_text) in chunks.into_iter().enumerate() {
            if chunk_text.is_empty() {
                continue;
            }
            match self
                .remote
                .translate_chunk(&chunk_text, source_lang, target_lang)
                .await
            {
                Ok(translated) => {
                    let polished = self.glossary.substitute(&translated, target_lang);
                    outcomes.push(ChunkOutcome::Translated(polished));
                }
                Err(RemoteError::InvalidLanguagePair) => {
                    return Err(PipelineError::InvalidLanguagePair {
                        source_lang: source_lang.to_string(),
                        target_lang: target_lang.to_string(),
                    });
                }
                Err(err) => {
                    warn!(chunk = idx, "remote call failed, keeping original text: {err}");
                    outcomes.push(ChunkOutcome::PassthroughOriginal(chunk_text));
                }
            }
            if idx + 1 < total {
                tokio::time::sleep(CHUNK_DELAY).await;
            }
        }

        let text = outcomes
            .iter()
            .map(ChunkOutcome::text)
            .collect::<Vec<_>>()
            .join(" ");
        Ok(Translation {
            text,
            chunks: outcomes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted remote: pops one response per call and counts invocations.
    struct StubRemote {
        responses: Mutex<Vec<Result<String, RemoteError>>>,
        calls: AtomicUsize,
    }

    impl StubRemote {
        fn new(responses: Vec<Result<String, RemoteError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl RemoteTranslator for Arc<StubRemote> {
        fn translate_chunk(&self, text: &str, _source: &str, _target: &str) -> RemoteFuture {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            let next = if responses.is_empty() {
                Err(RemoteError::Transport("exhausted".into()))
            } else {
                responses.remove(0)
            };
            let _ = text;
            Box::pin(async move { next })
        }
    }

    fn engine(remote: Arc<StubRemote>) -> TranslationEngine<Arc<StubRemote>> {
        let glossary = Arc::new(GlossaryTable::load().unwrap());
        TranslationEngine::new(remote, glossary)
    }

    #[tokio::test]
    async fn single_chunk_end_to_end() {
        let remote = StubRemote::new(vec![Ok("hola. adios.".to_string())]);
        let engine = engine(remote.clone());
        let result = engine.translate("hello. goodbye.", "en", "es").await.unwrap();
        assert_eq!(result.text, "hola. adios.");
        assert_eq!(result.chunks.len(), 1);
        assert!(result.chunks[0].is_translated());
        assert_eq!(remote.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn total_network_failure_returns_substituted_input() {
        let remote = StubRemote::new(vec![]);
        let engine = engine(remote.clone());
        let text = "The cardiologist ordered a blood test. ".repeat(20);
        let result = engine.translate(&text, "en", "hi").await.unwrap();

        assert!(!result.text.is_empty());
        assert!(result.chunks.iter().all(|c| !c.is_translated()));
        // Passthrough still carries the glossary pre-pass.
        assert!(result.text.contains("हृदय रोग विशेषज्ञ"));
        assert!(!result.text.contains("cardiologist"));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_pair_stops_remaining_chunks() {
        let remote = StubRemote::new(vec![Err(RemoteError::InvalidLanguagePair)]);
        let engine = engine(remote.clone());
        let text = "One long sentence for the first chunk goes here. ".repeat(30);
        let err = engine.translate(&text, "en", "xx").await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidLanguagePair { .. }));
        assert_eq!(err.to_string(), "invalid language pair: en|xx");
        // The pair is plain data, not a wrapped cause.
        assert!(std::error::Error::source(&err).is_none());
        assert_eq!(remote.calls(), 1);
    }

    #[tokio::test]
    async fn glossary_is_reapplied_to_the_response() {
        let remote = StubRemote::new(vec![Ok("patient has cancer".to_string())]);
        let engine = engine(remote.clone());
        let result = engine.translate("something benign", "en", "hi").await.unwrap();
        assert_eq!(result.text, "patient has कैंसर");
    }

    #[tokio::test(start_paused = true)]
    async fn mixed_outcomes_keep_chunk_order() {
        let remote = StubRemote::new(vec![
            Ok("first out".to_string()),
            Err(RemoteError::Http(500)),
            Ok("third out".to_string()),
        ]);
        let engine = engine(remote.clone());
        let mut text = String::new();
        for i in 0..60 {
            text.push_str(&format!("Sentence number {i} fills up the chunk budget. "));
        }
        let result = engine.translate(&text, "en", "es").await.unwrap();
        assert!(result.chunks.len() >= 3);
        assert_eq!(remote.calls(), result.chunks.len());
        assert!(result.chunks[0].is_translated());
        assert!(!result.chunks[1].is_translated());
        assert!(result.chunks[2].is_translated());
        assert_eq!(result.chunks[0].text(), "first out");
    }
}
