use thiserror::Error;

/// Failures that terminate a pipeline call.
///
/// Per-chunk remote translation failures are deliberately absent: the
/// engine absorbs them by passing the original chunk through untranslated
/// (see [`crate::translate::ChunkOutcome`]).
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no text detected in image")]
    NoTextDetected,

    #[error("no speech detected in video")]
    NoSpeechDetected,

    #[error("invalid language pair: {source_lang}|{target_lang}")]
    InvalidLanguagePair {
        source_lang: String,
        target_lang: String,
    },

    #[error("unsupported media: {0}")]
    UnsupportedMedia(String),

    #[error("text-to-speech is not available on this host (install macOS 'say' or Linux 'espeak')")]
    SpeechUnsupported,

    /// Infrastructure failure (missing ffmpeg/tesseract, model download,
    /// filesystem). Carries the full context chain.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
