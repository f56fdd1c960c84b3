//! Pipeline orchestrators: thin compositions of extraction, translation,
//! and the persistence boundary.

use anyhow::anyhow;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::audio::{self, ModelHandle, TranscribeStage};
use crate::error::{PipelineError, Result};
use crate::glossary::GlossaryTable;
use crate::history::{HistoryRecord, HistorySink, RecordKind};
use crate::ocr;
use crate::settings::Settings;
use crate::translate::{MyMemory, Translation, TranslationEngine};

/// The image flow has no declared source language; recognized text is
/// treated as English for translation purposes.
const IMAGE_SOURCE_LANG: &str = "en";

/// Process-scoped context: settings, the translation engine, and the
/// memoized speech model handle. Request-scoped data never lives here.
pub struct Pipeline {
    settings: Settings,
    engine: TranslationEngine<MyMemory>,
    model: ModelHandle,
    history: Arc<dyn HistorySink>,
    pending_writes: Mutex<Vec<JoinHandle<()>>>,
}

#[derive(Debug, Clone)]
pub struct ImageOutcome {
    pub extracted: String,
    pub translation: Translation,
}

#[derive(Debug, Clone)]
pub struct VideoOutcome {
    pub transcript: String,
    pub translation: Translation,
}

impl Pipeline {
    pub fn new(
        settings: Settings,
        glossary: GlossaryTable,
        history: Arc<dyn HistorySink>,
    ) -> Self {
        let remote = MyMemory::new(settings.endpoint.clone());
        let engine = TranslationEngine::new(remote, Arc::new(glossary));
        let model = ModelHandle::new(settings.whisper_model.clone());
        Self {
            settings,
            engine,
            model,
            history,
            pending_writes: Mutex::new(Vec::new()),
        }
    }

    pub async fn translate_text(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<Translation> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PipelineError::Internal(anyhow!("nothing to translate")));
        }
        ensure_declared_source(source_lang)?;
        let translation = self.engine.translate(text, source_lang, target_lang).await?;
        self.persist(
            RecordKind::Text,
            text,
            &translation.text,
            source_lang,
            target_lang,
        );
        Ok(translation)
    }

    pub async fn translate_image<F>(
        &self,
        image_bytes: &[u8],
        target_lang: &str,
        on_progress: F,
    ) -> Result<ImageOutcome>
    where
        F: FnMut(u8),
    {
        check_media_kind(image_bytes, "image")?;
        let extracted =
            ocr::extract_text(image_bytes, &self.settings.ocr_languages, on_progress).await?;
        let translation = self
            .engine
            .translate(&extracted, IMAGE_SOURCE_LANG, target_lang)
            .await?;
        self.persist(
            RecordKind::Image,
            &extracted,
            &translation.text,
            IMAGE_SOURCE_LANG,
            target_lang,
        );
        Ok(ImageOutcome {
            extracted,
            translation,
        })
    }

    pub async fn translate_video<F>(
        &self,
        video_bytes: &[u8],
        source_lang: &str,
        target_lang: &str,
        on_progress: F,
    ) -> Result<VideoOutcome>
    where
        F: FnMut(TranscribeStage, u8),
    {
        ensure_declared_source(source_lang)?;
        let extension = check_media_kind(video_bytes, "video")?;
        let transcript = audio::transcribe_video(
            &self.model,
            video_bytes,
            extension,
            speech_language(source_lang),
            on_progress,
        )
        .await?;
        let translation = self
            .engine
            .translate(&transcript, source_lang, target_lang)
            .await?;
        self.persist(
            RecordKind::Video,
            &transcript,
            &translation.text,
            source_lang,
            target_lang,
        );
        Ok(VideoOutcome {
            transcript,
            translation,
        })
    }

    /// Fire-and-forget: the pipeline never blocks on, or surfaces,
    /// persistence failures. The spawned write is tracked so [`flush`]
    /// can keep it from being dropped unscheduled at process exit.
    ///
    /// [`flush`]: Pipeline::flush
    fn persist(
        &self,
        kind: RecordKind,
        source_text: &str,
        translated_text: &str,
        source_lang: &str,
        target_lang: &str,
    ) {
        let record = HistoryRecord::new(
            &self.settings.user,
            kind,
            source_text,
            translated_text,
            source_lang,
            target_lang,
        );
        let sink = Arc::clone(&self.history);
        let handle = tokio::spawn(async move {
            if let Err(err) = sink.record(record).await {
                warn!("history write failed: {err:#}");
            }
        });
        self.pending_writes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(handle);
    }

    /// Waits for outstanding history writes, still discarding their errors.
    /// Call before letting the runtime shut down.
    pub async fn flush(&self) {
        let handles: Vec<_> = self
            .pending_writes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        for handle in handles {
            let _ = handle.await;
        }
    }
}

/// True auto-detection is unimplemented; callers must declare the source
/// language instead of passing `auto` and hoping.
fn ensure_declared_source(source_lang: &str) -> Result<()> {
    let trimmed = source_lang.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
        return Err(PipelineError::Internal(anyhow!(
            "language auto-detection is not implemented; pass an explicit source language"
        )));
    }
    Ok(())
}

/// The speech engine only takes bare two-letter codes.
fn speech_language(source_lang: &str) -> Option<&str> {
    let base = source_lang.trim().split(['-', '_']).next().unwrap_or("");
    (base.len() == 2).then_some(base)
}

/// Validates the container magic and returns the extension hint.
fn check_media_kind(bytes: &[u8], expected: &str) -> Result<&'static str> {
    let Some(kind) = infer::get(bytes) else {
        return Err(PipelineError::UnsupportedMedia(format!(
            "unrecognized file, expected {expected}"
        )));
    };
    if !kind.mime_type().starts_with(expected) {
        return Err(PipelineError::UnsupportedMedia(format!(
            "expected {expected}, got {}",
            kind.mime_type()
        )));
    }
    Ok(kind.extension())
}
