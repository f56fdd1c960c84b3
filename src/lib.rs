use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub mod audio;
pub mod error;
mod external;
pub mod glossary;
pub mod history;
pub mod logging;
pub mod ocr;
pub mod pipeline;
pub mod settings;
pub mod speech;
pub mod translate;

pub use error::PipelineError;
pub use pipeline::{ImageOutcome, Pipeline, VideoOutcome};
pub use speech::{SpeechController, SpeechState};

#[derive(Debug, Clone)]
pub struct Config {
    pub lang: String,
    pub source_lang: String,
    pub image: Option<String>,
    pub video: Option<String>,
    pub speak: bool,
    pub no_history: bool,
    pub settings_path: Option<String>,
}

pub async fn run(config: Config, input: Option<String>) -> Result<String> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;
    let glossary = glossary::GlossaryTable::load()?;
    let sink = build_history_sink(&settings, config.no_history);
    let pipeline = Pipeline::new(settings, glossary, sink);

    let output = if let Some(image_path) = config.image.as_deref() {
        let bytes = std::fs::read(image_path)
            .with_context(|| format!("failed to read image: {image_path}"))?;
        let outcome = pipeline
            .translate_image(&bytes, &config.lang, |pct| {
                info!("recognizing text: {pct}%");
            })
            .await?;
        info!("extracted text:\n{}", outcome.extracted);
        outcome.translation.text
    } else if let Some(video_path) = config.video.as_deref() {
        let bytes = std::fs::read(video_path)
            .with_context(|| format!("failed to read video: {video_path}"))?;
        let outcome = pipeline
            .translate_video(&bytes, &config.source_lang, &config.lang, |stage, pct| {
                info!("{stage}: {pct}%");
            })
            .await?;
        info!("transcript:\n{}", outcome.transcript);
        outcome.translation.text
    } else {
        let input = input.unwrap_or_default();
        let input = input.trim().to_string();
        if input.is_empty() {
            return Err(anyhow!("stdin is empty"));
        }
        let translation = pipeline
            .translate_text(&input, &config.source_lang, &config.lang)
            .await?;
        translation.text
    };

    pipeline.flush().await;

    if config.speak {
        let controller = SpeechController::new();
        controller.speak(&output, &config.lang)?;
        controller.wait();
    }

    Ok(output)
}

fn build_history_sink(
    settings: &settings::Settings,
    no_history: bool,
) -> Arc<dyn history::HistorySink> {
    if no_history {
        return Arc::new(history::NullSink);
    }
    let path = settings.history_path.clone().unwrap_or_else(|| {
        settings::home_dir()
            .map(|home| home.join(".anuvaad").join("history.jsonl"))
            .unwrap_or_else(|| ".anuvaad/history.jsonl".into())
    });
    Arc::new(history::JsonlSink::new(path))
}
