use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;
use tracing::info;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

pub const SAMPLE_RATE: usize = 16_000;
const WINDOW_SECS: usize = 15;
const OVERLAP_SECS: usize = 3;

pub const DEFAULT_MODEL: &str = "tiny";
const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Process-scoped, lazily initialized speech model.
///
/// Initialization downloads and loads the model, which is expensive and a
/// suspension point; the `OnceCell` makes concurrent first use single-flight
/// so the model is never loaded twice.
pub struct ModelHandle {
    name: String,
    cell: OnceCell<WhisperEngine>,
}

impl ModelHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cell: OnceCell::new(),
        }
    }

    pub async fn get(&self) -> Result<&WhisperEngine> {
        self.cell
            .get_or_try_init(|| WhisperEngine::load(&self.name))
            .await
    }
}

pub struct WhisperEngine {
    ctx: WhisperContext,
}

impl WhisperEngine {
    pub async fn load(model: &str) -> Result<Self> {
        let path = ensure_model(model).await?;
        let model_path = path.to_string_lossy();
        let ctx = WhisperContext::new_with_params(
            model_path.as_ref(),
            WhisperContextParameters::default(),
        )
        .with_context(|| "failed to load speech model")?;
        Ok(Self { ctx })
    }

    /// Runs inference over 15-second analysis windows advanced with a
    /// 3-second overlap, reporting internal progress (0-100) after each
    /// window. Seam duplicates from the overlap are handled by the
    /// transcript-level repetition suppression downstream.
    pub fn transcribe<F>(
        &self,
        samples: &[f32],
        language: Option<&str>,
        mut on_progress: F,
    ) -> Result<String>
    where
        F: FnMut(u8),
    {
        if samples.len() < SAMPLE_RATE / 2 {
            return Ok(String::new());
        }

        let window = WINDOW_SECS * SAMPLE_RATE;
        let hop = window - OVERLAP_SECS * SAMPLE_RATE;
        let mut ranges = Vec::new();
        let mut start = 0usize;
        loop {
            let end = (start + window).min(samples.len());
            ranges.push(start..end);
            if end == samples.len() {
                break;
            }
            start += hop;
        }
        let total = ranges.len();

        let mut state = self
            .ctx
            .create_state()
            .with_context(|| "failed to init inference state")?;
        let mut parts = Vec::new();
        for (idx, range) in ranges.into_iter().enumerate() {
            let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
            params.set_n_threads(num_cpus::get() as i32);
            params.set_translate(false);
            params.set_no_timestamps(true);
            params.set_suppress_blank(true);
            // The decoder's own repeat guard: entropy-based failure
            // detection with temperature fallback.
            params.set_entropy_thold(2.4);
            params.set_temperature(0.0);
            params.set_temperature_inc(0.2);
            if let Some(lang) = language {
                params.set_language(Some(lang));
            }

            state
                .full(params, &samples[range])
                .with_context(|| "speech inference failed")?;

            let num_segments = state
                .full_n_segments()
                .with_context(|| "failed to read segments")?;
            for segment in 0..num_segments {
                let text = state
                    .full_get_segment_text(segment)
                    .with_context(|| "failed to read segment text")?;
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    parts.push(trimmed.to_string());
                }
            }
            on_progress((((idx + 1) * 100) / total) as u8);
        }
        Ok(parts.join(" "))
    }
}

async fn ensure_model(model: &str) -> Result<PathBuf> {
    let normalized = normalize_model_name(model)
        .ok_or_else(|| anyhow!("unknown speech model '{model}' (expected tiny/base/small/...)"))?;
    let dest = default_model_path(&normalized)?;
    if dest.exists() {
        return Ok(dest);
    }

    let url = format!("{MODEL_BASE_URL}/ggml-{normalized}.bin");
    info!("speech model not found; downloading {normalized} ...");
    download_model(&url, &dest).await?;
    Ok(dest)
}

fn default_model_path(model: &str) -> Result<PathBuf> {
    let file = format!("ggml-{model}.bin");
    if let Ok(home) = std::env::var("HOME") {
        let home = home.trim();
        if !home.is_empty() {
            return Ok(Path::new(home).join(".anuvaad/.cache/whisper").join(file));
        }
    }
    Ok(Path::new(".anuvaad/.cache/whisper").join(file))
}

fn normalize_model_name(input: &str) -> Option<String> {
    let raw = input.trim().to_lowercase();
    if raw.is_empty() {
        return None;
    }
    let trimmed = raw.strip_prefix("ggml-").unwrap_or(raw.as_str());
    let trimmed = trimmed.strip_suffix(".bin").unwrap_or(trimmed);

    let allowed = [
        "tiny",
        "base",
        "small",
        "medium",
        "large",
        "large-v2",
        "large-v3",
        "tiny.en",
        "base.en",
        "small.en",
        "medium.en",
    ];
    allowed
        .contains(&trimmed)
        .then(|| trimmed.to_string())
}

async fn download_model(url: &str, dest: &Path) -> Result<()> {
    let dir = dest.parent().ok_or_else(|| anyhow!("invalid model path"))?;
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create model dir: {}", dir.display()))?;

    let response = reqwest::get(url)
        .await
        .with_context(|| format!("failed to download speech model: {url}"))?;
    if !response.status().is_success() {
        return Err(anyhow!(
            "failed to download speech model: {url} (status {})",
            response.status()
        ));
    }

    let tmp = dest.with_extension("bin.part");
    let mut file = fs::File::create(&tmp)
        .with_context(|| format!("failed to write model: {}", tmp.display()))?;
    let mut stream = response.bytes_stream();
    use futures_util::StreamExt;
    while let Some(piece) = stream.next().await {
        let piece = piece.with_context(|| "failed to read model bytes")?;
        std::io::Write::write_all(&mut file, &piece)?;
    }
    fs::rename(&tmp, dest)
        .with_context(|| format!("failed to finalize model: {}", dest.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::normalize_model_name;

    #[test]
    fn accepts_plain_and_decorated_model_names() {
        assert_eq!(normalize_model_name("tiny").as_deref(), Some("tiny"));
        assert_eq!(normalize_model_name("ggml-base.bin").as_deref(), Some("base"));
        assert_eq!(normalize_model_name("ggml-tiny").as_deref(), Some("tiny"));
        assert_eq!(normalize_model_name("small.bin").as_deref(), Some("small"));
        assert_eq!(normalize_model_name(" LARGE-V3 ").as_deref(), Some("large-v3"));
        assert!(normalize_model_name("gpt2").is_none());
        assert!(normalize_model_name("").is_none());
    }
}
