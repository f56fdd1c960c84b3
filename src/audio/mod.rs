//! Audio extraction: decode a video's audio track, run speech-to-text,
//! clean repetition artifacts.

use anyhow::{anyhow, Context};
use std::fmt;
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::external::{ensure_command, run_ffmpeg};

mod cleanup;
mod whisper;

pub use cleanup::suppress_repetition;
pub use whisper::{ModelHandle, WhisperEngine, DEFAULT_MODEL, SAMPLE_RATE};

/// Stages reported to the caller, with the fixed progress weights the UI
/// depends on: Init 10, Extracting 30, Transcribing 60..95, Complete 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscribeStage {
    Init,
    Extracting,
    Transcribing,
    Complete,
}

impl TranscribeStage {
    pub fn label(&self) -> &'static str {
        match self {
            TranscribeStage::Init => "Initializing transcription model",
            TranscribeStage::Extracting => "Extracting audio from video",
            TranscribeStage::Transcribing => "Transcribing speech to text",
            TranscribeStage::Complete => "Complete",
        }
    }
}

impl fmt::Display for TranscribeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Transcribes the audio track of a video.
///
/// `extension` is the container hint for the decoder (`mp4`, `webm`, ...).
/// `language` is the declared speech language, or `None` to let the engine
/// fall back to its own default; this is not translation-level detection.
pub async fn transcribe_video<F>(
    model: &ModelHandle,
    video_bytes: &[u8],
    extension: &str,
    language: Option<&str>,
    mut on_progress: F,
) -> Result<String>
where
    F: FnMut(TranscribeStage, u8),
{
    ensure_command("ffmpeg", "video transcription requires ffmpeg")?;

    on_progress(TranscribeStage::Init, 10);
    let engine = model.get().await?;

    on_progress(TranscribeStage::Extracting, 30);
    let samples = decode_audio_track(video_bytes, extension)?;
    info!(samples = samples.len(), "decoded audio track");

    on_progress(TranscribeStage::Transcribing, 60);
    let raw = engine.transcribe(&samples, language, |p| {
        // Interpolate the engine's internal 0-100 into the 60..95 band.
        on_progress(TranscribeStage::Transcribing, 60 + (p as f32 * 0.35).round() as u8);
    })?;
    if raw.trim().is_empty() {
        return Err(PipelineError::NoSpeechDetected);
    }

    let cleaned = suppress_repetition(&raw);
    if cleaned.is_empty() {
        return Err(PipelineError::NoSpeechDetected);
    }

    on_progress(TranscribeStage::Complete, 100);
    Ok(cleaned)
}

/// Decodes the embedded audio track to mono PCM at 16 kHz.
fn decode_audio_track(video_bytes: &[u8], extension: &str) -> Result<Vec<f32>> {
    let dir = tempdir()
        .with_context(|| "failed to create temp dir for audio")
        .map_err(PipelineError::Internal)?;
    let input_path = dir.path().join(format!("input.{extension}"));
    fs::write(&input_path, video_bytes)
        .with_context(|| "failed to write video input")
        .map_err(PipelineError::Internal)?;

    let wav_path = dir.path().join("audio.wav");
    run_ffmpeg(&[
        "-y",
        "-i",
        input_path.to_string_lossy().as_ref(),
        "-ar",
        "16000",
        "-ac",
        "1",
        wav_path.to_string_lossy().as_ref(),
    ])
    .map_err(|err| PipelineError::UnsupportedMedia(format!("cannot decode audio track: {err}")))?;

    read_wav_channel0(&wav_path)
}

/// Reads channel 0 of a WAV file as f32 samples in [-1, 1].
fn read_wav_channel0(path: &Path) -> Result<Vec<f32>> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("failed to open wav: {}", path.display()))
        .map_err(PipelineError::Internal)?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(PipelineError::Internal(anyhow!("wav has no channels")));
    }

    let all: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().map(|s| s.unwrap_or(0.0)).collect(),
        hound::SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            let max = (1i64 << (bits - 1)) as f32;
            if bits <= 16 {
                reader
                    .samples::<i16>()
                    .map(|s| s.unwrap_or(0) as f32 / max)
                    .collect()
            } else {
                reader
                    .samples::<i32>()
                    .map(|s| s.unwrap_or(0) as f32 / max)
                    .collect()
            }
        }
    };

    if channels == 1 {
        return Ok(all);
    }
    Ok(all.into_iter().step_by(channels).collect())
}

#[cfg(test)]
mod tests {
    use super::read_wav_channel0;
    use super::TranscribeStage;

    #[test]
    fn stage_labels_are_stable() {
        assert_eq!(
            TranscribeStage::Init.label(),
            "Initializing transcription model"
        );
        assert_eq!(TranscribeStage::Complete.to_string(), "Complete");
    }

    #[test]
    fn wav_reader_takes_channel_zero_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        // Left channel ascending, right channel constant.
        for i in 0..4i16 {
            writer.write_sample(i * 1000).unwrap();
            writer.write_sample(-32768i16).unwrap();
        }
        writer.finalize().unwrap();

        let samples = read_wav_channel0(&path).unwrap();
        assert_eq!(samples.len(), 4);
        for (i, sample) in samples.iter().enumerate() {
            let expected = (i as f32 * 1000.0) / 32768.0;
            assert!((sample - expected).abs() < 1e-6);
        }
    }
}
