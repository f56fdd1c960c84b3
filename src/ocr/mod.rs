//! Optical extraction: image preprocessing plus multi-script recognition.

use anyhow::{anyhow, Context};
use image::DynamicImage;
use std::io::Write;
use std::process::Command;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::external::ensure_command;

mod preprocess;

/// Fixed simultaneous recognition set. The stage is script-agnostic within
/// this set; it never auto-detects and narrows.
pub const OCR_LANGUAGES: &str = "eng+hin+mar+ara+spa+fra+deu+ita+por+rus+jpn+kor+chi_sim";

/// Extracts text from an encoded image.
///
/// The progress callback receives 0-100 integers for the recognition step
/// only; preprocessing is not separately reported. With a subprocess
/// recognizer the observable points are the invocation boundaries.
pub async fn extract_text<F>(
    image_bytes: &[u8],
    languages: &str,
    mut on_progress: F,
) -> Result<String>
where
    F: FnMut(u8),
{
    ensure_command("tesseract", "optical extraction requires tesseract")?;

    let image = image::load_from_memory(image_bytes)
        .map_err(|err| PipelineError::UnsupportedMedia(format!("cannot decode image: {err}")))?;

    let enhanced = preprocess::enhance_for_recognition(&image);
    let mut tmp = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .with_context(|| "failed to create temp file for recognition")
        .map_err(PipelineError::Internal)?;
    DynamicImage::ImageRgb8(enhanced)
        .write_to(&mut tmp, image::ImageFormat::Png)
        .with_context(|| "failed to write preprocessed image")
        .map_err(PipelineError::Internal)?;
    tmp.flush().ok();

    info!(languages, "running text recognition");
    on_progress(0);
    let raw = recognize(tmp.path(), languages)?;
    on_progress(100);

    let text = tidy_lines(&raw);
    if text.is_empty() {
        return Err(PipelineError::NoTextDetected);
    }
    Ok(text)
}

fn recognize(path: &std::path::Path, languages: &str) -> Result<String> {
    let output = Command::new("tesseract")
        .arg(path)
        .arg("stdout")
        .arg("-l")
        .arg(languages)
        .arg("--oem")
        .arg("1")
        .output()
        .with_context(|| "failed to run tesseract (is it installed?)")
        .map_err(PipelineError::Internal)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PipelineError::Internal(anyhow!(
            "tesseract failed: {}",
            stderr.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Trims each recognized line and drops the empty ones.
fn tidy_lines(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
