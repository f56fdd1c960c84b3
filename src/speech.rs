//! Speech output: drives the host TTS engine with per-language prosody.

use anyhow::Context;
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::external::command_exists;

/// Words-per-minute baseline the rate multiplier is applied to.
const BASE_WPM: f32 = 175.0;
/// espeak's neutral pitch on its 0-99 scale.
const BASE_PITCH: f32 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechState {
    Idle,
    Speaking,
}

/// Relative voice settings, 1.0 = engine default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prosody {
    pub rate: f32,
    pub pitch: f32,
}

/// Hindi and Marathi are spoken slower and slightly higher for articulation
/// clarity; everything else gets a mild slowdown only.
pub fn prosody_for(lang: &str) -> Prosody {
    match lang.trim() {
        "hi" | "hi-IN" | "mr" | "mr-IN" => Prosody {
            rate: 0.75,
            pitch: 1.1,
        },
        _ => Prosody {
            rate: 0.9,
            pitch: 1.0,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TtsEngine {
    Say,
    Espeak,
}

fn detect_engine() -> Option<TtsEngine> {
    if command_exists("say") {
        Some(TtsEngine::Say)
    } else if command_exists("espeak") {
        Some(TtsEngine::Espeak)
    } else {
        None
    }
}

/// Two-state controller over an in-flight synthesis process.
///
/// `speak` while already Speaking does not queue; the previous utterance
/// is cancelled and reaped before the new one takes its place.
pub struct SpeechController {
    active: Mutex<Option<Child>>,
}

impl SpeechController {
    pub fn new() -> Self {
        Self {
            active: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SpeechState {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        match active.as_mut() {
            Some(child) => match child.try_wait() {
                Ok(None) => SpeechState::Speaking,
                _ => {
                    *active = None;
                    SpeechState::Idle
                }
            },
            None => SpeechState::Idle,
        }
    }

    /// Starts synthesis of `text` in `lang`'s voice.
    pub fn speak(&self, text: &str, lang: &str) -> Result<()> {
        let engine = detect_engine().ok_or(PipelineError::SpeechUnsupported)?;
        let prosody = prosody_for(lang);
        let text = text.replace('\n', " ");
        debug!(lang, ?prosody, "starting speech synthesis");

        let child = match engine {
            TtsEngine::Say => Command::new("say")
                .arg("-r")
                .arg(format!("{:.0}", BASE_WPM * prosody.rate))
                .arg(&text)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .with_context(|| "failed to run say")
                .map_err(PipelineError::Internal)?,
            TtsEngine::Espeak => Command::new("espeak")
                .arg("-v")
                .arg(espeak_voice(lang))
                .arg("-s")
                .arg(format!("{:.0}", BASE_WPM * prosody.rate))
                .arg("-p")
                .arg(format!("{:.0}", BASE_PITCH * prosody.pitch))
                .arg(&text)
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .with_context(|| "failed to run espeak")
                .map_err(PipelineError::Internal)?,
        };

        self.adopt(child);
        Ok(())
    }

    /// Stores the new synthesis process, reaping whatever the caller
    /// abandoned instead of leaking it.
    fn adopt(&self, child: Child) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(mut previous) = active.replace(child) {
            let _ = previous.kill();
            let _ = previous.wait();
        }
    }

    /// Cancels any in-flight synthesis. Idempotent.
    pub fn stop(&self) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(mut child) = active.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    /// Blocks until the current utterance finishes, for CLI use.
    pub fn wait(&self) {
        let child = {
            let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
            active.take()
        };
        if let Some(mut child) = child {
            let _ = child.wait();
        }
    }
}

impl Default for SpeechController {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SpeechController {
    fn drop(&mut self) {
        self.stop();
    }
}

fn espeak_voice(lang: &str) -> String {
    let base = lang.trim().split(['-', '_']).next().unwrap_or("en");
    if base.is_empty() {
        "en".to_string()
    } else {
        base.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::{espeak_voice, prosody_for, SpeechController, SpeechState};

    #[test]
    fn hindi_and_marathi_get_clarity_prosody() {
        for lang in ["hi", "hi-IN", "mr", "mr-IN"] {
            let p = prosody_for(lang);
            assert_eq!(p.rate, 0.75, "{lang}");
            assert_eq!(p.pitch, 1.1, "{lang}");
        }
    }

    #[test]
    fn other_languages_get_default_prosody() {
        for lang in ["en", "es", "fr", "ja", ""] {
            let p = prosody_for(lang);
            assert_eq!(p.rate, 0.9, "{lang}");
            assert_eq!(p.pitch, 1.0, "{lang}");
        }
    }

    #[test]
    fn stop_is_idempotent_from_idle() {
        let controller = SpeechController::new();
        assert_eq!(controller.state(), SpeechState::Idle);
        controller.stop();
        controller.stop();
        assert_eq!(controller.state(), SpeechState::Idle);
    }

    #[cfg(unix)]
    #[test]
    fn replacing_an_utterance_reaps_the_previous_process() {
        use std::process::{Command, Stdio};

        let spawn_sleeper = || {
            Command::new("sleep")
                .arg("30")
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .spawn()
        };
        let Ok(first) = spawn_sleeper() else { return };
        let first_pid = first.id().to_string();

        let controller = SpeechController::new();
        controller.adopt(first);
        controller.adopt(spawn_sleeper().unwrap());

        // kill -0 succeeds for a live or zombie pid; it must be neither.
        let status = Command::new("kill")
            .args(["-0", &first_pid])
            .stderr(Stdio::null())
            .status()
            .unwrap();
        assert!(!status.success());
        controller.stop();
    }

    #[test]
    fn voice_is_the_base_language_code() {
        assert_eq!(espeak_voice("hi-IN"), "hi");
        assert_eq!(espeak_voice("mr"), "mr");
        assert_eq!(espeak_voice(""), "en");
    }
}
