use crate::audio::{wav_duration, AudioAsset};
use crate::error::{LectureError, Result};
use crate::synth::Synthesizer;
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Offline synthesis through a local speech engine that writes WAV files
/// (`espeak-ng` by default).
pub struct CommandSynthesizer {
    program: String,
    voice: String,
    words_per_minute: u32,
}

impl CommandSynthesizer {
    pub fn new(voice: impl Into<String>) -> Self {
        Self {
            program: "espeak-ng".to_string(),
            voice: voice.into(),
            words_per_minute: 160,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_rate(mut self, words_per_minute: u32) -> Self {
        self.words_per_minute = words_per_minute;
        self
    }

    /// Whether the engine binary can be started.
    pub async fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl Synthesizer for CommandSynthesizer {
    async fn synthesize(&self, text: &str, dest: &Path) -> Result<AudioAsset> {
        if text.trim().is_empty() {
            return Err(LectureError::Synthesis("nothing to speak".to_string()));
        }

        let output = Command::new(&self.program)
            .arg("-v")
            .arg(&self.voice)
            .arg("-s")
            .arg(self.words_per_minute.to_string())
            .arg("-w")
            .arg(dest)
            .arg(text)
            .output()
            .await
            .map_err(|e| {
                LectureError::Synthesis(format!("Failed to run {}: {e}", self.program))
            })?;

        let guard = AudioAsset::provisional(dest, 0.0);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LectureError::Synthesis(format!(
                "{} exited with {:?}: {}",
                self.program,
                output.status.code(),
                stderr.trim()
            )));
        }

        let duration = wav_duration(dest)
            .map_err(|e| LectureError::Synthesis(format!("unverifiable audio: {e}")))?;
        debug!("{} produced {:.2}s of audio", self.program, duration);

        Ok(guard.with_duration(duration))
    }

    fn name(&self) -> &'static str {
        "espeak"
    }

    fn extension(&self) -> &'static str {
        "wav"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_program_is_synthesis_error() {
        let dir = TempDir::new().unwrap();
        let synth = CommandSynthesizer::new("en").with_program("definitely-not-a-tts-engine");
        assert!(!synth.is_available().await);

        let result = synth.synthesize("hello", &dir.path().join("x.wav")).await;
        assert!(matches!(result, Err(LectureError::Synthesis(_))));
    }

    #[tokio::test]
    async fn test_failed_run_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("x.wav");
        // `false` ignores its arguments and exits non-zero.
        let synth = CommandSynthesizer::new("en").with_program("false");

        let result = synth.synthesize("hello", &dest).await;
        assert!(result.is_err());
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let dir = TempDir::new().unwrap();
        let synth = CommandSynthesizer::new("en");
        let result = synth.synthesize("  ", &dir.path().join("x.wav")).await;
        assert!(matches!(result, Err(LectureError::Synthesis(_))));
    }
}
