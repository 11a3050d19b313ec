use crate::audio::{measure_duration, AudioAsset};
use crate::error::{LectureError, Result};
use crate::synth::Synthesizer;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Default public endpoint host.
pub const DEFAULT_BASE_URL: &str = "https://translate.google.com";

/// The endpoint rejects requests with more text than this.
const MAX_PIECE_CHARS: usize = 100;

/// Maximum retries per piece.
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds).
const BASE_DELAY_MS: u64 = 500;

/// Google Translate text-to-speech client (MP3 output).
pub struct GoogleTts {
    client: reqwest::Client,
    base_url: String,
    language: String,
    slow: bool,
}

impl GoogleTts {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            language: language.into(),
            slow: false,
        }
    }

    /// Point the client at a different host (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_slow(mut self, slow: bool) -> Self {
        self.slow = slow;
        self
    }

    /// Fetch all pieces of `text` and append them to `dest`. Returns the
    /// number of bytes written.
    pub async fn download(&self, text: &str, dest: &Path) -> Result<u64> {
        let pieces = split_text(text, MAX_PIECE_CHARS);
        if pieces.is_empty() {
            return Err(LectureError::Synthesis("nothing to speak".to_string()));
        }

        let mut file = fs::File::create(dest).await?;
        let mut written = 0u64;

        for (idx, piece) in pieces.iter().enumerate() {
            let bytes = self.fetch_with_retry(piece, idx, pieces.len()).await?;
            file.write_all(&bytes).await?;
            written += bytes.len() as u64;
        }

        file.flush().await?;
        debug!(
            "Wrote {} bytes ({} pieces) to {}",
            written,
            pieces.len(),
            dest.display()
        );
        Ok(written)
    }

    async fn fetch_piece(&self, piece: &str, idx: usize, total: usize) -> Result<Vec<u8>> {
        let url = format!("{}/translate_tts", self.base_url);
        let speed = if self.slow { "0.3" } else { "1" };
        let total = total.to_string();
        let idx = idx.to_string();
        let textlen = piece.chars().count().to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("ie", "UTF-8"),
                ("q", piece),
                ("tl", self.language.as_str()),
                ("client", "tw-ob"),
                ("ttsspeed", speed),
                ("total", total.as_str()),
                ("idx", idx.as_str()),
                ("textlen", textlen.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(LectureError::Synthesis(format!(
                "TTS API error ({}): {}",
                status, snippet
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn fetch_with_retry(&self, piece: &str, idx: usize, total: usize) -> Result<Vec<u8>> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = BASE_DELAY_MS * 2u64.pow(attempt - 1);
                debug!("Retry attempt {} after {}ms delay", attempt, delay);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            match self.fetch_piece(piece, idx, total).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    // Don't retry on client errors
                    if e.to_string().contains("API error (4") {
                        return Err(e);
                    }
                    warn!("TTS attempt {} failed: {}", attempt + 1, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| LectureError::Synthesis("Unknown error".to_string())))
    }
}

#[async_trait]
impl Synthesizer for GoogleTts {
    async fn synthesize(&self, text: &str, dest: &Path) -> Result<AudioAsset> {
        if let Err(e) = self.download(text, dest).await {
            // Leave nothing half-written behind.
            let _ = fs::remove_file(dest).await;
            return Err(match e {
                LectureError::Synthesis(_) => e,
                other => LectureError::Synthesis(other.to_string()),
            });
        }

        // Dropping the guard on the error path removes the file.
        let guard = AudioAsset::provisional(dest, 0.0);
        let duration = measure_duration(dest)
            .map_err(|e| LectureError::Synthesis(format!("unverifiable audio: {e}")))?;
        Ok(guard.with_duration(duration))
    }

    fn name(&self) -> &'static str {
        "Google TTS"
    }

    fn extension(&self) -> &'static str {
        "mp3"
    }

    fn min_output_bytes(&self) -> u64 {
        1024
    }
}

/// Split text into pieces of at most `max_chars`, breaking on whitespace
/// where possible.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word.to_string();

        while word.chars().count() > max_chars {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
            }
            let head: String = word.chars().take(max_chars).collect();
            word = word.chars().skip(max_chars).collect();
            pieces.push(head);
        }

        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };

        if needed > max_chars {
            pieces.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }

    if !current.is_empty() {
        pieces.push(current);
    }

    pieces
}
